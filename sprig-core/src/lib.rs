// sprig-core: 类似 Spring 的控制反转容器
//
// 提供：
// - Bean 定义、注册表与单例/原型作用域
// - 按名称、按类型、构造函数和自动检测的自动装配
// - 通过提前暴露解决单例之间的循环引用
// - 后置处理器、生命周期回调与容器事件
// - 从 TOML 文件加载 Bean 定义

pub mod app;
mod autowire;
pub mod bean;
pub mod bean_definition;
pub mod bean_factory;
pub mod class;
pub mod constants;
pub mod context;
pub mod convert;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod logging;
pub mod property;
pub mod reader;
pub mod registry;
pub mod resource;
pub mod scope;
pub mod utils;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;

// 重新导出常用类型
pub use app::SprigApplication;
pub use bean::{BeanRef, FactoryBean};
pub use bean_definition::{AutowireMode, BeanDefinition};
pub use bean_factory::{
    AutowireCapableBeanFactory, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
    ConfigurableListableBeanFactory, DefaultListableBeanFactory, ListableBeanFactory,
};
pub use class::{BeanClass, BeanClassBuilder, ClassRegistry, ClassSubmission, ConstructorArgs};
pub use constants::*;
pub use context::{
    ApplicationContext, ApplicationContextAware, ApplicationContextBuilder, ApplicationEventPublisherAware,
    ContextState, RefreshHook, ResourceLoaderAware,
};
pub use convert::{
    ConverterRegistrar, ConverterRegistry, CustomConverter, CustomConverterConfigurer, DefaultTypeConverter,
    TypeConverter,
};
pub use error::{ContainerError, ContainerResult};
pub use event::{
    ApplicationEventMulticaster, ApplicationEventPublisher, ApplicationListener, ContextClosedEvent,
    ContextRefreshedEvent, ErrorHandler, Event, SimpleApplicationEventMulticaster, TypedApplicationListener,
    TypedApplicationListenerAdapter,
};
pub use lifecycle::{
    BeanFactoryAware, BeanFactoryPostProcessor, BeanNameAware, BeanPostProcessor, DisposableBean,
    InitializingBean,
};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use property::{ConstructorArgumentValues, MutablePropertyValues, PropertyValue, ValueHolder};
pub use reader::{BeanDefinitionSource, TomlBeanDefinitionReader};
pub use registry::{BeanDefinitionRegistry, DefaultBeanDefinitionRegistry};
pub use resource::{
    ByteArrayResource, ClassPathResource, DefaultResourceLoader, FileSystemResource, Resource, ResourceLoader,
};
pub use scope::Scope;
pub use value::{ManagedList, RuntimeBeanReference, TypeKey, Value, ValueType};

// 导出 inventory，供 `inventory::submit!` 登记 Bean 类型
pub use inventory;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::app::SprigApplication;
    pub use crate::bean::{BeanRef, FactoryBean};
    pub use crate::bean_definition::{AutowireMode, BeanDefinition};
    pub use crate::bean_factory::{
        AutowireCapableBeanFactory, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
        ConfigurableListableBeanFactory, DefaultListableBeanFactory, ListableBeanFactory,
    };
    pub use crate::class::{BeanClass, ClassRegistry, ClassSubmission};
    pub use crate::context::{ApplicationContext, ApplicationContextAware, ContextState};
    pub use crate::error::{ContainerError, ContainerResult};
    pub use crate::event::{
        ApplicationEventPublisher, ApplicationListener, ContextClosedEvent, ContextRefreshedEvent, Event,
        TypedApplicationListener, TypedApplicationListenerAdapter,
    };
    pub use crate::lifecycle::{
        BeanFactoryPostProcessor, BeanNameAware, BeanPostProcessor, DisposableBean, InitializingBean,
    };
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::registry::BeanDefinitionRegistry;
    pub use crate::value::{ManagedList, TypeKey, Value, ValueType};
    pub use crate::Scope;
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
