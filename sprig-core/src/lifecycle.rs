//! 生命周期回调与后置处理器
//!
//! 每种回调都是一个独立的小 trait；Bean 类型在 [`BeanClass`](crate::class::BeanClass)
//! 中声明自己实现了哪些，容器在创建时逐一检查并调用。

use std::sync::{Arc, Weak};

use crate::bean::BeanRef;
use crate::bean_factory::DefaultListableBeanFactory;
use crate::error::{ContainerError, ContainerResult};

/// 属性填充完成后的初始化回调
///
/// 类似 Spring 的 InitializingBean，先于自定义 init-method 调用
pub trait InitializingBean: Send + Sync {
    fn after_properties_set(&mut self) -> ContainerResult<()>;
}

/// 单例销毁回调
///
/// 类似 Spring 的 DisposableBean，先于自定义 destroy-method 调用
pub trait DisposableBean: Send + Sync {
    fn destroy(&mut self) -> ContainerResult<()>;
}

/// 希望知道自己注册名称的 Bean
pub trait BeanNameAware: Send + Sync {
    fn set_bean_name(&mut self, name: &str);
}

/// 希望持有容器句柄的 Bean
///
/// 拿到的是弱引用，避免 Bean 与容器互相持有。
pub trait BeanFactoryAware: Send + Sync {
    fn set_bean_factory(&mut self, factory: Weak<DefaultListableBeanFactory>);
}

/// Bean 后置处理器
///
/// 在每个 Bean 初始化前后调用，按注册顺序执行。
/// 每个处理器接收上一个处理器的结果，可以原样返回，也可以返回替身对象。
///
/// 声明为 Bean 的处理器在回调期间持有自身实例的读锁，不能在回调中写入自身。
///
/// # 示例
///
/// ```rust,ignore
/// struct TimingProcessor;
///
/// impl BeanPostProcessor for TimingProcessor {
///     fn post_process_after_initialization(&self, bean: BeanRef, bean_name: &str) -> ContainerResult<BeanRef> {
///         tracing::info!("Bean '{}' ready", bean_name);
///         Ok(bean)
///     }
/// }
/// ```
pub trait BeanPostProcessor: Send + Sync {
    /// 初始化回调之前调用
    fn post_process_before_initialization(
        &self,
        bean: BeanRef,
        bean_name: &str,
    ) -> ContainerResult<BeanRef> {
        let _ = bean_name;
        Ok(bean)
    }

    /// 初始化回调之后调用
    fn post_process_after_initialization(
        &self,
        bean: BeanRef,
        bean_name: &str,
    ) -> ContainerResult<BeanRef> {
        let _ = bean_name;
        Ok(bean)
    }

    /// 处理器名称（用于日志）
    fn name(&self) -> &str {
        "BeanPostProcessor"
    }
}

/// BeanFactory 后置处理器
///
/// 在所有定义加载完成、任何 Bean 实例化之前调用一次，
/// 可以查看和修改 Bean 定义。
pub trait BeanFactoryPostProcessor: Send + Sync {
    fn post_process_bean_factory(&self, factory: &DefaultListableBeanFactory) -> ContainerResult<()>;

    /// 处理器名称（用于日志）
    fn name(&self) -> &str {
        "BeanFactoryPostProcessor"
    }
}

/// 把声明为 Bean 的后置处理器接入处理器链
pub(crate) struct BeanPostProcessorBean {
    name: String,
    bean: BeanRef,
}

impl BeanPostProcessorBean {
    pub(crate) fn new(name: impl Into<String>, bean: BeanRef) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            bean,
        })
    }

    fn not_a_processor(&self) -> ContainerError {
        ContainerError::TypeMismatch {
            name: self.name.clone(),
            expected: "BeanPostProcessor".to_string(),
            found: self.bean.type_name().to_string(),
        }
    }
}

impl BeanPostProcessor for BeanPostProcessorBean {
    fn post_process_before_initialization(
        &self,
        bean: BeanRef,
        bean_name: &str,
    ) -> ContainerResult<BeanRef> {
        self.bean
            .view::<dyn BeanPostProcessor, _>(|p| p.post_process_before_initialization(bean, bean_name))
            .ok_or_else(|| self.not_a_processor())?
    }

    fn post_process_after_initialization(
        &self,
        bean: BeanRef,
        bean_name: &str,
    ) -> ContainerResult<BeanRef> {
        self.bean
            .view::<dyn BeanPostProcessor, _>(|p| p.post_process_after_initialization(bean, bean_name))
            .ok_or_else(|| self.not_a_processor())?
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 把声明为 Bean 的 BeanFactory 后置处理器接入
pub(crate) struct BeanFactoryPostProcessorBean {
    name: String,
    bean: BeanRef,
}

impl BeanFactoryPostProcessorBean {
    pub(crate) fn new(name: impl Into<String>, bean: BeanRef) -> Self {
        Self {
            name: name.into(),
            bean,
        }
    }
}

impl BeanFactoryPostProcessor for BeanFactoryPostProcessorBean {
    fn post_process_bean_factory(&self, factory: &DefaultListableBeanFactory) -> ContainerResult<()> {
        self.bean
            .view::<dyn BeanFactoryPostProcessor, _>(|p| p.post_process_bean_factory(factory))
            .ok_or_else(|| ContainerError::TypeMismatch {
                name: self.name.clone(),
                expected: "BeanFactoryPostProcessor".to_string(),
                found: self.bean.type_name().to_string(),
            })?
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::BeanClass;

    #[derive(Default)]
    struct Renamer;

    impl BeanPostProcessor for Renamer {
        fn post_process_after_initialization(&self, _bean: BeanRef, bean_name: &str) -> ContainerResult<BeanRef> {
            Ok(BeanRef::of(format!("wrapped {}", bean_name)))
        }
    }

    #[test]
    fn test_processor_bean_delegates_to_instance() {
        let class = BeanClass::builder::<Renamer>("Renamer")
            .default_constructor()
            .bean_post_processor()
            .build();
        let bean = BeanRef::with_class(Renamer, Arc::new(class)).unwrap();
        let adapter = BeanPostProcessorBean::new("renamer", bean);

        let target = BeanRef::of(1_i64);
        let same = adapter.post_process_before_initialization(target.clone(), "x").unwrap();
        assert!(same.ptr_eq(&target));

        let replaced = adapter.post_process_after_initialization(target, "x").unwrap();
        assert_eq!(replaced.cloned::<String>().as_deref(), Some("wrapped x"));
        assert_eq!(adapter.name(), "renamer");
    }

    struct SelfReading {
        me: parking_lot::Mutex<Option<BeanRef>>,
    }

    impl BeanPostProcessor for SelfReading {
        fn post_process_before_initialization(&self, bean: BeanRef, _bean_name: &str) -> ContainerResult<BeanRef> {
            let me = self.me.lock().clone();
            let own_name = me.and_then(|me| me.read::<SelfReading>().map(|_| "self".to_string()));
            Ok(own_name.map(BeanRef::of).unwrap_or(bean))
        }
    }

    #[test]
    fn test_processor_bean_can_read_itself_during_callback() {
        let class = BeanClass::builder::<SelfReading>("SelfReading")
            .constructor(Vec::new(), |_| Ok(SelfReading { me: parking_lot::Mutex::new(None) }))
            .bean_post_processor()
            .build();
        let bean = BeanRef::with_class(SelfReading { me: parking_lot::Mutex::new(None) }, Arc::new(class)).unwrap();
        *bean.read::<SelfReading>().unwrap().me.lock() = Some(bean.clone());
        let adapter = BeanPostProcessorBean::new("self-reading", bean);

        let result = adapter.post_process_before_initialization(BeanRef::of(1_i64), "x").unwrap();
        assert_eq!(result.cloned::<String>().as_deref(), Some("self"));
    }

    #[test]
    fn test_processor_bean_without_capability_fails() {
        let adapter = BeanPostProcessorBean::new("plain", BeanRef::of(Renamer));
        let err = adapter
            .post_process_before_initialization(BeanRef::of(1_i64), "x")
            .unwrap_err();
        assert!(matches!(err, ContainerError::TypeMismatch { .. }));
    }
}
