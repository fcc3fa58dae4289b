//! 应用上下文
//!
//! [`ApplicationContext`] 持有一个 [`DefaultListableBeanFactory`]，负责从定义来源加载 Bean、
//! 运行后置处理器、管理监听器，并按 `Unrefreshed → Refreshing → Active → Closed`
//! 的状态机完成刷新与关闭。

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Instant, SystemTime};

use parking_lot::RwLock;

use crate::bean::BeanRef;
use crate::bean_factory::{
    BeanFactory, ConfigurableBeanFactory, ConfigurableListableBeanFactory, DefaultListableBeanFactory,
    ListableBeanFactory,
};
use crate::class::ClassRegistry;
use crate::constants::DEFAULT_CONTEXT_DISPLAY_NAME;
use crate::error::{ContainerError, ContainerResult};
use crate::event::{
    ApplicationEventMulticaster, ApplicationEventPublisher, ApplicationListener, ApplicationListenerBean,
    ContextClosedEvent, ContextRefreshedEvent, Event, SimpleApplicationEventMulticaster,
};
use crate::lifecycle::{BeanFactoryPostProcessor, BeanFactoryPostProcessorBean, BeanPostProcessor, BeanPostProcessorBean};
use crate::reader::{BeanDefinitionSource, TomlBeanDefinitionReader};
use crate::resource::{DefaultResourceLoader, Resource, ResourceLoader};
use crate::value::TypeKey;

/// 希望持有应用上下文的 Bean
pub trait ApplicationContextAware: Send + Sync {
    fn set_application_context(&mut self, context: Weak<ApplicationContext>);
}

/// 希望发布事件的 Bean
pub trait ApplicationEventPublisherAware: Send + Sync {
    fn set_application_event_publisher(&mut self, publisher: Weak<dyn ApplicationEventPublisher>);
}

/// 希望加载资源的 Bean
pub trait ResourceLoaderAware: Send + Sync {
    fn set_resource_loader(&mut self, resource_loader: Arc<dyn ResourceLoader>);
}

/// 刷新过程中的扩展点
///
/// `post_process_bean_factory` 在定义加载完成、BeanFactory 后置处理器运行之前调用；
/// `on_refresh` 在事件多播器就绪之后、监听器注册之前调用。
pub trait RefreshHook: Send + Sync {
    fn post_process_bean_factory(&self, factory: &DefaultListableBeanFactory) -> ContainerResult<()> {
        let _ = factory;
        Ok(())
    }

    fn on_refresh(&self, context: &ApplicationContext) -> ContainerResult<()> {
        let _ = context;
        Ok(())
    }
}

/// 上下文状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Unrefreshed,
    Refreshing,
    Active,
    Closed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextState::Unrefreshed => write!(f, "unrefreshed"),
            ContextState::Refreshing => write!(f, "refreshing"),
            ContextState::Active => write!(f, "active"),
            ContextState::Closed => write!(f, "closed"),
        }
    }
}

/// 为声明了感知接口的 Bean 注入上下文句柄
struct ApplicationContextAwareProcessor {
    context: Weak<ApplicationContext>,
    resource_loader: Arc<dyn ResourceLoader>,
}

impl BeanPostProcessor for ApplicationContextAwareProcessor {
    fn post_process_before_initialization(&self, bean: BeanRef, bean_name: &str) -> ContainerResult<BeanRef> {
        if bean.implements::<dyn ResourceLoaderAware>() {
            tracing::trace!("Injecting resource loader into '{}'", bean_name);
            bean.view_mut::<dyn ResourceLoaderAware, _>(|b| b.set_resource_loader(self.resource_loader.clone()));
        }
        if bean.implements::<dyn ApplicationEventPublisherAware>() {
            tracing::trace!("Injecting event publisher into '{}'", bean_name);
            let publisher: Weak<dyn ApplicationEventPublisher> = self.context.clone();
            bean.view_mut::<dyn ApplicationEventPublisherAware, _>(|b| b.set_application_event_publisher(publisher));
        }
        if bean.implements::<dyn ApplicationContextAware>() {
            tracing::trace!("Injecting application context into '{}'", bean_name);
            bean.view_mut::<dyn ApplicationContextAware, _>(|b| b.set_application_context(self.context.clone()));
        }
        Ok(bean)
    }

    fn name(&self) -> &str {
        "ApplicationContextAwareProcessor"
    }
}

/// 应用上下文
///
/// 由 [`ApplicationContextBuilder`] 创建，调用 [`refresh`](Self::refresh) 后进入可用状态。
/// 刷新失败时已创建的单例会被销毁，上下文回到未刷新状态，原始错误向上传播。
pub struct ApplicationContext {
    self_ref: Weak<ApplicationContext>,

    display_name: String,

    startup_date: RwLock<Option<SystemTime>>,

    state: RwLock<ContextState>,

    /// 当前的 Bean 工厂，每次刷新重建
    bean_factory: RwLock<Option<Arc<DefaultListableBeanFactory>>>,

    resource_loader: Arc<dyn ResourceLoader>,

    /// Bean 定义来源，按添加顺序加载
    sources: Vec<Arc<dyn BeanDefinitionSource>>,

    bean_factory_post_processors: RwLock<Vec<Arc<dyn BeanFactoryPostProcessor>>>,

    /// 手动添加的监听器
    application_listeners: RwLock<Vec<Arc<dyn ApplicationListener>>>,

    multicaster: RwLock<Option<Arc<SimpleApplicationEventMulticaster>>>,

    hooks: Vec<Arc<dyn RefreshHook>>,
}

impl ApplicationContext {
    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// 最近一次刷新的开始时间
    pub fn startup_date(&self) -> Option<SystemTime> {
        *self.startup_date.read()
    }

    pub fn state(&self) -> ContextState {
        *self.state.read()
    }

    pub fn is_active(&self) -> bool {
        self.state() == ContextState::Active
    }

    pub fn resource_loader(&self) -> &Arc<dyn ResourceLoader> {
        &self.resource_loader
    }

    /// 获取当前的 Bean 工厂
    ///
    /// 尚未刷新或已关闭时返回 `IllegalState`
    pub fn get_bean_factory(&self) -> ContainerResult<Arc<DefaultListableBeanFactory>> {
        if self.state() == ContextState::Closed {
            return Err(ContainerError::IllegalState(format!(
                "{} has been closed",
                self.display_name
            )));
        }
        self.bean_factory.read().clone().ok_or_else(|| {
            ContainerError::IllegalState(format!(
                "{} has not been refreshed yet",
                self.display_name
            ))
        })
    }

    /// 添加监听器；上下文已激活时立即生效
    pub fn add_application_listener(&self, listener: Arc<dyn ApplicationListener>) {
        if let Some(multicaster) = self.multicaster.read().as_ref() {
            multicaster.add_application_listener(listener.clone());
        }
        self.application_listeners.write().push(listener);
    }

    /// 添加在下次刷新时运行的 BeanFactory 后置处理器
    pub fn add_bean_factory_post_processor(&self, processor: Arc<dyn BeanFactoryPostProcessor>) {
        self.bean_factory_post_processors.write().push(processor);
    }

    pub fn get_bean_factory_post_processors(&self) -> Vec<Arc<dyn BeanFactoryPostProcessor>> {
        self.bean_factory_post_processors.read().clone()
    }

    /// 加载定义并创建所有非延迟单例
    pub fn refresh(&self) -> ContainerResult<()> {
        {
            let mut state = self.state.write();
            if *state == ContextState::Refreshing {
                return Err(ContainerError::IllegalState(format!(
                    "{} is already refreshing",
                    self.display_name
                )));
            }
            *state = ContextState::Refreshing;
        }

        let started = Instant::now();
        *self.startup_date.write() = Some(SystemTime::now());
        tracing::info!("Refreshing {}", self.display_name);

        let previous = self.bean_factory.write().take();
        if let Some(previous) = previous {
            tracing::debug!("Destroying singletons of the previous bean factory");
            log_destruction_failures(previous.destroy_singletons());
        }

        let factory = DefaultListableBeanFactory::new();
        *self.bean_factory.write() = Some(factory.clone());

        match self.do_refresh(&factory) {
            Ok(()) => {
                *self.state.write() = ContextState::Active;
                tracing::info!(
                    "{} started in {:?} with {} singleton(s)",
                    self.display_name,
                    started.elapsed(),
                    factory.get_singleton_count()
                );
                self.publish_event(Arc::new(ContextRefreshedEvent::new(self.display_name.clone())));
                Ok(())
            }
            Err(err) => {
                tracing::error!("Refresh of {} failed: {}", self.display_name, err);
                log_destruction_failures(factory.destroy_singletons());
                if let Some(multicaster) = self.multicaster.write().take() {
                    multicaster.remove_all_listeners();
                }
                *self.bean_factory.write() = None;
                *self.state.write() = ContextState::Unrefreshed;
                Err(err)
            }
        }
    }

    fn do_refresh(&self, factory: &Arc<DefaultListableBeanFactory>) -> ContainerResult<()> {
        let mut loaded = 0;
        for source in &self.sources {
            tracing::debug!("Loading bean definitions from {}", source.description());
            loaded += source.load_bean_definitions(factory.as_ref())?;
        }
        tracing::debug!("Loaded {} bean definition(s)", loaded);

        factory.add_bean_post_processor(Arc::new(ApplicationContextAwareProcessor {
            context: self.self_ref.clone(),
            resource_loader: self.resource_loader.clone(),
        }));

        for hook in &self.hooks {
            hook.post_process_bean_factory(factory)?;
        }

        self.invoke_bean_factory_post_processors(factory)?;
        self.register_bean_post_processors(factory)?;
        self.init_application_event_multicaster();

        for hook in &self.hooks {
            hook.on_refresh(self)?;
        }

        self.register_listeners(factory)?;

        factory.freeze_configuration();
        factory.preinstantiate_singletons()
    }

    /// 先运行手动添加的处理器，再运行声明为 Bean 的处理器
    fn invoke_bean_factory_post_processors(&self, factory: &DefaultListableBeanFactory) -> ContainerResult<()> {
        let processors = self.get_bean_factory_post_processors();
        for processor in &processors {
            tracing::debug!("Invoking BeanFactoryPostProcessor '{}'", processor.name());
            processor.post_process_bean_factory(factory)?;
        }

        let beans = factory.get_beans_of_type(&TypeKey::of::<dyn BeanFactoryPostProcessor>(), true, false)?;
        for (name, bean) in beans {
            tracing::debug!("Invoking BeanFactoryPostProcessor bean '{}'", name);
            BeanFactoryPostProcessorBean::new(name, bean).post_process_bean_factory(factory)?;
        }
        Ok(())
    }

    fn register_bean_post_processors(&self, factory: &DefaultListableBeanFactory) -> ContainerResult<()> {
        let beans = factory.get_beans_of_type(&TypeKey::of::<dyn BeanPostProcessor>(), true, false)?;
        if !beans.is_empty() {
            tracing::debug!("Registering {} BeanPostProcessor bean(s)", beans.len());
        }
        for (name, bean) in beans {
            factory.add_bean_post_processor(BeanPostProcessorBean::new(name, bean));
        }
        Ok(())
    }

    fn init_application_event_multicaster(&self) {
        let mut slot = self.multicaster.write();
        if let Some(previous) = slot.take() {
            previous.remove_all_listeners();
        }
        *slot = Some(Arc::new(SimpleApplicationEventMulticaster::new()));
    }

    fn register_listeners(&self, factory: &DefaultListableBeanFactory) -> ContainerResult<()> {
        let multicaster = self.multicaster.read().clone().ok_or_else(|| {
            ContainerError::IllegalState("event multicaster not initialized".to_string())
        })?;

        for listener in self.application_listeners.read().iter() {
            multicaster.add_application_listener(listener.clone());
        }

        let beans = factory.get_beans_of_type(&TypeKey::of::<dyn ApplicationListener>(), true, false)?;
        for (name, bean) in beans {
            tracing::debug!("Registering listener bean '{}'", name);
            multicaster.add_application_listener(ApplicationListenerBean::new(name, bean));
        }

        tracing::debug!("{} application listener(s) registered", multicaster.listener_count());
        Ok(())
    }

    /// 销毁所有单例并发布关闭事件
    ///
    /// 重复关闭不做任何事；从未刷新的上下文不能关闭。
    pub fn close(&self) -> ContainerResult<()> {
        {
            let mut state = self.state.write();
            match *state {
                ContextState::Closed => {
                    tracing::debug!("{} already closed", self.display_name);
                    return Ok(());
                }
                ContextState::Active => *state = ContextState::Closed,
                other => {
                    return Err(ContainerError::IllegalState(format!(
                        "cannot close {} while {}",
                        self.display_name, other
                    )));
                }
            }
        }

        tracing::info!("Closing {}", self.display_name);
        let factory = self.bean_factory.write().take();
        if let Some(factory) = factory {
            log_destruction_failures(factory.destroy_singletons());
        }

        self.publish_event(Arc::new(ContextClosedEvent::new(self.display_name.clone())));

        if let Some(multicaster) = self.multicaster.write().take() {
            multicaster.remove_all_listeners();
        }
        tracing::info!("{} closed", self.display_name);
        Ok(())
    }
}

fn log_destruction_failures(failures: Vec<ContainerError>) {
    for failure in failures {
        tracing::warn!("{}", failure);
    }
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("display_name", &self.display_name)
            .field("state", &self.state())
            .field("startup_date", &self.startup_date())
            .finish()
    }
}

impl BeanFactory for ApplicationContext {
    fn get_bean(&self, name: &str) -> ContainerResult<BeanRef> {
        self.get_bean_factory()?.get_bean(name)
    }

    fn get_bean_of_type(&self, name: &str, required_type: &TypeKey) -> ContainerResult<BeanRef> {
        self.get_bean_factory()?.get_bean_of_type(name, required_type)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.get_bean_factory()
            .map(|factory| factory.contains_bean(name))
            .unwrap_or(false)
    }

    fn is_singleton(&self, name: &str) -> ContainerResult<bool> {
        self.get_bean_factory()?.is_singleton(name)
    }
}

impl ListableBeanFactory for ApplicationContext {
    fn get_bean_names_for_type(&self, filter: Option<&TypeKey>) -> Vec<String> {
        self.get_bean_factory()
            .map(|factory| factory.get_bean_names_for_type(filter))
            .unwrap_or_default()
    }

    fn get_beans_of_type(
        &self,
        required_type: &TypeKey,
        include_prototypes: bool,
        include_factory_beans: bool,
    ) -> ContainerResult<Vec<(String, BeanRef)>> {
        self.get_bean_factory()?
            .get_beans_of_type(required_type, include_prototypes, include_factory_beans)
    }
}

impl ResourceLoader for ApplicationContext {
    fn get_resource(&self, location: &str) -> ContainerResult<Box<dyn Resource>> {
        self.resource_loader.get_resource(location)
    }
}

impl ApplicationEventPublisher for ApplicationContext {
    fn publish_event(&self, event: Arc<dyn Event>) {
        let multicaster = self.multicaster.read().clone();
        match multicaster {
            Some(multicaster) => multicaster.multicast_event(event),
            None => tracing::warn!(
                "Event '{}' dropped: {} has no event multicaster",
                event.event_name(),
                self.display_name
            ),
        }
    }
}

/// 应用上下文构建器
///
/// ```rust,ignore
/// let context = ApplicationContext::builder()
///     .with_display_name("demo")
///     .with_class_registry(Arc::new(classes))
///     .with_config_location("classpath:beans.toml")
///     .build()?;
/// context.refresh()?;
/// ```
pub struct ApplicationContextBuilder {
    display_name: String,
    resource_loader: Option<Arc<dyn ResourceLoader>>,
    class_registry: Option<Arc<ClassRegistry>>,
    config_locations: Vec<String>,
    sources: Vec<Arc<dyn BeanDefinitionSource>>,
    bean_factory_post_processors: Vec<Arc<dyn BeanFactoryPostProcessor>>,
    listeners: Vec<Arc<dyn ApplicationListener>>,
    hooks: Vec<Arc<dyn RefreshHook>>,
}

impl ApplicationContextBuilder {
    pub fn new() -> Self {
        Self {
            display_name: DEFAULT_CONTEXT_DISPLAY_NAME.to_string(),
            resource_loader: None,
            class_registry: None,
            config_locations: Vec::new(),
            sources: Vec::new(),
            bean_factory_post_processors: Vec::new(),
            listeners: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_resource_loader(mut self, resource_loader: Arc<dyn ResourceLoader>) -> Self {
        self.resource_loader = Some(resource_loader);
        self
    }

    /// 解析配置文件中类名所用的登记表
    ///
    /// 未设置时使用通过 `inventory` 提交的全部类型
    pub fn with_class_registry(mut self, class_registry: Arc<ClassRegistry>) -> Self {
        self.class_registry = Some(class_registry);
        self
    }

    /// 添加 TOML 配置位置；这些位置先于其他定义来源加载
    pub fn with_config_location(mut self, location: impl Into<String>) -> Self {
        self.config_locations.push(location.into());
        self
    }

    pub fn with_definition_source(self, source: impl BeanDefinitionSource + 'static) -> Self {
        self.with_shared_definition_source(Arc::new(source))
    }

    pub fn with_shared_definition_source(mut self, source: Arc<dyn BeanDefinitionSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_bean_factory_post_processor(mut self, processor: Arc<dyn BeanFactoryPostProcessor>) -> Self {
        self.bean_factory_post_processors.push(processor);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn ApplicationListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn RefreshHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// 创建尚未刷新的上下文
    pub fn build(self) -> ContainerResult<Arc<ApplicationContext>> {
        let resource_loader = self
            .resource_loader
            .unwrap_or_else(|| Arc::new(DefaultResourceLoader::new()));

        let mut sources: Vec<Arc<dyn BeanDefinitionSource>> = Vec::new();
        if !self.config_locations.is_empty() {
            let class_registry = match self.class_registry {
                Some(registry) => registry,
                None => Arc::new(ClassRegistry::from_submitted()?),
            };
            let reader = self
                .config_locations
                .into_iter()
                .fold(
                    TomlBeanDefinitionReader::new(class_registry).with_resource_loader(resource_loader.clone()),
                    |reader, location| reader.with_location(location),
                );
            sources.push(Arc::new(reader));
        }
        sources.extend(self.sources);

        let display_name = self.display_name;
        let post_processors = self.bean_factory_post_processors;
        let listeners = self.listeners;
        let hooks = self.hooks;

        Ok(Arc::new_cyclic(|self_ref| ApplicationContext {
            self_ref: self_ref.clone(),
            display_name,
            startup_date: RwLock::new(None),
            state: RwLock::new(ContextState::Unrefreshed),
            bean_factory: RwLock::new(None),
            resource_loader,
            sources,
            bean_factory_post_processors: RwLock::new(post_processors),
            application_listeners: RwLock::new(listeners),
            multicaster: RwLock::new(None),
            hooks,
        }))
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
