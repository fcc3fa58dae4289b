//! 应用启动器
//!
//! 初始化日志、构建上下文、校验依赖、刷新并报告启动耗时。

use std::sync::Arc;
use std::time::Instant;

use crate::bean_factory::{ConfigurableListableBeanFactory, DefaultListableBeanFactory};
use crate::class::ClassRegistry;
use crate::context::{ApplicationContext, RefreshHook};
use crate::error::ContainerResult;
use crate::event::ApplicationListener;
use crate::logging::LoggingConfig;
use crate::reader::BeanDefinitionSource;
use crate::resource::ResourceLoader;

type Initializer = Box<dyn Fn(&Arc<ApplicationContext>) -> ContainerResult<()> + Send + Sync>;

/// 在任何 Bean 创建之前检查 depends-on 图
struct DependencyValidation;

impl RefreshHook for DependencyValidation {
    fn post_process_bean_factory(&self, factory: &DefaultListableBeanFactory) -> ContainerResult<()> {
        factory.validate_dependencies()?;
        tracing::debug!("Dependency validation passed");
        Ok(())
    }
}

/// Sprig 应用
///
/// ```rust,ignore
/// let context = SprigApplication::new("demo")
///     .with_config_location("classpath:beans.toml")
///     .run()?;
/// ```
pub struct SprigApplication {
    name: String,

    config_locations: Vec<String>,

    class_registry: Option<Arc<ClassRegistry>>,

    resource_loader: Option<Arc<dyn ResourceLoader>>,

    sources: Vec<Arc<dyn BeanDefinitionSource>>,

    listeners: Vec<Arc<dyn ApplicationListener>>,

    show_banner: bool,

    /// `None` 表示从环境变量读取
    logging_config: Option<LoggingConfig>,

    init_logging: bool,

    validate_dependencies: bool,

    /// 在刷新之前执行
    initializers: Vec<Initializer>,
}

impl SprigApplication {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_locations: Vec::new(),
            class_registry: None,
            resource_loader: None,
            sources: Vec::new(),
            listeners: Vec::new(),
            show_banner: true,
            logging_config: None,
            init_logging: true,
            validate_dependencies: true,
            initializers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_config_location(mut self, location: impl Into<String>) -> Self {
        self.config_locations.push(location.into());
        self
    }

    pub fn with_class_registry(mut self, class_registry: Arc<ClassRegistry>) -> Self {
        self.class_registry = Some(class_registry);
        self
    }

    pub fn with_resource_loader(mut self, resource_loader: Arc<dyn ResourceLoader>) -> Self {
        self.resource_loader = Some(resource_loader);
        self
    }

    pub fn with_definition_source(mut self, source: impl BeanDefinitionSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn ApplicationListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn with_banner(mut self, show: bool) -> Self {
        self.show_banner = show;
        self
    }

    /// 不设置时使用 [`LoggingConfig::from_env`]
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// 不安装日志订阅者，由调用方自行处理
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    pub fn with_dependency_validation(mut self, enabled: bool) -> Self {
        self.validate_dependencies = enabled;
        self
    }

    pub fn with_initializer<F>(mut self, initializer: F) -> Self
    where
        F: Fn(&Arc<ApplicationContext>) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.initializers.push(Box::new(initializer));
        self
    }

    /// 启动应用，返回已刷新的上下文
    pub fn run(self) -> ContainerResult<Arc<ApplicationContext>> {
        if self.init_logging {
            let config = self.logging_config.clone().unwrap_or_else(LoggingConfig::from_env);
            config.init()?;
        }

        let started = Instant::now();
        if self.show_banner {
            self.print_banner();
        }
        tracing::info!("Starting {}", self.name);

        let mut builder = ApplicationContext::builder().with_display_name(self.name.clone());
        if let Some(loader) = self.resource_loader {
            builder = builder.with_resource_loader(loader);
        }
        if let Some(classes) = self.class_registry {
            builder = builder.with_class_registry(classes);
        }
        for location in self.config_locations {
            tracing::debug!("Configuration location: {}", location);
            builder = builder.with_config_location(location);
        }
        for source in self.sources {
            builder = builder.with_shared_definition_source(source);
        }
        for listener in self.listeners {
            builder = builder.with_listener(listener);
        }
        if self.validate_dependencies {
            builder = builder.with_hook(Arc::new(DependencyValidation));
        }

        let context = builder.build()?;
        for initializer in &self.initializers {
            initializer(&context)?;
        }

        context.refresh()?;
        tracing::info!("Started {} in {}ms", self.name, started.elapsed().as_millis());
        Ok(context)
    }

    fn print_banner(&self) {
        println!();
        println!(r"   ___           _       ");
        println!(r"  / __|_ __ _ _(_)__ _  ");
        println!(r"  \__ \ '_ \ '_| / _` | ");
        println!(r"  |___/ .__/_| |_\__, | ");
        println!(r"      |_|        |___/  ");
        println!();
        println!("  :: Sprig ::        (v{})", env!("CARGO_PKG_VERSION"));
        println!();
    }
}

impl Default for SprigApplication {
    fn default() -> Self {
        Self::new("SprigApplication")
    }
}
