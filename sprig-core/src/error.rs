//! 容器错误类型
//!
//! 容器内所有失败都归入 [`ContainerError`]。容器自身检测到的问题（找不到定义、
//! 自动装配歧义、类型不匹配等）原样向上传播；用户回调（构造函数、setter、
//! 初始化方法）抛出的错误会被包装进 [`ContainerError::BeanCreationFailed`]，
//! 以便调用方知道是哪个 Bean 出了问题。

use thiserror::Error;

/// 容器错误
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("No bean named '{0}' is defined")]
    BeanNotFound(String),

    #[error("Bean definition '{0}' already exists")]
    BeanAlreadyExists(String),

    #[error("Invalid bean definition '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },

    #[error("Bean class '{0}' is not registered")]
    ClassNotFound(String),

    #[error(
        "Ambiguous autowiring of {target} for bean '{bean}': expected a single bean of type '{required_type}' but found {candidates:?}"
    )]
    AmbiguousAutowire {
        bean: String,
        target: String,
        required_type: String,
        candidates: Vec<String>,
    },

    #[error("No bean of type '{required_type}' available to autowire {target} of bean '{bean}'")]
    NoMatch {
        bean: String,
        target: String,
        required_type: String,
    },

    #[error("No viable constructor for bean '{bean}': {reason}")]
    NoViableConstructor { bean: String, reason: String },

    #[error("Bean '{name}' is of type '{found}' but '{expected}' was required")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Cannot convert {value} to '{target}': {reason}")]
    Conversion {
        value: String,
        target: String,
        reason: String,
    },

    #[error("Bean '{0}' is not a FactoryBean")]
    NotAFactory(String),

    #[error("FactoryBean '{name}' failed to produce an object: {reason}")]
    FactoryProduce { name: String, reason: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Error creating bean '{name}': {source}")]
    BeanCreationFailed {
        name: String,
        #[source]
        source: Box<ContainerError>,
    },

    #[error("Error destroying bean '{name}': {source}")]
    BeanDestructionFailed {
        name: String,
        #[source]
        source: Box<ContainerError>,
    },

    #[error("Dependency validation failed: {0}")]
    DependencyValidationFailed(String),

    #[error("Illegal container state: {0}")]
    IllegalState(String),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Resource '{location}' cannot be read: {reason}")]
    Resource { location: String, reason: String },

    #[error("Failed to parse bean definitions from '{location}': {reason}")]
    DefinitionParse { location: String, reason: String },

    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ContainerError {
    pub fn invalid_definition(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn conversion(
        value: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            value: value.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// 把用户回调的错误包装为创建失败
    ///
    /// 已经是创建失败的错误不会被重复包装。
    pub fn creation_failed(name: impl Into<String>, source: ContainerError) -> Self {
        match source {
            err @ Self::BeanCreationFailed { .. } => err,
            other => Self::BeanCreationFailed {
                name: name.into(),
                source: Box::new(other),
            },
        }
    }

    /// 剥离创建/销毁包装，返回最内层的容器错误
    pub fn root_cause(&self) -> &ContainerError {
        match self {
            Self::BeanCreationFailed { source, .. } | Self::BeanDestructionFailed { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

/// 容器操作的结果类型
pub type ContainerResult<T> = Result<T, ContainerError>;
