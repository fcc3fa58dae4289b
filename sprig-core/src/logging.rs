//! 日志初始化
//!
//! 容器内部只使用 `tracing` 宏，是否输出、输出到哪里由应用决定。
//! [`LoggingConfig::init`] 安装一个全局的 `tracing-subscriber`。

use std::fmt;
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, EnvFilter};

use crate::error::{ContainerError, ContainerResult};

/// 全局过滤器，优先级最高
pub const RUST_LOG_ENV: &str = "RUST_LOG";

pub const LOG_LEVEL_ENV: &str = "SPRIG_LOG_LEVEL";

pub const LOG_FORMAT_ENV: &str = "SPRIG_LOG_FORMAT";

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 紧凑格式（默认）
    Compact,
    /// 带时间、级别、目标的完整格式
    Full,
    /// 每行一个 JSON 对象
    Json,
    /// 多行美化格式，适合开发
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "full" => Ok(LogFormat::Full),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogFormat::Compact => "compact",
            LogFormat::Full => "full",
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        };
        f.write_str(name)
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,

    pub format: LogFormat,

    /// 是否显示目标（模块路径）
    pub show_target: bool,

    pub show_thread_ids: bool,

    pub show_thread_names: bool,

    /// 自定义过滤器，例如 `"sprig_core=debug,app_demo=info"`
    ///
    /// 设置后忽略 `level`
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
            show_thread_names: false,
            filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    pub fn with_thread_ids(mut self, show: bool) -> Self {
        self.show_thread_ids = show;
        self
    }

    pub fn with_thread_names(mut self, show: bool) -> Self {
        self.show_thread_names = show;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// 从 `RUST_LOG`、`SPRIG_LOG_LEVEL`、`SPRIG_LOG_FORMAT` 读取配置
    ///
    /// 无法识别的值会被忽略
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(filter) = lookup(RUST_LOG_ENV).filter(|f| !f.trim().is_empty()) {
            config.filter = Some(filter);
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV).and_then(|v| v.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV).and_then(|v| v.parse().ok()) {
            config.format = format;
        }

        config
    }

    /// 自定义过滤器无效时退回到配置的级别
    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.to_string());
        match &self.filter {
            Some(filter) => EnvFilter::try_new(filter).unwrap_or_else(|e| {
                eprintln!("Ignoring invalid log filter '{}': {}", filter, e);
                fallback()
            }),
            None => fallback(),
        }
    }

    /// 安装全局订阅者
    ///
    /// 已经安装过订阅者时返回 `LoggingInit` 错误
    pub fn init(self) -> ContainerResult<()> {
        let env_filter = self.env_filter();
        let builder = subscriber_fmt()
            .with_env_filter(env_filter)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_thread_names(self.show_thread_names);

        let installed = match self.format {
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Full => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
        };
        installed.map_err(|e| ContainerError::LoggingInit(e.to_string()))?;

        tracing::debug!("Logging initialised: level={}, format={}", self.level, self.format);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!(" DEBUG ".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Full.to_string(), "full");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (RUST_LOG_ENV, "sprig_core=trace"),
            (LOG_LEVEL_ENV, "warn"),
            (LOG_FORMAT_ENV, "nonsense"),
        ]
        .into_iter()
        .collect();
        let config = LoggingConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.filter.as_deref(), Some("sprig_core=trace"));
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn test_builder() {
        let config = LoggingConfig::new()
            .with_level(LogLevel::Debug)
            .with_format(LogFormat::Json)
            .with_target(true)
            .with_filter("app_demo=info");

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.show_target);
        assert!(!config.show_thread_ids);
        assert_eq!(config.filter.as_deref(), Some("app_demo=info"));
    }
}
