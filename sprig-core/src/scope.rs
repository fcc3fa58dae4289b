use std::fmt;
use std::str::FromStr;

/// Bean 的作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// 单例模式 - 容器中只有一个共享实例，首次获取时创建并缓存
    #[default]
    Singleton,

    /// 原型模式 - 每次请求都创建新实例，不进入单例缓存
    Prototype,
}

impl Scope {
    pub fn is_singleton(self) -> bool {
        self == Scope::Singleton
    }

    pub fn is_prototype(self) -> bool {
        self == Scope::Prototype
    }
}

impl From<bool> for Scope {
    /// `true` 表示单例
    fn from(singleton: bool) -> Self {
        if singleton {
            Scope::Singleton
        } else {
            Scope::Prototype
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "singleton" => Ok(Scope::Singleton),
            "prototype" => Ok(Scope::Prototype),
            _ => Err(format!("Invalid bean scope: {}", s)),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => write!(f, "singleton"),
            Scope::Prototype => write!(f, "prototype"),
        }
    }
}
