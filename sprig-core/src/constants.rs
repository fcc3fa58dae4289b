//! 容器常量

/// 通过名称获取 FactoryBean 本身时使用的前缀，例如 `&connectionFactory`
pub const FACTORY_BEAN_PREFIX: &str = "&";

/// 类路径资源前缀
pub const CLASSPATH_URL_PREFIX: &str = "classpath:";

/// 文件系统资源前缀
pub const FILE_URL_PREFIX: &str = "file:";

/// 额外类路径根目录的环境变量，多个目录按平台路径分隔符分隔
pub const CLASSPATH_ENV: &str = "SPRIG_CLASSPATH";

/// 默认上下文显示名称
pub const DEFAULT_CONTEXT_DISPLAY_NAME: &str = "sprig-application-context";

/// depends-on 列表的分隔符
pub const MULTI_VALUE_DELIMITERS: &[char] = &[',', ';', ' '];

/// 去掉 FactoryBean 前缀，返回 `(名称, 是否带前缀)`
pub fn transformed_bean_name(name: &str) -> (&str, bool) {
    match name.strip_prefix(FACTORY_BEAN_PREFIX) {
        Some(stripped) => (stripped, true),
        None => (name, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transformed_bean_name() {
        assert_eq!(transformed_bean_name("&factory"), ("factory", true));
        assert_eq!(transformed_bean_name("factory"), ("factory", false));
    }
}
