//! Bean 定义注册表

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bean_definition::BeanDefinition;
use crate::constants::FACTORY_BEAN_PREFIX;
use crate::error::{ContainerError, ContainerResult};
use crate::value::TypeKey;

/// Bean 定义注册表接口
///
/// 配置来源通过它把 `(name, definition)` 交给容器。注册只追加、不覆盖。
pub trait BeanDefinitionRegistry: Send + Sync {
    /// 校验并注册定义，名称已存在时失败
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()>;

    fn get_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>>;

    /// 只检查定义是否存在，不会实例化
    fn contains_bean_definition(&self, name: &str) -> bool;

    /// 所有定义名称，按注册顺序
    fn get_bean_definition_names(&self) -> Vec<String>;

    /// 类型可赋值给 `filter` 的定义名称（`None` 时返回全部），按注册顺序
    fn get_bean_definition_names_for_type(&self, filter: Option<&TypeKey>) -> Vec<String>;

    fn get_bean_definition_count(&self) -> usize;
}

#[derive(Default)]
struct RegistryInner {
    definitions: HashMap<String, Arc<BeanDefinition>>,
    names: Vec<String>,
}

/// 默认注册表：名称到定义的映射，保留注册顺序
#[derive(Default)]
pub struct DefaultBeanDefinitionRegistry {
    inner: RwLock<RegistryInner>,
}

impl DefaultBeanDefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用新定义替换已存在的定义（保留原位置）
    pub(crate) fn replace_bean_definition(
        &self,
        name: &str,
        definition: BeanDefinition,
    ) -> ContainerResult<()> {
        definition.validate(name)?;
        let mut inner = self.inner.write();
        match inner.definitions.get_mut(name) {
            Some(slot) => {
                *slot = Arc::new(definition);
                Ok(())
            }
            None => Err(ContainerError::BeanNotFound(name.to_string())),
        }
    }

    /// 按注册顺序的名称和定义快照
    pub(crate) fn snapshot(&self) -> Vec<(String, Arc<BeanDefinition>)> {
        let inner = self.inner.read();
        inner
            .names
            .iter()
            .filter_map(|name| {
                inner
                    .definitions
                    .get(name)
                    .map(|def| (name.clone(), Arc::clone(def)))
            })
            .collect()
    }
}

impl BeanDefinitionRegistry for DefaultBeanDefinitionRegistry {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()> {
        if name.trim().is_empty() {
            return Err(ContainerError::invalid_definition(name, "bean name must not be empty"));
        }
        if name.starts_with(FACTORY_BEAN_PREFIX) {
            return Err(ContainerError::invalid_definition(
                name,
                format!("bean name must not start with '{}'", FACTORY_BEAN_PREFIX),
            ));
        }
        definition.validate(name)?;

        let mut inner = self.inner.write();
        if inner.definitions.contains_key(name) {
            tracing::warn!("Bean definition '{}' already exists, registration rejected", name);
            return Err(ContainerError::BeanAlreadyExists(name.to_string()));
        }
        inner.definitions.insert(name.to_string(), Arc::new(definition));
        inner.names.push(name.to_string());

        tracing::debug!("Bean definition registered: '{}'", name);
        Ok(())
    }

    fn get_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>> {
        self.inner
            .read()
            .definitions
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::BeanNotFound(name.to_string()))
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.inner.read().definitions.contains_key(name)
    }

    fn get_bean_definition_names(&self) -> Vec<String> {
        self.inner.read().names.clone()
    }

    fn get_bean_definition_names_for_type(&self, filter: Option<&TypeKey>) -> Vec<String> {
        let Some(key) = filter else {
            return self.get_bean_definition_names();
        };
        let inner = self.inner.read();
        inner
            .names
            .iter()
            .filter(|name| {
                inner
                    .definitions
                    .get(*name)
                    .map(|def| def.bean_class().is_assignable_to(key))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    fn get_bean_definition_count(&self) -> usize {
        self.inner.read().names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::BeanClass;
    use crate::value::TypeKey;

    trait Shape: Send + Sync {}

    #[derive(Default)]
    struct Circle;
    impl Shape for Circle {}

    #[derive(Default)]
    struct Label;

    fn circle() -> BeanDefinition {
        BeanDefinition::new(Arc::new(
            BeanClass::builder::<Circle>("Circle")
                .default_constructor()
                .implements::<dyn Shape>(|c| c as &dyn Shape, |c| c as &mut dyn Shape)
                .build(),
        ))
    }

    fn label() -> BeanDefinition {
        BeanDefinition::new(Arc::new(
            BeanClass::builder::<Label>("Label").default_constructor().build(),
        ))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = DefaultBeanDefinitionRegistry::new();
        registry.register_bean_definition("circle", circle()).unwrap();

        assert!(registry.contains_bean_definition("circle"));
        assert_eq!(registry.get_bean_definition_count(), 1);
        assert_eq!(registry.get_bean_definition("circle").unwrap().bean_class().name(), "Circle");
        assert!(matches!(
            registry.get_bean_definition("square"),
            Err(ContainerError::BeanNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_keeps_first_definition() {
        let registry = DefaultBeanDefinitionRegistry::new();
        registry.register_bean_definition("thing", circle()).unwrap();

        let err = registry.register_bean_definition("thing", label()).unwrap_err();
        assert!(matches!(err, ContainerError::BeanAlreadyExists(name) if name == "thing"));
        assert_eq!(registry.get_bean_definition("thing").unwrap().bean_class().name(), "Circle");
        assert_eq!(registry.get_bean_definition_count(), 1);
    }

    #[test]
    fn test_names_for_type_in_registration_order() {
        let registry = DefaultBeanDefinitionRegistry::new();
        registry.register_bean_definition("b", circle()).unwrap();
        registry.register_bean_definition("label", label()).unwrap();
        registry.register_bean_definition("a", circle()).unwrap();

        assert_eq!(registry.get_bean_definition_names(), vec!["b", "label", "a"]);
        assert_eq!(
            registry.get_bean_definition_names_for_type(Some(&TypeKey::of::<dyn Shape>())),
            vec!["b", "a"]
        );
        assert_eq!(
            registry.get_bean_definition_names_for_type(Some(&TypeKey::of::<Label>())),
            vec!["label"]
        );
        assert_eq!(registry.get_bean_definition_names_for_type(None).len(), 3);
    }

    #[test]
    fn test_invalid_names_and_definitions_are_rejected() {
        let registry = DefaultBeanDefinitionRegistry::new();
        assert!(registry.register_bean_definition("", circle()).is_err());
        assert!(registry.register_bean_definition("&circle", circle()).is_err());

        let invalid = circle().with_singleton(false).with_lazy_init(true);
        assert!(registry.register_bean_definition("circle", invalid).is_err());
        assert!(!registry.contains_bean_definition("circle"));
    }

    #[test]
    fn test_replace_keeps_position() {
        let registry = DefaultBeanDefinitionRegistry::new();
        registry.register_bean_definition("a", circle()).unwrap();
        registry.register_bean_definition("b", circle()).unwrap();
        registry.replace_bean_definition("a", label()).unwrap();

        assert_eq!(registry.get_bean_definition_names(), vec!["a", "b"]);
        assert_eq!(registry.get_bean_definition("a").unwrap().bean_class().name(), "Label");
        assert!(registry.replace_bean_definition("zzz", label()).is_err());
    }
}
