//! TOML Bean 定义读取器
//!
//! ```toml
//! [[bean]]
//! id = "country"
//! class = "Country"
//! autowire = "byType"
//! depends-on = "capital, registry"
//!
//! [[bean.property]]
//! name = "name"
//! value = "China"
//!
//! [[bean.property]]
//! name = "neighbours"
//! list = ["Mongolia", { ref = "russia" }, [1, 2]]
//!
//! [[bean.constructor-arg]]
//! index = 0
//! type = "int"
//! value = 42
//! ```

use std::sync::Arc;

use serde::Deserialize;

use crate::bean_definition::{AutowireMode, BeanDefinition};
use crate::class::ClassRegistry;
use crate::constants::MULTI_VALUE_DELIMITERS;
use crate::error::{ContainerError, ContainerResult};
use crate::property::{ConstructorArgumentValues, MutablePropertyValues, ValueHolder};
use crate::registry::BeanDefinitionRegistry;
use crate::resource::{DefaultResourceLoader, Resource, ResourceLoader};
use crate::utils::naming::{split_names, to_camel_case};
use crate::value::{ManagedList, Value};

/// Bean 定义来源
///
/// 把定义注册进注册表，返回注册的数量。
/// 闭包 `Fn(&dyn BeanDefinitionRegistry) -> ContainerResult<usize>` 也是来源。
pub trait BeanDefinitionSource: Send + Sync {
    fn load_bean_definitions(&self, registry: &dyn BeanDefinitionRegistry) -> ContainerResult<usize>;

    fn description(&self) -> String {
        "programmatic bean definitions".to_string()
    }
}

impl<F> BeanDefinitionSource for F
where
    F: Fn(&dyn BeanDefinitionRegistry) -> ContainerResult<usize> + Send + Sync,
{
    fn load_bean_definitions(&self, registry: &dyn BeanDefinitionRegistry) -> ContainerResult<usize> {
        self(registry)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BeansDocument {
    #[serde(default, rename = "bean")]
    beans: Vec<BeanElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct BeanElement {
    id: Option<String>,
    class: String,
    singleton: Option<bool>,
    lazy_init: Option<bool>,
    autowire: Option<String>,
    depends_on: Option<DependsOn>,
    init_method: Option<String>,
    destroy_method: Option<String>,
    #[serde(default, rename = "property")]
    properties: Vec<PropertyElement>,
    #[serde(default, rename = "constructor-arg")]
    constructor_args: Vec<ConstructorArgElement>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependsOn {
    Delimited(String),
    Names(Vec<String>),
}

/// `value` / `ref` / `list` / `null` 四选一
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ValueElement {
    value: Option<toml::Value>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    list: Option<Vec<toml::Value>>,
    null: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropertyElement {
    name: String,
    value: Option<toml::Value>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    list: Option<Vec<toml::Value>>,
    null: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstructorArgElement {
    index: Option<usize>,
    #[serde(rename = "type")]
    type_name: Option<String>,
    value: Option<toml::Value>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    list: Option<Vec<toml::Value>>,
    null: Option<bool>,
}

/// 从 TOML 资源读取 Bean 定义
pub struct TomlBeanDefinitionReader {
    class_registry: Arc<ClassRegistry>,
    resource_loader: Arc<dyn ResourceLoader>,
    locations: Vec<String>,
}

impl TomlBeanDefinitionReader {
    pub fn new(class_registry: Arc<ClassRegistry>) -> Self {
        Self {
            class_registry,
            resource_loader: Arc::new(DefaultResourceLoader::new()),
            locations: Vec::new(),
        }
    }

    pub fn with_resource_loader(mut self, resource_loader: Arc<dyn ResourceLoader>) -> Self {
        self.resource_loader = resource_loader;
        self
    }

    /// 添加配置位置，例如 `classpath:beans.toml`
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.locations.push(location.into());
        self
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// 读取单个资源
    pub fn load_resource(
        &self,
        resource: &dyn Resource,
        registry: &dyn BeanDefinitionRegistry,
    ) -> ContainerResult<usize> {
        tracing::debug!("Loading bean definitions from {}", resource.description());
        let content = resource.read_to_string()?;
        self.load_from_str(&content, &resource.description(), registry)
    }

    /// 解析 TOML 文本并注册其中的定义
    pub fn load_from_str(
        &self,
        content: &str,
        location: &str,
        registry: &dyn BeanDefinitionRegistry,
    ) -> ContainerResult<usize> {
        let document: BeansDocument = toml::from_str(content).map_err(|e| ContainerError::DefinitionParse {
            location: location.to_string(),
            reason: e.to_string(),
        })?;

        let mut count = 0;
        for element in document.beans {
            let name = element
                .id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| default_bean_name(&element.class));
            let definition = self.parse_bean_element(&name, element, location)?;
            registry.register_bean_definition(&name, definition)?;
            count += 1;
        }

        tracing::info!("Loaded {} bean definition(s) from {}", count, location);
        Ok(count)
    }

    fn parse_bean_element(
        &self,
        name: &str,
        element: BeanElement,
        location: &str,
    ) -> ContainerResult<BeanDefinition> {
        let parse_error = |reason: String| ContainerError::DefinitionParse {
            location: location.to_string(),
            reason: format!("bean '{}': {}", name, reason),
        };

        let class = self.class_registry.resolve(&element.class)?;
        let mut definition = BeanDefinition::new(class);

        if let Some(singleton) = element.singleton {
            definition = definition.with_singleton(singleton);
        }
        if let Some(lazy_init) = element.lazy_init {
            definition = definition.with_lazy_init(lazy_init);
        }
        if let Some(autowire) = element.autowire {
            let mode = autowire
                .parse::<AutowireMode>()
                .map_err(|e| parse_error(format!("invalid autowire '{}': {}", autowire, e)))?;
            definition = definition.with_autowire_mode(mode);
        }
        if let Some(depends_on) = element.depends_on {
            let names = match depends_on {
                DependsOn::Delimited(text) => split_names(&text, MULTI_VALUE_DELIMITERS),
                DependsOn::Names(names) => names,
            };
            definition = definition.with_depends_on(names);
        }
        if let Some(method) = element.init_method {
            definition = definition.with_init_method(method);
        }
        if let Some(method) = element.destroy_method {
            definition = definition.with_destroy_method(method);
        }

        let mut properties = MutablePropertyValues::new();
        for property in element.properties {
            let target = format!("property '{}'", property.name);
            let value = ValueElement {
                value: property.value,
                reference: property.reference,
                list: property.list,
                null: property.null,
            };
            let value = parse_value_element(value).map_err(|reason| parse_error(format!("{}: {}", target, reason)))?;
            properties.add(property.name, value);
        }

        let mut arguments = ConstructorArgumentValues::new();
        for argument in element.constructor_args {
            let target = match argument.index {
                Some(index) => format!("constructor-arg {}", index),
                None => "constructor-arg".to_string(),
            };
            let value = ValueElement {
                value: argument.value,
                reference: argument.reference,
                list: argument.list,
                null: argument.null,
            };
            let value = parse_value_element(value).map_err(|reason| parse_error(format!("{}: {}", target, reason)))?;
            let holder = match argument.type_name {
                Some(type_name) => ValueHolder::typed(value, type_name),
                None => ValueHolder::new(value),
            };
            match argument.index {
                Some(index) => {
                    if arguments.indexed_argument_values().contains_key(&index) {
                        return Err(parse_error(format!("duplicate constructor-arg index {}", index)));
                    }
                    arguments.add_indexed_argument_value(index, holder);
                }
                None => arguments.add_generic_argument_value(holder),
            }
        }

        Ok(definition
            .with_property_values(properties)
            .with_constructor_argument_values(arguments))
    }
}

impl BeanDefinitionSource for TomlBeanDefinitionReader {
    fn load_bean_definitions(&self, registry: &dyn BeanDefinitionRegistry) -> ContainerResult<usize> {
        let mut total = 0;
        for location in &self.locations {
            let resource = self.resource_loader.get_resource(location)?;
            total += self.load_resource(resource.as_ref(), registry)?;
        }
        Ok(total)
    }

    fn description(&self) -> String {
        format!("TOML bean definitions {:?}", self.locations)
    }
}

/// 类名最后一段的 camelCase 形式
fn default_bean_name(class_name: &str) -> String {
    let short = class_name
        .rsplit(|c| c == ':' || c == '.')
        .next()
        .unwrap_or(class_name);
    to_camel_case(short)
}

fn parse_value_element(element: ValueElement) -> Result<Value, String> {
    let ValueElement {
        value,
        reference,
        list,
        null,
    } = element;

    let given = [value.is_some(), reference.is_some(), list.is_some(), null.is_some()]
        .iter()
        .filter(|present| **present)
        .count();
    if given != 1 {
        return Err("exactly one of 'value', 'ref', 'list' or 'null' is required".to_string());
    }

    if let Some(value) = value {
        return literal_value(value);
    }
    if let Some(reference) = reference {
        if reference.trim().is_empty() {
            return Err("'ref' must name a bean".to_string());
        }
        return Ok(Value::reference(reference));
    }
    if let Some(items) = list {
        return managed_list(items).map(Value::List);
    }
    match null {
        Some(true) => Ok(Value::Null),
        _ => Err("'null' may only be set to true".to_string()),
    }
}

fn literal_value(value: toml::Value) -> Result<Value, String> {
    match value {
        toml::Value::String(s) => Ok(Value::Str(s)),
        toml::Value::Integer(i) => Ok(Value::Int(i)),
        toml::Value::Float(f) => Ok(Value::Float(f)),
        toml::Value::Boolean(b) => Ok(Value::Bool(b)),
        toml::Value::Datetime(dt) => Ok(Value::Str(dt.to_string())),
        toml::Value::Array(items) => managed_list(items).map(Value::List),
        toml::Value::Table(table) => {
            let element = toml::Value::Table(table)
                .try_into::<ValueElement>()
                .map_err(|e| format!("invalid value table: {}", e))?;
            parse_value_element(element)
        }
    }
}

fn managed_list(items: Vec<toml::Value>) -> Result<ManagedList, String> {
    items.into_iter().map(literal_value).collect()
}
