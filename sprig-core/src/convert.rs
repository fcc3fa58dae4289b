//! 类型转换
//!
//! 容器在每次属性赋值和构造参数传递前调用 [`TypeConverter`]，
//! 自身不实现任何转换逻辑。[`DefaultTypeConverter`] 处理字面量之间的转换、
//! Bean 可赋值性检查和逐元素的列表转换；文本到特定 Bean 类型的转换
//! 通过 [`CustomConverter`] 扩展。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bean_factory::{ConfigurableBeanFactory, DefaultListableBeanFactory};
use crate::error::{ContainerError, ContainerResult};
use crate::lifecycle::BeanFactoryPostProcessor;
use crate::value::{TypeKey, Value, ValueType};

/// 类型转换服务
pub trait TypeConverter: Send + Sync {
    /// 把已解析的值转换为目标类型
    fn convert(&self, value: Value, target: &ValueType) -> ContainerResult<Value>;
}

/// 把文本转换为某个 Bean 类型的值
///
/// 类似 Spring 的 PropertyEditor#setAsText
pub trait CustomConverter: Send + Sync {
    fn convert_from_text(&self, text: &str) -> ContainerResult<Value>;
}

/// 可以登记自定义转换器的对象
pub trait ConverterRegistry {
    fn register_custom_converter(&self, target: TypeKey, converter: Arc<dyn CustomConverter>);
}

/// 一次登记多个自定义转换器
///
/// 类似 Spring 的 PropertyEditorRegistrar
pub trait ConverterRegistrar: Send + Sync {
    fn register_custom_converters(&self, registry: &dyn ConverterRegistry);
}

/// 默认转换器
///
/// - 字符串 → 整数/浮点数/布尔值（`true/false/on/off/yes/no/1/0`）
/// - 数值/布尔值 → 字符串
/// - 整数 → 浮点数
/// - 列表逐元素转换；逗号分隔的字符串可以转换为列表
/// - Bean 必须可赋值给目标类型；字符串可通过自定义转换器转换为 Bean
#[derive(Default)]
pub struct DefaultTypeConverter {
    custom: RwLock<HashMap<TypeKey, Arc<dyn CustomConverter>>>,
}

impl DefaultTypeConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_custom_converter(&self, target: &TypeKey) -> bool {
        self.custom.read().contains_key(target)
    }

    fn convert_bool(value: Value) -> ContainerResult<Value> {
        match value {
            Value::Bool(_) => Ok(value),
            Value::Int(0) => Ok(Value::Bool(false)),
            Value::Int(1) => Ok(Value::Bool(true)),
            Value::Str(ref text) => match text.trim().to_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Ok(Value::Bool(true)),
                "false" | "off" | "no" | "0" => Ok(Value::Bool(false)),
                _ => Err(ContainerError::conversion(
                    value.describe(),
                    "bool",
                    "not a boolean literal",
                )),
            },
            other => Err(Self::unsupported(&other, &ValueType::Bool)),
        }
    }

    fn convert_int(value: Value) -> ContainerResult<Value> {
        match value {
            Value::Int(_) => Ok(value),
            Value::Str(ref text) => text
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| ContainerError::conversion(value.describe(), "int", e.to_string())),
            other => Err(Self::unsupported(&other, &ValueType::Int)),
        }
    }

    fn convert_float(value: Value) -> ContainerResult<Value> {
        match value {
            Value::Float(_) => Ok(value),
            Value::Int(i) => Ok(Value::Float(i as f64)),
            Value::Str(ref text) => text
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| ContainerError::conversion(value.describe(), "float", e.to_string())),
            other => Err(Self::unsupported(&other, &ValueType::Float)),
        }
    }

    fn convert_str(value: Value) -> ContainerResult<Value> {
        match value {
            Value::Str(_) | Value::Null => Ok(value),
            Value::Int(i) => Ok(Value::Str(i.to_string())),
            Value::Float(f) => Ok(Value::Str(f.to_string())),
            Value::Bool(b) => Ok(Value::Str(b.to_string())),
            other => Err(Self::unsupported(&other, &ValueType::Str)),
        }
    }

    fn convert_bean(&self, value: Value, key: &TypeKey) -> ContainerResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Bean(bean) if bean.is_assignable_to(key) => Ok(Value::Bean(bean)),
            Value::Bean(ref bean) => Err(ContainerError::conversion(
                value.describe(),
                key.short_name(),
                format!("'{}' is not assignable to '{}'", bean.type_name(), key.short_name()),
            )),
            Value::Str(ref text) => {
                let converter = self.custom.read().get(key).cloned();
                match converter {
                    Some(converter) => {
                        let converted = converter.convert_from_text(text)?;
                        match &converted {
                            Value::Bean(bean) if bean.is_assignable_to(key) => Ok(converted),
                            _ => Err(ContainerError::conversion(
                                value.describe(),
                                key.short_name(),
                                format!("custom converter produced {}", converted.describe()),
                            )),
                        }
                    }
                    None => Err(ContainerError::conversion(
                        value.describe(),
                        key.short_name(),
                        "no custom converter registered for this type",
                    )),
                }
            }
            other => Err(Self::unsupported(&other, &ValueType::Bean(*key))),
        }
    }

    fn convert_list(&self, value: Value, element: &ValueType) -> ContainerResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Seq(items) => items
                .into_iter()
                .map(|item| self.convert(item, element))
                .collect::<ContainerResult<Vec<_>>>()
                .map(Value::Seq),
            Value::Str(text) if element.is_simple() => text
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| self.convert(Value::Str(part.to_string()), element))
                .collect::<ContainerResult<Vec<_>>>()
                .map(Value::Seq),
            other => Err(Self::unsupported(&other, &ValueType::List(Box::new(element.clone())))),
        }
    }

    fn unsupported(value: &Value, target: &ValueType) -> ContainerError {
        ContainerError::conversion(
            value.describe(),
            target.name(),
            format!("cannot convert a {} value", value.kind()),
        )
    }
}

impl TypeConverter for DefaultTypeConverter {
    fn convert(&self, value: Value, target: &ValueType) -> ContainerResult<Value> {
        if value.needs_resolution() {
            return Err(ContainerError::conversion(
                value.describe(),
                target.name(),
                "value must be resolved before conversion",
            ));
        }
        match target {
            ValueType::Any => Ok(value),
            ValueType::Bool | ValueType::Int | ValueType::Float if value.is_null() => Err(
                ContainerError::conversion("null", target.name(), "primitive property cannot be null"),
            ),
            ValueType::Bool => Self::convert_bool(value),
            ValueType::Int => Self::convert_int(value),
            ValueType::Float => Self::convert_float(value),
            ValueType::Str => Self::convert_str(value),
            ValueType::Bean(key) => self.convert_bean(value, key),
            ValueType::List(element) => self.convert_list(value, element),
        }
    }
}

impl ConverterRegistry for DefaultTypeConverter {
    fn register_custom_converter(&self, target: TypeKey, converter: Arc<dyn CustomConverter>) {
        tracing::debug!("Registered custom converter for type '{}'", target.short_name());
        self.custom.write().insert(target, converter);
    }
}

impl fmt::Debug for DefaultTypeConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets: Vec<_> = self.custom.read().keys().map(|k| k.short_name()).collect();
        f.debug_struct("DefaultTypeConverter")
            .field("custom_converters", &targets)
            .finish()
    }
}

/// 在容器刷新时安装转换器登记器的 BeanFactory 后置处理器
///
/// 类似 Spring 的 CustomEditorConfigurer
#[derive(Default)]
pub struct CustomConverterConfigurer {
    registrars: Vec<Arc<dyn ConverterRegistrar>>,
    converters: Vec<(TypeKey, Arc<dyn CustomConverter>)>,
}

impl CustomConverterConfigurer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registrar(mut self, registrar: Arc<dyn ConverterRegistrar>) -> Self {
        self.registrars.push(registrar);
        self
    }

    pub fn with_converter(mut self, target: TypeKey, converter: Arc<dyn CustomConverter>) -> Self {
        self.converters.push((target, converter));
        self
    }

    pub fn add_registrar(&mut self, registrar: Arc<dyn ConverterRegistrar>) {
        self.registrars.push(registrar);
    }
}

impl BeanFactoryPostProcessor for CustomConverterConfigurer {
    fn post_process_bean_factory(&self, factory: &DefaultListableBeanFactory) -> ContainerResult<()> {
        for registrar in &self.registrars {
            factory.add_converter_registrar(Arc::clone(registrar));
        }
        for (target, converter) in &self.converters {
            factory.register_custom_converter(*target, Arc::clone(converter));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "CustomConverterConfigurer"
    }
}
