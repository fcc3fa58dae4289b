//! 值模型
//!
//! Bean 定义里保存的是“原始值”：字面量、对其他 Bean 的引用标记
//! （[`RuntimeBeanReference`]）以及有序列表标记（[`ManagedList`]）。
//! 引用和列表在创建 Bean 时才被解析成“已解析值”（[`Value::Bean`] / [`Value::Seq`]），
//! 定义本身永远不保存解析结果，因此同一定义可以反复用于原型实例化。

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::bean::BeanRef;
use crate::error::{ContainerError, ContainerResult};

/// 类型标识：`TypeId` 加上可读的类型名
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 完整类型路径，例如 `dyn sprig_core::bean::FactoryBean`
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 去掉模块路径和 `dyn ` 前缀后的类型名
    pub fn short_name(&self) -> &'static str {
        let name = self.name.trim_start_matches("dyn ");
        let base = name.split('<').next().unwrap_or(name);
        match base.rfind("::") {
            Some(idx) => &name[idx + 2..],
            None => name,
        }
    }

    /// 按完整路径或短名匹配声明的类型名
    pub fn matches_name(&self, type_name: &str) -> bool {
        let type_name = type_name.trim();
        type_name == self.name || type_name == self.short_name()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// 属性或构造函数参数的声明类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Str,
    /// 可赋值给该类型（自身类型或声明实现的接口）的 Bean
    Bean(TypeKey),
    List(Box<ValueType>),
    /// 不做任何转换
    Any,
}

impl ValueType {
    pub fn bean<T: ?Sized + 'static>() -> Self {
        ValueType::Bean(TypeKey::of::<T>())
    }

    pub fn list_of(element: ValueType) -> Self {
        ValueType::List(Box::new(element))
    }

    /// 简单类型（基本类型和字符串）不参与自动装配
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            ValueType::Bool | ValueType::Int | ValueType::Float | ValueType::Str
        )
    }

    pub fn name(&self) -> String {
        match self {
            ValueType::Bool => "bool".to_string(),
            ValueType::Int => "int".to_string(),
            ValueType::Float => "float".to_string(),
            ValueType::Str => "string".to_string(),
            ValueType::Bean(key) => key.short_name().to_string(),
            ValueType::List(element) => format!("list<{}>", element.name()),
            ValueType::Any => "any".to_string(),
        }
    }

    /// 构造参数上声明的 `type` 是否指向本类型
    pub fn matches_name(&self, type_name: &str) -> bool {
        let lowered = type_name.trim().to_lowercase();
        match self {
            ValueType::Bool => matches!(lowered.as_str(), "bool" | "boolean"),
            ValueType::Int => matches!(
                lowered.as_str(),
                "int" | "integer" | "long" | "i32" | "i64" | "u32" | "u64" | "usize"
            ),
            ValueType::Float => matches!(lowered.as_str(), "float" | "double" | "f32" | "f64"),
            ValueType::Str => matches!(lowered.as_str(), "string" | "str"),
            ValueType::Bean(key) => key.matches_name(type_name),
            ValueType::List(_) => matches!(lowered.as_str(), "list" | "array" | "vec"),
            ValueType::Any => matches!(lowered.as_str(), "any" | "object"),
        }
    }

    /// 已解析值是否已经是本类型的实例（无需转换）
    pub fn is_instance(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueType::Any, _) => true,
            (ValueType::Bool, Value::Bool(_))
            | (ValueType::Int, Value::Int(_))
            | (ValueType::Float, Value::Float(_))
            | (ValueType::Str, Value::Str(_)) => true,
            (ValueType::Bean(key), Value::Bean(bean)) => bean.is_assignable_to(key),
            (ValueType::List(element), Value::Seq(items)) => {
                items.iter().all(|item| element.is_instance(item))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// 对另一个 Bean 的引用标记，创建时按名称解析
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeBeanReference {
    bean_name: String,
}

impl RuntimeBeanReference {
    pub fn new(bean_name: impl Into<String>) -> Self {
        Self {
            bean_name: bean_name.into(),
        }
    }

    pub fn bean_name(&self) -> &str {
        &self.bean_name
    }
}

impl fmt::Display for RuntimeBeanReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.bean_name)
    }
}

/// 有序值列表标记，元素可以是引用或嵌套列表
#[derive(Debug, Clone, Default)]
pub struct ManagedList {
    elements: Vec<Value>,
}

impl ManagedList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.elements.push(value.into());
        self
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.elements.push(value.into());
    }

    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl FromIterator<Value> for ManagedList {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

/// 容器中流转的值
///
/// `Ref` 和 `List` 只出现在定义里（原始值）；`Bean` 和 `Seq` 是它们解析后的形式。
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Ref(RuntimeBeanReference),
    List(ManagedList),
    Bean(BeanRef),
    Seq(Vec<Value>),
}

impl Value {
    pub fn reference(bean_name: impl Into<String>) -> Self {
        Value::Ref(RuntimeBeanReference::new(bean_name))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Ref(_) => "bean reference",
            Value::List(_) => "managed list",
            Value::Bean(_) => "bean",
            Value::Seq(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 是否还包含需要第二轮解析的标记
    pub fn needs_resolution(&self) -> bool {
        match self {
            Value::Ref(_) | Value::List(_) => true,
            Value::Seq(items) => items.iter().any(Value::needs_resolution),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bean(&self) -> Option<&BeanRef> {
        match self {
            Value::Bean(bean) => Some(bean),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_bool(self) -> ContainerResult<bool> {
        self.as_bool().ok_or_else(|| self.unexpected("bool"))
    }

    pub fn into_i64(self) -> ContainerResult<i64> {
        self.as_i64().ok_or_else(|| self.unexpected("int"))
    }

    pub fn into_f64(self) -> ContainerResult<f64> {
        self.as_f64().ok_or_else(|| self.unexpected("float"))
    }

    pub fn into_string(self) -> ContainerResult<String> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.unexpected("string")),
        }
    }

    pub fn into_bean(self) -> ContainerResult<BeanRef> {
        match self {
            Value::Bean(bean) => Ok(bean),
            other => Err(other.unexpected("bean")),
        }
    }

    /// `Null` 映射为 `None`，便于可选依赖的 setter
    pub fn into_optional_bean(self) -> ContainerResult<Option<BeanRef>> {
        match self {
            Value::Null => Ok(None),
            other => other.into_bean().map(Some),
        }
    }

    pub fn into_seq(self) -> ContainerResult<Vec<Value>> {
        match self {
            Value::Seq(items) => Ok(items),
            other => Err(other.unexpected("list")),
        }
    }

    /// 用于错误信息的简短描述
    pub fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => format!("\"{}\"", s),
            Value::Ref(r) => r.to_string(),
            Value::List(list) => format!("list of {} element(s)", list.len()),
            Value::Bean(bean) => format!("bean of type '{}'", bean.type_name()),
            Value::Seq(items) => format!("list of {} element(s)", items.len()),
        }
    }

    fn unexpected(&self, expected: &str) -> ContainerError {
        ContainerError::conversion(self.describe(), expected, format!("value is a {}", self.kind()))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<RuntimeBeanReference> for Value {
    fn from(v: RuntimeBeanReference) -> Self {
        Value::Ref(v)
    }
}

impl From<ManagedList> for Value {
    fn from(v: ManagedList) -> Self {
        Value::List(v)
    }
}

impl From<BeanRef> for Value {
    fn from(v: BeanRef) -> Self {
        Value::Bean(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter {}
    struct Plain;

    #[test]
    fn test_type_key_short_name() {
        let key = TypeKey::of::<Plain>();
        assert_eq!(key.short_name(), "Plain");
        assert!(key.matches_name("Plain"));
        assert!(key.matches_name(key.name()));

        let key = TypeKey::of::<dyn Greeter>();
        assert_eq!(key.short_name(), "Greeter");
    }

    #[test]
    fn test_type_key_equality_uses_type_id() {
        assert_eq!(TypeKey::of::<Plain>(), TypeKey::of::<Plain>());
        assert_ne!(TypeKey::of::<Plain>(), TypeKey::of::<dyn Greeter>());
    }

    #[test]
    fn test_simple_types() {
        assert!(ValueType::Int.is_simple());
        assert!(ValueType::Str.is_simple());
        assert!(!ValueType::bean::<Plain>().is_simple());
        assert!(!ValueType::list_of(ValueType::Str).is_simple());
        assert!(!ValueType::Any.is_simple());
    }

    #[test]
    fn test_value_type_matches_declared_names() {
        assert!(ValueType::Int.matches_name("int"));
        assert!(ValueType::Int.matches_name("Integer"));
        assert!(ValueType::Str.matches_name("String"));
        assert!(!ValueType::Str.matches_name("int"));
        assert!(ValueType::bean::<Plain>().matches_name("Plain"));
    }

    #[test]
    fn test_is_instance_for_literals() {
        assert!(ValueType::Int.is_instance(&Value::Int(3)));
        assert!(!ValueType::Int.is_instance(&Value::Str("3".into())));
        assert!(ValueType::list_of(ValueType::Str)
            .is_instance(&Value::Seq(vec!["a".into(), "b".into()])));
        assert!(ValueType::Any.is_instance(&Value::Null));
    }

    #[test]
    fn test_needs_resolution() {
        assert!(Value::reference("a").needs_resolution());
        assert!(Value::List(ManagedList::new()).needs_resolution());
        assert!(!Value::Seq(vec![Value::Int(1)]).needs_resolution());
        assert!(!Value::Str("x".into()).needs_resolution());
    }

    #[test]
    fn test_typed_accessors() {
        assert_eq!(Value::Int(7).into_i64().unwrap(), 7);
        assert_eq!(Value::Int(7).into_f64().unwrap(), 7.0);
        assert!(Value::Str("7".into()).into_i64().is_err());
        assert!(Value::Null.into_optional_bean().unwrap().is_none());
    }
}
