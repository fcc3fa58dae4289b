//! 属性值与构造参数值的容器

use std::collections::BTreeMap;

use crate::value::{Value, ValueType};

/// 单个属性赋值
#[derive(Debug, Clone)]
pub struct PropertyValue {
    name: String,
    value: Value,
}

impl PropertyValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_parts(self) -> (String, Value) {
        (self.name, self.value)
    }
}

/// 有序属性赋值列表
///
/// 重复添加同名属性时覆盖旧值，但保留首次出现的位置。
#[derive(Debug, Clone, Default)]
pub struct MutablePropertyValues {
    values: Vec<PropertyValue>,
}

impl MutablePropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.add_property_value(PropertyValue::new(name, value));
    }

    pub fn add_property_value(&mut self, pv: PropertyValue) {
        match self.values.iter_mut().find(|existing| existing.name == pv.name) {
            Some(existing) => existing.value = pv.value,
            None => self.values.push(pv),
        }
    }

    /// 链式版本的 [`add`](Self::add)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|pv| pv.name == name).map(|pv| &pv.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|pv| pv.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.values.iter().position(|pv| pv.name == name)?;
        Some(self.values.remove(index).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl IntoIterator for MutablePropertyValues {
    type Item = PropertyValue;
    type IntoIter = std::vec::IntoIter<PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// 构造参数值及其可选的声明类型名
#[derive(Debug, Clone)]
pub struct ValueHolder {
    value: Value,
    type_name: Option<String>,
}

impl ValueHolder {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            type_name: None,
        }
    }

    pub fn typed(value: impl Into<Value>, type_name: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            type_name: Some(type_name.into()),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn with_value(&self, value: Value) -> Self {
        Self {
            value,
            type_name: self.type_name.clone(),
        }
    }
}

/// 构造参数值：按位置索引的参数 + 按类型匹配的通用参数
#[derive(Debug, Clone, Default)]
pub struct ConstructorArgumentValues {
    indexed: BTreeMap<usize, ValueHolder>,
    generic: Vec<ValueHolder>,
}

impl ConstructorArgumentValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_indexed_argument_value(&mut self, index: usize, holder: ValueHolder) {
        self.indexed.insert(index, holder);
    }

    pub fn add_generic_argument_value(&mut self, holder: ValueHolder) {
        self.generic.push(holder);
    }

    pub fn indexed_argument_values(&self) -> &BTreeMap<usize, ValueHolder> {
        &self.indexed
    }

    pub fn generic_argument_values(&self) -> &[ValueHolder] {
        &self.generic
    }

    /// 位置参数；声明了类型名时必须与参数类型一致
    pub fn get_indexed_argument_value(&self, index: usize, param: &ValueType) -> Option<&ValueHolder> {
        self.indexed.get(&index).filter(|holder| match holder.type_name() {
            Some(type_name) => param.matches_name(type_name),
            None => true,
        })
    }

    /// 第一个尚未使用且与参数类型匹配的通用参数
    ///
    /// 声明了类型名的按名称匹配，否则要求值本身就是参数类型的实例。
    /// 返回值是它在通用参数中的下标，调用方记录下来以免同一个值填两个槽位。
    pub fn find_generic_argument_value(
        &self,
        param: &ValueType,
        used: &[usize],
    ) -> Option<(usize, &ValueHolder)> {
        self.generic
            .iter()
            .enumerate()
            .filter(|(idx, _)| !used.contains(idx))
            .find(|(_, holder)| match holder.type_name() {
                Some(type_name) => param.matches_name(type_name),
                None => param.is_instance(holder.value()),
            })
    }

    /// 先查位置参数，再查通用参数
    pub fn get_argument_value(
        &self,
        index: usize,
        param: &ValueType,
        used_generic: &mut Vec<usize>,
    ) -> Option<&ValueHolder> {
        if let Some(holder) = self.get_indexed_argument_value(index, param) {
            return Some(holder);
        }
        let (generic_index, holder) = self.find_generic_argument_value(param, used_generic)?;
        used_generic.push(generic_index);
        Some(holder)
    }

    /// 参数总数（位置参数 + 通用参数）
    pub fn argument_count(&self) -> usize {
        self.indexed.len() + self.generic.len()
    }

    /// 构造函数至少需要的参数个数
    ///
    /// 为参数总数，且不小于最大位置索引加一。
    pub fn minimum_argument_count(&self) -> usize {
        let highest = self.indexed.keys().next_back().map(|idx| idx + 1).unwrap_or(0);
        self.argument_count().max(highest)
    }

    pub fn is_empty(&self) -> bool {
        self.argument_count() == 0
    }
}
