//! 自动装配与值解析
//!
//! 为 [`DefaultListableBeanFactory`] 实现实例化、构造函数参数解析、
//! 按名称/按类型的属性装配，以及属性值的引用解析和类型转换。

use std::sync::Arc;

use crate::bean::BeanRef;
use crate::bean_definition::AutowireMode;
use crate::bean_factory::{BeanFactory, DefaultListableBeanFactory, ListableBeanFactory};
use crate::class::{BeanClass, ConstructorArgs, ConstructorDescriptor};
use crate::error::{ContainerError, ContainerResult};
use crate::property::{ConstructorArgumentValues, MutablePropertyValues};
use crate::value::{TypeKey, Value, ValueType};

impl DefaultListableBeanFactory {
    /// 使用无参构造函数实例化
    pub(crate) fn instantiate_bean(&self, name: &str, class: &Arc<BeanClass>) -> ContainerResult<BeanRef> {
        let constructor = class
            .default_constructor()
            .ok_or_else(|| ContainerError::NoViableConstructor {
                bean: name.to_string(),
                reason: format!("class '{}' declares no no-arg constructor", class.name()),
            })?;
        let instance = constructor
            .invoke(ConstructorArgs::default())
            .map_err(|e| ContainerError::creation_failed(name, e))?;
        Ok(BeanRef::from_instance(Arc::clone(class), instance))
    }

    /// 构造函数装配
    ///
    /// 按声明顺序尝试参数个数不少于显式参数个数的构造函数，每个参数槽位
    /// 依次取位置参数、未使用过的通用参数，都没有时按类型找唯一候选 Bean。
    /// 第一个所有槽位都能解析的构造函数胜出。
    pub(crate) fn autowire_constructor(
        &self,
        name: &str,
        class: &Arc<BeanClass>,
        args: &ConstructorArgumentValues,
    ) -> ContainerResult<BeanRef> {
        let resolved = self.resolve_constructor_arguments(name, args)?;
        let min_args = resolved.minimum_argument_count();

        let mut attempted = 0;
        let mut rejections: Vec<String> = Vec::new();
        let mut last_failure = None;

        for (position, constructor) in class.constructors().iter().enumerate() {
            if constructor.param_count() < min_args {
                rejections.push(format!(
                    "#{} {:?} takes fewer than {} argument(s)",
                    position, constructor, min_args
                ));
                continue;
            }
            attempted += 1;

            match self.resolve_constructor_slots(name, constructor, &resolved) {
                Ok(values) => {
                    tracing::debug!("Bean '{}' instantiated via constructor #{} {:?}", name, position, constructor);
                    let instance = constructor
                        .invoke(ConstructorArgs::new(values))
                        .map_err(|e| ContainerError::creation_failed(name, e))?;
                    return Ok(BeanRef::from_instance(Arc::clone(class), instance));
                }
                Err(err) if is_unsatisfied_slot(&err) => {
                    tracing::trace!("Constructor #{} of bean '{}' rejected: {}", position, name, err);
                    rejections.push(format!("#{} {:?}: {}", position, constructor, err));
                    last_failure = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        match last_failure {
            Some(err) if attempted == 1 => Err(err),
            _ => Err(ContainerError::NoViableConstructor {
                bean: name.to_string(),
                reason: if rejections.is_empty() {
                    format!("class '{}' declares no constructors", class.name())
                } else {
                    rejections.join("; ")
                },
            }),
        }
    }

    /// 预先解析构造参数中的引用与列表
    fn resolve_constructor_arguments(
        &self,
        name: &str,
        args: &ConstructorArgumentValues,
    ) -> ContainerResult<ConstructorArgumentValues> {
        let mut resolved = ConstructorArgumentValues::new();
        for (index, holder) in args.indexed_argument_values() {
            let target = format!("constructor argument {}", index);
            let value = self.resolve_value_if_necessary(name, &target, holder.value())?;
            resolved.add_indexed_argument_value(*index, holder.with_value(value));
        }
        for holder in args.generic_argument_values() {
            let value = self.resolve_value_if_necessary(name, "constructor argument", holder.value())?;
            resolved.add_generic_argument_value(holder.with_value(value));
        }
        Ok(resolved)
    }

    fn resolve_constructor_slots(
        &self,
        name: &str,
        constructor: &ConstructorDescriptor,
        resolved: &ConstructorArgumentValues,
    ) -> ContainerResult<Vec<Value>> {
        let mut used_generic = Vec::new();
        let mut values = Vec::with_capacity(constructor.param_count());

        for (index, param) in constructor.params().iter().enumerate() {
            let value = match resolved.get_argument_value(index, param, &mut used_generic) {
                Some(holder) => self.convert_value(holder.value().clone(), param)?,
                None => self.autowire_constructor_slot(name, index, param)?,
            };
            values.push(value);
        }
        Ok(values)
    }

    fn autowire_constructor_slot(&self, name: &str, index: usize, param: &ValueType) -> ContainerResult<Value> {
        let target = format!("constructor argument {}", index);
        let candidate = match param {
            ValueType::Bean(key) => self.unique_candidate(name, &target, key)?,
            _ => None,
        };
        candidate.map(Value::Bean).ok_or_else(|| ContainerError::NoMatch {
            bean: name.to_string(),
            target,
            required_type: param.name(),
        })
    }

    /// 按类型查找唯一候选，多于一个候选时失败
    fn unique_candidate(&self, name: &str, target: &str, key: &TypeKey) -> ContainerResult<Option<BeanRef>> {
        let mut candidates = self.get_beans_of_type(key, true, true)?;
        if candidates.len() > 1 {
            return Err(ContainerError::AmbiguousAutowire {
                bean: name.to_string(),
                target: target.to_string(),
                required_type: key.short_name().to_string(),
                candidates: candidates.into_iter().map(|(candidate, _)| candidate).collect(),
            });
        }
        Ok(candidates.pop().map(|(_, bean)| bean))
    }

    /// 属性填充：先按模式装配未显式赋值的 Bean 类型属性，再应用全部属性值
    pub(crate) fn populate_bean(
        &self,
        name: &str,
        mode: AutowireMode,
        property_values: &MutablePropertyValues,
        bean: &BeanRef,
    ) -> ContainerResult<()> {
        let mut values = property_values.clone();
        match mode {
            AutowireMode::ByName => self.autowire_by_name(name, bean, &mut values)?,
            AutowireMode::ByType => self.autowire_by_type(name, bean, &mut values)?,
            _ => {}
        }
        self.apply_property_values(name, bean, values)
    }

    /// 未显式赋值的非简单类型属性
    fn unsatisfied_non_simple_properties(
        bean: &BeanRef,
        values: &MutablePropertyValues,
    ) -> Vec<(String, ValueType)> {
        bean.class()
            .properties()
            .iter()
            .filter(|p| !p.value_type().is_simple() && !values.contains(p.name()))
            .map(|p| (p.name().to_string(), p.value_type().clone()))
            .collect()
    }

    fn autowire_by_name(
        &self,
        name: &str,
        bean: &BeanRef,
        values: &mut MutablePropertyValues,
    ) -> ContainerResult<()> {
        for (property, _) in Self::unsatisfied_non_simple_properties(bean, values) {
            if self.contains_bean(&property) {
                let candidate = self.get_bean(&property)?;
                tracing::debug!("Autowiring by name from bean '{}' via property '{}'", name, property);
                values.add(property, candidate);
            } else {
                tracing::trace!(
                    "Not autowiring property '{}' of bean '{}' by name: no matching bean found",
                    property,
                    name
                );
            }
        }
        Ok(())
    }

    fn autowire_by_type(
        &self,
        name: &str,
        bean: &BeanRef,
        values: &mut MutablePropertyValues,
    ) -> ContainerResult<()> {
        for (property, value_type) in Self::unsatisfied_non_simple_properties(bean, values) {
            let ValueType::Bean(key) = value_type else {
                continue;
            };
            let target = format!("property '{}'", property);
            match self.unique_candidate(name, &target, &key)? {
                Some(candidate) => {
                    tracing::debug!(
                        "Autowiring by type from bean '{}' via property '{}' to '{}'",
                        name,
                        property,
                        candidate.type_name()
                    );
                    values.add(property, candidate);
                }
                None => tracing::trace!(
                    "Not autowiring property '{}' of bean '{}' by type: no bean of type '{}'",
                    property,
                    name,
                    key.short_name()
                ),
            }
        }
        Ok(())
    }

    /// 解析、转换并通过 setter 写入每个属性值
    fn apply_property_values(
        &self,
        name: &str,
        bean: &BeanRef,
        values: MutablePropertyValues,
    ) -> ContainerResult<()> {
        for property_value in values {
            let (property, raw) = property_value.into_parts();
            let value_type = bean
                .class()
                .property(&property)
                .map(|descriptor| descriptor.value_type().clone())
                .ok_or_else(|| {
                    ContainerError::invalid_definition(
                        name,
                        format!(
                            "class '{}' has no writable property '{}'",
                            bean.class().name(),
                            property
                        ),
                    )
                })?;

            let target = format!("property '{}'", property);
            let resolved = self.resolve_value_if_necessary(name, &target, &raw)?;
            let converted = self.convert_value(resolved, &value_type)?;

            tracing::trace!("Setting property '{}' on bean '{}'", property, name);
            bean.with_instance_mut(|class, instance| {
                class
                    .property(&property)
                    .map(|descriptor| descriptor.set(instance, converted))
            })
            .unwrap_or_else(|| {
                Err(ContainerError::IllegalState(format!(
                    "property '{}' disappeared from class '{}'",
                    property,
                    bean.type_name()
                )))
            })
            .map_err(|e| ContainerError::creation_failed(name, e))?;
        }
        Ok(())
    }

    /// 把引用解析为 Bean，把托管列表逐元素解析为序列，其余值原样返回
    pub(crate) fn resolve_value_if_necessary(
        &self,
        name: &str,
        target: &str,
        value: &Value,
    ) -> ContainerResult<Value> {
        match value {
            Value::Ref(reference) => {
                tracing::trace!(
                    "Resolving reference to bean '{}' for {} of bean '{}'",
                    reference.bean_name(),
                    target,
                    name
                );
                self.get_bean(reference.bean_name()).map(Value::Bean)
            }
            Value::List(list) => list
                .elements()
                .iter()
                .map(|element| self.resolve_value_if_necessary(name, target, element))
                .collect::<ContainerResult<Vec<_>>>()
                .map(Value::Seq),
            Value::Seq(items) if value.needs_resolution() => items
                .iter()
                .map(|element| self.resolve_value_if_necessary(name, target, element))
                .collect::<ContainerResult<Vec<_>>>()
                .map(Value::Seq),
            other => Ok(other.clone()),
        }
    }

    fn convert_value(&self, value: Value, target: &ValueType) -> ContainerResult<Value> {
        self.converter().convert(value, target)
    }
}

/// 只影响当前构造函数候选、可以继续尝试下一个的失败
fn is_unsatisfied_slot(err: &ContainerError) -> bool {
    matches!(
        err,
        ContainerError::NoMatch { .. }
            | ContainerError::AmbiguousAutowire { .. }
            | ContainerError::Conversion { .. }
    )
}
