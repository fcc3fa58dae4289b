//! Bean 定义
//!
//! 描述如何构建一个对象：类型元数据、作用域、是否延迟初始化、自动装配模式、
//! 依赖列表、init/destroy 方法名、构造参数值和属性值。
//! 定义在注册时校验一次，此后只读；需要修改时由容器复制、修改、重新校验后替换。

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::bean::FactoryBean;
use crate::class::BeanClass;
use crate::error::{ContainerError, ContainerResult};
use crate::property::{ConstructorArgumentValues, MutablePropertyValues, ValueHolder};
use crate::scope::Scope;
use crate::value::Value;

/// 自动装配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutowireMode {
    /// 不自动装配
    #[default]
    No,
    /// 按属性名查找同名 Bean
    ByName,
    /// 按属性类型查找唯一可赋值的 Bean
    ByType,
    /// 通过构造函数参数装配
    Constructor,
    /// 有无参构造函数时按类型，否则按构造函数
    Autodetect,
}

impl FromStr for AutowireMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "no" | "none" => Ok(AutowireMode::No),
            "byname" | "by_name" | "by-name" => Ok(AutowireMode::ByName),
            "bytype" | "by_type" | "by-type" => Ok(AutowireMode::ByType),
            "constructor" => Ok(AutowireMode::Constructor),
            "autodetect" => Ok(AutowireMode::Autodetect),
            _ => Err(format!("Invalid autowire mode: {}", s)),
        }
    }
}

impl fmt::Display for AutowireMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutowireMode::No => write!(f, "no"),
            AutowireMode::ByName => write!(f, "byName"),
            AutowireMode::ByType => write!(f, "byType"),
            AutowireMode::Constructor => write!(f, "constructor"),
            AutowireMode::Autodetect => write!(f, "autodetect"),
        }
    }
}

/// Bean 定义
#[derive(Clone)]
pub struct BeanDefinition {
    bean_class: Arc<BeanClass>,
    scope: Scope,
    lazy_init: bool,
    autowire_mode: AutowireMode,
    depends_on: Vec<String>,
    init_method_name: Option<String>,
    destroy_method_name: Option<String>,
    property_values: MutablePropertyValues,
    constructor_argument_values: ConstructorArgumentValues,
}

impl BeanDefinition {
    pub fn new(bean_class: Arc<BeanClass>) -> Self {
        Self {
            bean_class,
            scope: Scope::Singleton,
            lazy_init: false,
            autowire_mode: AutowireMode::No,
            depends_on: Vec::new(),
            init_method_name: None,
            destroy_method_name: None,
            property_values: MutablePropertyValues::new(),
            constructor_argument_values: ConstructorArgumentValues::new(),
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_singleton(self, singleton: bool) -> Self {
        self.with_scope(Scope::from(singleton))
    }

    pub fn with_lazy_init(mut self, lazy_init: bool) -> Self {
        self.lazy_init = lazy_init;
        self
    }

    pub fn with_autowire_mode(mut self, mode: AutowireMode) -> Self {
        self.autowire_mode = mode;
        self
    }

    pub fn with_depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    pub fn with_init_method(mut self, name: impl Into<String>) -> Self {
        self.init_method_name = Some(name.into());
        self
    }

    pub fn with_destroy_method(mut self, name: impl Into<String>) -> Self {
        self.destroy_method_name = Some(name.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.property_values.add(name, value);
        self
    }

    pub fn with_property_values(mut self, values: MutablePropertyValues) -> Self {
        self.property_values = values;
        self
    }

    pub fn with_indexed_arg(mut self, index: usize, value: impl Into<Value>) -> Self {
        self.constructor_argument_values
            .add_indexed_argument_value(index, ValueHolder::new(value));
        self
    }

    pub fn with_generic_arg(mut self, value: impl Into<Value>) -> Self {
        self.constructor_argument_values
            .add_generic_argument_value(ValueHolder::new(value));
        self
    }

    pub fn with_typed_generic_arg(mut self, value: impl Into<Value>, type_name: impl Into<String>) -> Self {
        self.constructor_argument_values
            .add_generic_argument_value(ValueHolder::typed(value, type_name));
        self
    }

    pub fn with_constructor_argument_values(mut self, values: ConstructorArgumentValues) -> Self {
        self.constructor_argument_values = values;
        self
    }

    pub fn bean_class(&self) -> &Arc<BeanClass> {
        &self.bean_class
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_singleton(&self) -> bool {
        self.scope.is_singleton()
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init
    }

    pub fn autowire_mode(&self) -> AutowireMode {
        self.autowire_mode
    }

    /// 查询时解析 AUTODETECT：有无参构造函数按类型装配，否则按构造函数装配
    pub fn resolved_autowire_mode(&self) -> AutowireMode {
        match self.autowire_mode {
            AutowireMode::Autodetect if self.bean_class.has_default_constructor() => AutowireMode::ByType,
            AutowireMode::Autodetect => AutowireMode::Constructor,
            mode => mode,
        }
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn init_method_name(&self) -> Option<&str> {
        self.init_method_name.as_deref()
    }

    pub fn destroy_method_name(&self) -> Option<&str> {
        self.destroy_method_name.as_deref()
    }

    pub fn property_values(&self) -> &MutablePropertyValues {
        &self.property_values
    }

    pub fn constructor_argument_values(&self) -> &ConstructorArgumentValues {
        &self.constructor_argument_values
    }

    pub fn has_constructor_argument_values(&self) -> bool {
        !self.constructor_argument_values.is_empty()
    }

    pub fn is_factory_bean(&self) -> bool {
        self.bean_class.implements::<dyn FactoryBean>()
    }

    // 修改入口，仅供 `modify_bean_definition` 的闭包使用；修改后会重新校验

    pub fn set_scope(&mut self, scope: Scope) {
        self.scope = scope;
    }

    pub fn set_lazy_init(&mut self, lazy_init: bool) {
        self.lazy_init = lazy_init;
    }

    pub fn set_autowire_mode(&mut self, mode: AutowireMode) {
        self.autowire_mode = mode;
    }

    pub fn set_depends_on(&mut self, depends_on: Vec<String>) {
        self.depends_on = depends_on;
    }

    pub fn set_init_method_name(&mut self, name: Option<String>) {
        self.init_method_name = name;
    }

    pub fn set_destroy_method_name(&mut self, name: Option<String>) {
        self.destroy_method_name = name;
    }

    pub fn property_values_mut(&mut self) -> &mut MutablePropertyValues {
        &mut self.property_values
    }

    pub fn constructor_argument_values_mut(&mut self) -> &mut ConstructorArgumentValues {
        &mut self.constructor_argument_values
    }

    /// 校验定义
    ///
    /// - 延迟初始化只对单例有效
    /// - FactoryBean 必须是单例
    /// - 类型必须可实例化：有无参构造函数，或者可以通过构造函数装配
    /// - init/destroy 方法必须在类型上登记过
    pub fn validate(&self, name: &str) -> ContainerResult<()> {
        if self.lazy_init && !self.is_singleton() {
            return Err(ContainerError::invalid_definition(
                name,
                "lazy initialization is only applicable to singleton beans",
            ));
        }
        if self.is_factory_bean() && !self.is_singleton() {
            return Err(ContainerError::invalid_definition(
                name,
                "FactoryBean must be defined as singleton, FactoryBeans themselves are not allowed to be prototypes",
            ));
        }
        if !self.bean_class.is_instantiable() {
            return Err(ContainerError::invalid_definition(
                name,
                format!(
                    "class '{}' declares no public constructor and cannot be instantiated",
                    self.bean_class.name()
                ),
            ));
        }
        let constructor_wired = self.has_constructor_argument_values()
            || matches!(
                self.autowire_mode,
                AutowireMode::Constructor | AutowireMode::Autodetect
            );
        if !constructor_wired && !self.bean_class.has_default_constructor() {
            return Err(ContainerError::invalid_definition(
                name,
                format!(
                    "class '{}' has no no-arg constructor and is not wired through its constructor",
                    self.bean_class.name()
                ),
            ));
        }
        for (kind, method) in [
            ("init", self.init_method_name()),
            ("destroy", self.destroy_method_name()),
        ] {
            if let Some(method) = method {
                if !self.bean_class.has_method(method) {
                    return Err(ContainerError::invalid_definition(
                        name,
                        format!(
                            "{} method '{}' is not declared on class '{}'",
                            kind,
                            method,
                            self.bean_class.name()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("class", &self.bean_class.name())
            .field("scope", &self.scope)
            .field("lazy_init", &self.lazy_init)
            .field("autowire_mode", &self.autowire_mode)
            .field("depends_on", &self.depends_on)
            .field("init_method", &self.init_method_name)
            .field("destroy_method", &self.destroy_method_name)
            .field("property_values", &self.property_values)
            .field("constructor_argument_values", &self.constructor_argument_values)
            .finish()
    }
}
