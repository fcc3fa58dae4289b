//! Bean 类型元数据
//!
//! Rust 没有运行时反射，每种 Bean 类型都通过 [`BeanClass::builder`] 显式登记：
//! 公开的构造函数（按声明顺序）、可写属性、可作为 init/destroy 回调的无参方法，
//! 以及它实现的接口（能力）。容器只通过这些元数据操作实例。
//!
//! ```rust,ignore
//! let class = BeanClass::builder::<QqCoin>("QqCoin")
//!     .constructor(vec![ValueType::Int], |args| Ok(QqCoin::new(args.int(0)?)))
//!     .property("owner", ValueType::Str, |coin, v| {
//!         coin.owner = v.into_string()?;
//!         Ok(())
//!     })
//!     .method("init", |coin| coin.init())
//!     .initializing_bean()
//!     .build();
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bean::FactoryBean;
use crate::context::{ApplicationContextAware, ApplicationEventPublisherAware, ResourceLoaderAware};
use crate::error::{ContainerError, ContainerResult};
use crate::event::ApplicationListener;
use crate::lifecycle::{
    BeanFactoryAware, BeanFactoryPostProcessor, BeanNameAware, BeanPostProcessor, DisposableBean,
    InitializingBean,
};
use crate::value::{TypeKey, Value, ValueType};

pub(crate) type Instance = Box<dyn Any + Send + Sync>;

type ConstructorFn = Box<dyn Fn(ConstructorArgs) -> ContainerResult<Instance> + Send + Sync>;
type SetterFn = Box<dyn Fn(&mut (dyn Any + Send + Sync), Value) -> ContainerResult<()> + Send + Sync>;
type MethodFn = Box<dyn Fn(&mut (dyn Any + Send + Sync)) -> ContainerResult<()> + Send + Sync>;

/// 构造函数实参
///
/// 由容器按参数槽位解析并转换好后交给构造闭包。
#[derive(Debug, Default)]
pub struct ConstructorArgs {
    values: Vec<Value>,
}

impl ConstructorArgs {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// 取走指定位置的值，原位置留下 `Null`
    pub fn take(&mut self, index: usize) -> ContainerResult<Value> {
        self.values
            .get_mut(index)
            .map(std::mem::take)
            .ok_or_else(|| ContainerError::IllegalArgument(format!("no constructor argument at index {}", index)))
    }

    pub fn bean(&self, index: usize) -> ContainerResult<crate::bean::BeanRef> {
        self.value(index)?.clone().into_bean()
    }

    pub fn int(&self, index: usize) -> ContainerResult<i64> {
        self.value(index)?.clone().into_i64()
    }

    pub fn float(&self, index: usize) -> ContainerResult<f64> {
        self.value(index)?.clone().into_f64()
    }

    pub fn bool(&self, index: usize) -> ContainerResult<bool> {
        self.value(index)?.clone().into_bool()
    }

    pub fn string(&self, index: usize) -> ContainerResult<String> {
        self.value(index)?.clone().into_string()
    }

    pub fn seq(&self, index: usize) -> ContainerResult<Vec<Value>> {
        self.value(index)?.clone().into_seq()
    }

    fn value(&self, index: usize) -> ContainerResult<&Value> {
        self.values
            .get(index)
            .ok_or_else(|| ContainerError::IllegalArgument(format!("no constructor argument at index {}", index)))
    }
}

/// 公开构造函数
pub struct ConstructorDescriptor {
    params: Vec<ValueType>,
    factory: ConstructorFn,
}

impl ConstructorDescriptor {
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn invoke(&self, args: ConstructorArgs) -> ContainerResult<Instance> {
        (self.factory)(args)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<_> = self.params.iter().map(ValueType::name).collect();
        write!(f, "({})", params.join(", "))
    }
}

/// 可写属性
pub struct PropertyDescriptor {
    name: String,
    value_type: ValueType,
    setter: SetterFn,
}

impl PropertyDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub(crate) fn set(&self, target: &mut (dyn Any + Send + Sync), value: Value) -> ContainerResult<()> {
        (self.setter)(target, value)
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value_type)
    }
}

/// 把类型擦除后的实例视为接口 `I`
trait ErasedView<I: ?Sized>: Send + Sync {
    fn view<'a>(&self, target: &'a (dyn Any + Send + Sync)) -> Option<&'a I>;
    fn view_mut<'a>(&self, target: &'a mut (dyn Any + Send + Sync)) -> Option<&'a mut I>;
}

struct TypedView<T, I: ?Sized> {
    get: fn(&T) -> &I,
    get_mut: fn(&mut T) -> &mut I,
}

impl<T: Any + Send + Sync, I: ?Sized + 'static> ErasedView<I> for TypedView<T, I> {
    fn view<'a>(&self, target: &'a (dyn Any + Send + Sync)) -> Option<&'a I> {
        target.downcast_ref::<T>().map(self.get)
    }

    fn view_mut<'a>(&self, target: &'a mut (dyn Any + Send + Sync)) -> Option<&'a mut I> {
        target.downcast_mut::<T>().map(self.get_mut)
    }
}

/// 接口实现记录，`erased` 中存放 `Arc<dyn ErasedView<I>>`
struct InterfaceEntry {
    key: TypeKey,
    erased: Box<dyn Any + Send + Sync>,
}

/// 一种 Bean 类型的完整元数据
pub struct BeanClass {
    name: String,
    type_key: TypeKey,
    constructors: Vec<ConstructorDescriptor>,
    properties: Vec<PropertyDescriptor>,
    methods: HashMap<String, MethodFn>,
    interfaces: HashMap<TypeId, InterfaceEntry>,
}

impl BeanClass {
    /// 开始登记类型 `T`，`name` 是配置中引用它时使用的类名
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> BeanClassBuilder<T> {
        BeanClassBuilder {
            class: BeanClass::bare::<T>(name),
            _marker: PhantomData,
        }
    }

    /// 只有类型标识、没有任何构造函数和能力的元数据
    ///
    /// 用于包装手工注册的单例或后置处理器返回的替身对象。
    pub fn bare<T: Any + Send + Sync>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_key: TypeKey::of::<T>(),
            constructors: Vec::new(),
            properties: Vec::new(),
            methods: HashMap::new(),
            interfaces: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    /// 无参构造函数
    pub fn default_constructor(&self) -> Option<&ConstructorDescriptor> {
        self.constructors.iter().find(|c| c.params.is_empty())
    }

    pub fn has_default_constructor(&self) -> bool {
        self.default_constructor().is_some()
    }

    /// 没有任何公开构造函数的类型视为抽象类型
    pub fn is_instantiable(&self) -> bool {
        !self.constructors.is_empty()
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub(crate) fn invoke_method(
        &self,
        name: &str,
        target: &mut (dyn Any + Send + Sync),
    ) -> Option<ContainerResult<()>> {
        self.methods.get(name).map(|method| method(target))
    }

    /// 自身类型或声明实现的接口
    pub fn is_assignable_to(&self, key: &TypeKey) -> bool {
        self.type_key == *key || self.interfaces.contains_key(&key.id())
    }

    pub fn implements<I: ?Sized + 'static>(&self) -> bool {
        self.interfaces.contains_key(&TypeId::of::<I>())
    }

    pub fn interfaces(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.interfaces.values().map(|entry| entry.key)
    }

    pub(crate) fn view<'a, I: ?Sized + 'static>(
        &self,
        target: &'a (dyn Any + Send + Sync),
    ) -> Option<&'a I> {
        self.erased_view::<I>()?.view(target)
    }

    pub(crate) fn view_mut<'a, I: ?Sized + 'static>(
        &self,
        target: &'a mut (dyn Any + Send + Sync),
    ) -> Option<&'a mut I> {
        self.erased_view::<I>()?.view_mut(target)
    }

    fn erased_view<I: ?Sized + 'static>(&self) -> Option<&Arc<dyn ErasedView<I>>> {
        self.interfaces
            .get(&TypeId::of::<I>())?
            .erased
            .downcast_ref::<Arc<dyn ErasedView<I>>>()
    }
}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interfaces: Vec<_> = self.interfaces().map(|key| key.short_name()).collect();
        let mut methods: Vec<_> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("BeanClass")
            .field("name", &self.name)
            .field("type", &self.type_key.name())
            .field("constructors", &self.constructors)
            .field("properties", &self.properties)
            .field("methods", &methods)
            .field("interfaces", &interfaces)
            .finish()
    }
}

/// [`BeanClass`] 构建器
pub struct BeanClassBuilder<T> {
    class: BeanClass,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> BeanClassBuilder<T> {
    /// 登记一个公开构造函数，按调用顺序即声明顺序
    pub fn constructor<F>(mut self, params: Vec<ValueType>, factory: F) -> Self
    where
        F: Fn(ConstructorArgs) -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.class.constructors.push(ConstructorDescriptor {
            params,
            factory: Box::new(move |args| factory(args).map(|bean| Box::new(bean) as Instance)),
        });
        self
    }

    /// 使用 `Default` 作为无参构造函数
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(Vec::new(), |_| Ok(T::default()))
    }

    /// 登记可写属性
    pub fn property<F>(mut self, name: impl Into<String>, value_type: ValueType, setter: F) -> Self
    where
        F: Fn(&mut T, Value) -> ContainerResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let type_name = self.class.type_key.name();
        self.class.properties.retain(|p| p.name != name);
        self.class.properties.push(PropertyDescriptor {
            name: name.clone(),
            value_type,
            setter: Box::new(move |target, value| {
                let bean = target.downcast_mut::<T>().ok_or_else(|| {
                    ContainerError::IllegalState(format!(
                        "property '{}' applied to an instance that is not a {}",
                        name, type_name
                    ))
                })?;
                setter(bean, value)
            }),
        });
        self
    }

    /// 登记无参方法，可在定义中作为 init-method / destroy-method 引用
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&mut T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let type_name = self.class.type_key.name();
        let method_name = name.clone();
        self.class.methods.insert(
            name,
            Box::new(move |target| {
                let bean = target.downcast_mut::<T>().ok_or_else(|| {
                    ContainerError::IllegalState(format!(
                        "method '{}' invoked on an instance that is not a {}",
                        method_name, type_name
                    ))
                })?;
                method(bean)
            }),
        );
        self
    }

    /// 声明 `T` 实现接口 `I`，并给出视图转换
    ///
    /// ```rust,ignore
    /// builder.implements::<dyn Greeter>(|t| t as &dyn Greeter, |t| t as &mut dyn Greeter)
    /// ```
    pub fn implements<I: ?Sized + 'static>(
        mut self,
        get: fn(&T) -> &I,
        get_mut: fn(&mut T) -> &mut I,
    ) -> Self {
        let view: Arc<dyn ErasedView<I>> = Arc::new(TypedView { get, get_mut });
        self.class.interfaces.insert(
            TypeId::of::<I>(),
            InterfaceEntry {
                key: TypeKey::of::<I>(),
                erased: Box::new(view),
            },
        );
        self
    }

    pub fn factory_bean(self) -> Self
    where
        T: FactoryBean,
    {
        self.implements::<dyn FactoryBean>(|t| t as &dyn FactoryBean, |t| t as &mut dyn FactoryBean)
    }

    pub fn initializing_bean(self) -> Self
    where
        T: InitializingBean,
    {
        self.implements::<dyn InitializingBean>(|t| t as &dyn InitializingBean, |t| t as &mut dyn InitializingBean)
    }

    pub fn disposable_bean(self) -> Self
    where
        T: DisposableBean,
    {
        self.implements::<dyn DisposableBean>(|t| t as &dyn DisposableBean, |t| t as &mut dyn DisposableBean)
    }

    pub fn bean_name_aware(self) -> Self
    where
        T: BeanNameAware,
    {
        self.implements::<dyn BeanNameAware>(|t| t as &dyn BeanNameAware, |t| t as &mut dyn BeanNameAware)
    }

    pub fn bean_factory_aware(self) -> Self
    where
        T: BeanFactoryAware,
    {
        self.implements::<dyn BeanFactoryAware>(|t| t as &dyn BeanFactoryAware, |t| t as &mut dyn BeanFactoryAware)
    }

    pub fn bean_post_processor(self) -> Self
    where
        T: BeanPostProcessor,
    {
        self.implements::<dyn BeanPostProcessor>(|t| t as &dyn BeanPostProcessor, |t| t as &mut dyn BeanPostProcessor)
    }

    pub fn bean_factory_post_processor(self) -> Self
    where
        T: BeanFactoryPostProcessor,
    {
        self.implements::<dyn BeanFactoryPostProcessor>(|t| t as &dyn BeanFactoryPostProcessor, |t| t as &mut dyn BeanFactoryPostProcessor)
    }

    pub fn application_listener(self) -> Self
    where
        T: ApplicationListener,
    {
        self.implements::<dyn ApplicationListener>(|t| t as &dyn ApplicationListener, |t| t as &mut dyn ApplicationListener)
    }

    pub fn application_context_aware(self) -> Self
    where
        T: ApplicationContextAware,
    {
        self.implements::<dyn ApplicationContextAware>(|t| t as &dyn ApplicationContextAware, |t| t as &mut dyn ApplicationContextAware)
    }

    pub fn event_publisher_aware(self) -> Self
    where
        T: ApplicationEventPublisherAware,
    {
        self.implements::<dyn ApplicationEventPublisherAware>(|t| t as &dyn ApplicationEventPublisherAware, |t| t as &mut dyn ApplicationEventPublisherAware)
    }

    pub fn resource_loader_aware(self) -> Self
    where
        T: ResourceLoaderAware,
    {
        self.implements::<dyn ResourceLoaderAware>(|t| t as &dyn ResourceLoaderAware, |t| t as &mut dyn ResourceLoaderAware)
    }

    pub fn build(self) -> BeanClass {
        self.class
    }
}

/// 通过 `inventory` 提交的类型登记
///
/// ```rust,ignore
/// fn describe_country() -> BeanClass { ... }
///
/// sprig_core::inventory::submit! {
///     sprig_core::ClassSubmission::new(describe_country)
/// }
/// ```
pub struct ClassSubmission {
    describe: fn() -> BeanClass,
}

impl ClassSubmission {
    pub const fn new(describe: fn() -> BeanClass) -> Self {
        Self { describe }
    }
}

inventory::collect!(ClassSubmission);

/// 类名到元数据的注册表
///
/// 由容器（或配置读取器）持有，不存在全局可变状态。
#[derive(Default)]
pub struct ClassRegistry {
    classes: RwLock<HashMap<String, Arc<BeanClass>>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集所有通过 `inventory` 提交的类型
    pub fn from_submitted() -> ContainerResult<Self> {
        let registry = Self::new();
        for submission in inventory::iter::<ClassSubmission> {
            registry.register((submission.describe)())?;
        }
        tracing::debug!(
            "Collected {} submitted bean class(es)",
            registry.classes.read().len()
        );
        Ok(registry)
    }

    pub fn register(&self, class: impl Into<Arc<BeanClass>>) -> ContainerResult<Arc<BeanClass>> {
        let class = class.into();
        let mut classes = self.classes.write();
        if classes.contains_key(class.name()) {
            return Err(ContainerError::IllegalArgument(format!(
                "bean class '{}' is already registered",
                class.name()
            )));
        }
        classes.insert(class.name().to_string(), Arc::clone(&class));
        tracing::trace!("Registered bean class '{}'", class.name());
        Ok(class)
    }

    pub fn get(&self, name: &str) -> Option<Arc<BeanClass>> {
        self.classes.read().get(name).cloned()
    }

    pub fn resolve(&self, name: &str) -> ContainerResult<Arc<BeanClass>> {
        self.get(name)
            .ok_or_else(|| ContainerError::ClassNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.classes.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("ClassRegistry").field("classes", &names).finish()
    }
}
