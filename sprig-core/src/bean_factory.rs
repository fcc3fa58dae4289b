//! Bean Factory - 核心容器接口与创建引擎
//!
//! 参考 Spring 的 BeanFactory 层次结构：
//! `BeanFactory` → `ListableBeanFactory` / `ConfigurableBeanFactory` / `AutowireCapableBeanFactory`
//! → `ConfigurableListableBeanFactory`，由 [`DefaultListableBeanFactory`] 实现。
//! 自动装配与值解析的实现见 `autowire` 模块。

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::bean::{BeanRef, FactoryBean};
use crate::bean_definition::{AutowireMode, BeanDefinition};
use crate::class::BeanClass;
use crate::constants::{transformed_bean_name, FACTORY_BEAN_PREFIX};
use crate::convert::{ConverterRegistrar, ConverterRegistry, CustomConverter, DefaultTypeConverter, TypeConverter};
use crate::error::{ContainerError, ContainerResult};
use crate::lifecycle::{BeanFactoryAware, BeanNameAware, BeanPostProcessor, DisposableBean, InitializingBean};
use crate::registry::{BeanDefinitionRegistry, DefaultBeanDefinitionRegistry};
use crate::utils::dependency::{validate_dependency_graph, CreationTracker};
use crate::value::TypeKey;

/// BeanFactory - 最基础的容器接口
///
/// 不包含泛型方法，可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称获取 Bean
    ///
    /// 名称带 `&` 前缀时返回 FactoryBean 本身，否则返回它生产的对象
    fn get_bean(&self, name: &str) -> ContainerResult<BeanRef>;

    /// 通过名称获取 Bean，并要求它可赋值给指定类型
    fn get_bean_of_type(&self, name: &str, required_type: &TypeKey) -> ContainerResult<BeanRef>;

    /// 是否存在该名称的单例或定义
    fn contains_bean(&self, name: &str) -> bool;

    /// 该名称对应的是否为共享实例
    fn is_singleton(&self, name: &str) -> ContainerResult<bool>;
}

/// BeanFactoryExt - 泛型便捷方法
pub trait BeanFactoryExt: BeanFactory {
    /// 获取可赋值给 `T`（具体类型或 `dyn Trait`）的 Bean
    fn get_typed_bean<T: ?Sized + 'static>(&self, name: &str) -> ContainerResult<BeanRef> {
        self.get_bean_of_type(name, &TypeKey::of::<T>())
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

/// ListableBeanFactory - 可列举的 Bean 工厂
pub trait ListableBeanFactory: BeanFactory {
    /// 类型可赋值给 `filter` 的 Bean 名称（`None` 时返回全部），按注册顺序
    fn get_bean_names_for_type(&self, filter: Option<&TypeKey>) -> Vec<String>;

    /// 获取（必要时创建）所有可赋值给指定类型的 Bean
    ///
    /// `include_factory_beans` 为 true 时，FactoryBean 的产物也参与匹配
    fn get_beans_of_type(
        &self,
        required_type: &TypeKey,
        include_prototypes: bool,
        include_factory_beans: bool,
    ) -> ContainerResult<Vec<(String, BeanRef)>>;
}

/// ConfigurableBeanFactory - 可配置的 Bean 工厂
pub trait ConfigurableBeanFactory: BeanFactory {
    /// 添加 BeanPostProcessor，按添加顺序执行
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>>;

    /// 注册一个现成的单例
    fn register_singleton(&self, name: &str, bean: BeanRef) -> ContainerResult<()>;

    /// 替换类型转换服务
    fn set_type_converter(&self, converter: Arc<dyn TypeConverter>);

    fn add_converter_registrar(&self, registrar: Arc<dyn ConverterRegistrar>);

    /// 销毁单个单例
    fn destroy_singleton(&self, name: &str) -> ContainerResult<()>;

    /// 按创建顺序销毁所有单例，返回销毁过程中出现的错误
    ///
    /// 单个 Bean 的销毁失败不会中断其余 Bean 的销毁
    fn destroy_singletons(&self) -> Vec<ContainerError>;
}

/// AutowireCapableBeanFactory - 可以装配容器之外的实例
pub trait AutowireCapableBeanFactory: BeanFactory {
    /// 按指定模式创建一个不受容器管理的实例
    fn autowire(&self, class: &Arc<BeanClass>, mode: AutowireMode) -> ContainerResult<BeanRef>;

    /// 按名称或类型装配已有实例的属性
    fn autowire_bean_properties(&self, bean: &BeanRef, mode: AutowireMode) -> ContainerResult<()>;

    fn apply_bean_post_processors_before_initialization(
        &self,
        bean: BeanRef,
        bean_name: &str,
    ) -> ContainerResult<BeanRef>;

    fn apply_bean_post_processors_after_initialization(
        &self,
        bean: BeanRef,
        bean_name: &str,
    ) -> ContainerResult<BeanRef>;
}

/// ConfigurableListableBeanFactory - 可配置且可列举的 Bean 工厂
pub trait ConfigurableListableBeanFactory:
    ListableBeanFactory + ConfigurableBeanFactory + AutowireCapableBeanFactory
{
    /// 预实例化所有非延迟单例
    fn preinstantiate_singletons(&self) -> ContainerResult<()>;

    /// 冻结配置（不再允许注册或修改 Bean 定义）
    fn freeze_configuration(&self);

    fn is_configuration_frozen(&self) -> bool;

    /// 复制定义、修改、重新校验后替换
    fn modify_bean_definition<F>(&self, name: &str, modifier: F) -> ContainerResult<()>
    where
        F: FnOnce(&mut BeanDefinition);

    /// 检查 depends-on 图中缺失的名称和环
    fn validate_dependencies(&self) -> ContainerResult<()>;
}

/// 单例缓存，记录创建顺序
#[derive(Default)]
struct SingletonCache {
    instances: HashMap<String, BeanRef>,
    order: Vec<String>,
}

impl SingletonCache {
    fn insert(&mut self, name: &str, bean: BeanRef) {
        if self.instances.insert(name.to_string(), bean).is_none() {
            self.order.push(name.to_string());
        }
    }

    fn remove(&mut self, name: &str) -> Option<BeanRef> {
        let bean = self.instances.remove(name)?;
        self.order.retain(|n| n != name);
        Some(bean)
    }
}

/// 最外层单例创建的起点，离开作用域时清除
struct CreationMark<'a> {
    slot: &'a Mutex<Option<usize>>,
    start: usize,
}

impl Drop for CreationMark<'_> {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

/// DefaultListableBeanFactory - ConfigurableListableBeanFactory 的默认实现
///
/// 单例创建在一把可重入锁下串行执行：创建线程可以在构造过程中递归获取其他 Bean，
/// 其他线程则等待构造完成后直接读取缓存。实例在属性填充之前就放入缓存
/// （提前暴露），循环引用因此能拿到一个尚未填充完毕的实例。
pub struct DefaultListableBeanFactory {
    /// 指向自身的弱引用，用于 BeanFactoryAware 回调
    self_ref: Weak<DefaultListableBeanFactory>,

    /// Bean 定义存储
    registry: DefaultBeanDefinitionRegistry,

    /// 单例 Bean 缓存
    singletons: RwLock<SingletonCache>,

    /// 单例创建锁
    singleton_lock: ReentrantMutex<()>,

    /// 最外层单例创建开始时缓存中的单例数量，只由持有创建锁的线程访问
    creation_mark: Mutex<Option<usize>>,

    /// 单例 FactoryBean 产物缓存
    factory_bean_objects: RwLock<HashMap<String, BeanRef>>,

    /// 循环依赖检测
    creation_tracker: CreationTracker,

    /// Bean 后置处理器列表（按注册顺序）
    bean_post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,

    /// 自定义转换器登记在默认转换器上
    default_converter: Arc<DefaultTypeConverter>,

    /// 当前使用的转换服务
    type_converter: RwLock<Arc<dyn TypeConverter>>,

    /// 配置是否已冻结
    configuration_frozen: RwLock<bool>,
}

impl DefaultListableBeanFactory {
    /// 创建新的 Bean 工厂
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|self_ref| {
            let default_converter = Arc::new(DefaultTypeConverter::new());
            let type_converter: Arc<dyn TypeConverter> = default_converter.clone();
            Self {
                self_ref: self_ref.clone(),
                registry: DefaultBeanDefinitionRegistry::new(),
                singletons: RwLock::new(SingletonCache::default()),
                singleton_lock: ReentrantMutex::new(()),
                creation_mark: Mutex::new(None),
                factory_bean_objects: RwLock::new(HashMap::new()),
                creation_tracker: CreationTracker::new(),
                bean_post_processors: RwLock::new(Vec::new()),
                default_converter,
                type_converter: RwLock::new(type_converter),
                configuration_frozen: RwLock::new(false),
            }
        })
    }

    /// 指向自身的弱引用
    pub fn weak_ref(&self) -> Weak<DefaultListableBeanFactory> {
        self.self_ref.clone()
    }

    pub(crate) fn converter(&self) -> Arc<dyn TypeConverter> {
        Arc::clone(&self.type_converter.read())
    }

    /// 已创建的单例名称，按创建顺序
    pub fn get_singleton_names(&self) -> Vec<String> {
        self.singletons.read().order.clone()
    }

    pub fn get_singleton_count(&self) -> usize {
        self.singletons.read().order.len()
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.read().instances.contains_key(name)
    }

    fn get_singleton(&self, name: &str) -> Option<BeanRef> {
        self.singletons.read().instances.get(name).cloned()
    }

    fn add_singleton(&self, name: &str, bean: BeanRef) {
        self.singletons.write().insert(name, bean);
    }

    fn remove_singleton(&self, name: &str) -> Option<BeanRef> {
        self.factory_bean_objects.write().remove(name);
        self.singletons.write().remove(name)
    }

    fn do_get_bean(&self, name: &str) -> ContainerResult<BeanRef> {
        tracing::trace!("Requesting bean: '{}'", name);
        let (bean_name, is_factory_dereference) = transformed_bean_name(name);

        if let Some(shared) = self.get_singleton(bean_name) {
            tracing::trace!("Returning cached instance of singleton bean '{}'", bean_name);
            return self.get_object_for_bean_instance(shared, bean_name, is_factory_dereference);
        }

        let definition = self.registry.get_bean_definition(bean_name)?;

        let bean = if definition.is_singleton() {
            let _lock = self.singleton_lock.lock();
            match self.get_singleton(bean_name) {
                Some(shared) => shared,
                None => {
                    tracing::info!("Creating shared instance of singleton bean '{}'", bean_name);
                    let mark = self.mark_outermost_creation();
                    match self.create_bean(bean_name, &definition) {
                        Ok(created) => {
                            self.add_singleton(bean_name, created.clone());
                            created
                        }
                        Err(err) => {
                            self.remove_singleton(bean_name);
                            if let Some(mark) = &mark {
                                self.discard_singletons_since(mark.start);
                            }
                            return Err(err);
                        }
                    }
                }
            }
        } else {
            tracing::debug!("Creating new instance of prototype bean '{}'", bean_name);
            self.create_bean(bean_name, &definition)?
        };

        self.get_object_for_bean_instance(bean, bean_name, is_factory_dereference)
    }

    /// 当前线程没有正在进行的单例创建时，记录缓存位置
    fn mark_outermost_creation(&self) -> Option<CreationMark<'_>> {
        let mut slot = self.creation_mark.lock();
        if slot.is_some() {
            return None;
        }
        let start = self.singletons.read().order.len();
        *slot = Some(start);
        Some(CreationMark {
            slot: &self.creation_mark,
            start,
        })
    }

    /// 丢弃失败的创建过程中缓存的单例，它们可能引用了被丢弃的半成品
    fn discard_singletons_since(&self, mark: usize) {
        let names: Vec<String> = self
            .singletons
            .read()
            .order
            .get(mark..)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        for name in names {
            tracing::debug!("Discarding singleton '{}' created during a failed creation", name);
            self.remove_singleton(&name);
        }
    }

    /// 处理 FactoryBean 语义
    fn get_object_for_bean_instance(
        &self,
        bean: BeanRef,
        bean_name: &str,
        is_factory_dereference: bool,
    ) -> ContainerResult<BeanRef> {
        let is_factory = bean.implements::<dyn FactoryBean>();
        if is_factory_dereference {
            return if is_factory {
                Ok(bean)
            } else {
                Err(ContainerError::NotAFactory(bean_name.to_string()))
            };
        }
        if !is_factory {
            return Ok(bean);
        }

        let singleton_product = bean
            .view::<dyn FactoryBean, _>(|factory| factory.is_singleton())
            .unwrap_or(false);
        if !singleton_product {
            return self.get_object_from_factory_bean(&bean, bean_name);
        }
        if self.creation_tracker.is_creating(bean_name) {
            tracing::debug!(
                "FactoryBean '{}' is still being created, its object is not cached yet",
                bean_name
            );
            return self.get_object_from_factory_bean(&bean, bean_name);
        }

        if let Some(cached) = self.factory_bean_objects.read().get(bean_name).cloned() {
            return Ok(cached);
        }
        let _lock = self.singleton_lock.lock();
        if let Some(cached) = self.factory_bean_objects.read().get(bean_name).cloned() {
            return Ok(cached);
        }
        let object = self.get_object_from_factory_bean(&bean, bean_name)?;
        self.factory_bean_objects
            .write()
            .insert(bean_name.to_string(), object.clone());
        Ok(object)
    }

    fn get_object_from_factory_bean(&self, factory: &BeanRef, bean_name: &str) -> ContainerResult<BeanRef> {
        tracing::debug!("Bean '{}' is a FactoryBean, requesting its object", bean_name);
        let produced = factory
            .view::<dyn FactoryBean, _>(|f| f.get_object())
            .ok_or_else(|| ContainerError::NotAFactory(bean_name.to_string()))?
            .map_err(|e| ContainerError::creation_failed(bean_name, e))?;
        produced.ok_or_else(|| ContainerError::FactoryProduce {
            name: bean_name.to_string(),
            reason: "FactoryBean returned no object".to_string(),
        })
    }

    /// 按类型扫描时判断 FactoryBean 的产物是否匹配
    ///
    /// 先看工厂声明的产物类型，只有可能匹配时才生产对象：
    /// - 产物是原型且不包含原型时跳过
    /// - 声明类型与目标相同时生产
    /// - 声明了其他类型时，只检查已缓存的单例产物
    /// - 未声明类型时，只对单例产物生产后再检查
    fn matching_factory_product(
        &self,
        name: &str,
        required_type: &TypeKey,
        include_prototypes: bool,
    ) -> ContainerResult<Option<BeanRef>> {
        let factory = self.do_get_bean(&format!("{}{}", FACTORY_BEAN_PREFIX, name))?;
        let (object_type, singleton_product) = factory
            .view::<dyn FactoryBean, _>(|f| (f.object_type(), f.is_singleton()))
            .ok_or_else(|| ContainerError::NotAFactory(name.to_string()))?;
        if !singleton_product && !include_prototypes {
            return Ok(None);
        }

        let produce = match &object_type {
            Some(declared) if declared == required_type => true,
            Some(_) => {
                let cached = self.factory_bean_objects.read().get(name).cloned();
                return Ok(cached.filter(|product| product.is_assignable_to(required_type)));
            }
            None => singleton_product,
        };
        if !produce {
            return Ok(None);
        }

        let product = self.get_object_for_bean_instance(factory, name, false)?;
        Ok(product.is_assignable_to(required_type).then_some(product))
    }

    /// 创建 Bean 实例并调用生命周期回调
    ///
    /// 1. 先初始化 depends-on 中的 Bean
    /// 2. 实例化（构造函数装配或无参构造）
    /// 3. 单例提前放入缓存
    /// 4. 属性填充（按名称/类型装配 + 显式属性值）
    /// 5. BeanNameAware, BeanFactoryAware
    /// 6. BeanPostProcessor.post_process_before_initialization
    /// 7. InitializingBean.after_properties_set，然后自定义 init-method
    /// 8. BeanPostProcessor.post_process_after_initialization
    fn create_bean(&self, name: &str, definition: &BeanDefinition) -> ContainerResult<BeanRef> {
        if !self.creation_tracker.start_creating(name) {
            let mut chain = self.creation_tracker.current_chain();
            chain.push(name.to_string());
            return Err(ContainerError::CircularDependency(chain.join(" -> ")));
        }

        // 使用 RAII 模式确保在任何情况下都会清理标记
        struct CreationGuard<'a> {
            tracker: &'a CreationTracker,
            name: &'a str,
        }

        impl Drop for CreationGuard<'_> {
            fn drop(&mut self) {
                self.tracker.finish_creating(self.name);
            }
        }

        let _guard = CreationGuard {
            tracker: &self.creation_tracker,
            name,
        };

        for dependency in definition.depends_on() {
            tracing::debug!("Bean '{}' depends on '{}', initializing it first", name, dependency);
            self.do_get_bean(dependency)?;
        }

        let mode = definition.resolved_autowire_mode();
        let bean = if mode == AutowireMode::Constructor || definition.has_constructor_argument_values() {
            self.autowire_constructor(
                name,
                definition.bean_class(),
                definition.constructor_argument_values(),
            )?
        } else {
            self.instantiate_bean(name, definition.bean_class())?
        };

        if definition.is_singleton() {
            tracing::debug!("Eagerly caching bean '{}' to allow for resolving circular references", name);
            self.add_singleton(name, bean.clone());
        }

        self.populate_bean(name, mode, definition.property_values(), &bean)?;
        self.initialize_bean(name, bean, Some(definition))
    }

    fn initialize_bean(
        &self,
        name: &str,
        bean: BeanRef,
        definition: Option<&BeanDefinition>,
    ) -> ContainerResult<BeanRef> {
        self.invoke_aware_methods(name, &bean);
        let bean = self.apply_bean_post_processors_before_initialization(bean, name)?;
        self.invoke_init_methods(name, &bean, definition)?;
        self.apply_bean_post_processors_after_initialization(bean, name)
    }

    fn invoke_aware_methods(&self, name: &str, bean: &BeanRef) {
        if bean.view_mut::<dyn BeanNameAware, _>(|b| b.set_bean_name(name)).is_some() {
            tracing::trace!("Injected bean name into '{}'", name);
        }
        let factory = self.weak_ref();
        if bean
            .view_mut::<dyn BeanFactoryAware, _>(|b| b.set_bean_factory(factory))
            .is_some()
        {
            tracing::trace!("Injected bean factory into '{}'", name);
        }
    }

    fn invoke_init_methods(
        &self,
        name: &str,
        bean: &BeanRef,
        definition: Option<&BeanDefinition>,
    ) -> ContainerResult<()> {
        if let Some(result) = bean.view_mut::<dyn InitializingBean, _>(|b| b.after_properties_set()) {
            tracing::debug!("Invoked after_properties_set on bean '{}'", name);
            result.map_err(|e| ContainerError::creation_failed(name, e))?;
        }
        if let Some(method) = definition.and_then(BeanDefinition::init_method_name) {
            tracing::debug!("Invoking custom init method '{}' on bean '{}'", method, name);
            self.invoke_custom_method(bean, method)
                .map_err(|e| ContainerError::creation_failed(name, e))?;
        }
        Ok(())
    }

    fn invoke_custom_method(&self, bean: &BeanRef, method: &str) -> ContainerResult<()> {
        bean.with_instance_mut(|class, target| class.invoke_method(method, target))
            .unwrap_or_else(|| {
                Err(ContainerError::IllegalState(format!(
                    "method '{}' is not declared on class '{}'",
                    method,
                    bean.type_name()
                )))
            })
    }

    /// 销毁回调：先 DisposableBean，再自定义 destroy-method，两者都会尝试
    fn destroy_bean(&self, name: &str, bean: &BeanRef) -> ContainerResult<()> {
        let mut first_error = None;

        if let Some(Err(err)) = bean.view_mut::<dyn DisposableBean, _>(|b| b.destroy()) {
            tracing::warn!("DisposableBean.destroy() on bean '{}' failed: {}", name, err);
            first_error.get_or_insert(err);
        }

        let definition = self.registry.get_bean_definition(name).ok();
        if let Some(method) = definition.as_deref().and_then(BeanDefinition::destroy_method_name) {
            tracing::debug!("Invoking custom destroy method '{}' on bean '{}'", method, name);
            if let Err(err) = self.invoke_custom_method(bean, method) {
                tracing::warn!("Destroy method '{}' on bean '{}' failed: {}", method, name, err);
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(ContainerError::BeanDestructionFailed {
                name: name.to_string(),
                source: Box::new(err),
            }),
            None => Ok(()),
        }
    }

    fn ensure_not_frozen(&self, action: &str) -> ContainerResult<()> {
        if self.is_configuration_frozen() {
            return Err(ContainerError::IllegalState(format!(
                "cannot {} after the bean factory configuration has been frozen",
                action
            )));
        }
        Ok(())
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn get_bean(&self, name: &str) -> ContainerResult<BeanRef> {
        self.do_get_bean(name)
    }

    fn get_bean_of_type(&self, name: &str, required_type: &TypeKey) -> ContainerResult<BeanRef> {
        let bean = self.do_get_bean(name)?;
        if !bean.is_assignable_to(required_type) {
            return Err(ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: required_type.short_name().to_string(),
                found: bean.type_name().to_string(),
            });
        }
        Ok(bean)
    }

    fn contains_bean(&self, name: &str) -> bool {
        let (bean_name, _) = transformed_bean_name(name);
        self.contains_singleton(bean_name) || self.registry.contains_bean_definition(bean_name)
    }

    fn is_singleton(&self, name: &str) -> ContainerResult<bool> {
        let (bean_name, is_factory_dereference) = transformed_bean_name(name);

        let factory_product_singleton = |factory: &BeanRef| {
            factory
                .view::<dyn FactoryBean, _>(|f| f.is_singleton())
                .unwrap_or(true)
        };

        if let Some(shared) = self.get_singleton(bean_name) {
            if !is_factory_dereference && shared.implements::<dyn FactoryBean>() {
                return Ok(factory_product_singleton(&shared));
            }
            return Ok(true);
        }

        let definition = self.registry.get_bean_definition(bean_name)?;
        if definition.is_factory_bean() && !is_factory_dereference {
            let factory = self.do_get_bean(&format!("{}{}", FACTORY_BEAN_PREFIX, bean_name))?;
            return Ok(factory_product_singleton(&factory));
        }
        Ok(definition.is_singleton())
    }
}

impl ListableBeanFactory for DefaultListableBeanFactory {
    fn get_bean_names_for_type(&self, filter: Option<&TypeKey>) -> Vec<String> {
        self.registry.get_bean_definition_names_for_type(filter)
    }

    fn get_beans_of_type(
        &self,
        required_type: &TypeKey,
        include_prototypes: bool,
        include_factory_beans: bool,
    ) -> ContainerResult<Vec<(String, BeanRef)>> {
        let mut result: Vec<(String, BeanRef)> = Vec::new();

        for (name, definition) in self.registry.snapshot() {
            if !include_prototypes && !definition.is_singleton() {
                continue;
            }
            let class = definition.bean_class();
            if class.is_assignable_to(required_type) {
                if definition.is_factory_bean() {
                    let factory_name = format!("{}{}", FACTORY_BEAN_PREFIX, name);
                    let factory = self.do_get_bean(&factory_name)?;
                    result.push((factory_name, factory));
                } else {
                    let bean = self.do_get_bean(&name)?;
                    result.push((name, bean));
                }
            } else if include_factory_beans && definition.is_factory_bean() {
                match self.matching_factory_product(&name, required_type, include_prototypes) {
                    Ok(Some(product)) => result.push((name, product)),
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(
                            "Skipping FactoryBean '{}' while matching type '{}': {}",
                            name,
                            required_type.short_name(),
                            err
                        );
                    }
                }
            }
        }

        let manual: Vec<(String, BeanRef)> = {
            let cache = self.singletons.read();
            cache
                .order
                .iter()
                .filter(|name| !self.registry.contains_bean_definition(name))
                .filter_map(|name| cache.instances.get(name).map(|bean| (name.clone(), bean.clone())))
                .collect()
        };
        for (name, bean) in manual {
            if bean.is_assignable_to(required_type) {
                result.push((name, bean));
            }
        }

        Ok(result)
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        tracing::debug!("Registered BeanPostProcessor '{}'", processor.name());
        self.bean_post_processors.write().push(processor);
    }

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.bean_post_processors.read().clone()
    }

    fn register_singleton(&self, name: &str, bean: BeanRef) -> ContainerResult<()> {
        if name.trim().is_empty() || name.starts_with(FACTORY_BEAN_PREFIX) {
            return Err(ContainerError::IllegalArgument(format!(
                "invalid singleton name '{}'",
                name
            )));
        }
        let _lock = self.singleton_lock.lock();
        if self.contains_singleton(name) {
            return Err(ContainerError::BeanAlreadyExists(name.to_string()));
        }
        self.add_singleton(name, bean);
        tracing::debug!("Registered singleton '{}'", name);
        Ok(())
    }

    fn set_type_converter(&self, converter: Arc<dyn TypeConverter>) {
        *self.type_converter.write() = converter;
    }

    fn add_converter_registrar(&self, registrar: Arc<dyn ConverterRegistrar>) {
        registrar.register_custom_converters(self.default_converter.as_ref());
    }

    fn destroy_singleton(&self, name: &str) -> ContainerResult<()> {
        let bean = {
            let _lock = self.singleton_lock.lock();
            self.remove_singleton(name)
        };
        match bean {
            Some(bean) => self.destroy_bean(name, &bean),
            None => Ok(()),
        }
    }

    fn destroy_singletons(&self) -> Vec<ContainerError> {
        let names = self.get_singleton_names();
        tracing::info!("Destroying {} singleton bean(s)", names.len());

        let mut failures = Vec::new();
        for name in names {
            if let Err(err) = self.destroy_singleton(&name) {
                failures.push(err);
            }
        }
        self.factory_bean_objects.write().clear();

        tracing::info!("Singleton beans destruction completed");
        failures
    }
}

impl AutowireCapableBeanFactory for DefaultListableBeanFactory {
    fn autowire(&self, class: &Arc<BeanClass>, mode: AutowireMode) -> ContainerResult<BeanRef> {
        let name = class.name().to_string();
        let mode = match mode {
            AutowireMode::Autodetect if class.has_default_constructor() => AutowireMode::ByType,
            AutowireMode::Autodetect => AutowireMode::Constructor,
            other => other,
        };
        if mode == AutowireMode::Constructor {
            return self.autowire_constructor(&name, class, &Default::default());
        }
        let bean = self.instantiate_bean(&name, class)?;
        self.populate_bean(&name, mode, &Default::default(), &bean)?;
        Ok(bean)
    }

    fn autowire_bean_properties(&self, bean: &BeanRef, mode: AutowireMode) -> ContainerResult<()> {
        match mode {
            AutowireMode::ByName | AutowireMode::ByType => {
                let name = bean.type_name().to_string();
                self.populate_bean(&name, mode, &Default::default(), bean)
            }
            other => Err(ContainerError::IllegalArgument(format!(
                "only byName and byType autowiring apply to existing instances, got '{}'",
                other
            ))),
        }
    }

    fn apply_bean_post_processors_before_initialization(
        &self,
        bean: BeanRef,
        bean_name: &str,
    ) -> ContainerResult<BeanRef> {
        let mut current = bean;
        for processor in self.get_bean_post_processors() {
            tracing::trace!("Applying '{}' before initialization of '{}'", processor.name(), bean_name);
            current = processor
                .post_process_before_initialization(current, bean_name)
                .map_err(|e| ContainerError::creation_failed(bean_name, e))?;
        }
        Ok(current)
    }

    fn apply_bean_post_processors_after_initialization(
        &self,
        bean: BeanRef,
        bean_name: &str,
    ) -> ContainerResult<BeanRef> {
        let mut current = bean;
        for processor in self.get_bean_post_processors() {
            tracing::trace!("Applying '{}' after initialization of '{}'", processor.name(), bean_name);
            current = processor
                .post_process_after_initialization(current, bean_name)
                .map_err(|e| ContainerError::creation_failed(bean_name, e))?;
        }
        Ok(current)
    }
}

impl ConfigurableListableBeanFactory for DefaultListableBeanFactory {
    fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        let definitions = self.registry.snapshot();
        tracing::debug!("Pre-instantiating singletons among {} bean definition(s)", definitions.len());

        for (name, definition) in definitions {
            if !definition.is_singleton() || definition.is_lazy_init() {
                continue;
            }
            if definition.is_factory_bean() {
                let factory = self.do_get_bean(&format!("{}{}", FACTORY_BEAN_PREFIX, name))?;
                let singleton_product = factory
                    .view::<dyn FactoryBean, _>(|f| f.is_singleton())
                    .unwrap_or(false);
                if singleton_product {
                    self.do_get_bean(&name)?;
                }
            } else {
                self.do_get_bean(&name)?;
            }
        }
        Ok(())
    }

    fn freeze_configuration(&self) {
        *self.configuration_frozen.write() = true;
        tracing::debug!("Bean factory configuration frozen");
    }

    fn is_configuration_frozen(&self) -> bool {
        *self.configuration_frozen.read()
    }

    fn modify_bean_definition<F>(&self, name: &str, modifier: F) -> ContainerResult<()>
    where
        F: FnOnce(&mut BeanDefinition),
    {
        self.ensure_not_frozen("modify bean definitions")?;
        let current = self.registry.get_bean_definition(name)?;
        let mut modified = BeanDefinition::clone(&current);
        modifier(&mut modified);
        self.registry.replace_bean_definition(name, modified)?;
        tracing::debug!("Bean definition '{}' modified", name);
        Ok(())
    }

    fn validate_dependencies(&self) -> ContainerResult<()> {
        let mut order = Vec::new();
        let mut graph = HashMap::new();
        for (name, definition) in self.registry.snapshot() {
            graph.insert(name.clone(), definition.depends_on().to_vec());
            order.push(name);
        }
        for name in self.get_singleton_names() {
            if !graph.contains_key(&name) {
                graph.insert(name.clone(), Vec::new());
                order.push(name);
            }
        }
        validate_dependency_graph(&order, &graph)
            .map_err(|e| ContainerError::DependencyValidationFailed(e.to_string()))
    }
}

impl BeanDefinitionRegistry for DefaultListableBeanFactory {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()> {
        self.ensure_not_frozen("register bean definitions")?;
        self.registry.register_bean_definition(name, definition)
    }

    fn get_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>> {
        self.registry.get_bean_definition(name)
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.registry.contains_bean_definition(name)
    }

    fn get_bean_definition_names(&self) -> Vec<String> {
        self.registry.get_bean_definition_names()
    }

    fn get_bean_definition_names_for_type(&self, filter: Option<&TypeKey>) -> Vec<String> {
        self.registry.get_bean_definition_names_for_type(filter)
    }

    fn get_bean_definition_count(&self) -> usize {
        self.registry.get_bean_definition_count()
    }
}

impl ConverterRegistry for DefaultListableBeanFactory {
    fn register_custom_converter(&self, target: TypeKey, converter: Arc<dyn CustomConverter>) {
        self.default_converter.register_custom_converter(target, converter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use crate::value::{ManagedList, Value, ValueType};

    #[test]
    fn test_singleton_returns_identical_instance() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("coin", qq_coin_definition(&journal, 10))
            .unwrap();

        let first = factory.get_bean("coin").unwrap();
        let second = factory.get_bean("coin").unwrap();
        assert!(first.ptr_eq(&second));
        assert!(factory.is_singleton("coin").unwrap());
        assert_eq!(journal.count("QqCoin::new"), 1);
    }

    #[test]
    fn test_prototype_returns_distinct_equal_instances() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("coin", qq_coin_definition(&journal, 10).with_singleton(false))
            .unwrap();

        let first = factory.get_bean("coin").unwrap();
        let second = factory.get_bean("coin").unwrap();
        assert!(!first.ptr_eq(&second));
        assert_eq!(
            first.read::<QqCoin>().unwrap().count,
            second.read::<QqCoin>().unwrap().count
        );
        assert!(!factory.is_singleton("coin").unwrap());
        assert_eq!(factory.get_singleton_count(), 0);
    }

    #[test]
    fn test_missing_bean() {
        let factory = DefaultListableBeanFactory::new();
        assert!(matches!(factory.get_bean("nothing"), Err(ContainerError::BeanNotFound(_))));
        assert!(!factory.contains_bean("nothing"));
    }

    #[test]
    fn test_property_cycle_between_singletons_is_resolved() {
        let factory = DefaultListableBeanFactory::new();
        register_country_and_capital(&factory);

        let country = factory.get_bean("country").unwrap();
        let capital = factory.get_bean("capital").unwrap();

        let country_capital = country.read::<Country>().unwrap().capital.clone().unwrap();
        let capital_country = capital.read::<Capital>().unwrap().country.clone().unwrap();
        assert!(country_capital.ptr_eq(&capital));
        assert!(capital_country.ptr_eq(&country));
        assert_eq!(capital.read::<Capital>().unwrap().name, "Beijing");
    }

    #[test]
    fn test_constructor_cycle_is_reported() {
        let factory = DefaultListableBeanFactory::new();
        factory
            .register_bean_definition(
                "egg",
                BeanDefinition::new(egg_class()).with_autowire_mode(AutowireMode::Constructor),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "chicken",
                BeanDefinition::new(chicken_class()).with_autowire_mode(AutowireMode::Constructor),
            )
            .unwrap();

        let err = factory.get_bean("egg").unwrap_err();
        assert!(matches!(err.root_cause(), ContainerError::CircularDependency(_)));
        assert!(!factory.contains_singleton("egg"));
        assert!(!factory.contains_singleton("chicken"));
    }

    #[test]
    fn test_depends_on_initializes_dependencies_first() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition(
                "late",
                BeanDefinition::new(recorder_class(&journal, "late")).with_depends_on(vec!["early".into()]),
            )
            .unwrap();
        factory
            .register_bean_definition("early", BeanDefinition::new(recorder_class(&journal, "early")))
            .unwrap();

        factory.get_bean("late").unwrap();
        assert_eq!(journal.entries(), vec!["create early", "create late"]);
    }

    #[test]
    fn test_depends_on_cycle_is_reported() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition(
                "a",
                BeanDefinition::new(recorder_class(&journal, "a")).with_depends_on(vec!["b".into()]),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "b",
                BeanDefinition::new(recorder_class(&journal, "b")).with_depends_on(vec!["a".into()]),
            )
            .unwrap();

        let err = factory.get_bean("a").unwrap_err();
        assert!(matches!(err, ContainerError::CircularDependency(ref chain) if chain == "a -> b -> a"));
        assert!(matches!(
            factory.validate_dependencies(),
            Err(ContainerError::DependencyValidationFailed(_))
        ));
    }

    #[test]
    fn test_lifecycle_callback_order() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory.add_bean_post_processor(Arc::new(JournalingProcessor::new(&journal)));
        factory
            .register_bean_definition("coin", qq_coin_definition(&journal, 256).with_init_method("init"))
            .unwrap();
        factory
            .register_bean_definition(
                "tencent",
                BeanDefinition::new(tencent_class(&journal)).with_autowire_mode(AutowireMode::Constructor),
            )
            .unwrap();

        let tencent = factory.get_bean("tencent").unwrap();
        let tencent_events: Vec<_> = journal
            .entries()
            .into_iter()
            .filter(|e| e.contains("tencent") || e.starts_with("Tencent"))
            .collect();
        assert_eq!(
            tencent_events,
            vec![
                "Tencent::new",
                "Tencent::set_bean_name tencent",
                "Tencent::set_bean_factory",
                "before tencent",
                "after tencent",
            ]
        );

        let coin_events: Vec<_> = journal
            .entries()
            .into_iter()
            .filter(|e| e.contains("coin") || e.starts_with("QqCoin"))
            .collect();
        assert_eq!(
            coin_events,
            vec![
                "QqCoin::new",
                "before coin",
                "QqCoin::after_properties_set",
                "QqCoin::init",
                "after coin",
            ]
        );

        let guard = tencent.read::<Tencent>().unwrap();
        assert_eq!(guard.bean_name, "tencent");
        assert!(guard.factory.as_ref().and_then(Weak::upgrade).is_some());
        assert!(guard.coin.ptr_eq(&factory.get_bean("coin").unwrap()));
    }

    #[test]
    fn test_post_processor_can_substitute_instance() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory.add_bean_post_processor(Arc::new(WrappingProcessor));
        factory
            .register_bean_definition("coin", qq_coin_definition(&journal, 5))
            .unwrap();

        let bean = factory.get_bean("coin").unwrap();
        let wrapper = bean.read::<Wrapped>().unwrap();
        assert!(wrapper.inner.is::<QqCoin>());
        drop(wrapper);
        assert!(factory.get_bean("coin").unwrap().ptr_eq(&bean));
    }

    #[test]
    fn test_factory_bean_semantics() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("mint", mint_definition(&journal, 7, true))
            .unwrap();

        let product = factory.get_bean("mint").unwrap();
        assert_eq!(product.read::<QqCoin>().unwrap().count, 7);
        assert!(factory.get_bean("mint").unwrap().ptr_eq(&product));
        assert_eq!(journal.count("Mint::get_object"), 1);

        let mint = factory.get_bean("&mint").unwrap();
        assert!(mint.is::<Mint>());
        assert!(factory.is_singleton("mint").unwrap());
    }

    #[test]
    fn test_factory_bean_prototype_products() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("mint", mint_definition(&journal, 7, false))
            .unwrap();

        let first = factory.get_bean("mint").unwrap();
        let second = factory.get_bean("mint").unwrap();
        assert!(!first.ptr_eq(&second));
        assert!(!factory.is_singleton("mint").unwrap());
        assert!(factory.is_singleton("&mint").unwrap());
    }

    #[test]
    fn test_factory_dereference_on_plain_bean_fails() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("coin", qq_coin_definition(&journal, 1))
            .unwrap();
        assert!(matches!(factory.get_bean("&coin"), Err(ContainerError::NotAFactory(_))));
    }

    #[test]
    fn test_factory_bean_returning_nothing() {
        let factory = DefaultListableBeanFactory::new();
        factory
            .register_bean_definition("empty", BeanDefinition::new(empty_factory_class()))
            .unwrap();
        assert!(matches!(
            factory.get_bean("empty"),
            Err(ContainerError::FactoryProduce { .. })
        ));
    }

    #[test]
    fn test_get_bean_with_required_type() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("coin", qq_coin_definition(&journal, 1))
            .unwrap();

        assert!(factory.get_typed_bean::<QqCoin>("coin").is_ok());
        assert!(factory.get_typed_bean::<dyn InitializingBean>("coin").is_ok());
        assert!(matches!(
            factory.get_typed_bean::<Country>("coin"),
            Err(ContainerError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_managed_list_resolves_in_declaration_order() {
        let factory = DefaultListableBeanFactory::new();
        register_country_and_capital(&factory);
        let citizens = ManagedList::new()
            .with("Tom")
            .with(Value::reference("capital"))
            .with(ManagedList::new().with(Value::reference("country")).with(3));
        factory
            .register_bean_definition(
                "people",
                BeanDefinition::new(people_class()).with_property("citizens", citizens),
            )
            .unwrap();

        let people = factory.get_bean("people").unwrap();
        let guard = people.read::<People>().unwrap();
        assert_eq!(guard.citizens.len(), 3);
        assert_eq!(guard.citizens[0].as_str(), Some("Tom"));
        assert!(guard.citizens[1]
            .as_bean()
            .unwrap()
            .ptr_eq(&factory.get_bean("capital").unwrap()));
        let nested = guard.citizens[2].as_seq().unwrap();
        assert!(nested[0].as_bean().unwrap().is::<Country>());
        assert_eq!(nested[1].as_i64(), Some(3));
    }

    #[test]
    fn test_register_singleton() {
        let factory = DefaultListableBeanFactory::new();
        let bean = BeanRef::of(Wrapped { inner: BeanRef::of(1_i64) });
        factory.register_singleton("manual", bean.clone()).unwrap();

        assert!(factory.get_bean("manual").unwrap().ptr_eq(&bean));
        assert!(factory.contains_bean("manual"));
        assert!(matches!(
            factory.register_singleton("manual", bean.clone()),
            Err(ContainerError::BeanAlreadyExists(_))
        ));
        assert!(factory.register_singleton("&manual", bean).is_err());

        let found = factory.get_beans_of_type(&TypeKey::of::<Wrapped>(), true, true).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "manual");
    }

    #[test]
    fn test_get_beans_of_type_filters() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("single", qq_coin_definition(&journal, 1))
            .unwrap();
        factory
            .register_bean_definition("proto", qq_coin_definition(&journal, 2).with_singleton(false))
            .unwrap();
        factory
            .register_bean_definition("mint", mint_definition(&journal, 3, true))
            .unwrap();

        let key = TypeKey::of::<QqCoin>();
        let names = |beans: Vec<(String, BeanRef)>| beans.into_iter().map(|(n, _)| n).collect::<Vec<_>>();

        assert_eq!(names(factory.get_beans_of_type(&key, true, true).unwrap()), vec!["single", "proto", "mint"]);
        assert_eq!(names(factory.get_beans_of_type(&key, false, true).unwrap()), vec!["single", "mint"]);
        assert_eq!(names(factory.get_beans_of_type(&key, true, false).unwrap()), vec!["single", "proto"]);
        assert_eq!(
            names(factory.get_beans_of_type(&TypeKey::of::<dyn FactoryBean>(), true, false).unwrap()),
            vec!["&mint"]
        );
        assert_eq!(factory.get_bean_names_for_type(Some(&key)), vec!["single", "proto"]);
    }

    #[test]
    fn test_preinstantiate_skips_lazy_and_prototypes() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("eager", BeanDefinition::new(recorder_class(&journal, "eager")))
            .unwrap();
        factory
            .register_bean_definition(
                "lazy",
                BeanDefinition::new(recorder_class(&journal, "lazy")).with_lazy_init(true),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "proto",
                BeanDefinition::new(recorder_class(&journal, "proto")).with_singleton(false),
            )
            .unwrap();
        factory
            .register_bean_definition("mint", mint_definition(&journal, 1, true))
            .unwrap();

        factory.preinstantiate_singletons().unwrap();
        assert_eq!(journal.entries_starting_with("create"), vec!["create eager"]);
        assert!(factory.contains_singleton("mint"));
        assert_eq!(journal.count("Mint::get_object"), 1);
    }

    #[test]
    fn test_destroy_singletons_in_creation_order() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("first", qq_coin_definition(&journal, 1).with_destroy_method("close"))
            .unwrap();
        factory
            .register_bean_definition("second", qq_coin_definition(&journal, 2).with_destroy_method("close"))
            .unwrap();

        factory.get_bean("second").unwrap();
        factory.get_bean("first").unwrap();
        let failures = factory.destroy_singletons();

        assert!(failures.is_empty());
        assert_eq!(
            journal.entries_starting_with("QqCoin::destroy"),
            vec!["QqCoin::destroy 2", "QqCoin::destroy 1"]
        );
        assert_eq!(
            journal.entries_starting_with("QqCoin::close"),
            vec!["QqCoin::close 2", "QqCoin::close 1"]
        );
        assert_eq!(factory.get_singleton_count(), 0);
    }

    #[test]
    fn test_destroy_failure_does_not_stop_destruction() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("broken", qq_coin_definition(&journal, 1).with_destroy_method("explode"))
            .unwrap();
        factory
            .register_bean_definition("fine", qq_coin_definition(&journal, 2).with_destroy_method("close"))
            .unwrap();
        factory.preinstantiate_singletons().unwrap();

        let failures = factory.destroy_singletons();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], ContainerError::BeanDestructionFailed { ref name, .. } if name == "broken"));
        assert_eq!(journal.entries_starting_with("QqCoin::close"), vec!["QqCoin::close 2"]);
        assert_eq!(factory.get_singleton_count(), 0);
    }

    #[test]
    fn test_failed_singleton_is_not_cached() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition(
                "country",
                BeanDefinition::new(country_class()).with_property("capital", Value::reference("missing")),
            )
            .unwrap();
        factory
            .register_bean_definition("coin", qq_coin_definition(&journal, -1))
            .unwrap();

        assert!(matches!(factory.get_bean("country"), Err(ContainerError::BeanNotFound(_))));
        assert!(!factory.contains_singleton("country"));

        let err = factory.get_bean("coin").unwrap_err();
        assert!(matches!(err, ContainerError::BeanCreationFailed { ref name, .. } if name == "coin"));
        assert!(!factory.contains_singleton("coin"));
    }

    #[test]
    fn test_failed_creation_discards_dependents_created_on_the_way() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("coin", qq_coin_definition(&journal, 1))
            .unwrap();
        factory
            .register_bean_definition(
                "country",
                BeanDefinition::new(country_class())
                    .with_property("capital", Value::reference("capital"))
                    .with_property("population", 1_400_000_000_i64),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "capital",
                BeanDefinition::new(capital_class()).with_property("country", Value::reference("country")),
            )
            .unwrap();

        let coin = factory.get_bean("coin").unwrap();
        assert!(matches!(
            factory.get_bean("country"),
            Err(ContainerError::InvalidDefinition { .. })
        ));
        assert!(!factory.contains_singleton("country"));
        assert!(!factory.contains_singleton("capital"));
        assert!(factory.get_bean("coin").unwrap().ptr_eq(&coin));
        assert_eq!(factory.get_singleton_names(), vec!["coin"]);
    }

    struct Ingot(i64);

    #[derive(Default)]
    struct Forge {
        count: i64,
        smith: Option<BeanRef>,
    }

    impl FactoryBean for Forge {
        fn get_object(&self) -> ContainerResult<Option<BeanRef>> {
            Ok(Some(BeanRef::of(Ingot(self.count))))
        }

        fn object_type(&self) -> Option<TypeKey> {
            Some(TypeKey::of::<Ingot>())
        }
    }

    #[derive(Default)]
    struct Smith {
        ingot: Option<BeanRef>,
    }

    /// `forge.smith -> smith`，`smith.ingot -> forge`，之后才设置 `forge.count`
    fn register_forge_and_smith(factory: &DefaultListableBeanFactory) {
        let forge = BeanClass::builder::<Forge>("Forge")
            .default_constructor()
            .property("smith", ValueType::bean::<Smith>(), |f, v| {
                f.smith = v.into_optional_bean()?;
                Ok(())
            })
            .property("count", ValueType::Int, |f, v| {
                f.count = v.into_i64()?;
                Ok(())
            })
            .factory_bean()
            .build();
        let smith = BeanClass::builder::<Smith>("Smith")
            .default_constructor()
            .property("ingot", ValueType::bean::<Ingot>(), |s, v| {
                s.ingot = v.into_optional_bean()?;
                Ok(())
            })
            .build();
        factory
            .register_bean_definition(
                "forge",
                BeanDefinition::new(Arc::new(forge))
                    .with_property("smith", Value::reference("smith"))
                    .with_property("count", 7_i64),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "smith",
                BeanDefinition::new(Arc::new(smith)).with_property("ingot", Value::reference("forge")),
            )
            .unwrap();
    }

    #[test]
    fn test_factory_bean_object_is_not_cached_while_factory_is_created() {
        let factory = DefaultListableBeanFactory::new();
        register_forge_and_smith(&factory);

        let product = factory.get_bean("forge").unwrap();
        assert_eq!(product.read::<Ingot>().unwrap().0, 7);
        assert!(factory.get_bean("forge").unwrap().ptr_eq(&product));

        let smith = factory.get_bean("smith").unwrap();
        let early = smith.read::<Smith>().unwrap().ingot.clone().unwrap();
        assert!(!early.ptr_eq(&product));
    }

    #[test]
    fn test_type_scan_only_produces_matching_factory_objects() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("mint", mint_definition(&journal, 3, true))
            .unwrap();

        let unrelated = factory.get_beans_of_type(&TypeKey::of::<Wallet>(), true, true).unwrap();
        assert!(unrelated.is_empty());
        assert_eq!(journal.count("Mint::get_object"), 0);

        let coins = factory.get_beans_of_type(&TypeKey::of::<QqCoin>(), true, true).unwrap();
        assert_eq!(coins.len(), 1);
        assert_eq!(journal.count("Mint::get_object"), 1);
    }

    #[test]
    fn test_type_scan_skips_prototype_factory_objects_unless_asked() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("mint", mint_definition(&journal, 3, false))
            .unwrap();

        let key = TypeKey::of::<QqCoin>();
        assert!(factory.get_beans_of_type(&key, false, true).unwrap().is_empty());
        assert_eq!(journal.count("Mint::get_object"), 0);

        let coins = factory.get_beans_of_type(&key, true, true).unwrap();
        assert_eq!(coins.len(), 1);
        assert_eq!(journal.count("Mint::get_object"), 1);
    }

    #[test]
    fn test_concurrent_get_bean_constructs_once() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("slow", BeanDefinition::new(slow_class(&journal)))
            .unwrap();

        let beans: Vec<BeanRef> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| factory.get_bean("slow").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(journal.count("Slow::new"), 1);
        assert!(beans.iter().all(|b| b.ptr_eq(&beans[0])));
    }

    #[test]
    fn test_modify_bean_definition_before_freeze() {
        let factory = DefaultListableBeanFactory::new();
        let journal = Journal::default();
        factory
            .register_bean_definition("coin", qq_coin_definition(&journal, 1))
            .unwrap();

        factory
            .modify_bean_definition("coin", |def| def.set_lazy_init(true))
            .unwrap();
        assert!(factory.get_bean_definition("coin").unwrap().is_lazy_init());

        let invalid = factory.modify_bean_definition("coin", |def| {
            def.set_scope(crate::scope::Scope::Prototype);
        });
        assert!(matches!(invalid, Err(ContainerError::InvalidDefinition { .. })));
        assert!(factory.get_bean_definition("coin").unwrap().is_singleton());

        factory.freeze_configuration();
        assert!(matches!(
            factory.modify_bean_definition("coin", |def| def.set_lazy_init(false)),
            Err(ContainerError::IllegalState(_))
        ));
        assert!(matches!(
            factory.register_bean_definition("other", qq_coin_definition(&journal, 2)),
            Err(ContainerError::IllegalState(_))
        ));
    }
}
