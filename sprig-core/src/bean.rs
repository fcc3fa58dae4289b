//! Bean 实例句柄

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::class::{BeanClass, Instance};
use crate::error::{ContainerError, ContainerResult};
use crate::value::TypeKey;

/// FactoryBean - 自身是工厂的 Bean
///
/// 类似 Spring 的 FactoryBean。通过名称获取时得到 `get_object` 的产物，
/// 通过 `&name` 获取时得到工厂本身。
pub trait FactoryBean: Send + Sync {
    /// 生产对象，返回 `None` 视为生产失败
    fn get_object(&self) -> ContainerResult<Option<BeanRef>>;

    /// 产物的类型（未知时返回 `None`）
    fn object_type(&self) -> Option<TypeKey> {
        None
    }

    /// 产物是否为单例，单例产物会被缓存
    fn is_singleton(&self) -> bool {
        true
    }
}

struct BeanCell {
    class: Arc<BeanClass>,
    instance: RwLock<Instance>,
}

/// 容器管理的实例句柄
///
/// 克隆句柄不会复制实例；`ptr_eq` 判断两个句柄是否指向同一个实例。
/// 实例放在读写锁里，容器可以先发布单例再填充属性。
#[derive(Clone)]
pub struct BeanRef {
    inner: Arc<BeanCell>,
}

impl BeanRef {
    pub(crate) fn from_instance(class: Arc<BeanClass>, instance: Instance) -> Self {
        Self {
            inner: Arc::new(BeanCell {
                class,
                instance: RwLock::new(instance),
            }),
        }
    }

    /// 用给定元数据包装一个实例
    pub fn with_class<T: Any + Send + Sync>(value: T, class: Arc<BeanClass>) -> ContainerResult<Self> {
        if class.type_key() != TypeKey::of::<T>() {
            return Err(ContainerError::TypeMismatch {
                name: class.name().to_string(),
                expected: class.type_key().name().to_string(),
                found: std::any::type_name::<T>().to_string(),
            });
        }
        Ok(Self::from_instance(class, Box::new(value)))
    }

    /// 包装一个没有任何能力声明的实例
    pub fn of<T: Any + Send + Sync>(value: T) -> Self {
        let class = BeanClass::bare::<T>(TypeKey::of::<T>().short_name());
        Self::from_instance(Arc::new(class), Box::new(value))
    }

    pub fn class(&self) -> &Arc<BeanClass> {
        &self.inner.class
    }

    pub fn type_name(&self) -> &str {
        self.inner.class.name()
    }

    pub fn ptr_eq(&self, other: &BeanRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.instance.read_recursive().is::<T>()
    }

    pub fn is_assignable_to(&self, key: &TypeKey) -> bool {
        self.inner.class.is_assignable_to(key)
    }

    pub fn implements<I: ?Sized + 'static>(&self) -> bool {
        self.inner.class.implements::<I>()
    }

    /// 以具体类型只读访问
    ///
    /// 读锁可重入：回调中再次读取同一个实例不会阻塞
    pub fn read<T: Any>(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        RwLockReadGuard::try_map(self.inner.instance.read_recursive(), |instance| instance.downcast_ref::<T>()).ok()
    }

    /// 以具体类型可写访问
    pub fn write<T: Any>(&self) -> Option<MappedRwLockWriteGuard<'_, T>> {
        RwLockWriteGuard::try_map(self.inner.instance.write(), |instance| instance.downcast_mut::<T>()).ok()
    }

    /// 通过接口 `I` 只读访问，未声明该接口时返回 `None`
    ///
    /// `f` 执行期间持有实例的读锁，`f` 内对同一实例的 `write`/`view_mut` 会死锁
    pub fn view<I: ?Sized + 'static, R>(&self, f: impl FnOnce(&I) -> R) -> Option<R> {
        if !self.implements::<I>() {
            return None;
        }
        let guard = self.inner.instance.read_recursive();
        let result = self.inner.class.view::<I>(&**guard).map(f);
        result
    }

    /// 通过接口 `I` 可写访问
    pub fn view_mut<I: ?Sized + 'static, R>(&self, f: impl FnOnce(&mut I) -> R) -> Option<R> {
        if !self.implements::<I>() {
            return None;
        }
        let mut guard = self.inner.instance.write();
        let result = self.inner.class.view_mut::<I>(&mut **guard).map(f);
        result
    }

    pub(crate) fn with_instance_mut<R>(&self, f: impl FnOnce(&BeanClass, &mut (dyn Any + Send + Sync)) -> R) -> R {
        let mut guard = self.inner.instance.write();
        f(&self.inner.class, &mut **guard)
    }

    /// 按具体类型克隆出实例的值
    pub fn cloned<T: Any + Clone>(&self) -> Option<T> {
        self.read::<T>().map(|guard| guard.clone())
    }
}

impl fmt::Debug for BeanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BeanRef({}@{:p})", self.type_name(), Arc::as_ptr(&self.inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        count: i64,
    }

    trait Countable: Send + Sync {
        fn current(&self) -> i64;
        fn bump(&mut self);
    }

    impl Countable for Counter {
        fn current(&self) -> i64 {
            self.count
        }

        fn bump(&mut self) {
            self.count += 1;
        }
    }

    fn counter_class() -> Arc<BeanClass> {
        Arc::new(
            BeanClass::builder::<Counter>("Counter")
                .constructor(vec![ValueType::Int], |args| Ok(Counter { count: args.int(0)? }))
                .implements::<dyn Countable>(|c| c as &dyn Countable, |c| c as &mut dyn Countable)
                .build(),
        )
    }

    #[test]
    fn test_clones_share_the_instance() {
        let bean = BeanRef::with_class(Counter { count: 1 }, counter_class()).unwrap();
        let other = bean.clone();
        assert!(bean.ptr_eq(&other));

        other.write::<Counter>().unwrap().count = 5;
        assert_eq!(bean.read::<Counter>().unwrap().count, 5);

        let separate = BeanRef::with_class(Counter { count: 5 }, counter_class()).unwrap();
        assert!(!bean.ptr_eq(&separate));
    }

    #[test]
    fn test_typed_access_with_wrong_type() {
        let bean = BeanRef::of(Counter { count: 1 });
        assert!(bean.is::<Counter>());
        assert!(bean.read::<String>().is_none());
        assert!(bean.write::<String>().is_none());
        assert_eq!(bean.cloned::<Counter>(), Some(Counter { count: 1 }));
    }

    #[test]
    fn test_interface_views() {
        let bean = BeanRef::with_class(Counter { count: 1 }, counter_class()).unwrap();
        assert!(bean.implements::<dyn Countable>());
        bean.view_mut::<dyn Countable, _>(|c| c.bump());
        assert_eq!(bean.view::<dyn Countable, _>(|c| c.current()), Some(2));

        let bare = BeanRef::of(Counter { count: 1 });
        assert!(bare.view::<dyn Countable, _>(|c| c.current()).is_none());
    }

    #[test]
    fn test_with_class_rejects_foreign_metadata() {
        let err = BeanRef::with_class("text".to_string(), counter_class()).unwrap_err();
        assert!(matches!(err, ContainerError::TypeMismatch { .. }));
    }
}
