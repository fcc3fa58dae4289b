//! 容器事件与多播器

use std::any::Any;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::bean::BeanRef;

/// 事件 trait - 所有事件都必须实现此 trait
///
/// 类似 Spring 的 ApplicationEvent
pub trait Event: Any + Send + Sync {
    /// 获取事件名称
    fn event_name(&self) -> &str;

    /// 获取事件时间戳
    fn timestamp(&self) -> SystemTime;

    /// 获取事件源（可选）
    fn source(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }

    /// 转换为 Any 引用，用于类型转换
    fn as_any(&self) -> &dyn Any;
}

/// 容器刷新完成事件
///
/// 所有非延迟单例都已创建后发布
#[derive(Debug, Clone)]
pub struct ContextRefreshedEvent {
    /// 上下文显示名称
    pub display_name: String,
    pub timestamp: SystemTime,
}

impl ContextRefreshedEvent {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            timestamp: SystemTime::now(),
        }
    }
}

impl Event for ContextRefreshedEvent {
    fn event_name(&self) -> &str {
        "ContextRefreshedEvent"
    }

    fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 容器关闭事件
///
/// 所有单例销毁之后发布
#[derive(Debug, Clone)]
pub struct ContextClosedEvent {
    pub display_name: String,
    pub timestamp: SystemTime,
}

impl ContextClosedEvent {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            timestamp: SystemTime::now(),
        }
    }
}

impl Event for ContextClosedEvent {
    fn event_name(&self) -> &str {
        "ContextClosedEvent"
    }

    fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 事件监听器 trait
///
/// 类似 Spring 的 ApplicationListener，同步执行
///
/// 监听器是容器中的 Bean 时，回调期间持有该 Bean 的读锁：
/// 回调内可以读取自身实例，但不能获取它的写锁，可变状态应放在内部可变容器中。
pub trait ApplicationListener: Send + Sync {
    /// 处理事件
    fn on_application_event(&self, event: &Arc<dyn Event>);

    /// 获取监听器名称（用于日志）
    fn listener_name(&self) -> &str {
        "AnonymousListener"
    }

    /// 是否处理该事件，默认处理所有事件
    fn supports_event(&self, event: &dyn Event) -> bool {
        let _ = event;
        true
    }
}

/// 类型化事件监听器 trait
///
/// 只接收 `E` 类型的事件
pub trait TypedApplicationListener<E: Event>: Send + Sync {
    fn on_event(&self, event: &E);

    fn listener_name(&self) -> &str {
        "AnonymousTypedListener"
    }
}

/// 将 `TypedApplicationListener<E>` 适配为 `ApplicationListener`
pub struct TypedApplicationListenerAdapter<E: Event, L: TypedApplicationListener<E>> {
    listener: Arc<L>,
    _phantom: PhantomData<fn(&E)>,
}

impl<E: Event, L: TypedApplicationListener<E>> TypedApplicationListenerAdapter<E, L> {
    pub fn new(listener: Arc<L>) -> Self {
        Self {
            listener,
            _phantom: PhantomData,
        }
    }
}

impl<E: Event, L: TypedApplicationListener<E> + 'static> ApplicationListener
    for TypedApplicationListenerAdapter<E, L>
{
    fn on_application_event(&self, event: &Arc<dyn Event>) {
        if let Some(typed_event) = event.as_any().downcast_ref::<E>() {
            self.listener.on_event(typed_event);
        }
    }

    fn listener_name(&self) -> &str {
        self.listener.listener_name()
    }

    fn supports_event(&self, event: &dyn Event) -> bool {
        event.as_any().is::<E>()
    }
}

/// 声明为 Bean 的监听器
pub(crate) struct ApplicationListenerBean {
    name: String,
    bean: BeanRef,
}

impl ApplicationListenerBean {
    pub(crate) fn new(name: impl Into<String>, bean: BeanRef) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            bean,
        })
    }
}

impl ApplicationListener for ApplicationListenerBean {
    fn on_application_event(&self, event: &Arc<dyn Event>) {
        if self
            .bean
            .view::<dyn ApplicationListener, _>(|l| l.on_application_event(event))
            .is_none()
        {
            tracing::warn!("Bean '{}' no longer exposes ApplicationListener", self.name);
        }
    }

    fn listener_name(&self) -> &str {
        &self.name
    }

    fn supports_event(&self, event: &dyn Event) -> bool {
        self.bean
            .view::<dyn ApplicationListener, _>(|l| l.supports_event(event))
            .unwrap_or(false)
    }
}

/// 错误处理器类型
///
/// 接收监听器执行过程中的 panic
pub type ErrorHandler = Arc<dyn Fn(&dyn ApplicationListener, &Arc<dyn Event>, &anyhow::Error) + Send + Sync>;

/// 事件多播器 trait
///
/// 类似 Spring 的 ApplicationEventMulticaster，按注册顺序把事件同步分发给监听器
pub trait ApplicationEventMulticaster: Send + Sync {
    /// 添加监听器，同一个实例只登记一次
    fn add_application_listener(&self, listener: Arc<dyn ApplicationListener>);

    /// 按实例身份移除监听器
    fn remove_application_listener(&self, listener: &Arc<dyn ApplicationListener>);

    fn remove_all_listeners(&self);

    /// 广播事件到所有支持它的监听器
    fn multicast_event(&self, event: Arc<dyn Event>);

    fn listener_count(&self) -> usize;
}

/// 事件发布接口
pub trait ApplicationEventPublisher: Send + Sync {
    fn publish_event(&self, event: Arc<dyn Event>);
}

/// 简单事件多播器实现
///
/// 在发布线程上依次调用监听器。分发前复制监听器列表，
/// 监听器可以在处理事件时增删监听器或继续发布事件。
#[derive(Default)]
pub struct SimpleApplicationEventMulticaster {
    listeners: RwLock<Vec<Arc<dyn ApplicationListener>>>,
    error_handler: RwLock<Option<ErrorHandler>>,
}

impl SimpleApplicationEventMulticaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置错误处理器
    ///
    /// 未设置时监听器的 panic 在记录日志后继续向发布者传播
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&dyn ApplicationListener, &Arc<dyn Event>, &anyhow::Error) + Send + Sync + 'static,
    {
        *self.error_handler.write() = Some(Arc::new(handler));
    }

    pub fn remove_error_handler(&self) {
        *self.error_handler.write() = None;
    }

    fn invoke_listener(
        &self,
        listener: &Arc<dyn ApplicationListener>,
        event: &Arc<dyn Event>,
        error_handler: Option<&ErrorHandler>,
    ) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_application_event(event)));
        if let Err(payload) = outcome {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            let err = anyhow::anyhow!("Listener panicked: {}", message);
            match error_handler {
                Some(handler) => handler(listener.as_ref(), event, &err),
                None => {
                    tracing::error!(
                        "Listener '{}' panicked while handling event '{}': {}",
                        listener.listener_name(),
                        event.event_name(),
                        err
                    );
                    panic::resume_unwind(payload);
                }
            }
        }
    }
}

fn same_listener(a: &Arc<dyn ApplicationListener>, b: &Arc<dyn ApplicationListener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl ApplicationEventMulticaster for SimpleApplicationEventMulticaster {
    fn add_application_listener(&self, listener: Arc<dyn ApplicationListener>) {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|existing| same_listener(existing, &listener)) {
            tracing::trace!("Listener '{}' already registered", listener.listener_name());
            return;
        }
        tracing::debug!("Added event listener: {}", listener.listener_name());
        listeners.push(listener);
    }

    fn remove_application_listener(&self, listener: &Arc<dyn ApplicationListener>) {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|existing| !same_listener(existing, listener));
        if listeners.len() < before {
            tracing::debug!("Removed event listener: {}", listener.listener_name());
        }
    }

    fn remove_all_listeners(&self) {
        self.listeners.write().clear();
        tracing::debug!("Removed all event listeners");
    }

    fn multicast_event(&self, event: Arc<dyn Event>) {
        // 克隆监听器列表，避免长时间持锁
        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .filter(|l| l.supports_event(event.as_ref()))
            .cloned()
            .collect();

        tracing::debug!(
            "Multicasting event: {} to {} listener(s)",
            event.event_name(),
            listeners.len()
        );

        let error_handler = self.error_handler.read().clone();
        for listener in &listeners {
            self.invoke_listener(listener, &event, error_handler.as_ref());
        }
    }

    fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl ApplicationEventPublisher for SimpleApplicationEventMulticaster {
    fn publish_event(&self, event: Arc<dyn Event>) {
        self.multicast_event(event);
    }
}
