//! 测试用的 Bean 类型与登记

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::bean::{BeanRef, FactoryBean};
use crate::bean_definition::BeanDefinition;
use crate::bean_factory::DefaultListableBeanFactory;
use crate::class::BeanClass;
use crate::error::{ContainerError, ContainerResult};
use crate::lifecycle::{BeanFactoryAware, BeanNameAware, BeanPostProcessor, DisposableBean, InitializingBean};
use crate::registry::BeanDefinitionRegistry;
use crate::value::{TypeKey, Value, ValueType};

/// 按发生顺序记录回调
#[derive(Clone, Default)]
pub(crate) struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub(crate) fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub(crate) fn entries_starting_with(&self, prefix: &str) -> Vec<String> {
        self.entries().into_iter().filter(|e| e.starts_with(prefix)).collect()
    }

    pub(crate) fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }
}

#[derive(Default)]
pub(crate) struct Country {
    pub(crate) name: String,
    pub(crate) capital: Option<BeanRef>,
}

#[derive(Default)]
pub(crate) struct Capital {
    pub(crate) name: String,
    pub(crate) country: Option<BeanRef>,
}

pub(crate) fn country_class() -> Arc<BeanClass> {
    Arc::new(
        BeanClass::builder::<Country>("Country")
            .default_constructor()
            .property("name", ValueType::Str, |c, v| {
                c.name = v.into_string()?;
                Ok(())
            })
            .property("capital", ValueType::bean::<Capital>(), |c, v| {
                c.capital = v.into_optional_bean()?;
                Ok(())
            })
            .build(),
    )
}

pub(crate) fn capital_class() -> Arc<BeanClass> {
    Arc::new(
        BeanClass::builder::<Capital>("Capital")
            .default_constructor()
            .property("name", ValueType::Str, |c, v| {
                c.name = v.into_string()?;
                Ok(())
            })
            .property("country", ValueType::bean::<Country>(), |c, v| {
                c.country = v.into_optional_bean()?;
                Ok(())
            })
            .build(),
    )
}

/// `country.capital -> capital`, `capital.country -> country`
pub(crate) fn register_country_and_capital(registry: &DefaultListableBeanFactory) {
    registry
        .register_bean_definition(
            "country",
            BeanDefinition::new(country_class())
                .with_property("name", "China")
                .with_property("capital", Value::reference("capital")),
        )
        .unwrap();
    registry
        .register_bean_definition(
            "capital",
            BeanDefinition::new(capital_class())
                .with_property("name", "Beijing")
                .with_property("country", Value::reference("country")),
        )
        .unwrap();
}

pub(crate) struct QqCoin {
    pub(crate) count: i64,
    journal: Journal,
}

impl InitializingBean for QqCoin {
    fn after_properties_set(&mut self) -> ContainerResult<()> {
        self.journal.record("QqCoin::after_properties_set");
        Ok(())
    }
}

impl DisposableBean for QqCoin {
    fn destroy(&mut self) -> ContainerResult<()> {
        self.journal.record(format!("QqCoin::destroy {}", self.count));
        Ok(())
    }
}

pub(crate) fn qq_coin_class(journal: &Journal) -> Arc<BeanClass> {
    let journal = journal.clone();
    Arc::new(
        BeanClass::builder::<QqCoin>("QqCoin")
            .constructor(vec![ValueType::Int], move |args| {
                let count = args.int(0)?;
                if count < 0 {
                    return Err(ContainerError::IllegalArgument("coin count must not be negative".into()));
                }
                journal.record("QqCoin::new");
                Ok(QqCoin {
                    count,
                    journal: journal.clone(),
                })
            })
            .property("count", ValueType::Int, |coin, v| {
                coin.count = v.into_i64()?;
                Ok(())
            })
            .method("init", |coin| {
                coin.journal.record("QqCoin::init");
                Ok(())
            })
            .method("close", |coin| {
                coin.journal.record(format!("QqCoin::close {}", coin.count));
                Ok(())
            })
            .method("explode", |_| Err(ContainerError::IllegalState("explode".into())))
            .initializing_bean()
            .disposable_bean()
            .build(),
    )
}

pub(crate) fn qq_coin_definition(journal: &Journal, count: i64) -> BeanDefinition {
    BeanDefinition::new(qq_coin_class(journal)).with_indexed_arg(0, count)
}

pub(crate) struct Tencent {
    pub(crate) coin: BeanRef,
    pub(crate) bean_name: String,
    pub(crate) factory: Option<Weak<DefaultListableBeanFactory>>,
    journal: Journal,
}

impl BeanNameAware for Tencent {
    fn set_bean_name(&mut self, name: &str) {
        self.journal.record(format!("Tencent::set_bean_name {}", name));
        self.bean_name = name.to_string();
    }
}

impl BeanFactoryAware for Tencent {
    fn set_bean_factory(&mut self, factory: Weak<DefaultListableBeanFactory>) {
        self.journal.record("Tencent::set_bean_factory");
        self.factory = Some(factory);
    }
}

/// 只有 `(QqCoin)` 一个构造函数
pub(crate) fn tencent_class(journal: &Journal) -> Arc<BeanClass> {
    let journal = journal.clone();
    Arc::new(
        BeanClass::builder::<Tencent>("Tencent")
            .constructor(vec![ValueType::bean::<QqCoin>()], move |args| {
                journal.record("Tencent::new");
                Ok(Tencent {
                    coin: args.bean(0)?,
                    bean_name: String::new(),
                    factory: None,
                    journal: journal.clone(),
                })
            })
            .bean_name_aware()
            .bean_factory_aware()
            .build(),
    )
}

#[derive(Default)]
pub(crate) struct Wallet {
    pub(crate) coin: Option<BeanRef>,
}

pub(crate) fn wallet_class() -> Arc<BeanClass> {
    Arc::new(
        BeanClass::builder::<Wallet>("Wallet")
            .default_constructor()
            .property("coin", ValueType::bean::<QqCoin>(), |w, v| {
                w.coin = v.into_optional_bean()?;
                Ok(())
            })
            .build(),
    )
}

/// 生产 [`QqCoin`] 的 FactoryBean
pub(crate) struct Mint {
    count: i64,
    singleton: bool,
    journal: Journal,
    coin_class: Arc<BeanClass>,
}

impl FactoryBean for Mint {
    fn get_object(&self) -> ContainerResult<Option<BeanRef>> {
        self.journal.record("Mint::get_object");
        let coin = QqCoin {
            count: self.count,
            journal: self.journal.clone(),
        };
        BeanRef::with_class(coin, Arc::clone(&self.coin_class)).map(Some)
    }

    fn object_type(&self) -> Option<TypeKey> {
        Some(TypeKey::of::<QqCoin>())
    }

    fn is_singleton(&self) -> bool {
        self.singleton
    }
}

pub(crate) fn mint_definition(journal: &Journal, count: i64, singleton: bool) -> BeanDefinition {
    let journal = journal.clone();
    let coin_class = qq_coin_class(&journal);
    let class = BeanClass::builder::<Mint>("Mint")
        .constructor(Vec::new(), move |_| {
            Ok(Mint {
                count: 0,
                singleton: true,
                journal: journal.clone(),
                coin_class: Arc::clone(&coin_class),
            })
        })
        .property("count", ValueType::Int, |m, v| {
            m.count = v.into_i64()?;
            Ok(())
        })
        .property("singleton", ValueType::Bool, |m, v| {
            m.singleton = v.into_bool()?;
            Ok(())
        })
        .factory_bean()
        .build();
    BeanDefinition::new(Arc::new(class))
        .with_property("count", count)
        .with_property("singleton", singleton)
}

#[derive(Default)]
pub(crate) struct EmptyFactory;

impl FactoryBean for EmptyFactory {
    fn get_object(&self) -> ContainerResult<Option<BeanRef>> {
        Ok(None)
    }
}

pub(crate) fn empty_factory_class() -> Arc<BeanClass> {
    Arc::new(
        BeanClass::builder::<EmptyFactory>("EmptyFactory")
            .default_constructor()
            .factory_bean()
            .build(),
    )
}

pub(crate) struct Egg {
    _chicken: BeanRef,
}

pub(crate) struct Chicken {
    _egg: BeanRef,
}

pub(crate) fn egg_class() -> Arc<BeanClass> {
    Arc::new(
        BeanClass::builder::<Egg>("Egg")
            .constructor(vec![ValueType::bean::<Chicken>()], |args| {
                Ok(Egg { _chicken: args.bean(0)? })
            })
            .build(),
    )
}

pub(crate) fn chicken_class() -> Arc<BeanClass> {
    Arc::new(
        BeanClass::builder::<Chicken>("Chicken")
            .constructor(vec![ValueType::bean::<Egg>()], |args| Ok(Chicken { _egg: args.bean(0)? }))
            .build(),
    )
}

pub(crate) struct Recorder;

/// 构造时记录 `create <label>`
pub(crate) fn recorder_class(journal: &Journal, label: &str) -> Arc<BeanClass> {
    let journal = journal.clone();
    let label = label.to_string();
    Arc::new(
        BeanClass::builder::<Recorder>("Recorder")
            .constructor(Vec::new(), move |_| {
                journal.record(format!("create {}", label));
                Ok(Recorder)
            })
            .build(),
    )
}

pub(crate) struct Slow;

pub(crate) fn slow_class(journal: &Journal) -> Arc<BeanClass> {
    let journal = journal.clone();
    Arc::new(
        BeanClass::builder::<Slow>("Slow")
            .constructor(Vec::new(), move |_| {
                std::thread::sleep(Duration::from_millis(50));
                journal.record("Slow::new");
                Ok(Slow)
            })
            .build(),
    )
}

#[derive(Default)]
pub(crate) struct People {
    pub(crate) citizens: Vec<Value>,
}

pub(crate) fn people_class() -> Arc<BeanClass> {
    Arc::new(
        BeanClass::builder::<People>("People")
            .default_constructor()
            .property("citizens", ValueType::list_of(ValueType::Any), |p, v| {
                p.citizens = v.into_seq()?;
                Ok(())
            })
            .build(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Point {
    pub(crate) x: i64,
    pub(crate) y: i64,
    pub(crate) label: String,
}

/// 构造函数按声明顺序：`(int, int)`、`(string)`
pub(crate) fn point_class() -> Arc<BeanClass> {
    Arc::new(
        BeanClass::builder::<Point>("Point")
            .constructor(vec![ValueType::Int, ValueType::Int], |args| {
                Ok(Point {
                    x: args.int(0)?,
                    y: args.int(1)?,
                    label: "xy".to_string(),
                })
            })
            .constructor(vec![ValueType::Str], |args| {
                Ok(Point {
                    x: 0,
                    y: 0,
                    label: args.string(0)?,
                })
            })
            .build(),
    )
}

/// 替身对象
pub(crate) struct Wrapped {
    pub(crate) inner: BeanRef,
}

/// 把 QqCoin 包装成 [`Wrapped`]
pub(crate) struct WrappingProcessor;

impl BeanPostProcessor for WrappingProcessor {
    fn post_process_after_initialization(&self, bean: BeanRef, _bean_name: &str) -> ContainerResult<BeanRef> {
        if bean.is::<QqCoin>() {
            return Ok(BeanRef::of(Wrapped { inner: bean }));
        }
        Ok(bean)
    }
}

/// 记录 `before <name>` / `after <name>`
pub(crate) struct JournalingProcessor {
    journal: Journal,
}

impl JournalingProcessor {
    pub(crate) fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl BeanPostProcessor for JournalingProcessor {
    fn post_process_before_initialization(&self, bean: BeanRef, bean_name: &str) -> ContainerResult<BeanRef> {
        self.journal.record(format!("before {}", bean_name));
        Ok(bean)
    }

    fn post_process_after_initialization(&self, bean: BeanRef, bean_name: &str) -> ContainerResult<BeanRef> {
        self.journal.record(format!("after {}", bean_name));
        Ok(bean)
    }
}
