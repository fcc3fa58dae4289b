use std::sync::{Arc, Weak};

use sprig_core::prelude::*;

// ==================== 领域类型 ====================

#[derive(Default)]
struct Author {
    name: String,
    book: Option<BeanRef>,
}

#[derive(Default)]
struct Book {
    title: String,
    author: Option<BeanRef>,
}

#[derive(Debug, Clone)]
struct Isbn(String);

/// 按前缀生成 ISBN 的工厂
#[derive(Default)]
struct IsbnFactory {
    prefix: String,
}

impl FactoryBean for IsbnFactory {
    fn get_object(&self) -> ContainerResult<Option<BeanRef>> {
        Ok(Some(BeanRef::of(Isbn(format!("{}-04-X", self.prefix)))))
    }

    fn object_type(&self) -> Option<TypeKey> {
        Some(TypeKey::of::<Isbn>())
    }
}

#[derive(Default)]
struct Catalog {
    books: Vec<Value>,
    isbn: Option<BeanRef>,
    capacity: i64,
}

impl Catalog {
    fn titles(&self) -> Vec<String> {
        self.books
            .iter()
            .filter_map(|book| book.as_bean())
            .filter_map(|book| book.read::<Book>().map(|b| b.title.clone()))
            .collect()
    }
}

struct Librarian {
    name: String,
    catalog: BeanRef,
}

impl BeanNameAware for Librarian {
    fn set_bean_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

impl Librarian {
    fn open(&mut self) -> ContainerResult<()> {
        let catalog = self
            .catalog
            .read::<Catalog>()
            .ok_or_else(|| ContainerError::IllegalState("catalog is not a Catalog".into()))?;
        tracing::info!(
            "{} opens the library: {} title(s), capacity {}",
            self.name,
            catalog.books.len(),
            catalog.capacity
        );
        Ok(())
    }

    fn close(&mut self) -> ContainerResult<()> {
        tracing::info!("{} closes the library", self.name);
        Ok(())
    }
}

/// 记录每个 Bean 的初始化
#[derive(Default)]
struct AuditProcessor;

impl BeanPostProcessor for AuditProcessor {
    fn post_process_after_initialization(&self, bean: BeanRef, bean_name: &str) -> ContainerResult<BeanRef> {
        tracing::info!("Bean '{}' ready ({})", bean_name, bean.type_name());
        Ok(bean)
    }

    fn name(&self) -> &str {
        "AuditProcessor"
    }
}

/// 打印容器事件
#[derive(Default)]
struct StartupReporter {
    context: Option<Weak<ApplicationContext>>,
}

impl ApplicationContextAware for StartupReporter {
    fn set_application_context(&mut self, context: Weak<ApplicationContext>) {
        self.context = Some(context);
    }
}

impl ApplicationListener for StartupReporter {
    fn on_application_event(&self, event: &Arc<dyn Event>) {
        let beans = self
            .context
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|context| context.get_bean_names_for_type(None).len())
            .unwrap_or(0);
        println!("📣 {} ({} bean definition(s))", event.event_name(), beans);
    }

    fn listener_name(&self) -> &str {
        "StartupReporter"
    }
}

// ==================== 类型登记 ====================

fn describe_author() -> BeanClass {
    BeanClass::builder::<Author>("Author")
        .default_constructor()
        .property("name", ValueType::Str, |a, v| {
            a.name = v.into_string()?;
            Ok(())
        })
        .property("book", ValueType::bean::<Book>(), |a, v| {
            a.book = v.into_optional_bean()?;
            Ok(())
        })
        .build()
}

fn describe_book() -> BeanClass {
    BeanClass::builder::<Book>("Book")
        .default_constructor()
        .property("title", ValueType::Str, |b, v| {
            b.title = v.into_string()?;
            Ok(())
        })
        .property("author", ValueType::bean::<Author>(), |b, v| {
            b.author = v.into_optional_bean()?;
            Ok(())
        })
        .build()
}

fn describe_isbn_factory() -> BeanClass {
    BeanClass::builder::<IsbnFactory>("IsbnFactory")
        .default_constructor()
        .property("prefix", ValueType::Str, |f, v| {
            f.prefix = v.into_string()?;
            Ok(())
        })
        .factory_bean()
        .build()
}

fn describe_catalog() -> BeanClass {
    BeanClass::builder::<Catalog>("Catalog")
        .default_constructor()
        .property("books", ValueType::list_of(ValueType::bean::<Book>()), |c, v| {
            c.books = v.into_seq()?;
            Ok(())
        })
        .property("isbn", ValueType::bean::<Isbn>(), |c, v| {
            c.isbn = v.into_optional_bean()?;
            Ok(())
        })
        .property("capacity", ValueType::Int, |c, v| {
            c.capacity = v.into_i64()?;
            Ok(())
        })
        .build()
}

fn describe_librarian() -> BeanClass {
    BeanClass::builder::<Librarian>("Librarian")
        .constructor(vec![ValueType::bean::<Catalog>()], |args| {
            Ok(Librarian {
                name: String::new(),
                catalog: args.bean(0)?,
            })
        })
        .method("open", Librarian::open)
        .method("close", Librarian::close)
        .bean_name_aware()
        .build()
}

fn describe_audit_processor() -> BeanClass {
    BeanClass::builder::<AuditProcessor>("AuditProcessor")
        .default_constructor()
        .bean_post_processor()
        .build()
}

fn describe_startup_reporter() -> BeanClass {
    BeanClass::builder::<StartupReporter>("StartupReporter")
        .default_constructor()
        .application_listener()
        .application_context_aware()
        .build()
}

inventory::submit! { ClassSubmission::new(describe_author) }
inventory::submit! { ClassSubmission::new(describe_book) }
inventory::submit! { ClassSubmission::new(describe_isbn_factory) }
inventory::submit! { ClassSubmission::new(describe_catalog) }
inventory::submit! { ClassSubmission::new(describe_librarian) }
inventory::submit! { ClassSubmission::new(describe_audit_processor) }
inventory::submit! { ClassSubmission::new(describe_startup_reporter) }

// ==================== 主程序 ====================

fn main() -> anyhow::Result<()> {
    let context = SprigApplication::new("library-demo")
        .with_config_location(concat!("file:", env!("CARGO_MANIFEST_DIR"), "/resources/beans.toml"))
        .run()?;

    let author_ref = context.get_bean("tolkien")?;
    let book = context.get_bean("hobbit")?;
    {
        let author = author_ref.read::<Author>().context("tolkien is not an Author")?;
        let held = author.book.as_ref().context("tolkien has no book")?;
        println!("📚 {} wrote {}", author.name, held.read::<Book>().map(|b| b.title.clone()).unwrap_or_default());
        println!("   cycle resolved: {}", held.ptr_eq(&book));
        let back = book.read::<Book>().and_then(|b| b.author.clone());
        println!("   book points back to its author: {}", back.is_some_and(|a| a.ptr_eq(&author_ref)));
    }

    let catalog = context.get_typed_bean::<Catalog>("catalog")?;
    {
        let catalog = catalog.read::<Catalog>().context("catalog is not a Catalog")?;
        println!("🗂  Catalog titles: {:?}", catalog.titles());
        if let Some(isbn) = catalog.isbn.as_ref().and_then(|i| i.cloned::<Isbn>()) {
            println!("   ISBN: {}", isbn.0);
        }
    }

    let factory = context.get_bean("&isbn")?;
    println!("🏭 '&isbn' is the factory itself: {}", factory.is::<IsbnFactory>());

    context.close()?;
    Ok(())
}
