//! 资源加载
//!
//! 只有配置读取器会使用资源；创建引擎本身不读取任何外部内容。

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{CLASSPATH_ENV, CLASSPATH_URL_PREFIX, FILE_URL_PREFIX};
use crate::error::{ContainerError, ContainerResult};

/// 可读取的资源
pub trait Resource: Send + Sync + fmt::Debug {
    /// 用于日志和错误信息的描述
    fn description(&self) -> String;

    fn exists(&self) -> bool;

    fn read_to_string(&self) -> ContainerResult<String>;
}

/// 按位置字符串定位资源
pub trait ResourceLoader: Send + Sync {
    fn get_resource(&self, location: &str) -> ContainerResult<Box<dyn Resource>>;
}

/// 文件系统中的资源
#[derive(Debug, Clone)]
pub struct FileSystemResource {
    path: PathBuf,
}

impl FileSystemResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Resource for FileSystemResource {
    fn description(&self) -> String {
        format!("file [{}]", self.path.display())
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read_to_string(&self) -> ContainerResult<String> {
        fs::read_to_string(&self.path).map_err(|e| ContainerError::Resource {
            location: self.description(),
            reason: e.to_string(),
        })
    }
}

/// 在类路径根目录中查找的资源，第一个存在的根目录胜出
#[derive(Debug, Clone)]
pub struct ClassPathResource {
    path: String,
    roots: Vec<PathBuf>,
}

impl ClassPathResource {
    pub fn new(path: impl Into<String>, roots: Vec<PathBuf>) -> Self {
        let path = path.into();
        let path = path.trim_start_matches('/').to_string();
        Self { path, roots }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn resolve(&self) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(&self.path))
            .find(|candidate| candidate.is_file())
    }
}

impl Resource for ClassPathResource {
    fn description(&self) -> String {
        format!("class path resource [{}]", self.path)
    }

    fn exists(&self) -> bool {
        self.resolve().is_some()
    }

    fn read_to_string(&self) -> ContainerResult<String> {
        let path = self.resolve().ok_or_else(|| ContainerError::Resource {
            location: self.description(),
            reason: format!(
                "not found under class path roots {:?}",
                self.roots.iter().map(|r| r.display().to_string()).collect::<Vec<_>>()
            ),
        })?;
        tracing::trace!("Resolved {} to {}", self.description(), path.display());
        fs::read_to_string(&path).map_err(|e| ContainerError::Resource {
            location: self.description(),
            reason: e.to_string(),
        })
    }
}

/// 内存中的资源
#[derive(Debug, Clone)]
pub struct ByteArrayResource {
    content: Vec<u8>,
    description: String,
}

impl ByteArrayResource {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            description: "resource loaded from byte array".to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Resource for ByteArrayResource {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn exists(&self) -> bool {
        true
    }

    fn read_to_string(&self) -> ContainerResult<String> {
        String::from_utf8(self.content.clone()).map_err(|e| ContainerError::Resource {
            location: self.description.clone(),
            reason: e.to_string(),
        })
    }
}

/// 默认资源加载器
///
/// - `classpath:path` 和不带前缀的位置在类路径根目录中查找
/// - `file:path` 直接指向文件系统
///
/// 类路径根目录默认为当前目录加上 `SPRIG_CLASSPATH` 中列出的目录。
#[derive(Debug, Clone)]
pub struct DefaultResourceLoader {
    roots: Vec<PathBuf>,
}

impl DefaultResourceLoader {
    pub fn new() -> Self {
        let mut roots = vec![PathBuf::from(".")];
        if let Some(extra) = env::var_os(CLASSPATH_ENV) {
            roots.extend(env::split_paths(&extra).filter(|p| !p.as_os_str().is_empty()));
        }
        Self { roots }
    }

    /// 只使用给定的类路径根目录
    pub fn with_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl Default for DefaultResourceLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceLoader for DefaultResourceLoader {
    fn get_resource(&self, location: &str) -> ContainerResult<Box<dyn Resource>> {
        let location = location.trim();
        if location.is_empty() {
            return Err(ContainerError::Resource {
                location: location.to_string(),
                reason: "resource location must not be empty".to_string(),
            });
        }
        if let Some(path) = location.strip_prefix(FILE_URL_PREFIX) {
            return Ok(Box::new(FileSystemResource::new(path)));
        }
        let path = location.strip_prefix(CLASSPATH_URL_PREFIX).unwrap_or(location);
        Ok(Box::new(ClassPathResource::new(path, self.roots.clone())))
    }
}
