//! Module system traits and interfaces
//!
//! Defines the module handle, the collaborators the loader talks to
//! (module loading, notification) and the error type shared by every
//! component.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Declared dependencies of a module: alias -> absolute URI, module name or relative path
pub type DependsMap = IndexMap<String, String>;

/// Dependency handles handed to `init`, keyed by the alias the dependent declared
pub type DependencyObjects = IndexMap<String, ModuleHandle>;

/// `depends()` capability
pub type DependsFn = Arc<dyn Fn() -> anyhow::Result<DependsMap> + Send + Sync>;

/// `init(deps)` capability
pub type InitFn =
    Arc<dyn Fn(DependencyObjects) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// `enable()` / `disable()` capability
pub type HookFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Loaded code object of a module
///
/// Every capability is an independent optional slot. An absent slot means
/// "no-op"; callers always check presence before invoking. Cloning is cheap,
/// all slots are reference counted.
#[derive(Clone, Default)]
pub struct ModuleHandle {
    exports: Option<Arc<dyn Any + Send + Sync>>,
    depends: Option<DependsFn>,
    init: Option<InitFn>,
    enable: Option<HookFn>,
    disable: Option<HookFn>,
}

impl ModuleHandle {
    /// Create a handle with no capabilities
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a value dependents can downcast through [`ModuleHandle::exports`]
    pub fn with_exports<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.exports = Some(Arc::new(value));
        self
    }

    pub fn with_depends<F>(mut self, depends: F) -> Self
    where
        F: Fn() -> anyhow::Result<DependsMap> + Send + Sync + 'static,
    {
        self.depends = Some(Arc::new(depends));
        self
    }

    pub fn with_init<F, Fut>(mut self, init: F) -> Self
    where
        F: Fn(DependencyObjects) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.init = Some(Arc::new(move |deps| init(deps).boxed()));
        self
    }

    pub fn with_enable<F, Fut>(mut self, enable: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.enable = Some(Arc::new(move || enable().boxed()));
        self
    }

    pub fn with_disable<F, Fut>(mut self, disable: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.disable = Some(Arc::new(move || disable().boxed()));
        self
    }

    /// Exported value, if one of type `T` was attached
    pub fn exports<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.exports.as_ref().and_then(|e| e.downcast_ref::<T>())
    }

    pub fn depends_hook(&self) -> Option<&DependsFn> {
        self.depends.as_ref()
    }

    pub fn init_hook(&self) -> Option<&InitFn> {
        self.init.as_ref()
    }

    pub fn enable_hook(&self) -> Option<&HookFn> {
        self.enable.as_ref()
    }

    pub fn disable_hook(&self) -> Option<&HookFn> {
        self.disable.as_ref()
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("exports", &self.exports.is_some())
            .field("depends", &self.depends.is_some())
            .field("init", &self.init.is_some())
            .field("enable", &self.enable.is_some())
            .field("disable", &self.disable.is_some())
            .finish()
    }
}

/// Result of importing every module found in one directory.
///
/// Keyed by filename stem, in a deterministic order. A module whose
/// top-level load failed carries the failure instead of a handle.
pub type LoadedModules = IndexMap<String, Result<ModuleHandle, String>>;

/// Turns a directory of module files into module handles
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Import every module found at `dir`.
    ///
    /// A missing directory yields an empty map. An error means the
    /// directory itself could not be read.
    async fn load_modules_at(&self, dir: &Path) -> Result<LoadedModules, ModuleError>;
}

/// Sink for human readable status and error messages
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);

    fn notify_error(&self, title: &str, message: &str);

    /// Report a module error with its phase-tagged title
    fn report(&self, error: &ModuleError) {
        self.notify_error(&error.title(), &error.to_string());
    }
}

/// Module system errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    #[error("Failed to load script {module}: {reason}")]
    Import { module: String, reason: String },

    #[error("depends() of script {module} failed: {reason}")]
    Depends { module: String, reason: String },

    #[error("Failed to retrieve {uri}: {reason}")]
    Fetch { uri: String, reason: String },

    #[error("Failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("{path} is not a usable directory: {reason}")]
    Directory { path: String, reason: String },

    #[error("init() of script {module} failed: {reason}")]
    Init { module: String, reason: String },

    #[error("enable() of script {module} failed: {reason}")]
    Enable { module: String, reason: String },

    #[error("disable() of script {module} failed: {reason}")]
    Disable { module: String, reason: String },

    #[error("Cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Failed to read scripts in {path}: {reason}")]
    Discovery { path: String, reason: String },

    #[error("Invalid URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Retrieved dependencies never appeared as scripts: {}", uris.join(", "))]
    Unresolved { uris: Vec<String> },

    #[error("Invalid script manifest {path}: {reason}")]
    Manifest { path: String, reason: String },
}

impl ModuleError {
    /// Short error kind, e.g. `FetchError`
    pub fn kind(&self) -> &'static str {
        match self {
            ModuleError::Import { .. } => "ImportError",
            ModuleError::Depends { .. } => "DependsError",
            ModuleError::Fetch { .. } => "FetchError",
            ModuleError::Write { .. } => "WriteError",
            ModuleError::Directory { .. } => "DirectoryError",
            ModuleError::Init { .. } => "InitError",
            ModuleError::Enable { .. } => "EnableError",
            ModuleError::Disable { .. } => "DisableError",
            ModuleError::CyclicDependency { .. } => "CyclicDependencyError",
            ModuleError::Discovery { .. } => "DiscoveryError",
            ModuleError::InvalidUri { .. } => "InvalidUriError",
            ModuleError::Unresolved { .. } => "UnresolvedError",
            ModuleError::Manifest { .. } => "ManifestError",
        }
    }

    /// Notification title: `<Kind> when <phase> <subject>`
    pub fn title(&self) -> String {
        let phase = match self {
            ModuleError::Import { module, .. } => format!("loading script {}", module),
            ModuleError::Depends { module, .. } => {
                format!("resolving dependencies of script {}", module)
            }
            ModuleError::Fetch { uri, .. } => format!("retrieving {}", uri),
            ModuleError::Write { path, .. } => format!("writing to file {}", path),
            ModuleError::Directory { path, .. } => {
                format!("ensuring {} is a writable directory", path)
            }
            ModuleError::Init { module, .. } => format!("initializing script {}", module),
            ModuleError::Enable { module, .. } => format!("enabling script {}", module),
            ModuleError::Disable { module, .. } => format!("disabling script {}", module),
            ModuleError::CyclicDependency { .. } => "ordering scripts".to_string(),
            ModuleError::Discovery { path, .. } => format!("loading scripts from {}", path),
            ModuleError::InvalidUri { uri, .. } => format!("resolving {}", uri),
            ModuleError::Unresolved { .. } => "retrieving dependencies".to_string(),
            ModuleError::Manifest { path, .. } => format!("parsing {}", path),
        };
        format!("{} when {}", self.kind(), phase)
    }

    /// Module the error is tagged with, for per-module failures
    pub fn module(&self) -> Option<&str> {
        match self {
            ModuleError::Import { module, .. }
            | ModuleError::Depends { module, .. }
            | ModuleError::Init { module, .. }
            | ModuleError::Enable { module, .. }
            | ModuleError::Disable { module, .. } => Some(module),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_titles_carry_phase_and_subject() {
        let err = ModuleError::Init {
            module: "foo".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(err.title(), "InitError when initializing script foo");
        assert_eq!(err.module(), Some("foo"));

        let err = ModuleError::Fetch {
            uri: "https://x/y/util".to_string(),
            reason: "404".to_string(),
        };
        assert_eq!(err.title(), "FetchError when retrieving https://x/y/util");
        assert!(err.module().is_none());
    }

    #[test]
    fn test_cycle_display() {
        let err = ModuleError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Cyclic dependency: a -> b -> a");
    }

    #[tokio::test]
    async fn test_handle_slots_are_independent() {
        let handle = ModuleHandle::new()
            .with_exports(42u32)
            .with_enable(|| async { Ok(()) });

        assert!(handle.enable_hook().is_some());
        assert!(handle.init_hook().is_none());
        assert!(handle.disable_hook().is_none());
        assert!(handle.depends_hook().is_none());
        assert_eq!(handle.exports::<u32>(), Some(&42));
        assert!(handle.exports::<String>().is_none());

        let enable = handle.enable_hook().unwrap();
        assert!(enable().await.is_ok());
    }
}
