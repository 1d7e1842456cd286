//! Module manager for orchestrating all scripts
//!
//! The host-facing entry points. `enable()` builds a fresh registry, resolves
//! it and enables it; the registry is kept until the matching `disable()`.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::config::LoaderConfig;
use crate::module::fetch::{DefaultSource, Fetcher, ModuleSource};
use crate::module::lifecycle::{LifecycleManager, LifecycleSummary};
use crate::module::notify::LogNotifier;
use crate::module::registry::{ManifestLoader, ModuleDependencies, ModuleRegistry};
use crate::module::resolver::Resolver;
use crate::module::traits::{ModuleError, ModuleLoader, Notifier};

/// Module manager coordinates one enable/disable cycle at a time
pub struct ModuleManager {
    local_dir: PathBuf,
    cache_dir: PathBuf,
    loader: Arc<dyn ModuleLoader>,
    fetcher: Fetcher,
    notifier: Arc<dyn Notifier>,
    /// Registry of the last successful `enable()`
    active: Option<ModuleRegistry>,
}

impl ModuleManager {
    /// Create a manager with explicit collaborators
    pub fn new(
        local_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        loader: Arc<dyn ModuleLoader>,
        source: Arc<dyn ModuleSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            local_dir: local_dir.into(),
            cache_dir: cache_dir.into(),
            loader,
            fetcher: Fetcher::new(source),
            notifier,
            active: None,
        }
    }

    /// Manifest scripts, the default source and log notifications, as configured
    pub fn from_config(config: &LoaderConfig) -> anyhow::Result<Self> {
        Self::with_notifier(config, Arc::new(LogNotifier))
    }

    /// Like [`ModuleManager::from_config`] with a custom notifier
    pub fn with_notifier(config: &LoaderConfig, notifier: Arc<dyn Notifier>) -> anyhow::Result<Self> {
        let source = DefaultSource::new(&config.user_agent)?;
        Ok(Self::new(
            config.local_module_dir(),
            config.remote_cache_dir(),
            Arc::new(ManifestLoader::new(Duration::from_secs(config.hook_timeout_secs))),
            Arc::new(source),
            notifier,
        ))
    }

    pub fn local_dir(&self) -> &PathBuf {
        &self.local_dir
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Registry of the currently enabled scripts
    pub fn registry(&self) -> Option<&ModuleRegistry> {
        self.active.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.active.is_some()
    }

    /// Build and close a fresh registry without running any hook
    pub async fn resolve(&self) -> Result<ModuleRegistry, ModuleError> {
        let mut registry = ModuleRegistry::new();
        let resolver = Resolver::new(self.loader.as_ref(), &self.fetcher, self.notifier.as_ref());
        resolver
            .resolve(&mut registry, &self.local_dir, &self.cache_dir)
            .await?;
        Ok(registry)
    }

    /// Enable order of a resolved registry
    pub fn enable_order(&self, registry: &ModuleRegistry) -> Result<Vec<String>, ModuleError> {
        ModuleDependencies::topological_sort(&registry.dependency_graph())
    }

    /// Resolve scripts and enable them.
    ///
    /// Any registry left by a previous `enable()` is discarded. On a fatal
    /// resolution error (already reported) no hook runs and nothing stays
    /// active.
    pub async fn enable(&mut self) -> Result<LifecycleSummary, ModuleError> {
        if self.active.take().is_some() {
            warn!("Enabling again without disabling; previous scripts are dropped");
        }
        info!("Enabling scripts from {:?} and {:?}", self.local_dir, self.cache_dir);

        let registry = self.resolve().await?;
        let lifecycle = LifecycleManager::new(self.notifier.as_ref());
        let summary = match lifecycle.enable_all(&registry).await {
            Ok(summary) => summary,
            Err(err) => {
                self.notifier.report(&err);
                return Err(err);
            }
        };
        self.active = Some(registry);
        Ok(summary)
    }

    /// Disable the scripts of the last successful `enable()`.
    ///
    /// Without an active registry this does nothing.
    pub async fn disable(&mut self) -> Result<LifecycleSummary, ModuleError> {
        let Some(registry) = self.active.take() else {
            info!("No enabled scripts to disable");
            return Ok(LifecycleSummary::default());
        };

        let lifecycle = LifecycleManager::new(self.notifier.as_ref());
        lifecycle.disable_all(&registry).await.inspect_err(|err| {
            self.notifier.report(err);
        })
    }
}
