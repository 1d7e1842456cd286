//! Script discovery
//!
//! Scans a script directory and turns every `<name>.toml` manifest in it
//! into a module handle whose hooks run the manifest's commands.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info};

use crate::module::naming::MODULE_SUFFIX;
use crate::module::process::{HookPhase, HookRunner};
use crate::module::registry::manifest::{ScriptManifest, ScriptModule};
use crate::module::traits::{LoadedModules, ModuleError, ModuleHandle, ModuleLoader};

/// Loads manifest scripts from a directory
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    runner: HookRunner,
}

impl ManifestLoader {
    /// Create a loader whose hooks are killed after `hook_timeout`
    pub fn new(hook_timeout: Duration) -> Self {
        Self {
            runner: HookRunner::new(hook_timeout),
        }
    }

    /// Module files in `dir`, sorted by filename
    async fn script_files(dir: &Path) -> Result<Vec<PathBuf>, ModuleError> {
        let discovery_error = |e: std::io::Error| ModuleError::Discovery {
            path: dir.display().to_string(),
            reason: e.to_string(),
        };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(discovery_error)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(discovery_error)? {
            let path = entry.path();
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file() || t.is_symlink())
                .unwrap_or(false);
            if is_file && path.extension().is_some_and(|ext| ext == MODULE_SUFFIX) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Build the handle for a parsed script
    pub fn handle_for(&self, script: ScriptModule) -> ModuleHandle {
        let script = Arc::new(script);
        let hooks = script.manifest.hooks.clone();
        let mut handle = ModuleHandle::new().with_exports((*script).clone());

        let depends = script.manifest.depends.clone();
        handle = handle.with_depends(move || Ok(depends.clone()));

        if hooks.init.is_some() {
            let (runner, script) = (self.runner.clone(), Arc::clone(&script));
            handle = handle.with_init(move |deps| {
                let (runner, script) = (runner.clone(), Arc::clone(&script));
                async move { runner.run(&script, HookPhase::Init, Some(&deps)).await }
            });
        }
        if hooks.enable.is_some() {
            let (runner, script) = (self.runner.clone(), Arc::clone(&script));
            handle = handle.with_enable(move || {
                let (runner, script) = (runner.clone(), Arc::clone(&script));
                async move { runner.run(&script, HookPhase::Enable, None).await }
            });
        }
        if hooks.disable.is_some() {
            let (runner, script) = (self.runner.clone(), Arc::clone(&script));
            handle = handle.with_disable(move || {
                let (runner, script) = (runner.clone(), Arc::clone(&script));
                async move { runner.run(&script, HookPhase::Disable, None).await }
            });
        }
        handle
    }
}

#[async_trait]
impl ModuleLoader for ManifestLoader {
    async fn load_modules_at(&self, dir: &Path) -> Result<LoadedModules, ModuleError> {
        info!("Discovering scripts in {:?}", dir);

        let mut loaded = LoadedModules::new();
        if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
            debug!("Script directory {:?} does not exist", dir);
            return Ok(loaded);
        }

        for path in Self::script_files(dir).await? {
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let result = match ScriptManifest::from_file(&path).await {
                Ok(manifest) => Ok(self.handle_for(ScriptModule {
                    name: name.clone(),
                    path: path.clone(),
                    manifest,
                })),
                Err(e) => Err(e.to_string()),
            };
            loaded.insert(name, result);
        }

        info!("Discovered {} scripts in {:?}", loaded.len(), dir);
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_directory_discovers_nothing() {
        let dir = TempDir::new().unwrap();
        let loader = ManifestLoader::new(Duration::from_secs(5));
        let loaded = loader
            .load_modules_at(&dir.path().join("absent"))
            .await
            .unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_scripts_are_loaded_in_filename_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("zeta.toml"), "").unwrap();
        std::fs::write(dir.path().join("alpha.toml"), "[depends]\nz = \"zeta\"\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join("sub.toml")).unwrap();

        let loader = ManifestLoader::new(Duration::from_secs(5));
        let loaded = loader.load_modules_at(dir.path()).await.unwrap();

        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["alpha", "zeta"]);
        let alpha = loaded["alpha"].as_ref().unwrap();
        let depends = alpha.depends_hook().unwrap();
        assert_eq!(depends().unwrap()["z"], "zeta");
        let exported = alpha.exports::<ScriptModule>().unwrap();
        assert_eq!(exported.path, dir.path().join("alpha.toml"));
        assert!(alpha.enable_hook().is_none());
    }

    #[tokio::test]
    async fn test_broken_manifest_is_an_import_failure() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.toml"), "this is = = not toml").unwrap();

        let loader = ManifestLoader::new(Duration::from_secs(5));
        let loaded = loader.load_modules_at(dir.path()).await.unwrap();

        assert!(loaded["broken"].is_err());
    }

    #[tokio::test]
    async fn test_declared_hooks_become_slots() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("clock.toml"),
            "[hooks]\nenable = [\"true\"]\ndisable = [\"true\"]\n",
        )
        .unwrap();

        let loader = ManifestLoader::new(Duration::from_secs(5));
        let loaded = loader.load_modules_at(dir.path()).await.unwrap();
        let clock = loaded["clock"].as_ref().unwrap();

        assert!(clock.init_hook().is_none());
        assert!(clock.enable_hook().is_some());
        assert!(clock.disable_hook().is_some());
    }
}
