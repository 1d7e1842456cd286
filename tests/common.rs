//! Shared fixtures for loader integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use userscripts::module::naming::{uri_to_name, MODULE_SUFFIX};
use userscripts::module::{LoadedModules, ModuleError, ModuleHandle, ModuleLoader, ModuleSource, Notifier};
use userscripts::ModuleManager;

/// Notifier remembering everything it was told
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn error_titles(&self) -> Vec<String> {
        self.errors.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn notify_error(&self, title: &str, message: &str) {
        self.errors
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

/// In-memory byte source that records every read
#[derive(Default)]
pub struct MemorySource {
    pub files: HashMap<String, Bytes>,
    pub reads: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn with(mut self, uri: &str, body: &str) -> Self {
        self.files.insert(uri.to_string(), Bytes::from(body.to_string()));
        self
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModuleSource for MemorySource {
    async fn read(&self, uri: &str) -> anyhow::Result<Bytes> {
        self.reads.lock().unwrap().push(uri.to_string());
        self.files
            .get(uri)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 Not Found: {}", uri))
    }
}

/// Loader serving fixed handles for known directories and, for any other
/// directory, one handle per module file present on disk (looked up by
/// module name in a catalogue, empty handle when unknown)
#[derive(Default)]
pub struct MemoryLoader {
    pub dirs: HashMap<PathBuf, Vec<(String, ModuleHandle)>>,
    pub catalogue: HashMap<String, ModuleHandle>,
}

impl MemoryLoader {
    pub fn local(mut self, dir: &Path, name: &str, handle: ModuleHandle) -> Self {
        self.dirs
            .entry(dir.to_path_buf())
            .or_default()
            .push((name.to_string(), handle));
        self
    }

    /// Handle for the remote module fetched from `uri`
    pub fn remote(mut self, uri: &str, handle: ModuleHandle) -> Self {
        self.catalogue.insert(uri_to_name(uri), handle);
        self
    }
}

#[async_trait]
impl ModuleLoader for MemoryLoader {
    async fn load_modules_at(&self, dir: &Path) -> Result<LoadedModules, ModuleError> {
        if let Some(entries) = self.dirs.get(dir) {
            return Ok(entries
                .iter()
                .map(|(name, handle)| (name.clone(), Ok(handle.clone())))
                .collect());
        }

        let mut loaded = LoadedModules::new();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Ok(loaded);
        };
        let mut stems: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == MODULE_SUFFIX))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        stems.sort();
        for stem in stems {
            let handle = self.catalogue.get(&stem).cloned().unwrap_or_default();
            loaded.insert(stem, Ok(handle));
        }
        Ok(loaded)
    }
}

/// Ordered record of hook calls
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Entries starting with `prefix:`, without the prefix
    pub fn phase(&self, prefix: &str) -> Vec<String> {
        let tag = format!("{}:", prefix);
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix(&tag).map(str::to_string))
            .collect()
    }
}

/// Handle recording its `enable`/`disable` calls as `enable:<name>`/`disable:<name>`
pub fn recorded(journal: &Journal, name: &str) -> ModuleHandle {
    let (on, off) = (journal.clone(), journal.clone());
    let (n1, n2) = (name.to_string(), name.to_string());
    ModuleHandle::new()
        .with_enable(move || {
            let (journal, name) = (on.clone(), n1.clone());
            async move {
                journal.push(format!("enable:{}", name));
                Ok(())
            }
        })
        .with_disable(move || {
            let (journal, name) = (off.clone(), n2.clone());
            async move {
                journal.push(format!("disable:{}", name));
                Ok(())
            }
        })
}

/// `depends()` returning `deps`
pub fn depends_map(deps: &[(&str, &str)]) -> IndexMap<String, String> {
    deps.iter()
        .map(|(alias, uri)| (alias.to_string(), uri.to_string()))
        .collect()
}

/// Isolated local and cache directories
pub struct Fixture {
    pub temp_dir: TempDir,
    pub local_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let local_dir = temp_dir.path().join("local");
        let cache_dir = temp_dir.path().join("cache");
        Self {
            temp_dir,
            local_dir,
            cache_dir,
        }
    }

    pub fn manager(
        &self,
        loader: MemoryLoader,
        source: Arc<MemorySource>,
        notifier: Arc<RecordingNotifier>,
    ) -> ModuleManager {
        ModuleManager::new(
            &self.local_dir,
            &self.cache_dir,
            Arc::new(loader),
            source,
            notifier,
        )
    }
}
