//! Module registry and discovery
//!
//! Holds every module discovered during one enable cycle together with its
//! declared dependency edges. The registry only ever grows: discovery adds
//! modules, dependency resolution fills in their edges once.

pub mod dependencies;
pub mod discovery;
pub mod manifest;

pub use dependencies::ModuleDependencies;
pub use discovery::ManifestLoader;
pub use manifest::{ScriptManifest, ScriptModule};

use indexmap::IndexMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::module::naming::{is_local, module_filename, name_to_uri, resolve_dependency_uri, uri_to_name};
use crate::module::traits::{LoadedModules, ModuleError, ModuleHandle, ModuleLoader, Notifier};

/// Where a module came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Found in the local module directory
    Local,
    /// Fetched from this URI into the remote cache
    Remote(String),
}

impl Origin {
    /// Origin recovered from a module name
    pub fn of(name: &str) -> Self {
        if is_local(name) {
            Origin::Local
        } else {
            Origin::Remote(name_to_uri(name))
        }
    }
}

/// Declared relationship from a module to one of its dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    /// Binding name the dependent receives the dependency's handle under
    pub alias: String,
    /// Absolute URI the dependency is fetched from
    pub uri: String,
}

/// A discovered module
#[derive(Debug, Clone)]
pub struct RegisteredModule {
    pub name: String,
    pub origin: Origin,
    pub handle: ModuleHandle,
    /// dependency name -> edge; `None` until computed
    dependencies: Option<IndexMap<String, DependencyEdge>>,
}

impl RegisteredModule {
    fn new(name: String, handle: ModuleHandle) -> Self {
        Self {
            origin: Origin::of(&name),
            name,
            handle,
            dependencies: None,
        }
    }

    /// Dependency edges, empty until resolved
    pub fn dependencies(&self) -> impl Iterator<Item = (&String, &DependencyEdge)> {
        self.dependencies.iter().flat_map(|deps| deps.iter())
    }

    pub fn dependencies_resolved(&self) -> bool {
        self.dependencies.is_some()
    }
}

/// Discovered modules, in discovery order
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: IndexMap<String, RegisteredModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredModule> {
        self.modules.get(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &RegisteredModule> {
        self.modules.values()
    }

    /// Import every module at `dir` through the loader.
    ///
    /// A directory that cannot be read is reported and discovers nothing.
    pub async fn discover(
        loader: &dyn ModuleLoader,
        dir: &Path,
        notifier: &dyn Notifier,
    ) -> LoadedModules {
        match loader.load_modules_at(dir).await {
            Ok(loaded) => {
                debug!("Discovered {} scripts in {:?}", loaded.len(), dir);
                loaded
            }
            Err(e) => {
                warn!("Failed to discover scripts in {:?}: {}", dir, e);
                notifier.report(&e);
                LoadedModules::new()
            }
        }
    }

    /// Register discovered modules that are new and admitted by `admit`.
    ///
    /// `admit` is evaluated against the registry as it stands when each
    /// module is visited. A module whose import failed is reported and
    /// registered without capabilities. Returns the number of modules added.
    pub fn merge<F>(&mut self, discovered: LoadedModules, admit: F, notifier: &dyn Notifier) -> usize
    where
        F: Fn(&ModuleRegistry, &str) -> bool,
    {
        let mut added = 0;
        for (name, loaded) in discovered {
            if self.modules.contains_key(&name) || !admit(self, &name) {
                continue;
            }
            let handle = match loaded {
                Ok(handle) => handle,
                Err(reason) => {
                    let err = ModuleError::Import {
                        module: name.clone(),
                        reason,
                    };
                    warn!("{}", err);
                    notifier.report(&err);
                    ModuleHandle::new()
                }
            };
            debug!("Registered script {}", name);
            self.modules
                .insert(name.clone(), RegisteredModule::new(name, handle));
            added += 1;
        }
        if added > 0 {
            info!("Registered {} new scripts ({} total)", added, self.modules.len());
        }
        added
    }

    /// Whether any module with computed dependencies depends on `name`
    pub fn is_depended_upon(&self, name: &str) -> bool {
        self.modules.values().any(|m| {
            m.dependencies
                .as_ref()
                .is_some_and(|deps| deps.contains_key(name))
        })
    }

    /// Compute dependency edges for every module that has none yet.
    ///
    /// A failing `depends()` or an unresolvable declaration is reported and
    /// leaves the module with no dependencies; it is never asked again.
    pub fn resolve_dependencies(&mut self, notifier: &dyn Notifier) {
        for (name, module) in self.modules.iter_mut() {
            if module.dependencies.is_some() {
                continue;
            }
            let edges = match Self::declared_edges(name, &module.handle) {
                Ok(edges) => edges,
                Err(err) => {
                    warn!("{}", err);
                    notifier.report(&err);
                    IndexMap::new()
                }
            };
            if !edges.is_empty() {
                debug!("Script {} depends on {:?}", name, edges.keys().collect::<Vec<_>>());
            }
            module.dependencies = Some(edges);
        }
    }

    fn declared_edges(
        name: &str,
        handle: &ModuleHandle,
    ) -> Result<IndexMap<String, DependencyEdge>, ModuleError> {
        let mut edges = IndexMap::new();
        let Some(depends) = handle.depends_hook() else {
            return Ok(edges);
        };
        let declared = depends().map_err(|e| ModuleError::Depends {
            module: name.to_string(),
            reason: format!("{:#}", e),
        })?;
        for (alias, declared_uri) in declared {
            let uri = resolve_dependency_uri(name, &declared_uri).map_err(|e| {
                ModuleError::Depends {
                    module: name.to_string(),
                    reason: e.to_string(),
                }
            })?;
            edges.insert(uri_to_name(&uri), DependencyEdge { alias, uri });
        }
        Ok(edges)
    }

    /// name -> dependency names, in registry order
    pub fn dependency_graph(&self) -> IndexMap<String, Vec<String>> {
        self.modules
            .iter()
            .map(|(name, m)| (name.clone(), m.dependencies().map(|(d, _)| d.clone()).collect()))
            .collect()
    }

    /// uri -> storage filename for every dependency not yet registered
    pub fn download_queue(&self) -> IndexMap<String, String> {
        let mut queue = IndexMap::new();
        for module in self.modules.values() {
            for (dep_name, edge) in module.dependencies() {
                if !self.modules.contains_key(dep_name) {
                    queue.insert(edge.uri.clone(), module_filename(dep_name));
                }
            }
        }
        queue
    }
}
