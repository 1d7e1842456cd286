//! Script lifecycle
//!
//! Runs `init`/`enable` in dependency order and `disable` in reverse order.
//! Every hook call is its own failure domain: a failing hook is reported
//! and the walk moves on.

use tracing::{debug, info, warn};

use crate::module::registry::{ModuleDependencies, ModuleRegistry};
use crate::module::traits::{DependencyObjects, ModuleError, Notifier};

/// What a lifecycle walk did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleSummary {
    /// Modules visited, in visiting order
    pub order: Vec<String>,
    /// Hook calls that failed
    pub failures: usize,
}

/// Walks a closed registry
pub struct LifecycleManager<'a> {
    notifier: &'a dyn Notifier,
}

impl<'a> LifecycleManager<'a> {
    pub fn new(notifier: &'a dyn Notifier) -> Self {
        Self { notifier }
    }

    fn fail(&self, summary: &mut LifecycleSummary, err: ModuleError) {
        warn!("{}", err);
        self.notifier.report(&err);
        summary.failures += 1;
    }

    /// Dependency handles of `name`, keyed by alias
    fn dependency_objects(registry: &ModuleRegistry, name: &str) -> DependencyObjects {
        let mut deps = DependencyObjects::new();
        let Some(module) = registry.get(name) else {
            return deps;
        };
        for (dep_name, edge) in module.dependencies() {
            match registry.get(dep_name) {
                Some(dep) => {
                    deps.insert(edge.alias.clone(), dep.handle.clone());
                }
                None => warn!("Script {} depends on unknown script {}", name, dep_name),
            }
        }
        deps
    }

    /// Initialize and enable every module, dependencies first.
    ///
    /// Fails only on a cyclic graph, before any hook runs.
    pub async fn enable_all(&self, registry: &ModuleRegistry) -> Result<LifecycleSummary, ModuleError> {
        let order = ModuleDependencies::topological_sort(&registry.dependency_graph())?;
        let mut summary = LifecycleSummary::default();

        for name in order {
            let Some(module) = registry.get(&name) else {
                continue;
            };
            let handle = &module.handle;

            if let Some(init) = handle.init_hook() {
                debug!("Initializing script {}", name);
                if let Err(e) = init(Self::dependency_objects(registry, &name)).await {
                    self.fail(
                        &mut summary,
                        ModuleError::Init {
                            module: name.clone(),
                            reason: format!("{:#}", e),
                        },
                    );
                }
            }

            if let Some(enable) = handle.enable_hook() {
                debug!("Enabling script {}", name);
                if let Err(e) = enable().await {
                    self.fail(
                        &mut summary,
                        ModuleError::Enable {
                            module: name.clone(),
                            reason: format!("{:#}", e),
                        },
                    );
                }
            }

            summary.order.push(name);
        }

        info!(
            "Enabled {} scripts ({} hook failures)",
            summary.order.len(),
            summary.failures
        );
        Ok(summary)
    }

    /// Disable every module, dependents first
    pub async fn disable_all(&self, registry: &ModuleRegistry) -> Result<LifecycleSummary, ModuleError> {
        let order = ModuleDependencies::teardown_order(&registry.dependency_graph())?;
        let mut summary = LifecycleSummary::default();

        for name in order {
            let Some(module) = registry.get(&name) else {
                continue;
            };

            if let Some(disable) = module.handle.disable_hook() {
                debug!("Disabling script {}", name);
                if let Err(e) = disable().await {
                    self.fail(
                        &mut summary,
                        ModuleError::Disable {
                            module: name.clone(),
                            reason: format!("{:#}", e),
                        },
                    );
                }
            }

            summary.order.push(name);
        }

        info!(
            "Disabled {} scripts ({} hook failures)",
            summary.order.len(),
            summary.failures
        );
        Ok(summary)
    }
}
