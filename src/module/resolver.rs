//! Dependency resolution
//!
//! Loads local scripts, then alternates between loading the remote cache and
//! retrieving dependencies that are still missing, until a round finds
//! nothing missing. Rounds are strictly sequential.

use indexmap::IndexSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::module::fetch::Fetcher;
use crate::module::naming::is_local;
use crate::module::registry::ModuleRegistry;
use crate::module::traits::{ModuleError, ModuleLoader, Notifier};

/// Drives discovery and retrieval until the registry is closed
pub struct Resolver<'a> {
    loader: &'a dyn ModuleLoader,
    fetcher: &'a Fetcher,
    notifier: &'a dyn Notifier,
}

/// Outcome of a converged resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Number of retrieval rounds it took
    pub fetch_rounds: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(loader: &'a dyn ModuleLoader, fetcher: &'a Fetcher, notifier: &'a dyn Notifier) -> Self {
        Self {
            loader,
            fetcher,
            notifier,
        }
    }

    /// Register every local script in `local_dir`
    pub async fn load_local(&self, registry: &mut ModuleRegistry, local_dir: &Path) {
        let discovered = ModuleRegistry::discover(self.loader, local_dir, self.notifier).await;
        registry.merge(discovered, |_, _| true, self.notifier);
        registry.resolve_dependencies(self.notifier);
    }

    /// Register cached remote scripts that are local-named or already depended upon.
    ///
    /// The scanned batch is offered again after every pass that admitted
    /// something, so a cached script whose dependent sorts after it is
    /// still picked up without another retrieval round.
    async fn load_remote(&self, registry: &mut ModuleRegistry, cache_dir: &Path) {
        let mut pending = ModuleRegistry::discover(self.loader, cache_dir, self.notifier).await;
        loop {
            let admitted = registry.merge(pending.clone(), admit_remote, self.notifier);
            registry.resolve_dependencies(self.notifier);
            pending.retain(|name, _| !registry.contains(name));
            if admitted == 0 || pending.is_empty() {
                break;
            }
            debug!("{} cached scripts left to offer again", pending.len());
        }
    }

    /// Run the local pass and then the fixpoint loop.
    ///
    /// Fatal errors are reported to the notifier before being returned.
    pub async fn resolve(
        &self,
        registry: &mut ModuleRegistry,
        local_dir: &Path,
        cache_dir: &Path,
    ) -> Result<Resolution, ModuleError> {
        self.load_local(registry, local_dir).await;
        self.resolve_remote(registry, cache_dir).await
    }

    /// The fixpoint loop over the remote cache
    pub async fn resolve_remote(
        &self,
        registry: &mut ModuleRegistry,
        cache_dir: &Path,
    ) -> Result<Resolution, ModuleError> {
        let mut fetched: IndexSet<String> = IndexSet::new();
        let mut rounds = 0;

        loop {
            self.load_remote(registry, cache_dir).await;

            let queue = registry.download_queue();
            if queue.is_empty() {
                if rounds > 0 {
                    self.notifier.notify("Finished retrieving dependencies.");
                }
                info!(
                    "Dependencies resolved: {} scripts after {} retrieval rounds",
                    registry.len(),
                    rounds
                );
                return Ok(Resolution { fetch_rounds: rounds });
            }

            let repeated: Vec<String> = queue.keys().filter(|uri| fetched.contains(*uri)).cloned().collect();
            if !repeated.is_empty() {
                let err = ModuleError::Unresolved { uris: repeated };
                warn!("{}", err);
                self.notifier.report(&err);
                return Err(err);
            }

            let uris: Vec<&str> = queue.keys().map(String::as_str).collect();
            self.notifier
                .notify(&format!("Retrieving dependencies:\n{}", uris.join("\n")));

            rounds += 1;
            debug!("Retrieval round {}: {:?}", rounds, uris);
            if let Err(err) = self.fetcher.fetch_all(cache_dir, &queue).await {
                warn!("Dependency retrieval failed: {}", err);
                self.notifier.report(&err);
                return Err(err);
            }
            fetched.extend(queue.into_keys());
        }
    }
}

fn admit_remote(registry: &ModuleRegistry, name: &str) -> bool {
    is_local(name) || registry.is_depended_upon(name)
}
