//! Script module system
//!
//! Discovers script modules in a local directory, retrieves the remote
//! scripts they depend on, and runs their lifecycle hooks in dependency
//! order.
//!
//! ## Architecture
//!
//! - **Naming**: dependency URIs map reversibly to module names and files
//! - **Registry**: discovered modules and their dependency edges
//! - **Resolver**: discovery/retrieval rounds until nothing is missing
//! - **Lifecycle**: `init`/`enable` dependencies first, `disable` in reverse
//! - **Isolation**: a failing hook is reported and never stops the others

pub mod traits;
pub mod naming;
pub mod registry;
pub mod fetch;
pub mod resolver;
pub mod lifecycle;
pub mod manager;
pub mod notify;
pub mod process;

pub use traits::{
    DependencyObjects, DependsMap, LoadedModules, ModuleError, ModuleHandle, ModuleLoader, Notifier,
};
pub use fetch::{DefaultSource, Fetcher, ModuleSource};
pub use lifecycle::{LifecycleManager, LifecycleSummary};
pub use manager::ModuleManager;
pub use notify::LogNotifier;
pub use registry::{DependencyEdge, ManifestLoader, ModuleRegistry, Origin, RegisteredModule};
pub use resolver::{Resolution, Resolver};
