//! Userscripts - script module loader
//!
//! Discovers user-authored script modules in a local directory, retrieves
//! the remote scripts they declare as dependencies until the dependency
//! graph is closed, and then initializes, enables and disables every script
//! in dependency order.
//!
//! ## Design Principles
//!
//! 1. **Dependencies first**: hooks run in topological order, teardown in reverse
//! 2. **Failure isolation**: one script's failing hook never stops the others
//! 3. **All or nothing resolution**: a failed retrieval enables nothing
//! 4. **Pluggable collaborators**: module loading, byte sources and
//!    notifications are traits
//!
//! ## Example
//!
//! ```rust,no_run
//! use userscripts::{LoaderConfig, ModuleManager};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut manager = ModuleManager::from_config(&LoaderConfig::default())?;
//! manager.enable().await?;
//! // ...
//! manager.disable().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod module;
pub mod utils;

pub use config::{LoaderConfig, LoggingConfig};
pub use module::{
    DependencyObjects, LifecycleSummary, ModuleError, ModuleHandle, ModuleLoader, ModuleManager,
    ModuleRegistry, ModuleSource, Notifier,
};
