//! Script hook processes
//!
//! Lifecycle hooks of manifest scripts run as child processes.

pub mod hooks;

pub use hooks::{HookPhase, HookRunner};
