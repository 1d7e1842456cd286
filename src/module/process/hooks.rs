//! Script hook processes
//!
//! Runs the command a script manifest declares for a lifecycle hook as a
//! child process and turns its exit status into a hook result.

use anyhow::{bail, Context};
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

use crate::module::registry::manifest::ScriptModule;
use crate::module::traits::DependencyObjects;

/// Lifecycle hook a command is run for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Init,
    Enable,
    Disable,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::Init => "init",
            HookPhase::Enable => "enable",
            HookPhase::Disable => "disable",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment variable a dependency alias is exposed under
pub fn dependency_env_var(alias: &str) -> String {
    let suffix: String = alias
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("USERSCRIPT_DEP_{}", suffix)
}

/// Runs script hook commands
#[derive(Debug, Clone)]
pub struct HookRunner {
    timeout: Duration,
}

impl HookRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run the command `script` declares for `phase`, if any
    pub async fn run(
        &self,
        script: &ScriptModule,
        phase: HookPhase,
        deps: Option<&DependencyObjects>,
    ) -> anyhow::Result<()> {
        let argv = match phase {
            HookPhase::Init => &script.manifest.hooks.init,
            HookPhase::Enable => &script.manifest.hooks.enable,
            HookPhase::Disable => &script.manifest.hooks.disable,
        };
        let Some((program, args)) = argv.as_ref().and_then(|a| a.split_first()) else {
            return Ok(());
        };

        info!("Running {} hook of script {}", phase, script.name);

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(script.directory())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env("USERSCRIPT_NAME", &script.name)
            .env("USERSCRIPT_PATH", &script.path)
            .env("USERSCRIPT_PHASE", phase.as_str())
            .envs(&script.manifest.env);

        for (alias, handle) in deps.into_iter().flatten() {
            let value = handle
                .exports::<ScriptModule>()
                .map(|dep| dep.path.display().to_string())
                .unwrap_or_default();
            command.env(dependency_env_var(alias), value);
        }

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| anyhow::anyhow!("{} hook timed out after {:?}", phase, self.timeout))?
            .with_context(|| format!("failed to run {:?}", program))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{} hook of {} wrote: {}", phase, script.name, stdout.trim());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} hook exited with {}: {}", phase, output.status, stderr.trim());
        }
        Ok(())
    }
}
