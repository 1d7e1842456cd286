//! Script manifest parsing
//!
//! A script module is a `<name>.toml` manifest declaring its dependencies,
//! the commands run for each lifecycle hook and extra hook environment.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::module::process::hooks::dependency_env_var;
use crate::module::traits::{DependsMap, ModuleError};

/// Hook commands (argv lists) of a script module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptHooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable: Option<Vec<String>>,
}

/// Script manifest (`<name>.toml` structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptManifest {
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// alias -> absolute URI, local script name or relative path
    #[serde(default)]
    pub depends: DependsMap,
    #[serde(default)]
    pub hooks: ScriptHooks,
    /// Extra environment for every hook
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

impl ScriptManifest {
    /// Every alias must get its own hook environment variable
    fn check_aliases(depends: &DependsMap) -> Result<(), String> {
        let mut variables: HashMap<String, &str> = HashMap::new();
        for alias in depends.keys() {
            let variable = dependency_env_var(alias);
            if let Some(other) = variables.insert(variable.clone(), alias) {
                return Err(format!(
                    "dependency aliases {} and {} both map to {}",
                    other, alias, variable
                ));
            }
        }
        Ok(())
    }

    /// Parse manifest text
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load manifest from file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let path = path.as_ref();
        let manifest_error = |reason: String| ModuleError::Manifest {
            path: path.display().to_string(),
            reason,
        };

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| manifest_error(format!("Failed to read manifest file: {}", e)))?;
        let manifest = Self::parse(&contents)
            .map_err(|e| manifest_error(format!("Failed to parse manifest TOML: {}", e)))?;

        for (phase, command) in [
            ("init", &manifest.hooks.init),
            ("enable", &manifest.hooks.enable),
            ("disable", &manifest.hooks.disable),
        ] {
            if command.as_ref().is_some_and(|argv| argv.is_empty()) {
                return Err(manifest_error(format!("{} hook command cannot be empty", phase)));
            }
        }

        Self::check_aliases(&manifest.depends).map_err(manifest_error)?;

        Ok(manifest)
    }
}

/// A loaded script module; exported through its handle so dependents can
/// find each other's manifests
#[derive(Debug, Clone)]
pub struct ScriptModule {
    pub name: String,
    pub path: PathBuf,
    pub manifest: ScriptManifest,
}

impl ScriptModule {
    /// Directory hooks run in
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = ScriptManifest::parse(
            r#"
description = "clock tweaks"

[depends]
util = "https://x/y/util"
helper = "./helper"

[hooks]
enable = ["sh", "-c", "echo on"]
disable = ["sh", "-c", "echo off"]

[env]
COLOR = "blue"
"#,
        )
        .unwrap();

        assert_eq!(manifest.description.as_deref(), Some("clock tweaks"));
        assert_eq!(
            manifest.depends.iter().collect::<Vec<_>>(),
            vec![
                (&"util".to_string(), &"https://x/y/util".to_string()),
                (&"helper".to_string(), &"./helper".to_string())
            ]
        );
        assert!(manifest.hooks.init.is_none());
        assert_eq!(manifest.hooks.enable.as_ref().unwrap().len(), 3);
        assert_eq!(manifest.env["COLOR"], "blue");
    }

    #[test]
    fn test_empty_manifest_is_valid() {
        let manifest = ScriptManifest::parse("").unwrap();
        assert_eq!(manifest, ScriptManifest::default());
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(ScriptManifest::parse("depends = 3").is_err());
    }

    #[tokio::test]
    async fn test_empty_hook_command_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[hooks]\nenable = []\n").unwrap();

        let err = ScriptManifest::from_file(&path).await.unwrap_err();
        assert!(matches!(err, ModuleError::Manifest { .. }));
    }

    #[tokio::test]
    async fn test_aliases_sharing_a_hook_variable_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clash.toml");
        std::fs::write(&path, "[depends]\nmy-lib = \"a\"\nmy_lib = \"b\"\n").unwrap();

        let err = ScriptManifest::from_file(&path).await.unwrap_err();
        match err {
            ModuleError::Manifest { reason, .. } => {
                assert!(reason.contains("my-lib and my_lib"));
                assert!(reason.contains("USERSCRIPT_DEP_MY_LIB"));
            }
            other => panic!("expected a manifest error, got {:?}", other),
        }
    }
}
