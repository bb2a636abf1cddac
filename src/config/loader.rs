//! Configuration file discovery and loading.
//!
//! A project is configured by `teststack.toml`, optionally overridden by
//! an untracked `teststack.local.toml` next to it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;

use crate::config::interpolation::interpolate_config;
use crate::config::merger::merge_configs;
use crate::config::schema::{
    TeststackConfig, KNOWN_SECTIONS, KNOWN_SERVICE_KEYS, KNOWN_TESTS_KEYS,
};
use crate::error::{Result, TeststackError};

/// Default name of the project config file.
pub const DEFAULT_CONFIG_FILE: &str = "teststack.toml";

/// Default name of the local override file.
pub const DEFAULT_LOCAL_CONFIG_FILE: &str = "teststack.local.toml";

/// Paths to the configuration files, in merge order.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project config: teststack.toml
    pub main: PathBuf,

    /// Local overrides: teststack.local.toml
    pub local: PathBuf,
}

impl ConfigPaths {
    /// Resolve config paths for a project root.
    ///
    /// Relative overrides are resolved against `project_root`.
    pub fn new(project_root: &Path, config: Option<&Path>, local_config: Option<&Path>) -> Self {
        let resolve = |p: Option<&Path>, default: &str| {
            let p = p.unwrap_or_else(|| Path::new(default));
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                project_root.join(p)
            }
        };

        Self {
            main: resolve(config, DEFAULT_CONFIG_FILE),
            local: resolve(local_config, DEFAULT_LOCAL_CONFIG_FILE),
        }
    }

    /// Default file names under `project_root`.
    pub fn discover(project_root: &Path) -> Self {
        Self::new(project_root, None, None)
    }

    /// Whether the main config file exists.
    pub fn has_main_config(&self) -> bool {
        self.main.is_file()
    }

    /// Returns all existing config paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        [&self.main, &self.local]
            .into_iter()
            .filter(|p| p.is_file())
            .collect()
    }
}

/// Load a config file as a raw TOML value (for merging).
pub fn load_config_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TeststackError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            TeststackError::Io(e)
        }
    })?;

    content
        .parse::<toml::Table>()
        .map(Value::Table)
        .map_err(|e| TeststackError::ConfigParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Load, merge, interpolate, and parse the project configuration.
///
/// A missing main file is not an error: the merged result falls back to
/// defaults, and callers decide whether to warn via
/// [`ConfigPaths::has_main_config`].
pub fn load_merged_config(paths: &ConfigPaths) -> Result<TeststackConfig> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_merged_config_with_env(paths, &env)
}

/// [`load_merged_config`] with an explicit variable set for interpolation.
pub fn load_merged_config_with_env(
    paths: &ConfigPaths,
    env: &HashMap<String, String>,
) -> Result<TeststackConfig> {
    let mut configs = Vec::new();
    for path in paths.all_existing() {
        tracing::debug!("Loading config from {}", path.display());
        configs.push(load_config_value(path)?);
    }

    let mut merged = merge_configs(&configs);
    interpolate_config(&mut merged, env);
    warn_unknown_keys(&merged);

    merged
        .try_into()
        .map_err(|e: toml::de::Error| TeststackError::ConfigParseError {
            path: paths.main.clone(),
            message: e.to_string(),
        })
}

/// Log keys the schema ignores.
///
/// `[client]` extras are engine options and `[tests.steps]` entries are
/// strict, so only the top level, `[tests]` and services are checked here.
fn warn_unknown_keys(merged: &Value) {
    let Some(root) = merged.as_table() else {
        return;
    };

    for key in root.keys() {
        if !KNOWN_SECTIONS.contains(&key.as_str()) {
            tracing::warn!("Ignoring unknown configuration section [{}]", key);
        }
    }

    if let Some(tests) = root.get("tests").and_then(Value::as_table) {
        for key in tests.keys() {
            if !KNOWN_TESTS_KEYS.contains(&key.as_str()) {
                tracing::warn!("Ignoring unknown key '{}' in [tests]", key);
            }
        }
    }

    if let Some(services) = root.get("services").and_then(Value::as_table) {
        for (service, data) in services {
            let Some(data) = data.as_table() else {
                continue;
            };
            for key in data.keys() {
                if !KNOWN_SERVICE_KEYS.contains(&key.as_str()) {
                    tracing::warn!("Ignoring unknown key '{}' in [services.{}]", key, service);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(main: Option<&str>, local: Option<&str>) -> TempDir {
        let temp = TempDir::new().unwrap();
        if let Some(content) = main {
            fs::write(temp.path().join(DEFAULT_CONFIG_FILE), content).unwrap();
        }
        if let Some(content) = local {
            fs::write(temp.path().join(DEFAULT_LOCAL_CONFIG_FILE), content).unwrap();
        }
        temp
    }

    #[test]
    fn discover_uses_default_file_names() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::discover(temp.path());

        assert_eq!(paths.main, temp.path().join("teststack.toml"));
        assert_eq!(paths.local, temp.path().join("teststack.local.toml"));
        assert!(!paths.has_main_config());
    }

    #[test]
    fn relative_overrides_resolve_against_project_root() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(
            temp.path(),
            Some(Path::new("ci/teststack.toml")),
            Some(Path::new("/etc/teststack.local.toml")),
        );

        assert_eq!(paths.main, temp.path().join("ci/teststack.toml"));
        assert_eq!(paths.local, PathBuf::from("/etc/teststack.local.toml"));
    }

    #[test]
    fn missing_files_load_defaults() {
        let temp = project(None, None);
        let config = load_merged_config(&ConfigPaths::discover(temp.path())).unwrap();

        assert_eq!(config.client.name, "docker");
        assert!(config.tests.steps.is_empty());
    }

    #[test]
    fn local_config_overrides_main() {
        let temp = project(
            Some(
                r#"
[client]
name = "docker"

[tests.steps]
install = "pip install ."
tests = { command = "pytest", requires = "install" }
"#,
            ),
            Some(
                r#"
[client]
name = "podman"

[tests.steps]
install = "pip install -e ."
"#,
            ),
        );

        let config = load_merged_config(&ConfigPaths::discover(temp.path())).unwrap();

        assert_eq!(config.client.name, "podman");
        let defs = config.tests.step_definitions();
        assert_eq!(defs["install"].command, vec!["pip install -e ."]);
        assert_eq!(defs["tests"].requires, vec!["install"]);
        let names: Vec<_> = defs.keys().cloned().collect();
        assert_eq!(names, vec!["install", "tests"]);
    }

    #[test]
    fn interpolates_environment_outside_steps() {
        let temp = project(
            Some(
                r#"
[services.database]
image = "postgres:{PG_VERSION}"

[tests.steps]
tests = "pytest {posargs}"
"#,
            ),
            None,
        );
        let env: HashMap<String, String> =
            [("PG_VERSION".to_string(), "16".to_string())].into();

        let config =
            load_merged_config_with_env(&ConfigPaths::discover(temp.path()), &env).unwrap();

        assert_eq!(
            config.services["database"].image.as_deref(),
            Some("postgres:16")
        );
        assert_eq!(
            config.tests.step_definitions()["tests"].command,
            vec!["pytest {posargs}"]
        );
    }

    #[test]
    fn invalid_toml_reports_path() {
        let temp = project(Some("[tests\nbroken"), None);
        let err = load_merged_config(&ConfigPaths::discover(temp.path())).unwrap_err();

        match err {
            TeststackError::ConfigParseError { path, .. } => {
                assert!(path.ends_with("teststack.toml"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_step_key_is_a_parse_error() {
        let temp = project(
            Some(
                r#"
[tests.steps.install]
command = "pip install ."
retries = 3
"#,
            ),
            None,
        );

        let err = load_merged_config(&ConfigPaths::discover(temp.path())).unwrap_err();
        assert!(err.to_string().contains("retries"));
    }

    #[test]
    fn unknown_tests_key_is_ignored() {
        let temp = project(
            Some(
                r#"
[tests]
export = { DATABASE_URL = "postgres://localhost" }

[tests.steps]
env = "env"
"#,
            ),
            None,
        );

        let config = load_merged_config(&ConfigPaths::discover(temp.path())).unwrap();
        assert_eq!(config.tests.steps.len(), 1);
    }

    #[test]
    fn load_config_value_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = load_config_value(&temp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, TeststackError::ConfigNotFound { .. }));
    }
}
