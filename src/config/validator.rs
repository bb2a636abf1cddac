//! Configuration validation rules.
//!
//! This module validates configuration for correctness:
//! - `[client].name` must be a supported engine
//! - Steps must have at least one command
//! - `requires` must reference existing steps
//! - No circular dependencies allowed
//! - Services need an `image` or a `build` directory
//! - `min_version` must be a version number

use semver::Version;

use crate::config::schema::TeststackConfig;
use crate::error::{Result, TeststackError};
use crate::steps::StepGraph;

/// Engines `[client].name` may select.
pub const SUPPORTED_CLIENTS: &[&str] = &["docker", "podman"];

/// Validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
    /// Step name if error is step-specific
    pub step: Option<String>,
    /// Service name if error is service-specific
    pub service: Option<String>,
}

impl ValidationError {
    fn new(rule: &str, message: String) -> Self {
        Self {
            rule: rule.to_string(),
            message,
            step: None,
            service: None,
        }
    }

    fn for_step(rule: &str, step: &str, message: String) -> Self {
        Self {
            step: Some(step.to_string()),
            ..Self::new(rule, message)
        }
    }
}

/// Validate a configuration and return all errors.
///
/// This function collects all validation errors rather than stopping
/// at the first one, allowing users to fix multiple issues at once.
pub fn validate_config(config: &TeststackConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_client(config));
    errors.extend(validate_steps(config));
    errors.extend(validate_services(config));
    errors.extend(validate_min_version(config));

    errors
}

fn validate_client(config: &TeststackConfig) -> Vec<ValidationError> {
    if SUPPORTED_CLIENTS.contains(&config.client.name.as_str()) {
        return Vec::new();
    }
    vec![ValidationError::new(
        "unknown-client",
        format!(
            "Unknown container client '{}', expected one of: {}",
            config.client.name,
            SUPPORTED_CLIENTS.join(", ")
        ),
    )]
}

/// Validate step definitions and their dependency graph.
fn validate_steps(config: &TeststackConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let definitions = config.tests.step_definitions();

    for (name, step) in &definitions {
        if step.command.is_empty() {
            errors.push(ValidationError::for_step(
                "missing-command",
                name,
                format!("Step '{}' has no command", name),
            ));
        }

        for dep in &step.requires {
            if !definitions.contains_key(dep) {
                errors.push(ValidationError::for_step(
                    "unknown-step",
                    name,
                    format!("Step '{}' requires '{}' which does not exist", name, dep),
                ));
            }
        }
    }

    // Cycles are only meaningful once every reference resolves
    if errors.iter().all(|e| e.rule != "unknown-step") {
        if let Err(TeststackError::CircularDependency { cycle }) =
            StepGraph::from_definitions(&definitions)
        {
            let step = cycle.split(" -> ").next().unwrap_or_default().to_string();
            errors.push(ValidationError {
                step: Some(step),
                ..ValidationError::new(
                    "circular-dependency",
                    format!("Circular dependency detected: {}", cycle),
                )
            });
        }
    }

    errors
}

fn validate_services(config: &TeststackConfig) -> Vec<ValidationError> {
    config
        .services
        .iter()
        .filter(|(_, service)| service.image.is_none() && service.build.is_none())
        .map(|(name, _)| ValidationError {
            service: Some(name.clone()),
            ..ValidationError::new(
                "missing-image",
                format!("Service '{}' needs either 'image' or 'build'", name),
            )
        })
        .collect()
}

fn validate_min_version(config: &TeststackConfig) -> Vec<ValidationError> {
    match config.tests.min_version() {
        Some(version) if parse_version(version).is_none() => vec![ValidationError::new(
            "invalid-min-version",
            format!("min_version '{}' is not a version number", version),
        )],
        _ => Vec::new(),
    }
}

/// Validate and return Result (for convenience).
///
/// # Errors
///
/// Returns `ConfigValidationError` if any validation rules fail.
pub fn validate(config: &TeststackConfig) -> Result<()> {
    let errors = validate_config(config);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
        Err(TeststackError::ConfigValidationError {
            message: messages.join("; "),
        })
    }
}

/// Parse a possibly shortened version like `1.2` or `v2`.
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim().trim_start_matches('v');
    let parts = version.split('.').count();
    let padded = match parts {
        1 => format!("{}.0.0", version),
        2 => format!("{}.0", version),
        _ => version.to_string(),
    };
    Version::parse(&padded).ok()
}

/// Fail with [`TeststackError::VersionTooLow`] if the config needs a newer
/// teststack than `current`.
pub fn check_min_version(config: &TeststackConfig, current: &str) -> Result<()> {
    let Some(required) = config.tests.min_version() else {
        return Ok(());
    };

    let required_version =
        parse_version(required).ok_or_else(|| TeststackError::ConfigValidationError {
            message: format!("min_version '{}' is not a version number", required),
        })?;
    let current_version =
        parse_version(current).ok_or_else(|| TeststackError::ConfigValidationError {
            message: format!("teststack version '{}' is not a version number", current),
        })?;

    if required_version > current_version {
        return Err(TeststackError::VersionTooLow {
            required: required.to_string(),
            current: current.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ServiceConfig, StepConfig, StepTable, StringOrList};

    fn step(command: &[&str], requires: &[&str]) -> StepConfig {
        StepConfig::Detailed(StepTable {
            command: StringOrList(command.iter().map(|s| s.to_string()).collect()),
            requires: StringOrList(requires.iter().map(|s| s.to_string()).collect()),
            check: None,
            user: None,
        })
    }

    fn config_with_steps(steps: &[(&str, StepConfig)]) -> TeststackConfig {
        let mut config = TeststackConfig::default();
        for (name, step) in steps {
            config.tests.steps.insert(name.to_string(), step.clone());
        }
        config
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&TeststackConfig::default()).is_ok());
    }

    #[test]
    fn rejects_unknown_client() {
        let mut config = TeststackConfig::default();
        config.client.name = "lxc".to_string();

        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.rule == "unknown-client"));
    }

    #[test]
    fn rejects_step_without_command() {
        let config = config_with_steps(&[("empty", StepConfig::Commands(Vec::new()))]);

        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| e.rule == "missing-command" && e.step.as_deref() == Some("empty")));
    }

    #[test]
    fn rejects_unknown_requires() {
        let config = config_with_steps(&[("tests", step(&["pytest"], &["install"]))]);

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "unknown-step");
        assert!(errors[0].message.contains("install"));
    }

    #[test]
    fn rejects_cycles() {
        let config = config_with_steps(&[
            ("a", step(&["run-a"], &["b"])),
            ("b", step(&["run-b"], &["a"])),
        ]);

        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn rejects_service_without_image() {
        let mut config = TeststackConfig::default();
        config
            .services
            .insert("cache".to_string(), ServiceConfig::default());

        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| e.rule == "missing-image" && e.service.as_deref() == Some("cache")));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = config_with_steps(&[("tests", step(&["pytest"], &["missing"]))]);
        config.client.name = "lxc".to_string();

        let err = validate(&config).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("lxc"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn parse_version_pads_short_versions() {
        assert_eq!(parse_version("1"), Some(Version::new(1, 0, 0)));
        assert_eq!(parse_version("v1.2"), Some(Version::new(1, 2, 0)));
        assert_eq!(parse_version("0.9.3"), Some(Version::new(0, 9, 3)));
        assert_eq!(parse_version("latest"), None);
    }

    #[test]
    fn min_version_older_than_current_passes() {
        let mut config = TeststackConfig::default();
        config.tests.min_version = Some("v0.1".to_string());
        assert!(check_min_version(&config, "0.9.0").is_ok());
    }

    #[test]
    fn min_version_newer_than_current_fails() {
        let mut config = TeststackConfig::default();
        config.tests.min_version = Some("v99.0".to_string());

        let err = check_min_version(&config, "0.9.0").unwrap_err();
        assert!(matches!(err, TeststackError::VersionTooLow { .. }));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn invalid_min_version_is_reported() {
        let mut config = TeststackConfig::default();
        config.tests.min_version = Some("soon".to_string());

        assert!(validate_config(&config)
            .iter()
            .any(|e| e.rule == "invalid-min-version"));
        assert!(check_min_version(&config, "0.9.0").is_err());
    }
}
