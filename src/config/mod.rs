//! Configuration loading, parsing, and validation for teststack.
//!
//! This module handles all aspects of configuration:
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Deep merging in [`merger`]
//! - Validation in [`validator`]
//! - Environment variable interpolation in [`interpolation`]
//!
//! # Example
//!
//! ```
//! use teststack::config::{load_merged_config, validate, ConfigPaths};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! fs::write(
//!     temp.path().join("teststack.toml"),
//!     "[tests.steps]\ntests = \"pytest {posargs}\"\n",
//! )
//! .unwrap();
//!
//! let config = load_merged_config(&ConfigPaths::discover(temp.path())).unwrap();
//! validate(&config).unwrap();
//! assert_eq!(config.tests.step_definitions()["tests"].command, vec!["pytest {posargs}"]);
//! ```
//!
//! # Configuration File Locations
//!
//! teststack merges configuration in this order:
//! 1. Project config (`teststack.toml`)
//! 2. Local overrides (`teststack.local.toml`)

pub mod interpolation;
pub mod loader;
pub mod merger;
pub mod schema;
pub mod validator;

// Schema re-exports
pub use schema::{
    ClientConfig, MountConfig, ServiceConfig, StepConfig, StepTable, StringOrList, TestsConfig,
    TeststackConfig,
};

// Loader re-exports
pub use loader::{
    load_config_value, load_merged_config, load_merged_config_with_env,
    ConfigPaths, DEFAULT_CONFIG_FILE, DEFAULT_LOCAL_CONFIG_FILE,
};

// Merger re-exports
pub use merger::{deep_merge, merge_configs};

// Validator re-exports
pub use validator::{
    check_min_version, parse_version, validate, validate_config, ValidationError,
    SUPPORTED_CLIENTS,
};

// Interpolation re-exports
pub use interpolation::{extract_variables, interpolate_config, interpolate_str, interpolate_value};
