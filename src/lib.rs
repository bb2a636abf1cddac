//! teststack - Run a project's tests inside containers.
//!
//! teststack reads a `teststack.toml`, starts the service containers a
//! project depends on plus a tests container built from the project, and
//! runs the configured steps inside it. Steps may require other steps and
//! may carry a check command that marks their work as already done.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, merging, and validation
//! - [`containers`] - Container engine backends (docker, podman)
//! - [`error`] - Error types and result aliases
//! - [`git`] - Image tags from the project's git checkout
//! - [`project`] - Container lifecycle of one project
//! - [`runner`] - Step dependency resolution
//! - [`shell`] - Process execution
//! - [`steps`] - Step definitions, graph, and execution
//! - [`ui`] - Spinners and terminal output
//!
//! # Example
//!
//! ```
//! use teststack::containers::MockRunner;
//! use teststack::runner::run_commands;
//! use teststack::steps::{StepDefinition, StepExecutor, StepGraph};
//!
//! let graph = StepGraph::builder()
//!     .add_step(StepDefinition::new("install", vec!["pip install .".into()]))
//!     .add_step(
//!         StepDefinition::new("tests", vec!["pytest {posargs}".into()])
//!             .with_requires(["install"]),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let runner = MockRunner::new();
//! let executor = StepExecutor::new(&runner, "app_tests", vec!["-x".into()]);
//! let outcome = run_commands(&graph, executor).unwrap();
//!
//! assert!(outcome.success());
//! assert_eq!(runner.commands(), vec!["pip install .", "pytest -x"]);
//! ```

pub mod cli;
pub mod config;
pub mod containers;
pub mod error;
pub mod git;
pub mod project;
pub mod runner;
pub mod shell;
pub mod steps;
pub mod ui;

pub use error::{Result, TeststackError};
