//! Step definitions, graph building and execution.
//!
//! This module provides the data side of a `run`:
//!
//! - [`StepDefinition`] - A step as configured
//! - [`StepGraph`] - Validated steps with reverse (`required_by`) edges
//! - [`StepExecutor`] - Runs a step's commands in the tests container
//!
//! Deciding *which* steps run is the job of [`crate::runner`].
//!
//! # Example
//!
//! ```
//! use teststack::steps::{StepDefinition, StepGraph};
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
//! assert_eq!(graph.get("install").unwrap().required_by, vec!["tests"]);
//! ```

pub mod definition;
pub mod executor;
pub mod graph;
pub mod resolved;

pub use definition::StepDefinition;
pub use executor::{substitute_posargs, StepExecutor, POSARGS_PLACEHOLDER};
pub use graph::{select_steps, StepGraph, StepGraphBuilder};
pub use resolved::ResolvedStep;
