//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which loads the
//! configuration, binds it to a container engine and routes CLI
//! subcommands to their implementations. Commands other than `config`
//! and `completions` operate on the resulting [`crate::project::Project`].

pub mod build;
pub mod completions;
pub mod config;
pub mod dispatcher;
pub mod exec;
pub mod restart;
pub mod run;
pub mod start;
pub mod status;
pub mod stop;
pub mod tag;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
