//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.
//!
//! Project options (`--config`, `--path`, ...) go before the subcommand;
//! output options are accepted anywhere.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// teststack - Run a project's tests inside containers.
#[derive(Debug, Parser)]
#[command(name = "teststack")]
#[command(author, version, long_about = None)]
#[command(about = "Run a project's tests inside containers")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Location of teststack config
    #[arg(short, long, default_value = "teststack.toml")]
    pub config: PathBuf,

    /// Local config to overwrite data in teststack.toml
    #[arg(short, long, default_value = "teststack.local.toml")]
    pub local_config: PathBuf,

    /// Name used for containers and the network (default: directory name)
    #[arg(short = 'n', long)]
    pub project_name: Option<String>,

    /// Directory to run teststack in
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the test steps (default if no command specified)
    Run(RunArgs),

    /// Start services and tests containers
    Start(StartArgs),

    /// Stop and remove all containers
    Stop(StopArgs),

    /// Stop then start all containers
    Restart,

    /// Build the tests image, or a service image
    Build(BuildArgs),

    /// Open a shell in the tests container
    Exec(ExecArgs),

    /// Show status of containers
    Status,

    /// Print the image tag of the tests container
    Tag,

    /// Show resolved configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Which step to run
    #[arg(short, long)]
    pub step: Option<String>,

    /// Copy files from [tests].copy out of the container after the steps
    #[arg(short, long)]
    pub copy: bool,

    /// Arguments substituted for {posargs} in step commands
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub posargs: Vec<String>,
}

/// Arguments for the `start` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StartArgs {
    /// Don't start the tests container
    #[arg(short, long)]
    pub no_tests: bool,

    /// Don't mount the current directory
    #[arg(short = 'm', long)]
    pub no_mount: bool,

    /// Prefix to start a container name with
    #[arg(short, long, default_value = "")]
    pub prefix: String,
}

/// Arguments for the `stop` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StopArgs {
    /// Prefix of the container names to stop
    #[arg(short, long, default_value = "")]
    pub prefix: String,
}

/// Arguments for the `build` command.
#[derive(Debug, Clone, clap::Args)]
pub struct BuildArgs {
    /// Ignore cache and rebuild the image fully
    #[arg(short, long)]
    pub rebuild: bool,

    /// Tag to label the build
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Container build file
    #[arg(short, long = "file", visible_alias = "dockerfile", default_value = "Dockerfile")]
    pub file: PathBuf,

    /// Directory to build in
    #[arg(short, long, default_value = ".")]
    pub directory: PathBuf,

    /// Service with a `build` directory to build the image for
    #[arg(long)]
    pub service: Option<String>,

    /// Stage to build in the Dockerfile
    #[arg(long)]
    pub stage: Option<String>,
}

/// Arguments for the `exec` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ExecArgs {
    /// User to exec into the container as
    #[arg(short, long)]
    pub user: Option<String>,

    /// Command to run instead of bash
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Arguments for the `config` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
