//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands, RunArgs};
use crate::config::{check_min_version, load_merged_config, validate, ConfigPaths, TeststackConfig};
use crate::containers::create_runner;
use crate::error::{Result, TeststackError};
use crate::git::GitInfo;
use crate::project::Project;
use crate::ui::UserInterface;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command.
    ///
    /// # Arguments
    ///
    /// * `ui` - User interface for displaying output
    ///
    /// # Returns
    ///
    /// A [`CommandResult`] indicating success/failure and exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }

    /// Success for `0`, failure with `exit_code` otherwise.
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            Self::success()
        } else {
            Self::failure(exit_code)
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    project_root: PathBuf,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given project root.
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Dispatch and execute a command.
    ///
    /// Routes the CLI subcommand to the appropriate command implementation
    /// and executes it.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Some(Commands::Completions(args)) => {
                super::completions::CompletionsCommand::new(args.clone()).execute(ui)
            }
            Some(Commands::Config(args)) => {
                let paths = self.config_paths(cli)?;
                let config = self.load_config(&paths, ui)?;
                super::config::ConfigCommand::new(&paths, config, args.clone()).execute(ui)
            }
            Some(Commands::Run(args)) => {
                let project = self.load_project(cli, ui)?;
                super::run::RunCommand::new(&project, args.clone()).execute(ui)
            }
            Some(Commands::Start(args)) => {
                let project = self.load_project(cli, ui)?;
                super::start::StartCommand::new(&project, args.clone()).execute(ui)
            }
            Some(Commands::Stop(args)) => {
                let project = self.load_project(cli, ui)?;
                super::stop::StopCommand::new(&project, args.clone()).execute(ui)
            }
            Some(Commands::Restart) => {
                let project = self.load_project(cli, ui)?;
                super::restart::RestartCommand::new(&project).execute(ui)
            }
            Some(Commands::Build(args)) => {
                let project = self.load_project(cli, ui)?;
                super::build::BuildCommand::new(&project, args.clone()).execute(ui)
            }
            Some(Commands::Exec(args)) => {
                let project = self.load_project(cli, ui)?;
                super::exec::ExecCommand::new(&project, args.clone()).execute(ui)
            }
            Some(Commands::Status) => {
                let project = self.load_project(cli, ui)?;
                super::status::StatusCommand::new(&project).execute(ui)
            }
            Some(Commands::Tag) => {
                let project = self.load_project(cli, ui)?;
                super::tag::TagCommand::new(&project).execute(ui)
            }
            None => {
                // Default to run command with default args
                let project = self.load_project(cli, ui)?;
                super::run::RunCommand::new(&project, RunArgs::default()).execute(ui)
            }
        }
    }

    /// Config file locations for this invocation.
    pub fn config_paths(&self, cli: &Cli) -> Result<ConfigPaths> {
        let root = self.resolved_root()?;
        Ok(ConfigPaths::new(
            &root,
            Some(&cli.config),
            Some(&cli.local_config),
        ))
    }

    /// Load the configuration and bind it to its container engine.
    ///
    /// Fails before any engine is contacted when `min_version` is too
    /// high or the configuration is invalid.
    pub fn load_project(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<Project> {
        let root = self.resolved_root()?;
        let paths = self.config_paths(cli)?;
        let config = self.load_config(&paths, ui)?;

        check_min_version(&config, env!("CARGO_PKG_VERSION"))?;
        validate(&config)?;

        let runner = create_runner(&config.client)?;
        tracing::debug!("Using container engine {}", runner.name());

        let git = GitInfo::detect(&root);
        tracing::debug!("Git info for {}: {:?}", root.display(), git);

        Ok(Project::new(
            root,
            cli.project_name.clone(),
            config,
            git,
            runner,
        ))
    }

    fn load_config(&self, paths: &ConfigPaths, ui: &mut dyn UserInterface) -> Result<TeststackConfig> {
        if !paths.has_main_config() {
            ui.warning(&format!(
                "Configuration file {} not found; using defaults",
                paths.main.display()
            ));
        }
        load_merged_config(paths)
    }

    fn resolved_root(&self) -> Result<PathBuf> {
        if !self.project_root.is_dir() {
            return Err(TeststackError::ConfigValidationError {
                message: format!("Directory {} does not exist", self.project_root.display()),
            });
        }
        Ok(self.project_root.canonicalize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn command_result_success() {
        let result = CommandResult::success();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn command_result_failure() {
        let result = CommandResult::failure(1);
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
    }

    #[test]
    fn command_result_from_exit_code() {
        assert!(CommandResult::from_exit_code(0).success);
        assert_eq!(CommandResult::from_exit_code(3).exit_code, 3);
    }

    #[test]
    fn missing_config_warns_and_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf());
        let cli = Cli::parse_from(["teststack", "tag"]);
        let mut ui = MockUI::new();

        let project = dispatcher.load_project(&cli, &mut ui).unwrap();

        assert!(ui.has_warning("not found; using defaults"));
        assert_eq!(project.config().client.name, "docker");
    }

    #[test]
    fn project_named_after_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("myapp");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("teststack.toml"), "[tests.steps]\nenv = \"env\"\n").unwrap();
        let dispatcher = CommandDispatcher::new(root);
        let cli = Cli::parse_from(["teststack", "tag"]);
        let mut ui = MockUI::new();

        let project = dispatcher.load_project(&cli, &mut ui).unwrap();

        assert_eq!(project.name(), "myapp");
        assert!(ui.warnings().is_empty());
    }

    #[test]
    fn project_name_flag_overrides_directory() {
        let temp = TempDir::new().unwrap();
        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf());
        let cli = Cli::parse_from(["teststack", "-n", "other", "tag"]);

        let project = dispatcher.load_project(&cli, &mut MockUI::new()).unwrap();

        assert_eq!(project.tests_container(""), "other_tests");
    }

    #[test]
    fn too_new_min_version_fails_with_exit_code_ten() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("teststack.toml"),
            "[tests]\nmin_version = \"v999.0\"\n",
        )
        .unwrap();
        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf());
        let cli = Cli::parse_from(["teststack", "tag"]);

        let err = dispatcher
            .load_project(&cli, &mut MockUI::new())
            .err()
            .unwrap();

        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn unknown_client_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("teststack.toml"), "[client]\nname = \"lxc\"\n").unwrap();
        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf());
        let cli = Cli::parse_from(["teststack", "status"]);

        assert!(dispatcher.load_project(&cli, &mut MockUI::new()).is_err());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dispatcher = CommandDispatcher::new(PathBuf::from("/does/not/exist"));
        let cli = Cli::parse_from(["teststack", "tag"]);

        let err = dispatcher
            .load_project(&cli, &mut MockUI::new())
            .err()
            .unwrap();

        assert!(err.to_string().contains("does not exist"));
    }
}
