//! Run command implementation.
//!
//! The `teststack run` command starts the containers and runs the
//! configured steps in the tests container.

use crate::cli::args::RunArgs;
use crate::error::{Result, TeststackError};
use crate::project::{Project, StartOptions};
use crate::runner::run_commands;
use crate::steps::{StepExecutor, StepGraph};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// Exit code when a `--copy` file could not be retrieved.
pub const COPY_FAILED_EXIT_CODE: i32 = 12;

/// The run command implementation.
pub struct RunCommand<'a> {
    project: &'a Project,
    args: RunArgs,
}

impl<'a> RunCommand<'a> {
    /// Create a new run command.
    pub fn new(project: &'a Project, args: RunArgs) -> Self {
        Self { project, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &RunArgs {
        &self.args
    }
}

impl Command for RunCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        tracing::debug!(
            "Invoking 'run', --copy {}, --step {:?}, posargs: {:?}",
            self.args.copy,
            self.args.step,
            self.args.posargs
        );

        // Select steps before touching any container
        let definitions = self.project.config().tests.step_definitions();
        let graph = match StepGraph::for_run(&definitions, self.args.step.as_deref()) {
            Ok(graph) => graph,
            Err(e @ TeststackError::UnknownStep { .. }) => {
                ui.error(&e.to_string());
                return Ok(CommandResult::failure(1));
            }
            Err(e) => return Err(e),
        };
        tracing::debug!("Resolved steps: {:?}", graph.names().collect::<Vec<_>>());

        let container = self
            .project
            .start(ui, &StartOptions::default())?
            .unwrap_or_else(|| self.project.tests_container(""));

        let executor = StepExecutor::new(
            self.project.runner(),
            container,
            self.args.posargs.clone(),
        );
        let outcome = run_commands(&graph, executor)?;
        if !outcome.success() {
            tracing::debug!("Failed steps: {:?}", outcome.failed_steps());
            return Ok(CommandResult::failure(outcome.exit_code()));
        }

        if self.args.copy && !self.project.copy_files(ui)? {
            return Ok(CommandResult::failure(COPY_FAILED_EXIT_CODE));
        }

        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TeststackConfig;
    use crate::containers::MockRunner;
    use crate::git::GitInfo;
    use crate::ui::MockUI;
    use std::path::PathBuf;

    const CONFIG: &str = r#"
[tests]
copy = ["coverage.xml"]

[tests.steps]
install = "pip install ."
tests = { command = "pytest {posargs}", requires = "install" }
"#;

    fn setup(toml_str: &str) -> (Project, MockRunner) {
        let config: TeststackConfig = toml::from_str(toml_str).unwrap();
        let mock = MockRunner::new();
        mock.add_image("app:latest", "sha256:abc");
        let project = Project::new(
            PathBuf::from("/work/app"),
            None,
            config,
            GitInfo::default(),
            Box::new(mock.clone()),
        );
        (project, mock)
    }

    fn args(step: Option<&str>, posargs: &[&str]) -> RunArgs {
        RunArgs {
            step: step.map(str::to_string),
            copy: false,
            posargs: posargs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn runs_steps_in_tests_container() {
        let (project, mock) = setup(CONFIG);
        let mut ui = MockUI::new();

        let result = RunCommand::new(&project, args(None, &["-k", "test_x"]))
            .execute(&mut ui)
            .unwrap();

        assert!(result.success);
        assert_eq!(mock.commands(), vec!["pip install .", "pytest -k test_x"]);
        assert!(mock.calls().iter().all(|c| c.container == "app_tests"));
    }

    #[test]
    fn unknown_step_fails_before_starting_containers() {
        let (project, mock) = setup(CONFIG);
        let mut ui = MockUI::new();

        let result = RunCommand::new(&project, args(Some("doesnotexist"), &[]))
            .execute(&mut ui)
            .unwrap();

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("doesnotexist is not an available step"));
        assert!(mock.runs().is_empty());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn failing_install_skips_tests_and_sets_exit_code() {
        let (project, mock) = setup(CONFIG);
        mock.set_exit_code("pip install .", 1);

        let result = RunCommand::new(&project, args(None, &[]))
            .execute(&mut MockUI::new())
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, 2);
        assert_eq!(mock.commands(), vec!["pip install ."]);
    }

    #[test]
    fn single_step_runs_its_requirement_first() {
        let (project, mock) = setup(CONFIG);

        RunCommand::new(&project, args(Some("tests"), &[]))
            .execute(&mut MockUI::new())
            .unwrap();

        assert_eq!(mock.commands(), vec!["pip install .", "pytest "]);
    }

    #[test]
    fn copy_runs_after_successful_steps() {
        let (project, mock) = setup(CONFIG);
        let mut run_args = args(None, &[]);
        run_args.copy = true;

        let result = RunCommand::new(&project, run_args)
            .execute(&mut MockUI::new())
            .unwrap();

        assert!(result.success);
        assert_eq!(mock.copies(), vec!["coverage.xml"]);
    }

    #[test]
    fn failed_copy_exits_with_twelve() {
        let (project, mock) = setup(CONFIG);
        mock.set_missing_file("coverage.xml");
        let mut run_args = args(None, &[]);
        run_args.copy = true;
        let mut ui = MockUI::new();

        let result = RunCommand::new(&project, run_args).execute(&mut ui).unwrap();

        assert_eq!(result.exit_code, COPY_FAILED_EXIT_CODE);
        assert!(ui.has_error("Failed to retrieve coverage.xml!"));
    }

    #[test]
    fn large_totals_are_clamped() {
        let mut toml_str = String::from("[tests.steps]\n");
        for i in 0..3 {
            toml_str.push_str(&format!("s{} = \"fail{}\"\n", i, i));
        }
        let (project, mock) = setup(&toml_str);
        for i in 0..3 {
            mock.set_exit_code(&format!("fail{}", i), 100);
        }

        let result = RunCommand::new(&project, args(None, &[]))
            .execute(&mut MockUI::new())
            .unwrap();

        assert_eq!(result.exit_code, 255);
    }
}
