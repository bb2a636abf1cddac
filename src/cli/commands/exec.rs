//! Exec command implementation.

use crate::cli::args::ExecArgs;
use crate::error::Result;
use crate::project::{Project, StartOptions};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// Starts the containers, then attaches a shell to the tests container.
pub struct ExecCommand<'a> {
    project: &'a Project,
    args: ExecArgs,
}

impl<'a> ExecCommand<'a> {
    pub fn new(project: &'a Project, args: ExecArgs) -> Self {
        Self { project, args }
    }
}

impl Command for ExecCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let container = self
            .project
            .start(ui, &StartOptions::default())?
            .unwrap_or_else(|| self.project.tests_container(""));

        let code = self.project.runner().exec_shell(
            &container,
            self.args.user.as_deref(),
            &self.args.command,
        )?;
        Ok(CommandResult::from_exit_code(code))
    }
}
