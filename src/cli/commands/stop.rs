//! Stop command implementation.

use crate::cli::args::StopArgs;
use crate::error::Result;
use crate::project::Project;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The stop command implementation.
pub struct StopCommand<'a> {
    project: &'a Project,
    args: StopArgs,
}

impl<'a> StopCommand<'a> {
    /// Create a new stop command.
    pub fn new(project: &'a Project, args: StopArgs) -> Self {
        Self { project, args }
    }
}

impl Command for StopCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        self.project.stop(ui, &self.args.prefix)?;
        Ok(CommandResult::success())
    }
}
