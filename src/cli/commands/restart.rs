//! Restart command implementation.

use crate::error::Result;
use crate::project::{Project, StartOptions};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// Stops then starts every container with default options.
pub struct RestartCommand<'a> {
    project: &'a Project,
}

impl<'a> RestartCommand<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }
}

impl Command for RestartCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        self.project.stop(ui, "")?;
        self.project.start(ui, &StartOptions::default())?;
        Ok(CommandResult::success())
    }
}
