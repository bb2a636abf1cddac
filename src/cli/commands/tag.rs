//! Tag command implementation.

use crate::error::Result;
use crate::project::Project;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// Prints the tests image tag.
pub struct TagCommand<'a> {
    project: &'a Project,
}

impl<'a> TagCommand<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }
}

impl Command for TagCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        ui.message(self.project.tag());
        Ok(CommandResult::success())
    }
}
