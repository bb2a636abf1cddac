//! Status command implementation.
//!
//! The `teststack status` command prints one row per container.

use crate::error::Result;
use crate::project::{Project, StatusRow};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The status command implementation.
pub struct StatusCommand<'a> {
    project: &'a Project,
}

impl<'a> StatusCommand<'a> {
    /// Create a new status command.
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }
}

impl Command for StatusCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let mut spinner = ui.start_spinner("Querying containers");
        let rows = self.project.status_rows();
        spinner.clear();
        let rows = rows?;

        ui.message(&StatusRow::header());
        for row in rows {
            ui.message(&row.line());
        }
        Ok(CommandResult::success())
    }
}
