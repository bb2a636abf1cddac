//! Build command implementation.
//!
//! The `teststack build` command builds the tests image, or the image of
//! a service that has a `build` directory.

use crate::cli::args::BuildArgs;
use crate::error::Result;
use crate::project::{BuildOptions, Project};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The build command implementation.
pub struct BuildCommand<'a> {
    project: &'a Project,
    args: BuildArgs,
}

impl<'a> BuildCommand<'a> {
    /// Create a new build command.
    pub fn new(project: &'a Project, args: BuildArgs) -> Self {
        Self { project, args }
    }
}

impl Command for BuildCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        tracing::debug!("Invoked build: {:?}", self.args);

        let opts = BuildOptions {
            rebuild: self.args.rebuild,
            tag: self.args.tag.clone(),
            file: self.args.file.clone(),
            directory: self.args.directory.clone(),
            service: self.args.service.clone(),
            stage: self.args.stage.clone(),
        };
        let tag = self.project.build(ui, &opts)?;
        ui.success(&format!("Built {}", tag));
        Ok(CommandResult::success())
    }
}
