//! Start command implementation.

use crate::cli::args::StartArgs;
use crate::error::Result;
use crate::project::{Project, StartOptions};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The start command implementation.
pub struct StartCommand<'a> {
    project: &'a Project,
    args: StartArgs,
}

impl<'a> StartCommand<'a> {
    /// Create a new start command.
    pub fn new(project: &'a Project, args: StartArgs) -> Self {
        Self { project, args }
    }
}

impl Command for StartCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let opts = StartOptions {
            no_tests: self.args.no_tests,
            no_mount: self.args.no_mount,
            prefix: self.args.prefix.clone(),
        };
        if let Some(container) = self.project.start(ui, &opts)? {
            tracing::info!("Tests container {} is running", container);
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

    #[test]
    fn start_with_prefix_names_containers() {
        let config: TeststackConfig =
            toml::from_str("[services.db]\nimage = \"postgres\"\n").unwrap();
        let mock = MockRunner::new();
        mock.add_image("app:latest", "sha256:abc");
        let project = Project::new(
            PathBuf::from("/work/app"),
            None,
            config,
            GitInfo::default(),
            Box::new(mock.clone()),
        );
        let args = StartArgs {
            no_tests: false,
            no_mount: true,
            prefix: "imp.".to_string(),
        };

        let result = StartCommand::new(&project, args)
            .execute(&mut MockUI::new())
            .unwrap();

        assert!(result.success);
        let names: Vec<_> = mock.runs().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["imp.app_db", "imp.app_tests"]);
        assert_eq!(mock.runs()[1].mount_cwd, None);
    }
}
