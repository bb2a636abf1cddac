//! Config command implementation.
//!
//! The `teststack config` command shows the merged configuration.

use crate::cli::args::ConfigArgs;
use crate::config::{ConfigPaths, TeststackConfig};
use crate::error::{Result, TeststackError};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The config command implementation.
pub struct ConfigCommand {
    paths: ConfigPaths,
    config: TeststackConfig,
    args: ConfigArgs,
}

impl ConfigCommand {
    /// Create a new config command.
    pub fn new(paths: &ConfigPaths, config: TeststackConfig, args: ConfigArgs) -> Self {
        Self {
            paths: paths.clone(),
            config,
            args,
        }
    }

    /// Render the configuration in the requested format.
    pub fn render(&self) -> Result<String> {
        if self.args.json {
            serde_json::to_string_pretty(&self.config).map_err(|e| TeststackError::Other(e.into()))
        } else {
            toml::to_string_pretty(&self.config).map_err(|e| TeststackError::Other(e.into()))
        }
    }
}

impl Command for ConfigCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        // Show config file path(s)
        let existing = self.paths.all_existing();
        if !existing.is_empty() && !self.args.json {
            for path in &existing {
                ui.message(&format!("# {}", path.display()));
            }
            ui.message("");
        }

        ui.message(&self.render()?);
        Ok(CommandResult::success())
    }
}
