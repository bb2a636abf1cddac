//! Step command execution.
//!
//! The executor knows which container a run targets and which extra
//! arguments were passed on the command line. It runs a step's commands
//! one after another through a [`ContainerRunner`] and adds up their exit
//! codes.

use crate::containers::ContainerRunner;
use crate::error::Result;

/// Placeholder replaced by the invocation's extra arguments.
pub const POSARGS_PLACEHOLDER: &str = "{posargs}";

/// Replace every `{posargs}` in `command` with `posargs` joined by spaces.
///
/// Other braces are left alone, so shell syntax like `${HOME}` survives.
pub fn substitute_posargs(command: &str, posargs: &[String]) -> String {
    command.replace(POSARGS_PLACEHOLDER, &posargs.join(" "))
}

/// Runs step commands inside the tests container.
pub struct StepExecutor<'a> {
    runner: &'a dyn ContainerRunner,
    container: String,
    posargs: Vec<String>,
}

impl<'a> StepExecutor<'a> {
    /// Create an executor targeting `container`.
    pub fn new(
        runner: &'a dyn ContainerRunner,
        container: impl Into<String>,
        posargs: Vec<String>,
    ) -> Self {
        Self {
            runner,
            container: container.into(),
            posargs,
        }
    }

    /// The container commands run in.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Run every command in order and sum the exit codes.
    ///
    /// A failing command does not stop the ones after it.
    pub fn run(&self, commands: &[String], user: Option<&str>) -> Result<i32> {
        let mut total: i32 = 0;
        for command in commands {
            total = total.saturating_add(self.run_one(command, user)?);
        }
        Ok(total)
    }

    /// Run a single command.
    pub fn run_one(&self, command: &str, user: Option<&str>) -> Result<i32> {
        let command = substitute_posargs(command, &self.posargs);
        tracing::debug!(
            "Executing in {} as {}: {}",
            self.container,
            user.unwrap_or("<default>"),
            command
        );
        let code = self.runner.run_command(&self.container, &command, user)?;
        tracing::debug!("Exit code {} from: {}", code, command);
        Ok(code)
    }
}
