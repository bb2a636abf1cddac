//! Declarative step definitions.

use serde::Serialize;

/// One named step, normalized from any of the configuration forms.
///
/// Definitions are immutable inputs to [`StepGraph`](super::StepGraph);
/// nothing about a run is recorded on them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    /// Unique key within the steps table.
    pub name: String,

    /// Commands to run in order. Each may contain `{posargs}`.
    pub command: Vec<String>,

    /// Steps that must resolve before this one.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    /// Command whose zero exit status marks the step as done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,

    /// User to run the commands as inside the container.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl StepDefinition {
    /// Create a definition with commands and nothing else.
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            ..Default::default()
        }
    }

    /// Set the prerequisite steps.
    pub fn with_requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = requires.into_iter().map(Into::into).collect();
        self
    }

    /// Set the check command.
    pub fn with_check(mut self, check: impl Into<String>) -> Self {
        self.check = Some(check.into());
        self
    }

    /// Set the executing user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}
