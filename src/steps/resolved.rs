//! Steps annotated with their reverse dependencies.

use serde::Serialize;

use super::definition::StepDefinition;

/// A step as it appears in a built [`StepGraph`](super::StepGraph).
///
/// Carries the definition plus `required_by`, the names of every step in
/// the same graph that lists this one in `requires`, in configuration
/// order. Per-run results live in the resolver, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStep {
    /// Step name.
    pub name: String,

    /// Commands to run.
    pub command: Vec<String>,

    /// Forward edges.
    pub requires: Vec<String>,

    /// Reverse edges.
    pub required_by: Vec<String>,

    /// Gating check command.
    pub check: Option<String>,

    /// Executing user.
    pub user: Option<String>,
}

impl ResolvedStep {
    /// Pair a definition with its computed reverse edges.
    pub fn new(definition: &StepDefinition, required_by: Vec<String>) -> Self {
        Self {
            name: definition.name.clone(),
            command: definition.command.clone(),
            requires: definition.requires.clone(),
            required_by,
            check: definition.check.clone(),
            user: definition.user.clone(),
        }
    }

    /// Whether the step has a check command.
    pub fn has_check(&self) -> bool {
        self.check.is_some()
    }

    /// Whether any step in the graph requires this one.
    pub fn is_required(&self) -> bool {
        !self.required_by.is_empty()
    }
}
