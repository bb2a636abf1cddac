//! Per-invocation resolution state.

use std::collections::HashMap;

/// Memoized results for one `run` invocation.
///
/// Each step's command exit code and check exit code are recorded at most
/// once. The in-progress stacks guard against re-entering a step whose
/// resolution or check evaluation has not finished.
#[derive(Debug, Default)]
pub struct ResolutionState {
    exit_codes: HashMap<String, i32>,
    check_exit_codes: HashMap<String, i32>,
    resolving: Vec<String>,
    checking: Vec<String>,
}

impl ResolutionState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The memoized exit code of a step, if resolved.
    pub fn exit_code(&self, step: &str) -> Option<i32> {
        self.exit_codes.get(step).copied()
    }

    /// Whether a step has a memoized exit code.
    pub fn is_resolved(&self, step: &str) -> bool {
        self.exit_codes.contains_key(step)
    }

    /// Record a step's exit code unless one is already set.
    ///
    /// Returns the value that is memoized afterwards.
    pub fn record_exit_code(&mut self, step: &str, code: i32) -> i32 {
        *self.exit_codes.entry(step.to_string()).or_insert(code)
    }

    /// The memoized check exit code of a step, if its check ran.
    pub fn check_exit_code(&self, step: &str) -> Option<i32> {
        self.check_exit_codes.get(step).copied()
    }

    /// Record a step's check exit code unless one is already set.
    pub fn record_check_exit_code(&mut self, step: &str, code: i32) -> i32 {
        *self
            .check_exit_codes
            .entry(step.to_string())
            .or_insert(code)
    }

    /// Mark a step as being resolved.
    ///
    /// Fails with the cycle path if the step is already being resolved.
    pub(crate) fn enter_resolve(&mut self, step: &str) -> Result<(), Vec<String>> {
        enter(&mut self.resolving, step)
    }

    pub(crate) fn leave_resolve(&mut self, step: &str) {
        leave(&mut self.resolving, step);
    }

    /// Mark a step's check as being evaluated.
    ///
    /// Fails with the cycle path if the check is already being evaluated.
    pub(crate) fn enter_check(&mut self, step: &str) -> Result<(), Vec<String>> {
        enter(&mut self.checking, step)
    }

    pub(crate) fn leave_check(&mut self, step: &str) {
        leave(&mut self.checking, step);
    }
}

fn enter(stack: &mut Vec<String>, step: &str) -> Result<(), Vec<String>> {
    if let Some(start) = stack.iter().position(|s| s == step) {
        let mut cycle = stack[start..].to_vec();
        cycle.push(step.to_string());
        return Err(cycle);
    }
    stack.push(step.to_string());
    Ok(())
}

fn leave(stack: &mut Vec<String>, step: &str) {
    if let Some(pos) = stack.iter().rposition(|s| s == step) {
        stack.remove(pos);
    }
}
