//! Dependency resolution and the top-level run loop.
//!
//! [`Resolver::resolve_step`] decides, for one step, whether its command
//! has to run and what exit code the step contributes. The rules are
//! applied in order and the first one that matches wins:
//!
//! 1. A memoized exit code is returned as is.
//! 2. A step whose check passes contributes `0` without running anything,
//!    including its prerequisites.
//! 3. A step that other steps require is skipped (`0`) when every
//!    dependent that has not resolved yet reports a passing check.
//! 4. Prerequisites are resolved in order. A nonzero sum is returned and
//!    the step's own command does not run.
//! 5. The command list runs and its summed exit code is memoized.
//!
//! [`Resolver::run_commands`] applies this to every step in graph order
//! and adds the results up.

use indexmap::IndexMap;

use crate::error::{Result, TeststackError};
use crate::steps::{ResolvedStep, StepExecutor, StepGraph};

use super::state::ResolutionState;

/// Largest value a process exit status can carry.
pub const MAX_EXIT_CODE: i32 = 255;

/// Map a summed exit code to a process exit status.
///
/// Zero stays zero. Anything else lands in `1..=255` so that a sum like
/// 256 can never be mistaken for success.
pub fn clamp_exit_code(total: i32) -> i32 {
    if total == 0 {
        0
    } else {
        total.clamp(1, MAX_EXIT_CODE)
    }
}

/// Result of resolving a whole graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Final exit code of each step, in graph order.
    pub exit_codes: IndexMap<String, i32>,

    /// Sum of every step's exit code.
    pub total: i32,
}

impl RunOutcome {
    /// Whether every step contributed zero.
    pub fn success(&self) -> bool {
        self.total == 0
    }

    /// The clamped process exit code.
    pub fn exit_code(&self) -> i32 {
        clamp_exit_code(self.total)
    }

    /// Names of steps that contributed a nonzero exit code.
    pub fn failed_steps(&self) -> Vec<&str> {
        self.exit_codes
            .iter()
            .filter(|(_, code)| **code != 0)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Resolves the steps of one graph for one invocation.
pub struct Resolver<'a> {
    pub(super) graph: &'a StepGraph,
    pub(super) executor: StepExecutor<'a>,
    pub(super) state: ResolutionState,
}

impl<'a> Resolver<'a> {
    /// Create a resolver with fresh state.
    pub fn new(graph: &'a StepGraph, executor: StepExecutor<'a>) -> Self {
        Self {
            graph,
            executor,
            state: ResolutionState::new(),
        }
    }

    /// The memoized state so far.
    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    pub(super) fn step(&self, name: &str) -> Result<&'a ResolvedStep> {
        self.graph
            .get(name)
            .ok_or_else(|| TeststackError::UnknownStep {
                step: name.to_string(),
            })
    }

    /// Compute the exit code `name` contributes, running its command if due.
    pub fn resolve_step(&mut self, name: &str) -> Result<i32> {
        let step = self.step(name)?;

        if let Some(code) = self.state.exit_code(name) {
            tracing::debug!("Step '{}' already resolved with {}", name, code);
            return Ok(code);
        }

        self.state
            .enter_resolve(name)
            .map_err(|cycle| TeststackError::CircularDependency {
                cycle: cycle.join(" -> "),
            })?;
        let result = self.resolve_unmemoized(step);
        self.state.leave_resolve(name);
        result
    }

    fn resolve_unmemoized(&mut self, step: &'a ResolvedStep) -> Result<i32> {
        let name = step.name.as_str();

        if step.has_check() && self.evaluate_check(name)? == 0 {
            tracing::debug!("Skipping '{}': check passed", name);
            return Ok(0);
        }

        if step.is_required() {
            let mut needed = false;
            for dependent in &step.required_by {
                if self.state.is_resolved(dependent) {
                    continue;
                }
                if self.evaluate_check(dependent)? == 0 {
                    continue;
                }
                tracing::debug!("Step '{}' is needed by '{}'", name, dependent);
                needed = true;
                break;
            }

            if !needed {
                tracing::debug!("Skipping '{}': no pending dependent needs it", name);
                return Ok(0);
            }
        }

        if !step.requires.is_empty() {
            let mut requires_total: i32 = 0;
            for required in &step.requires {
                requires_total = requires_total.saturating_add(self.resolve_step(required)?);
            }

            if requires_total != 0 {
                tracing::debug!(
                    "Not running '{}': prerequisites exited with {}",
                    name,
                    requires_total
                );
                return Ok(requires_total);
            }
        }

        tracing::info!("Running step '{}'", name);
        let code = self.executor.run(&step.command, step.user.as_deref())?;
        Ok(self.state.record_exit_code(name, code))
    }

    /// Resolve every step in graph order and sum the results.
    ///
    /// Steps already resolved as a prerequisite are visited again and
    /// return their memoized value. A failing step never stops the loop.
    pub fn run_commands(&mut self) -> Result<RunOutcome> {
        let graph = self.graph;
        let mut exit_codes = IndexMap::new();
        let mut total: i32 = 0;

        for name in graph.names() {
            let code = self.resolve_step(name)?;
            let code = self.state.record_exit_code(name, code);
            exit_codes.insert(name.to_string(), code);
            total = total.saturating_add(code);
        }

        tracing::debug!("Run finished with total exit code {}", total);
        Ok(RunOutcome { exit_codes, total })
    }
}

/// Build a resolver and run every step of `graph`.
pub fn run_commands(graph: &StepGraph, executor: StepExecutor<'_>) -> Result<RunOutcome> {
    Resolver::new(graph, executor).run_commands()
}
