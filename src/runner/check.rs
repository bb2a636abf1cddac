//! Check evaluation.
//!
//! A check is a shell command whose zero exit status means a step's work
//! is already done. A step that other steps require first asks its
//! dependents: only the *last* dependent's result is kept, and if that is
//! `0` the step counts as satisfied without its own check running.

use crate::error::{Result, TeststackError};
use crate::steps::ResolvedStep;

use super::resolver::Resolver;

/// Returned when there is no check to consult.
pub const NO_CHECK: i32 = 1;

impl Resolver<'_> {
    /// Evaluate the check of `name`, memoizing the exit code of a check
    /// command that actually ran.
    pub fn evaluate_check(&mut self, name: &str) -> Result<i32> {
        let step = self.step(name)?;

        if let Some(code) = self.state.check_exit_code(name) {
            tracing::debug!("Check for '{}' already evaluated: {}", name, code);
            return Ok(code);
        }

        self.state
            .enter_check(name)
            .map_err(|cycle| TeststackError::CircularDependency {
                cycle: cycle.join(" -> "),
            })?;

        let result = self.check_unmemoized(step);
        self.state.leave_check(name);
        result
    }

    fn check_unmemoized(&mut self, step: &ResolvedStep) -> Result<i32> {
        let name = step.name.as_str();

        if step.is_required() {
            let mut last = NO_CHECK;
            for dependent in &step.required_by {
                last = self.evaluate_check(dependent)?;
            }
            if last == 0 {
                tracing::debug!("Check for '{}' satisfied by its dependents", name);
                return Ok(0);
            }
        }

        match &step.check {
            Some(check) => {
                let code = self.executor.run_one(check, step.user.as_deref())?;
                tracing::debug!("Check for '{}' exited with {}", name, code);
                Ok(self.state.record_check_exit_code(name, code))
            }
            None => Ok(NO_CHECK),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::MockRunner;
    use crate::steps::{StepDefinition, StepExecutor, StepGraph};

    fn cmd(name: &str) -> StepDefinition {
        StepDefinition::new(name, vec![format!("run-{}", name)])
    }

    #[test]
    fn no_check_returns_sentinel() {
        let runner = MockRunner::new();
        let g = StepGraph::builder().add_step(cmd("tests")).build().unwrap();
        let mut resolver = Resolver::new(&g, StepExecutor::new(&runner, "c", Vec::new()));

        assert_eq!(resolver.evaluate_check("tests").unwrap(), NO_CHECK);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn check_runs_at_most_once() {
        let runner = MockRunner::new();
        runner.set_exit_code("test -f .done", 1);
        let g = StepGraph::builder()
            .add_step(cmd("install").with_check("test -f .done"))
            .build()
            .unwrap();
        let mut resolver = Resolver::new(&g, StepExecutor::new(&runner, "c", Vec::new()));

        assert_eq!(resolver.evaluate_check("install").unwrap(), 1);
        assert_eq!(resolver.evaluate_check("install").unwrap(), 1);
        assert_eq!(runner.count("test -f .done"), 1);
    }

    #[test]
    fn check_runs_as_step_user_with_posargs() {
        let runner = MockRunner::new();
        let g = StepGraph::builder()
            .add_step(
                cmd("install")
                    .with_check("test -f {posargs}")
                    .with_user("app"),
            )
            .build()
            .unwrap();
        let executor = StepExecutor::new(&runner, "c", vec!["flag".to_string()]);
        let mut resolver = Resolver::new(&g, executor);

        resolver.evaluate_check("install").unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].command, "test -f flag");
        assert_eq!(calls[0].user.as_deref(), Some("app"));
    }

    #[test]
    fn failing_last_dependent_falls_through_to_own_check() {
        let runner = MockRunner::new();
        runner.set_exit_code("check-b", 1);
        let g = StepGraph::builder()
            .add_step(cmd("install").with_check("check-install"))
            .add_step(cmd("a").with_requires(["install"]).with_check("check-a"))
            .add_step(cmd("b").with_requires(["install"]).with_check("check-b"))
            .build()
            .unwrap();
        let mut resolver = Resolver::new(&g, StepExecutor::new(&runner, "c", Vec::new()));

        // check-a passes but check-b, evaluated last, fails
        assert_eq!(resolver.evaluate_check("install").unwrap(), 0);
        assert_eq!(
            runner.commands(),
            vec!["check-a", "check-b", "check-install"]
        );
        assert_eq!(resolver.state().check_exit_code("install"), Some(0));
    }

    #[test]
    fn dependent_without_check_falls_through_to_sentinel() {
        let runner = MockRunner::new();
        let g = StepGraph::builder()
            .add_step(cmd("install"))
            .add_step(cmd("tests").with_requires(["install"]))
            .build()
            .unwrap();
        let mut resolver = Resolver::new(&g, StepExecutor::new(&runner, "c", Vec::new()));

        assert_eq!(resolver.evaluate_check("install").unwrap(), NO_CHECK);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn transitive_dependents_are_consulted() {
        let runner = MockRunner::new();
        let g = StepGraph::builder()
            .add_step(cmd("deps"))
            .add_step(cmd("install").with_requires(["deps"]))
            .add_step(cmd("tests").with_requires(["install"]).with_check("check-tests"))
            .build()
            .unwrap();
        let mut resolver = Resolver::new(&g, StepExecutor::new(&runner, "c", Vec::new()));

        assert_eq!(resolver.evaluate_check("deps").unwrap(), 0);
        assert_eq!(runner.commands(), vec!["check-tests"]);
    }
}
