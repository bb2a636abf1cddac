//! Integration tests for step resolution through the public API.

use indexmap::IndexMap;
use teststack::containers::MockRunner;
use teststack::runner::{run_commands, Resolver};
use teststack::steps::{StepDefinition, StepExecutor, StepGraph};
use teststack::TeststackError;

fn step(name: &str, command: &str) -> StepDefinition {
    StepDefinition::new(name, vec![command.to_string()])
}

fn definitions(steps: Vec<StepDefinition>) -> IndexMap<String, StepDefinition> {
    steps.into_iter().map(|s| (s.name.clone(), s)).collect()
}

fn install_and_test() -> IndexMap<String, StepDefinition> {
    definitions(vec![
        step("install", "pip install ."),
        step("test", "pytest").with_requires(["install"]),
    ])
}

#[test]
fn independent_step_runs_once_and_sums_lines() {
    let runner = MockRunner::new();
    runner.set_exit_code("lint-a", 1);
    runner.set_exit_code("lint-b", 2);
    let graph = StepGraph::builder()
        .add_step(StepDefinition::new(
            "lint",
            vec!["lint-a".to_string(), "lint-b".to_string()],
        ))
        .build()
        .unwrap();
    let mut resolver = Resolver::new(&graph, StepExecutor::new(&runner, "c", Vec::new()));

    assert_eq!(resolver.resolve_step("lint").unwrap(), 3);
    assert_eq!(resolver.resolve_step("lint").unwrap(), 3);
    assert_eq!(runner.count("lint-a"), 1);
}

#[test]
fn install_runs_before_test() {
    let runner = MockRunner::new();
    let graph = StepGraph::from_definitions(&install_and_test()).unwrap();

    let outcome = run_commands(&graph, StepExecutor::new(&runner, "c", Vec::new())).unwrap();

    assert!(outcome.success());
    assert_eq!(runner.commands(), vec!["pip install .", "pytest"]);
}

#[test]
fn failed_install_keeps_test_from_running() {
    let runner = MockRunner::new();
    runner.set_exit_code("pip install .", 1);
    let graph = StepGraph::from_definitions(&install_and_test()).unwrap();

    let outcome = run_commands(&graph, StepExecutor::new(&runner, "c", Vec::new())).unwrap();

    assert!(outcome.total >= 1);
    assert_eq!(runner.count("pytest"), 0);
    assert_eq!(outcome.failed_steps(), vec!["install", "test"]);
}

#[test]
fn single_step_selection_keeps_direct_requirements() {
    let runner = MockRunner::new();
    let graph = StepGraph::for_run(&install_and_test(), Some("test")).unwrap();

    let names: Vec<_> = graph.names().collect();
    assert_eq!(names, vec!["test", "install"]);

    run_commands(&graph, StepExecutor::new(&runner, "c", Vec::new())).unwrap();
    assert_eq!(runner.commands(), vec!["pip install .", "pytest"]);
}

#[test]
fn unknown_step_selection_is_reported() {
    let err = StepGraph::for_run(&install_and_test(), Some("doesnotexist"))
        .err()
        .unwrap();

    assert!(matches!(err, TeststackError::UnknownStep { .. }));
    assert_eq!(err.to_string(), "doesnotexist is not an available step");
}

#[test]
fn check_gated_step_follows_its_flag() {
    let defs = definitions(vec![
        step("install", "pip install . && touch .installed").with_check("test -f .installed"),
    ]);
    let graph = StepGraph::from_definitions(&defs).unwrap();

    // flag present
    let runner = MockRunner::new();
    runner.set_exit_code("test -f .installed", 0);
    run_commands(&graph, StepExecutor::new(&runner, "c", Vec::new())).unwrap();
    assert_eq!(runner.commands(), vec!["test -f .installed"]);

    // flag removed
    let runner = MockRunner::new();
    runner.set_exit_code("test -f .installed", 1);
    run_commands(&graph, StepExecutor::new(&runner, "c", Vec::new())).unwrap();
    assert_eq!(
        runner.commands(),
        vec!["test -f .installed", "pip install . && touch .installed"]
    );
}

#[test]
fn posargs_reach_step_commands() {
    let runner = MockRunner::new();
    let defs = definitions(vec![step("tests", "pytest {posargs}")]);
    let graph = StepGraph::from_definitions(&defs).unwrap();
    let posargs = vec!["-k".to_string(), "test_x".to_string()];

    run_commands(&graph, StepExecutor::new(&runner, "c", posargs)).unwrap();

    assert_eq!(runner.commands(), vec!["pytest -k test_x"]);
}

#[test]
fn cyclic_requires_name_the_cycle() {
    let defs = definitions(vec![
        step("a", "echo a").with_requires(["b"]),
        step("b", "echo b").with_requires(["a"]),
    ]);

    let err = StepGraph::from_definitions(&defs).err().unwrap();

    match err {
        TeststackError::CircularDependency { cycle } => {
            assert!(cycle.contains('a'));
            assert!(cycle.contains('b'));
        }
        other => panic!("expected a cycle error, got {:?}", other),
    }
}
