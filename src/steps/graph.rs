//! Step graph construction.
//!
//! Converts an ordered set of [`StepDefinition`]s into a [`StepGraph`]
//! whose nodes know both their forward (`requires`) and reverse
//! (`required_by`) edges. Building validates references and rejects
//! dependency cycles before anything runs.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{Result, TeststackError};

use super::definition::StepDefinition;
use super::resolved::ResolvedStep;

/// An immutable, validated graph of steps in configuration order.
#[derive(Debug, Clone, Default)]
pub struct StepGraph {
    steps: IndexMap<String, ResolvedStep>,
}

impl StepGraph {
    /// Create a new step graph builder.
    pub fn builder() -> StepGraphBuilder {
        StepGraphBuilder::new()
    }

    /// Build a graph over every definition.
    pub fn from_definitions(definitions: &IndexMap<String, StepDefinition>) -> Result<Self> {
        Self::builder()
            .add_steps(definitions.values().cloned())
            .build()
    }

    /// Build the graph for one `run` invocation.
    ///
    /// With `step`, the graph holds that step followed by the steps it
    /// directly requires. Their own prerequisites are not pulled in.
    pub fn for_run(
        definitions: &IndexMap<String, StepDefinition>,
        step: Option<&str>,
    ) -> Result<Self> {
        let selected = select_steps(definitions, step)?;
        Self::from_definitions(&selected)
    }

    /// Look up a step by name.
    pub fn get(&self, name: &str) -> Option<&ResolvedStep> {
        self.steps.get(name)
    }

    /// Check if a step exists in the graph.
    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Step names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    /// Steps in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedStep> {
        self.steps.values()
    }

    /// Get the number of steps in the graph.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Find a `requires` cycle, returning the path if one exists.
    ///
    /// The path starts and ends with the same step, e.g.
    /// `["a", "b", "a"]`.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        fn dfs<'a>(
            node: &'a str,
            graph: &'a StepGraph,
            state: &mut HashMap<&'a str, State>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            state.insert(node, State::Visiting);
            path.push(node);

            if let Some(step) = graph.steps.get(node) {
                for dep in &step.requires {
                    match state.get(dep.as_str()) {
                        Some(State::Visiting) => {
                            let start = path.iter().position(|s| *s == dep.as_str())?;
                            let mut cycle: Vec<String> =
                                path[start..].iter().map(|s| s.to_string()).collect();
                            cycle.push(dep.clone());
                            return Some(cycle);
                        }
                        Some(State::Unvisited) => {
                            if let Some(cycle) = dfs(dep, graph, state, path) {
                                return Some(cycle);
                            }
                        }
                        Some(State::Visited) | None => {}
                    }
                }
            }

            path.pop();
            state.insert(node, State::Visited);
            None
        }

        let mut state: HashMap<&str, State> = self
            .steps
            .keys()
            .map(|s| (s.as_str(), State::Unvisited))
            .collect();
        let mut path = Vec::new();

        for name in self.steps.keys() {
            if state.get(name.as_str()) == Some(&State::Unvisited) {
                if let Some(cycle) = dfs(name, self, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }
}

/// Select the definitions a `run` invocation operates on.
///
/// `None` keeps everything. `Some(step)` keeps the step itself first,
/// then each step it directly requires, in `requires` order.
///
/// A selected step whose own `requires` reach outside the selection is a
/// configuration error.
pub fn select_steps(
    definitions: &IndexMap<String, StepDefinition>,
    step: Option<&str>,
) -> Result<IndexMap<String, StepDefinition>> {
    let Some(name) = step else {
        return Ok(definitions.clone());
    };

    let requested = definitions
        .get(name)
        .ok_or_else(|| TeststackError::UnknownStep {
            step: name.to_string(),
        })?;

    let mut selected = IndexMap::new();
    selected.insert(name.to_string(), requested.clone());

    for required in &requested.requires {
        let def = definitions
            .get(required)
            .ok_or_else(|| TeststackError::ConfigValidationError {
                message: format!("Step '{}' requires unknown step '{}'", name, required),
            })?;
        selected
            .entry(required.clone())
            .or_insert_with(|| def.clone());
    }

    for (step_name, def) in &selected {
        if let Some(missing) = def.requires.iter().find(|r| !selected.contains_key(*r)) {
            return Err(TeststackError::ConfigValidationError {
                message: format!(
                    "Step '{}' requires '{}', which --step {} does not include",
                    step_name, missing, name
                ),
            });
        }
    }

    tracing::debug!(
        "Selected steps for '{}': {:?}",
        name,
        selected.keys().collect::<Vec<_>>()
    );
    Ok(selected)
}

/// Builder for constructing a [`StepGraph`].
#[derive(Debug, Default)]
pub struct StepGraphBuilder {
    steps: IndexMap<String, StepDefinition>,
}

impl StepGraphBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step. A later step with the same name replaces the earlier
    /// one but keeps its position.
    pub fn add_step(mut self, definition: StepDefinition) -> Self {
        self.steps.insert(definition.name.clone(), definition);
        self
    }

    /// Add several steps in order.
    pub fn add_steps(mut self, definitions: impl IntoIterator<Item = StepDefinition>) -> Self {
        for definition in definitions {
            self = self.add_step(definition);
        }
        self
    }

    /// Build the graph.
    ///
    /// Returns an error if any `requires` entry references a step outside
    /// the graph, or if the `requires` edges form a cycle.
    pub fn build(self) -> Result<StepGraph> {
        for (name, def) in &self.steps {
            for required in &def.requires {
                if !self.steps.contains_key(required) {
                    return Err(TeststackError::ConfigValidationError {
                        message: format!("Step '{}' requires unknown step '{}'", name, required),
                    });
                }
            }
        }

        let mut required_by: HashMap<&str, Vec<String>> = HashMap::new();
        for (name, def) in &self.steps {
            for required in &def.requires {
                let dependents = required_by.entry(required.as_str()).or_default();
                if !dependents.contains(name) {
                    dependents.push(name.clone());
                }
            }
        }

        let steps: IndexMap<String, ResolvedStep> = self
            .steps
            .iter()
            .map(|(name, def)| {
                let dependents = required_by.remove(name.as_str()).unwrap_or_default();
                (name.clone(), ResolvedStep::new(def, dependents))
            })
            .collect();

        let graph = StepGraph { steps };
        if let Some(cycle) = graph.find_cycle() {
            return Err(TeststackError::CircularDependency {
                cycle: cycle.join(" -> "),
            });
        }

        Ok(graph)
    }
}
