//! Recording container runner for tests.
//!
//! `MockRunner` implements [`ContainerRunner`] without an engine. Step
//! commands succeed unless an exit code was scripted for them, and every
//! call is recorded for later assertion. Containers and images live in
//! in-memory maps, so a `run` or `build` is visible to later lookups.
//! Clones share their state, so a test can hand one clone to the code
//! under test and assert on another.

use std::cell::RefCell;
use std::rc::Rc;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;

use crate::error::Result;

use super::{BuildSpec, ContainerRunner, ContainerSpec, NOT_FOUND_STATUS, RUNNING_STATUS};

/// One `run_command` or `exec_shell` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCall {
    pub container: String,
    pub command: String,
    pub user: Option<String>,
}

#[derive(Debug, Clone)]
struct MockContainer {
    id: String,
    image: String,
    status: String,
}

#[derive(Debug, Default)]
struct MockState {
    exit_codes: HashMap<String, i32>,
    calls: Vec<RunCall>,
    containers: IndexMap<String, MockContainer>,
    images: HashMap<String, String>,
    runs: Vec<ContainerSpec>,
    builds: Vec<BuildSpec>,
    ended: Vec<String>,
    networks: Vec<String>,
    copies: Vec<String>,
    missing_files: HashSet<String>,
    failing_builds: bool,
    start_status: Option<String>,
}

/// Mock container runner for testing.
#[derive(Debug, Default, Clone)]
pub struct MockRunner {
    state: Rc<RefCell<MockState>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `command` exit with `code`. Unscripted commands exit with 0.
    pub fn set_exit_code(&self, command: &str, code: i32) {
        self.state
            .borrow_mut()
            .exit_codes
            .insert(command.to_string(), code);
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<RunCall> {
        self.state.borrow().calls.clone()
    }

    /// The commands of every recorded call, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .map(|c| c.command.clone())
            .collect()
    }

    /// How many times `command` ran.
    pub fn count(&self, command: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.command == command)
            .count()
    }

    /// Register an existing image.
    pub fn add_image(&self, tag: &str, id: &str) {
        self.state
            .borrow_mut()
            .images
            .insert(tag.to_string(), id.to_string());
    }

    /// Register an existing container.
    pub fn add_container(&self, name: &str, image_id: &str, status: &str) {
        self.state.borrow_mut().containers.insert(
            name.to_string(),
            MockContainer {
                id: format!("{}-id", name),
                image: image_id.to_string(),
                status: status.to_string(),
            },
        );
    }

    /// Make `copy_out` of `src` fail.
    pub fn set_missing_file(&self, src: &str) {
        self.state
            .borrow_mut()
            .missing_files
            .insert(src.to_string());
    }

    /// Make builds exit nonzero without producing an image.
    pub fn set_failing_builds(&self) {
        self.state.borrow_mut().failing_builds = true;
    }

    /// Status given to containers created by `run` or `start`.
    pub fn set_start_status(&self, status: &str) {
        self.state.borrow_mut().start_status = Some(status.to_string());
    }

    /// Specs passed to `run`.
    pub fn runs(&self) -> Vec<ContainerSpec> {
        self.state.borrow().runs.clone()
    }

    /// Specs passed to `build`.
    pub fn builds(&self) -> Vec<BuildSpec> {
        self.state.borrow().builds.clone()
    }

    /// Containers passed to `end_container`.
    pub fn ended(&self) -> Vec<String> {
        self.state.borrow().ended.clone()
    }

    /// Networks ensured directly or by `run`.
    pub fn networks(&self) -> Vec<String> {
        self.state.borrow().networks.clone()
    }

    /// Sources passed to `copy_out`.
    pub fn copies(&self) -> Vec<String> {
        self.state.borrow().copies.clone()
    }

    fn record(&self, container: &str, command: &str, user: Option<&str>) -> i32 {
        let mut state = self.state.borrow_mut();
        state.calls.push(RunCall {
            container: container.to_string(),
            command: command.to_string(),
            user: user.map(str::to_string),
        });
        state.exit_codes.get(command).copied().unwrap_or(0)
    }

    fn start_status(&self) -> String {
        self.state
            .borrow()
            .start_status
            .clone()
            .unwrap_or_else(|| RUNNING_STATUS.to_string())
    }
}

impl ContainerRunner for MockRunner {
    fn name(&self) -> &str {
        "mock"
    }

    fn run_command(&self, container: &str, command: &str, user: Option<&str>) -> Result<i32> {
        Ok(self.record(container, command, user))
    }

    fn container_get(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .state
            .borrow()
            .containers
            .get(name)
            .map(|c| c.id.clone()))
    }

    fn container_image(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .state
            .borrow()
            .containers
            .get(name)
            .map(|c| c.image.clone()))
    }

    fn image_get(&self, tag: &str) -> Result<Option<String>> {
        Ok(self.state.borrow().images.get(tag).cloned())
    }

    fn run(&self, spec: &ContainerSpec) -> Result<String> {
        let status = self.start_status();
        let mut state = self.state.borrow_mut();
        let image = state
            .images
            .get(&spec.image)
            .cloned()
            .unwrap_or_else(|| spec.image.clone());
        let id = format!("{}-id", spec.name);
        state.containers.insert(
            spec.name.clone(),
            MockContainer {
                id: id.clone(),
                image,
                status,
            },
        );
        if let Some(network) = &spec.network {
            if !state.networks.contains(network) {
                state.networks.push(network.clone());
            }
        }
        state.runs.push(spec.clone());
        Ok(id)
    }

    fn start(&self, name: &str) -> Result<()> {
        let status = self.start_status();
        if let Some(container) = self.state.borrow_mut().containers.get_mut(name) {
            container.status = status;
        }
        Ok(())
    }

    fn status(&self, name: &str) -> Result<String> {
        Ok(self
            .state
            .borrow()
            .containers
            .get(name)
            .map(|c| c.status.clone())
            .unwrap_or_else(|| NOT_FOUND_STATUS.to_string()))
    }

    fn ports(&self, _name: &str) -> Result<IndexMap<String, String>> {
        Ok(IndexMap::new())
    }

    fn logs(&self, name: &str) -> Result<String> {
        if self.state.borrow().containers.contains_key(name) {
            Ok(String::new())
        } else {
            Ok(NOT_FOUND_STATUS.to_string())
        }
    }

    fn end_container(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.containers.shift_remove(name);
        state.ended.push(name.to_string());
        Ok(())
    }

    fn build(&self, spec: &BuildSpec) -> Result<i32> {
        let mut state = self.state.borrow_mut();
        state.builds.push(spec.clone());
        if state.failing_builds {
            return Ok(1);
        }
        let id = format!("sha256:{}", spec.tag);
        state.images.insert(spec.tag.clone(), id);
        Ok(0)
    }

    fn network_ensure(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.networks.iter().any(|n| n == name) {
            state.networks.push(name.to_string());
        }
        Ok(())
    }

    fn network_prune(&self) -> Result<()> {
        Ok(())
    }

    fn exec_shell(&self, container: &str, user: Option<&str>, command: &[String]) -> Result<i32> {
        let command = if command.is_empty() {
            "bash".to_string()
        } else {
            command.join(" ")
        };
        Ok(self.record(container, &command, user))
    }

    fn copy_out(&self, _container: &str, src: &str, _dest_dir: &Path) -> Result<bool> {
        let mut state = self.state.borrow_mut();
        state.copies.push(src.to_string());
        Ok(!state.missing_files.contains(src))
    }
}
