//! Docker client.

use std::path::Path;

use indexmap::IndexMap;

use crate::error::{Result, TeststackError};

use super::engine::EngineCli;
use super::{BuildSpec, ContainerRunner, ContainerSpec};

/// Drives the `docker` command line.
#[derive(Debug, Clone)]
pub struct Docker {
    engine: EngineCli,
}

impl Docker {
    pub fn new() -> Self {
        Self {
            engine: EngineCli::new("docker"),
        }
    }
}

impl Default for Docker {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRunner for Docker {
    fn name(&self) -> &str {
        "docker"
    }

    fn run_command(&self, container: &str, command: &str, user: Option<&str>) -> Result<i32> {
        self.engine.run_command(container, command, user)
    }

    fn container_get(&self, name: &str) -> Result<Option<String>> {
        self.engine.container_id(name)
    }

    fn container_image(&self, name: &str) -> Result<Option<String>> {
        self.engine.container_image(name)
    }

    fn image_get(&self, tag: &str) -> Result<Option<String>> {
        self.engine.image_id(tag)
    }

    fn run(&self, spec: &ContainerSpec) -> Result<String> {
        self.engine.run(spec)
    }

    fn start(&self, name: &str) -> Result<()> {
        self.engine.start(name)
    }

    fn status(&self, name: &str) -> Result<String> {
        self.engine.status(name)
    }

    fn ports(&self, name: &str) -> Result<IndexMap<String, String>> {
        self.engine.ports(name)
    }

    fn logs(&self, name: &str) -> Result<String> {
        self.engine.logs(name)
    }

    fn end_container(&self, name: &str) -> Result<()> {
        if self.engine.container_id(name)?.is_none() {
            return Ok(());
        }
        let stopped = self.engine.stop(name)?;
        if !stopped.success {
            return Err(TeststackError::ContainerError {
                name: name.to_string(),
                message: stopped.stderr.trim().to_string(),
            });
        }
        self.engine.remove(name)
    }

    fn build(&self, spec: &BuildSpec) -> Result<i32> {
        self.engine.build(spec)
    }

    fn network_ensure(&self, name: &str) -> Result<()> {
        self.engine.network_ensure(name)
    }

    fn network_prune(&self) -> Result<()> {
        self.engine.network_prune()
    }

    fn exec_shell(&self, container: &str, user: Option<&str>, command: &[String]) -> Result<i32> {
        self.engine.exec_shell(container, user, command)
    }

    fn copy_out(&self, container: &str, src: &str, dest_dir: &Path) -> Result<bool> {
        self.engine.copy_out(container, src, dest_dir)
    }
}
