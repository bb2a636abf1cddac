//! Podman client.
//!
//! Podman resolves short image names against its configured search
//! registries, which may prompt or fail. Images are pulled with a fully
//! qualified name before a container is created from them.

use std::path::Path;

use indexmap::IndexMap;

use crate::error::{Result, TeststackError};

use super::engine::EngineCli;
use super::{BuildSpec, ContainerRunner, ContainerSpec};

/// Registry used for unqualified image names.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Prefix `image` with [`DEFAULT_REGISTRY`] unless it already names a registry.
///
/// The first path component names a registry when it contains a `.` or a
/// `:`, or is `localhost`.
pub fn qualify_image(image: &str) -> String {
    if let Some((first, _)) = image.split_once('/') {
        if first.contains('.') || first.contains(':') || first == "localhost" {
            return image.to_string();
        }
    }
    format!("{}/{}", DEFAULT_REGISTRY, image)
}

/// Drives the `podman` command line.
#[derive(Debug, Clone)]
pub struct Podman {
    engine: EngineCli,
}

impl Podman {
    pub fn new() -> Self {
        Self {
            engine: EngineCli::new("podman"),
        }
    }

    fn pull(&self, image: &str) -> Result<()> {
        let qualified = qualify_image(image);
        tracing::info!("Pulling {}", qualified);
        self.engine
            .checked(image, &["pull".to_string(), qualified])
            .map(|_| ())
    }
}

impl Default for Podman {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRunner for Podman {
    fn name(&self) -> &str {
        "podman"
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
        if self.engine.image_id(&spec.image)?.is_none() {
            self.pull(&spec.image)?;
        }

        let id = self.engine.run(spec)?;
        if self.engine.status(&spec.name)? != super::RUNNING_STATUS {
            return Err(TeststackError::ContainerError {
                name: spec.name.clone(),
                message: "container is not running after start".to_string(),
            });
        }
        Ok(id)
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

    // A container that fails to stop is still removed.
    fn end_container(&self, name: &str) -> Result<()> {
        if self.engine.container_id(name)?.is_none() {
            return Ok(());
        }
        let stopped = self.engine.stop(name)?;
        if !stopped.success {
            tracing::debug!("Ignoring stop failure for {}: {}", name, stopped.stderr.trim());
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
