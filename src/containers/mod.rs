//! Container engine clients.
//!
//! The resolver and the CLI commands only talk to a [`ContainerRunner`].
//! Two implementations drive the engine command lines:
//!
//! - [`Docker`] - the `docker` CLI
//! - [`Podman`] - the `podman` CLI, qualifying short image names and
//!   pulling missing images before a run
//!
//! [`MockRunner`] records calls and returns scripted results for tests.
//!
//! # Example
//!
//! ```
//! use teststack::containers::{ContainerRunner, MockRunner};
//!
//! let runner = MockRunner::new();
//! runner.set_exit_code("pytest", 1);
//!
//! assert_eq!(runner.run_command("proj_tests", "pytest", None).unwrap(), 1);
//! assert_eq!(runner.commands(), vec!["pytest"]);
//! ```

pub mod docker;
pub mod engine;
pub mod mock;
pub mod podman;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::config::ClientConfig;
use crate::error::{Result, TeststackError};

pub use docker::Docker;
pub use engine::EngineCli;
pub use mock::{MockRunner, RunCall};
pub use podman::Podman;

/// Status reported for a container that does not exist.
pub const NOT_FOUND_STATUS: &str = "notfound";

/// Status of a container whose main process is up.
pub const RUNNING_STATUS: &str = "running";

/// Main process of the tests container when `[tests].command` is unset.
///
/// Idles until the container is stopped and forwards `TERM` to its
/// process group so `stop` returns promptly.
pub const DEFAULT_TESTS_COMMAND: &str =
    "trap \"trap - TERM; kill -s TERM -- -$$\" TERM; tail -f /dev/null & wait";

/// A host path mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub source: PathBuf,
    pub target: String,
    pub mode: String,
}

/// Everything needed to create and start a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,

    /// Main process, run through `sh -c`; the image default when `None`
    pub command: Option<String>,

    /// `<container-port> = "<host-port>"`; an empty host port lets the engine pick
    pub ports: IndexMap<String, String>,

    pub environment: IndexMap<String, String>,
    pub volumes: Vec<Volume>,

    /// Host directory bound to the image's working directory
    pub mount_cwd: Option<PathBuf>,

    pub network: Option<String>,
    pub hostname: Option<String>,
}

/// An image build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSpec {
    pub dockerfile: PathBuf,
    pub tag: String,
    pub directory: PathBuf,
    pub buildargs: IndexMap<String, String>,

    /// Build secret id to host file
    pub secrets: IndexMap<String, PathBuf>,

    /// Ignore the cache and pull base images
    pub rebuild: bool,

    /// Multi-stage build target
    pub stage: Option<String>,
}

/// The capabilities teststack needs from a container engine.
///
/// Lookups return `Ok(None)` when the object does not exist; `Err` is
/// reserved for the engine itself being unusable or rejecting a request.
pub trait ContainerRunner {
    /// Engine name, as written in `[client].name`.
    fn name(&self) -> &str;

    /// Run `command` in `container` as `user`, streaming its output, and
    /// return its exit status.
    fn run_command(&self, container: &str, command: &str, user: Option<&str>) -> Result<i32>;

    /// Id of the named container.
    fn container_get(&self, name: &str) -> Result<Option<String>>;

    /// Image id the named container was created from.
    fn container_image(&self, name: &str) -> Result<Option<String>>;

    /// Id of the image with `tag`.
    fn image_get(&self, tag: &str) -> Result<Option<String>>;

    /// Create and start a container, returning its id.
    fn run(&self, spec: &ContainerSpec) -> Result<String>;

    /// Start an existing container.
    fn start(&self, name: &str) -> Result<()>;

    /// Engine status of the container, or [`NOT_FOUND_STATUS`].
    fn status(&self, name: &str) -> Result<String>;

    /// Published ports of the container, container port to host port.
    fn ports(&self, name: &str) -> Result<IndexMap<String, String>>;

    /// Logs of the container, or [`NOT_FOUND_STATUS`].
    fn logs(&self, name: &str) -> Result<String>;

    /// Stop and remove the container with its anonymous volumes. A missing
    /// container is not an error.
    fn end_container(&self, name: &str) -> Result<()>;

    /// Build an image, returning the build's exit status.
    fn build(&self, spec: &BuildSpec) -> Result<i32>;

    /// Create the bridge network `name` unless it exists.
    fn network_ensure(&self, name: &str) -> Result<()>;

    /// Remove unused networks.
    fn network_prune(&self) -> Result<()>;

    /// Attach the terminal to `command` (or `bash`) in `container`.
    fn exec_shell(&self, container: &str, user: Option<&str>, command: &[String]) -> Result<i32>;

    /// Copy `src` out of `container` into `dest_dir`.
    ///
    /// A relative `src` is taken from the container's working directory.
    /// Returns `false` when the file could not be retrieved.
    fn copy_out(&self, container: &str, src: &str, dest_dir: &Path) -> Result<bool>;
}

/// Create the runner selected by `[client].name`.
pub fn create_runner(client: &ClientConfig) -> Result<Box<dyn ContainerRunner>> {
    for key in client.options.keys() {
        tracing::debug!("Ignoring [client] option '{}' for {}", key, client.name);
    }

    match client.name.as_str() {
        "docker" => Ok(Box::new(Docker::new())),
        "podman" => Ok(Box::new(Podman::new())),
        other => Err(TeststackError::UnknownClient {
            name: other.to_string(),
        }),
    }
}
