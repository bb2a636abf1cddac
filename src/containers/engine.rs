//! Command-line driver shared by the engine clients.
//!
//! `docker` and `podman` accept the same subcommands for everything
//! teststack does, so [`EngineCli`] holds the program name and turns each
//! operation into an argument vector. The argument builders are free
//! functions so they can be tested without an engine installed.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{Result, TeststackError};
use crate::shell::{self, CommandResult};

use super::{BuildSpec, ContainerSpec, NOT_FOUND_STATUS};

/// Shell used for commands run inside containers.
const CONTAINER_SHELL: &str = "sh";

/// Program started by `exec` when no command is given.
const DEFAULT_EXEC_SHELL: &str = "bash";

/// An engine reachable through its command line.
#[derive(Debug, Clone)]
pub struct EngineCli {
    program: String,
}

impl EngineCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The engine executable.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run with output captured.
    pub fn capture(&self, args: &[String]) -> Result<CommandResult> {
        shell::execute_quiet(&self.program, args, None)
    }

    /// Run with the terminal attached, returning the exit code.
    pub fn attached(&self, args: &[String]) -> Result<i32> {
        shell::execute_interactive(&self.program, args, &HashMap::new())
    }

    /// Run with output captured, turning a nonzero exit into an error.
    pub fn checked(&self, name: &str, args: &[String]) -> Result<CommandResult> {
        let result = self.capture(args)?;
        if result.success {
            Ok(result)
        } else {
            Err(TeststackError::ContainerError {
                name: name.to_string(),
                message: failure_message(&result),
            })
        }
    }

    /// Read one field of an engine object with a Go template.
    ///
    /// `kind` is `container`, `image` or `network`. A missing object yields
    /// `None`.
    pub fn inspect(&self, kind: &str, name: &str, format: &str) -> Result<Option<String>> {
        let args = vec![
            kind.to_string(),
            "inspect".to_string(),
            format!("--format={}", format),
            name.to_string(),
        ];
        Ok(self.capture(&args)?.trimmed_stdout())
    }

    pub fn container_id(&self, name: &str) -> Result<Option<String>> {
        self.inspect("container", name, "{{.Id}}")
    }

    pub fn container_image(&self, name: &str) -> Result<Option<String>> {
        self.inspect("container", name, "{{.Image}}")
    }

    pub fn image_id(&self, tag: &str) -> Result<Option<String>> {
        self.inspect("image", tag, "{{.Id}}")
    }

    /// Working directory baked into an image.
    pub fn image_workdir(&self, image: &str) -> Result<Option<String>> {
        self.inspect("image", image, "{{.Config.WorkingDir}}")
    }

    /// Working directory of a container.
    pub fn container_workdir(&self, name: &str) -> Result<Option<String>> {
        self.inspect("container", name, "{{.Config.WorkingDir}}")
    }

    pub fn status(&self, name: &str) -> Result<String> {
        Ok(self
            .inspect("container", name, "{{.State.Status}}")?
            .unwrap_or_else(|| NOT_FOUND_STATUS.to_string()))
    }

    pub fn ports(&self, name: &str) -> Result<IndexMap<String, String>> {
        match self.inspect("container", name, "{{json .NetworkSettings.Ports}}")? {
            Some(json) => Ok(parse_ports(&json)),
            None => Ok(IndexMap::new()),
        }
    }

    pub fn logs(&self, name: &str) -> Result<String> {
        let result = self.capture(&["logs".to_string(), name.to_string()])?;
        if !result.success {
            return Ok(NOT_FOUND_STATUS.to_string());
        }
        Ok(format!("{}{}", result.stdout, result.stderr))
    }

    pub fn start(&self, name: &str) -> Result<()> {
        tracing::info!("Starting existing container {}", name);
        self.checked(name, &["start".to_string(), name.to_string()])
            .map(|_| ())
    }

    pub fn stop(&self, name: &str) -> Result<CommandResult> {
        tracing::info!("Stopping container {}", name);
        self.capture(&["stop".to_string(), name.to_string()])
    }

    /// Remove a container together with its anonymous volumes.
    pub fn remove(&self, name: &str) -> Result<()> {
        let args = vec![
            "rm".to_string(),
            "--force".to_string(),
            "--volumes".to_string(),
            name.to_string(),
        ];
        self.checked(name, &args).map(|_| ())
    }

    pub fn network_ensure(&self, name: &str) -> Result<()> {
        if self.inspect("network", name, "{{.Id}}")?.is_some() {
            return Ok(());
        }
        tracing::info!("Creating network {}", name);
        let args = vec![
            "network".to_string(),
            "create".to_string(),
            "--driver=bridge".to_string(),
            name.to_string(),
        ];
        self.checked(name, &args).map(|_| ())
    }

    pub fn network_prune(&self) -> Result<()> {
        let args = vec![
            "network".to_string(),
            "prune".to_string(),
            "--force".to_string(),
        ];
        let result = self.capture(&args)?;
        if !result.success {
            tracing::warn!("Network prune failed: {}", failure_message(&result));
        }
        Ok(())
    }

    /// Create and start a container, returning its id.
    pub fn run(&self, spec: &ContainerSpec) -> Result<String> {
        if let Some(network) = &spec.network {
            self.network_ensure(network)?;
        }

        let workdir = match &spec.mount_cwd {
            Some(_) => self.image_workdir(&spec.image)?,
            None => None,
        };
        if spec.mount_cwd.is_some() && workdir.is_none() {
            tracing::warn!(
                "Image {} has no working directory; not mounting the project",
                spec.image
            );
        }

        tracing::info!("Running container {} from {}", spec.name, spec.image);
        let result = self.checked(&spec.name, &run_args(spec, workdir.as_deref()))?;
        Ok(result.stdout.trim().to_string())
    }

    pub fn build(&self, spec: &BuildSpec) -> Result<i32> {
        tracing::info!("Building {} from {}", spec.tag, spec.directory.display());
        self.attached(&build_args(spec))
    }

    /// Run a step command, logging it first.
    pub fn run_command(&self, container: &str, command: &str, user: Option<&str>) -> Result<i32> {
        tracing::info!("Run Command: {}", command);
        let args = exec_args(
            container,
            command,
            user,
            shell::stdin_is_terminal(),
            shell::terminal_size(),
        );
        self.attached(&args)
    }

    pub fn exec_shell(&self, container: &str, user: Option<&str>, command: &[String]) -> Result<i32> {
        self.attached(&shell_args(container, user, command))
    }

    pub fn copy_out(&self, container: &str, src: &str, dest_dir: &Path) -> Result<bool> {
        let source = if src.starts_with('/') {
            src.to_string()
        } else {
            let workdir = self.container_workdir(container)?.unwrap_or_default();
            container_path(&workdir, src)
        };

        let file_name = Path::new(src)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| src.into());
        let dest = dest_dir.join(file_name);

        let args = vec![
            "cp".to_string(),
            format!("{}:{}", container, source),
            dest.to_string_lossy().to_string(),
        ];
        let result = self.capture(&args)?;
        if !result.success {
            tracing::debug!("Copy of {} failed: {}", source, failure_message(&result));
        }
        Ok(result.success)
    }
}

fn failure_message(result: &CommandResult) -> String {
    let stderr = result.stderr.trim();
    if stderr.is_empty() {
        format!("engine exited with {}", result.code())
    } else {
        stderr.to_string()
    }
}

/// Join a relative path onto a container working directory.
pub fn container_path(workdir: &str, src: &str) -> String {
    format!("{}/{}", workdir.trim_end_matches('/'), src)
}

/// Arguments for `run`.
pub fn run_args(spec: &ContainerSpec, workdir: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--detach".to_string(),
        format!("--name={}", spec.name),
    ];

    if let Some(network) = &spec.network {
        args.push(format!("--network={}", network));
    }
    if let Some(hostname) = &spec.hostname {
        args.push(format!("--hostname={}", hostname));
    }

    for (port, host_port) in &spec.ports {
        if host_port.is_empty() {
            args.push(format!("--publish={}", port));
        } else {
            args.push(format!("--publish={}:{}", host_port, port));
        }
    }

    for (key, value) in &spec.environment {
        args.push(format!("--env={}={}", key, value));
    }

    for volume in &spec.volumes {
        args.push(format!(
            "--volume={}:{}:{}",
            volume.source.display(),
            volume.target,
            volume.mode
        ));
    }

    if let (Some(cwd), Some(workdir)) = (&spec.mount_cwd, workdir) {
        args.push(format!("--volume={}:{}:rw", cwd.display(), workdir));
    }

    args.push(spec.image.clone());

    if let Some(command) = &spec.command {
        args.push(CONTAINER_SHELL.to_string());
        args.push("-c".to_string());
        args.push(command.clone());
    }

    args
}

/// Arguments for `build`.
pub fn build_args(spec: &BuildSpec) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        format!("--file={}", spec.dockerfile.display()),
        format!("--tag={}", spec.tag),
        "--rm".to_string(),
    ];

    for (key, value) in &spec.buildargs {
        args.push(format!("--build-arg={}={}", key, value));
    }

    if spec.rebuild {
        args.push("--no-cache".to_string());
        args.push("--pull".to_string());
    }

    for (id, source) in &spec.secrets {
        args.push(format!("--secret=id={},source={}", id, source.display()));
    }

    if let Some(stage) = &spec.stage {
        args.push(format!("--target={}", stage));
    }

    args.push(spec.directory.display().to_string());
    args
}

/// Arguments for `exec` of a step command.
///
/// A TTY is requested only when stdin is a terminal; the terminal size is
/// passed through `COLUMNS` and `LINES`.
pub fn exec_args(
    container: &str,
    command: &str,
    user: Option<&str>,
    tty: bool,
    (columns, lines): (u16, u16),
) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if tty {
        args.push("--interactive".to_string());
        args.push("--tty".to_string());
    }
    args.push(format!("--env=COLUMNS={}", columns));
    args.push(format!("--env=LINES={}", lines));
    if let Some(user) = user {
        args.push(format!("--user={}", user));
    }
    args.push(container.to_string());
    args.push(CONTAINER_SHELL.to_string());
    args.push("-c".to_string());
    args.push(command.to_string());
    args
}

/// Arguments for an interactive `exec` session.
pub fn shell_args(container: &str, user: Option<&str>, command: &[String]) -> Vec<String> {
    let mut args = vec!["exec".to_string(), "-ti".to_string()];
    if let Some(user) = user {
        args.push("-u".to_string());
        args.push(user.to_string());
    }
    args.push(container.to_string());
    if command.is_empty() {
        args.push(DEFAULT_EXEC_SHELL.to_string());
    } else {
        args.extend(command.iter().cloned());
    }
    args
}

/// Parse `{{json .NetworkSettings.Ports}}` into container port to host port.
///
/// Unpublished ports are left out.
pub fn parse_ports(json: &str) -> IndexMap<String, String> {
    let mut ports = IndexMap::new();
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(json) else {
        return ports;
    };

    for (port, bindings) in map {
        let host_port = bindings
            .as_array()
            .and_then(|b| b.first())
            .and_then(|b| b.get("HostPort"))
            .and_then(|p| p.as_str());
        if let Some(host_port) = host_port {
            ports.insert(port, host_port.to_string());
        }
    }
    ports
}
