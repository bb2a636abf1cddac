//! Container lifecycle of one project.
//!
//! A [`Project`] ties the merged configuration to a container engine and
//! knows how the project's containers are named, built and started:
//!
//! - services run as `<prefix><project>_<service>` with the service name
//!   as hostname, on a bridge network named after the project
//! - the tests container runs as `<prefix><project>_tests` from the
//!   project image, and is recreated when that image changes

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::config::{MountConfig, ServiceConfig, TeststackConfig};
use crate::containers::{
    BuildSpec, ContainerRunner, ContainerSpec, Volume, DEFAULT_TESTS_COMMAND, RUNNING_STATUS,
};
use crate::error::{Result, TeststackError};
use crate::git::{image_tag, service_tag, GitInfo};
use crate::ui::UserInterface;

/// Build file used when none is given.
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// Options of `start`.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Only start the services
    pub no_tests: bool,

    /// Don't mount the project directory into the tests container
    pub no_mount: bool,

    /// Prefix for container names
    pub prefix: String,
}

/// Options of `build`.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub rebuild: bool,
    pub tag: Option<String>,
    pub file: PathBuf,
    pub directory: PathBuf,
    pub service: Option<String>,
    pub stage: Option<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            rebuild: false,
            tag: None,
            file: PathBuf::from(DEFAULT_DOCKERFILE),
            directory: PathBuf::from("."),
            service: None,
            stage: None,
        }
    }
}

/// One line of `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub status: String,
    pub name: String,
    pub data: String,
}

impl StatusRow {
    /// Column headers, padded with underscores.
    pub fn header() -> String {
        format!("{:_^16}|{:_^36}|{:_^16}", "status", "name", "data")
    }

    /// The row, centered to the header's column widths.
    pub fn line(&self) -> String {
        format!("{:^16}|{:^36}|{:^16}", self.status, self.name, self.data)
    }
}

/// A configured project bound to a container engine.
pub struct Project {
    root: PathBuf,
    name: String,
    tag: String,
    config: TeststackConfig,
    git: GitInfo,
    runner: Box<dyn ContainerRunner>,
}

impl Project {
    /// Create a project rooted at `root`.
    ///
    /// Without an explicit `name`, the project is named after the last
    /// component of `root`.
    pub fn new(
        root: PathBuf,
        name: Option<String>,
        config: TeststackConfig,
        git: GitInfo,
        runner: Box<dyn ContainerRunner>,
    ) -> Self {
        let name = name.unwrap_or_else(|| default_project_name(&root));
        let tag = image_tag(&root, &git, config.tests.stage.as_deref());

        Self {
            root,
            name,
            tag,
            config,
            git,
            runner,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag of the project (tests) image.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn config(&self) -> &TeststackConfig {
        &self.config
    }

    pub fn git(&self) -> &GitInfo {
        &self.git
    }

    pub fn runner(&self) -> &dyn ContainerRunner {
        self.runner.as_ref()
    }

    /// Container name of a service.
    pub fn service_container(&self, prefix: &str, service: &str) -> String {
        format!("{}{}_{}", prefix, self.name, service)
    }

    /// Container name of the tests container.
    pub fn tests_container(&self, prefix: &str) -> String {
        format!("{}{}_tests", prefix, self.name)
    }

    /// Start every service, then the tests container unless `no_tests`.
    ///
    /// Returns the tests container name when it was started.
    pub fn start(&self, ui: &mut dyn UserInterface, opts: &StartOptions) -> Result<Option<String>> {
        tracing::debug!(
            "Starting {} (no_tests: {}, no_mount: {}, prefix: '{}')",
            self.name,
            opts.no_tests,
            opts.no_mount,
            opts.prefix
        );

        for (service, data) in &self.config.services {
            self.start_service(ui, &opts.prefix, service, data)?;
        }

        if opts.no_tests {
            return Ok(None);
        }
        self.start_tests(ui, opts).map(Some)
    }

    fn start_service(
        &self,
        ui: &mut dyn UserInterface,
        prefix: &str,
        service: &str,
        data: &ServiceConfig,
    ) -> Result<()> {
        let name = self.service_container(prefix, service);

        let image = match (&data.build, &data.image) {
            (Some(_), _) => {
                let tag = service_tag(&self.config.client.prefix, service, &self.git);
                if self.runner.image_get(&tag)?.is_none() {
                    let opts = BuildOptions {
                        tag: Some(tag.clone()),
                        service: Some(service.to_string()),
                        ..Default::default()
                    };
                    self.build(ui, &opts)?;
                }
                tag
            }
            (None, Some(image)) => image.clone(),
            (None, None) => {
                return Err(TeststackError::ConfigValidationError {
                    message: format!("Service '{}' has neither an image nor a build", service),
                })
            }
        };

        if self.runner.container_get(&name)?.is_none() {
            ui.message(&format!("Starting container: {}", name));
            let spec = ContainerSpec {
                name: name.clone(),
                image,
                command: data.command.clone(),
                ports: data.ports.clone(),
                environment: data.environment.clone(),
                volumes: self.volumes(&data.mounts),
                mount_cwd: None,
                network: Some(self.name.clone()),
                hostname: Some(service.to_string()),
            };
            self.runner.run(&spec)?;
        } else {
            self.runner.start(&name)?;
        }

        if self.runner.status(&name)? != RUNNING_STATUS {
            let logs = self.runner.logs(&name)?;
            ui.message(&logs);
            return Err(TeststackError::ContainerError {
                name,
                message: format!("Failed to start container for {}", service),
            });
        }
        Ok(())
    }

    fn start_tests(&self, ui: &mut dyn UserInterface, opts: &StartOptions) -> Result<String> {
        let tests = &self.config.tests;
        let image = self.tests_image(ui)?;
        let name = self.tests_container(&opts.prefix);

        let current = self.runner.container_image(&name)?;
        if current.as_deref() == Some(image.as_str()) {
            if self.runner.status(&name)? != RUNNING_STATUS {
                self.runner.start(&name)?;
            }
            tracing::debug!("Found tests container {}", name);
            return Ok(name);
        }

        if current.is_some() {
            tracing::debug!("Tests container {} is outdated, recreating", name);
        }
        self.runner.end_container(&name)?;

        ui.message(&format!("Starting container: {}", name));
        let mount_cwd = (!opts.no_mount && tests.mount).then(|| self.root.clone());
        let spec = ContainerSpec {
            name: name.clone(),
            image,
            command: Some(
                tests
                    .command
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TESTS_COMMAND.to_string()),
            ),
            ports: tests.ports.clone(),
            environment: tests.environment.clone(),
            volumes: self.volumes(&tests.mounts),
            mount_cwd,
            network: Some(self.name.clone()),
            hostname: None,
        };
        self.runner.run(&spec)?;
        Ok(name)
    }

    /// Image id (or reference) the tests container should run.
    fn tests_image(&self, ui: &mut dyn UserInterface) -> Result<String> {
        if let Some(image) = &self.config.tests.image {
            return Ok(self
                .runner
                .image_get(image)?
                .unwrap_or_else(|| image.clone()));
        }

        if let Some(id) = self.runner.image_get(&self.tag)? {
            return Ok(id);
        }

        let tag = self.build(ui, &BuildOptions::default())?;
        self.runner
            .image_get(&tag)?
            .ok_or(TeststackError::BuildFailed { tag })
    }

    /// Stop and remove the services, then the tests container.
    pub fn stop(&self, ui: &mut dyn UserInterface, prefix: &str) -> Result<()> {
        for service in self.config.services.keys() {
            let name = self.service_container(prefix, service);
            if self.runner.container_get(&name)?.is_none() {
                continue;
            }
            ui.message(&format!("Stopping container: {}", name));
            self.runner.end_container(&name)?;
        }

        let name = self.tests_container(prefix);
        if self.runner.container_get(&name)?.is_none() {
            return Ok(());
        }
        ui.message(&format!("Stopping container: {}", name));
        self.runner.end_container(&name)?;
        self.runner.network_prune()
    }

    /// Build the tests image, or a service image with `opts.service`.
    ///
    /// Returns the tag that was built.
    pub fn build(&self, ui: &mut dyn UserInterface, opts: &BuildOptions) -> Result<String> {
        let tests = &self.config.tests;

        let (tag, directory, buildargs, mounts, stage) = match &opts.service {
            Some(service) => {
                let data = self.config.services.get(service).ok_or_else(|| {
                    TeststackError::ServiceNotDefined {
                        service: service.clone(),
                    }
                })?;
                let tag = opts.tag.clone().unwrap_or_else(|| {
                    service_tag(&self.config.client.prefix, service, &self.git)
                });
                let directory = data
                    .build
                    .as_deref()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| opts.directory.clone());
                (tag, directory, &data.buildargs, &data.mounts, opts.stage.clone())
            }
            None => (
                opts.tag.clone().unwrap_or_else(|| self.tag.clone()),
                opts.directory.clone(),
                &tests.buildargs,
                &tests.mounts,
                opts.stage.clone().or_else(|| tests.stage.clone()),
            ),
        };

        let directory = self.root.join(directory);
        let spec = BuildSpec {
            dockerfile: directory.join(&opts.file),
            tag: tag.clone(),
            directory,
            buildargs: buildargs.clone(),
            secrets: mounts
                .iter()
                .filter(|(_, mount)| mount.secret)
                .map(|(id, mount)| (id.clone(), self.host_path(&mount.source)))
                .collect(),
            rebuild: opts.rebuild,
            stage,
        };

        ui.message(&format!("Build Image: {}", tag));
        let code = self.runner.build(&spec)?;
        tracing::debug!("Build of {} exited with {}", tag, code);

        if self.runner.image_get(&tag)?.is_none() {
            return Err(TeststackError::BuildFailed { tag });
        }
        Ok(tag)
    }

    /// Status of every service container and the tests container.
    pub fn status_rows(&self) -> Result<Vec<StatusRow>> {
        let names = self
            .config
            .services
            .keys()
            .map(|service| self.service_container("", service))
            .chain(std::iter::once(self.tests_container("")));

        names
            .map(|name| {
                let status = self.runner.status(&name)?;
                let data = format_ports(&self.runner.ports(&name)?);
                Ok(StatusRow { status, name, data })
            })
            .collect()
    }

    /// Copy each `[tests].copy` file out of the tests container into the
    /// project directory.
    ///
    /// Returns `false` if any file could not be retrieved.
    pub fn copy_files(&self, ui: &mut dyn UserInterface) -> Result<bool> {
        let name = self.tests_container("");
        let mut all_copied = true;
        for src in &self.config.tests.copy {
            if !self.runner.copy_out(&name, src, &self.root)? {
                ui.error(&format!("Failed to retrieve {}!", src));
                all_copied = false;
            }
        }
        Ok(all_copied)
    }

    fn volumes(&self, mounts: &IndexMap<String, MountConfig>) -> Vec<Volume> {
        mounts
            .values()
            .map(|mount| Volume {
                source: self.host_path(&mount.source),
                target: mount.target.clone(),
                mode: mount.mode.clone(),
            })
            .collect()
    }

    /// Expand `~` and resolve relative paths against the project root.
    fn host_path(&self, source: &str) -> PathBuf {
        let expanded = match source.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => dirs::home_dir()
                .map(|home| home.join(rest.trim_start_matches('/')))
                .unwrap_or_else(|| PathBuf::from(source)),
            _ => PathBuf::from(source),
        };
        self.root.join(expanded)
    }
}

/// Basename of the project directory.
pub fn default_project_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "teststack".to_string())
}

fn format_ports(ports: &IndexMap<String, String>) -> String {
    ports
        .iter()
        .map(|(container, host)| format!("{}->{}", container, host))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::MockRunner;
    use crate::ui::MockUI;

    fn setup(toml_str: &str) -> (Project, MockRunner) {
        let config: TeststackConfig = toml::from_str(toml_str).unwrap();
        let mock = MockRunner::new();
        let project = Project::new(
            PathBuf::from("/work/app"),
            None,
            config,
            GitInfo::default(),
            Box::new(mock.clone()),
        );
        (project, mock)
    }

    #[test]
    fn names_follow_project_directory() {
        let (project, _) = setup("");
        assert_eq!(project.name(), "app");
        assert_eq!(project.tag(), "app:latest");
        assert_eq!(project.tests_container(""), "app_tests");
        assert_eq!(project.service_container("imp.", "db"), "imp.app_db");
    }

    #[test]
    fn explicit_name_wins() {
        let config = TeststackConfig::default();
        let project = Project::new(
            PathBuf::from("/work/app"),
            Some("custom".to_string()),
            config,
            GitInfo::default(),
            Box::new(MockRunner::new()),
        );
        assert_eq!(project.tests_container(""), "custom_tests");
    }

    #[test]
    fn stage_is_appended_to_tag() {
        let (project, _) = setup("[tests]\nstage = \"dev\"\n");
        assert_eq!(project.tag(), "app:latest-dev");
    }

    #[test]
    fn start_builds_missing_image_and_runs_tests_container() {
        let (project, mock) = setup(
            r#"
[tests]
environment = { APP_ENV = "test" }
ports = { "8080" = "" }
"#,
        );
        let mut ui = MockUI::new();

        let name = project
            .start(&mut ui, &StartOptions::default())
            .unwrap();

        assert_eq!(name.as_deref(), Some("app_tests"));
        assert_eq!(mock.builds()[0].tag, "app:latest");
        assert!(ui.has_message("Build Image: app:latest"));
        assert!(ui.has_message("Starting container: app_tests"));

        let run = &mock.runs()[0];
        assert_eq!(run.image, "sha256:app:latest");
        assert_eq!(run.command.as_deref(), Some(DEFAULT_TESTS_COMMAND));
        assert_eq!(run.mount_cwd, Some(PathBuf::from("/work/app")));
        assert_eq!(run.network.as_deref(), Some("app"));
        assert_eq!(run.environment["APP_ENV"], "test");
        assert_eq!(run.ports["8080"], "");
    }

    #[test]
    fn start_reuses_up_to_date_tests_container() {
        let (project, mock) = setup("");
        mock.add_image("app:latest", "sha256:abc");
        mock.add_container("app_tests", "sha256:abc", RUNNING_STATUS);
        let mut ui = MockUI::new();

        project.start(&mut ui, &StartOptions::default()).unwrap();

        assert!(mock.runs().is_empty());
        assert!(mock.builds().is_empty());
        assert!(mock.ended().is_empty());
    }

    #[test]
    fn start_recreates_outdated_tests_container() {
        let (project, mock) = setup("");
        mock.add_image("app:latest", "sha256:new");
        mock.add_container("app_tests", "sha256:old", RUNNING_STATUS);
        let mut ui = MockUI::new();

        project.start(&mut ui, &StartOptions::default()).unwrap();

        assert_eq!(mock.ended(), vec!["app_tests"]);
        assert_eq!(mock.runs()[0].image, "sha256:new");
    }

    #[test]
    fn no_mount_and_config_disable_cwd_mount() {
        let (project, mock) = setup("");
        mock.add_image("app:latest", "sha256:abc");
        let opts = StartOptions {
            no_mount: true,
            ..Default::default()
        };
        project.start(&mut MockUI::new(), &opts).unwrap();
        assert_eq!(mock.runs()[0].mount_cwd, None);

        let (project, mock) = setup("[tests]\nmount = false\n");
        mock.add_image("app:latest", "sha256:abc");
        project
            .start(&mut MockUI::new(), &StartOptions::default())
            .unwrap();
        assert_eq!(mock.runs()[0].mount_cwd, None);
    }

    #[test]
    fn services_start_before_tests_on_project_network() {
        let (project, mock) = setup(
            r#"
[services.database]
image = "postgres:16"
ports = { "5432" = "" }

[services.cache]
image = "redis"
"#,
        );
        mock.add_image("app:latest", "sha256:abc");

        project
            .start(&mut MockUI::new(), &StartOptions::default())
            .unwrap();

        let names: Vec<_> = mock.runs().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["app_database", "app_cache", "app_tests"]);
        assert_eq!(mock.networks(), vec!["app"]);
        let db = &mock.runs()[0];
        assert_eq!(db.hostname.as_deref(), Some("database"));
        assert_eq!(db.network.as_deref(), Some("app"));
        assert_eq!(db.mount_cwd, None);
    }

    #[test]
    fn no_tests_only_starts_services() {
        let (project, mock) = setup("[services.db]\nimage = \"postgres\"\n");
        let opts = StartOptions {
            no_tests: true,
            ..Default::default()
        };

        let name = project.start(&mut MockUI::new(), &opts).unwrap();

        assert_eq!(name, None);
        assert_eq!(mock.runs().len(), 1);
    }

    #[test]
    fn existing_service_container_is_started() {
        let (project, mock) = setup("[services.db]\nimage = \"postgres\"\n");
        mock.add_container("app_db", "postgres", "exited");
        let opts = StartOptions {
            no_tests: true,
            ..Default::default()
        };

        project.start(&mut MockUI::new(), &opts).unwrap();

        assert!(mock.runs().is_empty());
        assert_eq!(mock.status("app_db").unwrap(), RUNNING_STATUS);
    }

    #[test]
    fn service_that_fails_to_start_aborts() {
        let (project, mock) = setup("[services.db]\nimage = \"postgres\"\n");
        mock.set_start_status("exited");

        let err = project
            .start(&mut MockUI::new(), &StartOptions::default())
            .err()
            .unwrap();

        assert!(err.to_string().contains("Failed to start container for db"));
        assert_eq!(mock.runs().len(), 1);
    }

    #[test]
    fn service_with_build_gets_its_own_image() {
        let (project, mock) = setup(
            r#"
[client]
prefix = "local/"

[services.api]
build = "services/api"
buildargs = { VERSION = "1" }
"#,
        );
        let opts = StartOptions {
            no_tests: true,
            ..Default::default()
        };

        project.start(&mut MockUI::new(), &opts).unwrap();

        let build = &mock.builds()[0];
        assert_eq!(build.tag, "local/api:latest");
        assert_eq!(build.directory, PathBuf::from("/work/app/services/api"));
        assert_eq!(
            build.dockerfile,
            PathBuf::from("/work/app/services/api/Dockerfile")
        );
        assert_eq!(build.buildargs["VERSION"], "1");
        assert_eq!(mock.runs()[0].image, "local/api:latest");
    }

    #[test]
    fn build_uses_tests_stage_and_secrets() {
        let (project, mock) = setup(
            r#"
[tests]
stage = "ci"

[tests.mounts.netrc]
source = "/etc/netrc"
target = "/root/.netrc"
secret = true

[tests.mounts.cache]
source = "cache"
target = "/cache"
"#,
        );

        let tag = project
            .build(&mut MockUI::new(), &BuildOptions::default())
            .unwrap();

        assert_eq!(tag, "app:latest-ci");
        let build = &mock.builds()[0];
        assert_eq!(build.stage.as_deref(), Some("ci"));
        assert_eq!(build.secrets.len(), 1);
        assert_eq!(build.secrets["netrc"], PathBuf::from("/etc/netrc"));
    }

    #[test]
    fn build_of_unknown_service_fails() {
        let (project, mock) = setup("");
        let opts = BuildOptions {
            service: Some("nope".to_string()),
            ..Default::default()
        };

        let err = project.build(&mut MockUI::new(), &opts).err().unwrap();

        assert!(matches!(err, TeststackError::ServiceNotDefined { .. }));
        assert_eq!(err.exit_code(), 11);
        assert!(mock.builds().is_empty());
    }

    #[test]
    fn build_without_resulting_image_fails() {
        let (project, mock) = setup("");
        mock.set_failing_builds();

        let err = project
            .build(&mut MockUI::new(), &BuildOptions::default())
            .err()
            .unwrap();

        assert!(matches!(err, TeststackError::BuildFailed { .. }));
    }

    #[test]
    fn stop_ends_existing_containers_and_prunes() {
        let (project, mock) = setup(
            "[services.db]\nimage = \"postgres\"\n[services.cache]\nimage = \"redis\"\n",
        );
        mock.add_container("app_db", "postgres", RUNNING_STATUS);
        mock.add_container("app_tests", "sha256:abc", RUNNING_STATUS);
        let mut ui = MockUI::new();

        project.stop(&mut ui, "").unwrap();

        assert_eq!(mock.ended(), vec!["app_db", "app_tests"]);
        assert!(ui.has_message("Stopping container: app_db"));
    }

    #[test]
    fn status_lists_services_then_tests() {
        let (project, mock) = setup("[services.db]\nimage = \"postgres\"\n");
        mock.add_container("app_db", "postgres", RUNNING_STATUS);

        let rows = project.status_rows().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, RUNNING_STATUS);
        assert_eq!(rows[1].name, "app_tests");
        assert_eq!(rows[1].status, "notfound");
    }

    #[test]
    fn status_row_lines_up_with_header() {
        let row = StatusRow {
            status: "running".into(),
            name: "app_tests".into(),
            data: String::new(),
        };
        assert_eq!(row.line().len(), StatusRow::header().len());
        assert!(StatusRow::header().starts_with("_____status_____|"));
    }

    #[test]
    fn copy_reports_missing_files() {
        let (project, mock) = setup("[tests]\ncopy = [\"coverage.xml\", \"report.html\"]\n");
        mock.set_missing_file("report.html");
        let mut ui = MockUI::new();

        assert!(!project.copy_files(&mut ui).unwrap());
        assert_eq!(mock.copies(), vec!["coverage.xml", "report.html"]);
        assert!(ui.has_error("Failed to retrieve report.html!"));
    }

    #[test]
    fn relative_mounts_resolve_against_root() {
        let (project, _) = setup("");
        assert_eq!(
            project.host_path("data"),
            PathBuf::from("/work/app/data")
        );
        assert_eq!(project.host_path("/abs"), PathBuf::from("/abs"));
    }
}
