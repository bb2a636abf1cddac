//! Configuration schema definitions for teststack.
//!
//! This module contains the struct definitions that map to the
//! `teststack.toml` file format. Tables use [`IndexMap`] so steps and
//! services keep the order they were written in.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::steps::StepDefinition;

/// Root configuration structure for `teststack.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeststackConfig {
    /// Container engine selection
    pub client: ClientConfig,

    /// Tests container and the steps executed inside it
    pub tests: TestsConfig,

    /// Service containers the tests depend on
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub services: IndexMap<String, ServiceConfig>,
}

/// Top-level tables the schema understands.
pub const KNOWN_SECTIONS: &[&str] = &["client", "tests", "services"];

/// Keys accepted in `[tests]`.
pub const KNOWN_TESTS_KEYS: &[&str] = &[
    "min_version",
    "mount",
    "mounts",
    "copy",
    "command",
    "stage",
    "image",
    "steps",
    "environment",
    "ports",
    "buildargs",
];

/// Keys accepted in `[services.<name>]`.
pub const KNOWN_SERVICE_KEYS: &[&str] = &[
    "image",
    "build",
    "command",
    "ports",
    "environment",
    "buildargs",
    "mounts",
];

/// Container engine configuration.
///
/// Keys other than `name` and `prefix` are collected into `options`
/// for engine-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Engine name: `docker` or `podman`
    pub name: String,

    /// Prefix added to images built for services
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prefix: String,

    /// Engine-specific options
    #[serde(flatten)]
    pub options: IndexMap<String, toml::Value>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: default_client_name(),
            prefix: String::new(),
            options: IndexMap::new(),
        }
    }
}

fn default_client_name() -> String {
    "docker".to_string()
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !v
}

/// The tests container: how it is built and started, and the steps run in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestsConfig {
    /// Minimum teststack version able to run this configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,

    /// Mount the project directory into the tests container
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub mount: bool,

    /// Extra volumes for the tests container
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub mounts: IndexMap<String, MountConfig>,

    /// Files to copy out of the tests container with `run --copy`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub copy: Vec<String>,

    /// Main process of the tests container
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Build stage for multi-stage Dockerfiles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    /// Prebuilt image to use instead of building the project image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Step definitions, in execution order
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub steps: IndexMap<String, StepConfig>,

    /// Environment variables set in the tests container
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,

    /// Port mappings, `<container-port> = "<host-port>"` (empty host port auto-maps)
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub ports: IndexMap<String, String>,

    /// Build arguments passed to the image build
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub buildargs: IndexMap<String, String>,
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            min_version: None,
            mount: true,
            mounts: IndexMap::new(),
            copy: Vec::new(),
            command: None,
            stage: None,
            image: None,
            steps: IndexMap::new(),
            environment: IndexMap::new(),
            ports: IndexMap::new(),
            buildargs: IndexMap::new(),
        }
    }
}

impl TestsConfig {
    /// Normalize every configured step into a [`StepDefinition`], in file order.
    pub fn step_definitions(&self) -> IndexMap<String, StepDefinition> {
        self.steps
            .iter()
            .map(|(name, step)| (name.clone(), step.to_definition(name)))
            .collect()
    }

    /// `min_version` with a leading `v` removed.
    pub fn min_version(&self) -> Option<&str> {
        self.min_version
            .as_deref()
            .map(|v| v.trim().trim_start_matches('v'))
    }
}

/// A service container the tests depend on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Image to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Directory containing a Dockerfile to build the image from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,

    /// Command override for the container
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Port mappings, `<container-port> = "<host-port>"`
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub ports: IndexMap<String, String>,

    /// Environment variables for the container
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,

    /// Build arguments for `build`
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub buildargs: IndexMap<String, String>,

    /// Extra volumes
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub mounts: IndexMap<String, MountConfig>,
}

/// A volume mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountConfig {
    /// Host path (`~` is expanded)
    pub source: String,

    /// Path inside the container
    pub target: String,

    /// Mount mode
    #[serde(default = "default_mount_mode")]
    pub mode: String,

    /// Expose the file as a build secret instead of a volume
    #[serde(default, skip_serializing_if = "is_false")]
    pub secret: bool,
}

fn default_mount_mode() -> String {
    "rw".to_string()
}

/// One entry of `[tests.steps]`.
///
/// A step can be written three ways:
///
/// ```toml
/// [tests.steps]
/// env = "env"
/// lint = ["ruff check .", "mypy ."]
/// tests = { command = "pytest {posargs}", requires = "install", check = "test -f .ok", user = "app" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepConfig {
    /// A single command.
    Command(String),
    /// A list of commands.
    Commands(Vec<String>),
    /// The full table form.
    Detailed(StepTable),
}

/// The table form of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepTable {
    /// Command or commands to execute; may contain `{posargs}`
    pub command: StringOrList,

    /// Steps that must resolve before this one
    #[serde(default, skip_serializing_if = "StringOrList::is_empty")]
    pub requires: StringOrList,

    /// Command whose zero exit status marks the step as already done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,

    /// User to run the commands as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl StepConfig {
    /// Convert to the normalized definition consumed by the graph builder.
    pub fn to_definition(&self, name: &str) -> StepDefinition {
        match self {
            StepConfig::Command(command) => StepDefinition::new(name, vec![command.clone()]),
            StepConfig::Commands(commands) => StepDefinition::new(name, commands.clone()),
            StepConfig::Detailed(table) => StepDefinition {
                name: name.to_string(),
                command: table.command.to_vec(),
                requires: table.requires.to_vec(),
                check: table.check.clone(),
                user: table.user.clone(),
            },
        }
    }
}

impl<'de> Deserialize<'de> for StepConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StepVisitor;

        impl<'de> Visitor<'de> for StepVisitor {
            type Value = StepConfig;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a command string, a list of commands, or a step table")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<StepConfig, E> {
                Ok(StepConfig::Command(v.to_string()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<StepConfig, A::Error> {
                Vec::deserialize(de::value::SeqAccessDeserializer::new(seq))
                    .map(StepConfig::Commands)
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<StepConfig, A::Error> {
                StepTable::deserialize(de::value::MapAccessDeserializer::new(map))
                    .map(StepConfig::Detailed)
            }
        }

        deserializer.deserialize_any(StepVisitor)
    }
}

/// A value written either as `"one"` or `["one", "two"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StringOrList(pub Vec<String>);

impl StringOrList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl<'de> Deserialize<'de> for StringOrList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ListVisitor;

        impl<'de> Visitor<'de> for ListVisitor {
            type Value = StringOrList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string or a list of strings")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<StringOrList, E> {
                Ok(StringOrList(vec![v.to_string()]))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<StringOrList, A::Error> {
                Vec::deserialize(de::value::SeqAccessDeserializer::new(seq)).map(StringOrList)
            }
        }

        deserializer.deserialize_any(ListVisitor)
    }
}
