//! # Work Item Schema
//!
//! Typed units of work processed by the orchestrators. The YAML document is first
//! read into the raw structs of [`super::setup_config`] and then validated into
//! these types, so that "exactly one source decides how an item is realized"
//! holds by construction:
//!
//! - a [`ToolItem`] is realized either by a custom shell command or by the
//!   package manager ([`ToolSource`]),
//! - a [`ConfigureItem`] is realized either by a custom command or by a URL
//!   download ([`ConfigSource`]).

use std::fmt;

use serde::Serialize;

/// How the package manager should install a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallMethod {
    /// Regular formula install (`brew install <name>`).
    #[default]
    Formula,
    /// Alternate method, e.g. `brew install --cask <name>`.
    Cask,
}

/// The single source that decides how a tool gets installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSource {
    /// A user supplied shell command, run through `sh -c`.
    Command(String),
    /// The default package-manager invocation with the given method.
    PackageManager(InstallMethod),
}

/// A tool to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolItem {
    pub name: String,
    pub source: ToolSource,
    /// Follow-up shell commands run after a successful install. Each one is best-effort.
    pub post_install: Vec<String>,
}

impl ToolItem {
    /// A tool installed through the package manager with the default method.
    pub fn package(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ToolSource::PackageManager(InstallMethod::Formula),
            post_install: Vec::new(),
        }
    }

    /// A tool installed by running `command`.
    pub fn custom(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ToolSource::Command(command.into()),
            post_install: Vec::new(),
        }
    }
}

/// The single source that decides how a configuration file is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A command expected to write the target file itself.
    Command(String),
    /// A URL whose body becomes the content of the target file.
    Url(String),
}

/// A configuration file to put in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureItem {
    pub name: String,
    pub source: ConfigSource,
    /// Destination path as written in the document; may start with `~`.
    pub target_path: String,
}

/// One unit of work in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    Tool(ToolItem),
    Configure(ConfigureItem),
}

impl WorkItem {
    pub fn name(&self) -> &str {
        match self {
            WorkItem::Tool(tool) => &tool.name,
            WorkItem::Configure(item) => &item.name,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            WorkItem::Tool(_) => Operation::Install,
            WorkItem::Configure(_) => Operation::Configure,
        }
    }
}

/// The kind of work a [`Stat`](crate::libs::stats_recorder::Stat) was recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operation {
    Install,
    Configure,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Install => write!(f, "Install"),
            Operation::Configure => write!(f, "Configure"),
        }
    }
}

/// Final outcome of one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Error => write!(f, "error"),
        }
    }
}
