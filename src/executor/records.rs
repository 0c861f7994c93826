//! Build records
//!
//! Plain data describing what is being built. These are read by the runner and
//! handed back to the caller for persistence once the job is done.

use crate::pipeline::Status;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Repository being built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repo {
    /// Owner or organization
    pub owner: String,
    /// Repository name
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    /// Clone URL
    pub clone_url: String,
    /// Steps may keep privileged settings
    pub trusted: bool,
    /// Repository is private
    pub private: bool,
}

impl Repo {
    /// Creates a repository record for `owner/name`
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        Self {
            full_name: format!("{owner}/{name}"),
            owner,
            name,
            ..Self::default()
        }
    }
}

/// One build of a repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Build {
    /// Build number
    pub number: u64,
    /// Triggering event (push, pull_request, tag, deployment)
    pub event: String,
    /// Branch being built
    pub branch: String,
    /// Commit SHA
    pub commit: String,
    /// Aggregate status of the build's jobs
    pub status: Status,
}

/// One execution unit of a build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    /// Job number within the build
    pub number: u64,
    /// Job status
    pub status: Status,
    /// Exit code of the last failing step, 0 if none failed
    pub exit_code: i32,
    /// Matrix environment of the job
    pub environment: BTreeMap<String, String>,
}

/// Settings of the CI system running the job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct System {
    /// Server version
    pub version: String,
    /// Public link to the server
    pub link: String,
}

/// Location of the checked-out source inside the containers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workspace {
    /// Root shared by all steps
    pub root: PathBuf,
    /// Working directory of the steps
    pub path: PathBuf,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/drone"),
            path: PathBuf::from("/drone/src"),
        }
    }
}
