//! Core types for the node model
//!
//! This module contains the step-kind tag that every transform branches on.

#![allow(clippy::must_use_candidate)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a pipeline node
///
/// The container kinds (`Clone` through `Notify`) select transform behavior.
/// `Filter` and `Parallel` tag the structural nodes. Any other value is legal
/// and is carried as `Other`; transforms treat it as an unrecognized step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Repository clone step
    Clone,
    /// Build/compile step running user commands
    #[default]
    Build,
    /// Service container composed alongside the build
    Compose,
    /// Cache restore/rebuild step
    Cache,
    /// Artifact publish step
    Publish,
    /// Deployment step
    Deploy,
    /// Notification step
    Notify,
    /// Conditional wrapper around another node
    Filter,
    /// Group of nodes executed concurrently
    Parallel,
    /// Unrecognized node kind
    Other(u16),
}

impl NodeType {
    /// Returns true for step kinds that run a plugin image rather than user commands
    pub fn is_plugin(&self) -> bool {
        matches!(
            self,
            Self::Clone | Self::Cache | Self::Publish | Self::Deploy | Self::Notify
        )
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clone => write!(f, "clone"),
            Self::Build => write!(f, "build"),
            Self::Compose => write!(f, "compose"),
            Self::Cache => write!(f, "cache"),
            Self::Publish => write!(f, "publish"),
            Self::Deploy => write!(f, "deploy"),
            Self::Notify => write!(f, "notify"),
            Self::Filter => write!(f, "filter"),
            Self::Parallel => write!(f, "parallel"),
            Self::Other(code) => write!(f, "other({code})"),
        }
    }
}

/// Status of a job or build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not started yet
    #[default]
    Pending,
    /// Steps are executing
    Running,
    /// Completed without a failing step
    Success,
    /// At least one step exited non-zero
    Failure,
}

impl Status {
    /// Returns true if the status is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}
