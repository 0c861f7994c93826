//! Container runtime traits
//!
//! The runner never talks to Docker directly. It drives a [`ContainerClient`],
//! which the execution state holds as a shared, read-only handle.

use super::state::ExecutionState;
use crate::pipeline::{ContainerNode, PipelineError};

/// Client for the container runtime that executes compiled steps
#[allow(clippy::missing_errors_doc)]
pub trait ContainerClient: Send + Sync {
    /// Runs one finalized step and returns its exit code.
    ///
    /// Blocks until the container exits, or until it has started when the
    /// node is detached. Output is forwarded to the state's sinks.
    fn run(&self, node: &ContainerNode, state: &ExecutionState) -> Result<i32, PipelineError>;

    /// Reports whether the runtime is usable
    fn health_check(&self) -> HealthStatus;
}

/// Health status of a container runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Runtime is healthy
    Healthy,

    /// Runtime is unhealthy
    Unhealthy {
        /// Reason for being unhealthy
        reason: String,
    },
}

impl HealthStatus {
    /// Returns true if the runtime can run containers
    #[must_use]
    pub fn is_operational(&self) -> bool {
        !matches!(self, Self::Unhealthy { .. })
    }
}
