//! Pipeline execution layer
//!
//! This module contains the job state shared by running steps, the runtime
//! client trait and the runner that drives it.

pub mod records;
mod runner;
mod state;
mod traits;

pub use records::{Build, Job, Repo, System, Workspace};
pub use runner::{RUNTIME_FAILURE_CODE, Runner};
pub use state::{ExecutionState, Sink};
pub use traits::{ContainerClient, HealthStatus};
