//! # Drover - pipeline node policy and execution state
//!
//! Drover prepares the steps of a CI build for execution and tracks the job
//! while they run.
//!
//! - [`pipeline`]: the node model, the transforms that normalize images and
//!   police privileges, and the [`Compiler`](pipeline::Compiler) that applies
//!   them in order.
//! - [`executor`]: the per-job [`ExecutionState`](executor::ExecutionState)
//!   and the [`Runner`](executor::Runner) that drives a container client.
//! - [`infrastructure`]: configuration, logging and the Docker/Podman client.
//!
//! ## Quick Start
//!
//! ```no_run
//! use drover::prelude::*;
//! use std::sync::Arc;
//!
//! let mut nodes: Vec<Node> = vec![
//!     ContainerNode::new(NodeType::Clone).into(),
//!     ContainerNode::new(NodeType::Build)
//!         .with_image("golang")
//!         .with_command("go test ./...")
//!         .into(),
//! ];
//!
//! Compiler::new(CompileOptions::default()).compile(&mut nodes)?;
//!
//! let state = ExecutionState::new(Arc::new(CliClient::default()));
//! Runner::new().run(&nodes, &state)?;
//! std::process::exit(state.exit_code());
//! # Ok::<(), PipelineError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod executor;
pub mod infrastructure;
pub mod pipeline;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use executor::{
    Build, ContainerClient, ExecutionState, HealthStatus, Job, RUNTIME_FAILURE_CODE, Repo, Runner,
    System, Workspace,
};
pub use infrastructure::{CliClient, Config, ConfigError, ContainerRuntime, init_logging};
pub use pipeline::{
    CompileOptions, Compiler, ContainerNode, EscalationWhitelist, Node, NodeType, PipelineError,
    Status, TransformError,
};

/// Version of the drover crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
