//! Prelude module for common imports

pub use crate::executor::{
    Build, ContainerClient, ExecutionState, HealthStatus, Job, Repo, Runner, System, Workspace,
};
pub use crate::infrastructure::{CliClient, Config, ContainerRuntime};
pub use crate::pipeline::{
    CompileOptions, Compiler, ContainerNode, EscalationWhitelist, FilterNode, MountSpec, Node,
    NodeType, ParallelNode, PipelineError, Status, TransformError,
};
