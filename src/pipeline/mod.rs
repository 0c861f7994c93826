//! Pipeline domain types and logic
//!
//! The node model, the transforms that police it, and the compiler that
//! applies them in order.

pub mod compiler;
pub mod errors;
pub mod image;
pub mod node;
pub mod transforms;
pub mod types;
pub mod whitelist;


// Re-export public types from submodules
pub use compiler::{CompileOptions, Compiler, MountSpec};
pub use errors::{PipelineError, TransformError};
pub use image::{DEFAULT_CACHER, DEFAULT_CLONER};
pub use node::{Conditions, ContainerNode, FilterNode, Node, ParallelNode};
pub use transforms::{
    TransformResult, cache, debug, default_notify_filter, escalate, http_proxy, http_proxy_from,
    image_match, image_name, image_pull, mount, sanitize,
};
pub use types::{NodeType, Status};
pub use whitelist::{DEFAULT_ESCALATE, EscalationWhitelist};
