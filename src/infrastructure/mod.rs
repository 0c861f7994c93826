//! Infrastructure layer
//!
//! This module contains external integrations and adapters.

mod config;
pub mod container;
mod logging;

pub use config::{Config, ConfigError, ENV_PREFIX};
pub use container::{CliClient, ContainerRuntime};
pub use logging::init_logging;
