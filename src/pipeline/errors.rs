//! Error types for the pipeline domain

use thiserror::Error;

/// Errors raised by node transforms
///
/// Only image resolution can fail. Every other transform is infallible.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    /// A step that requires an image did not declare one
    #[error("image is missing")]
    ImageMissing,
}

/// Errors that can occur while compiling or running a pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A step failed validation during compilation
    #[error("Step '{step}' is invalid: {source}")]
    Compile {
        /// Name of the offending step.
        step: String,
        /// Transform that rejected the step.
        #[source]
        source: TransformError,
    },

    /// The container runtime could not run a step
    #[error("Step '{step}' could not be run: {reason}")]
    Runtime {
        /// Name of the step.
        step: String,
        /// Description of the runtime failure.
        reason: String,
    },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
