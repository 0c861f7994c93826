//! Pipeline runner
//!
//! Walks compiled nodes in order and runs each container step through the
//! state's [`ContainerClient`](super::ContainerClient). Parallel groups run on
//! scoped threads that all report into the same [`ExecutionState`].

use super::state::ExecutionState;
use crate::pipeline::{ContainerNode, Node, ParallelNode, PipelineError};
use std::time::Instant;

/// Exit code recorded when the runtime cannot run a step at all
pub const RUNTIME_FAILURE_CODE: i32 = 255;

/// Runs compiled pipelines
#[derive(Debug, Clone, Copy, Default)]
pub struct Runner;

impl Runner {
    /// Creates a new runner
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs `nodes` in order, recording every step's exit in `state`.
    ///
    /// Once the build has failed, only steps behind a filter that accepts the
    /// failure still run. Runtime errors are recorded as a failed exit and do
    /// not stop the remaining steps.
    ///
    /// # Errors
    ///
    /// Returns the first runtime error, after every node has been visited.
    pub fn run(&self, nodes: &[Node], state: &ExecutionState) -> Result<(), PipelineError> {
        tracing::info!(
            repo = %state.repo().full_name,
            build = state.build().number,
            job = state.job().number,
            steps = nodes.len(),
            "starting job"
        );

        let mut first_error = None;
        for node in nodes {
            if let Err(err) = self.run_node(node, state, false) {
                first_error.get_or_insert(err);
            }
        }

        tracing::info!(
            status = %state.final_status(),
            exit_code = state.exit_code(),
            "job finished"
        );
        first_error.map_or(Ok(()), Err)
    }

    fn run_node(
        &self,
        node: &Node,
        state: &ExecutionState,
        filtered: bool,
    ) -> Result<(), PipelineError> {
        match node {
            Node::Container(container) => {
                if container.is_placeholder() {
                    tracing::debug!(step = %container.label(), "skipping empty build step");
                    return Ok(());
                }
                if !filtered && state.failed() {
                    tracing::info!(step = %container.label(), "skipping step after failure");
                    return Ok(());
                }
                self.run_container(container, state)
            }
            Node::Filter(filter) => {
                let current = state.final_status();
                if filter.conditions.matches(current) {
                    self.run_node(&filter.node, state, true)
                } else {
                    tracing::debug!(status = %current, "filter conditions not met");
                    Ok(())
                }
            }
            Node::Parallel(parallel) => {
                if !filtered && state.failed() {
                    tracing::info!(steps = parallel.nodes.len(), "skipping parallel group after failure");
                    return Ok(());
                }
                self.run_parallel(parallel, state)
            }
        }
    }

    /// Runs every child of an admitted group. A sibling's failure does not
    /// skip the others.
    fn run_parallel(
        &self,
        parallel: &ParallelNode,
        state: &ExecutionState,
    ) -> Result<(), PipelineError> {
        let results: Vec<Result<(), PipelineError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = parallel
                .nodes
                .iter()
                .map(|child| scope.spawn(move || self.run_node(child, state, true)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        state.exit(RUNTIME_FAILURE_CODE);
                        Err(PipelineError::Runtime {
                            step: "parallel".to_string(),
                            reason: "step thread panicked".to_string(),
                        })
                    })
                })
                .collect()
        });

        results.into_iter().find(Result::is_err).unwrap_or(Ok(()))
    }

    #[allow(clippy::unused_self)]
    fn run_container(
        &self,
        container: &ContainerNode,
        state: &ExecutionState,
    ) -> Result<(), PipelineError> {
        let step = container.label();
        tracing::info!(step = %step, image = %container.image, "starting step");

        let start = Instant::now();
        match state.client().run(container, state) {
            Ok(code) => {
                state.exit(code);
                let duration_ms = start.elapsed().as_millis();
                if code == 0 {
                    tracing::info!(step = %step, duration_ms, "step succeeded");
                } else {
                    tracing::warn!(step = %step, exit_code = code, duration_ms, "step failed");
                }
                Ok(())
            }
            Err(err) => {
                tracing::error!(step = %step, error = %err, "step could not be run");
                state.exit(RUNTIME_FAILURE_CODE);
                Err(err)
            }
        }
    }
}
