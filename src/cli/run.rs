//! `drover run` - Compile a job and run it through the container runtime

use super::compile::{compile_nodes, compile_options};
use super::{JobArgs, JobDocument};
use anyhow::{Result, bail};
use drover::prelude::*;
use std::sync::Arc;

/// Compiles and runs a job, returning its exit code
pub fn run_document(mut document: JobDocument, config: &Config, job: &JobArgs) -> Result<i32> {
    let options = compile_options(config, &document, job);
    compile_nodes(&mut document, options)?;

    let client = CliClient::new(config.runtime);
    if let HealthStatus::Unhealthy { reason } = client.health_check() {
        bail!("Container runtime is unusable: {reason}");
    }

    run_with_client(document, Arc::new(client))
}

/// Runs already compiled nodes with `client`, returning the job's exit code
pub fn run_with_client(document: JobDocument, client: Arc<dyn ContainerClient>) -> Result<i32> {
    let JobDocument {
        repo,
        mut build,
        build_last,
        mut job,
        system,
        workspace,
        nodes,
    } = document;
    build.status = Status::Running;
    job.status = Status::Running;

    let mut state = ExecutionState::new(client)
        .with_repo(repo)
        .with_build(build)
        .with_job(job)
        .with_system(system)
        .with_workspace(workspace);
    if let Some(last) = build_last {
        state = state.with_build_last(last);
    }

    if let Err(err) = Runner::new().run(&nodes, &state) {
        tracing::error!(error = %err, "job hit a runtime error");
    }

    if state.status_changed() {
        tracing::info!(status = %state.final_status(), "build status changed");
    }
    Ok(state.exit_code())
}
