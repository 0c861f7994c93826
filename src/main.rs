//! drover - compile and run CI pipeline steps in containers
//!
//! ## Commands
//!
//! - `drover compile` - Apply the node transforms and print the result
//! - `drover run` - Compile a job and run it through Docker or Podman
//! - `drover whitelist` - Print the effective escalation whitelist
//! - `drover completions` - Generate shell completions
//!
//! ## Quick Start
//!
//! ```bash
//! # Review what a job will run
//! drover compile job.yml --format yaml
//!
//! # Run it with podman, escalating one extra plugin
//! DROVER_RUNTIME=podman DROVER_ESCALATE=plugins/drone-docker,acme/kaniko drover run job.yml
//!
//! # Generate shell completions
//! drover completions bash > /etc/bash_completion.d/drover
//! ```

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if std::env::var("DROVER_VERBOSE").is_ok() {
                eprintln!("{e:?}");
            }
            ExitCode::FAILURE
        }
    }
}
