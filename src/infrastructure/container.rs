//! Container client (Docker/Podman)
//!
//! Runs finalized container nodes through the `docker` or `podman` CLI.

use crate::executor::{
    ContainerClient, ExecutionState, HealthStatus, RUNTIME_FAILURE_CODE, Workspace,
};
use crate::pipeline::{ContainerNode, PipelineError};
use serde::{Deserialize, Serialize};
use std::process::Command;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix of generated container names
pub const CONTAINER_PREFIX: &str = "drover_";

/// Container runtime type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    /// Docker runtime
    #[default]
    Docker,
    /// Podman runtime
    Podman,
}

impl ContainerRuntime {
    /// Gets the runtime executable name
    #[must_use]
    pub fn command(self) -> &'static str {
        match self {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
        }
    }
}

impl std::fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command())
    }
}

impl FromStr for ContainerRuntime {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(ContainerRuntime::Docker),
            "podman" => Ok(ContainerRuntime::Podman),
            _ => Err(()),
        }
    }
}

/// Client that shells out to the runtime CLI
#[derive(Debug, Clone, Default)]
pub struct CliClient {
    runtime: ContainerRuntime,
}

impl CliClient {
    /// Creates a client for `runtime`
    #[must_use]
    pub fn new(runtime: ContainerRuntime) -> Self {
        Self { runtime }
    }

    /// Runtime this client drives
    #[must_use]
    pub fn runtime(&self) -> ContainerRuntime {
        self.runtime
    }

    /// Builds the `run` arguments for `node`, excluding the executable
    #[must_use]
    pub fn run_args(
        &self,
        node: &ContainerNode,
        workspace: &Workspace,
        container_name: &str,
    ) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            container_name.to_string(),
        ];

        if node.detach {
            args.push("-d".to_string());
        }
        if node.privileged {
            args.push("--privileged".to_string());
        }
        if node.pull {
            args.extend(["--pull".to_string(), "always".to_string()]);
        }
        if !node.net.is_empty() {
            args.extend(["--network".to_string(), node.net.clone()]);
        }
        for volume in &node.volumes {
            args.extend(["-v".to_string(), volume.clone()]);
        }
        for entry in &node.environment {
            args.extend(["-e".to_string(), entry.clone()]);
        }
        args.extend([
            "-w".to_string(),
            workspace.path.to_string_lossy().into_owned(),
        ]);

        if node.commands.is_empty() {
            let mut entrypoint = node.entrypoint.iter();
            if let Some(program) = entrypoint.next() {
                args.extend(["--entrypoint".to_string(), program.clone()]);
            }
            args.push(node.image.clone());
            args.extend(entrypoint.cloned());
        } else {
            args.extend(["--entrypoint".to_string(), "/bin/sh".to_string()]);
            args.push(node.image.clone());
            args.extend(["-c".to_string(), script(&node.commands)]);
        }

        args
    }

    /// Checks if the container runtime is available
    fn is_runtime_available(&self) -> bool {
        Command::new(self.runtime.command())
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Gets the runtime version
    fn runtime_version(&self) -> String {
        let output = Command::new(self.runtime.command())
            .arg("--version")
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .unwrap_or_else(|| "unknown".to_string());
        output.trim().to_string()
    }
}

/// Turns step commands into a shell script that echoes each command before
/// running it and stops at the first failure
#[must_use]
pub fn script(commands: &[String]) -> String {
    let mut script = String::from("set -e\n");
    for command in commands {
        let trace = format!("+ {command}");
        script.push_str("echo ");
        script.push_str(&shell_words::quote(&trace));
        script.push('\n');
        script.push_str(command);
        script.push('\n');
    }
    script
}

impl ContainerClient for CliClient {
    fn run(&self, node: &ContainerNode, state: &ExecutionState) -> Result<i32, PipelineError> {
        let name = format!("{CONTAINER_PREFIX}{}", Uuid::new_v4().simple());
        let args = self.run_args(node, state.workspace(), &name);
        tracing::debug!(
            runtime = %self.runtime,
            container = %name,
            args = %shell_words::join(&args),
            "running container"
        );

        let output = Command::new(self.runtime.command())
            .args(&args)
            .output()
            .map_err(|e| PipelineError::Runtime {
                step: node.label(),
                reason: format!("failed to start {}: {e}", self.runtime),
            })?;

        if !output.stdout.is_empty() {
            state.write_stdout(&output.stdout)?;
        }
        if !output.stderr.is_empty() {
            state.write_stderr(&output.stderr)?;
        }

        Ok(output.status.code().unwrap_or(RUNTIME_FAILURE_CODE))
    }

    fn health_check(&self) -> HealthStatus {
        if !self.is_runtime_available() {
            return HealthStatus::Unhealthy {
                reason: format!("{} is not available", self.runtime),
            };
        }

        let version = self.runtime_version();
        tracing::info!(runtime = %self.runtime, version = %version, "Container runtime available");

        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NodeType;
    use pretty_assertions::assert_eq;

    fn args_for(node: &ContainerNode) -> Vec<String> {
        CliClient::default().run_args(node, &Workspace::default(), "drover_test")
    }

    #[test]
    fn test_container_runtime_display() {
        assert_eq!(ContainerRuntime::Docker.to_string(), "docker");
        assert_eq!(ContainerRuntime::Podman.to_string(), "podman");
    }

    #[test]
    fn test_container_runtime_parse() {
        assert_eq!("Podman".parse::<ContainerRuntime>(), Ok(ContainerRuntime::Podman));
        assert_eq!("docker".parse::<ContainerRuntime>(), Ok(ContainerRuntime::Docker));
        assert!("rkt".parse::<ContainerRuntime>().is_err());
    }

    #[test]
    fn test_cli_client_defaults_to_docker() {
        assert_eq!(CliClient::default().runtime(), ContainerRuntime::Docker);
        assert_eq!(
            CliClient::new(ContainerRuntime::Podman).runtime(),
            ContainerRuntime::Podman
        );
    }

    #[test]
    fn test_run_args_for_plugin() {
        let mut node = ContainerNode::new(NodeType::Publish)
            .with_image("plugins/drone-docker:latest")
            .with_env("PLUGIN_REPO", "octocat/hello");
        node.privileged = true;
        node.pull = true;
        node.volumes.push("/var/lib/drone/cache/octocat/hello:/cache".to_string());

        assert_eq!(
            args_for(&node),
            vec![
                "run",
                "--rm",
                "--name",
                "drover_test",
                "--privileged",
                "--pull",
                "always",
                "-v",
                "/var/lib/drone/cache/octocat/hello:/cache",
                "-e",
                "PLUGIN_REPO=octocat/hello",
                "-w",
                "/drone/src",
                "plugins/drone-docker:latest",
            ]
        );
    }

    #[test]
    fn test_run_args_for_commands() {
        let node = ContainerNode::new(NodeType::Build)
            .with_image("golang:1.22")
            .with_command("go build")
            .with_command("go test ./...");

        let args = args_for(&node);
        let image = args.iter().position(|a| a == "golang:1.22").unwrap();
        assert_eq!(&args[image - 2..image], ["--entrypoint", "/bin/sh"]);
        assert_eq!(args[image + 1], "-c");
        assert_eq!(
            args[image + 2],
            "set -e\necho '+ go build'\ngo build\necho '+ go test ./...'\ngo test ./...\n"
        );
    }

    #[test]
    fn test_run_args_for_entrypoint_and_network() {
        let mut node = ContainerNode::new(NodeType::Compose)
            .with_image("postgres:16")
            .detached();
        node.net = "host".to_string();
        node.entrypoint = vec!["docker-entrypoint.sh".to_string(), "postgres".to_string()];

        let args = args_for(&node);
        assert!(args.contains(&"-d".to_string()));
        assert!(args.windows(2).any(|w| w == ["--network", "host"]));
        assert!(
            args.windows(2)
                .any(|w| w == ["--entrypoint", "docker-entrypoint.sh"])
        );
        assert_eq!(&args[args.len() - 2..], ["postgres:16", "postgres"]);
    }

    #[test]
    fn test_script_quotes_traced_commands() {
        let script = script(&["echo \"it's done\"".to_string()]);
        assert_eq!(
            script,
            "set -e\necho '+ echo \"it'\\''s done\"'\necho \"it's done\"\n"
        );
    }

    #[test]
    fn test_cli_client_health_check() {
        let health = CliClient::default().health_check();

        assert!(
            matches!(health, HealthStatus::Healthy)
                || matches!(health, HealthStatus::Unhealthy { .. })
        );
    }
}
