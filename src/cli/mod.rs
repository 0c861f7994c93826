//! CLI for drover
//!
//! - `compile`: Apply the node transforms and print the finalized nodes
//! - `run`: Compile, then run the job through Docker or Podman
//! - `whitelist`: Print the effective escalation whitelist
//! - `completions`: Generate shell completions

pub mod completions;
pub mod compile;
pub mod run;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use drover::executor::{Build, Job, Repo, System, Workspace};
use drover::infrastructure::{Config, init_logging};
use drover::pipeline::Node;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI arguments for drover
#[derive(Parser, Debug)]
#[command(name = "drover")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply the node transforms and print the finalized nodes
    Compile {
        /// Job document (JSON or YAML)
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,
        #[command(flatten)]
        job: JobArgs,
    },

    /// Compile and run a job through the container runtime
    Run {
        /// Job document (JSON or YAML)
        file: PathBuf,
        #[command(flatten)]
        job: JobArgs,
    },

    /// Print the effective escalation whitelist
    Whitelist,

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Overrides applied on top of the job document
#[derive(clap::Args, Debug, Default, Clone)]
pub struct JobArgs {
    /// Treat the repository as trusted (skips sanitizing)
    #[arg(long)]
    pub trusted: bool,
    /// Cache directory, defaults to the repository's full name
    #[arg(long)]
    pub cache_dir: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Yaml,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// A job to compile or run: its records plus the nodes of its pipeline
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobDocument {
    pub repo: Repo,
    pub build: Build,
    pub build_last: Option<Build>,
    pub job: Job,
    pub system: System,
    pub workspace: Workspace,
    pub nodes: Vec<Node>,
}

impl JobDocument {
    /// Parses a document, as YAML for `.yml`/`.yaml` files and JSON otherwise
    pub fn parse(contents: &str, path: &Path) -> Result<Self> {
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));

        if is_yaml {
            serde_yaml::from_str(contents)
                .with_context(|| format!("Invalid YAML job document: {}", path.display()))
        } else {
            serde_json::from_str(contents)
                .with_context(|| format!("Invalid JSON job document: {}", path.display()))
        }
    }

    /// Reads and parses a job document
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job document: {}", path.display()))?;
        Self::parse(&contents, path)
    }
}

/// Build the CLI command for completion generation
pub fn build_cli() -> clap::Command {
    Args::command()
}

fn load_config(args: &Args) -> Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let mut config = config.with_env()?;
    if let Some(level) = &args.log_level {
        config.log_level.clone_from(level);
    }
    Ok(config)
}

/// Parse and execute CLI arguments, returning the process exit code
pub fn run() -> Result<i32> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(&config.log_level);

    match args.command {
        Command::Compile { file, format, job } => {
            let document = JobDocument::load(&file)?;
            let output = compile::compile_document(document, &config, &job, format)?;
            println!("{output}");
        }
        Command::Run { file, job } => {
            let document = JobDocument::load(&file)?;
            return run::run_document(document, &config, &job);
        }
        Command::Whitelist => {
            for image in config.escalate.iter() {
                println!("{image}");
            }
        }
        Command::Completions { shell, output } => {
            use clap_complete::Shell;

            let shell_enum = match shell {
                ShellArg::Bash => Shell::Bash,
                ShellArg::Zsh => Shell::Zsh,
                ShellArg::Fish => Shell::Fish,
                ShellArg::PowerShell => Shell::PowerShell,
            };

            let completions = completions::generate_completions(shell_enum)?;

            if let Some(output_path) = output {
                completions::save_completions(&completions, &output_path)?;
            } else {
                println!("{completions}");
            }
        }
    }

    Ok(0)
}
