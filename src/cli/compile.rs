//! `drover compile` - Apply the node transforms to a job's nodes
//!
//! Prints the finalized nodes so a policy change can be reviewed without
//! starting any container.

use super::{FormatArg, JobArgs, JobDocument};
use anyhow::{Context, Result};
use drover::infrastructure::Config;
use drover::pipeline::{CompileOptions, Compiler, Node};

/// Builds compile options from the config, the job's repository and the
/// command line overrides
pub fn compile_options(config: &Config, document: &JobDocument, job: &JobArgs) -> CompileOptions {
    let mut options = config.compile_options(&document.repo);
    options.trusted |= job.trusted;
    if let Some(dir) = &job.cache_dir {
        options.cache_dir.clone_from(dir);
    }
    options
}

/// Compiles the document's nodes in place
pub fn compile_nodes(document: &mut JobDocument, options: CompileOptions) -> Result<()> {
    let step_count = document.nodes.len();
    Compiler::new(options)
        .compile(&mut document.nodes)
        .context("Failed to compile pipeline")?;
    tracing::info!(steps = step_count, "pipeline compiled");
    Ok(())
}

/// Compiles a job document and renders the finalized nodes
pub fn compile_document(
    mut document: JobDocument,
    config: &Config,
    job: &JobArgs,
    format: FormatArg,
) -> Result<String> {
    let options = compile_options(config, &document, job);
    compile_nodes(&mut document, options)?;
    render(&document.nodes, format)
}

fn render(nodes: &[Node], format: FormatArg) -> Result<String> {
    match format {
        FormatArg::Json => {
            serde_json::to_string_pretty(nodes).context("Failed to render nodes as JSON")
        }
        FormatArg::Yaml => serde_yaml::to_string(nodes).context("Failed to render nodes as YAML"),
    }
}
