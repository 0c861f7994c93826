//! Pipeline compiler
//!
//! Applies the node transforms to every node of a pipeline in a fixed order,
//! turning the step descriptors into finalized container specs.

use super::errors::PipelineError;
use super::node::Node;
use super::transforms;
use super::whitelist::EscalationWhitelist;
use serde::{Deserialize, Serialize};

/// Bind mount applied to every container step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    /// Host path or volume name
    pub from: String,
    /// Path inside the container
    pub to: String,
}

impl MountSpec {
    /// Creates a mount from `from` to `to`
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Options that drive one compilation
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Force a fresh pull of plugin images
    pub pull: bool,
    /// Inject `DEBUG=true` into plugin steps
    pub debug: bool,
    /// Repository is trusted; steps keep their declared capabilities
    pub trusted: bool,
    /// Cache directory name, usually the repository's full name
    pub cache_dir: String,
    /// Mounts added to every container step
    pub mounts: Vec<MountSpec>,
    /// Plugins allowed to run privileged at the publish stage
    pub whitelist: EscalationWhitelist,
}

/// Applies the transform chain to pipeline nodes
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Creates a compiler with the given options
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Returns the compile options
    #[must_use]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compiles every node in place.
    ///
    /// Nodes are visited in pipeline order, filters and parallel groups
    /// before their children.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Compile`] for the first step whose image is
    /// missing. Nodes visited before it are already transformed.
    pub fn compile(&self, nodes: &mut [Node]) -> Result<(), PipelineError> {
        tracing::debug!(
            nodes = nodes.len(),
            trusted = self.options.trusted,
            pull = self.options.pull,
            debug = self.options.debug,
            "compiling pipeline"
        );

        for node in nodes.iter_mut() {
            node.walk_mut(&mut |node: &mut Node| self.apply(node))?;
        }
        Ok(())
    }

    fn apply(&self, node: &mut Node) -> Result<(), PipelineError> {
        let options = &self.options;
        let step = step_name(node);
        let fail = |source| PipelineError::Compile {
            step: step.clone(),
            source,
        };

        transforms::image_name(node).map_err(fail)?;
        transforms::image_pull(node, options.pull).map_err(fail)?;
        if !options.trusted {
            transforms::sanitize(node).map_err(fail)?;
        }
        transforms::escalate(node, &options.whitelist).map_err(fail)?;
        transforms::http_proxy(node).map_err(fail)?;
        transforms::cache(node, &options.cache_dir).map_err(fail)?;
        if options.debug {
            transforms::debug(node, options.debug).map_err(fail)?;
        }
        for mount in &options.mounts {
            transforms::mount(node, &mount.from, &mount.to).map_err(fail)?;
        }
        transforms::default_notify_filter(node).map_err(fail)
    }
}

fn step_name(node: &Node) -> String {
    node.as_container()
        .map_or_else(|| node.node_type().to_string(), super::node::ContainerNode::label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::errors::TransformError;
    use crate::pipeline::node::{ContainerNode, FilterNode, ParallelNode};
    use crate::pipeline::types::{NodeType, Status};
    use pretty_assertions::assert_eq;

    fn container(node: &Node) -> &ContainerNode {
        node.as_container().unwrap()
    }

    fn options() -> CompileOptions {
        CompileOptions {
            cache_dir: "octocat/hello-world".to_string(),
            ..CompileOptions::default()
        }
    }

    #[test]
    fn test_compile_resolves_and_sanitizes() {
        let mut nodes: Vec<Node> = vec![
            ContainerNode::new(NodeType::Clone).into(),
            ContainerNode {
                privileged: true,
                net: "host".to_string(),
                volumes: vec!["/var/run/docker.sock:/var/run/docker.sock".to_string()],
                ..ContainerNode::new(NodeType::Build)
                    .with_image("golang")
                    .with_command("go test ./...")
            }
            .into(),
        ];

        Compiler::new(options()).compile(&mut nodes).unwrap();

        assert_eq!(container(&nodes[0]).image, "plugins/drone-git:latest");
        let build = container(&nodes[1]);
        assert_eq!(build.image, "golang:latest");
        assert!(!build.privileged);
        assert!(build.net.is_empty());
        assert!(build.volumes.is_empty());
    }

    #[test]
    fn test_compile_escalates_after_sanitize() {
        let mut nodes: Vec<Node> = vec![
            ContainerNode {
                volumes: vec!["/:/host".to_string()],
                ..ContainerNode::new(NodeType::Publish).with_image("docker")
            }
            .into(),
        ];

        Compiler::new(options()).compile(&mut nodes).unwrap();

        let publish = container(&nodes[0]);
        assert_eq!(publish.image, "plugins/drone-docker:latest");
        assert!(publish.privileged);
        assert!(publish.volumes.is_empty());
    }

    #[test]
    fn test_compile_trusted_keeps_capabilities() {
        let mut nodes: Vec<Node> = vec![
            ContainerNode {
                privileged: true,
                net: "host".to_string(),
                ..ContainerNode::new(NodeType::Build)
                    .with_image("docker:dind")
                    .with_command("docker info")
            }
            .into(),
        ];

        let compiler = Compiler::new(CompileOptions {
            trusted: true,
            ..options()
        });
        compiler.compile(&mut nodes).unwrap();

        let build = container(&nodes[0]);
        assert!(build.privileged);
        assert_eq!(build.net, "host");
    }

    #[test]
    fn test_compile_cache_debug_and_mounts() {
        let mut nodes: Vec<Node> = vec![
            ContainerNode::new(NodeType::Cache).into(),
            ContainerNode::new(NodeType::Build)
                .with_image("rust")
                .with_command("cargo test")
                .into(),
        ];

        let compiler = Compiler::new(CompileOptions {
            debug: true,
            mounts: vec![MountSpec::new("drone_workspace", "/drone")],
            ..options()
        });
        compiler.compile(&mut nodes).unwrap();

        let cache = container(&nodes[0]);
        assert_eq!(cache.image, "plugins/drone-cache:latest");
        assert_eq!(
            cache.volumes,
            vec![
                "/var/lib/drone/cache/octocat/hello-world:/cache".to_string(),
                "drone_workspace:/drone".to_string(),
            ]
        );
        assert!(cache.environment.contains(&"DEBUG=true".to_string()));

        let build = container(&nodes[1]);
        assert_eq!(build.volumes, vec!["drone_workspace:/drone".to_string()]);
        assert!(!build.environment.contains(&"DEBUG=true".to_string()));
    }

    #[test]
    fn test_compile_without_debug_injects_nothing() {
        let mut nodes: Vec<Node> = vec![ContainerNode::new(NodeType::Deploy).with_image("ssh").into()];

        Compiler::new(options()).compile(&mut nodes).unwrap();

        assert!(!container(&nodes[0]).environment.contains(&"DEBUG=true".to_string()));
    }

    #[test]
    fn test_compile_pull_skips_build_images() {
        let mut nodes: Vec<Node> = vec![
            ContainerNode::new(NodeType::Notify).with_image("slack").into(),
            ContainerNode::new(NodeType::Build).with_image("node").into(),
        ];

        let compiler = Compiler::new(CompileOptions {
            pull: true,
            ..options()
        });
        compiler.compile(&mut nodes).unwrap();

        assert!(container(&nodes[0]).pull);
        assert!(!container(&nodes[1]).pull);
    }

    #[test]
    fn test_compile_descends_into_structural_nodes() {
        let mut nodes = vec![
            Node::Parallel(ParallelNode::new([
                ContainerNode::new(NodeType::Compose).with_image("redis").into(),
                ContainerNode::new(NodeType::Compose).with_image("postgres:16").into(),
            ])),
            Node::Filter(FilterNode::new(
                ContainerNode::new(NodeType::Notify).with_image("email"),
            )),
        ];

        Compiler::new(options()).compile(&mut nodes).unwrap();

        let images: Vec<_> = nodes
            .iter()
            .flat_map(Node::containers)
            .map(|c| c.image.as_str())
            .collect();
        assert_eq!(
            images,
            vec!["redis:latest", "postgres:16", "plugins/drone-email:latest"]
        );

        let Node::Filter(filter) = &nodes[1] else {
            panic!("expected a filter node");
        };
        assert_eq!(
            filter.conditions.status,
            vec![Status::Success, Status::Failure]
        );
    }

    #[test]
    fn test_compile_reports_missing_image() {
        let mut nodes: Vec<Node> = vec![
            ContainerNode::new(NodeType::Clone).into(),
            ContainerNode::new(NodeType::Compose).with_name("database").into(),
        ];

        let err = Compiler::new(options()).compile(&mut nodes).unwrap_err();

        assert_eq!(
            err,
            PipelineError::Compile {
                step: "database".to_string(),
                source: TransformError::ImageMissing,
            }
        );
        assert!(err.to_string().contains("database"));
        assert!(container(&nodes[1]).image.is_empty());
    }
}
