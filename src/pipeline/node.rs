//! Node model
//!
//! A pipeline arrives here as a tree of [`Node`] values, one container node per
//! step, optionally wrapped in filters or grouped for parallel execution.
//! Transforms mutate container nodes in place; the structural variants only
//! carry children.

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use super::types::{NodeType, Status};
use serde::{Deserialize, Serialize};

/// One node of a compiled pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    /// Container-backed step
    Container(ContainerNode),
    /// Child node gated on run conditions
    Filter(FilterNode),
    /// Children executed concurrently
    Parallel(ParallelNode),
}

impl Node {
    /// Returns the kind of this node
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Container(container) => container.node_type,
            Self::Filter(_) => NodeType::Filter,
            Self::Parallel(_) => NodeType::Parallel,
        }
    }

    /// Returns the container descriptor if this is a container node
    pub fn as_container(&self) -> Option<&ContainerNode> {
        match self {
            Self::Container(container) => Some(container),
            _ => None,
        }
    }

    /// Visits this node and every descendant, parents before children.
    ///
    /// Stops at the first error returned by `visit`.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `visit`.
    pub fn walk_mut<E, F>(&mut self, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(&mut Node) -> Result<(), E>,
    {
        visit(self)?;
        match self {
            Self::Container(_) => Ok(()),
            Self::Filter(filter) => filter.node.walk_mut(visit),
            Self::Parallel(parallel) => {
                for child in &mut parallel.nodes {
                    child.walk_mut(visit)?;
                }
                Ok(())
            }
        }
    }

    /// Returns every container node in the tree, in pipeline order
    pub fn containers(&self) -> Vec<&ContainerNode> {
        let mut found = Vec::new();
        self.collect_containers(&mut found);
        found
    }

    fn collect_containers<'a>(&'a self, found: &mut Vec<&'a ContainerNode>) {
        match self {
            Self::Container(container) => found.push(container),
            Self::Filter(filter) => filter.node.collect_containers(found),
            Self::Parallel(parallel) => {
                for child in &parallel.nodes {
                    child.collect_containers(found);
                }
            }
        }
    }
}

impl From<ContainerNode> for Node {
    fn from(container: ContainerNode) -> Self {
        Self::Container(container)
    }
}

/// Mutable descriptor of one container-backed step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerNode {
    /// Kind of step
    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Step name, used in logs and container names
    pub name: String,

    /// Image reference
    pub image: String,

    /// Shell commands to run inside the container
    pub commands: Vec<String>,

    /// Force a fresh pull of the image
    pub pull: bool,

    /// Run with elevated host access
    pub privileged: bool,

    /// Bind mounts in `host:container` form
    pub volumes: Vec<String>,

    /// Network mode override, empty for the runtime default
    pub net: String,

    /// Entrypoint override
    pub entrypoint: Vec<String>,

    /// Environment entries in `KEY=VALUE` form
    pub environment: Vec<String>,

    /// Start the container in the background
    pub detach: bool,
}

impl ContainerNode {
    /// Creates an empty node of the given kind
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            ..Self::default()
        }
    }

    /// Sets the step name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the image reference
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Appends a shell command
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    /// Appends a `KEY=VALUE` environment entry
    pub fn with_env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.environment
            .push(format!("{}={}", key.as_ref(), value.as_ref()));
        self
    }

    /// Runs the container detached
    pub fn detached(mut self) -> Self {
        self.detach = true;
        self
    }

    /// Returns a display label, the name when set and the kind otherwise
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.node_type.to_string()
        } else {
            self.name.clone()
        }
    }

    /// Returns true for a build step that has nothing to run
    pub fn is_placeholder(&self) -> bool {
        self.node_type == NodeType::Build && self.image.is_empty() && self.commands.is_empty()
    }
}

/// Conditions under which a filtered node runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conditions {
    /// Build statuses that allow the node to run; empty means "not failed"
    pub status: Vec<Status>,
}

impl Conditions {
    /// Returns true if a build in `current` status satisfies these conditions
    pub fn matches(&self, current: Status) -> bool {
        if self.status.is_empty() {
            return !current.is_failure();
        }
        self.status.contains(&current)
    }
}

/// Node gated on run conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterNode {
    /// Run conditions
    #[serde(default)]
    pub conditions: Conditions,

    /// Wrapped node
    pub node: Box<Node>,
}

impl FilterNode {
    /// Wraps a node without conditions
    pub fn new(node: impl Into<Node>) -> Self {
        Self {
            conditions: Conditions::default(),
            node: Box::new(node.into()),
        }
    }

    /// Restricts the node to the given build statuses
    pub fn on_status(mut self, status: impl IntoIterator<Item = Status>) -> Self {
        self.conditions.status = status.into_iter().collect();
        self
    }
}

/// Group of nodes executed concurrently
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelNode {
    /// Nodes in the group
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl ParallelNode {
    /// Creates a group from the given nodes
    pub fn new(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
        }
    }
}
