//! Node transforms
//!
//! Policy functions applied to every node while a pipeline is compiled. Each
//! one takes any [`Node`] but only changes container nodes; the structural
//! variants fall into one explicit branch per function that leaves the node
//! untouched and reports success.
//!
//! Only [`image_name`] can fail. The others always return `Ok(())` so that
//! policy injection never blocks compilation.

use super::errors::TransformError;
use super::image::{
    DEFAULT_CACHER, DEFAULT_CLONER, base_image, plugin_image, with_default_tag,
};
use super::node::{ContainerNode, Node};
use super::types::{NodeType, Status};
use super::whitelist::EscalationWhitelist;

/// Host directory that holds per-repository caches
pub const CACHE_ROOT: &str = "/var/lib/drone/cache";

/// Container path where the cache directory is mounted
pub const CACHE_MOUNT: &str = "/cache";

/// Environment entry injected by [`debug`]
pub const DEBUG_ENV: &str = "DEBUG=true";

/// Proxy variables forwarded by [`http_proxy`], compared case-insensitively
pub const PROXY_VARS: [&str; 3] = ["HTTP_PROXY", "HTTPS_PROXY", "NO_PROXY"];

/// Result type for node transforms
pub type TransformResult = Result<(), TransformError>;

fn unsupported(node: &Node, transform: &'static str) -> TransformResult {
    tracing::trace!(transform, node_type = %node.node_type(), "transform skipped for non-container node");
    Ok(())
}

/// Normalizes the image reference of a node.
///
/// Compose steps must declare an image. Build steps must declare one when they
/// have commands. Clone and cache steps fall back to the stock plugins. Every
/// other kind expands plugin short names, and an empty image stays empty.
///
/// # Errors
///
/// Returns [`TransformError::ImageMissing`] when a mandatory image is absent.
/// The node is left unchanged in that case.
pub fn image_name(node: &mut Node) -> TransformResult {
    match node {
        Node::Container(container) => resolve_image(container),
        Node::Filter(_) | Node::Parallel(_) => unsupported(node, "image_name"),
    }
}

fn resolve_image(container: &mut ContainerNode) -> TransformResult {
    let resolved = match container.node_type {
        NodeType::Compose => {
            if container.image.is_empty() {
                return Err(TransformError::ImageMissing);
            }
            with_default_tag(&container.image)
        }
        NodeType::Build => {
            if container.image.is_empty() {
                if container.commands.is_empty() {
                    return Ok(());
                }
                return Err(TransformError::ImageMissing);
            }
            with_default_tag(&container.image)
        }
        NodeType::Clone if container.image.is_empty() => DEFAULT_CLONER.to_string(),
        NodeType::Cache if container.image.is_empty() => DEFAULT_CACHER.to_string(),
        // TODO: an empty image on publish/deploy/notify steps probably deserves
        // ImageMissing too; kept permissive until pipelines in the wild are audited.
        _ if container.image.is_empty() => return Ok(()),
        _ => plugin_image(&container.image),
    };

    if resolved != container.image {
        tracing::debug!(step = %container.label(), from = %container.image, to = %resolved, "resolved image");
        container.image = resolved;
    }
    Ok(())
}

/// Returns true if the node's image, tag stripped, equals one of `images`.
///
/// Non-container nodes never match.
pub fn image_match<I, S>(node: &Node, images: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    match node {
        Node::Container(container) => {
            let image = base_image(&container.image);
            images
                .into_iter()
                .any(|candidate| base_image(candidate.as_ref()) == image)
        }
        Node::Filter(_) | Node::Parallel(_) => false,
    }
}

/// Sets the pull policy. Build and compose images are never pulled.
///
/// # Errors
///
/// Never fails.
pub fn image_pull(node: &mut Node, pull: bool) -> TransformResult {
    match node {
        Node::Container(container) => {
            container.pull = match container.node_type {
                NodeType::Build | NodeType::Compose => false,
                _ => pull,
            };
            Ok(())
        }
        Node::Filter(_) | Node::Parallel(_) => unsupported(node, "image_pull"),
    }
}

/// Strips privileged mode, network override, entrypoint and volumes.
///
/// # Errors
///
/// Never fails.
pub fn sanitize(node: &mut Node) -> TransformResult {
    match node {
        Node::Container(container) => {
            reset_capabilities(container);
            container.privileged = false;
            Ok(())
        }
        Node::Filter(_) | Node::Parallel(_) => unsupported(node, "sanitize"),
    }
}

fn reset_capabilities(container: &mut ContainerNode) {
    container.net.clear();
    container.entrypoint.clear();
    container.volumes.clear();
}

/// Grants privileged mode to whitelisted publish plugins.
///
/// Only the privilege flag is lifted; network, entrypoint and volumes are
/// cleared again rather than restored. Every other node is left as is.
///
/// # Errors
///
/// Never fails.
pub fn escalate(node: &mut Node, whitelist: &EscalationWhitelist) -> TransformResult {
    let trusted = image_match(node, whitelist.iter());
    match node {
        Node::Container(container) => {
            if container.node_type == NodeType::Publish && trusted {
                tracing::info!(step = %container.label(), image = %container.image, "escalating trusted plugin to privileged");
                reset_capabilities(container);
                container.privileged = true;
            }
            Ok(())
        }
        Node::Filter(_) | Node::Parallel(_) => unsupported(node, "escalate"),
    }
}

/// Mounts the cache directory `dir` into cache steps.
///
/// # Errors
///
/// Never fails.
pub fn cache(node: &mut Node, dir: &str) -> TransformResult {
    match node {
        Node::Container(container) => {
            if container.node_type == NodeType::Cache {
                container
                    .volumes
                    .push(format!("{CACHE_ROOT}/{dir}:{CACHE_MOUNT}"));
            }
            Ok(())
        }
        Node::Filter(_) | Node::Parallel(_) => unsupported(node, "cache"),
    }
}

/// Injects `DEBUG=true` into plugin steps.
///
/// The flag does not gate the injection: `false` adds the same entry. Callers
/// decide whether to apply the transform at all.
///
/// # Errors
///
/// Never fails.
pub fn debug(node: &mut Node, _debug: bool) -> TransformResult {
    match node {
        Node::Container(container) => {
            if container.node_type.is_plugin() {
                container.environment.push(DEBUG_ENV.to_string());
            }
            Ok(())
        }
        Node::Filter(_) | Node::Parallel(_) => unsupported(node, "debug"),
    }
}

/// Adds a `from:to` bind mount.
///
/// # Errors
///
/// Never fails.
pub fn mount(node: &mut Node, from: &str, to: &str) -> TransformResult {
    match node {
        Node::Container(container) => {
            container.volumes.push(format!("{from}:{to}"));
            Ok(())
        }
        Node::Filter(_) | Node::Parallel(_) => unsupported(node, "mount"),
    }
}

/// Forwards the process proxy settings into the node's environment.
///
/// # Errors
///
/// Never fails.
pub fn http_proxy(node: &mut Node) -> TransformResult {
    http_proxy_from(node, std::env::vars())
}

/// Forwards proxy settings found in `vars` into the node's environment.
///
/// Matching ignores case. Entries are appended sorted by key.
///
/// # Errors
///
/// Never fails.
pub fn http_proxy_from<I>(node: &mut Node, vars: I) -> TransformResult
where
    I: IntoIterator<Item = (String, String)>,
{
    match node {
        Node::Container(container) => {
            let mut proxies: Vec<(String, String)> = vars
                .into_iter()
                .filter(|(key, _)| {
                    let key = key.to_ascii_uppercase();
                    PROXY_VARS.contains(&key.as_str())
                })
                .collect();
            proxies.sort();

            for (key, value) in proxies {
                container.environment.push(format!("{key}={value}"));
            }
            Ok(())
        }
        Node::Filter(_) | Node::Parallel(_) => unsupported(node, "http_proxy"),
    }
}

/// Makes notification steps run on success and failure by default.
///
/// Applies to filters that wrap a notify step and declare no status
/// condition. Everything else is left as is.
///
/// # Errors
///
/// Never fails.
pub fn default_notify_filter(node: &mut Node) -> TransformResult {
    match node {
        Node::Filter(filter) => {
            if filter.node.node_type() == NodeType::Notify && filter.conditions.status.is_empty() {
                filter.conditions.status = vec![Status::Success, Status::Failure];
            }
            Ok(())
        }
        Node::Container(_) | Node::Parallel(_) => Ok(()),
    }
}
