//! Image reference helpers
//!
//! Pure string functions shared by every transform that touches an image.
//! A tag is only recognized after the last `/`, so a registry port such as
//! `registry:5000/app` does not count as one. A digest (`@sha256:...`) pins
//! the image and is never rewritten.

/// Image used for clone steps that do not declare one
pub const DEFAULT_CLONER: &str = "plugins/drone-git:latest";

/// Image used for cache steps that do not declare one
pub const DEFAULT_CACHER: &str = "plugins/drone-cache:latest";

/// Namespace and prefix that short plugin names expand into
pub const PLUGIN_PREFIX: &str = "plugins/drone-";

/// Tag applied to references without one
pub const DEFAULT_TAG: &str = "latest";

/// Splits a reference into its repository and its tag (or digest) suffix.
///
/// The suffix keeps its leading `:` or `@`, so `repository + suffix` always
/// reproduces the input.
#[must_use]
pub fn split_reference(image: &str) -> (&str, &str) {
    if let Some(at) = image.find('@') {
        return image.split_at(at);
    }
    let name_start = image.rfind('/').map_or(0, |slash| slash + 1);
    match image[name_start..].find(':') {
        Some(colon) => image.split_at(name_start + colon),
        None => (image, ""),
    }
}

/// Returns true if the reference carries a tag or digest
#[must_use]
pub fn has_tag(image: &str) -> bool {
    !split_reference(image).1.is_empty()
}

/// Returns the reference with its tag or digest removed
#[must_use]
pub fn base_image(image: &str) -> &str {
    split_reference(image).0
}

/// Appends `:latest` to a reference without a tag
#[must_use]
pub fn with_default_tag(image: &str) -> String {
    if has_tag(image) {
        image.to_string()
    } else {
        format!("{image}:{DEFAULT_TAG}")
    }
}

/// Expands a plugin short name into a fully qualified, tagged reference.
///
/// `my_plugin` becomes `plugins/drone-my-plugin:latest`. A name that already
/// contains a `/` is left as is apart from tag defaulting. Underscores are only
/// rewritten in the short name, never in the tag.
#[must_use]
pub fn plugin_image(image: &str) -> String {
    let (name, suffix) = split_reference(image);
    if name.contains('/') {
        return with_default_tag(image);
    }
    let expanded = format!("{PLUGIN_PREFIX}{}{suffix}", name.replace('_', "-"));
    with_default_tag(&expanded)
}
