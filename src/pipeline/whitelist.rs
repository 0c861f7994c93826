//! Escalation whitelist
//!
//! The set of trusted plugin images allowed to run privileged at the publish
//! stage. It is an ordinary value: build one at startup (usually from
//! configuration) and hand it to [`escalate`](super::transforms::escalate).

use super::image::base_image;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Images trusted by default
pub const DEFAULT_ESCALATE: [&str; 3] = [
    "plugins/drone-docker",
    "plugins/drone-gcr",
    "plugins/drone-ecr",
];

/// Trusted plugin base images, compared without tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct EscalationWhitelist {
    images: BTreeSet<String>,
}

impl EscalationWhitelist {
    /// Creates an empty whitelist that trusts nothing
    #[must_use]
    pub fn empty() -> Self {
        Self {
            images: BTreeSet::new(),
        }
    }

    /// Adds an image. Any tag on `image` is dropped.
    pub fn insert(&mut self, image: impl AsRef<str>) {
        self.images.insert(base_image(image.as_ref()).to_string());
    }

    /// Returns the whitelist extended with `images`
    #[must_use]
    pub fn with<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for image in images {
            self.insert(image);
        }
        self
    }

    /// Returns true if `image`, tag stripped, is trusted
    #[must_use]
    pub fn permits(&self, image: &str) -> bool {
        self.images.contains(base_image(image))
    }

    /// Iterates the trusted images in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.images.iter().map(String::as_str)
    }

    /// Number of trusted images
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns true if nothing is trusted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl Default for EscalationWhitelist {
    fn default() -> Self {
        Self::empty().with(DEFAULT_ESCALATE)
    }
}

impl<S: AsRef<str>> FromIterator<S> for EscalationWhitelist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::empty().with(iter)
    }
}

impl From<Vec<String>> for EscalationWhitelist {
    fn from(images: Vec<String>) -> Self {
        images.into_iter().collect()
    }
}

impl From<EscalationWhitelist> for Vec<String> {
    fn from(whitelist: EscalationWhitelist) -> Self {
        whitelist.images.into_iter().collect()
    }
}
