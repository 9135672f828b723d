//! `[images]` section configuration.
//!
//! Each transform bucket is keyed by the directory name its outputs are
//! written to; the empty key is the default bucket (outputs sit next to where
//! the source would be copied).

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `[images]` section in quill.toml.
///
/// # Example
/// ```toml
/// [images.transforms.""]
/// max_size = [5000, 5000]
///
/// [images.transforms.thumbnails]
/// include = ["*.jpg", "*.png", "*.pdf"]
/// exclude = ["icons/*"]
/// max_size = [400, 400]
/// output_types = ["webp", "original"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ImagesConfig {
    #[serde(default = "defaults::images::transforms")]
    #[educe(Default = defaults::images::transforms())]
    pub transforms: BTreeMap<String, TransformBucket>,
}

/// One named image output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct TransformBucket {
    /// Globs a source path must match (at least one).
    #[serde(default = "defaults::images::include")]
    #[educe(Default = defaults::images::include())]
    pub include: Vec<String>,

    /// Globs that disqualify a source path.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Maximum `[width, height]`; absent means "keep original size".
    #[serde(default)]
    pub max_size: Option<[u32; 2]>,

    /// `original` keeps the source format; anything else is a file extension.
    #[serde(default = "defaults::images::output_types")]
    #[educe(Default = defaults::images::output_types())]
    pub output_types: Vec<String>,
}
