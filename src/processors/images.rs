//! Image facts: pixel size and planned derivatives.

use super::EntryProcessor;
use crate::config::TransformBucket;
use crate::context::{Entry, EntryUri};
use crate::imaging::{ImageBackend, default_transform, is_raster_image, is_transformable, transforms_for};
use anyhow::{Context as _, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

pub struct ImageProcessor {
    content_root: PathBuf,
    transforms: BTreeMap<String, TransformBucket>,
    backend: Arc<dyn ImageBackend>,
}

impl ImageProcessor {
    pub fn new(
        content_root: impl Into<PathBuf>,
        transforms: BTreeMap<String, TransformBucket>,
        backend: Arc<dyn ImageBackend>,
    ) -> Self {
        Self {
            content_root: content_root.into(),
            transforms,
            backend,
        }
    }
}

impl EntryProcessor for ImageProcessor {
    fn name(&self) -> &'static str {
        "image"
    }

    fn process_entry(&mut self, uri: &EntryUri, mut entry: Entry) -> Result<Option<Entry>> {
        let rel = uri.as_str();
        if is_raster_image(rel) {
            let dims = self
                .backend
                .identify(&uri.source_path(&self.content_root))
                .context("failed to read image size")?;
            entry.insert("width", dims.width);
            entry.insert("height", dims.height);
        }
        if is_transformable(rel) {
            let planned: Vec<_> = transforms_for(rel, &self.transforms).collect();
            entry.insert("transforms", serde_json::to_value(planned)?);
            // Without a default bucket the entry simply has no `src`
            if let Some(default) = default_transform(rel, &self.transforms) {
                entry.insert("src", default.output);
            }
        }
        Ok(Some(entry))
    }
}
