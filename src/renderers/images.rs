//! Image and PDF derivatives from the transform table.
//!
//! Outputs are cached by existence only: a derivative already on disk is kept
//! as is, even when its source has changed since.

use super::{KeptPaths, Renderer};
use crate::aggregator::ChangeSet;
use crate::config::{BuildConfig, TransformBucket};
use crate::context::{Context, EntryUri};
use crate::error::{BuildError, BuildReport};
use crate::imaging::{ImageBackend, PlannedTransform, TransformOp, is_transformable, transforms_for};
use crate::utils::path::{collect_all_files, copy_file, is_ignored};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct ImageTransformRenderer {
    content_root: PathBuf,
    output_root: PathBuf,
    transforms: BTreeMap<String, TransformBucket>,
    backend: Arc<dyn ImageBackend>,
}

impl ImageTransformRenderer {
    pub fn new(
        build: &BuildConfig,
        transforms: BTreeMap<String, TransformBucket>,
        backend: Arc<dyn ImageBackend>,
    ) -> Self {
        Self {
            content_root: build.content.clone(),
            output_root: build.output.clone(),
            transforms,
            backend,
        }
    }

    fn produce(&self, planned: &PlannedTransform, input: &Path, output: &Path) -> Result<()> {
        match planned.op() {
            TransformOp::Copy => copy_file(input, output)?,
            TransformOp::Resize => self.backend.resize_to_fit(input, output, planned.max_size)?,
            TransformOp::PdfThumbnail => {
                self.backend
                    .first_page_thumbnail(input, output, planned.max_size)?
            }
        }
        Ok(())
    }
}

impl Renderer for ImageTransformRenderer {
    fn name(&self) -> &'static str {
        "image_transforms"
    }

    fn render(
        &mut self,
        _ctx: &Context,
        _changes: Option<&ChangeSet>,
        report: &mut BuildReport,
    ) -> Result<KeptPaths> {
        let mut kept = KeptPaths::default();
        let sources = collect_all_files(&self.content_root)
            .into_iter()
            .filter_map(|path| EntryUri::from_path(&path, &self.content_root))
            .filter(|uri| is_transformable(uri.as_str()) && !is_ignored(Path::new(uri.as_str())));

        for uri in sources {
            let input = uri.source_path(&self.content_root);
            for planned in transforms_for(uri.as_str(), &self.transforms) {
                let output = self.output_root.join(&planned.output);
                if !output.exists() {
                    if let Err(err) = self.produce(&planned, &input, &output) {
                        report.fail(BuildError::collaborator(&input, err));
                        continue;
                    }
                    report.copied += 1;
                }
                kept.insert(output);
            }
        }
        Ok(kept)
    }
}
