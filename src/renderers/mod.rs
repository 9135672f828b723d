//! Output producers.
//!
//! Each [`Renderer`] writes its part of the output tree and returns every
//! output path it wrote or chose to keep. After a full build, the union of
//! those sets is all that survives reconciliation, so a path missing from it
//! is deleted and a path wrongly in it leaks.

mod assets;
mod images;
mod templates;

pub use self::assets::{ArchiveRenderer, StaticAssetRenderer};
pub use self::images::ImageTransformRenderer;
pub use self::templates::TemplateRenderer;

use crate::aggregator::ChangeSet;
use crate::config::{RendererKind, SiteConfig};
use crate::context::Context;
use crate::error::BuildReport;
use crate::imaging::ImageBackend;
use crate::log;
use anyhow::Result;
use rustc_hash::FxHashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Absolute output paths produced or kept by a build.
pub type KeptPaths = FxHashSet<PathBuf>;

pub trait Renderer {
    fn name(&self) -> &'static str;

    /// Produce outputs for a cold build (`None`) or one batch of changes.
    fn render(
        &mut self,
        ctx: &Context,
        changes: Option<&ChangeSet>,
        report: &mut BuildReport,
    ) -> Result<KeptPaths>;
}

/// Assemble the configured renderers, in order.
pub fn from_config(config: &SiteConfig, backend: Arc<dyn ImageBackend>) -> Vec<Box<dyn Renderer>> {
    config
        .build
        .renderers
        .iter()
        .map(|kind| -> Box<dyn Renderer> {
            match kind {
                RendererKind::StaticAssets => Box::new(StaticAssetRenderer::new(&config.build)),
                RendererKind::Archives => Box::new(ArchiveRenderer::new(&config.build)),
                RendererKind::ImageTransforms => Box::new(ImageTransformRenderer::new(
                    &config.build,
                    config.images.transforms.clone(),
                    Arc::clone(&backend),
                )),
                RendererKind::Templates => Box::new(TemplateRenderer::new(&config.build)),
            }
        })
        .collect()
}

/// Run every renderer and union what they keep.
pub fn render_all(
    renderers: &mut [Box<dyn Renderer>],
    ctx: &Context,
    changes: Option<&ChangeSet>,
    report: &mut BuildReport,
) -> Result<KeptPaths> {
    let mut kept = KeptPaths::default();
    for renderer in renderers.iter_mut() {
        let produced = renderer.render(ctx, changes, report)?;
        log!("render"; "{}: {} outputs", renderer.name(), produced.len());
        kept.extend(produced);
    }
    Ok(kept)
}
