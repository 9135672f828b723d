//! One site generator: context, pipeline and renderers for one config.
//!
//! The [`Context`] lives as long as the generator, so an incremental build
//! only recomputes entries touched by its batch. A full build resets it,
//! renders everything and then reconciles the output directory.
//!
//! ```text
//! build(changes)
//!   ├─ full?  reset context
//!   ├─ pipeline   stale → image → markdown → related
//!   ├─ renderers  assets, archives, image transforms, templates
//!   └─ full?  reconcile(output, kept)
//! ```

use crate::aggregator::ChangeSet;
use crate::config::SiteConfig;
use crate::context::Context;
use crate::error::BuildReport;
use crate::imaging::{ImageBackend, RasterBackend};
use crate::log;
use crate::processors::Pipeline;
use crate::reconcile::reconcile;
use crate::renderers::{self, Renderer};
use anyhow::{Context as _, Result};
use std::fs;
use std::sync::Arc;
use std::time::Instant;

pub struct Generator {
    config: SiteConfig,
    ctx: Context,
    pipeline: Pipeline,
    renderers: Vec<Box<dyn Renderer>>,
}

impl Generator {
    pub fn new(config: SiteConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(RasterBackend))
    }

    pub fn with_backend(config: SiteConfig, backend: Arc<dyn ImageBackend>) -> Result<Self> {
        let pipeline = Pipeline::from_config(&config, Arc::clone(&backend))?;
        let renderers = renderers::from_config(&config, backend);
        let ctx = Context::new(config.globals_json(), config.build.relations);
        Ok(Self {
            config,
            ctx,
            pipeline,
            renderers,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Whether a batch is built incrementally rather than from scratch.
    pub fn is_incremental(&self, changes: Option<&ChangeSet>) -> bool {
        changes.is_some() && self.config.build.fast_rebuilds
    }

    /// Build from scratch (`None`) or for one batch of changes.
    ///
    /// Without fast rebuilds every batch is a full build. Per-file failures
    /// end up in the report; an `Err` means the build itself was aborted.
    pub fn build(&mut self, changes: Option<&ChangeSet>) -> Result<BuildReport> {
        let started = Instant::now();
        let changes = if self.is_incremental(changes) { changes } else { None };
        let output = &self.config.build.output;
        fs::create_dir_all(output)
            .with_context(|| format!("failed to create {}", output.display()))?;

        let mut report = BuildReport::default();
        if changes.is_none() {
            self.ctx.reset();
        }
        self.pipeline.run(&mut self.ctx, changes, &mut report)?;
        let kept = renderers::render_all(&mut self.renderers, &self.ctx, changes, &mut report)?;

        if changes.is_none() {
            report.deleted = reconcile(&self.config.build.output, &kept)?.len();
        }

        let mode = if changes.is_some() { "incremental" } else { "full" };
        log!("build"; "{mode} build: {} in {:.2?}", report.summary(), started.elapsed());
        Ok(report)
    }
}
