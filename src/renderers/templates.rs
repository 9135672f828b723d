//! Template rendering driven by the [`RenderScheduler`].
//!
//! Tasks run one after another in queue order. In a fast incremental build,
//! unselected outputs that exist get their modification time refreshed.

use super::{KeptPaths, Renderer};
use crate::aggregator::ChangeSet;
use crate::config::BuildConfig;
use crate::context::Context;
use crate::error::{BuildError, BuildReport};
use crate::log;
use crate::scheduler::{RenderScheduler, RenderTask};
use crate::templates::{TemplateDependencyResolver, TemplateEngine, TemplateTree};
use crate::utils::minify::minify_output;
use crate::utils::path::ensure_parent;
use anyhow::{Context as _, Result};
use std::fs;
use std::path::Path;
use std::time::SystemTime;

pub struct TemplateRenderer {
    build: BuildConfig,
    /// Lives across rebuilds; edited templates are invalidated per batch.
    deps: TemplateDependencyResolver,
}

impl TemplateRenderer {
    pub fn new(build: &BuildConfig) -> Self {
        Self {
            build: build.clone(),
            deps: TemplateDependencyResolver::new(&build.templates),
        }
    }

    fn run_task(&self, engine: &TemplateEngine, task: &RenderTask, output: &Path) -> Result<()> {
        let html = match task {
            RenderTask::Entry { template, uri } => engine.render_entry(template, uri)?,
            RenderTask::Standalone { template } => engine.render_standalone(template)?,
        };
        let bytes = minify_output(output, html.as_bytes(), self.build.minify);
        ensure_parent(output)?;
        fs::write(output, bytes).with_context(|| format!("failed to write {}", output.display()))
    }
}

/// Refresh the modification time of an existing file.
fn touch(path: &Path) -> Result<()> {
    fs::File::options()
        .write(true)
        .open(path)
        .and_then(|file| file.set_modified(SystemTime::now()))
        .with_context(|| format!("failed to touch {}", path.display()))
}

impl Renderer for TemplateRenderer {
    fn name(&self) -> &'static str {
        "templates"
    }

    fn render(
        &mut self,
        ctx: &Context,
        changes: Option<&ChangeSet>,
        report: &mut BuildReport,
    ) -> Result<KeptPaths> {
        if changes.is_none() {
            self.deps.clear();
        }
        let tree = TemplateTree::scan(&self.build);
        let schedule = RenderScheduler::new(&self.build, &tree, &mut self.deps).schedule(ctx, changes);

        for uri in &schedule.unresolved {
            let err = BuildError::UnresolvedTemplate(uri.to_string());
            if self.build.strict_templates {
                report.fail(err);
            } else {
                log!("warn"; "{err}");
            }
        }

        let mut kept = KeptPaths::default();
        for task in &schedule.touch {
            let output = self.build.output.join(task.output_path());
            match touch(&output) {
                Ok(()) => report.touched += 1,
                Err(err) => report.fail(BuildError::collaborator(&output, err)),
            }
            kept.insert(output);
        }

        if !schedule.tasks.is_empty() {
            log!("render"; "{} tasks queued from {} templates", schedule.tasks.len(), tree.len());
        }
        let engine = TemplateEngine::new(&self.build.templates, ctx);
        for task in schedule.tasks.iter() {
            let output = self.build.output.join(task.output_path());
            match self.run_task(&engine, task, &output) {
                Ok(()) => {
                    report.rendered += 1;
                    kept.insert(output);
                }
                Err(err) => report.fail(BuildError::collaborator(&output, err)),
            }
        }
        Ok(kept)
    }
}
