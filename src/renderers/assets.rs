//! Files copied verbatim: template-tree assets and content archives.
//!
//! A cold build copies every source. An incremental build copies changed
//! sources and sources whose output is missing. Either way every existing
//! source's output is kept.

use super::{KeptPaths, Renderer};
use crate::aggregator::ChangeSet;
use crate::config::BuildConfig;
use crate::context::Context;
use crate::error::{BuildError, BuildReport};
use crate::templates::is_template;
use crate::utils::path::{collect_all_files, copy_file, is_partial};
use anyhow::Result;
use std::path::{Path, PathBuf};

struct Copier {
    source_root: PathBuf,
    output_root: PathBuf,
}

impl Copier {
    fn copy(
        &self,
        sources: impl Iterator<Item = PathBuf>,
        changes: Option<&ChangeSet>,
        report: &mut BuildReport,
    ) -> KeptPaths {
        let mut kept = KeptPaths::default();
        for src in sources {
            let Ok(rel) = src.strip_prefix(&self.source_root) else {
                continue;
            };
            let dst = self.output_root.join(rel);
            let stale = changes.is_none_or(|c| c.contains(&src) || !dst.exists());
            if stale {
                if let Err(err) = copy_file(&src, &dst) {
                    report.fail(BuildError::collaborator(&src, err));
                    continue;
                }
                report.copied += 1;
            }
            kept.insert(dst);
        }
        kept
    }
}

/// Non-template, non-partial files of the template tree (css, fonts, ...).
pub struct StaticAssetRenderer {
    copier: Copier,
    build: BuildConfig,
}

impl StaticAssetRenderer {
    pub fn new(build: &BuildConfig) -> Self {
        Self {
            copier: Copier {
                source_root: build.templates.clone(),
                output_root: build.output.clone(),
            },
            build: build.clone(),
        }
    }

    fn is_asset(&self, path: &Path) -> bool {
        !is_template(&self.build, path) && !is_partial(path)
    }
}

impl Renderer for StaticAssetRenderer {
    fn name(&self) -> &'static str {
        "static_assets"
    }

    fn render(
        &mut self,
        _ctx: &Context,
        changes: Option<&ChangeSet>,
        report: &mut BuildReport,
    ) -> Result<KeptPaths> {
        let sources = collect_all_files(&self.build.templates)
            .into_iter()
            .filter(|path| self.is_asset(path));
        Ok(self.copier.copy(sources, changes, report))
    }
}

/// Archive files of the content tree, per `build.archive_extensions`.
pub struct ArchiveRenderer {
    copier: Copier,
    build: BuildConfig,
}

impl ArchiveRenderer {
    pub fn new(build: &BuildConfig) -> Self {
        Self {
            copier: Copier {
                source_root: build.content.clone(),
                output_root: build.output.clone(),
            },
            build: build.clone(),
        }
    }
}

impl Renderer for ArchiveRenderer {
    fn name(&self) -> &'static str {
        "archives"
    }

    fn render(
        &mut self,
        _ctx: &Context,
        changes: Option<&ChangeSet>,
        report: &mut BuildReport,
    ) -> Result<KeptPaths> {
        let sources = collect_all_files(&self.build.content).into_iter().filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| self.build.is_archive_ext(ext))
        });
        Ok(self.copier.copy(sources, changes, report))
    }
}
