//! Context processors.
//!
//! A [`Pipeline`] runs its processors in configured order over one
//! [`Context`]. Whole-context processors implement [`ContextProcessor`]
//! directly. Per-entry processors implement [`EntryProcessor`] and are wrapped
//! in [`PerEntry`], which visits every content file on a cold build and only
//! the changed ones otherwise.
//!
//! Ordering contract: `stale` runs before anything that reads entries, and
//! `markdown` before `related`, since relation checks read the fields markdown
//! writes.

mod images;
mod markdown;
mod related;
mod stale;

pub use self::images::ImageProcessor;
pub use self::markdown::MarkdownProcessor;
pub use self::related::RelatedProcessor;
pub use self::stale::StaleProcessor;

use crate::aggregator::ChangeSet;
use crate::config::{ProcessorKind, SiteConfig};
use crate::context::{Context, Entry, EntryUri};
use crate::error::{BuildError, BuildReport};
use crate::imaging::ImageBackend;
use crate::log;
use crate::utils::path::{collect_all_files, is_ignored};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub trait ContextProcessor {
    fn name(&self) -> &'static str;

    /// Update `ctx` for a cold build (`None`) or one batch of changes.
    fn process(
        &mut self,
        ctx: &mut Context,
        changes: Option<&ChangeSet>,
        report: &mut BuildReport,
    ) -> Result<()>;
}

pub trait EntryProcessor {
    fn name(&self) -> &'static str;

    /// Add fields to one entry.
    ///
    /// `Ok(None)` breaks the processor contract and aborts the build. `Err` is
    /// a failure of this file only.
    fn process_entry(&mut self, uri: &EntryUri, entry: Entry) -> Result<Option<Entry>>;
}

/// Drives an [`EntryProcessor`] over the entries a build touches.
pub struct PerEntry<P> {
    inner: P,
    content_root: PathBuf,
}

impl<P: EntryProcessor> PerEntry<P> {
    pub fn new(inner: P, content_root: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            content_root: content_root.into(),
        }
    }
}

/// Uris of the content files a build visits, in path order.
pub fn entry_uris(content_root: &Path, changes: Option<&ChangeSet>) -> Vec<EntryUri> {
    let files: Vec<PathBuf> = match changes {
        None => collect_all_files(content_root),
        Some(changes) => changes
            .under(content_root)
            .filter(|p| p.is_file())
            .map(Path::to_path_buf)
            .collect(),
    };
    files
        .iter()
        .filter_map(|path| EntryUri::from_path(path, content_root))
        .filter(|uri| !is_ignored(Path::new(uri.as_str())))
        .collect()
}

impl<P: EntryProcessor> ContextProcessor for PerEntry<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn process(
        &mut self,
        ctx: &mut Context,
        changes: Option<&ChangeSet>,
        report: &mut BuildReport,
    ) -> Result<()> {
        for uri in entry_uris(&self.content_root, changes) {
            let entry = ctx.take_or_default(&uri);
            let previous = entry.clone();

            match self.inner.process_entry(&uri, entry) {
                Ok(Some(entry)) => {
                    ctx.set_failed(&uri, self.inner.name(), false);
                    ctx.insert(uri, entry);
                }
                Ok(None) => {
                    return Err(BuildError::ProcessorContractViolation {
                        processor: self.inner.name(),
                        uri: uri.to_string(),
                    }
                    .into());
                }
                Err(err) => {
                    report.fail(BuildError::collaborator(uri.source_path(&self.content_root), err));
                    ctx.set_failed(&uri, self.inner.name(), true);
                    ctx.insert(uri, previous);
                }
            }
        }
        Ok(())
    }
}

/// Pairs `(earlier, later)` that must keep this relative order when both are
/// configured.
const ORDER: &[(ProcessorKind, ProcessorKind)] = &[
    (ProcessorKind::Stale, ProcessorKind::Image),
    (ProcessorKind::Stale, ProcessorKind::Markdown),
    (ProcessorKind::Stale, ProcessorKind::Related),
    (ProcessorKind::Markdown, ProcessorKind::Related),
];

pub fn check_order(kinds: &[ProcessorKind]) -> Result<(), BuildError> {
    let position = |kind| kinds.iter().position(|k| *k == kind);
    for &(earlier, later) in ORDER {
        if let (Some(e), Some(l)) = (position(earlier), position(later))
            && l < e
        {
            return Err(BuildError::ProcessorOrder {
                earlier: earlier.name(),
                later: later.name(),
            });
        }
    }
    Ok(())
}

pub struct Pipeline {
    processors: Vec<Box<dyn ContextProcessor>>,
}

impl Pipeline {
    pub fn new(processors: Vec<Box<dyn ContextProcessor>>) -> Self {
        Self { processors }
    }

    /// Assemble the configured processors.
    pub fn from_config(config: &SiteConfig, backend: Arc<dyn ImageBackend>) -> Result<Self> {
        check_order(&config.build.processors)?;
        let content = &config.build.content;

        let processors = config
            .build
            .processors
            .iter()
            .map(|kind| -> Box<dyn ContextProcessor> {
                match kind {
                    ProcessorKind::Stale => Box::new(StaleProcessor::new(content)),
                    ProcessorKind::Image => Box::new(PerEntry::new(
                        ImageProcessor::new(
                            content,
                            config.images.transforms.clone(),
                            Arc::clone(&backend),
                        ),
                        content,
                    )),
                    ProcessorKind::Markdown => Box::new(PerEntry::new(
                        MarkdownProcessor::new(content, config.site.clone()),
                        content,
                    )),
                    ProcessorKind::Related => Box::new(RelatedProcessor),
                }
            })
            .collect();
        Ok(Self::new(processors))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    pub fn run(
        &mut self,
        ctx: &mut Context,
        changes: Option<&ChangeSet>,
        report: &mut BuildReport,
    ) -> Result<()> {
        for processor in &mut self.processors {
            log!("context"; "{}", processor.name());
            processor.process(ctx, changes, report)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Title;

    impl EntryProcessor for Title {
        fn name(&self) -> &'static str {
            "title"
        }

        fn process_entry(&mut self, uri: &EntryUri, mut entry: Entry) -> Result<Option<Entry>> {
            anyhow::ensure!(uri.stem() != "broken", "cannot read");
            entry.insert("title", uri.stem());
            Ok(Some(entry))
        }
    }

    struct Forgetful;

    impl EntryProcessor for Forgetful {
        fn name(&self) -> &'static str {
            "forgetful"
        }

        fn process_entry(&mut self, _: &EntryUri, _: Entry) -> Result<Option<Entry>> {
            Ok(None)
        }
    }

    fn content_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("blog")).unwrap();
        fs::write(dir.path().join("blog/a.md"), "a").unwrap();
        fs::write(dir.path().join("blog/b.md"), "b").unwrap();
        fs::write(dir.path().join("index.md"), "i").unwrap();
        dir
    }

    #[test]
    fn test_cold_build_visits_every_file() {
        let dir = content_tree();
        let mut ctx = Context::default();
        let mut report = BuildReport::default();

        PerEntry::new(Title, dir.path())
            .process(&mut ctx, None, &mut report)
            .unwrap();

        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.get("blog/a.md").unwrap().str_field("title"), Some("a"));
    }

    #[test]
    fn test_incremental_visits_changed_files_only() {
        let dir = content_tree();
        let mut ctx = Context::default();
        let mut report = BuildReport::default();
        let changes: ChangeSet = [dir.path().join("blog/b.md"), dir.path().join("gone.md")]
            .into_iter()
            .collect();

        PerEntry::new(Title, dir.path())
            .process(&mut ctx, Some(&changes), &mut report)
            .unwrap();

        let uris: Vec<_> = ctx.entries().keys().map(|u| u.as_str()).collect();
        assert_eq!(uris, vec!["blog/b.md"]);
    }

    #[test]
    fn test_per_file_failure_is_reported() {
        let dir = content_tree();
        fs::write(dir.path().join("broken.md"), "x").unwrap();
        let mut ctx = Context::default();
        let mut report = BuildReport::default();

        PerEntry::new(Title, dir.path())
            .process(&mut ctx, None, &mut report)
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        // The entry keeps whatever it had before the failed step
        assert!(ctx.get("broken.md").unwrap().is_empty());
        assert_eq!(ctx.len(), 4);
        assert!(ctx.is_failed("broken.md"));
        assert!(!ctx.is_failed("blog/a.md"));
    }

    struct Flaky {
        fail: bool,
    }

    impl EntryProcessor for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn process_entry(&mut self, _: &EntryUri, entry: Entry) -> Result<Option<Entry>> {
            anyhow::ensure!(!self.fail, "read error");
            Ok(Some(entry))
        }
    }

    #[test]
    fn test_retried_file_is_no_longer_failed() {
        let dir = content_tree();
        let mut ctx = Context::default();
        let mut report = BuildReport::default();
        let mut processor = PerEntry::new(Flaky { fail: true }, dir.path());

        processor.process(&mut ctx, None, &mut report).unwrap();
        assert!(ctx.is_failed("blog/a.md"));

        processor.inner.fail = false;
        let changes: ChangeSet = [dir.path().join("blog/a.md")].into_iter().collect();
        processor.process(&mut ctx, Some(&changes), &mut report).unwrap();
        assert!(!ctx.is_failed("blog/a.md"));
        assert!(ctx.is_failed("blog/b.md"));
    }

    #[test]
    fn test_missing_entry_is_contract_violation() {
        let dir = content_tree();
        let mut ctx = Context::default();
        let mut report = BuildReport::default();

        let err = PerEntry::new(Forgetful, dir.path())
            .process(&mut ctx, None, &mut report)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::ProcessorContractViolation { processor: "forgetful", .. })
        ));
    }

    #[test]
    fn test_check_order() {
        use ProcessorKind::*;
        assert!(check_order(&[Stale, Image, Markdown, Related]).is_ok());
        assert!(check_order(&[Markdown, Image]).is_ok());
        assert!(check_order(&[Related]).is_ok());

        let err = check_order(&[Stale, Related, Markdown]).unwrap_err();
        assert_eq!(err.to_string(), "processor `related` must run after `markdown`");
        assert!(check_order(&[Markdown, Stale]).is_err());
    }

    #[test]
    fn test_pipeline_from_config() {
        let dir = content_tree();
        let mut config = SiteConfig::default();
        config.resolve_paths(dir.path());
        config.build.content = dir.path().to_path_buf();

        let pipeline =
            Pipeline::from_config(&config, Arc::new(crate::imaging::RasterBackend)).unwrap();
        assert_eq!(pipeline.names(), vec!["stale", "image", "markdown", "related"]);
    }
}
