//! Pruning entries whose source file is gone.
//!
//! Entries of changed files that still exist are emptied instead, so later
//! processors rebuild them without fields the file no longer produces.

use super::ContextProcessor;
use crate::aggregator::ChangeSet;
use crate::context::{Context, Entry, EntryUri};
use crate::error::BuildReport;
use crate::log;
use anyhow::Result;
use std::path::PathBuf;

pub struct StaleProcessor {
    content_root: PathBuf,
}

impl StaleProcessor {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
        }
    }
}

impl ContextProcessor for StaleProcessor {
    fn name(&self) -> &'static str {
        "stale"
    }

    fn process(
        &mut self,
        ctx: &mut Context,
        changes: Option<&ChangeSet>,
        _report: &mut BuildReport,
    ) -> Result<()> {
        let Some(changes) = changes else {
            return Ok(());
        };

        for path in changes.under(&self.content_root) {
            let Some(gone) = EntryUri::from_path(path, &self.content_root) else {
                continue;
            };
            if path.is_file() {
                if let Some(entry) = ctx.get_mut(gone.as_str()) {
                    *entry = Entry::new();
                }
                continue;
            }
            if path.exists() {
                continue;
            }
            // A deleted directory takes every entry below it along
            let stale: Vec<EntryUri> = ctx
                .entries()
                .keys()
                .filter(|uri| *uri == &gone || uri.in_namespace(gone.as_str()))
                .cloned()
                .collect();
            for uri in stale {
                log!("context"; "dropping {uri}");
                ctx.remove(uri.as_str());
            }
        }
        Ok(())
    }
}
