//! Build error taxonomy and the per-build report.
//!
//! Fatality is decided where an error is raised: fatal errors are returned as
//! `Err`, per-file failures are pushed into the [`BuildReport`] and the build
//! carries on.

use crate::log;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// A renderable entry has no template.
    #[error("no template renders entry `{0}`")]
    UnresolvedTemplate(String),

    /// A per-entry processor produced no entry. Always a programming error.
    #[error("processor `{processor}` returned no entry for `{uri}`")]
    ProcessorContractViolation { processor: &'static str, uri: String },

    /// Reading, rendering or transforming a single file failed.
    #[error("`{path}`: {message}")]
    Collaborator { path: PathBuf, message: String },

    /// A `related_*` field names an entry that does not exist.
    #[error("`{uri}` field `{field}` references missing entry `{target}`")]
    UnresolvedRelation {
        uri: String,
        field: String,
        target: String,
    },

    #[error("processor `{later}` must run after `{earlier}`")]
    ProcessorOrder {
        earlier: &'static str,
        later: &'static str,
    },
}

impl BuildError {
    pub fn collaborator(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Collaborator {
            path: path.into(),
            message: format!("{err:#}"),
        }
    }
}

/// What one build cycle did.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub rendered: usize,
    pub touched: usize,
    pub copied: usize,
    pub deleted: usize,
    /// Non-fatal failures; the affected outputs were not produced this cycle.
    pub failures: Vec<BuildError>,
}

impl BuildReport {
    /// Log and record a per-file failure.
    pub fn fail(&mut self, err: BuildError) {
        log!("error"; "{err}");
        self.failures.push(err);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rendered, {} touched, {} copied, {} deleted, {} failed",
            self.rendered,
            self.touched,
            self.copied,
            self.deleted,
            self.failures.len()
        )
    }
}
