//! `quill lint`: content checks without rendering.
//!
//! Runs the processor pipeline over a fresh context with dangling relations
//! dropped, then reports:
//!
//! - every `related_*` reference to a missing entry
//! - every renderable entry that no template would render
//! - every file a processor could not read
//!
//! Nothing is written to the output directory.

use crate::config::{RelationPolicy, SiteConfig, normalize_path};
use crate::context::{Context, EntryUri};
use crate::error::{BuildError, BuildReport};
use crate::imaging::RasterBackend;
use crate::log;
use crate::processors::Pipeline;
use crate::templates::{EntryTemplateMatcher, TemplateTree};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lint the whole site, or only the entries for `files`.
///
/// Returns the findings; an empty list means the site is clean.
pub fn lint_site(config: &SiteConfig, files: &[PathBuf]) -> Result<Vec<BuildError>> {
    let mut config = config.clone();
    config.build.relations = RelationPolicy::Drop;

    let mut pipeline = Pipeline::from_config(&config, Arc::new(RasterBackend))?;
    let mut ctx = Context::new(config.globals_json(), RelationPolicy::Drop);
    let mut report = BuildReport::default();
    pipeline.run(&mut ctx, None, &mut report)?;

    let mut findings = report.failures;
    findings.extend(ctx.dangling_relations());

    let tree = TemplateTree::scan(&config.build);
    let matcher = EntryTemplateMatcher::new(&tree);
    findings.extend(
        ctx.entries()
            .keys()
            .filter(|uri| uri.extension().is_some_and(|ext| config.build.is_renderable(ext)))
            .filter(|uri| matcher.template_for(uri).is_none())
            .map(|uri| BuildError::UnresolvedTemplate(uri.to_string())),
    );

    if !files.is_empty() {
        let selected: Vec<EntryUri> = files
            .iter()
            .map(|file| selected_uri(&config.build.content, file))
            .collect();
        findings.retain(|finding| {
            finding_uri(finding, &config.build.content)
                .is_some_and(|uri| selected.contains(&uri))
        });
    }

    for finding in &findings {
        log!("lint"; "{finding}");
    }
    log!("lint"; "{} entries checked, {} findings", ctx.len(), findings.len());
    Ok(findings)
}

/// Accept both content-relative uris and paths to files inside the content
/// directory.
fn selected_uri(content_root: &Path, file: &Path) -> EntryUri {
    let absolute = normalize_path(file);
    EntryUri::from_path(&absolute, content_root)
        .unwrap_or_else(|| EntryUri::new(&file.to_string_lossy()))
}

fn finding_uri(finding: &BuildError, content_root: &Path) -> Option<EntryUri> {
    match finding {
        BuildError::UnresolvedTemplate(uri)
        | BuildError::UnresolvedRelation { uri, .. }
        | BuildError::ProcessorContractViolation { uri, .. } => Some(EntryUri::new(uri)),
        BuildError::Collaborator { path, .. } => EntryUri::from_path(path, content_root),
        BuildError::ProcessorOrder { .. } => None,
    }
}
