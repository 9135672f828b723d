//! Planning derived image files.
//!
//! Planning is pure: it looks only at the source path and the bucket table.

use super::{ext_of, is_pdf, is_svg, mimetype_for};
use crate::config::TransformBucket;
use crate::utils::glob::any_match;
use serde::Serialize;
use std::collections::BTreeMap;

/// One derived file of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTransform {
    /// Bucket key; empty for the default bucket.
    pub bucket: String,
    /// Source path relative to the content root.
    pub input: String,
    /// Output path relative to the output root.
    pub output: String,
    pub max_size: Option<(u32, u32)>,
    pub mimetype: &'static str,
    pub is_default: bool,
}

/// What producing a planned output involves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOp {
    Copy,
    Resize,
    PdfThumbnail,
}

impl PlannedTransform {
    pub fn op(&self) -> TransformOp {
        let output_ext = ext_of(&self.output);
        if is_pdf(&self.input) {
            if output_ext == "pdf" {
                TransformOp::Copy
            } else {
                TransformOp::PdfThumbnail
            }
        } else if is_svg(&self.input) {
            TransformOp::Copy
        } else {
            TransformOp::Resize
        }
    }
}

/// Outputs `input` produces under `table`, bucket by bucket.
///
/// A bucket applies when one include glob matches and no exclude glob does.
/// Output types resolving to the same suffix are planned once. SVG sources
/// only ever produce SVG outputs.
pub fn transforms_for<'a>(
    input: &'a str,
    table: &'a BTreeMap<String, TransformBucket>,
) -> impl Iterator<Item = PlannedTransform> + 'a {
    let source_ext = ext_of(input);
    let (parent, stem) = split_parent_stem(input);

    table
        .iter()
        .filter(move |(_, bucket)| {
            any_match(&bucket.include, input) && !any_match(&bucket.exclude, input)
        })
        .flat_map(move |(key, bucket)| {
            let mut seen: Vec<String> = Vec::new();
            let source_ext = source_ext.clone();
            bucket.output_types.iter().filter_map(move |ty| {
                let ext = if ty.eq_ignore_ascii_case("original") {
                    source_ext.clone()
                } else {
                    ty.to_ascii_lowercase()
                };
                if source_ext == "svg" && ext != "svg" {
                    return None;
                }
                if seen.contains(&ext) {
                    return None;
                }
                seen.push(ext.clone());

                let output = [parent, key.as_str(), &format!("{stem}.{ext}")]
                    .into_iter()
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join("/");

                Some(PlannedTransform {
                    bucket: key.clone(),
                    input: input.to_string(),
                    output,
                    max_size: bucket.max_size.map(|[w, h]| (w, h)),
                    mimetype: mimetype_for(&ext),
                    is_default: key.is_empty(),
                })
            })
        })
}

/// The default-bucket variant, if the table has one for this source.
pub fn default_transform(
    input: &str,
    table: &BTreeMap<String, TransformBucket>,
) -> Option<PlannedTransform> {
    transforms_for(input, table).find(|t| t.is_default)
}

fn split_parent_stem(path: &str) -> (&str, &str) {
    let (parent, name) = path.rsplit_once('/').unwrap_or(("", path));
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    (parent, stem)
}
