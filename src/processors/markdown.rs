//! Markdown entries: body, metadata, outline and url.

use super::EntryProcessor;
use crate::config::SiteSection;
use crate::context::{Entry, EntryUri, is_relation_field};
use crate::markup::{CommonMark, MarkupRenderer, Metadata};
use anyhow::{Context as _, Result, bail};
use chrono::NaiveDate;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

const DATE_PREFIX: &str = "date_";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct MarkdownProcessor<R = CommonMark> {
    content_root: PathBuf,
    site: SiteSection,
    renderer: R,
}

impl MarkdownProcessor {
    pub fn new(content_root: impl Into<PathBuf>, site: SiteSection) -> Self {
        Self::with_renderer(content_root, site, CommonMark::default())
    }
}

impl<R: MarkupRenderer> MarkdownProcessor<R> {
    pub fn with_renderer(content_root: impl Into<PathBuf>, site: SiteSection, renderer: R) -> Self {
        Self {
            content_root: content_root.into(),
            site,
            renderer,
        }
    }
}

/// Turn raw header values into entry fields.
///
/// One value becomes a scalar, several a list. `date_*` values must be
/// `YYYY-MM-DD`. `related_*` values are split on commas into uris.
pub fn parse_metadata(raw: &Metadata) -> Result<Vec<(String, Value)>> {
    let mut fields = Vec::with_capacity(raw.len());
    for (key, values) in raw {
        let values: Vec<String> = if is_relation_field(key) {
            values
                .iter()
                .flat_map(|v| v.split(','))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect()
        } else {
            values.clone()
        };

        if key.starts_with(DATE_PREFIX) {
            for value in &values {
                if NaiveDate::parse_from_str(value, DATE_FORMAT).is_err() {
                    bail!("`{key}` value `{value}` is not a YYYY-MM-DD date");
                }
            }
        }

        let value = match values.len() {
            0 => continue,
            1 => Value::from(values.into_iter().next().unwrap_or_default()),
            _ => Value::from(values),
        };
        fields.push((key.clone(), value));
    }
    Ok(fields)
}

impl<R: MarkupRenderer> EntryProcessor for MarkdownProcessor<R> {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn process_entry(&mut self, uri: &EntryUri, mut entry: Entry) -> Result<Option<Entry>> {
        if uri.extension() != Some("md") {
            return Ok(Some(entry));
        }

        let path = uri.source_path(&self.content_root);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let rendered = self.renderer.render(&text);

        for (key, value) in parse_metadata(&rendered.metadata)? {
            entry.insert(key, value);
        }
        entry.insert("body", rendered.html);
        entry.insert("table_of_contents", serde_json::to_value(&rendered.toc)?);
        entry.insert(
            "url",
            self.site
                .url_for(&uri.with_suffix(&self.site.html_url_extension)),
        );
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_front_matter;
    use serde_json::json;
    use tempfile::TempDir;

    fn site() -> SiteSection {
        SiteSection {
            url: "https://example.com".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_metadata_shapes() {
        let (raw, _) = parse_front_matter(
            "title: Hello\ntags: a\n    b\ndate_posted: 2024-02-29\nrelated_posts: x.md, y.md\nrelated_one: z.md\n\n",
        );
        let fields: std::collections::BTreeMap<_, _> = parse_metadata(&raw).unwrap().into_iter().collect();

        assert_eq!(fields["title"], json!("Hello"));
        assert_eq!(fields["tags"], json!(["a", "b"]));
        assert_eq!(fields["date_posted"], json!("2024-02-29"));
        assert_eq!(fields["related_posts"], json!(["x.md", "y.md"]));
        assert_eq!(fields["related_one"], json!("z.md"));
    }

    #[test]
    fn test_related_values_across_lines() {
        let (raw, _) = parse_front_matter("related_posts: a.md,\n    b.md\n\n");
        let fields = parse_metadata(&raw).unwrap();
        assert_eq!(fields, vec![("related_posts".to_string(), json!(["a.md", "b.md"]))]);
    }

    #[test]
    fn test_invalid_date() {
        let (raw, _) = parse_front_matter("date_posted: 2024-13-01\n\n");
        let err = parse_metadata(&raw).unwrap_err();
        assert!(err.to_string().contains("date_posted"));
    }

    #[test]
    fn test_process_markdown_entry() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("blog")).unwrap();
        fs::write(
            dir.path().join("blog/hello.md"),
            "title: Hello\nrelated_posts: blog/bye.md\n\n# Hi there\n\nText.\n",
        )
        .unwrap();

        let mut processor = MarkdownProcessor::new(dir.path(), site());
        let entry = processor
            .process_entry(&EntryUri::new("blog/hello.md"), Entry::new())
            .unwrap()
            .unwrap();

        assert_eq!(entry.str_field("title"), Some("Hello"));
        assert_eq!(entry.str_field("related_posts"), Some("blog/bye.md"));
        assert_eq!(entry.str_field("url"), Some("https://example.com/blog/hello.html"));
        assert!(entry.str_field("body").unwrap().contains("<h1 id=\"hi-there\">Hi there</h1>"));
        assert_eq!(entry.get("table_of_contents").unwrap()[0]["id"], "hi-there");
    }

    #[test]
    fn test_non_markdown_passes_through() {
        let mut processor = MarkdownProcessor::new("/nowhere", site());
        let mut entry = Entry::new();
        entry.insert("width", 10);
        let out = processor
            .process_entry(&EntryUri::new("a.png"), entry.clone())
            .unwrap()
            .unwrap();
        assert_eq!(out, entry);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut processor = MarkdownProcessor::new("/nowhere", site());
        assert!(processor.process_entry(&EntryUri::new("a.md"), Entry::new()).is_err());
    }
}
