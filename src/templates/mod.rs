//! Template tree: naming rules, dependency scanning, matching and rendering.
//!
//! A template is any file under the template root whose extension is listed in
//! `build.template_extensions`. A trailing `.jinja` is stripped to get the
//! output name, so `feed.xml.jinja` renders `feed.xml`. Files whose name
//! starts with `_` are partials: tracked as dependencies, never rendered.

pub mod deps;
pub mod engine;
pub mod matcher;

pub use deps::TemplateDependencyResolver;
pub use engine::TemplateEngine;
pub use matcher::EntryTemplateMatcher;

use crate::config::BuildConfig;
use crate::utils::path::{collect_all_files, rel_uri};
use rustc_hash::FxHashMap;
use std::fmt;
use std::path::{Path, PathBuf};

const JINJA_SUFFIX: &str = ".jinja";
const GENERIC_ENTRY_STEM: &str = "entry";

/// Slash-separated template path relative to the template root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateRef(String);

impl TemplateRef {
    pub fn new(raw: &str) -> Self {
        let normalized = raw
            .split(['/', '\\'])
            .filter(|seg| !seg.is_empty() && *seg != ".")
            .collect::<Vec<_>>()
            .join("/");
        Self(normalized)
    }

    pub fn from_path(path: &Path, templates_root: &Path) -> Option<Self> {
        rel_uri(path, templates_root).map(|rel| Self::new(&rel))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn source_path(&self, templates_root: &Path) -> PathBuf {
        templates_root.join(&self.0)
    }

    /// Directory part, `""` at the template root.
    pub fn parent(&self) -> &str {
        self.0.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit_once('/').map_or(&self.0, |(_, name)| name)
    }

    pub fn is_partial(&self) -> bool {
        self.file_name().starts_with('_')
    }

    /// Relative output path of a standalone template.
    pub fn output_path(&self) -> &str {
        self.0.strip_suffix(JINJA_SUFFIX).unwrap_or(&self.0)
    }

    fn output_name(&self) -> &str {
        let name = self.file_name();
        name.strip_suffix(JINJA_SUFFIX).unwrap_or(name)
    }

    /// Output name without its extension: `entry` for `entry.html.jinja`.
    pub fn stem(&self) -> &str {
        let name = self.output_name();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    /// Extension of the rendered file, dot included, `""` if none.
    pub fn output_suffix(&self) -> &str {
        let name = self.output_name();
        match name.rfind('.') {
            Some(0) | None => "",
            Some(i) => &name[i..],
        }
    }

    pub fn is_generic_entry(&self) -> bool {
        self.stem() == GENERIC_ENTRY_STEM
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every template under the template root, in path order.
#[derive(Debug, Clone, Default)]
pub struct TemplateTree {
    root: PathBuf,
    templates: Vec<TemplateRef>,
    by_dir: FxHashMap<String, Vec<usize>>,
}

impl TemplateTree {
    pub fn scan(build: &BuildConfig) -> Self {
        let root = &build.templates;
        let templates = collect_all_files(root)
            .iter()
            .filter(|path| is_template(build, path))
            .filter_map(|path| TemplateRef::from_path(path, root))
            .collect();
        Self::from_refs(root.clone(), templates)
    }

    pub fn from_refs(root: PathBuf, mut templates: Vec<TemplateRef>) -> Self {
        templates.sort();
        templates.dedup();
        let mut by_dir: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (i, template) in templates.iter().enumerate() {
            by_dir.entry(template.parent().to_string()).or_default().push(i);
        }
        Self {
            root,
            templates,
            by_dir,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateRef> {
        self.templates.iter()
    }

    /// Templates directly inside `dir`.
    pub fn in_dir<'a>(&'a self, dir: &str) -> impl Iterator<Item = &'a TemplateRef> + 'a {
        self.by_dir
            .get(dir)
            .into_iter()
            .flatten()
            .map(|&i| &self.templates[i])
    }

    pub fn contains(&self, template: &TemplateRef) -> bool {
        self.templates.binary_search(template).is_ok()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Whether a file under the template root is a template rather than an asset.
pub fn is_template(build: &BuildConfig, path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| build.is_template_ext(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_template_ref_naming() {
        let t = TemplateRef::new("blog/entry.html.jinja");
        assert_eq!(t.parent(), "blog");
        assert_eq!(t.stem(), "entry");
        assert_eq!(t.output_suffix(), ".html");
        assert_eq!(t.output_path(), "blog/entry.html");
        assert!(t.is_generic_entry());

        let t = TemplateRef::new("./_layout.html");
        assert_eq!(t.as_str(), "_layout.html");
        assert_eq!(t.parent(), "");
        assert!(t.is_partial());
        assert!(!t.is_generic_entry());

        assert_eq!(TemplateRef::new("robots.txt").output_suffix(), ".txt");
    }

    #[test]
    fn test_scan_separates_assets() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("blog")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        for file in ["index.html", "_layout.html", "blog/entry.html", "style.css", ".git/x.html"] {
            fs::write(root.join(file), "").unwrap();
        }

        let build = BuildConfig {
            templates: root.to_path_buf(),
            ..Default::default()
        };
        let tree = TemplateTree::scan(&build);
        let names: Vec<_> = tree.iter().map(TemplateRef::as_str).collect();
        assert_eq!(names, vec!["_layout.html", "blog/entry.html", "index.html"]);
        assert_eq!(tree.in_dir("blog").count(), 1);
        assert_eq!(tree.in_dir("").count(), 2);
        assert!(tree.contains(&TemplateRef::new("index.html")));
    }
}
