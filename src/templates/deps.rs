//! Static template dependencies.
//!
//! Children are found by scanning the source for `extends`, `include`,
//! `import` and `from .. import` tags without evaluating anything. The
//! transitive closure of each template is memoized until one of the files it
//! was built from changes.

use super::TemplateRef;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{%[-+]?[ \t\r\n]*(?:extends|include|import|from)[ \t\r\n]+(\[[^\]]*\]|"[^"]*"|'[^']*')"#)
        .expect("valid regex")
});

static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("valid regex"));

/// Names referenced by dependency tags in `source`, in order of appearance.
pub fn scan_directives(source: &str) -> Vec<TemplateRef> {
    let mut out = Vec::new();
    for caps in DIRECTIVE_RE.captures_iter(source) {
        for quoted in QUOTED_RE.captures_iter(&caps[1]) {
            let Some(name) = quoted.get(1).or_else(|| quoted.get(2)) else {
                continue;
            };
            let child = TemplateRef::new(name.as_str().trim_start_matches('/'));
            if !child.as_str().is_empty() && !out.contains(&child) {
                out.push(child);
            }
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct TemplateDependencyResolver {
    root: PathBuf,
    children: FxHashMap<TemplateRef, Vec<TemplateRef>>,
    closures: FxHashMap<TemplateRef, BTreeSet<TemplateRef>>,
}

impl TemplateDependencyResolver {
    pub fn new(templates_root: impl Into<PathBuf>) -> Self {
        Self {
            root: templates_root.into(),
            ..Default::default()
        }
    }

    /// Templates referenced directly by `template`. Unreadable files have none.
    pub fn children_of(&mut self, template: &TemplateRef) -> &[TemplateRef] {
        let root = &self.root;
        self.children.entry(template.clone()).or_insert_with(|| {
            fs::read_to_string(template.source_path(root))
                .map(|source| scan_directives(&source))
                .unwrap_or_default()
        })
    }

    /// Every template reachable from `template`, excluding itself.
    ///
    /// Terminates on self references and mutual recursion.
    pub fn transitive_children_of(&mut self, template: &TemplateRef) -> &BTreeSet<TemplateRef> {
        if !self.closures.contains_key(template) {
            let closure = self.walk(template);
            self.closures.insert(template.clone(), closure);
        }
        &self.closures[template]
    }

    fn walk(&mut self, start: &TemplateRef) -> BTreeSet<TemplateRef> {
        let mut visited: FxHashSet<TemplateRef> = FxHashSet::default();
        visited.insert(start.clone());
        let mut stack = vec![start.clone()];
        let mut reached = BTreeSet::new();

        while let Some(current) = stack.pop() {
            for child in self.children_of(&current).to_vec() {
                if visited.insert(child.clone()) {
                    reached.insert(child.clone());
                    stack.push(child);
                }
            }
        }
        reached
    }

    /// Whether `template` transitively includes `fragment`.
    pub fn depends_on(&mut self, template: &TemplateRef, fragment: &TemplateRef) -> bool {
        self.transitive_children_of(template).contains(fragment)
    }

    /// Forget what was read from `template` and every closure built through it.
    pub fn invalidate(&mut self, template: &TemplateRef) {
        self.children.remove(template);
        self.closures
            .retain(|key, closure| key != template && !closure.contains(template));
    }

    pub fn clear(&mut self) {
        self.children.clear();
        self.closures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_patterns_compile() {
        LazyLock::force(&DIRECTIVE_RE);
        LazyLock::force(&QUOTED_RE);
    }

    #[test]
    fn test_scan_tag_split_over_lines() {
        let children = scan_directives("{%-\n  include\t'_nav.html' %}");
        assert_eq!(children, vec![TemplateRef::new("_nav.html")]);
    }

    fn t(name: &str) -> TemplateRef {
        TemplateRef::new(name)
    }

    fn write(dir: &TempDir, name: &str, body: &str) {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn test_scan_directives() {
        let source = r#"
            {% extends "/_layout.html" %}
            {%- include ['_a.html', "_b.html"] ignore missing %}
            {% import '_macros.html' as m %}
            {% from "_forms.html" import field %}
            {{ "include" }} {% set x = 1 %}
        "#;
        let names: Vec<_> = scan_directives(source).iter().map(|t| t.to_string()).collect();
        assert_eq!(
            names,
            vec!["_layout.html", "_a.html", "_b.html", "_macros.html", "_forms.html"]
        );
    }

    #[test]
    fn test_transitive_children() {
        let dir = TempDir::new().unwrap();
        write(&dir, "index.html", r#"{% extends "_layout.html" %}"#);
        write(&dir, "_layout.html", r#"{% include "_nav.html" %}"#);
        write(&dir, "_nav.html", r#"{% include "_logo.svg" %}"#);
        write(&dir, "about.html", "plain");

        let mut deps = TemplateDependencyResolver::new(dir.path());
        let closure: Vec<_> = deps.transitive_children_of(&t("index.html")).iter().cloned().collect();
        assert_eq!(closure, vec![t("_layout.html"), t("_logo.svg"), t("_nav.html")]);
        assert!(deps.depends_on(&t("index.html"), &t("_nav.html")));
        assert!(!deps.depends_on(&t("about.html"), &t("_nav.html")));
    }

    #[test]
    fn test_cycles_terminate() {
        let dir = TempDir::new().unwrap();
        write(&dir, "_a.html", r#"{% include "_b.html" %}{% include "_a.html" %}"#);
        write(&dir, "_b.html", r#"{% include "_a.html" %}"#);

        let mut deps = TemplateDependencyResolver::new(dir.path());
        let closure: Vec<_> = deps.transitive_children_of(&t("_a.html")).iter().cloned().collect();
        assert_eq!(closure, vec![t("_b.html")]);
    }

    #[test]
    fn test_invalidate_rereads_changed_fragment() {
        let dir = TempDir::new().unwrap();
        write(&dir, "page.html", r#"{% include "_part.html" %}"#);
        write(&dir, "_part.html", "nothing");

        let mut deps = TemplateDependencyResolver::new(dir.path());
        assert!(!deps.depends_on(&t("page.html"), &t("_deep.html")));

        write(&dir, "_part.html", r#"{% include "_deep.html" %}"#);
        // Memoized until invalidated
        assert!(!deps.depends_on(&t("page.html"), &t("_deep.html")));

        deps.invalidate(&t("_part.html"));
        assert!(deps.depends_on(&t("page.html"), &t("_deep.html")));
    }
}
