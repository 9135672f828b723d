//! Entry identifiers and entry field maps.

use crate::utils::path::rel_uri;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Slash-separated path of a content file relative to the content root.
///
/// Always normalized: no leading `./` or `/`, no empty or `.` segments, `/` as
/// the only separator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntryUri(String);

impl EntryUri {
    pub fn new(raw: &str) -> Self {
        let normalized = raw
            .split(['/', '\\'])
            .filter(|seg| !seg.is_empty() && *seg != ".")
            .collect::<Vec<_>>()
            .join("/");
        Self(normalized)
    }

    /// Uri of an absolute source path under `content_root`.
    pub fn from_path(path: &Path, content_root: &Path) -> Option<Self> {
        rel_uri(path, content_root).map(|rel| Self::new(&rel))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn source_path(&self, content_root: &Path) -> PathBuf {
        content_root.join(&self.0)
    }

    /// Directory part, `""` for top-level entries.
    pub fn parent(&self) -> &str {
        self.0.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit_once('/').map_or(&self.0, |(_, name)| name)
    }

    /// File name without its last extension.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// `blog/hello.md` with `.html` gives `blog/hello.html`.
    pub fn with_suffix(&self, suffix: &str) -> String {
        let base = match self.extension() {
            Some(ext) => &self.0[..self.0.len() - ext.len() - 1],
            None => &self.0,
        };
        format!("{base}{suffix}")
    }

    /// Whether this uri lives under the `namespace` directory.
    pub fn in_namespace(&self, namespace: &str) -> bool {
        let namespace = namespace.trim_matches('/');
        namespace.is_empty()
            || self
                .0
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for EntryUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EntryUri {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryUri {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Open map of one content file's fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Entry(BTreeMap<String, Value>);

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

impl FromIterator<(String, Value)> for Entry {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_normalization() {
        assert_eq!(EntryUri::new("./blog//hello.md").as_str(), "blog/hello.md");
        assert_eq!(EntryUri::new("/blog/hello.md").as_str(), "blog/hello.md");
        assert_eq!(EntryUri::new("blog\\posts\\a.md").as_str(), "blog/posts/a.md");
    }

    #[test]
    fn test_uri_parts() {
        let uri = EntryUri::new("blog/posts/hello.md");
        assert_eq!(uri.parent(), "blog/posts");
        assert_eq!(uri.file_name(), "hello.md");
        assert_eq!(uri.stem(), "hello");
        assert_eq!(uri.extension(), Some("md"));
        assert_eq!(uri.with_suffix(".html"), "blog/posts/hello.html");
        assert_eq!(uri.with_suffix(""), "blog/posts/hello");

        let top = EntryUri::new("about.md");
        assert_eq!(top.parent(), "");

        let hidden_like = EntryUri::new("notes/README");
        assert_eq!(hidden_like.stem(), "README");
        assert_eq!(hidden_like.extension(), None);
    }

    #[test]
    fn test_namespace() {
        let uri = EntryUri::new("blog/posts/hello.md");
        assert!(uri.in_namespace("blog"));
        assert!(uri.in_namespace("blog/posts/"));
        assert!(uri.in_namespace(""));
        assert!(!uri.in_namespace("blo"));
        assert!(!uri.in_namespace("blog/posts/hello.md"));
    }

    #[test]
    fn test_from_path() {
        let root = Path::new("/site/content");
        let uri = EntryUri::from_path(Path::new("/site/content/blog/a.md"), root).unwrap();
        assert_eq!(uri.as_str(), "blog/a.md");
        assert_eq!(uri.source_path(root), PathBuf::from("/site/content/blog/a.md"));
        assert!(EntryUri::from_path(Path::new("/site/templates/a.html"), root).is_none());
    }

    #[test]
    fn test_entry_fields() {
        let mut entry = Entry::new();
        entry.insert("title", "Hello");
        entry.insert("width", 640);

        assert_eq!(entry.str_field("title"), Some("Hello"));
        assert_eq!(entry.get("width"), Some(&Value::from(640)));
        assert_eq!(entry.keys().collect::<Vec<_>>(), vec!["title", "width"]);
        assert_eq!(entry.remove("width"), Some(Value::from(640)));
        assert_eq!(entry.len(), 1);
    }
}
