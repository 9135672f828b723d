//! The in-memory build state shared by processors and renderers.
//!
//! A [`Context`] is created once per generator and mutated in place by each
//! processor in turn. Entries sit behind an `Arc` so renderers can hand a
//! cheap snapshot to the template engine; mutation goes through
//! [`Arc::make_mut`] and only copies while such a snapshot is alive.

mod entry;
mod query;
mod related;

pub use entry::{Entry, EntryUri};
pub use query::get_entries;
pub use related::{is_relation_field, related_entries, relation_targets};

use crate::config::RelationPolicy;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub type EntryMap = BTreeMap<EntryUri, Entry>;

#[derive(Debug, Clone, Default)]
pub struct Context {
    pub globals: BTreeMap<String, Value>,
    entries: Arc<EntryMap>,
    relations: RelationPolicy,
    /// Entries a per-entry processor failed on, with the processors that failed.
    failed: BTreeMap<EntryUri, BTreeSet<&'static str>>,
}

impl Context {
    pub fn new(globals: BTreeMap<String, Value>, relations: RelationPolicy) -> Self {
        Self {
            globals,
            entries: Arc::default(),
            relations,
            failed: BTreeMap::new(),
        }
    }

    pub fn entries(&self) -> &EntryMap {
        &self.entries
    }

    /// Snapshot of the entry map for read-only consumers.
    pub fn shared_entries(&self) -> Arc<EntryMap> {
        Arc::clone(&self.entries)
    }

    pub fn relation_policy(&self) -> RelationPolicy {
        self.relations
    }

    pub fn get(&self, uri: &str) -> Option<&Entry> {
        self.entries.get(uri)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    pub fn get_mut(&mut self, uri: &str) -> Option<&mut Entry> {
        Arc::make_mut(&mut self.entries).get_mut(uri)
    }

    pub fn insert(&mut self, uri: EntryUri, entry: Entry) -> Option<Entry> {
        Arc::make_mut(&mut self.entries).insert(uri, entry)
    }

    pub fn remove(&mut self, uri: &str) -> Option<Entry> {
        self.failed.remove(uri);
        Arc::make_mut(&mut self.entries).remove(uri)
    }

    /// Record whether `processor` last succeeded on `uri`.
    pub fn set_failed(&mut self, uri: &EntryUri, processor: &'static str, failed: bool) {
        if failed {
            self.failed.entry(uri.clone()).or_default().insert(processor);
        } else if let Some(processors) = self.failed.get_mut(uri) {
            processors.remove(processor);
            if processors.is_empty() {
                self.failed.remove(uri);
            }
        }
    }

    /// Whether some processor failed on `uri`. Such an entry is incomplete
    /// and must not be rendered.
    pub fn is_failed(&self, uri: &str) -> bool {
        self.failed.contains_key(uri)
    }

    /// Take an entry out for a processor, leaving an empty one if absent.
    pub fn take_or_default(&mut self, uri: &EntryUri) -> Entry {
        Arc::make_mut(&mut self.entries)
            .remove(uri)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every entry. Globals stay.
    pub fn reset(&mut self) {
        self.entries = Arc::default();
        self.failed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str) -> Entry {
        let mut entry = Entry::new();
        entry.insert("title", title);
        entry
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut ctx = Context::default();
        ctx.insert(EntryUri::new("blog/a.md"), entry("A"));

        assert!(ctx.contains("blog/a.md"));
        assert_eq!(ctx.get("blog/a.md").unwrap().str_field("title"), Some("A"));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_snapshot_is_isolated_from_mutation() {
        let mut ctx = Context::default();
        ctx.insert(EntryUri::new("a.md"), entry("old"));

        let snapshot = ctx.shared_entries();
        ctx.get_mut("a.md").unwrap().insert("title", "new");

        assert_eq!(snapshot["a.md"].str_field("title"), Some("old"));
        assert_eq!(ctx.get("a.md").unwrap().str_field("title"), Some("new"));
    }

    #[test]
    fn test_take_or_default() {
        let mut ctx = Context::default();
        ctx.insert(EntryUri::new("a.md"), entry("A"));

        let taken = ctx.take_or_default(&EntryUri::new("a.md"));
        assert_eq!(taken.str_field("title"), Some("A"));
        assert!(!ctx.contains("a.md"));

        assert!(ctx.take_or_default(&EntryUri::new("b.md")).is_empty());
    }

    #[test]
    fn test_failed_marks() {
        let mut ctx = Context::default();
        let uri = EntryUri::new("blog/a.md");
        ctx.insert(uri.clone(), entry("A"));

        ctx.set_failed(&uri, "markdown", true);
        ctx.set_failed(&uri, "image", false);
        assert!(ctx.is_failed("blog/a.md"));

        ctx.set_failed(&uri, "markdown", false);
        assert!(!ctx.is_failed("blog/a.md"));

        ctx.set_failed(&uri, "markdown", true);
        ctx.remove("blog/a.md");
        assert!(!ctx.is_failed("blog/a.md"));

        ctx.set_failed(&uri, "markdown", true);
        ctx.reset();
        assert!(!ctx.is_failed("blog/a.md"));
    }

    #[test]
    fn test_reset_keeps_globals() {
        let mut globals = BTreeMap::new();
        globals.insert("site_name".to_string(), Value::from("Quill"));
        let mut ctx = Context::new(globals, RelationPolicy::Drop);
        ctx.insert(EntryUri::new("a.md"), entry("A"));

        ctx.reset();
        assert!(ctx.is_empty());
        assert_eq!(ctx.globals["site_name"], Value::from("Quill"));
        assert_eq!(ctx.relation_policy(), RelationPolicy::Drop);
    }
}
