//! Read-time resolution of `related_*` fields.
//!
//! Relations are stored as uri strings and resolved on every lookup, so two
//! entries may name each other without the context ever holding a cycle.
//! A lookup yields the entry's own references followed by its backlinks:
//! entries whose field of the same name lists it.

use super::{Context, Entry, EntryMap, EntryUri};
use crate::config::RelationPolicy;
use crate::error::BuildError;
use crate::log;
use serde_json::Value;

pub const RELATION_PREFIX: &str = "related_";

pub fn is_relation_field(key: &str) -> bool {
    key.starts_with(RELATION_PREFIX)
}

/// Uris named by a relation value: one string or a list of strings.
pub fn relation_targets(value: &Value) -> Vec<EntryUri> {
    match value {
        Value::String(uri) => vec![EntryUri::new(uri)],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(EntryUri::new)
            .collect(),
        _ => Vec::new(),
    }
}

/// Own references then backlinks, deduplicated, never including `uri`.
pub(crate) fn related_uris(entries: &EntryMap, uri: &str, field: &str) -> Vec<EntryUri> {
    let mut out: Vec<EntryUri> = Vec::new();
    let mut push = |target: EntryUri| {
        if target.as_str() != uri && !out.contains(&target) {
            out.push(target);
        }
    };

    if let Some(value) = entries.get(uri).and_then(|e| e.get(field)) {
        relation_targets(value).into_iter().for_each(&mut push);
    }

    for (other, entry) in entries {
        let links_back = entry
            .get(field)
            .is_some_and(|v| relation_targets(v).iter().any(|t| t.as_str() == uri));
        if links_back {
            push(other.clone());
        }
    }
    out
}

/// Resolve a relation field against `entries` under `policy`.
pub(crate) fn resolve<'a>(
    entries: &'a EntryMap,
    policy: RelationPolicy,
    uri: &str,
    field: &str,
) -> Result<Vec<(&'a EntryUri, &'a Entry)>, BuildError> {
    let mut resolved = Vec::new();
    for target in related_uris(entries, uri, field) {
        match entries.get_key_value(target.as_str()) {
            Some(pair) => resolved.push(pair),
            None if policy == RelationPolicy::Drop => {}
            None => {
                return Err(BuildError::UnresolvedRelation {
                    uri: uri.to_string(),
                    field: field.to_string(),
                    target: target.to_string(),
                });
            }
        }
    }
    Ok(resolved)
}

/// Read-time lookup that skips missing targets.
pub fn related_entries<'a>(entries: &'a EntryMap, uri: &str, field: &str) -> Vec<(&'a EntryUri, &'a Entry)> {
    resolve(entries, RelationPolicy::Drop, uri, field).unwrap_or_default()
}

impl Context {
    /// Entries related to `uri` through `field`, resolved now.
    pub fn related(&self, uri: &str, field: &str) -> Result<Vec<(&EntryUri, &Entry)>, BuildError> {
        resolve(self.entries(), self.relation_policy(), uri, field)
    }

    /// Every reference to a missing entry, in entry order.
    pub fn dangling_relations(&self) -> Vec<BuildError> {
        let mut dangling = Vec::new();
        for (uri, entry) in self.entries() {
            for (field, value) in entry.fields().filter(|(k, _)| is_relation_field(k)) {
                for target in relation_targets(value) {
                    if !self.contains(target.as_str()) {
                        dangling.push(BuildError::UnresolvedRelation {
                            uri: uri.to_string(),
                            field: field.to_string(),
                            target: target.to_string(),
                        });
                    }
                }
            }
        }
        dangling
    }

    /// Apply the relation policy to the whole context.
    ///
    /// Fails on the first dangling reference under `fail_fast`; logs each one
    /// under `drop`.
    pub fn check_relations(&self) -> Result<(), BuildError> {
        for err in self.dangling_relations() {
            match self.relation_policy() {
                RelationPolicy::FailFast => return Err(err),
                RelationPolicy::Drop => log!("warn"; "{err} (dropped)"),
            }
        }
        Ok(())
    }
}
