//! `minijinja` rendering over a context snapshot.
//!
//! An engine is built per render pass, so edited templates are always read
//! fresh from disk. Entries are exposed as dynamic objects: `related_*` fields
//! resolve to lists of entry objects on access and `entries["blog"]` lists a namespace.

use super::TemplateRef;
use crate::context::{
    Context, EntryMap, EntryUri, get_entries, is_relation_field, related_entries,
};
use anyhow::{Context as _, Result};
use minijinja::value::{Enumerator, Object, ObjectRepr, Value};
use minijinja::{Environment, UndefinedBehavior, context, path_loader};
use std::path::Path;
use std::sync::Arc;

pub struct TemplateEngine {
    env: Environment<'static>,
    entries: Arc<EntryMap>,
}

impl TemplateEngine {
    pub fn new(templates_root: &Path, ctx: &Context) -> Self {
        let entries = ctx.shared_entries();
        let mut env = Environment::new();
        env.set_loader(path_loader(templates_root.to_path_buf()));
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        for (key, value) in &ctx.globals {
            env.add_global(key.clone(), Value::from_serialize(value));
        }
        env.add_global(
            "entries",
            Value::from_object(EntriesObject {
                entries: Arc::clone(&entries),
            }),
        );

        let lookup = Arc::clone(&entries);
        env.add_function(
            "get_entries",
            move |namespaces: Option<Value>, sort_by: Option<Value>, reverse: Option<bool>| {
                let namespaces = string_list(namespaces);
                let sort_by = string_list(sort_by);
                get_entries(&lookup, &namespaces, &sort_by, reverse.unwrap_or(false))
                    .into_iter()
                    .map(|(uri, _)| entry_value(&lookup, uri))
                    .collect::<Vec<_>>()
            },
        );

        Self { env, entries }
    }

    /// Render `template` with `entry` bound to the entry at `uri`.
    pub fn render_entry(&self, template: &TemplateRef, uri: &EntryUri) -> Result<String> {
        let tmpl = self.env.get_template(template.as_str())?;
        let entry = entry_value(&self.entries, uri);
        tmpl.render(context! { entry => entry, entry_uri => uri.as_str() })
            .with_context(|| format!("failed to render {uri} with {template}"))
    }

    pub fn render_standalone(&self, template: &TemplateRef) -> Result<String> {
        let tmpl = self.env.get_template(template.as_str())?;
        tmpl.render(context! {})
            .with_context(|| format!("failed to render {template}"))
    }
}

/// A namespace or uri argument given as one string or a list.
fn string_list(value: Option<Value>) -> Vec<String> {
    let Some(value) = value.filter(|v| !v.is_undefined() && !v.is_none()) else {
        return Vec::new();
    };
    if let Some(s) = value.as_str() {
        return vec![s.to_string()];
    }
    value
        .try_iter()
        .map(|items| items.filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

fn entry_value(entries: &Arc<EntryMap>, uri: &EntryUri) -> Value {
    Value::from_object(EntryView {
        entries: Arc::clone(entries),
        uri: uri.clone(),
    })
}

#[derive(Debug)]
struct EntriesObject {
    entries: Arc<EntryMap>,
}

impl Object for EntriesObject {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Map
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let key = key.as_str()?;
        if let Some((uri, _)) = self.entries.get_key_value(key) {
            return Some(entry_value(&self.entries, uri));
        }

        let listed: Vec<Value> = self
            .entries
            .keys()
            .filter(|uri| uri.in_namespace(key))
            .map(|uri| entry_value(&self.entries, uri))
            .collect();
        (!listed.is_empty()).then(|| Value::from(listed))
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Values(self.entries.keys().map(|uri| Value::from(uri.as_str())).collect())
    }
}

/// One entry, resolving `related_*` fields on access.
#[derive(Debug)]
struct EntryView {
    entries: Arc<EntryMap>,
    uri: EntryUri,
}

impl Object for EntryView {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Map
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let key = key.as_str()?;
        let entry = self.entries.get(self.uri.as_str())?;

        if is_relation_field(key) {
            // Always a list, empty when nothing links either way
            let related: Vec<Value> = related_entries(&self.entries, self.uri.as_str(), key)
                .into_iter()
                .map(|(uri, _)| entry_value(&self.entries, uri))
                .collect();
            return Some(Value::from(related));
        }

        match (key, entry.get(key)) {
            // Rendered markup is already html
            ("body", Some(serde_json::Value::String(html))) => {
                Some(Value::from_safe_string(html.clone()))
            }
            (_, Some(value)) => Some(Value::from_serialize(value)),
            ("uri", None) => Some(Value::from(self.uri.as_str())),
            _ => None,
        }
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        let keys: Vec<Value> = self
            .entries
            .get(self.uri.as_str())
            .map(|entry| entry.keys().map(Value::from).collect())
            .unwrap_or_default();
        Enumerator::Values(keys)
    }
}
