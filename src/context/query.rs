//! Filtering and ordering entries for listing pages.

use super::{Entry, EntryMap, EntryUri};
use serde_json::Value;
use std::cmp::Ordering;

/// Entries under any of `namespaces` (all entries when empty), ordered by the
/// first present of `sort_by` on each entry.
///
/// Entries carrying none of the sort keys keep map order after the others.
/// `reverse` flips the final order.
pub fn get_entries<'a, N, S>(
    entries: &'a EntryMap,
    namespaces: &[N],
    sort_by: &[S],
    reverse: bool,
) -> Vec<(&'a EntryUri, &'a Entry)>
where
    N: AsRef<str>,
    S: AsRef<str>,
{
    let mut selected: Vec<_> = entries
        .iter()
        .filter(|(uri, _)| {
            namespaces.is_empty() || namespaces.iter().any(|ns| uri.in_namespace(ns.as_ref()))
        })
        .collect();

    if !sort_by.is_empty() {
        // Stable sort keeps map order for ties
        selected.sort_by(|(_, a), (_, b)| match (sort_key(sort_by, a), sort_key(sort_by, b)) {
            (Some(a), Some(b)) => compare_values(a, b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }

    if reverse {
        selected.reverse();
    }
    selected
}

/// Value of the first sort key present on `entry`.
fn sort_key<'e, S: AsRef<str>>(sort_by: &[S], entry: &'e Entry) -> Option<&'e Value> {
    sort_by.iter().find_map(|k| entry.get(k.as_ref()))
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a)
            .cmp(&type_rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
