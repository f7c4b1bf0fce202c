//! Field-level comparison of activity-log snapshots.
//!
//! Activity logs carry `old_values` and `new_values` as free-form JSON. The
//! admin diff viewer shows one row per top-level key.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// How a single key changed between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    Added(Value),
    Removed(Value),
    Changed { old: Value, new: Value },
    Unchanged(Value),
}

impl FieldChange {
    /// CSS-friendly tag for the row.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Removed(_) => "removed",
            Self::Changed { .. } => "changed",
            Self::Unchanged(_) => "unchanged",
        }
    }

    /// The old value rendered for display, if there was one.
    #[must_use]
    pub fn old_display(&self) -> Option<String> {
        match self {
            Self::Removed(old) | Self::Changed { old, .. } | Self::Unchanged(old) => {
                Some(render_value(old))
            }
            Self::Added(_) => None,
        }
    }

    /// The new value rendered for display, if there is one.
    #[must_use]
    pub fn new_display(&self) -> Option<String> {
        match self {
            Self::Added(new) | Self::Changed { new, .. } | Self::Unchanged(new) => {
                Some(render_value(new))
            }
            Self::Removed(_) => None,
        }
    }
}

/// One row of the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub key: String,
    pub change: FieldChange,
}

/// Compare two snapshots key by key, in sorted key order.
///
/// Non-object inputs are compared as `{"value": v}`. A missing snapshot is
/// `None` (or JSON `null`) and counts as an empty object.
#[must_use]
pub fn diff_values(
    old: Option<&Value>,
    new: Option<&Value>,
    include_unchanged: bool,
) -> Vec<FieldDiff> {
    let old = as_object(old);
    let new = as_object(new);

    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let change = match (old.get(key), new.get(key)) {
                (None, Some(n)) => FieldChange::Added(n.clone()),
                (Some(o), None) => FieldChange::Removed(o.clone()),
                (Some(o), Some(n)) if o != n => FieldChange::Changed {
                    old: o.clone(),
                    new: n.clone(),
                },
                (Some(o), Some(_)) if include_unchanged => FieldChange::Unchanged(o.clone()),
                _ => return None,
            };
            Some(FieldDiff {
                key: key.clone(),
                change,
            })
        })
        .collect()
}

fn as_object(value: Option<&Value>) -> Map<String, Value> {
    match value {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            let mut map = Map::new();
            map.insert("value".to_owned(), other.clone());
            map
        }
    }
}

/// Render a value for a diff cell: strings unquoted, everything else as
/// compact JSON.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
