//! Dot-path addressing into a nested JSON value tree.
//!
//! Every read and write in the store is addressed by a dot-separated path
//! such as `chat.currentMode`. Intermediate objects are created lazily on
//! write; reads never fail, they return `None` for missing segments.

use serde_json::{Map, Value};

/// Resolve `path` inside `tree`, walking one object level per dot-separated
/// segment. An empty path resolves to the tree itself. Returns `None` as soon
/// as any segment is missing or a non-object is reached mid-path.
pub fn get_in<'v>(tree: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(tree);
    }
    let mut current = tree;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// A non-object value sitting on an intermediate segment is replaced by an
/// empty object before descending. An empty path replaces the whole tree.
pub fn set_in(tree: &mut Value, path: &str, value: Value) {
    if path.is_empty() {
        *tree = value;
        return;
    }
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = tree;
    for segment in parents {
        current = ensure_object(current)
            .entry((*segment).to_string())
            .or_insert(Value::Null);
    }
    ensure_object(current).insert((*last).to_string(), value);
}

/// Recursively merge `incoming` into `target`.
///
/// Objects merge key-by-key; arrays, primitives and null replace the target
/// value wholesale. The replace-not-merge policy for arrays is deliberate and
/// covered by tests.
pub fn deep_merge(target: &mut Value, incoming: Value) {
    match incoming {
        Value::Object(source) => {
            if let Value::Object(existing) = target {
                for (key, value) in source {
                    match existing.get_mut(&key) {
                        Some(slot) => deep_merge(slot, value),
                        None => {
                            existing.insert(key, value);
                        }
                    }
                }
            } else {
                *target = Value::Object(source);
            }
        }
        other => *target = other,
    }
}

/// Subscription matching rule for a write at `changed` against a listener
/// registered at `listener`. Matches on:
///
/// - exact equality,
/// - `changed` being a strict dot-prefix of `listener` (ancestor write),
/// - `listener` being a strict dot-prefix of `changed` (descendant write),
/// - a trailing-`*` pattern whose prefix starts `changed`,
/// - a bare `*` or empty listener (matches every write),
/// - a `changed` of `*`, the global notification used by restore/reset.
///
/// Ancestor and descendant writes both notify; subscribers tolerate the
/// occasional spurious callback in exchange for never missing a relevant one.
pub fn pattern_matches(listener: &str, changed: &str) -> bool {
    pattern_matches_scoped(listener, changed, true)
}

/// Same rule as [`pattern_matches`], but `descend: false` drops the
/// descendant-write branch so writes strictly below the listener path no
/// longer match. Used by shallow (`deep: false`) subscriptions.
pub fn pattern_matches_scoped(listener: &str, changed: &str, descend: bool) -> bool {
    if listener == "*" || listener.is_empty() || changed == "*" {
        return true;
    }
    if let Some(prefix) = listener.strip_suffix('*') {
        return changed.starts_with(prefix);
    }
    if listener == changed {
        return true;
    }
    // Write below the listener path (descendant write).
    if descend {
        if let Some(rest) = changed.strip_prefix(listener) {
            if rest.starts_with('.') {
                return true;
            }
        }
    }
    // Write above the listener path (ancestor write).
    if let Some(rest) = listener.strip_prefix(changed) {
        if rest.starts_with('.') {
            return true;
        }
    }
    false
}

fn ensure_object(slot: &mut Value) -> &mut Map<String, Value> {
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just replaced with an object"),
    }
}
