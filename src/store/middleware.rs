//! Store middleware: the veto gate run on every write.
//!
//! A middleware sees `(path, new value, old value)` and returns `false` to
//! abort the write. Two stock middlewares ship with the crate: a tracing
//! logger and a persistence bridge that mirrors selected paths into an
//! injected key-value collaborator.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use crate::path;
use crate::store::Store;

/// Middleware signature. Invoked in registration order before any mutation;
/// the first `false` vetoes the whole write.
pub type MiddlewareFn = Arc<dyn Fn(&str, &Value, Option<&Value>) -> bool + Send + Sync>;

/// Failure inside a key-value persistence collaborator.
#[derive(Debug, Error)]
#[error("persistence failure: {0}")]
pub struct PersistError(pub String);

/// External key-value persistence collaborator. The core never persists on
/// its own; a middleware forwards selected writes here.
pub trait KeyValue: Send + Sync {
    fn put(&self, key: &str, value: &str) -> Result<(), PersistError>;
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
}

/// In-memory [`KeyValue`] implementation, mainly for tests and defaults.
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<std::collections::HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValue for MemoryKv {
    fn put(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.read().get(key).cloned())
    }
}

/// Middleware that logs every write at debug level and always allows it.
pub fn logging_middleware() -> MiddlewareFn {
    Arc::new(|path, value, old_value| {
        tracing::debug!(%path, new = %value, old = ?old_value, "state write");
        true
    })
}

/// Middleware that serializes the new value of any write matching one of
/// `watched` into `kv`, keyed by the changed path. Persistence failures are
/// logged and never veto the write.
pub fn persistence_middleware(kv: Arc<dyn KeyValue>, watched: &[&str]) -> MiddlewareFn {
    let watched: Vec<String> = watched.iter().map(|pattern| pattern.to_string()).collect();
    Arc::new(move |changed, value, _old| {
        let interesting = watched
            .iter()
            .any(|pattern| path::pattern_matches(pattern, changed));
        if interesting {
            if let Err(err) = kv.put(changed, &value.to_string()) {
                tracing::error!(path = %changed, error = %err, "failed to persist state write");
            }
        }
        true
    })
}

/// Seed `store` from previously persisted values. Each path present in `kv`
/// is parsed as JSON and written back through the normal `set` entry point
/// (middleware and subscribers see the write). Unparseable or missing
/// entries are logged and skipped.
pub fn hydrate(store: &Store, kv: &dyn KeyValue, paths: &[&str]) {
    for &target in paths {
        match kv.get(target) {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    store.set(target, value);
                }
                Err(err) => {
                    tracing::error!(path = %target, error = %err, "persisted value is not valid JSON");
                }
            },
            Ok(None) => {}
            Err(err) => {
                tracing::error!(path = %target, error = %err, "failed to read persisted value");
            }
        }
    }
}
