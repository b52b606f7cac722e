//! Path-addressed state store with middleware and subscriptions.
//!
//! One [`Store`] owns the application's nested state tree. Every write is
//! addressed by a dot-separated path, runs the middleware chain (any
//! middleware can veto), and synchronously notifies every subscriber whose
//! path pattern matches. The store is explicitly constructed and passed by
//! reference rather than living in a global, so tests get isolated stores
//! for free.
//!
//! Locks are held only while the tree or registries are mutated, never across
//! user callbacks, so subscribers may legally write back into the store.
//! Unbounded notify→write→notify recursion is cut off by a depth guard.

pub mod actions;
pub mod middleware;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::path;

pub use middleware::MiddlewareFn;

/// Nested writes from subscriber callbacks beyond this depth are applied but
/// no longer notified, breaking infinite notification loops.
pub const MAX_NOTIFY_DEPTH: usize = 32;

/// The changed-path value used for whole-tree notifications (merge, restore,
/// reset). Matches every subscription.
pub const GLOBAL_PATH: &str = "*";

/// Result of a write. Middleware veto is a silent no-op apart from this
/// value, so callers that care must inspect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    Vetoed,
}

impl WriteOutcome {
    pub fn applied(self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }
}

/// What a subscriber sees for a matching write.
#[derive(Debug, Clone)]
pub struct Change {
    /// The path that was written (`*` for whole-tree notifications).
    pub path: String,
    /// New value at the listener's path, if present.
    pub value: Option<Value>,
    /// Previous value at the listener's path, if present.
    pub old_value: Option<Value>,
    /// Full tree after the write.
    pub tree: Value,
    /// Full tree before the write.
    pub old_tree: Value,
}

/// Subscriber callback.
pub type SubscriberFn = Arc<dyn Fn(&Change) + Send + Sync>;

pub type SubscriptionId = u64;

/// Options for [`Store::subscribe`].
#[derive(Debug, Clone, Copy)]
pub struct SubscribeOptions {
    /// Invoke the callback once at registration with the current value.
    pub immediate: bool,
    /// Notify on writes strictly below the subscribed path. Defaults to
    /// `true`: watching an ancestor is permissive, and a deep write in an
    /// unrelated subtree of a watched ancestor still notifies.
    pub deep: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            immediate: false,
            deep: true,
        }
    }
}

struct Subscriber {
    id: SubscriptionId,
    listener_path: String,
    deep: bool,
    callback: SubscriberFn,
}

struct StoreInner {
    state: RwLock<Value>,
    middleware: RwLock<Vec<MiddlewareFn>>,
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
    notify_depth: AtomicUsize,
}

/// Cheaply cloneable handle to a shared state tree.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Store seeded with the application's initial shape.
    pub fn new() -> Self {
        Self::with_state(initial_state())
    }

    /// Store seeded with an arbitrary tree. Intended for tests.
    pub fn with_state(state: Value) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(state),
                middleware: RwLock::new(Vec::new()),
                subscribers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                notify_depth: AtomicUsize::new(0),
            }),
        }
    }

    /// Value at `path`, deep-cloned. `None` if any segment is missing; never
    /// panics on a bad path.
    pub fn get(&self, path: &str) -> Option<Value> {
        let state = self.inner.state.read();
        path::get_in(&state, path).cloned()
    }

    /// Deep clone of the whole tree.
    pub fn get_all(&self) -> Value {
        self.inner.state.read().clone()
    }

    /// Targeted nested write at `path`. Middleware runs first, in
    /// registration order; the first `false` aborts the write entirely and no
    /// subscriber fires.
    pub fn set(&self, path: &str, value: Value) -> WriteOutcome {
        let old_tree = self.get_all();
        let old_value = path::get_in(&old_tree, path).cloned();
        if self.vetoed(path, &value, old_value.as_ref()) {
            return WriteOutcome::Vetoed;
        }
        {
            let mut state = self.inner.state.write();
            path::set_in(&mut state, path, value);
        }
        let new_tree = self.get_all();
        self.notify(path, &new_tree, &old_tree);
        WriteOutcome::Applied
    }

    /// Recursive deep merge of `partial` into the root: objects merge
    /// key-by-key, arrays and primitives replace wholesale. Middleware sees
    /// the global `*` path with the whole partial as the new value; on
    /// success every subscriber is notified via the global path.
    pub fn merge(&self, partial: Value) -> WriteOutcome {
        let old_tree = self.get_all();
        if self.vetoed(GLOBAL_PATH, &partial, Some(&old_tree)) {
            return WriteOutcome::Vetoed;
        }
        {
            let mut state = self.inner.state.write();
            path::deep_merge(&mut state, partial);
        }
        let new_tree = self.get_all();
        self.notify(GLOBAL_PATH, &new_tree, &old_tree);
        WriteOutcome::Applied
    }

    /// Register a middleware. Middleware is a veto gate, not a transform
    /// pipeline: it can block a write but never rewrite the value.
    pub fn add_middleware(&self, middleware: MiddlewareFn) {
        self.inner.middleware.write().push(middleware);
    }

    /// Subscribe `callback` to writes matching `listener_path` (see
    /// [`path::pattern_matches`] for the rule). Returns a [`Subscription`]
    /// that must be explicitly unsubscribed; dropping it keeps the
    /// subscription alive.
    pub fn subscribe<F>(
        &self,
        listener_path: &str,
        callback: F,
        options: SubscribeOptions,
    ) -> Subscription
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        let callback: SubscriberFn = Arc::new(callback);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.write().push(Subscriber {
            id,
            listener_path: listener_path.to_string(),
            deep: options.deep,
            callback: Arc::clone(&callback),
        });

        if options.immediate {
            let tree = self.get_all();
            let change = Change {
                path: listener_path.to_string(),
                value: value_for_listener(&tree, listener_path, listener_path),
                old_value: None,
                tree: tree.clone(),
                old_tree: tree,
            };
            invoke_subscriber(&callback, &change);
        }

        Subscription {
            id,
            store: self.clone(),
        }
    }

    /// Remove a subscription by id. Unknown ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .subscribers
            .write()
            .retain(|subscriber| subscriber.id != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Structurally independent deep copy of the tree.
    pub fn backup(&self) -> Value {
        self.get_all()
    }

    /// Replace the live tree with a deep copy of `snapshot` and fire the
    /// global notification.
    pub fn restore(&self, snapshot: &Value) {
        self.replace_tree(snapshot.clone());
    }

    /// Restore the hard-coded initial shape and fire the global notification.
    pub fn reset(&self) {
        self.replace_tree(initial_state());
    }

    fn replace_tree(&self, tree: Value) {
        let old_tree = self.get_all();
        {
            let mut state = self.inner.state.write();
            *state = tree;
        }
        let new_tree = self.get_all();
        self.notify(GLOBAL_PATH, &new_tree, &old_tree);
    }

    fn vetoed(&self, path: &str, value: &Value, old_value: Option<&Value>) -> bool {
        let chain: Vec<MiddlewareFn> = self.inner.middleware.read().clone();
        for middleware in &chain {
            if !middleware(path, value, old_value) {
                tracing::debug!(%path, "state write vetoed by middleware");
                return true;
            }
        }
        false
    }

    fn notify(&self, changed: &str, new_tree: &Value, old_tree: &Value) {
        let depth = self.inner.notify_depth.fetch_add(1, Ordering::SeqCst);
        scopeguard::defer! {
            self.inner.notify_depth.fetch_sub(1, Ordering::SeqCst);
        }
        if depth >= MAX_NOTIFY_DEPTH {
            tracing::warn!(
                %changed,
                depth,
                "notification depth limit reached, write applied without notification"
            );
            return;
        }

        let matched: Vec<(String, SubscriberFn)> = {
            let subscribers = self.inner.subscribers.read();
            subscribers
                .iter()
                .filter(|subscriber| {
                    path::pattern_matches_scoped(&subscriber.listener_path, changed, subscriber.deep)
                })
                .map(|subscriber| {
                    (
                        subscriber.listener_path.clone(),
                        Arc::clone(&subscriber.callback),
                    )
                })
                .collect()
        };

        for (listener_path, callback) in matched {
            let change = Change {
                path: changed.to_string(),
                value: value_for_listener(new_tree, &listener_path, changed),
                old_value: value_for_listener(old_tree, &listener_path, changed),
                tree: new_tree.clone(),
                old_tree: old_tree.clone(),
            };
            invoke_subscriber(&callback, &change);
        }
    }
}

/// Handle returned by [`Store::subscribe`]. Subscriptions are never dropped
/// implicitly; call [`Subscription::unsubscribe`] (or
/// [`Store::unsubscribe`] with the id) to remove them.
pub struct Subscription {
    id: SubscriptionId,
    store: Store,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn unsubscribe(self) {
        self.store.unsubscribe(self.id);
    }
}

/// The value a listener observes for a given write. Concrete listener paths
/// read their own path; wildcard listeners observe the value at the changed
/// path (or the whole tree for global notifications).
fn value_for_listener(tree: &Value, listener: &str, changed: &str) -> Option<Value> {
    if listener.is_empty() || listener == "*" {
        return Some(tree.clone());
    }
    if listener.ends_with('*') {
        if changed == GLOBAL_PATH {
            return Some(tree.clone());
        }
        return path::get_in(tree, changed).cloned();
    }
    path::get_in(tree, listener).cloned()
}

fn invoke_subscriber(callback: &SubscriberFn, change: &Change) {
    if catch_unwind(AssertUnwindSafe(|| callback(change))).is_err() {
        tracing::error!(path = %change.path, "subscriber callback panicked");
    }
}

/// The application's hard-coded initial state shape.
pub fn initial_state() -> Value {
    json!({
        "user": {
            "authenticated": false,
            "role": null,
            "preferences": {}
        },
        "chat": {
            "conversation": [],
            "currentMode": "grammar",
            "currentDifficulty": "intermediate",
            "loading": false,
            "connectionStatus": "disconnected",
            "lastMessage": null
        },
        "admin": {
            "loggedIn": false,
            "indexingStatus": null,
            "backupList": [],
            "systemLogs": []
        },
        "ui": {
            "theme": "dark",
            "sidebarOpen": false,
            "modalOpen": null,
            "notifications": [],
            "loading": false
        }
    })
}
