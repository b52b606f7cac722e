//! Synchronous publish/subscribe event bus.
//!
//! Cross-component signaling that is not part of durable state (clicks,
//! lifecycle notices, transport status) goes through the bus instead of the
//! store. Delivery is synchronous and in priority-then-registration order;
//! there is no queuing and nothing survives the process. The bus is an
//! explicitly constructed, cheaply cloneable handle with no global instance.

pub mod topics;

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// Listener callback. Payloads are arbitrary JSON values.
pub type BusCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Bus middleware: sees `(event name, payload)` before delivery; `false`
/// blocks the emit entirely.
pub type BusMiddlewareFn = Arc<dyn Fn(&str, &Value) -> bool + Send + Sync>;

pub type ListenerId = u64;

/// Options for [`EventBus::on_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerOptions {
    /// Remove the listener after its first delivery.
    pub once: bool,
    /// Higher priority runs first; ties keep registration order.
    pub priority: i32,
}

struct Listener {
    id: ListenerId,
    callback: BusCallback,
    once: bool,
    priority: i32,
}

#[derive(Default)]
struct BusInner {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
    middleware: RwLock<Vec<BusMiddlewareFn>>,
    next_id: AtomicU64,
}

/// Cheaply cloneable handle to a shared pub/sub channel.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event` with default options.
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_with(event, callback, ListenerOptions::default())
    }

    /// Register a one-shot listener.
    pub fn once<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_with(
            event,
            callback,
            ListenerOptions {
                once: true,
                ..ListenerOptions::default()
            },
        )
    }

    pub fn on_with<F>(&self, event: &str, callback: F, options: ListenerOptions) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.inner.listeners.write();
        let entry = listeners.entry(event.to_string()).or_default();
        entry.push(Listener {
            id,
            callback: Arc::new(callback),
            once: options.once,
            priority: options.priority,
        });
        // Stable sort keeps registration order between equal priorities.
        entry.sort_by_key(|listener| std::cmp::Reverse(listener.priority));
        id
    }

    /// Remove one listener. Unknown ids are a no-op.
    pub fn off(&self, event: &str, id: ListenerId) {
        let mut listeners = self.inner.listeners.write();
        if let Some(entry) = listeners.get_mut(event) {
            entry.retain(|listener| listener.id != id);
            if entry.is_empty() {
                listeners.remove(event);
            }
        }
    }

    /// Remove every listener for `event`, or every listener on the bus when
    /// `event` is `None`.
    pub fn remove_all(&self, event: Option<&str>) {
        let mut listeners = self.inner.listeners.write();
        match event {
            Some(event) => {
                listeners.remove(event);
            }
            None => listeners.clear(),
        }
    }

    /// Register a middleware run before every delivery; returning `false`
    /// blocks the event.
    pub fn add_middleware(&self, middleware: BusMiddlewareFn) {
        self.inner.middleware.write().push(middleware);
    }

    /// Deliver `payload` to every listener currently registered for `event`,
    /// in priority-then-registration order. A panicking listener is logged
    /// and skipped so it cannot block the rest. Returns `false` when a
    /// middleware vetoed delivery.
    pub fn emit(&self, event: &str, payload: Value) -> bool {
        let chain: Vec<BusMiddlewareFn> = self.inner.middleware.read().clone();
        for middleware in &chain {
            if !middleware(event, &payload) {
                tracing::debug!(%event, "event blocked by bus middleware");
                return false;
            }
        }

        let snapshot: Vec<(ListenerId, BusCallback, bool)> = {
            let listeners = self.inner.listeners.read();
            listeners
                .get(event)
                .map(|entry| {
                    entry
                        .iter()
                        .map(|listener| {
                            (listener.id, Arc::clone(&listener.callback), listener.once)
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut spent = Vec::new();
        for (id, callback, once) in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(&payload))).is_err() {
                tracing::error!(%event, "event listener panicked");
            }
            if *once {
                spent.push(*id);
            }
        }
        for id in spent {
            self.off(event, id);
        }
        true
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .listeners
            .read()
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.listeners.read().keys().cloned().collect();
        names.sort();
        names
    }
}
