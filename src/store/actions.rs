//! Typed helpers over the well-known store paths.
//!
//! Services and widgets go through these instead of spelling out raw path
//! strings everywhere. Each helper is a thin wrapper over `get`/`set` and
//! returns the [`WriteOutcome`] of the underlying write.

use serde_json::{json, Value};

use crate::store::{Store, WriteOutcome};

pub fn set_authenticated(store: &Store, authenticated: bool) -> WriteOutcome {
    store.set("user.authenticated", json!(authenticated))
}

pub fn set_chat_mode(store: &Store, mode: &str, difficulty: &str) -> WriteOutcome {
    store.set("chat.currentMode", json!(mode));
    store.set("chat.currentDifficulty", json!(difficulty))
}

/// Append a message to the conversation and record it as the last message.
pub fn push_message(store: &Store, message: Value) -> WriteOutcome {
    let mut conversation = store
        .get("chat.conversation")
        .and_then(|value| value.as_array().cloned())
        .unwrap_or_default();
    conversation.push(message.clone());
    let outcome = store.set("chat.conversation", Value::Array(conversation));
    if outcome.applied() {
        store.set("chat.lastMessage", message);
    }
    outcome
}

pub fn clear_conversation(store: &Store) -> WriteOutcome {
    let outcome = store.set("chat.conversation", json!([]));
    store.set("chat.lastMessage", Value::Null);
    outcome
}

pub fn set_chat_loading(store: &Store, loading: bool) -> WriteOutcome {
    store.set("chat.loading", json!(loading))
}

pub fn set_connection_status(store: &Store, status: &str) -> WriteOutcome {
    store.set("chat.connectionStatus", json!(status))
}

pub fn set_admin_logged_in(store: &Store, logged_in: bool) -> WriteOutcome {
    store.set("admin.loggedIn", json!(logged_in))
}

pub fn set_theme(store: &Store, theme: &str) -> WriteOutcome {
    store.set("ui.theme", json!(theme))
}

pub fn set_sidebar_open(store: &Store, open: bool) -> WriteOutcome {
    store.set("ui.sidebarOpen", json!(open))
}

pub fn set_modal_open(store: &Store, modal: Option<&str>) -> WriteOutcome {
    store.set("ui.modalOpen", modal.map_or(Value::Null, |name| json!(name)))
}

/// Append a notification object; the caller supplies the `id` used later for
/// removal.
pub fn push_notification(store: &Store, notification: Value) -> WriteOutcome {
    let mut notifications = store
        .get("ui.notifications")
        .and_then(|value| value.as_array().cloned())
        .unwrap_or_default();
    notifications.push(notification);
    store.set("ui.notifications", Value::Array(notifications))
}

pub fn remove_notification(store: &Store, id: &str) -> WriteOutcome {
    let notifications = store
        .get("ui.notifications")
        .and_then(|value| value.as_array().cloned())
        .unwrap_or_default();
    let remaining: Vec<Value> = notifications
        .into_iter()
        .filter(|entry| entry.get("id").and_then(Value::as_str) != Some(id))
        .collect();
    store.set("ui.notifications", Value::Array(remaining))
}
