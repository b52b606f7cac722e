//! Per-component construction configuration.
//!
//! Every option is a named, typed, documented field; unknown options simply
//! cannot exist.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dom::EventCallback;

/// An event-name → handler pair, bound to the component's output node on
/// every render.
#[derive(Clone)]
pub struct EventBinding {
    pub event: String,
    pub callback: EventCallback,
}

impl EventBinding {
    pub fn new<F>(event: &str, callback: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Self {
            event: event.to_string(),
            callback: Arc::new(callback),
        }
    }
}

impl fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventBinding").field(&self.event).finish()
    }
}

/// Construction options shared by every component type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Stable component id. Default: a generated `component-<uuid>` id.
    #[serde(default)]
    pub id: Option<String>,
    /// Extra CSS classes added to the output node. Default: none.
    #[serde(default)]
    pub class_name: String,
    /// Extra attributes set on the output node. Default: none.
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    /// Caller-supplied handlers, merged over the widget's own
    /// `setup_events` bindings. Default: none.
    #[serde(skip)]
    pub events: Vec<EventBinding>,
}

impl ComponentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class_name: &str) -> Self {
        self.class_name = class_name.to_string();
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn on<F>(mut self, event: &str, callback: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.events.push(EventBinding::new(event, callback));
        self
    }
}
