//! Component lifecycle engine.
//!
//! Widgets implement the [`Widget`] trait (template plus lifecycle hooks);
//! the engine pairs one widget with a lifecycle record (id, config, local
//! state, event bindings, output node, flags) and drives the contract:
//!
//! ```text
//! constructed → initialized → (rendered ⇄ re-rendered) → mounted
//!            → unmounted → destroyed (terminal, idempotent)
//! ```
//!
//! Rendering parses the widget's markup string into a single output node and
//! freshly binds every registered handler to it; there is no incremental
//! patching. A failing template never propagates: the caller gets a visible,
//! dismissible error node instead.

pub mod config;
pub mod shared;

use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::bus::{topics, EventBus};
use crate::dom::{parser, Document, NodeId};
use crate::path;
use crate::store::Store;

pub use config::{ComponentConfig, EventBinding};
pub use shared::SharedComponent;

/// Failure produced by a widget's `render_template`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("template error: {0}")]
pub struct TemplateError(pub String);

impl TemplateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors surfaced to callers of the lifecycle engine.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// Mounting is an explicit caller action; an unresolvable target has no
    /// sane silent fallback.
    #[error("mount target not found: {target}")]
    MountTargetNotFound { target: String },

    /// The component is destroyed and accepts no further lifecycle calls.
    #[error("component is destroyed")]
    Destroyed,

    /// A widget's initialization hook failed.
    #[error("initialization failed: {0}")]
    Init(String),
}

/// Where to mount a component.
#[derive(Debug, Clone)]
pub enum MountTarget {
    Node(NodeId),
    /// `#id` selector resolved against the document.
    Selector(String),
}

impl From<NodeId> for MountTarget {
    fn from(node: NodeId) -> Self {
        MountTarget::Node(node)
    }
}

impl From<&str> for MountTarget {
    fn from(selector: &str) -> Self {
        MountTarget::Selector(selector.to_string())
    }
}

impl From<String> for MountTarget {
    fn from(selector: String) -> Self {
        MountTarget::Selector(selector)
    }
}

/// Contract every concrete widget implements. All hooks except
/// `render_template` have do-nothing defaults.
pub trait Widget: Send + Sync + 'static {
    /// Runs once during construction, before state and events are set up.
    /// An error leaves the component inert (logged, never propagated).
    fn on_init(&self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Declare the widget's initial local state shape.
    fn setup_state(&self) -> Value {
        Value::Object(Map::new())
    }

    /// Declare the widget's own event bindings. Config-supplied handlers are
    /// merged over these.
    fn setup_events(&self) -> Vec<EventBinding> {
        Vec::new()
    }

    /// Produce the markup string for the current state. Must yield a single
    /// root element.
    fn render_template(&self, state: &Value) -> Result<String, TemplateError>;

    fn on_render(&self, _state: &Value) {}
    fn on_mount(&self, _state: &Value) {}
    fn on_destroy(&self) {}
}

/// The capability consumed by code that manages heterogeneous components.
pub trait Renderable {
    fn render(&mut self) -> Result<NodeId, ComponentError>;
    fn mount(&mut self, target: MountTarget) -> Result<NodeId, ComponentError>;
    fn unmount(&mut self);
    fn update(&mut self, partial: Value);
    fn destroy(&mut self);
    fn node(&self) -> Option<NodeId>;
    fn is_destroyed(&self) -> bool;
}

struct Lifecycle {
    id: String,
    config: ComponentConfig,
    state: Value,
    bindings: Vec<EventBinding>,
    node: Option<NodeId>,
    is_rendered: bool,
    is_mounted: bool,
    is_destroyed: bool,
    render_count: u64,
    document: Document,
    store: Store,
    bus: EventBus,
}

/// One widget plus its lifecycle record.
pub struct Component<W: Widget> {
    widget: W,
    lifecycle: Lifecycle,
}

/// Snapshot of a component's identity and flags, for diagnostics.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub id: String,
    pub widget: &'static str,
    pub is_rendered: bool,
    pub is_mounted: bool,
    pub is_destroyed: bool,
    pub events: Vec<String>,
}

impl<W: Widget> Component<W> {
    /// Construct and initialize a component. Initialization failures are
    /// logged and leave the component inert; a bad widget must not take the
    /// whole page down.
    pub fn new(
        widget: W,
        config: ComponentConfig,
        document: Document,
        store: Store,
        bus: EventBus,
    ) -> Self {
        let id = config
            .id
            .clone()
            .unwrap_or_else(|| format!("component-{}", Uuid::new_v4()));
        let mut component = Self {
            widget,
            lifecycle: Lifecycle {
                id,
                config,
                state: Value::Object(Map::new()),
                bindings: Vec::new(),
                node: None,
                is_rendered: false,
                is_mounted: false,
                is_destroyed: false,
                render_count: 0,
                document,
                store,
                bus,
            },
        };
        component.init();
        component
    }

    fn init(&mut self) {
        if let Err(err) = self.widget.on_init() {
            tracing::error!(id = %self.lifecycle.id, error = %err, "component initialization failed");
            self.lifecycle.is_destroyed = true;
            return;
        }
        self.lifecycle.state = self.widget.setup_state();
        let mut bindings = self.widget.setup_events();
        bindings.extend(self.lifecycle.config.events.clone());
        self.lifecycle.bindings = bindings;
    }

    /// Render the widget into a fresh output node. Every registered handler
    /// is re-bound to the new node. A failing template degrades to a
    /// dismissible error node; the only hard error is calling this on a
    /// destroyed component.
    pub fn render(&mut self) -> Result<NodeId, ComponentError> {
        if self.lifecycle.is_destroyed {
            tracing::warn!(id = %self.lifecycle.id, "render called on destroyed component");
            return Err(ComponentError::Destroyed);
        }

        let node = match self.build_node() {
            Ok(node) => {
                self.apply_config(node);
                self.attach_bindings(node);
                node
            }
            Err(message) => {
                tracing::error!(id = %self.lifecycle.id, error = %message, "component render failed");
                self.lifecycle.bus.emit(
                    topics::COMPONENT_ERROR,
                    json!({"id": self.lifecycle.id, "error": message}),
                );
                self.error_node(&message)
            }
        };

        // A previous node still attached somewhere is the re-render swap
        // target; a detached one is garbage.
        if let Some(previous) = self.lifecycle.node.replace(node) {
            if previous != node && self.lifecycle.document.parent(previous).is_none() {
                self.lifecycle.document.remove(previous);
            }
        }
        self.lifecycle.is_rendered = true;
        self.lifecycle.render_count += 1;
        self.widget.on_render(&self.lifecycle.state);
        Ok(node)
    }

    /// Mount the component under `target`, rendering first if needed.
    pub fn mount(&mut self, target: impl Into<MountTarget>) -> Result<NodeId, ComponentError> {
        if self.lifecycle.is_destroyed {
            return Err(ComponentError::Destroyed);
        }
        let target = target.into();
        let node = match self.lifecycle.node {
            Some(node) if self.lifecycle.is_rendered => node,
            _ => self.render()?,
        };
        let parent = self.resolve_target(&target)?;
        if self.lifecycle.document.append_child(parent, node).is_err() {
            return Err(ComponentError::MountTargetNotFound {
                target: format!("{target:?}"),
            });
        }
        self.lifecycle.is_mounted = true;
        self.widget.on_mount(&self.lifecycle.state);
        self.lifecycle
            .bus
            .emit(topics::COMPONENT_MOUNTED, json!({"id": self.lifecycle.id}));
        Ok(node)
    }

    /// Detach the output node from its parent; the component stays rendered
    /// and can be mounted again.
    pub fn unmount(&mut self) {
        if let Some(node) = self.lifecycle.node {
            self.lifecycle.document.detach(node);
        }
        self.lifecycle.is_mounted = false;
    }

    /// Shallow-merge `partial` into local state; re-render only when the new
    /// state is structurally different from the old.
    pub fn update(&mut self, partial: Value) {
        if self.lifecycle.is_destroyed {
            return;
        }
        let old_state = self.lifecycle.state.clone();
        match partial {
            Value::Object(entries) => {
                if !self.lifecycle.state.is_object() {
                    self.lifecycle.state = Value::Object(Map::new());
                }
                if let Value::Object(state) = &mut self.lifecycle.state {
                    for (key, value) in entries {
                        state.insert(key, value);
                    }
                }
            }
            Value::Null => {}
            other => self.lifecycle.state = other,
        }
        self.rerender_if_changed(&old_state);
    }

    /// Targeted dot-path write into local state, with the same
    /// compare-and-re-render contract as [`Component::update`].
    pub fn set_state(&mut self, state_path: &str, value: Value) {
        if self.lifecycle.is_destroyed {
            return;
        }
        let old_state = self.lifecycle.state.clone();
        path::set_in(&mut self.lifecycle.state, state_path, value);
        self.rerender_if_changed(&old_state);
    }

    /// Re-render unconditionally (used by store-driven bindings).
    pub fn refresh(&mut self) {
        if !self.lifecycle.is_destroyed && self.lifecycle.is_rendered {
            self.re_render();
        }
    }

    /// Tear the component down. Idempotent; safe on a never-rendered
    /// component. After this, no lifecycle call has any effect.
    pub fn destroy(&mut self) {
        if self.lifecycle.is_destroyed {
            return;
        }
        self.lifecycle.bindings.clear();
        if let Some(node) = self.lifecycle.node.take() {
            self.lifecycle.document.remove(node);
        }
        self.lifecycle.state = Value::Object(Map::new());
        self.lifecycle.is_rendered = false;
        self.lifecycle.is_mounted = false;
        self.lifecycle.is_destroyed = true;
        self.widget.on_destroy();
        self.lifecycle
            .bus
            .emit(topics::COMPONENT_DESTROYED, json!({"id": self.lifecycle.id}));
    }

    pub fn id(&self) -> &str {
        &self.lifecycle.id
    }

    pub fn node(&self) -> Option<NodeId> {
        self.lifecycle.node
    }

    pub fn state(&self) -> &Value {
        &self.lifecycle.state
    }

    pub fn is_rendered(&self) -> bool {
        self.lifecycle.is_rendered
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle.is_destroyed
    }

    /// How many times this component has rendered. Lets tests observe the
    /// no-op update optimization.
    pub fn render_count(&self) -> u64 {
        self.lifecycle.render_count
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn document(&self) -> &Document {
        &self.lifecycle.document
    }

    pub fn store(&self) -> &Store {
        &self.lifecycle.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.lifecycle.bus
    }

    pub fn info(&self) -> ComponentInfo {
        ComponentInfo {
            id: self.lifecycle.id.clone(),
            widget: std::any::type_name::<W>(),
            is_rendered: self.lifecycle.is_rendered,
            is_mounted: self.lifecycle.is_mounted,
            is_destroyed: self.lifecycle.is_destroyed,
            events: self
                .lifecycle
                .bindings
                .iter()
                .map(|binding| binding.event.clone())
                .collect(),
        }
    }

    fn build_node(&self) -> Result<NodeId, String> {
        let markup = self
            .widget
            .render_template(&self.lifecycle.state)
            .map_err(|err| err.to_string())?;
        let fragment = parser::parse(&markup).map_err(|err| err.to_string())?;
        Ok(self.lifecycle.document.insert_fragment(fragment))
    }

    fn apply_config(&self, node: NodeId) {
        let document = &self.lifecycle.document;
        document.set_attribute(node, "data-component-id", &self.lifecycle.id);
        if !self.lifecycle.config.class_name.is_empty() {
            for class in self.lifecycle.config.class_name.split_whitespace() {
                document.add_class(node, class);
            }
        }
        for (name, value) in &self.lifecycle.config.attributes {
            document.set_attribute(node, name, value);
        }
    }

    fn attach_bindings(&self, node: NodeId) {
        for binding in &self.lifecycle.bindings {
            self.lifecycle
                .document
                .add_listener(node, &binding.event, binding.callback.clone());
        }
    }

    fn rerender_if_changed(&mut self, old_state: &Value) {
        if self.lifecycle.state != *old_state && self.lifecycle.is_rendered {
            self.re_render();
        }
    }

    fn re_render(&mut self) {
        let previous = self.lifecycle.node;
        let Ok(next) = self.render() else {
            return;
        };
        if let Some(previous) = previous {
            if previous != next && self.lifecycle.document.parent(previous).is_some() {
                // Atomic swap at the old position, then drop the old subtree.
                if self.lifecycle.document.replace_child(previous, next).is_ok() {
                    self.lifecycle.document.remove(previous);
                }
            }
        }
    }

    fn resolve_target(&self, target: &MountTarget) -> Result<NodeId, ComponentError> {
        let resolved = match target {
            MountTarget::Node(node) if self.lifecycle.document.contains(*node) => Some(*node),
            MountTarget::Node(_) => None,
            MountTarget::Selector(selector) => selector
                .strip_prefix('#')
                .and_then(|id| self.lifecycle.document.find_by_id(id)),
        };
        resolved.ok_or_else(|| ComponentError::MountTargetNotFound {
            target: format!("{target:?}"),
        })
    }

    /// Visible fallback shown when a template fails: heading, message, and a
    /// dismiss button that removes the node from the document.
    fn error_node(&self, message: &str) -> NodeId {
        let document = &self.lifecycle.document;
        let wrapper = document.create_element("div");
        document.set_attribute(wrapper, "class", "component-error");

        let content = document.create_element("div");
        document.set_attribute(content, "class", "error-content");
        let _ = document.append_child(wrapper, content);

        let heading = document.create_element("h3");
        let heading_text = document.create_text("Component error");
        let _ = document.append_child(heading, heading_text);
        let _ = document.append_child(content, heading);

        let body = document.create_element("p");
        let body_text = document.create_text(message);
        let _ = document.append_child(body, body_text);
        let _ = document.append_child(content, body);

        let dismiss = document.create_element("button");
        document.set_attribute(dismiss, "class", "btn error-dismiss");
        let dismiss_text = document.create_text("Dismiss");
        let _ = document.append_child(dismiss, dismiss_text);
        let _ = document.append_child(content, dismiss);

        let dismiss_document = document.clone();
        document.add_listener(
            dismiss,
            "click",
            std::sync::Arc::new(move |_| {
                dismiss_document.remove(wrapper);
            }),
        );

        wrapper
    }
}

impl<W: Widget> Renderable for Component<W> {
    fn render(&mut self) -> Result<NodeId, ComponentError> {
        Component::render(self)
    }

    fn mount(&mut self, target: MountTarget) -> Result<NodeId, ComponentError> {
        Component::mount(self, target)
    }

    fn unmount(&mut self) {
        Component::unmount(self)
    }

    fn update(&mut self, partial: Value) {
        Component::update(self, partial)
    }

    fn destroy(&mut self) {
        Component::destroy(self)
    }

    fn node(&self) -> Option<NodeId> {
        Component::node(self)
    }

    fn is_destroyed(&self) -> bool {
        Component::is_destroyed(self)
    }
}
