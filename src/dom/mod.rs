//! Element tree and event-listener registry.
//!
//! The "output node" of a rendered component lives here. [`Document`] is an
//! arena of nodes addressed by [`NodeId`]; components parse their markup
//! strings into fragments, materialize them in the arena, and swap subtrees
//! in place on re-render. Event listeners are registered per `(node, event)`
//! pair and dispatched synchronously.
//!
//! `Document` is a cheap `Clone` handle around shared interior state, so a
//! single document can be handed to every component at construction.

pub mod parser;

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use parser::{escape_attribute, escape_text, MarkupNode};

/// Handle to a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

/// Callback bound to a `(node, event name)` pair.
pub type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Errors from explicit tree mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("node does not exist in this document")]
    NodeNotFound,

    #[error("node has no parent")]
    NotAttached,

    #[error("appending the node would create a cycle")]
    WouldCycle,
}

enum NodeKind {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Default)]
struct DocumentInner {
    nodes: HashMap<NodeId, NodeData>,
    listeners: HashMap<(NodeId, String), Vec<EventCallback>>,
    next_id: u64,
}

/// Arena-backed element tree shared by every component of an application.
#[derive(Clone, Default)]
pub struct Document {
    inner: Arc<RwLock<DocumentInner>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element node.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.insert(NodeKind::Element {
            tag: tag.to_string(),
            attributes: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: &str) -> NodeId {
        self.insert(NodeKind::Text(text.to_string()))
    }

    /// Materialize a parsed markup fragment; returns its root node.
    pub fn insert_fragment(&self, fragment: MarkupNode) -> NodeId {
        let mut inner = self.inner.write();
        insert_fragment_locked(&mut inner, fragment, None)
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(&parent) || !inner.nodes.contains_key(&child) {
            return Err(DomError::NodeNotFound);
        }
        if parent == child || is_ancestor_locked(&inner, child, parent) {
            return Err(DomError::WouldCycle);
        }
        detach_locked(&mut inner, child);
        if let Some(data) = inner.nodes.get_mut(&parent) {
            data.children.push(child);
        }
        if let Some(data) = inner.nodes.get_mut(&child) {
            data.parent = Some(parent);
        }
        Ok(())
    }

    /// Swap `new` into the exact position `old` occupies under its parent.
    /// `old` is left detached (not freed); callers that no longer need it
    /// should follow up with [`Document::remove`].
    pub fn replace_child(&self, old: NodeId, new: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(&old) || !inner.nodes.contains_key(&new) {
            return Err(DomError::NodeNotFound);
        }
        let parent = inner
            .nodes
            .get(&old)
            .and_then(|data| data.parent)
            .ok_or(DomError::NotAttached)?;
        if is_ancestor_locked(&inner, new, parent) {
            return Err(DomError::WouldCycle);
        }
        detach_locked(&mut inner, new);
        if let Some(parent_data) = inner.nodes.get_mut(&parent) {
            if let Some(index) = parent_data.children.iter().position(|&id| id == old) {
                parent_data.children[index] = new;
            }
        }
        if let Some(data) = inner.nodes.get_mut(&new) {
            data.parent = Some(parent);
        }
        if let Some(data) = inner.nodes.get_mut(&old) {
            data.parent = None;
        }
        Ok(())
    }

    /// Unlink `node` from its parent. The node and its subtree stay alive and
    /// can be re-appended later (this is what component unmount uses).
    pub fn detach(&self, node: NodeId) {
        let mut inner = self.inner.write();
        detach_locked(&mut inner, node);
    }

    /// Detach `node` and free its entire subtree, including listeners.
    pub fn remove(&self, node: NodeId) {
        let mut inner = self.inner.write();
        detach_locked(&mut inner, node);
        remove_subtree_locked(&mut inner, node);
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.read().nodes.contains_key(&node)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.read().nodes.get(&node)?.parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .read()
            .nodes
            .get(&node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        match &self.inner.read().nodes.get(&node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let inner = self.inner.read();
        let mut out = String::new();
        collect_text_locked(&inner, node, &mut out);
        out
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.inner.read().nodes.get(&node)?.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(attr, _)| attr == name)
                .map(|(_, value)| value.clone()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut inner = self.inner.write();
        if let Some(NodeData {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = inner.nodes.get_mut(&node)
        {
            match attributes.iter_mut().find(|(attr, _)| attr == name) {
                Some(slot) => slot.1 = value.to_string(),
                None => attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        let mut inner = self.inner.write();
        if let Some(NodeData {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = inner.nodes.get_mut(&node)
        {
            attributes.retain(|(attr, _)| attr != name);
        }
    }

    pub fn add_class(&self, node: NodeId, class: &str) {
        let mut classes = self.classes(node);
        if !classes.iter().any(|existing| existing == class) {
            classes.push(class.to_string());
            self.set_attribute(node, "class", &classes.join(" "));
        }
    }

    pub fn remove_class(&self, node: NodeId, class: &str) {
        let mut classes = self.classes(node);
        let before = classes.len();
        classes.retain(|existing| existing != class);
        if classes.len() != before {
            self.set_attribute(node, "class", &classes.join(" "));
        }
    }

    pub fn toggle_class(&self, node: NodeId, class: &str) {
        if self.classes(node).iter().any(|existing| existing == class) {
            self.remove_class(node, class);
        } else {
            self.add_class(node, class);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).iter().any(|existing| existing == class)
    }

    fn classes(&self, node: NodeId) -> Vec<String> {
        self.attribute(node, "class")
            .map(|value| value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Find the first node carrying `id="..."`. Used to resolve `#id` mount
    /// selectors; linear over the arena, which is fine at UI scale.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        let inner = self.inner.read();
        let mut candidates: Vec<&NodeId> = inner.nodes.keys().collect();
        candidates.sort(); // deterministic pick when duplicated
        candidates.into_iter().copied().find(|node| {
            matches!(
                &inner.nodes[node].kind,
                NodeKind::Element { attributes, .. }
                    if attributes.iter().any(|(name, value)| name == "id" && value == id)
            )
        })
    }

    /// Register a listener for `event` on `node`. Listeners fire in
    /// registration order and die with the node.
    pub fn add_listener(&self, node: NodeId, event: &str, callback: EventCallback) {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(&node) {
            return;
        }
        inner
            .listeners
            .entry((node, event.to_string()))
            .or_default()
            .push(callback);
    }

    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.inner
            .read()
            .listeners
            .get(&(node, event.to_string()))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Synchronously invoke every listener for `(node, event)`, in
    /// registration order. A panicking listener is logged and skipped so it
    /// cannot block the rest. Returns the number of listeners invoked.
    pub fn dispatch(&self, node: NodeId, event: &str, payload: &Value) -> usize {
        let callbacks: Vec<EventCallback> = {
            let inner = self.inner.read();
            inner
                .listeners
                .get(&(node, event.to_string()))
                .cloned()
                .unwrap_or_default()
        };
        for callback in &callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
                tracing::error!(event, "listener panicked during dispatch");
            }
        }
        callbacks.len()
    }

    /// Number of live nodes, attached or not. Useful for leak assertions.
    pub fn node_count(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Serialize the subtree rooted at `node` back into markup.
    pub fn to_markup(&self, node: NodeId) -> Option<String> {
        let inner = self.inner.read();
        if !inner.nodes.contains_key(&node) {
            return None;
        }
        let mut out = String::new();
        serialize_locked(&inner, node, &mut out);
        Some(out)
    }

    fn insert(&self, kind: NodeKind) -> NodeId {
        let mut inner = self.inner.write();
        insert_locked(&mut inner, kind, None)
    }
}

fn insert_locked(inner: &mut DocumentInner, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
    let id = NodeId(inner.next_id);
    inner.next_id += 1;
    inner.nodes.insert(
        id,
        NodeData {
            kind,
            parent,
            children: Vec::new(),
        },
    );
    if let Some(parent) = parent {
        if let Some(data) = inner.nodes.get_mut(&parent) {
            data.children.push(id);
        }
    }
    id
}

fn insert_fragment_locked(
    inner: &mut DocumentInner,
    fragment: MarkupNode,
    parent: Option<NodeId>,
) -> NodeId {
    match fragment {
        MarkupNode::Element {
            tag,
            attributes,
            children,
        } => {
            let id = insert_locked(inner, NodeKind::Element { tag, attributes }, parent);
            for child in children {
                insert_fragment_locked(inner, child, Some(id));
            }
            id
        }
        MarkupNode::Text(text) => insert_locked(inner, NodeKind::Text(text), parent),
    }
}

fn detach_locked(inner: &mut DocumentInner, node: NodeId) {
    let Some(parent) = inner.nodes.get(&node).and_then(|data| data.parent) else {
        return;
    };
    if let Some(parent_data) = inner.nodes.get_mut(&parent) {
        parent_data.children.retain(|&id| id != node);
    }
    if let Some(data) = inner.nodes.get_mut(&node) {
        data.parent = None;
    }
}

fn remove_subtree_locked(inner: &mut DocumentInner, node: NodeId) {
    let Some(data) = inner.nodes.remove(&node) else {
        return;
    };
    inner.listeners.retain(|(owner, _), _| *owner != node);
    for child in data.children {
        remove_subtree_locked(inner, child);
    }
}

fn is_ancestor_locked(inner: &DocumentInner, candidate: NodeId, node: NodeId) -> bool {
    let mut current = inner.nodes.get(&node).and_then(|data| data.parent);
    while let Some(id) = current {
        if id == candidate {
            return true;
        }
        current = inner.nodes.get(&id).and_then(|data| data.parent);
    }
    false
}

fn collect_text_locked(inner: &DocumentInner, node: NodeId, out: &mut String) {
    let Some(data) = inner.nodes.get(&node) else {
        return;
    };
    match &data.kind {
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Element { .. } => {
            for child in &data.children {
                collect_text_locked(inner, *child, out);
            }
        }
    }
}

fn serialize_locked(inner: &DocumentInner, node: NodeId, out: &mut String) {
    let Some(data) = inner.nodes.get(&node) else {
        return;
    };
    match &data.kind {
        NodeKind::Text(text) => out.push_str(&escape_text(text)),
        NodeKind::Element { tag, attributes } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
            }
            if data.children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in &data.children {
                serialize_locked(inner, *child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}
