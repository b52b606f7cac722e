//! Shared component handles for store-driven re-rendering.
//!
//! A store subscription callback cannot hold `&mut Component`, so components
//! that re-render in reaction to store writes are wrapped in a
//! [`SharedComponent`]. The subscription holds only a weak reference and
//! checks the destroyed flag before touching the component, which is how a
//! destroyed component stops reacting to pending deferred completions.
//!
//! Do not write to the store while holding the component lock through
//! [`SharedComponent::with`] / [`SharedComponent::with_mut`]; the re-render
//! subscription would deadlock trying to lock the same component.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::component::{Component, Widget};
use crate::store::{Store, SubscribeOptions, Subscription};

/// Cheaply cloneable shared handle to a component.
pub struct SharedComponent<W: Widget> {
    inner: Arc<RwLock<Component<W>>>,
}

impl<W: Widget> Clone for SharedComponent<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Widget> SharedComponent<W> {
    pub fn new(component: Component<W>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(component)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&Component<W>) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Component<W>) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Re-render this component whenever a write matching `listener_path`
    /// lands in `store`. The caller owns the returned [`Subscription`];
    /// unsubscribing (or destroying the component) stops the reaction.
    pub fn watch(&self, store: &Store, listener_path: &str) -> Subscription {
        let weak: Weak<RwLock<Component<W>>> = Arc::downgrade(&self.inner);
        store.subscribe(
            listener_path,
            move |_change| {
                let Some(component) = weak.upgrade() else {
                    return;
                };
                let mut component = component.write();
                if component.is_destroyed() {
                    return;
                }
                component.refresh();
            },
            SubscribeOptions::default(),
        )
    }
}
