//! Framework-free UI core for the chat/admin client.
//!
//! Two tightly coupled pieces with real depth live here: the component
//! lifecycle engine and the path-addressed, middleware-driven state store.
//! Everything else (concrete widgets, the REST client, the realtime
//! transport) consumes their contracts from outside this crate.
//!
//! Control flow: external input → handler mutates local component state or
//! the shared store → the store notifies matching subscribers → affected
//! components re-render → the new output node replaces the old one in place.
//!
//! There are no global singletons: one [`Document`], one [`Store`] and one
//! [`EventBus`] are constructed at startup and injected into every component,
//! so tests get isolated instances for free.

pub mod bus;
pub mod component;
pub mod dom;
pub mod path;
pub mod store;

pub use bus::{topics, BusCallback, BusMiddlewareFn, EventBus, ListenerId, ListenerOptions};
pub use component::{
    Component, ComponentConfig, ComponentError, ComponentInfo, EventBinding, MountTarget,
    Renderable, SharedComponent, TemplateError, Widget,
};
pub use dom::parser::{parse, MarkupError, MarkupNode};
pub use dom::{Document, DomError, EventCallback, NodeId};
pub use store::middleware::{
    hydrate, logging_middleware, persistence_middleware, KeyValue, MemoryKv, MiddlewareFn,
    PersistError,
};
pub use store::{
    initial_state, Change, Store, SubscribeOptions, SubscriberFn, Subscription, SubscriptionId,
    WriteOutcome,
};
