//! Shared test fixtures: probe-instrumented widgets and environment setup.

#![allow(dead_code, unused_imports)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use lumen_ui::{
    Component, ComponentConfig, ComponentError, Document, EventBinding, EventBus, Store,
    TemplateError, Widget,
};
use serde_json::{json, Value};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// One isolated document/store/bus triple per test.
pub fn env() -> (Document, Store, EventBus) {
    init_tracing();
    (Document::new(), Store::new(), EventBus::new())
}

/// Hook counters shared between a widget and its test.
#[derive(Clone, Default)]
pub struct Probe {
    pub inits: Arc<AtomicUsize>,
    pub renders: Arc<AtomicUsize>,
    pub mounts: Arc<AtomicUsize>,
    pub destroys: Arc<AtomicUsize>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn mounts(&self) -> usize {
        self.mounts.load(Ordering::SeqCst)
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

/// Minimal well-behaved widget: renders its `text` state into a span and
/// counts clicks on its root node.
pub struct LabelWidget {
    pub probe: Probe,
    pub clicks: Arc<AtomicUsize>,
}

impl LabelWidget {
    pub fn new() -> Self {
        Self {
            probe: Probe::new(),
            clicks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn clicks(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }
}

impl Widget for LabelWidget {
    fn on_init(&self) -> Result<(), ComponentError> {
        self.probe.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn setup_state(&self) -> Value {
        json!({"text": "hello", "count": 0})
    }

    fn setup_events(&self) -> Vec<EventBinding> {
        let clicks = Arc::clone(&self.clicks);
        vec![EventBinding::new("click", move |_| {
            clicks.fetch_add(1, Ordering::SeqCst);
        })]
    }

    fn render_template(&self, state: &Value) -> Result<String, TemplateError> {
        let text = state["text"].as_str().unwrap_or_default();
        Ok(format!(r#"<div class="label"><span>{text}</span></div>"#))
    }

    fn on_render(&self, _state: &Value) {
        self.probe.renders.fetch_add(1, Ordering::SeqCst);
    }

    fn on_mount(&self, _state: &Value) {
        self.probe.mounts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_destroy(&self) {
        self.probe.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

/// Widget whose template always fails.
pub struct FailingWidget;

impl Widget for FailingWidget {
    fn render_template(&self, _state: &Value) -> Result<String, TemplateError> {
        Err(TemplateError::new("template exploded"))
    }
}

/// Widget whose initialization hook fails.
pub struct BadInitWidget;

impl Widget for BadInitWidget {
    fn on_init(&self) -> Result<(), ComponentError> {
        Err(ComponentError::Init("malformed options".to_string()))
    }

    fn render_template(&self, _state: &Value) -> Result<String, TemplateError> {
        Ok("<div/>".to_string())
    }
}

pub fn make_component<W: Widget>(
    widget: W,
    document: &Document,
    store: &Store,
    bus: &EventBus,
) -> Component<W> {
    Component::new(
        widget,
        ComponentConfig::default(),
        document.clone(),
        store.clone(),
        bus.clone(),
    )
}
