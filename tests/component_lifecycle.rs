//! Render / mount / update / destroy contracts of the lifecycle engine.

mod common;

use common::*;
use lumen_ui::{topics, ComponentConfig, Component, ComponentError, Renderable, SharedComponent};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn render_produces_node_and_fires_hook() {
    let (document, store, bus) = env();
    let widget = LabelWidget::new();
    let probe = widget.probe.clone();
    let mut component = make_component(widget, &document, &store, &bus);

    assert_eq!(probe.inits(), 1);
    assert!(!component.is_rendered());

    let node = component.render().unwrap();
    assert!(component.is_rendered());
    assert_eq!(probe.renders(), 1);
    assert_eq!(document.tag(node).as_deref(), Some("div"));
    assert_eq!(document.text_content(node), "hello");
}

#[test]
fn mount_by_node_appends_and_fires_hook() {
    let (document, store, bus) = env();
    let container = document.create_element("main");
    let widget = LabelWidget::new();
    let probe = widget.probe.clone();
    let mut component = make_component(widget, &document, &store, &bus);

    let node = component.mount(container).unwrap();
    assert!(component.is_mounted());
    assert_eq!(probe.mounts(), 1);
    // mount renders lazily when needed
    assert_eq!(probe.renders(), 1);
    assert_eq!(document.children(container), vec![node]);
}

#[test]
fn mount_by_selector_resolves_id() {
    let (document, store, bus) = env();
    let container = document.create_element("section");
    document.set_attribute(container, "id", "chat-root");

    let mut component = make_component(LabelWidget::new(), &document, &store, &bus);
    let node = component.mount("#chat-root").unwrap();
    assert_eq!(document.parent(node), Some(container));
}

#[test]
fn mount_unresolvable_target_is_an_error() {
    let (document, store, bus) = env();
    let mut component = make_component(LabelWidget::new(), &document, &store, &bus);
    assert!(matches!(
        component.mount("#missing"),
        Err(ComponentError::MountTargetNotFound { .. })
    ));
    assert!(!component.is_mounted());
}

#[test]
fn mount_emits_lifecycle_topic() {
    let (document, store, bus) = env();
    let mounted = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&mounted);
    bus.on(topics::COMPONENT_MOUNTED, move |payload| {
        assert!(payload["id"].as_str().unwrap().starts_with("component-"));
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let container = document.create_element("main");
    let mut component = make_component(LabelWidget::new(), &document, &store, &bus);
    component.mount(container).unwrap();
    assert_eq!(mounted.load(Ordering::SeqCst), 1);
}

#[test]
fn update_swaps_node_in_place() {
    let (document, store, bus) = env();
    let container = document.create_element("main");
    let before = document.create_element("header");
    document.append_child(container, before).unwrap();

    let mut component = make_component(LabelWidget::new(), &document, &store, &bus);
    let first = component.mount(container).unwrap();

    let after = document.create_element("footer");
    document.append_child(container, after).unwrap();
    assert_eq!(document.children(container), vec![before, first, after]);

    component.update(json!({"text": "updated"}));
    let second = component.node().unwrap();
    assert_ne!(first, second);
    // same position, old subtree gone
    assert_eq!(document.children(container), vec![before, second, after]);
    assert!(!document.contains(first));
    assert_eq!(document.text_content(second), "updated");
}

#[test]
fn update_with_deep_equal_state_skips_re_render() {
    let (document, store, bus) = env();
    let mut component = make_component(LabelWidget::new(), &document, &store, &bus);
    component.render().unwrap();
    assert_eq!(component.render_count(), 1);

    component.update(json!({"text": "hello", "count": 0}));
    assert_eq!(component.render_count(), 1);

    component.update(json!({"count": 1}));
    assert_eq!(component.render_count(), 2);
}

#[test]
fn update_before_first_render_does_not_render() {
    let (document, store, bus) = env();
    let mut component = make_component(LabelWidget::new(), &document, &store, &bus);
    component.update(json!({"text": "early"}));
    assert_eq!(component.render_count(), 0);
    assert_eq!(component.state()["text"], json!("early"));
}

#[test]
fn listeners_are_freshly_bound_after_update() {
    let (document, store, bus) = env();
    let container = document.create_element("main");
    let widget = LabelWidget::new();
    let clicks = Arc::clone(&widget.clicks);
    let mut component = make_component(widget, &document, &store, &bus);

    let first = component.mount(container).unwrap();
    document.dispatch(first, "click", &json!({}));
    assert_eq!(clicks.load(Ordering::SeqCst), 1);

    component.update(json!({"text": "again"}));
    let second = component.node().unwrap();
    assert_eq!(document.listener_count(second, "click"), 1);
    document.dispatch(second, "click", &json!({}));
    assert_eq!(clicks.load(Ordering::SeqCst), 2);
}

#[test]
fn set_state_writes_nested_path_and_re_renders() {
    let (document, store, bus) = env();
    let mut component = make_component(LabelWidget::new(), &document, &store, &bus);
    component.render().unwrap();

    component.set_state("meta.badge", json!("new"));
    assert_eq!(component.state()["meta"]["badge"], json!("new"));
    assert_eq!(component.render_count(), 2);

    component.set_state("meta.badge", json!("new"));
    assert_eq!(component.render_count(), 2);
}

#[test]
fn failing_template_degrades_to_dismissible_error_node() {
    let (document, store, bus) = env();
    let mut component = make_component(FailingWidget, &document, &store, &bus);

    let node = component.render().unwrap();
    assert!(document.has_class(node, "component-error"));
    assert!(document.text_content(node).contains("template exploded"));

    // find the dismiss button and click it
    let content = document.children(node)[0];
    let button = document
        .children(content)
        .into_iter()
        .find(|&child| document.tag(child).as_deref() == Some("button"))
        .expect("error node has a dismiss button");
    document.dispatch(button, "click", &json!({}));
    assert!(!document.contains(node));
}

#[test]
fn failing_template_emits_error_topic() {
    let (document, store, bus) = env();
    let errors = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&errors);
    bus.on(topics::COMPONENT_ERROR, move |payload| {
        assert_eq!(payload["error"], json!("template error: template exploded"));
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let mut component = make_component(FailingWidget, &document, &store, &bus);
    component.render().unwrap();
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[test]
fn invalid_markup_also_degrades_to_error_node() {
    struct BrokenMarkup;
    impl lumen_ui::Widget for BrokenMarkup {
        fn render_template(
            &self,
            _state: &serde_json::Value,
        ) -> Result<String, lumen_ui::TemplateError> {
            Ok("<div><span>mismatched</div></span>".to_string())
        }
    }

    let (document, store, bus) = env();
    let mut component = make_component(BrokenMarkup, &document, &store, &bus);
    let node = component.render().unwrap();
    assert!(document.has_class(node, "component-error"));
}

#[test]
fn destroy_twice_is_idempotent() {
    let (document, store, bus) = env();
    let destroyed = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&destroyed);
    bus.on(topics::COMPONENT_DESTROYED, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let container = document.create_element("main");
    let widget = LabelWidget::new();
    let probe = widget.probe.clone();
    let mut component = make_component(widget, &document, &store, &bus);
    let node = component.mount(container).unwrap();

    component.destroy();
    component.destroy();

    assert!(component.is_destroyed());
    assert!(!component.is_rendered());
    assert!(!component.is_mounted());
    assert_eq!(probe.destroys(), 1);
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    assert!(!document.contains(node));
    assert_eq!(component.state(), &json!({}));
}

#[test]
fn destroy_never_rendered_component_is_safe() {
    let (document, store, bus) = env();
    let widget = LabelWidget::new();
    let probe = widget.probe.clone();
    let mut component = make_component(widget, &document, &store, &bus);
    component.destroy();
    assert!(component.is_destroyed());
    assert_eq!(probe.destroys(), 1);
}

#[test]
fn destroyed_component_rejects_further_lifecycle_calls() {
    let (document, store, bus) = env();
    let container = document.create_element("main");
    let mut component = make_component(LabelWidget::new(), &document, &store, &bus);
    component.destroy();

    assert!(matches!(component.render(), Err(ComponentError::Destroyed)));
    assert!(matches!(
        component.mount(container),
        Err(ComponentError::Destroyed)
    ));
    component.update(json!({"text": "ignored"}));
    assert_eq!(component.state(), &json!({}));
    assert_eq!(component.render_count(), 0);
}

#[test]
fn unmount_detaches_but_allows_remounting() {
    let (document, store, bus) = env();
    let container = document.create_element("main");
    let mut component = make_component(LabelWidget::new(), &document, &store, &bus);
    let node = component.mount(container).unwrap();

    component.unmount();
    assert!(!component.is_mounted());
    assert_eq!(document.parent(node), None);
    assert!(document.contains(node));

    component.mount(container).unwrap();
    assert!(component.is_mounted());
    assert_eq!(document.parent(node), Some(container));
}

#[test]
fn config_events_are_merged_over_widget_events() {
    let (document, store, bus) = env();
    let external = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&external);
    let config = ComponentConfig::new()
        .with_id("label-1")
        .with_class("primary wide")
        .with_attribute("role", "status")
        .on("click", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

    let widget = LabelWidget::new();
    let clicks = Arc::clone(&widget.clicks);
    let mut component = Component::new(widget, config, document.clone(), store, bus);
    assert_eq!(component.id(), "label-1");

    let node = component.render().unwrap();
    assert_eq!(document.listener_count(node, "click"), 2);
    document.dispatch(node, "click", &json!({}));
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
    assert_eq!(external.load(Ordering::SeqCst), 1);

    assert!(document.has_class(node, "label"));
    assert!(document.has_class(node, "primary"));
    assert!(document.has_class(node, "wide"));
    assert_eq!(document.attribute(node, "role").as_deref(), Some("status"));
    assert_eq!(
        document.attribute(node, "data-component-id").as_deref(),
        Some("label-1")
    );
}

#[test]
fn failed_init_leaves_component_inert() {
    let (document, store, bus) = env();
    let mut component = make_component(BadInitWidget, &document, &store, &bus);
    assert!(component.is_destroyed());
    assert!(matches!(component.render(), Err(ComponentError::Destroyed)));
    assert_eq!(document.node_count(), 0);
}

#[test]
fn info_reports_identity_and_flags() {
    let (document, store, bus) = env();
    let mut component = make_component(LabelWidget::new(), &document, &store, &bus);
    component.render().unwrap();

    let info = component.info();
    assert!(info.widget.contains("LabelWidget"));
    assert!(info.is_rendered);
    assert!(!info.is_destroyed);
    assert_eq!(info.events, vec!["click".to_string()]);
}

#[test]
fn renderable_trait_object_drives_the_same_contract() {
    let (document, store, bus) = env();
    let container = document.create_element("main");
    let component = make_component(LabelWidget::new(), &document, &store, &bus);
    let mut renderable: Box<dyn Renderable> = Box::new(component);

    renderable.mount(container.into()).unwrap();
    renderable.update(json!({"text": "boxed"}));
    let node = renderable.node().unwrap();
    assert_eq!(document.text_content(node), "boxed");
    renderable.destroy();
    assert!(renderable.is_destroyed());
}

#[test]
fn shared_component_re_renders_on_watched_store_writes() {
    let (document, store, bus) = env();
    let container = document.create_element("main");
    let component = make_component(LabelWidget::new(), &document, &store, &bus);
    let shared = SharedComponent::new(component);
    shared.with_mut(|component| component.mount(container).map(|_| ())).unwrap();
    assert_eq!(shared.with(|component| component.render_count()), 1);

    let subscription = shared.watch(&store, "chat.currentMode");
    store.set("chat.currentMode", json!("sentence"));
    assert_eq!(shared.with(|component| component.render_count()), 2);

    // unrelated write does not re-render
    store.set("ui.theme", json!("light"));
    assert_eq!(shared.with(|component| component.render_count()), 2);

    subscription.unsubscribe();
    store.set("chat.currentMode", json!("passage"));
    assert_eq!(shared.with(|component| component.render_count()), 2);
}

#[test]
fn destroyed_shared_component_ignores_pending_store_writes() {
    let (document, store, bus) = env();
    let container = document.create_element("main");
    let component = make_component(LabelWidget::new(), &document, &store, &bus);
    let shared = SharedComponent::new(component);
    shared.with_mut(|component| component.mount(container).map(|_| ())).unwrap();
    let _subscription = shared.watch(&store, "chat");

    shared.with_mut(|component| component.destroy());
    // the deferred completion arrives after destruction
    store.set("chat.loading", json!(true));
    assert_eq!(shared.with(|component| component.render_count()), 1);
    assert!(shared.with(|component| component.is_destroyed()));
}
