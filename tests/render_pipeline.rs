//! End-to-end checks: store -> channel -> coordinator -> JSX renderer -> differ.

use std::cell::Cell;
use std::rc::Rc;

use spark_jsx::{
    BaseRenderer, ChangeSet, Component, JsxRenderer, KeyChange, Node, RenderConfig,
    RenderCoordinator, RenderError, Renderable, Renderer, StateStore, TreeBuilder, UpdateMode,
    Value,
};

fn coordinated(component: &Rc<Component>) -> (StateStore, RenderCoordinator<JsxRenderer>) {
    let coordinator = RenderCoordinator::new(component.clone(), JsxRenderer::new()).unwrap();
    let extra = coordinator.extra_data_config();
    let store = StateStore::with_extra(component.clone(), extra.as_ref());
    (store, coordinator)
}

/// `<ul><li>a</li>{show && <li>b</li>}<li>c</li></ul>`
fn toggled_list(show: Rc<Cell<bool>>) -> Rc<Component> {
    Component::builder("Toggle")
        .render(move |b| {
            b.element("ul", None, |b| {
                b.element("li", None, |b| {
                    b.text("a");
                    Ok(())
                })?;
                b.show(show.get(), |b| {
                    b.element("li", None, |b| {
                        b.text("b");
                        Ok(())
                    })
                })?;
                b.element("li", None, |b| {
                    b.text("c");
                    Ok(())
                })
            })
        })
        .build()
}

#[test]
fn batched_updates_start_after_first_render() {
    let component = Component::builder("Batched").build();
    let (store, coordinator) = coordinated(&component);

    store.set_state("a", 1);
    store.flush();
    assert_eq!(coordinator.renderer().construction_count(), 0);

    coordinator.render().unwrap();
    assert_eq!(coordinator.renderer().construction_count(), 1);

    store.set_state("a", 2);
    store.set_state("b", 3);
    assert_eq!(store.flush(), 2);
    assert_eq!(coordinator.renderer().construction_count(), 2);
}

#[test]
fn per_key_component_rerenders_per_state_change() {
    let component = Component::builder("PerKey").sync_updates_merged().build();
    let (store, coordinator) = coordinated(&component);
    assert_eq!(coordinator.update_mode(), UpdateMode::PerKey);
    coordinator.render().unwrap();

    store.set_state("a", 1);
    store.set_state("b", 2);
    assert_eq!(coordinator.renderer().construction_count(), 3);
}

#[test]
fn skip_window_drops_changes_without_replay() {
    let component = Component::builder("Skip").sync_updates_merged().build();
    let (store, coordinator) = coordinated(&component);
    coordinator.render().unwrap();

    coordinator.start_skip_updates();
    store.set_state("a", 1);
    store.set_state("a", 2);
    coordinator.stop_skip_updates();
    assert_eq!(coordinator.renderer().construction_count(), 1);
    assert!(!coordinator.renderer().has_pending_changes());

    store.set_state("a", 3);
    assert_eq!(coordinator.renderer().construction_count(), 2);
}

#[test]
fn prop_changes_wait_for_flush_pending() {
    let component = Component::builder("Props").sync_updates_merged().build();
    let (store, coordinator) = coordinated(&component);

    // Not rendered yet: nothing to flush.
    store.set_prop("title", "a");
    assert!(!coordinator.flush_pending().unwrap());

    coordinator.render().unwrap();
    store.set_prop("title", "b");
    assert_eq!(coordinator.renderer().construction_count(), 1);
    assert!(coordinator.renderer().prop_changes().contains_key("title"));

    assert!(coordinator.flush_pending().unwrap());
    assert_eq!(coordinator.renderer().construction_count(), 2);
    assert!(!coordinator.flush_pending().unwrap());
}

#[test]
fn rejected_update_still_clears_accumulators() {
    let component = Component::builder("Frozen")
        .should_update(|_, _| false)
        .build();
    let (store, coordinator) = coordinated(&component);
    coordinator.render().unwrap();

    store.set_state("a", 1);
    store.flush();

    let renderer = coordinator.renderer();
    assert_eq!(renderer.construction_count(), 1);
    assert!(!renderer.has_pending_changes());
}

#[test]
fn direct_update_honors_given_changes() {
    let component = Component::builder("Visible")
        .should_update(|state, _| state.contains_key("visible"))
        .build();
    let (_store, coordinator) = coordinated(&component);
    coordinator.render().unwrap();

    coordinator
        .update(&ChangeSet::singleton(KeyChange::state("visible", false, true)))
        .unwrap();
    assert_eq!(coordinator.renderer().construction_count(), 2);

    coordinator
        .update(&ChangeSet::singleton(KeyChange::state("other", 0, 1)))
        .unwrap();
    assert_eq!(coordinator.renderer().construction_count(), 2);
}

#[test]
fn direct_update_without_changes_does_nothing() {
    let component = Component::builder("Idle").build();
    let (_store, coordinator) = coordinated(&component);
    coordinator.render().unwrap();

    coordinator.update(&ChangeSet::new()).unwrap();
    assert_eq!(coordinator.renderer().construction_count(), 1);
}

#[test]
fn recovered_child_failure_keeps_sibling_keys() {
    let component = Component::builder("Recovering")
        .render(|b| {
            b.element("ul", None, |b| {
                b.leaf("li", None)?;
                let failed = b.element("li", None, |b| {
                    b.leaf("span", None)?;
                    Err(RenderError::traversal("Recovering", "bad item"))
                });
                if failed.is_err() {
                    b.skip_child();
                }
                b.leaf("li", None)
            })
        })
        .build();
    let (_store, coordinator) = coordinated(&component);
    coordinator.render().unwrap();

    let root = component.element().unwrap();
    assert_eq!(root.tag(), Some("ul"));
    assert_eq!(root.child_keys(), vec![Some("_metal_jsx_1"), Some("_metal_jsx_3")]);
}

#[test]
fn renderer_config_picks_default_container() {
    let config = RenderConfig {
        default_tag: "section".to_string(),
        ..RenderConfig::default()
    };
    let component = Component::builder("Empty")
        .render_direct(|| Ok(Renderable::Empty))
        .build();
    let coordinator =
        RenderCoordinator::new(component.clone(), JsxRenderer::with_config(config)).unwrap();
    coordinator.render().unwrap();

    assert_eq!(component.element(), Some(Node::element("section")));
}

#[test]
fn unkeyed_siblings_get_positional_keys() {
    let show = Rc::new(Cell::new(true));
    let component = toggled_list(show);
    let (_store, coordinator) = coordinated(&component);
    coordinator.render().unwrap();

    let root = component.element().unwrap();
    assert_eq!(
        root.child_keys(),
        vec![
            Some("_metal_jsx_1"),
            Some("_metal_jsx_2"),
            Some("_metal_jsx_3"),
        ]
    );
}

#[test]
fn hidden_child_keeps_later_sibling_keys() {
    let show = Rc::new(Cell::new(true));
    let component = toggled_list(show.clone());
    let (store, coordinator) = coordinated(&component);
    coordinator.render().unwrap();

    show.set(false);
    store.set_state("show", false);
    store.flush();

    let root = component.element().unwrap();
    assert_eq!(root.child_keys(), vec![Some("_metal_jsx_1"), Some("_metal_jsx_3")]);

    let renderer = coordinator.renderer();
    let report = renderer.last_report().unwrap();
    // Only the hidden <li> and its text go away; "c" keeps its identity.
    assert_eq!(report.removed, 2);
    assert_eq!(report.created, 0);
}

#[test]
fn explicit_key_wins_and_still_counts() {
    let component = Component::builder("Explicit")
        .render(|b| {
            b.element("ul", None, |b| {
                b.leaf("li", Some("first"))?;
                b.leaf("li", None)
            })
        })
        .build();
    let (_store, coordinator) = coordinated(&component);
    coordinator.render().unwrap();

    let root = component.element().unwrap();
    assert_eq!(root.child_keys(), vec![Some("first"), Some("_metal_jsx_2")]);
}

#[test]
fn each_renders_keyed_items() {
    let component = Component::builder("Each")
        .render(|b| {
            b.element("ul", None, |b| {
                b.each(&[3, 1, 2], |n| format!("item-{n}"), |b, n, key| {
                    b.element("li", Some(key), |b| {
                        b.text(n.to_string());
                        Ok(())
                    })
                })
            })
        })
        .build();
    let (_store, coordinator) = coordinated(&component);
    coordinator.render().unwrap();

    let root = component.element().unwrap();
    assert_eq!(
        root.child_keys(),
        vec![Some("item-3"), Some("item-1"), Some("item-2")]
    );
}

#[test]
fn failed_construction_restores_the_key_stack() {
    let mut builder = TreeBuilder::new(None);
    builder.open("root", None);
    builder.leaf("a", None).unwrap();

    let err = builder
        .construct(|b| {
            b.open("broken", None);
            b.open("deeper", None);
            Err(RenderError::traversal("Broken", "boom"))
        })
        .unwrap_err();
    assert!(matches!(err, RenderError::Traversal { .. }));
    assert_eq!(builder.depth(), 1);
    assert_eq!(builder.key_stack().depth(), 1);

    builder.leaf("b", None).unwrap();
    builder.close("root").unwrap();

    let root = builder.into_root().unwrap();
    assert_eq!(root.child_keys(), vec![Some("_metal_jsx_1"), Some("_metal_jsx_2")]);
}

#[test]
fn nested_component_shares_the_parent_traversal() {
    let child = Component::builder("Child")
        .render(|b| {
            b.element("section", None, |b| {
                b.leaf("p", None)
            })
        })
        .build();
    let child_coordinator =
        Rc::new(RenderCoordinator::new(child.clone(), JsxRenderer::new()).unwrap());

    let nested = child_coordinator.clone();
    let parent = Component::builder("Parent")
        .render(move |b| {
            b.element("main", None, |b| {
                b.leaf("header", None)?;
                nested.render_within(b)?;
                b.leaf("footer", None)
            })
        })
        .build();
    let (_store, coordinator) = coordinated(&parent);
    coordinator.render().unwrap();

    let root = parent.element().unwrap();
    assert_eq!(
        root.child_keys(),
        vec![
            Some("_metal_jsx_1"),
            Some("_metal_jsx_2"),
            Some("_metal_jsx_3"),
        ]
    );

    let section = child.element().unwrap();
    assert_eq!(section.tag(), Some("section"));
    assert_eq!(section.key(), Some("_metal_jsx_2"));
    assert_eq!(section.child_keys(), vec![Some("_metal_jsx_1")]);
    assert!(child_coordinator.is_rendered());
}

#[test]
fn extra_data_config_depends_on_renderer() {
    let component = Component::builder("Extra").build();
    let base = RenderCoordinator::new(component.clone(), BaseRenderer).unwrap();
    assert_eq!(base.extra_data_config(), None);
    drop(base);

    let (store, _coordinator) = coordinated(&component);
    assert_eq!(store.get("children"), Value::List(Vec::new()));
}

#[test]
fn missing_channel_is_rejected() {
    let component = Component::builder("Detached").without_channels().build();
    let err = RenderCoordinator::new(component, JsxRenderer::new()).unwrap_err();
    assert!(matches!(err, RenderError::MissingEmitter { .. }));
}

#[test]
fn default_routing_yields_singletons() {
    let mut renderer = BaseRenderer;
    let change = KeyChange::state("a", Value::Null, 1);
    assert_eq!(
        renderer.route_key_change(change.clone()),
        Some(ChangeSet::singleton(change))
    );
}

#[test]
fn render_keeps_existing_root() {
    let component = Component::builder("Mounted")
        .element(Node::element("div").with_key("app"))
        .render(|b| b.leaf("div", None))
        .build();
    let (_store, coordinator) = coordinated(&component);
    coordinator.render().unwrap();

    // The previous tree's key is reused at the root position.
    let root = component.element().unwrap();
    assert_eq!(root.key(), Some("app"));
}
