#![forbid(unsafe_code)]

//! Binding behavior through a mounted root component.

use std::rc::Rc;

use vireo_core::Value;
use vireo_view::{BindingManager, Component, ComponentDefinition, PropertyType, Registry, VNode, View, VisualNode};

fn text(content: &str) -> VNode {
    VNode::element("text").child(VNode::text(content))
}

fn mount(template: VNode, definition: ComponentDefinition, extra: impl FnOnce(&Registry)) -> (BindingManager, Component, Rc<View>) {
    let registry = Registry::with_builtins();
    registry.register_template("root", template);
    registry.register_component(definition.template("root"));
    extra(&registry);
    let manager = BindingManager::new(Rc::new(registry));
    let (component, view) = manager.create_root("Root").unwrap();
    (manager, component, view)
}

fn tags(node: &VisualNode) -> Vec<String> {
    node.children().iter().map(|c| c.tag().to_owned()).collect()
}

#[test]
fn condition_swaps_anchor_in_place() {
    let template = VNode::element("box")
        .child(VNode::element("head"))
        .child(VNode::element("panel").attr(":if", "open").attr(":size", "size"))
        .child(VNode::element("foot"));
    let definition = ComponentDefinition::new("Root")
        .property("open", PropertyType::Boolean, false)
        .property("size", PropertyType::Number, 2);
    let (manager, root, view) = mount(template, definition, |_| {});
    assert_eq!(tags(&view.visual), vec!["head", "anchor", "foot"]);

    root.set("open", Value::Bool(true));
    manager.scheduler().run_until_idle();
    assert_eq!(tags(&view.visual), vec!["head", "panel", "foot"]);
    let panel = view.visual.children()[1].clone();
    assert_eq!(panel.property("size"), Value::from(2));

    root.set("open", Value::Bool(false));
    manager.scheduler().run_until_idle();
    assert_eq!(tags(&view.visual), vec!["head", "anchor", "foot"]);
    assert!(panel.is_released());
    // Only the `:if` itself is left.
    assert_eq!(manager.directive_count(&root), 1);
}

#[test]
fn condition_outranks_loop_on_one_node() {
    let template = VNode::element("box").child(
        VNode::element("row")
            .attr(":for", "n in 3")
            .attr(":if", "show"),
    );
    let definition = ComponentDefinition::new("Root").property("show", PropertyType::Boolean, true);
    let (manager, root, view) = mount(template, definition, |_| {});
    assert_eq!(tags(&view.visual), vec!["row", "row", "row", "anchor"]);

    root.set("show", Value::Bool(false));
    manager.scheduler().run_until_idle();
    assert_eq!(tags(&view.visual), vec!["anchor"]);
}

#[test]
fn interpolated_text_follows_model() {
    let template = VNode::element("box").child(text("Hello {{ name }}!"));
    let definition = ComponentDefinition::new("Root").property("name", PropertyType::String, "A");
    let (manager, root, view) = mount(template, definition, |_| {});
    let label = view.visual.children()[0].clone();
    assert_eq!(label.property("text"), Value::from("Hello A!"));

    root.set("name", Value::from("B"));
    manager.scheduler().flush();
    assert_eq!(label.property("text"), Value::from("Hello B!"));
}

#[test]
fn event_statement_sees_payload_and_global() {
    let template = VNode::element("box").child(
        VNode::element("button")
            .attr("@tap", "count += 1; last = $event")
            .attr("@pick", "picked = $global.prefix + $element.tag"),
    );
    let definition = ComponentDefinition::new("Root")
        .property("count", PropertyType::Number, 0)
        .property("last", PropertyType::Any, Value::Null)
        .property("picked", PropertyType::String, "");
    let (manager, root, view) = mount(template, definition, |_| {});
    manager.set_global(Value::Object(vireo_core::ObservableObject::from_entries([("prefix", "#")])));
    let button = view.visual.children()[0].clone();

    button.emit("tap", &Value::from("first"));
    button.emit("tap", &Value::from("second"));
    button.emit("pick", &Value::Null);
    assert_eq!(root.get("count"), Value::from(2));
    assert_eq!(root.get("last"), Value::from("second"));
    assert_eq!(root.get("picked"), Value::from("#button"));
}

#[test]
fn event_on_target_without_events_is_skipped() {
    let template = VNode::element("box").child(text("x").attr("@tap", "count += 1"));
    let definition = ComponentDefinition::new("Root").property("count", PropertyType::Number, 0);
    let (manager, root, _view) = mount(template, definition, |_| {});
    assert_eq!(manager.directive_count(&root), 0);
}

#[test]
fn slot_routes_nested_children_into_template() {
    let template = VNode::element("page").child(
        VNode::element("Card")
            .attr(":title", "heading")
            .child(text("{{ body }}").attr(":slot-to", "content")),
    );
    let definition = ComponentDefinition::new("Root")
        .property("heading", PropertyType::String, "Intro")
        .property("body", PropertyType::String, "text");
    let (manager, root, view) = mount(template, definition, |registry| {
        registry.register_template(
            "card",
            VNode::element("frame")
                .child(text("{{ title }}"))
                .child(VNode::element("placeholder").attr(":slot", "content"))
                .child(VNode::element("footer")),
        );
        registry.register_component(
            ComponentDefinition::new("Card")
                .property("title", PropertyType::String, "")
                .template("card"),
        );
    });

    let frame = view.visual.children()[0].clone();
    assert_eq!(tags(&frame), vec!["text", "text", "footer"]);
    let slotted = frame.children()[1].clone();
    assert_eq!(slotted.property("text"), Value::from("text"));
    assert_eq!(frame.children()[0].property("text"), Value::from("Intro"));

    root.set("heading", Value::from("Outro"));
    root.set("body", Value::from("changed"));
    manager.scheduler().run_until_idle();
    assert_eq!(frame.children()[0].property("text"), Value::from("Outro"));
    assert_eq!(slotted.property("text"), Value::from("changed"));
}

#[test]
fn nested_component_two_way_binding() {
    let template = VNode::element("form").child(VNode::element("Field").attr("::value", "name"));
    let definition = ComponentDefinition::new("Root").property("name", PropertyType::String, "ann");
    let (manager, root, view) = mount(template, definition, |registry| {
        registry.register_template("field", VNode::element("input"));
        registry.register_component(
            ComponentDefinition::new("Field")
                .property("value", PropertyType::String, "")
                .template("field"),
        );
    });
    let field = view.children[0].component().cloned().unwrap();
    assert_eq!(field.get("value"), Value::from("ann"));
    assert_eq!(field.parent(), Some(root.clone()));

    field.set("value", Value::from("bob"));
    manager.scheduler().run_until_idle();
    assert_eq!(root.get("name"), Value::from("bob"));

    manager.destroy_component(&root);
    assert!(field.is_destroyed());
}

#[test]
fn include_and_references() {
    let template = VNode::element("box")
        .child(VNode::element("slot-here").attr(":include", "part"))
        .child(VNode::element("button").attr(":ref", "btn").attr("@ref", "seen = $element.tag"));
    let definition = ComponentDefinition::new("Root")
        .property("seen", PropertyType::String, "")
        .property("label", PropertyType::String, "inc");
    let (manager, root, view) = mount(template, definition, |registry| {
        registry.register_template("part", text("{{ label }}"));
    });

    assert_eq!(tags(&view.visual), vec!["text", "button"]);
    assert_eq!(view.visual.children()[0].property("text"), Value::from("inc"));
    assert_eq!(root.get("seen"), Value::from("button"));
    let button = manager
        .reference(&root, "btn")
        .and_then(|value| VisualNode::from_value(&value));
    assert_eq!(button, Some(view.visual.children()[1].clone()));

    manager.remove_binding(&root);
    assert_eq!(tags(&view.visual), vec!["slot-here", "button"]);
    assert!(manager.reference(&root, "btn").is_none());
}
