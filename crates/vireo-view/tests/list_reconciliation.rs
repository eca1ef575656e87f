#![forbid(unsafe_code)]

//! Keyed list reconciliation through `:for`.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use vireo_core::{ObservableArray, ObservableObject, Value};
use vireo_view::directives::FOR_PRIORITY;
use vireo_view::directives::for_loop::PassStats;
use vireo_view::{
    BindingManager, Component, ComponentDefinition, DirectiveDef, ForLoopDirective, PropertyType,
    Registry, VNode, View, VisualNode,
};

struct Fixture {
    manager: BindingManager,
    root: Component,
    view: Rc<View>,
    loops: Rc<RefCell<Vec<Rc<ForLoopDirective>>>>,
}

impl Fixture {
    fn new(row: VNode) -> Self {
        let registry = Registry::with_builtins();
        let loops: Rc<RefCell<Vec<Rc<ForLoopDirective>>>> = Rc::default();
        let seen = Rc::clone(&loops);
        registry.register_directive(
            ":for",
            DirectiveDef::new(move || {
                let directive = ForLoopDirective::new();
                seen.borrow_mut().push(Rc::clone(&directive));
                directive
            })
            .terminal(FOR_PRIORITY),
        );
        registry.register_template("list", VNode::element("list").child(row));
        registry.register_component(
            ComponentDefinition::new("List")
                .property("items", PropertyType::Any, Value::Null)
                .template("list"),
        );
        let manager = BindingManager::new(Rc::new(registry));
        let (root, view) = manager.create_root("List").unwrap();
        Self {
            manager,
            root,
            view,
            loops,
        }
    }

    fn set(&self, items: Value) {
        self.root.set("items", items);
        self.manager.scheduler().run_until_idle();
    }

    fn directive(&self) -> Rc<ForLoopDirective> {
        Rc::clone(&self.loops.borrow()[0])
    }

    fn rows(&self) -> Vec<VisualNode> {
        self.view
            .visual
            .children()
            .into_iter()
            .filter(|node| !node.is_anchor())
            .collect()
    }

    fn labels(&self) -> Vec<Value> {
        self.rows().iter().map(|row| row.property("label")).collect()
    }
}

fn record(id: i32, v: &str) -> Value {
    Value::Object(ObservableObject::from_entries([
        ("id", Value::from(id)),
        ("v", Value::from(v)),
    ]))
}

fn array(items: impl IntoIterator<Item = Value>) -> Value {
    Value::Array(items.into_iter().collect::<ObservableArray>())
}

#[test]
fn trackby_reorder_reuses_components() {
    let fixture = Fixture::new(
        VNode::element("row")
            .attr(":for", "item in items trackby id")
            .attr(":label", "item.v"),
    );
    fixture.set(array([record(1, "a"), record(2, "b")]));
    let before = fixture.directive().items();
    let rows_before = fixture.rows();
    assert_eq!(fixture.labels(), vec![Value::from("a"), Value::from("b")]);

    fixture.set(array([record(2, "b"), record(1, "a")]));
    let directive = fixture.directive();
    assert_eq!(
        directive.last_pass(),
        PassStats {
            created: 0,
            reused: 2,
            destroyed: 0
        }
    );
    assert_eq!(directive.items(), vec![before[1].clone(), before[0].clone()]);
    assert_eq!(fixture.rows(), vec![rows_before[1].clone(), rows_before[0].clone()]);
    assert_eq!(fixture.labels(), vec![Value::from("b"), Value::from("a")]);
    assert_eq!(before[1].get("$index"), Value::from(0));
}

#[test]
fn duplicate_primitives_get_distinct_components() {
    let fixture = Fixture::new(VNode::element("row").attr(":for", "n in items").attr(":label", "n"));
    fixture.set(array([Value::from(1), Value::from(2), Value::from(2)]));
    let items = fixture.directive().items();
    assert_eq!(items.len(), 3);
    assert_ne!(items[1], items[2]);
    assert_eq!(fixture.labels(), vec![Value::from(1), Value::from(2), Value::from(2)]);

    fixture.set(array([Value::from(2), Value::from(1)]));
    let directive = fixture.directive();
    assert_eq!(directive.last_pass().reused, 2);
    assert_eq!(directive.last_pass().destroyed, 1);
    assert_eq!(directive.items()[0], items[1]);
    assert!(items[2].is_destroyed());
}

#[test]
fn duplicate_track_keys_still_allocate() {
    let fixture = Fixture::new(
        VNode::element("row")
            .attr(":for", "item in items trackby id")
            .attr(":label", "item.v"),
    );
    fixture.set(array([record(1, "a")]));
    fixture.set(array([record(1, "a"), record(1, "b")]));
    let directive = fixture.directive();
    assert_eq!(directive.last_pass().reused, 1);
    assert_eq!(directive.last_pass().created, 1);
    assert_eq!(fixture.labels(), vec![Value::from("a"), Value::from("b")]);
}

#[test]
fn object_entries_and_item_fields() {
    let fixture = Fixture::new(
        VNode::element("row")
            .attr(":for", "v, k in items")
            .attr("label", "{{ k }}={{ v }}")
            .attr(":odd", "$isOdd")
            .attr(":last", "$isLast"),
    );
    fixture.set(Value::Object(ObservableObject::from_entries([("x", 1), ("y", 2)])));
    assert_eq!(fixture.labels(), vec![Value::from("x=1"), Value::from("y=2")]);
    let rows = fixture.rows();
    assert_eq!(rows[0].property("odd"), Value::Bool(true));
    assert_eq!(rows[1].property("odd"), Value::Bool(false));
    assert_eq!(rows[1].property("last"), Value::Bool(true));
}

#[test]
fn item_scope_reaches_parent() {
    let fixture = Fixture::new(
        VNode::element("row")
            .attr(":for", "n in items")
            .attr(":label", "$parent.items.length"),
    );
    fixture.set(array([Value::from("p"), Value::from("q")]));
    assert_eq!(fixture.labels(), vec![Value::from(2), Value::from(2)]);
    let item = fixture.directive().items()[0].clone();
    assert_eq!(item.parent(), Some(fixture.root.clone()));
}

#[test]
fn destroying_owner_releases_every_item() {
    let fixture = Fixture::new(VNode::element("row").attr(":for", "n in items").attr(":label", "n"));
    fixture.set(array([Value::from(1), Value::from(2)]));
    let items = fixture.directive().items();
    let rows = fixture.rows();

    fixture.manager.destroy_component(&fixture.root);
    assert!(fixture.directive().items().is_empty());
    assert!(items.iter().all(Component::is_destroyed));
    assert!(rows.iter().all(VisualNode::is_released));
    assert!(fixture.manager.watchers().is_empty());
}

proptest! {
    #[test]
    fn rows_always_mirror_the_collection(
        passes in proptest::collection::vec(proptest::collection::vec(0u8..5, 0..8), 1..5)
    ) {
        let fixture = Fixture::new(VNode::element("row").attr(":for", "n in items").attr(":label", "n"));
        for values in passes {
            let expected: Vec<Value> = values.iter().map(|v| Value::from(i32::from(*v))).collect();
            fixture.set(array(expected.clone()));
            prop_assert_eq!(fixture.labels(), expected.clone());
            prop_assert_eq!(fixture.directive().items().len(), expected.len());
            let last = fixture.view.visual.children().last().cloned();
            prop_assert!(last.is_some_and(|node| node.is_anchor()));
        }
    }
}
