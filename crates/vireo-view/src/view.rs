#![forbid(unsafe_code)]

//! View builder: turns a [`VNode`] tree into visual objects plus the
//! binding attributes each one still needs.
//!
//! Attributes are split while building. Static ones are applied at once;
//! binding ones (registered directives, `:`/`@`/`::` prefixes, values with
//! `{{ }}`) are recorded on the [`View`] for
//! [`BindingManager::create_binding`](crate::BindingManager::create_binding).

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use vireo_core::Value;
use vireo_expr::has_interpolation;

use crate::component::Component;
use crate::event::{EventHandler, EventListenerId};
use crate::registry::Registry;
use crate::visual::VisualNode;
use crate::vnode::VNode;

/// Attribute name of a component's template override.
pub const TEMPLATE_ATTR: &str = "template";

/// What a view stands for in expressions (`$element`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewInstance {
    Visual(VisualNode),
    Component(Component),
}

impl ViewInstance {
    #[must_use]
    pub fn as_value(&self) -> Value {
        match self {
            Self::Visual(visual) => visual.as_value(),
            Self::Component(component) => component.as_value(),
        }
    }

    #[must_use]
    pub fn as_component(&self) -> Option<&Component> {
        match self {
            Self::Component(component) => Some(component),
            Self::Visual(_) => None,
        }
    }

    #[must_use]
    pub fn as_visual(&self) -> Option<&VisualNode> {
        match self {
            Self::Visual(visual) => Some(visual),
            Self::Component(_) => None,
        }
    }

    /// Apply an attribute value with the instance's coercion rules.
    pub fn set_attribute(&self, name: &str, value: Value) {
        match self {
            Self::Visual(visual) => {
                visual.set_property(name, value);
            }
            Self::Component(component) => component.set_attribute(name, value),
        }
    }

    /// Register on the visual's own listeners or the component's embedded
    /// emitter. `None` when the instance has neither.
    pub fn add_listener(&self, event: &str, handler: EventHandler) -> Option<EventListenerId> {
        match self {
            Self::Visual(visual) => visual.add_listener(event, handler),
            Self::Component(component) => component
                .emitter()
                .map(|emitter| emitter.add_listener(event, handler)),
        }
    }

    pub fn remove_listener(&self, event: &str, id: EventListenerId) -> bool {
        match self {
            Self::Visual(visual) => visual.remove_listener(event, id),
            Self::Component(component) => component
                .emitter()
                .is_some_and(|emitter| emitter.remove_listener(event, id)),
        }
    }
}

/// One built node.
///
/// For a component view, `visual` is the root visual of its template,
/// `children` holds the template view, and `nested` holds the views built
/// from the component tag's own children.
pub struct View {
    pub node: VNode,
    pub visual: VisualNode,
    pub instance: ViewInstance,
    pub directives: IndexMap<String, String>,
    pub children: Vec<Rc<View>>,
    pub nested: Vec<Rc<View>>,
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("tag", &self.node.tag)
            .field("visual", &self.visual.id())
            .field("directives", &self.directives)
            .field("children", &self.children.len())
            .field("nested", &self.nested.len())
            .finish()
    }
}

impl View {
    #[must_use]
    pub fn is_component(&self) -> bool {
        matches!(self.instance, ViewInstance::Component(_))
    }

    #[must_use]
    pub fn component(&self) -> Option<&Component> {
        self.instance.as_component()
    }
}

/// Whether `name="value"` must be bound rather than applied statically.
#[must_use]
pub fn is_binding_attribute(registry: &Registry, name: &str, value: &str) -> bool {
    registry.has_directive(name)
        || name.starts_with(':')
        || name.starts_with('@')
        || has_interpolation(value)
}

/// Build the view for `node`.
#[must_use]
pub fn create_view(registry: &Registry, node: &VNode) -> Rc<View> {
    if let Some(terminal) = registry.highest_terminal(&node.attrs) {
        let expression = node.attrs.get(&terminal).cloned().unwrap_or_default();
        let visual = VisualNode::anchor();
        let mut directives = IndexMap::new();
        directives.insert(terminal.clone(), expression);
        return Rc::new(View {
            node: node.without_attr(&terminal),
            instance: ViewInstance::Visual(visual.clone()),
            visual,
            directives,
            children: Vec::new(),
            nested: Vec::new(),
        });
    }
    if let Some(definition) = registry.component(&node.tag) {
        let component = Component::new(definition);
        component.init();
        return create_component_view(registry, node, component);
    }
    if node.tag == "text" {
        return create_text_view(registry, node);
    }
    create_visual_view(registry, node)
}

fn split_attributes(
    registry: &Registry,
    node: &VNode,
    mut apply: impl FnMut(&str, &str),
) -> IndexMap<String, String> {
    let mut directives = IndexMap::new();
    for (name, value) in &node.attrs {
        if is_binding_attribute(registry, name, value) {
            directives.insert(name.clone(), value.clone());
        } else {
            apply(name, value);
        }
    }
    directives
}

fn create_visual_view(registry: &Registry, node: &VNode) -> Rc<View> {
    let visual = VisualNode::new(&node.tag);
    let directives = split_attributes(registry, node, |name, value| {
        visual.set_property(name, Value::from(value));
    });
    let mut children = Vec::with_capacity(node.children.len());
    for child in &node.children {
        if child.is_text() {
            continue;
        }
        let view = create_view(registry, child);
        visual.add_child(&view.visual, None);
        children.push(view);
    }
    Rc::new(View {
        node: node.clone(),
        instance: ViewInstance::Visual(visual.clone()),
        visual,
        directives,
        children,
        nested: Vec::new(),
    })
}

fn create_text_view(registry: &Registry, node: &VNode) -> Rc<View> {
    let visual = VisualNode::without_events("text");
    let mut directives = split_attributes(registry, node, |name, value| {
        visual.set_property(name, Value::from(value));
    });
    let mut content = String::new();
    for child in &node.children {
        match &child.text {
            Some(text) if child.is_text() => content.push_str(text),
            _ => tracing::error!(
                target: "vireo::view",
                tag = %child.tag,
                "<text> only supports text content"
            ),
        }
    }
    if has_interpolation(&content) {
        directives.insert("text".to_owned(), content);
    } else if !node.children.is_empty() {
        visual.set_property("text", Value::from(content));
    }
    Rc::new(View {
        node: node.clone(),
        instance: ViewInstance::Visual(visual.clone()),
        visual,
        directives,
        children: Vec::new(),
        nested: Vec::new(),
    })
}

fn create_component_view(registry: &Registry, node: &VNode, component: Component) -> Rc<View> {
    let directives = split_attributes(registry, node, |name, value| {
        if name != TEMPLATE_ATTR {
            component.set_attribute(name, Value::from(value));
        }
    });

    let template_name = node
        .attrs
        .get(TEMPLATE_ATTR)
        .map(String::as_str)
        .or_else(|| component.definition().template_name())
        .map(str::to_owned);
    let template = match &template_name {
        Some(name) => match registry.try_template(name) {
            Ok(template) => Some(create_view(registry, &template)),
            Err(error) => {
                tracing::error!(target: "vireo::view", component = %node.tag, %error, "component template missing");
                None
            }
        },
        None => {
            tracing::error!(target: "vireo::view", component = %node.tag, "component has no template");
            None
        }
    };
    let visual = template
        .as_ref()
        .map_or_else(|| VisualNode::new(&node.tag), |view| view.visual.clone());
    let nested = node
        .children
        .iter()
        .filter(|child| !child.is_text())
        .map(|child| create_view(registry, child))
        .collect();

    Rc::new(View {
        node: node.clone(),
        visual,
        instance: ViewInstance::Component(component),
        directives,
        children: template.into_iter().collect(),
        nested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentDefinition, PropertyType};

    fn registry() -> Registry {
        let registry = Registry::with_builtins();
        registry.register_template("card", VNode::element("frame").child(VNode::element("slot")));
        registry.register_component(
            ComponentDefinition::new("Card")
                .property("size", PropertyType::Number, 1)
                .template("card"),
        );
        registry
    }

    #[test]
    fn static_and_binding_attributes_are_split() {
        let node = VNode::element("box")
            .attr("x", "4")
            .attr(":y", "pos")
            .attr("@tap", "go()")
            .attr("title", "Hi {{ name }}");
        let view = create_view(&registry(), &node);
        assert_eq!(view.visual.property("x"), Value::from("4"));
        assert_eq!(
            view.directives.keys().collect::<Vec<_>>(),
            vec![":y", "@tap", "title"]
        );
    }

    #[test]
    fn terminal_directive_builds_anchor() {
        let node = VNode::element("box").attr(":for", "i in items").attr(":if", "ok").attr("x", "1");
        let view = create_view(&registry(), &node);
        assert!(view.visual.is_anchor());
        assert_eq!(view.directives.get(":if").map(String::as_str), Some("ok"));
        assert!(view.node.attrs.contains_key(":for"));
        assert!(!view.node.attrs.contains_key(":if"));
    }

    #[test]
    fn text_content_is_static_or_bound() {
        let registry = registry();
        let plain = create_view(&registry, &VNode::element("text").child(VNode::text("hello")));
        assert_eq!(plain.visual.property("text"), Value::from("hello"));
        assert!(plain.directives.is_empty());

        let bound = create_view(&registry, &VNode::element("text").child(VNode::text("Hi {{ n }}")));
        assert_eq!(bound.directives.get("text").map(String::as_str), Some("Hi {{ n }}"));
        assert!(bound.visual.events().is_none());
    }

    #[test]
    fn component_view_uses_template_root() {
        let node = VNode::element("Card")
            .attr("size", "3")
            .child(VNode::element("label"));
        let view = create_view(&registry(), &node);
        let component = view.component().cloned();
        assert_eq!(component.map(|c| c.get("size")), Some(Value::from(3)));
        assert_eq!(view.visual.tag(), "frame");
        assert_eq!(view.children.len(), 1);
        assert_eq!(view.nested.len(), 1);
    }

    #[test]
    fn component_without_template_gets_placeholder() {
        let registry = Registry::new();
        registry.register_component(ComponentDefinition::new("Bare"));
        let view = create_view(&registry, &VNode::element("Bare"));
        assert!(view.children.is_empty());
        assert_eq!(view.visual.tag(), "Bare");
    }
}
