#![forbid(unsafe_code)]

//! `:for="value[, key] in collection [trackby field]"`: keyed list
//! reconciliation.
//!
//! Each collection entry gets an item component carrying `$index`,
//! `$isFirst`, `$isLast`, `$isOdd`, `$isEven`, the entry value and
//! optionally its key. Item components are pooled across updates:
//!
//! - with `trackby`, a previous item whose value has the same field value
//!   is reused;
//! - without it, a previous item holding the identical value is reused,
//!   found through a side table keyed by value identity.
//!
//! A reused item only has its fields refreshed. Items left idle after a
//! pass are destroyed, and the survivors' visuals are moved into the new
//! order without being rebuilt.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::LazyLock;

use ahash::AHashMap;
use regex::Regex;
use vireo_core::{IdentityKey, Value, next_uid};
use vireo_runtime::{WatchHandle, WatchOptions};

use crate::binding::{BindingManager, WeakBindingManager};
use crate::component::{Component, ComponentDefinition, PropertyType};
use crate::directive::{BindingContext, Directive, DirectiveScope};
use crate::error::{Result, ViewError};
use crate::view::View;
use crate::visual::VisualNode;
use crate::weak_table::WeakTable;

static IN_SPLIT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+in\s+").ok());
static TRACK_BY: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"trackby\s+(\w+)").ok());

thread_local! {
    static ITEM_DEFINITIONS: RefCell<AHashMap<String, Rc<ComponentDefinition>>> =
        RefCell::new(AHashMap::new());
}

/// A parsed loop expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForExpression {
    pub value: String,
    pub key: Option<String>,
    pub collection: String,
    pub track_by: Option<String>,
}

pub fn parse_for_expression(expression: &str) -> Result<ForExpression> {
    let malformed = || ViewError::MalformedLoop {
        expression: expression.to_owned(),
    };
    let (Some(split), Some(track)) = (IN_SPLIT.as_ref(), TRACK_BY.as_ref()) else {
        return Err(malformed());
    };
    let parts: Vec<&str> = split.splitn(expression.trim(), 3).collect();
    let [params, source] = parts.as_slice() else {
        return Err(malformed());
    };

    let (value, key) = match params.split_once(',') {
        Some((value, key)) => (value.trim(), Some(key.trim())),
        None => (params.trim(), None),
    };
    if value.is_empty() || key.is_some_and(|k| k.is_empty() || k.contains(',')) {
        return Err(malformed());
    }

    let track_by = track.captures(source).map(|c| c[1].to_owned());
    let collection = track.replace(source, "").trim().to_owned();
    if collection.is_empty() {
        return Err(malformed());
    }
    Ok(ForExpression {
        value: value.to_owned(),
        key: key.map(str::to_owned),
        collection,
        track_by,
    })
}

/// The synthetic item definition for `expression`, built once per text.
fn item_definition(expression: &str, parsed: &ForExpression) -> Rc<ComponentDefinition> {
    ITEM_DEFINITIONS.with(|definitions| {
        if let Some(definition) = definitions.borrow().get(expression) {
            return Rc::clone(definition);
        }
        let mut definition = ComponentDefinition::new("for-item")
            .property("$index", PropertyType::Number, 0)
            .property("$isFirst", PropertyType::Boolean, false)
            .property("$isLast", PropertyType::Boolean, false)
            .property("$isOdd", PropertyType::Boolean, false)
            .property("$isEven", PropertyType::Boolean, false)
            .property(&parsed.value, PropertyType::Any, Value::Undefined);
        if let Some(key) = &parsed.key {
            definition = definition.property(key, PropertyType::Any, Value::Undefined);
        }
        let definition = Rc::new(definition);
        definitions
            .borrow_mut()
            .insert(expression.to_owned(), Rc::clone(&definition));
        definition
    })
}

/// One collection entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Value,
    pub index: usize,
    pub value: Value,
}

/// Arrays by index, objects in key order, a number `n` as `0..n`.
///
/// A range longer than `max_range` is refused with a warning and yields no
/// entries.
#[must_use]
pub fn to_list(collection: &Value, max_range: usize) -> Vec<Entry> {
    match collection {
        Value::Array(array) => array
            .to_vec()
            .into_iter()
            .enumerate()
            .map(|(index, value)| Entry {
                key: Value::from(index),
                index,
                value,
            })
            .collect(),
        Value::Object(object) => object
            .entries()
            .into_iter()
            .enumerate()
            .map(|(index, (key, value))| Entry {
                key: Value::from(key),
                index,
                value,
            })
            .collect(),
        Value::Number(n) if n.is_finite() && *n > 0.0 => {
            #[allow(clippy::cast_precision_loss)]
            let limit = max_range as f64;
            if n.ceil() > limit {
                tracing::warn!(target: "vireo::directive", count = *n, max_range, "`:for` range too large");
                return Vec::new();
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let count = n.ceil() as usize;
            (0..count)
                .map(|index| Entry {
                    key: Value::from(index),
                    index,
                    value: Value::from(index),
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

struct ItemSlot {
    component: Component,
    visual: VisualNode,
    /// Free to be matched in the current pass.
    idle: Cell<bool>,
}

#[derive(Clone)]
struct Bound {
    manager: WeakBindingManager,
    component: Component,
    anchor: Rc<View>,
    parent: VisualNode,
    parsed: ForExpression,
    expression: Rc<str>,
    definition: Rc<ComponentDefinition>,
    source: IdentityKey,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    pub created: usize,
    pub reused: usize,
    pub destroyed: usize,
}

pub struct ForLoopDirective {
    me: Weak<Self>,
    bound: RefCell<Option<Bound>>,
    items: RefCell<Vec<Rc<ItemSlot>>>,
    pool: RefCell<WeakTable<Vec<Rc<ItemSlot>>>>,
    watch: RefCell<Option<WatchHandle>>,
    last_pass: Cell<PassStats>,
}

impl ForLoopDirective {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            bound: RefCell::new(None),
            items: RefCell::new(Vec::new()),
            pool: RefCell::new(WeakTable::new()),
            watch: RefCell::new(None),
            last_pass: Cell::new(PassStats::default()),
        })
    }

    /// Current item components in collection order.
    #[must_use]
    pub fn items(&self) -> Vec<Component> {
        self.items
            .borrow()
            .iter()
            .map(|slot| slot.component.clone())
            .collect()
    }

    /// Counts from the most recent update.
    #[must_use]
    pub fn last_pass(&self) -> PassStats {
        self.last_pass.get()
    }

    fn on_update(&self, collection: &Value) {
        let Some(bound) = self.bound.borrow().clone() else {
            return;
        };
        let Some(manager) = bound.manager.upgrade() else {
            return;
        };
        let entries = to_list(collection, manager.config().max_range_len);
        let previous = self.items.borrow().clone();
        let mut stats = PassStats::default();
        let mut next = Vec::with_capacity(entries.len());

        for entry in &entries {
            let found = match &bound.parsed.track_by {
                Some(field) => find_tracked(&previous, &bound, field, &entry.value),
                None => self.find_pooled(&bound, &entry.value),
            };
            let slot = match found {
                Some(slot) => {
                    update_item(&slot.component, &bound.parsed, entry, entries.len());
                    stats.reused += 1;
                    slot
                }
                None => {
                    stats.created += 1;
                    self.create_item(&manager, &bound, entry, entries.len())
                }
            };
            slot.idle.set(false);
            next.push(slot);
        }

        for slot in previous.iter().filter(|slot| slot.idle.get()) {
            self.destroy_item(&manager, &bound, slot);
            stats.destroyed += 1;
        }
        for slot in &next {
            slot.idle.set(true);
        }

        for slot in &next {
            bound.parent.remove_child(&slot.visual);
        }
        let mut index = bound
            .parent
            .index_of(&bound.anchor.visual)
            .unwrap_or_else(|| bound.parent.child_count());
        for slot in &next {
            bound.parent.add_child(&slot.visual, Some(index));
            index += 1;
        }

        *self.items.borrow_mut() = next;
        self.last_pass.set(stats);
        tracing::debug!(
            target: "vireo::directive",
            expression = %bound.expression,
            created = stats.created,
            reused = stats.reused,
            destroyed = stats.destroyed,
            "list reconciled"
        );
    }

    fn find_pooled(&self, bound: &Bound, value: &Value) -> Option<Rc<ItemSlot>> {
        self.pool
            .borrow()
            .get(&value.identity_key(), &bound.source)?
            .iter()
            .find(|slot| slot.idle.get())
            .cloned()
    }

    fn create_item(
        &self,
        manager: &BindingManager,
        bound: &Bound,
        entry: &Entry,
        total: usize,
    ) -> Rc<ItemSlot> {
        let component = Component::new(Rc::clone(&bound.definition));
        component.set_parent(Some(&bound.component));
        component.init();
        update_item(&component, &bound.parsed, entry, total);

        let view = manager.create_view(&bound.anchor.node);
        let at = bound.parent.index_of(&bound.anchor.visual);
        bound.parent.add_child(&view.visual, at);
        let slot = Rc::new(ItemSlot {
            component: component.clone(),
            visual: view.visual.clone(),
            idle: Cell::new(false),
        });

        if bound.parsed.track_by.is_none() {
            let key = entry.value.identity_key();
            let mut pool = self.pool.borrow_mut();
            match pool.get_mut(&key, &bound.source) {
                Some(list) => list.push(Rc::clone(&slot)),
                None => pool.set(key, bound.source.clone(), vec![Rc::clone(&slot)]),
            }
        }

        manager.create_binding(&component, &view, &BindingContext::new());
        slot
    }

    fn destroy_item(&self, manager: &BindingManager, bound: &Bound, slot: &Rc<ItemSlot>) {
        let value = slot.component.get(&bound.parsed.value);
        slot.component.set_parent(None);
        manager.destroy_component(&slot.component);
        slot.visual.release(true);

        if bound.parsed.track_by.is_none() {
            let key = value.identity_key();
            let mut pool = self.pool.borrow_mut();
            let emptied = pool.get_mut(&key, &bound.source).is_some_and(|list| {
                list.retain(|other| !Rc::ptr_eq(other, slot));
                list.is_empty()
            });
            if emptied {
                pool.remove(&key, &bound.source);
            }
        }
    }
}

/// First idle previous item whose tracked field matches. A match that is
/// already taken in this pass means the field is not unique.
fn find_tracked(
    previous: &[Rc<ItemSlot>],
    bound: &Bound,
    field: &str,
    value: &Value,
) -> Option<Rc<ItemSlot>> {
    let wanted = value.get_member(field, None);
    let mut reported = false;
    for slot in previous {
        let current = slot.component.get(&bound.parsed.value).get_member(field, None);
        if !current.same_value(&wanted) {
            continue;
        }
        if slot.idle.get() {
            return Some(Rc::clone(slot));
        }
        if !reported {
            tracing::warn!(
                target: "vireo::directive",
                field,
                expression = %bound.expression,
                "trackby field is not a unique key"
            );
            reported = true;
        }
    }
    None
}

fn update_item(component: &Component, parsed: &ForExpression, entry: &Entry, total: usize) {
    // Row parity counts from one: the first row is odd.
    let odd = entry.index % 2 == 0;
    component.set("$index", Value::from(entry.index));
    component.set("$isOdd", Value::Bool(odd));
    component.set("$isEven", Value::Bool(!odd));
    component.set("$isLast", Value::Bool(entry.index + 1 == total));
    component.set("$isFirst", Value::Bool(entry.index == 0));
    if let Some(key) = &parsed.key {
        component.set(key, entry.key.clone());
    }
    component.set(&parsed.value, entry.value.clone());
}

impl Directive for ForLoopDirective {
    fn on_init(&self, expression: &str, scope: &DirectiveScope<'_>) {
        let parsed = match parse_for_expression(expression) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::error!(target: "vireo::directive", %error, "`:for` skipped");
                return;
            }
        };
        let Some(parent) = scope.view.visual.parent() else {
            tracing::error!(target: "vireo::directive", expression, "`:for` anchor has no parent");
            return;
        };
        let collection = parsed.collection.clone();
        *self.bound.borrow_mut() = Some(Bound {
            manager: scope.manager.downgrade(),
            component: scope.component.clone(),
            anchor: Rc::clone(scope.view),
            parent,
            definition: item_definition(expression, &parsed),
            parsed,
            expression: Rc::from(expression),
            source: IdentityKey::handle(next_uid()),
        });

        let me = Weak::clone(&self.me);
        let handle = scope.manager.watchers().watch(
            &scope.component.as_value(),
            &collection,
            WatchOptions::default().deep().immediate(),
            move |value: &Value, _: &Value| {
                if let Some(me) = me.upgrade() {
                    me.on_update(value);
                }
            },
        );
        *self.watch.borrow_mut() = Some(handle);
    }

    fn on_destroy(&self) {
        if let Some(handle) = self.watch.borrow_mut().take() {
            handle.unwatch();
        }
        let Some(bound) = self.bound.borrow_mut().take() else {
            return;
        };
        let items = std::mem::take(&mut *self.items.borrow_mut());
        if let Some(manager) = bound.manager.upgrade() {
            for slot in &items {
                self.destroy_item(&manager, &bound, slot);
            }
        }
        self.pool.borrow_mut().clear(&bound.source);
    }
}
