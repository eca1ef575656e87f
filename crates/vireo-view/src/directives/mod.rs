#![forbid(unsafe_code)]

//! Built-in directives.

pub mod condition;
pub mod for_loop;
pub mod include;
pub mod reference;
pub mod slot;

pub use condition::ConditionDirective;
pub use for_loop::{ForExpression, ForLoopDirective, parse_for_expression};
pub use include::IncludeDirective;
pub use reference::{RefCallbackDirective, RefDirective};
pub use slot::{SlotDirective, SlotToDirective};

use crate::registry::{DirectiveDef, Registry};

/// Priority of `:if`; it wins over `:for` on the same node.
pub const IF_PRIORITY: i32 = 200;
pub const FOR_PRIORITY: i32 = 100;

pub fn register_builtins(registry: &Registry) {
    registry.register_directive(":if", DirectiveDef::new(ConditionDirective::new).terminal(IF_PRIORITY));
    registry.register_directive(":for", DirectiveDef::new(ForLoopDirective::new).terminal(FOR_PRIORITY));
    registry.register_directive(":include", DirectiveDef::new(IncludeDirective::new));
    registry.register_directive(":slot-to", DirectiveDef::new(SlotToDirective::new));
    registry.register_directive(":slot", DirectiveDef::new(SlotDirective::new));
    registry.register_directive(":ref", DirectiveDef::new(RefDirective::new));
    registry.register_directive("@ref", DirectiveDef::new(RefCallbackDirective::new));
}
