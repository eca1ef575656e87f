#![forbid(unsafe_code)]

//! `{{ expr }}` interpolation.
//!
//! # Invariants
//!
//! 1. **Single pass**: fragments are located once at compile time; values
//!    containing `{{` are never re-interpolated.
//! 2. **Fragment isolation**: a fragment that fails to evaluate renders as
//!    the empty string without affecting its neighbours.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Bad fragment syntax | `{{ a + }}` | Whole template fails to compile |
//! | Runtime error | `{{ missing.x }}` | Fragment renders empty |
//! | `undefined`/`null` value | Missing property | Fragment renders empty |
//! | No fragments | Plain text | Text is returned unchanged |

use std::sync::LazyLock;

use regex::Regex;
use vireo_core::Value;

use crate::compile::{Thunk, compile_program};
use crate::error::ParseError;
use crate::parser::parse_program;

static FRAGMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{\{([\s\S]+?)\}\}").ok());

/// Whether `text` contains at least one `{{ }}` fragment.
#[must_use]
pub fn has_interpolation(text: &str) -> bool {
    FRAGMENT.as_ref().is_some_and(|re| re.is_match(text))
}

/// Trim and fold newlines into spaces.
pub(crate) fn normalize(text: &str) -> String {
    text.trim().replace("\r\n", " ").replace('\n', " ")
}

enum Segment {
    Text(String),
    Fragment(Thunk),
}

/// Compile a template into a thunk plus the identifiers its fragments read.
pub(crate) fn compile_template(text: &str) -> Result<(Thunk, Vec<String>), ParseError> {
    let text = normalize(text);
    let mut segments = Vec::new();
    let mut identifiers = Vec::new();
    let mut cursor = 0;
    let matches = FRAGMENT
        .as_ref()
        .map(|re| re.captures_iter(&text).collect::<Vec<_>>())
        .unwrap_or_default();
    for captures in matches {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            segments.push(Segment::Text(text[cursor..whole.start()].to_owned()));
        }
        let program = parse_program(inner.as_str().trim())?;
        for statement in &program.statements {
            statement.collect_identifiers(&mut identifiers);
        }
        segments.push(Segment::Fragment(compile_program(&program)));
        cursor = whole.end();
    }
    if cursor < text.len() {
        segments.push(Segment::Text(text[cursor..].to_owned()));
    }
    let thunk: Thunk = Box::new(move |ctx| {
        let mut out = String::new();
        for segment in &segments {
            match segment {
                Segment::Text(literal) => out.push_str(literal),
                Segment::Fragment(fragment) => match fragment(ctx) {
                    Ok(value) => out.push_str(&value.to_interpolation_string()),
                    Err(error) => {
                        tracing::debug!(target: "vireo::expr", %error, "interpolation fragment failed");
                    }
                },
            }
        }
        Ok(Value::from(out))
    });
    Ok((thunk, identifiers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvalContext;
    use vireo_core::ObservableObject;

    fn render(template: &str, scope: &Value) -> String {
        compile_template(template)
            .ok()
            .and_then(|(thunk, _)| thunk(&EvalContext::new(scope.clone())).ok())
            .map(|v| v.to_display_string())
            .unwrap_or_else(|| "<error>".to_owned())
    }

    fn scope() -> Value {
        Value::Object(ObservableObject::from_entries([
            ("name", Value::from("Alice")),
            ("count", Value::from(3)),
        ]))
    }

    #[test]
    fn detection() {
        assert!(has_interpolation("Hi {{ name }}"));
        assert!(has_interpolation("{{a\n+b}}"));
        assert!(!has_interpolation("Hi {name}"));
        assert!(!has_interpolation("{{}}"));
    }

    #[test]
    fn single_fragment() {
        assert_eq!(render("Hello {{ name }}!", &scope()), "Hello Alice!");
    }

    #[test]
    fn multiple_fragments() {
        assert_eq!(
            render("{{name}} has {{ count * 2 }} items", &scope()),
            "Alice has 6 items"
        );
    }

    #[test]
    fn missing_values_render_empty() {
        assert_eq!(render("[{{ nope }}]", &scope()), "[]");
        assert_eq!(render("[{{ nope.deeper }}] ok", &scope()), "[] ok");
    }

    #[test]
    fn newlines_fold_to_spaces() {
        assert_eq!(render("  a\n{{ name }}\r\nb  ", &scope()), "a Alice b");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(render("no fragments", &scope()), "no fragments");
    }

    #[test]
    fn fragment_syntax_errors_fail_compilation() {
        assert!(compile_template("x {{ a + }}").is_err());
    }

    #[test]
    fn identifiers_are_collected_across_fragments() {
        let ids = compile_template("{{ a }} {{ b + a }}").map(|(_, ids)| ids);
        assert_eq!(ids, Ok(vec!["a".to_owned(), "b".to_owned()]));
    }
}
