#![forbid(unsafe_code)]

//! Text snapshots of visual trees.
//!
//! [`tree_snapshot`] renders one line per node:
//!
//! ```text
//! <list>
//!   <row label="a">
//!   <anchor>
//! ```
//!
//! [`assert_snapshot!`](crate::assert_snapshot) compares against
//! `tests/snapshots/<name>.snap` in the calling crate. Run with `BLESS=1`
//! to write or refresh the file.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use vireo_view::VisualNode;

/// Anything that renders to snapshot text.
pub trait Snapshot {
    fn snapshot(&self) -> String;
}

impl Snapshot for VisualNode {
    fn snapshot(&self) -> String {
        tree_snapshot(self)
    }
}

impl Snapshot for str {
    fn snapshot(&self) -> String {
        self.to_owned()
    }
}

impl Snapshot for String {
    fn snapshot(&self) -> String {
        self.clone()
    }
}

/// Indented `<tag key="value">` lines, properties in insertion order.
#[must_use]
pub fn tree_snapshot(root: &VisualNode) -> String {
    let mut out = String::new();
    write_node(&mut out, root, 0);
    out
}

fn write_node(out: &mut String, node: &VisualNode, depth: usize) {
    let _ = write!(out, "{:indent$}<{}", "", node.tag(), indent = depth * 2);
    for (key, value) in node.props().entries() {
        let _ = write!(out, " {key}=\"{}\"", value.to_display_string());
    }
    out.push_str(">\n");
    for child in node.children() {
        write_node(out, &child, depth + 1);
    }
}

fn snapshot_path(manifest_dir: &str, name: &str) -> PathBuf {
    Path::new(manifest_dir)
        .join("tests")
        .join("snapshots")
        .join(format!("{name}.snap"))
}

fn is_bless() -> bool {
    std::env::var("BLESS").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Compare `actual` to the stored snapshot `name`, panicking with both on
/// mismatch. Called through [`assert_snapshot!`](crate::assert_snapshot).
pub fn check_snapshot(manifest_dir: &str, name: &str, actual: &str) {
    let path = snapshot_path(manifest_dir, name);
    if is_bless() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("cannot create {}: {e}", parent.display()));
        }
        fs::write(&path, actual).unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));
        return;
    }
    match fs::read_to_string(&path) {
        Ok(expected) => {
            if expected != actual {
                panic!(
                    "snapshot '{name}' mismatch ({})\n--- expected\n{expected}\n--- actual\n{actual}\n\
                     rerun with BLESS=1 to accept",
                    path.display()
                );
            }
        }
        Err(_) => panic!(
            "no snapshot '{name}' at {}; rerun with BLESS=1 to create it\n--- actual\n{actual}",
            path.display()
        ),
    }
}

/// Assert a [`Snapshot`] matches `tests/snapshots/<name>.snap`.
///
/// ```ignore
/// assert_snapshot!("list_initial", &view.visual);
/// ```
#[macro_export]
macro_rules! assert_snapshot {
    ($name:expr, $value:expr) => {
        $crate::snapshot::check_snapshot(
            env!("CARGO_MANIFEST_DIR"),
            $name,
            &$crate::snapshot::Snapshot::snapshot($value),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_core::Value;

    #[test]
    fn renders_nested_tree_with_props() {
        let root = VisualNode::new("list");
        let row = VisualNode::new("row");
        row.set_property("label", Value::from("a"));
        row.set_property("n", Value::from(2));
        root.add_child(&row, None);
        root.add_child(&VisualNode::anchor(), None);
        assert_eq!(
            tree_snapshot(&root),
            "<list>\n  <row label=\"a\" n=\"2\">\n  <anchor>\n"
        );
    }

    #[test]
    fn missing_snapshot_reports_path() {
        if is_bless() {
            return;
        }
        let result = std::panic::catch_unwind(|| {
            check_snapshot(env!("CARGO_MANIFEST_DIR"), "does_not_exist", "x");
        });
        assert!(result.is_err());
    }
}
