#![forbid(unsafe_code)]

//! Virtual nodes: the parsed template tree handed to the view builder.

use indexmap::IndexMap;

/// Tag of text nodes.
pub const TEXT_TAG: &str = "#text";

/// One template node: a tag, its attributes in source order, and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VNode {
    pub tag: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attrs: IndexMap<String, String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<VNode>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub text: Option<String>,
}

impl VNode {
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            tag: TEXT_TAG.to_owned(),
            text: Some(content.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn child(mut self, child: VNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children.extend(children);
        self
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        self.tag == TEXT_TAG
    }

    /// Copy without attribute `name`.
    #[must_use]
    pub fn without_attr(&self, name: &str) -> Self {
        let mut copy = self.clone();
        copy.attrs.shift_remove(name);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_attribute_order() {
        let node = VNode::element("box")
            .attr("b", "1")
            .attr(":a", "x")
            .child(VNode::text("hi"));
        assert_eq!(node.attrs.keys().collect::<Vec<_>>(), vec!["b", ":a"]);
        assert!(node.children[0].is_text());
        assert_eq!(node.without_attr("b").attrs.len(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_from_json() {
        let node: VNode = serde_json::from_str(
            r##"{"tag":"box","attrs":{":if":"shown"},"children":[{"tag":"#text","text":"hi"}]}"##,
        )
        .expect("valid node");
        assert_eq!(node.attrs.get(":if").map(String::as_str), Some("shown"));
        assert_eq!(node.children[0].text.as_deref(), Some("hi"));
    }
}
