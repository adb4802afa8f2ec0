//! Virtual-node values.
//!
//! The rendering layer stores its tree nodes in reactive state (slot
//! contents, cached render output). The reactivity core must recognize them
//! so it never instruments them; this type carries just enough shape for
//! that role.

use std::rc::Rc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VNode {
    pub tag: Option<String>,
    pub key: Option<String>,
    pub text: Option<String>,
    pub children: Vec<Rc<VNode>>,
    pub is_comment: bool,
}

impl VNode {
    pub fn element(tag: impl Into<String>, children: Vec<VNode>) -> Self {
        Self {
            tag: Some(tag.into()),
            children: children.into_iter().map(Rc::new).collect(),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Placeholder node rendered as a comment.
    pub fn empty() -> Self {
        Self {
            is_comment: true,
            ..Self::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{observe, Value};

    #[test]
    fn vnodes_are_never_observed() {
        let node = Value::from(VNode::element("div", vec![VNode::text("hi")]).with_key("root"));
        assert!(observe(&node, false).is_none());
    }

    #[test]
    fn constructors_fill_the_expected_fields() {
        let node = VNode::element("ul", vec![VNode::element("li", vec![])]);
        assert_eq!(node.tag.as_deref(), Some("ul"));
        assert_eq!(node.children.len(), 1);
        assert!(VNode::empty().is_comment);
        assert_eq!(VNode::text("x").text.as_deref(), Some("x"));
    }
}
