#![forbid(unsafe_code)]

//! Typed, settable node attributes.
//!
//! The scene graph is external. Code that needs to mutate a node through a
//! [`DescriptionContext`](crate::description::DescriptionContext) names the
//! attribute with an [`Attribute`] descriptor: a getter/setter pair plus a
//! stable name. The context uses the getter to snapshot the value it will
//! restore on dispose.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A scene-graph node as seen by the runtime.
pub trait SceneNode: 'static {
    /// Disposed nodes are skipped when recorded assignments are restored.
    fn is_disposed(&self) -> bool {
        false
    }
}

/// Shared handle to a node.
pub type NodeHandle<N> = Rc<RefCell<N>>;

/// A named getter/setter pair on node type `N`.
pub struct Attribute<N, V> {
    name: &'static str,
    get: fn(&N) -> V,
    set: fn(&mut N, V),
}

impl<N, V> Clone for Attribute<N, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N, V> Copy for Attribute<N, V> {}

impl<N, V> fmt::Debug for Attribute<N, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Attribute").field(&self.name).finish()
    }
}

impl<N, V> Attribute<N, V> {
    pub const fn new(name: &'static str, get: fn(&N) -> V, set: fn(&mut N, V)) -> Self {
        Self { name, get, set }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub fn read(&self, node: &N) -> V {
        (self.get)(node)
    }

    pub fn write(&self, node: &mut N, value: V) {
        (self.set)(node, value);
    }
}

/// A node carrying the accessible content description logic typically drives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessibleNode {
    pub visible: bool,
    pub accessible_name: Option<String>,
    pub help_text: Option<String>,
    pub description: Option<String>,
    pub voicing_name_response: Option<String>,
    pub voicing_object_response: Option<String>,
    disposed: bool,
}

impl AccessibleNode {
    pub const VISIBLE: Attribute<Self, bool> =
        Attribute::new("visible", |n: &Self| n.visible, |n: &mut Self, v| n.visible = v);
    pub const ACCESSIBLE_NAME: Attribute<Self, Option<String>> = Attribute::new(
        "accessibleName",
        |n: &Self| n.accessible_name.clone(),
        |n: &mut Self, v| n.accessible_name = v,
    );
    pub const HELP_TEXT: Attribute<Self, Option<String>> = Attribute::new(
        "helpText",
        |n: &Self| n.help_text.clone(),
        |n: &mut Self, v| n.help_text = v,
    );
    pub const DESCRIPTION: Attribute<Self, Option<String>> = Attribute::new(
        "description",
        |n: &Self| n.description.clone(),
        |n: &mut Self, v| n.description = v,
    );
    pub const VOICING_NAME_RESPONSE: Attribute<Self, Option<String>> = Attribute::new(
        "voicingNameResponse",
        |n: &Self| n.voicing_name_response.clone(),
        |n: &mut Self, v| n.voicing_name_response = v,
    );
    pub const VOICING_OBJECT_RESPONSE: Attribute<Self, Option<String>> = Attribute::new(
        "voicingObjectResponse",
        |n: &Self| n.voicing_object_response.clone(),
        |n: &mut Self, v| n.voicing_object_response = v,
    );

    /// A visible node with no accessible content.
    #[must_use]
    pub fn new() -> Self {
        Self {
            visible: true,
            ..Self::default()
        }
    }

    /// Wrap in a shared handle.
    #[must_use]
    pub fn into_handle(self) -> NodeHandle<Self> {
        Rc::new(RefCell::new(self))
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
    }
}

impl SceneNode for AccessibleNode {
    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_reads_and_writes() {
        let mut node = AccessibleNode::new();
        assert!(AccessibleNode::VISIBLE.read(&node));
        AccessibleNode::VISIBLE.write(&mut node, false);
        assert!(!node.visible);

        AccessibleNode::ACCESSIBLE_NAME.write(&mut node, Some("Ball".into()));
        assert_eq!(
            AccessibleNode::ACCESSIBLE_NAME.read(&node).as_deref(),
            Some("Ball")
        );
        assert_eq!(AccessibleNode::ACCESSIBLE_NAME.name(), "accessibleName");
    }

    #[test]
    fn dispose_marks_node() {
        let mut node = AccessibleNode::new();
        assert!(!node.is_disposed());
        node.dispose();
        assert!(node.is_disposed());
    }
}
