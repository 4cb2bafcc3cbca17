//! Tree nodes produced by construction and consumed by the patcher.

use std::collections::BTreeMap;

use crate::types::Value;

/// An element in a constructed tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    /// Identity used by reconciliation; `None` means positional matching.
    pub key: Option<String>,
    pub attrs: BTreeMap<String, Value>,
    pub children: Vec<Node>,
}

/// A node in a constructed tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    /// An empty element with no key.
    pub fn element(tag: impl Into<String>) -> Self {
        Node::Element(Element {
            tag: tag.into(),
            key: None,
            attrs: BTreeMap::new(),
            children: Vec::new(),
        })
    }

    /// A text node.
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    /// Set the key (no-op on text nodes).
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        if let Node::Element(el) = &mut self {
            el.key = Some(key.into());
        }
        self
    }

    /// Set an attribute (no-op on text nodes).
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Node::Element(el) = &mut self {
            el.attrs.insert(name.into(), value.into());
        }
        self
    }

    /// Append a child (no-op on text nodes).
    pub fn with_child(mut self, child: Node) -> Self {
        if let Node::Element(el) = &mut self {
            el.children.push(child);
        }
        self
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Node::Element(el) => el.key.as_deref(),
            Node::Text(_) => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Node::Element(el) => Some(&el.tag),
            Node::Text(_) => None,
        }
    }

    /// Children of an element; text nodes have none.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Text(_) => &[],
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Keys of the direct children, in order.
    pub fn child_keys(&self) -> Vec<Option<&str>> {
        self.children().iter().map(Node::key).collect()
    }
}

/// A value returned directly by a component's render function.
///
/// Normalized into the tree by `TreeBuilder::render_arbitrary`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Renderable {
    /// Nothing; the slot still counts as a sibling position.
    #[default]
    Empty,
    Text(String),
    Node(Node),
    List(Vec<Renderable>),
}

impl From<Node> for Renderable {
    fn from(node: Node) -> Self {
        Renderable::Node(node)
    }
}

impl From<&str> for Renderable {
    fn from(text: &str) -> Self {
        Renderable::Text(text.to_string())
    }
}

impl From<String> for Renderable {
    fn from(text: String) -> Self {
        Renderable::Text(text)
    }
}

impl<T: Into<Renderable>> From<Option<T>> for Renderable {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Renderable::Empty)
    }
}

impl<T: Into<Renderable>> From<Vec<T>> for Renderable {
    fn from(items: Vec<T>) -> Self {
        Renderable::List(items.into_iter().map(Into::into).collect())
    }
}
