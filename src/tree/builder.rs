//! TreeBuilder - the traversal context threaded through tree construction.
//!
//! A builder is created for one construction pass and handed by `&mut` to
//! every render function that takes part in it, including child components
//! rendered inside their parent. It owns three stacks that always move
//! together:
//!
//! - the [`KeyStack`] of sibling counters (one frame per open element)
//! - cursors into the previous tree (the "current pointer")
//! - the elements under construction
//!
//! # Failure
//!
//! [`TreeBuilder::construct`] marks all three stacks before running a render
//! function and restores the mark if the function fails or leaves elements
//! open, so a failed subtree never corrupts key generation for its siblings
//! or for later renders.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = TreeBuilder::new(previous.as_ref());
//! builder.construct(|b| {
//!     b.element("ul", None, |b| {
//!         b.leaf("li", None)?;
//!         b.show(is_open, |b| b.leaf("li", None))?;
//!         b.leaf("li", None)
//!     })
//! })?;
//! let root = builder.into_root()?;
//! ```

use std::collections::BTreeMap;

use tracing::{trace, warn};

use super::keys::KeyStack;
use super::node::{Element, Node, Renderable};
use crate::config::{render_config, RenderConfig};
use crate::error::{RenderError, RenderResult};
use crate::types::Value;

/// Position inside one sibling list of the previous tree.
#[derive(Debug, Clone, Copy)]
struct Cursor<'a> {
    siblings: &'a [Node],
    index: usize,
}

/// Snapshot of the builder's stacks taken by `construct`.
#[derive(Debug, Clone, Copy)]
struct Mark {
    key_depth: usize,
    key_top: Option<usize>,
    cursors: usize,
    cursor_index: usize,
    open: usize,
    children: usize,
    roots: usize,
}

/// Builds one tree, assigning keys as elements are opened.
pub struct TreeBuilder<'a> {
    keys: KeyStack,
    config: RenderConfig,
    cursors: Vec<Cursor<'a>>,
    open: Vec<Element>,
    roots: Vec<Node>,
    /// Elements at or below this depth belong to an enclosing `construct`.
    floor: usize,
}

impl<'a> TreeBuilder<'a> {
    /// Builder using the process default configuration.
    pub fn new(previous: Option<&'a Node>) -> Self {
        Self::with_config(previous, render_config())
    }

    /// Builder diffing positions against `previous` (the last rendered root).
    pub fn with_config(previous: Option<&'a Node>, config: RenderConfig) -> Self {
        let siblings = previous.map(std::slice::from_ref).unwrap_or(&[]);
        Self {
            keys: KeyStack::new(),
            config,
            cursors: vec![Cursor { siblings, index: 0 }],
            open: Vec::new(),
            roots: Vec::new(),
            floor: 0,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn key_stack(&self) -> &KeyStack {
        &self.keys
    }

    /// Number of open elements.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    // =========================================================================
    // Traversal Pointer
    // =========================================================================

    /// The previous tree's node at the current position, if any.
    pub fn current_pointer(&self) -> Option<&'a Node> {
        let cursor = *self.cursors.last()?;
        cursor.siblings.get(cursor.index)
    }

    /// Key the previous tree assigned at the current position.
    pub fn current_pointer_key(&self) -> Option<String> {
        self.current_pointer()
            .and_then(Node::key)
            .map(str::to_string)
    }

    // =========================================================================
    // Open / Close
    // =========================================================================

    /// Open an element and return the key assigned to it.
    pub fn open(&mut self, tag: &str, explicit_key: Option<&str>) -> Option<String> {
        let pointer = self.current_pointer();
        let key = self.keys.generate_key(
            explicit_key,
            || pointer.and_then(Node::key).map(str::to_string),
            &self.config.key_prefix,
        );
        trace!(tag, key = ?key, depth = self.keys.depth(), "open");

        self.cursors.push(Cursor {
            siblings: pointer.map(Node::children).unwrap_or(&[]),
            index: 0,
        });
        self.open.push(Element {
            tag: tag.to_string(),
            key: key.clone(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        });
        key
    }

    /// Close the innermost element.
    ///
    /// Pops the sibling counter pushed by the matching `open`, then attaches
    /// the finished element to its parent.
    pub fn close(&mut self, tag: &str) -> RenderResult<()> {
        if self.open.len() <= self.floor {
            return Err(RenderError::UnexpectedClose {
                tag: tag.to_string(),
            });
        }
        let Some(element) = self.open.pop() else {
            return Err(RenderError::UnexpectedClose {
                tag: tag.to_string(),
            });
        };
        if element.tag != tag {
            let expected = element.tag.clone();
            self.open.push(element);
            return Err(RenderError::MismatchedClose {
                expected,
                found: tag.to_string(),
            });
        }

        self.keys.close();
        self.cursors.pop();
        self.append(Node::Element(element));
        Ok(())
    }

    /// Set an attribute on the innermost open element.
    pub fn attr(&mut self, name: &str, value: impl Into<Value>) {
        match self.open.last_mut() {
            Some(element) => {
                element.attrs.insert(name.to_string(), value.into());
            }
            None => warn!(name, "attribute set with no open element"),
        }
    }

    /// Append a text node at the current position.
    ///
    /// Text does not take a sibling counter slot.
    pub fn text(&mut self, content: impl Into<String>) {
        self.append(Node::Text(content.into()));
    }

    /// Count a slot that rendered nothing.
    pub fn skip_child(&mut self) {
        self.keys.skip_child();
    }

    fn append(&mut self, node: Node) {
        if let Some(cursor) = self.cursors.last_mut() {
            cursor.index += 1;
        }
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    // =========================================================================
    // Scoped Construction
    // =========================================================================

    /// Run a render function, restoring every stack if it fails.
    ///
    /// The function must close everything it opens; it cannot close
    /// elements opened before it was called.
    pub fn construct<F>(&mut self, render: F) -> RenderResult<()>
    where
        F: FnOnce(&mut Self) -> RenderResult<()>,
    {
        let mark = self.mark();
        let outer_floor = self.floor;
        self.floor = self.open.len();

        let result = render(self);
        self.floor = outer_floor;

        match result {
            Ok(()) if self.open.len() == mark.open => Ok(()),
            Ok(()) => {
                let depth = self.open.len().saturating_sub(mark.open);
                self.restore(mark);
                Err(RenderError::UnclosedElements { depth })
            }
            Err(err) => {
                trace!(error = %err, depth = mark.key_depth, "restoring traversal after failure");
                self.restore(mark);
                Err(err)
            }
        }
    }

    fn mark(&self) -> Mark {
        Mark {
            key_depth: self.keys.depth(),
            key_top: self.keys.top(),
            cursors: self.cursors.len(),
            cursor_index: self.cursors.last().map_or(0, |c| c.index),
            open: self.open.len(),
            children: self.open.last().map_or(0, |e| e.children.len()),
            roots: self.roots.len(),
        }
    }

    fn restore(&mut self, mark: Mark) {
        self.keys.truncate(mark.key_depth);
        if let Some(top) = mark.key_top {
            self.keys.set_top(top);
        }
        self.cursors.truncate(mark.cursors);
        if let Some(cursor) = self.cursors.last_mut() {
            cursor.index = mark.cursor_index;
        }
        self.open.truncate(mark.open);
        if let Some(parent) = self.open.last_mut() {
            parent.children.truncate(mark.children);
        }
        self.roots.truncate(mark.roots);
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Open `tag`, render its children, close it.
    ///
    /// If `children` fails the element is discarded and the stacks are back
    /// where they were before the call, so the caller may recover and keep
    /// rendering siblings.
    pub fn element<F>(&mut self, tag: &str, key: Option<&str>, children: F) -> RenderResult<()>
    where
        F: FnOnce(&mut Self) -> RenderResult<()>,
    {
        self.construct(|b| {
            b.open(tag, key);
            children(b)?;
            b.close(tag)
        })
    }

    /// An element with no children.
    pub fn leaf(&mut self, tag: &str, key: Option<&str>) -> RenderResult<()> {
        self.element(tag, key, |_| Ok(()))
    }

    /// Render `then` if `condition` holds; otherwise skip the slot.
    pub fn show<F>(&mut self, condition: bool, then: F) -> RenderResult<()>
    where
        F: FnOnce(&mut Self) -> RenderResult<()>,
    {
        if condition {
            then(self)
        } else {
            self.skip_child();
            Ok(())
        }
    }

    /// Render one child per item; `render` receives the item's key.
    pub fn each<T, K, F>(&mut self, items: &[T], key_fn: K, mut render: F) -> RenderResult<()>
    where
        K: Fn(&T) -> String,
        F: FnMut(&mut Self, &T, &str) -> RenderResult<()>,
    {
        for item in items {
            let key = key_fn(item);
            render(self, item, &key)?;
        }
        Ok(())
    }

    /// Normalize a value returned directly by a render function.
    ///
    /// Pre-built nodes keep explicit keys; unkeyed elements are keyed by
    /// position like any other opened element.
    pub fn render_arbitrary(&mut self, value: &Renderable) -> RenderResult<()> {
        match value {
            Renderable::Empty => {
                self.skip_child();
                Ok(())
            }
            Renderable::Text(content) => {
                self.text(content.clone());
                Ok(())
            }
            Renderable::Node(node) => self.emit_node(node),
            Renderable::List(items) => {
                for item in items {
                    self.render_arbitrary(item)?;
                }
                Ok(())
            }
        }
    }

    fn emit_node(&mut self, node: &Node) -> RenderResult<()> {
        match node {
            Node::Text(content) => {
                self.text(content.clone());
                Ok(())
            }
            Node::Element(element) => self.element(&element.tag, element.key.as_deref(), |b| {
                for (name, value) in &element.attrs {
                    b.attr(name, value.clone());
                }
                for child in &element.children {
                    b.emit_node(child)?;
                }
                Ok(())
            }),
        }
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// Number of completed nodes at the current depth.
    pub fn child_count(&self) -> usize {
        match self.open.last() {
            Some(parent) => parent.children.len(),
            None => self.roots.len(),
        }
    }

    /// The most recently completed node at the current depth.
    pub fn last_node(&self) -> Option<&Node> {
        match self.open.last() {
            Some(parent) => parent.children.last(),
            None => self.roots.last(),
        }
    }

    /// All top-level nodes.
    pub fn into_roots(self) -> RenderResult<Vec<Node>> {
        if !self.open.is_empty() {
            return Err(RenderError::UnclosedElements {
                depth: self.open.len(),
            });
        }
        Ok(self.roots)
    }

    /// The single root; several roots are wrapped in a default container.
    pub fn into_root(self) -> RenderResult<Node> {
        let default_tag = self.config.default_tag.clone();
        let mut roots = self.into_roots()?;
        match roots.len() {
            0 => Err(RenderError::EmptyTree),
            1 => Ok(roots.remove(0)),
            _ => Ok(roots
                .into_iter()
                .fold(Node::element(default_tag), Node::with_child)),
        }
    }
}

impl std::fmt::Debug for TreeBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("keys", &self.keys)
            .field("open", &self.open.len())
            .field("roots", &self.roots.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(previous: Option<&Node>) -> TreeBuilder<'_> {
        TreeBuilder::with_config(previous, RenderConfig::default())
    }

    fn list(b: &mut TreeBuilder<'_>, show_middle: bool) -> RenderResult<()> {
        b.element("ul", None, |b| {
            b.leaf("li", None)?;
            b.show(show_middle, |b| b.leaf("li", None))?;
            b.leaf("li", None)
        })
    }

    #[test]
    fn test_unkeyed_siblings_get_positional_keys() {
        let mut b = builder(None);
        b.construct(|b| {
            b.element("ul", None, |b| {
                b.leaf("li", None)?;
                b.leaf("li", None)?;
                b.leaf("li", None)
            })
        })
        .unwrap();

        let root = b.into_root().unwrap();
        assert_eq!(root.key(), None);
        assert_eq!(
            root.child_keys(),
            vec![Some("_metal_jsx_1"), Some("_metal_jsx_2"), Some("_metal_jsx_3")]
        );
    }

    #[test]
    fn test_conditional_slot_keeps_sibling_keys() {
        let mut shown = builder(None);
        shown.construct(|b| list(b, true)).unwrap();
        let shown = shown.into_root().unwrap();

        let mut hidden = builder(None);
        hidden.construct(|b| list(b, false)).unwrap();
        let hidden = hidden.into_root().unwrap();

        assert_eq!(
            shown.child_keys(),
            vec![Some("_metal_jsx_1"), Some("_metal_jsx_2"), Some("_metal_jsx_3")]
        );
        assert_eq!(hidden.child_keys(), vec![Some("_metal_jsx_1"), Some("_metal_jsx_3")]);
    }

    #[test]
    fn test_root_reuses_previous_key() {
        let previous = Node::element("div").with_key("app");
        let mut b = builder(Some(&previous));
        assert_eq!(b.current_pointer_key().as_deref(), Some("app"));

        b.construct(|b| b.leaf("div", None)).unwrap();
        assert_eq!(b.into_root().unwrap().key(), Some("app"));
    }

    #[test]
    fn test_root_without_previous_has_no_key() {
        let mut b = builder(None);
        assert_eq!(b.current_pointer_key(), None);
        b.construct(|b| b.leaf("div", None)).unwrap();
        assert_eq!(b.into_root().unwrap().key(), None);
    }

    #[test]
    fn test_pointer_follows_previous_tree() {
        let previous = Node::element("ul")
            .with_child(Node::element("li").with_key("a"))
            .with_child(Node::text("gap"))
            .with_child(Node::element("li").with_key("b"));
        let mut b = builder(Some(&previous));

        b.open("ul", None);
        assert_eq!(b.current_pointer_key().as_deref(), Some("a"));
        b.leaf("li", None).unwrap();
        assert_eq!(b.current_pointer(), Some(&Node::text("gap")));
        b.text("gap");
        assert_eq!(b.current_pointer_key().as_deref(), Some("b"));
    }

    #[test]
    fn test_attributes_and_text() {
        let mut b = builder(None);
        b.construct(|b| {
            b.element("p", Some("intro"), |b| {
                b.attr("class", "lead");
                b.text("hello");
                Ok(())
            })
        })
        .unwrap();

        let root = b.into_root().unwrap();
        assert_eq!(root.key(), Some("intro"));
        assert_eq!(root.children(), &[Node::text("hello")]);
        assert_eq!(
            root.as_element().unwrap().attrs.get("class"),
            Some(&Value::from("lead"))
        );
    }

    #[test]
    fn test_failed_construct_restores_stacks() {
        let mut b = builder(None);
        b.open("main", None);
        b.leaf("header", None).unwrap();
        let depth = b.key_stack().depth();
        let top = b.key_stack().top();

        let result = b.construct(|b| {
            b.open("section", None);
            b.open("p", None);
            Err(RenderError::traversal("test", "boom"))
        });

        assert!(result.is_err());
        assert_eq!(b.key_stack().depth(), depth);
        assert_eq!(b.key_stack().top(), top);
        assert_eq!(b.depth(), 1);

        // Next sibling gets the key it would have had without the failure.
        assert_eq!(b.open("footer", None).as_deref(), Some("_metal_jsx_2"));
    }

    #[test]
    fn test_failed_child_is_rolled_back_for_siblings() {
        let mut b = builder(None);
        b.construct(|b| {
            b.element("ul", None, |b| {
                let failed = b.element("li", None, |b| {
                    b.leaf("span", None)?;
                    Err(RenderError::traversal("test", "child failed"))
                });
                assert!(failed.is_err());
                assert_eq!(b.key_stack().depth(), 1);
                assert_eq!(b.depth(), 1);
                b.leaf("li", None)
            })
        })
        .unwrap();

        let root = b.into_root().unwrap();
        assert_eq!(root.child_keys(), vec![Some("_metal_jsx_1")]);
        assert!(root.children()[0].children().is_empty());
    }

    #[test]
    fn test_prebuilt_node_leaves_stack_balanced() {
        let mut b = builder(None);
        b.open("div", None);
        b.leaf("p", None).unwrap();

        let nested = Node::element("section").with_child(Node::element("p"));
        b.emit_node(&nested).unwrap();
        assert_eq!(b.key_stack().depth(), 1);
        assert_eq!(b.key_stack().top(), Some(2));
    }

    #[test]
    fn test_unclosed_elements_are_rejected() {
        let mut b = builder(None);
        let result = b.construct(|b| {
            b.open("div", None);
            Ok(())
        });
        assert_eq!(result, Err(RenderError::UnclosedElements { depth: 1 }));
        assert!(b.key_stack().is_empty());
    }

    #[test]
    fn test_cannot_close_outer_element() {
        let mut b = builder(None);
        b.open("div", None);
        let result = b.construct(|b| b.close("div"));
        assert_eq!(
            result,
            Err(RenderError::UnexpectedClose {
                tag: "div".to_string()
            })
        );
        assert_eq!(b.depth(), 1);
    }

    #[test]
    fn test_mismatched_close() {
        let mut b = builder(None);
        b.open("div", None);
        assert_eq!(
            b.close("span"),
            Err(RenderError::MismatchedClose {
                expected: "div".to_string(),
                found: "span".to_string(),
            })
        );
        assert!(b.close("div").is_ok());
    }

    #[test]
    fn test_render_arbitrary() {
        let value = Renderable::List(vec![
            Renderable::Node(Node::element("b")),
            Renderable::Empty,
            Renderable::Node(Node::element("i").with_key("keep")),
            Renderable::Node(Node::element("u")),
            Renderable::Text("tail".to_string()),
        ]);

        let mut b = builder(None);
        b.construct(|b| b.element("div", None, |b| b.render_arbitrary(&value)))
            .unwrap();

        let root = b.into_root().unwrap();
        assert_eq!(
            root.child_keys(),
            vec![Some("_metal_jsx_1"), Some("keep"), Some("_metal_jsx_4"), None]
        );
    }

    #[test]
    fn test_each_with_keys() {
        let items = ["x", "y"];
        let mut b = builder(None);
        b.construct(|b| {
            b.element("ul", None, |b| {
                b.each(&items, |item| format!("item-{item}"), |b, _, key| b.leaf("li", Some(key)))
            })
        })
        .unwrap();

        let root = b.into_root().unwrap();
        assert_eq!(root.child_keys(), vec![Some("item-x"), Some("item-y")]);
    }

    #[test]
    fn test_multiple_roots_are_wrapped() {
        let mut b = builder(None);
        b.leaf("a", None).unwrap();
        b.leaf("b", None).unwrap();
        let root = b.into_root().unwrap();
        assert_eq!(root.tag(), Some("div"));
        assert_eq!(root.children().len(), 2);
    }

    #[test]
    fn test_empty_tree() {
        assert_eq!(builder(None).into_root(), Err(RenderError::EmptyTree));
    }
}
