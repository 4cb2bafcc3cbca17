//! Components - the stateful units a coordinator renders.
//!
//! A [`Component`] carries everything the render pipeline needs from its
//! owner:
//!
//! - its render-target root (`element`), created on first render if absent
//! - its [`UpdateMode`], read once when a coordinator is attached
//! - its [`TreeSource`], chosen once when the component is built
//! - an optional should-update predicate
//! - the two change channels the data manager emits on
//!
//! Components are shared through `Rc`; the coordinator keeps a clone for its
//! whole lifetime.
//!
//! # Example
//!
//! ```ignore
//! let counter = Component::builder("Counter")
//!     .render(|b| b.element("span", None, |b| {
//!         b.text("0");
//!         Ok(())
//!     }))
//!     .build();
//! let store = StateStore::new(counter.clone());
//! ```

mod store;

pub use store::StateStore;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use crate::error::{RenderError, RenderResult};
use crate::events::{EventEmitter, Unsubscribe};
use crate::tree::{Node, Renderable, TreeBuilder};
use crate::types::{ChangeSet, KeyChange, UpdateMode};

/// Name of the batched change channel.
pub const STATE_CHANGED: &str = "stateChanged";

/// Name of the per-key change channel.
pub const STATE_KEY_CHANGED: &str = "stateKeyChanged";

// =============================================================================
// Tree Source
// =============================================================================

/// Render function driving the shared traversal.
pub type DeclarativeRender = Rc<dyn Fn(&mut TreeBuilder<'_>) -> RenderResult<()>>;

/// Render function returning a pre-built value.
pub type DirectRender = Rc<dyn Fn() -> RenderResult<Renderable>>;

/// Predicate deciding whether accumulated changes warrant a rerender.
///
/// Receives the state change-set and the prop change-set.
pub type ShouldUpdate = Rc<dyn Fn(&ChangeSet, &ChangeSet) -> bool>;

/// How a component produces its tree.
#[derive(Clone)]
pub enum TreeSource {
    /// Emits elements into the traversal context.
    Declarative(DeclarativeRender),
    /// Returns a value that is normalized into the tree.
    Direct(DirectRender),
}

impl std::fmt::Debug for TreeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeSource::Declarative(_) => f.write_str("TreeSource::Declarative"),
            TreeSource::Direct(_) => f.write_str("TreeSource::Direct"),
        }
    }
}

// =============================================================================
// Component
// =============================================================================

/// A stateful unit owning a render-target subtree.
pub struct Component {
    name: String,
    update_mode: UpdateMode,
    tree_source: TreeSource,
    should_update: Option<ShouldUpdate>,
    element: RefCell<Option<Node>>,
    state_changed: Option<EventEmitter<ChangeSet>>,
    state_key_changed: Option<EventEmitter<KeyChange>>,
}

impl Component {
    /// Start building a component.
    pub fn builder(name: impl Into<String>) -> ComponentBuilder {
        ComponentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    pub fn tree_source(&self) -> &TreeSource {
        &self.tree_source
    }

    /// Run the should-update predicate; true when none was supplied.
    pub fn should_update(&self, state_changes: &ChangeSet, prop_changes: &ChangeSet) -> bool {
        self.should_update
            .as_ref()
            .is_none_or(|predicate| predicate(state_changes, prop_changes))
    }

    // =========================================================================
    // Element
    // =========================================================================

    /// A copy of the current render-target root.
    pub fn element(&self) -> Option<Node> {
        self.element.borrow().clone()
    }

    pub fn has_element(&self) -> bool {
        self.element.borrow().is_some()
    }

    pub fn set_element(&self, node: Node) {
        *self.element.borrow_mut() = Some(node);
    }

    /// Create an empty container if the component has no element yet.
    ///
    /// Returns true if a container was created.
    pub fn ensure_element(&self, default_tag: &str) -> bool {
        let mut element = self.element.borrow_mut();
        if element.is_some() {
            return false;
        }
        *element = Some(Node::element(default_tag));
        true
    }

    // =========================================================================
    // Channels
    // =========================================================================

    /// Subscribe to batched change notifications.
    pub fn on_state_changed<F>(&self, handler: F) -> RenderResult<Unsubscribe>
    where
        F: Fn(&ChangeSet) + 'static,
    {
        self.state_changed
            .as_ref()
            .map(|emitter| emitter.on(handler))
            .ok_or_else(|| self.missing(STATE_CHANGED))
    }

    /// Subscribe to per-key change notifications.
    pub fn on_state_key_changed<F>(&self, handler: F) -> RenderResult<Unsubscribe>
    where
        F: Fn(&KeyChange) + 'static,
    {
        self.state_key_changed
            .as_ref()
            .map(|emitter| emitter.on(handler))
            .ok_or_else(|| self.missing(STATE_KEY_CHANGED))
    }

    /// Emit on the batched channel. Empty change-sets are not emitted.
    pub fn emit_state_changed(&self, changes: &ChangeSet) {
        if changes.is_empty() {
            return;
        }
        match &self.state_changed {
            Some(emitter) => emitter.emit(changes),
            None => warn!(component = %self.name, "{STATE_CHANGED} emitted without a channel"),
        }
    }

    /// Emit on the per-key channel.
    pub fn emit_state_key_changed(&self, change: &KeyChange) {
        match &self.state_key_changed {
            Some(emitter) => emitter.emit(change),
            None => warn!(component = %self.name, "{STATE_KEY_CHANGED} emitted without a channel"),
        }
    }

    fn missing(&self, channel: &'static str) -> RenderError {
        RenderError::MissingEmitter {
            component: self.name.clone(),
            channel,
        }
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("update_mode", &self.update_mode)
            .field("tree_source", &self.tree_source)
            .field("has_element", &self.has_element())
            .finish()
    }
}

// =============================================================================
// Component Builder
// =============================================================================

/// Builder for [`Component`].
pub struct ComponentBuilder {
    name: String,
    update_mode: UpdateMode,
    tree_source: Option<TreeSource>,
    should_update: Option<ShouldUpdate>,
    element: Option<Node>,
    channels: bool,
}

impl ComponentBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            update_mode: UpdateMode::Batched,
            tree_source: None,
            should_update: None,
            element: None,
            channels: true,
        }
    }

    pub fn update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }

    /// Request synchronous per-key updates.
    pub fn sync_updates_merged(self) -> Self {
        self.update_mode(UpdateMode::PerKey)
    }

    /// Render by driving the traversal.
    pub fn render<F>(mut self, render: F) -> Self
    where
        F: Fn(&mut TreeBuilder<'_>) -> RenderResult<()> + 'static,
    {
        self.tree_source = Some(TreeSource::Declarative(Rc::new(render)));
        self
    }

    /// Render by returning a value.
    pub fn render_direct<F, R>(mut self, render: F) -> Self
    where
        F: Fn() -> RenderResult<R> + 'static,
        R: Into<Renderable>,
    {
        self.tree_source = Some(TreeSource::Direct(Rc::new(move || render().map(Into::into))));
        self
    }

    pub fn should_update<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ChangeSet, &ChangeSet) -> bool + 'static,
    {
        self.should_update = Some(Rc::new(predicate));
        self
    }

    /// Start with an existing render-target root.
    pub fn element(mut self, node: Node) -> Self {
        self.element = Some(node);
        self
    }

    /// Build without change channels (no data manager attached).
    pub fn without_channels(mut self) -> Self {
        self.channels = false;
        self
    }

    pub fn build(self) -> Rc<Component> {
        let tree_source = self.tree_source.unwrap_or_else(default_tree_source);
        Rc::new(Component {
            name: self.name,
            update_mode: self.update_mode,
            tree_source,
            should_update: self.should_update,
            element: RefCell::new(self.element),
            state_changed: self.channels.then(EventEmitter::new),
            state_key_changed: self.channels.then(EventEmitter::new),
        })
    }
}

/// An empty container of the configured default tag.
fn default_tree_source() -> TreeSource {
    TreeSource::Declarative(Rc::new(|b| {
        let tag = b.config().default_tag.clone();
        b.leaf(&tag, None)
    }))
}

// =============================================================================
// Tests
// =============================================================================
