//! Events Module - Minimal pub/sub for change and lifecycle notifications
//!
//! Components expose their change channels through [`EventEmitter`], and the
//! render coordinator uses one for its "rendered" notification.
//!
//! # API
//!
//! - `on(handler)` - Subscribe, returns a cleanup closure
//! - `emit(&event)` - Call every handler in subscription order
//! - `handler_count()` - Number of live subscriptions
//!
//! # Example
//!
//! ```ignore
//! use spark_jsx::events::EventEmitter;
//!
//! let rendered: EventEmitter<bool> = EventEmitter::new();
//! let cleanup = rendered.on(|first| println!("rendered, first = {first}"));
//! rendered.emit(&true);
//! cleanup();
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Handler for an event payload.
pub type Handler<E> = Rc<dyn Fn(&E)>;

/// Cleanup function returned by [`EventEmitter::on`].
pub type Unsubscribe = Box<dyn FnOnce()>;

// =============================================================================
// HANDLER REGISTRY
// =============================================================================

struct HandlerRegistry<E> {
    handlers: Vec<(usize, Handler<E>)>,
    next_id: usize,
}

impl<E> HandlerRegistry<E> {
    fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

// =============================================================================
// EVENT EMITTER
// =============================================================================

/// A single-threaded event channel.
///
/// Handlers may subscribe or unsubscribe while an emit is in progress; the
/// emit works on a snapshot taken before the first handler runs.
pub struct EventEmitter<E> {
    registry: Rc<RefCell<HandlerRegistry<E>>>,
}

impl<E: 'static> EventEmitter<E> {
    /// Create an emitter with no handlers.
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(HandlerRegistry::new())),
        }
    }

    /// Subscribe to every event on this channel.
    /// Returns cleanup function.
    pub fn on<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&E) + 'static,
    {
        let id = {
            let mut reg = self.registry.borrow_mut();
            let id = reg.next_id();
            reg.handlers.push((id, Rc::new(handler)));
            id
        };

        let registry: Weak<RefCell<HandlerRegistry<E>>> = Rc::downgrade(&self.registry);
        Box::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .borrow_mut()
                    .handlers
                    .retain(|(handler_id, _)| *handler_id != id);
            }
        })
    }

    /// Dispatch an event to all handlers.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Handler<E>> = self
            .registry
            .borrow()
            .handlers
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in snapshot {
            handler(event);
        }
    }

    /// Number of live subscriptions.
    pub fn handler_count(&self) -> usize {
        self.registry.borrow().handlers.len()
    }

    /// Drop every handler (for testing).
    pub fn clear(&self) {
        self.registry.borrow_mut().handlers.clear();
    }
}

impl<E: 'static> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("handlers", &self.registry.borrow().handlers.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
