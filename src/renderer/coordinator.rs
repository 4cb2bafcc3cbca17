//! RenderCoordinator - the render/update lifecycle of one component.
//!
//! The coordinator turns change notifications into `update` calls:
//!
//! 1. At construction it subscribes to exactly one of the component's
//!    channels, picked from its [`UpdateMode`]: per-key for components that
//!    asked for synchronous merged updates, batched otherwise.
//! 2. Every notification goes through a pure decision function that applies
//!    the gate: the component must have rendered once and updates must not
//!    be skipped.
//! 3. Notifications that pass are routed through the renderer, which may
//!    hold them back, and the resulting change-set is handed to `update`.
//!
//! Changes that arrive before the first render or during a skip window are
//! dropped, not queued.
//!
//! # Example
//!
//! ```ignore
//! let coordinator = RenderCoordinator::new(component.clone(), JsxRenderer::new())?;
//! coordinator.render()?;
//!
//! store.set_state("count", 1);
//! store.flush(); // -> JsxRenderer::update
//! ```

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace};

use super::Renderer;
use crate::component::Component;
use crate::error::{RenderError, RenderResult};
use crate::events::{EventEmitter, Unsubscribe};
use crate::tree::TreeBuilder;
use crate::types::{ChangeSet, ExtraDataConfig, KeyChange, UpdateMode};

// =============================================================================
// Flags
// =============================================================================

bitflags::bitflags! {
    /// Lifecycle flags of a coordinator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RenderFlags: u8 {
        /// Set by the first completed render, never cleared.
        const RENDERED = 1 << 0;
        /// Set between `start_skip_updates` and `stop_skip_updates`.
        const SKIP_UPDATES = 1 << 1;
    }
}

impl RenderFlags {
    /// Rendered at least once and not skipping updates.
    pub fn should_rerender(self) -> bool {
        self.contains(Self::RENDERED) && !self.contains(Self::SKIP_UPDATES)
    }
}

// =============================================================================
// Decision Functions
// =============================================================================

/// Gate a batched notification.
pub fn decide_batched(flags: RenderFlags, changes: ChangeSet) -> Option<ChangeSet> {
    flags.should_rerender().then_some(changes)
}

/// Gate a per-key notification.
pub fn decide_per_key(flags: RenderFlags, change: KeyChange) -> Option<KeyChange> {
    flags.should_rerender().then_some(change)
}

// =============================================================================
// Shared State
// =============================================================================

/// State reachable from the channel subscription.
struct Shared<R> {
    component: Rc<Component>,
    mode: UpdateMode,
    flags: Cell<RenderFlags>,
    renderer: RefCell<R>,
    rendered: EventEmitter<bool>,
    last_error: RefCell<Option<RenderError>>,
}

impl<R: Renderer + 'static> Shared<R> {
    fn name(&self) -> &str {
        self.component.name()
    }

    fn renderer_mut(&self) -> RenderResult<RefMut<'_, R>> {
        self.renderer
            .try_borrow_mut()
            .map_err(|_| RenderError::Reentrant {
                component: self.name().to_string(),
            })
    }

    fn handle_state_changed(&self, changes: ChangeSet) -> RenderResult<bool> {
        let Some(changes) = decide_batched(self.flags.get(), changes) else {
            trace!(component = self.name(), flags = ?self.flags.get(), "batched change dropped");
            return Ok(false);
        };

        let mut renderer = self.renderer_mut()?;
        let Some(changes) = renderer.route_batch(changes) else {
            return Ok(false);
        };
        self.run_update(&mut renderer, &changes)
    }

    fn handle_state_key_changed(&self, change: KeyChange) -> RenderResult<bool> {
        let Some(change) = decide_per_key(self.flags.get(), change) else {
            trace!(component = self.name(), flags = ?self.flags.get(), "key change dropped");
            return Ok(false);
        };

        let mut renderer = self.renderer_mut()?;
        let Some(changes) = renderer.route_key_change(change) else {
            return Ok(false);
        };
        self.run_update(&mut renderer, &changes)
    }

    fn run_update(&self, renderer: &mut R, changes: &ChangeSet) -> RenderResult<bool> {
        trace!(
            component = self.name(),
            keys = ?changes.keys().collect::<Vec<_>>(),
            "update"
        );
        renderer.update(&self.component, changes)?;
        Ok(true)
    }

    fn mark_rendered(&self) {
        let flags = self.flags.get();
        let first_render = !flags.contains(RenderFlags::RENDERED);
        self.flags.set(flags | RenderFlags::RENDERED);

        debug!(component = self.name(), first_render, "rendered");
        self.rendered.emit(&first_render);
    }

    /// Record a failure from a notification; there is no caller to return to.
    fn report(&self, result: RenderResult<bool>) {
        if let Err(err) = result {
            error!(component = self.name(), error = %err, "update from notification failed");
            *self.last_error.borrow_mut() = Some(err);
        }
    }
}

// =============================================================================
// RenderCoordinator
// =============================================================================

/// Owns the render lifecycle of one component.
pub struct RenderCoordinator<R = super::BaseRenderer> {
    shared: Rc<Shared<R>>,
    unsubscribe: Option<Unsubscribe>,
}

impl<R: Renderer + 'static> RenderCoordinator<R> {
    /// Attach a renderer to a component.
    ///
    /// Subscribes to the per-key channel for [`UpdateMode::PerKey`]
    /// components and to the batched channel otherwise. Fails if the
    /// component lacks that channel. Nothing is rendered yet.
    pub fn new(component: Rc<Component>, renderer: R) -> RenderResult<Self> {
        let mode = component.update_mode();
        let shared = Rc::new(Shared {
            component: component.clone(),
            mode,
            flags: Cell::new(RenderFlags::empty()),
            renderer: RefCell::new(renderer),
            rendered: EventEmitter::new(),
            last_error: RefCell::new(None),
        });

        let weak: Weak<Shared<R>> = Rc::downgrade(&shared);
        let unsubscribe = match mode {
            UpdateMode::PerKey => component.on_state_key_changed(move |change| {
                if let Some(shared) = weak.upgrade() {
                    let result = shared.handle_state_key_changed(change.clone());
                    shared.report(result);
                }
            })?,
            UpdateMode::Batched => component.on_state_changed(move |changes| {
                if let Some(shared) = weak.upgrade() {
                    let result = shared.handle_state_changed(changes.clone());
                    shared.report(result);
                }
            })?,
        };

        debug!(component = component.name(), ?mode, "coordinator attached");
        Ok(Self {
            shared,
            unsubscribe: Some(unsubscribe),
        })
    }

    pub fn component(&self) -> &Rc<Component> {
        &self.shared.component
    }

    /// The mode picked at construction.
    pub fn update_mode(&self) -> UpdateMode {
        self.shared.mode
    }

    pub fn extra_data_config(&self) -> Option<ExtraDataConfig> {
        self.shared.renderer.borrow().extra_data_config()
    }

    pub fn renderer(&self) -> Ref<'_, R> {
        self.shared.renderer.borrow()
    }

    pub fn renderer_mut(&self) -> RefMut<'_, R> {
        self.shared.renderer.borrow_mut()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Render the component.
    ///
    /// Creates an empty container if the component has no element, runs the
    /// renderer's initial render, then emits "rendered". May be called again;
    /// only the first call reports `is_first_render = true`.
    pub fn render(&self) -> RenderResult<()> {
        let shared = &self.shared;
        {
            let mut renderer = shared.renderer_mut()?;
            if shared.component.ensure_element(&renderer.default_tag()) {
                trace!(component = shared.name(), "created default element");
            }
            renderer.render(&shared.component)?;
        }
        shared.mark_rendered();
        Ok(())
    }

    /// Hand a change-set to the renderer.
    ///
    /// Not gated; notification handlers gate before calling it.
    pub fn update(&self, changes: &ChangeSet) -> RenderResult<()> {
        self.shared
            .renderer_mut()?
            .update(&self.shared.component, changes)
    }

    /// Render this component inside a traversal in progress.
    ///
    /// The child shares the parent's key stack, so its root is keyed by its
    /// position among the parent's children. The emitted subtree becomes the
    /// component's element.
    pub fn render_within(&self, builder: &mut TreeBuilder<'_>) -> RenderResult<()> {
        let shared = &self.shared;
        let before = builder.child_count();
        {
            let mut renderer = shared.renderer_mut()?;
            let component = &shared.component;
            builder.construct(|b| renderer.construct(component, b))?;
        }
        if builder.child_count() > before {
            if let Some(node) = builder.last_node() {
                shared.component.set_element(node.clone());
            }
        }
        shared.mark_rendered();
        Ok(())
    }

    /// Update with changes the renderer held back, if the gate allows.
    pub fn flush_pending(&self) -> RenderResult<bool> {
        let shared = &self.shared;
        if !shared.flags.get().should_rerender() {
            return Ok(false);
        }
        let mut renderer = shared.renderer_mut()?;
        match renderer.take_pending() {
            Some(changes) => shared.run_update(&mut renderer, &changes),
            None => Ok(false),
        }
    }

    // =========================================================================
    // Gate
    // =========================================================================

    pub fn flags(&self) -> RenderFlags {
        self.shared.flags.get()
    }

    pub fn is_rendered(&self) -> bool {
        self.flags().contains(RenderFlags::RENDERED)
    }

    /// Whether a change arriving now would cause a rerender.
    pub fn should_rerender(&self) -> bool {
        self.flags().should_rerender()
    }

    /// Drop every change until `stop_skip_updates`.
    pub fn start_skip_updates(&self) {
        let flags = self.shared.flags.get();
        self.shared.flags.set(flags | RenderFlags::SKIP_UPDATES);
    }

    pub fn stop_skip_updates(&self) {
        let flags = self.shared.flags.get();
        self.shared.flags.set(flags - RenderFlags::SKIP_UPDATES);
    }

    pub fn is_skipping_updates(&self) -> bool {
        self.flags().contains(RenderFlags::SKIP_UPDATES)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Handle a batched notification. Returns true if `update` ran.
    pub fn handle_state_changed(&self, changes: ChangeSet) -> RenderResult<bool> {
        self.shared.handle_state_changed(changes)
    }

    /// Handle a per-key notification. Returns true if `update` ran.
    pub fn handle_state_key_changed(&self, change: KeyChange) -> RenderResult<bool> {
        self.shared.handle_state_key_changed(change)
    }

    /// Subscribe to "rendered"; the payload is `is_first_render`.
    pub fn on_rendered<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&bool) + 'static,
    {
        self.shared.rendered.on(handler)
    }

    /// Take the last failure raised by a notification-driven update.
    pub fn take_error(&self) -> Option<RenderError> {
        self.shared.last_error.borrow_mut().take()
    }
}

impl<R> Drop for RenderCoordinator<R> {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl<R> std::fmt::Debug for RenderCoordinator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCoordinator")
            .field("component", &self.shared.component.name())
            .field("mode", &self.shared.mode)
            .field("flags", &self.shared.flags.get())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
