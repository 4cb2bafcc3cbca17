//! Renderers - the update lifecycle and its overridable hooks.
//!
//! # Architecture
//!
//! ```text
//! StateStore ─▶ Component channel ─▶ RenderCoordinator ─▶ Renderer::update
//!                                     (gate + routing)     │
//!                                                          ▼
//!                                   TreeBuilder (keys) ─▶ Patcher
//! ```
//!
//! - [`RenderCoordinator`] owns the lifecycle: initial render, the
//!   should-rerender gate, skip windows, and the single channel
//!   subscription chosen from the component's update mode.
//! - [`Renderer`] is the set of hooks a concrete renderer overrides. The
//!   defaults describe a renderer that only owns the element.
//! - [`JsxRenderer`] splits state and prop changes, constructs the tree
//!   with positional keys, and hands it to a [`Patcher`].

mod coordinator;
mod diff;
mod jsx;

pub use coordinator::{decide_batched, decide_per_key, RenderCoordinator, RenderFlags};
pub use diff::{NodePath, Patch, PatchReport, Patcher, TreeDiff};
pub use jsx::JsxRenderer;

use crate::component::Component;
use crate::config::render_config;
use crate::error::RenderResult;
use crate::tree::TreeBuilder;
use crate::types::{ChangeSet, ExtraDataConfig, KeyChange};

// =============================================================================
// Renderer Hooks
// =============================================================================

/// Hooks called by [`RenderCoordinator`].
///
/// Every method has a default, so a renderer overrides only what it needs.
pub trait Renderer {
    /// Initial render, after the component's element exists.
    fn render(&mut self, component: &Component) -> RenderResult<()> {
        let _ = component;
        Ok(())
    }

    /// Apply a change-set. Only called once the component has rendered and
    /// updates are not skipped.
    fn update(&mut self, component: &Component, changes: &ChangeSet) -> RenderResult<()> {
        let _ = (component, changes);
        Ok(())
    }

    /// Tag of the empty container created before the first render.
    fn default_tag(&self) -> String {
        render_config().default_tag
    }

    /// Extra derived-state fields the data manager should track.
    fn extra_data_config(&self) -> Option<ExtraDataConfig> {
        None
    }

    /// Turn a batched notification into the change-set for `update`.
    ///
    /// `None` holds the notification back.
    fn route_batch(&mut self, changes: ChangeSet) -> Option<ChangeSet> {
        Some(changes)
    }

    /// Turn a per-key notification into the change-set for `update`.
    fn route_key_change(&mut self, change: KeyChange) -> Option<ChangeSet> {
        Some(ChangeSet::singleton(change))
    }

    /// Changes held back by routing, released by `flush_pending`.
    fn take_pending(&mut self) -> Option<ChangeSet> {
        None
    }

    /// Emit this component's subtree into a traversal in progress.
    fn construct(
        &mut self,
        component: &Component,
        builder: &mut TreeBuilder<'_>,
    ) -> RenderResult<()> {
        let _ = component;
        let tag = builder.config().default_tag.clone();
        builder.leaf(&tag, None)
    }
}

/// Renderer with every hook left at its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseRenderer;

impl Renderer for BaseRenderer {}
