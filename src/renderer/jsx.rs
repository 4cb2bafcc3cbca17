//! JsxRenderer - positional keys and change accumulation.
//!
//! Splits incoming changes into state and prop accumulators, asks the
//! component whether they warrant a rerender, then constructs a fresh tree
//! through a [`TreeBuilder`] and hands it to a [`Patcher`].
//!
//! A prop change arriving on the per-key channel does not rerender on its
//! own: it is recorded and picked up by the next cycle (or by
//! `RenderCoordinator::flush_pending`). `update` with nothing pending keeps
//! the current tree.

use tracing::{debug, trace};

use super::{PatchReport, Patcher, Renderer, TreeDiff};
use crate::component::{Component, TreeSource};
use crate::config::{render_config, RenderConfig};
use crate::error::RenderResult;
use crate::tree::{Node, TreeBuilder};
use crate::types::{ChangeOrigin, ChangeSet, ExtraDataConfig, KeyChange, Value};

/// Renderer that keys unkeyed siblings by position.
pub struct JsxRenderer {
    config: RenderConfig,
    state_changes: ChangeSet,
    prop_changes: ChangeSet,
    patcher: Box<dyn Patcher>,
    last_report: Option<PatchReport>,
    constructions: usize,
}

impl JsxRenderer {
    /// Renderer using the process default configuration and [`TreeDiff`].
    pub fn new() -> Self {
        Self::with_config(render_config())
    }

    pub fn with_config(config: RenderConfig) -> Self {
        Self {
            config,
            state_changes: ChangeSet::new(),
            prop_changes: ChangeSet::new(),
            patcher: Box::new(TreeDiff::new()),
            last_report: None,
            constructions: 0,
        }
    }

    /// Replace the patcher that receives each constructed tree.
    pub fn with_patcher(mut self, patcher: impl Patcher + 'static) -> Self {
        self.patcher = Box::new(patcher);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    // =========================================================================
    // Accumulators
    // =========================================================================

    pub fn clear_changes_for_next_cycle(&mut self) {
        self.state_changes.clear();
        self.prop_changes.clear();
    }

    /// Record one per-key change.
    ///
    /// State changes pass on to the gate as a singleton; prop changes are
    /// held until the next cycle.
    pub fn route_state_key_changed(&mut self, change: KeyChange) -> Option<ChangeSet> {
        match change.origin {
            ChangeOrigin::State => {
                self.state_changes.record(change.clone());
                Some(ChangeSet::singleton(change))
            }
            ChangeOrigin::Prop => {
                let (key, entry) = change.into_entry();
                trace!(key = %key, "prop change deferred");
                self.prop_changes.insert(key, entry);
                None
            }
        }
    }

    /// Fold a change-set into the accumulator matching each entry's origin.
    ///
    /// Recording an entry that is already held leaves it unchanged.
    pub fn record_changes(&mut self, changes: &ChangeSet) {
        for (key, change) in changes.iter() {
            let target = match change.origin {
                ChangeOrigin::State => &mut self.state_changes,
                ChangeOrigin::Prop => &mut self.prop_changes,
            };
            target.record(KeyChange {
                key: key.to_string(),
                prev_val: change.prev_val.clone(),
                new_val: change.new_val.clone(),
                origin: change.origin,
            });
        }
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.state_changes.is_empty() || !self.prop_changes.is_empty()
    }

    /// The `(state, prop)` pair handed to the should-update predicate.
    pub fn build_should_update_arguments(&self) -> (&ChangeSet, &ChangeSet) {
        (&self.state_changes, &self.prop_changes)
    }

    pub fn state_changes(&self) -> &ChangeSet {
        &self.state_changes
    }

    pub fn prop_changes(&self) -> &ChangeSet {
        &self.prop_changes
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Emit the component's tree into `builder`.
    pub fn construct_tree(
        component: &Component,
        builder: &mut TreeBuilder<'_>,
    ) -> RenderResult<()> {
        match component.tree_source() {
            TreeSource::Declarative(render) => builder.construct(|b| render(b)),
            TreeSource::Direct(render) => {
                let value = render()?;
                builder.construct(|b| b.render_arbitrary(&value))
            }
        }
    }

    /// Build a new tree against the current element and patch it in.
    fn reconstruct(&mut self, component: &Component) -> RenderResult<()> {
        self.clear_changes_for_next_cycle();

        let previous = component.element();
        let mut builder = TreeBuilder::with_config(previous.as_ref(), self.config.clone());
        Self::construct_tree(component, &mut builder)?;

        let default_tag = self.config.default_tag.clone();
        let mut roots = builder.into_roots()?;
        let next = match roots.len() {
            0 => Node::element(default_tag),
            1 => roots.remove(0),
            _ => roots
                .into_iter()
                .fold(Node::element(default_tag), Node::with_child),
        };

        let report = self.patcher.patch(previous.as_ref(), &next);
        self.constructions += 1;
        debug!(
            component = component.name(),
            created = report.created,
            removed = report.removed,
            kept = report.kept,
            patches = report.patches.len(),
            "tree patched"
        );
        if self.config.trace_patches {
            for patch in &report.patches {
                trace!(component = component.name(), ?patch, "patch");
            }
        }

        component.set_element(next);
        self.last_report = Some(report);
        Ok(())
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Report of the most recent patch pass.
    pub fn last_report(&self) -> Option<&PatchReport> {
        self.last_report.as_ref()
    }

    /// Number of trees constructed and patched.
    pub fn construction_count(&self) -> usize {
        self.constructions
    }
}

impl Default for JsxRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for JsxRenderer {
    fn render(&mut self, component: &Component) -> RenderResult<()> {
        self.reconstruct(component)
    }

    fn update(&mut self, component: &Component, changes: &ChangeSet) -> RenderResult<()> {
        self.record_changes(changes);
        if !self.has_pending_changes() {
            trace!(component = component.name(), "update without changes");
            return Ok(());
        }

        let (state, props) = self.build_should_update_arguments();
        let allowed = component.should_update(state, props);
        trace!(
            component = component.name(),
            keys = ?changes.keys().collect::<Vec<_>>(),
            allowed,
            "should update"
        );
        self.clear_changes_for_next_cycle();
        if allowed {
            self.reconstruct(component)?;
        }
        Ok(())
    }

    fn default_tag(&self) -> String {
        self.config.default_tag.clone()
    }

    fn extra_data_config(&self) -> Option<ExtraDataConfig> {
        Some(ExtraDataConfig::new().field("children", Value::List(Vec::new())))
    }

    fn route_batch(&mut self, changes: ChangeSet) -> Option<ChangeSet> {
        self.record_changes(&changes);
        self.has_pending_changes().then_some(changes)
    }

    fn route_key_change(&mut self, change: KeyChange) -> Option<ChangeSet> {
        self.route_state_key_changed(change)
    }

    fn take_pending(&mut self) -> Option<ChangeSet> {
        if !self.has_pending_changes() {
            return None;
        }
        let mut merged = self.prop_changes.clone();
        merged.extend(self.state_changes.clone());
        Some(merged)
    }

    fn construct(
        &mut self,
        component: &Component,
        builder: &mut TreeBuilder<'_>,
    ) -> RenderResult<()> {
        self.clear_changes_for_next_cycle();
        Self::construct_tree(component, builder)?;
        self.constructions += 1;
        Ok(())
    }
}

impl std::fmt::Debug for JsxRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsxRenderer")
            .field("state_changes", &self.state_changes.len())
            .field("prop_changes", &self.prop_changes.len())
            .field("constructions", &self.constructions)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
