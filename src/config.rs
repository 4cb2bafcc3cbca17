//! Render configuration.
//!
//! Process defaults live in a thread-local signal so hosts can change them
//! before mounting and effects can track them. Renderers snapshot the
//! current defaults when they are created; `JsxRenderer::with_config`
//! overrides them per renderer.

use spark_signals::signal;
use std::cell::RefCell;

/// Prefix of every synthesized positional key.
pub const KEY_PREFIX: &str = "_metal_jsx_";

/// Tag of the container created for a component that has no element yet.
pub const DEFAULT_TAG: &str = "div";

// =============================================================================
// RenderConfig
// =============================================================================

/// Settings shared by the coordinator and the JSX renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Prefix for synthesized keys (`{prefix}{count}`).
    pub key_prefix: String,
    /// Tag of the default empty container.
    pub default_tag: String,
    /// Log every patch operation at `trace` level.
    pub trace_patches: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            key_prefix: KEY_PREFIX.to_string(),
            default_tag: DEFAULT_TAG.to_string(),
            trace_patches: false,
        }
    }
}

impl RenderConfig {
    /// Synthesized key for a sibling position.
    pub fn positional_key(&self, count: usize) -> String {
        format!("{}{}", self.key_prefix, count)
    }
}

// =============================================================================
// Process Defaults
// =============================================================================

thread_local! {
    static RENDER_CONFIG: RefCell<spark_signals::Signal<RenderConfig>> =
        RefCell::new(signal(RenderConfig::default()));
}

/// Get the current default configuration.
pub fn render_config() -> RenderConfig {
    RENDER_CONFIG.with(|c| c.borrow().get())
}

/// Replace the default configuration.
pub fn set_render_config(config: RenderConfig) {
    RENDER_CONFIG.with(|c| c.borrow().set(config));
}

/// Get the configuration signal for reactive tracking.
pub fn render_config_signal() -> spark_signals::Signal<RenderConfig> {
    RENDER_CONFIG.with(|c| c.borrow().clone())
}

/// Restore the built-in defaults (for testing).
pub fn reset_render_config() {
    set_render_config(RenderConfig::default());
}

// =============================================================================
// Tests
// =============================================================================
