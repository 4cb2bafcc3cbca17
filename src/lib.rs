//! # spark-jsx
//!
//! Render coordination and positional keys for declarative component trees.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! reactive state and configuration.
//!
//! ## Architecture
//!
//! A component's data manager emits change notifications on one of two
//! channels. A [`RenderCoordinator`] subscribes to the channel matching the
//! component's [`UpdateMode`], gates notifications on the render lifecycle,
//! and hands the survivors to a [`Renderer`]:
//!
//! ```text
//! StateStore → Component channel → RenderCoordinator → Renderer::update
//!                                                        → TreeBuilder → Patcher
//! ```
//!
//! [`JsxRenderer`] reconstructs the tree on every accepted update. Each
//! element opened without an explicit key gets one from its position among
//! its siblings (`_metal_jsx_1`, `_metal_jsx_2`, ...), so a patcher can keep
//! node identity across rerenders even when conditional children disappear.
//!
//! ## Modules
//!
//! - [`types`] - Values, change-sets and update modes
//! - [`component`] - Components, their channels and a reference state store
//! - [`tree`] - Nodes, the key stack and the traversal builder
//! - [`renderer`] - Coordinator, renderer hooks, JSX renderer and tree differ
//! - [`events`] - Handler registry used for every channel
//! - [`config`] - Process-wide render configuration
//! - [`error`] - Error type

pub mod component;
pub mod config;
pub mod error;
pub mod events;
pub mod renderer;
pub mod tree;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use component::{
    Component, ComponentBuilder, StateStore, TreeSource, STATE_CHANGED, STATE_KEY_CHANGED,
};

pub use config::{
    render_config, reset_render_config, set_render_config, RenderConfig, DEFAULT_TAG,
    KEY_PREFIX,
};

pub use error::{RenderError, RenderResult};

pub use events::{EventEmitter, Unsubscribe};

pub use renderer::{
    BaseRenderer, JsxRenderer, Patch, PatchReport, Patcher, RenderCoordinator, RenderFlags,
    Renderer, TreeDiff,
};

pub use tree::{Element, KeyStack, Node, Renderable, TreeBuilder};
