//! Tree construction - nodes, positional keys, and the traversal context.
//!
//! - [`Node`] / [`Renderable`] - what construction produces
//! - [`KeyStack`] - sibling counters and the key generation algorithm
//! - [`TreeBuilder`] - the context threaded through one construction pass
//!
//! The counter stack lives in the builder rather than in process-wide
//! state, so nested components rendered during their parent's pass share
//! it, and independent passes never see each other's counters.

mod builder;
mod keys;
mod node;

pub use builder::TreeBuilder;
pub use keys::KeyStack;
pub use node::{Element, Node, Renderable};
