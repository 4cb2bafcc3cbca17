//! Render pipeline errors.

use thiserror::Error;

/// Errors raised while coordinating or constructing a render.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The component was built without the channel its update mode needs.
    #[error("component `{component}` has no `{channel}` emitter")]
    MissingEmitter {
        component: String,
        channel: &'static str,
    },

    /// The component's tree construction failed.
    #[error("tree construction failed in `{component}`: {message}")]
    Traversal { component: String, message: String },

    /// An element was closed with a different tag than the one open.
    #[error("mismatched close: expected `</{expected}>`, found `</{found}>`")]
    MismatchedClose { expected: String, found: String },

    /// A close was issued with no element open.
    #[error("unexpected close `</{tag}>` with no open element")]
    UnexpectedClose { tag: String },

    /// Construction returned with elements still open.
    #[error("{depth} element(s) left open after construction")]
    UnclosedElements { depth: usize },

    /// Construction produced no root node.
    #[error("tree construction produced no root node")]
    EmptyTree,

    /// A notification arrived for a component that is already updating.
    #[error("component `{component}` received a change while updating")]
    Reentrant { component: String },
}

impl RenderError {
    /// Convenience constructor for construction failures.
    pub fn traversal(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Traversal {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
