//! Positional key generation.
//!
//! JSX views render children conditionally, so the same element can sit at
//! different child indexes across renders, and siblings often have no
//! explicit key. [`KeyStack`] gives each unkeyed element a key derived
//! from its sibling position so the patcher matches nodes correctly.
//!
//! # Algorithm
//!
//! The stack holds one sibling counter per open element. On every element
//! open:
//!
//! 1. If a counter is on top, increment it and read `count`; else `count = 0`.
//! 2. An explicit key is returned unchanged, even if empty.
//! 3. Otherwise, if `count > 0`, the key is `{prefix}{count}`.
//! 4. Otherwise (first element of the traversal) reuse the key found at the
//!    current pointer of the previous tree, if any.
//! 5. Push a zero counter for the element's own children.
//!
//! Every close pops one counter. A slot that renders nothing calls
//! [`KeyStack::skip_child`] so later siblings keep their positions.
//!
//! ```text
//! <ul>             count 0 -> pointer key, push [0]
//!   <li/>          [1]     -> "_metal_jsx_1"
//!   {cond && ..}   [2]     skipped
//!   <li/>          [3]     -> "_metal_jsx_3"
//! </ul>
//! ```

/// Stack of per-parent sibling counters for one traversal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyStack {
    counters: Vec<usize>,
}

impl KeyStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Counter of the innermost open frame.
    pub fn top(&self) -> Option<usize> {
        self.counters.last().copied()
    }

    /// Assign the key for the element being opened and push its frame.
    ///
    /// `pointer_key` is only consulted for the first element of a traversal
    /// (no parent frame) that has no explicit key.
    pub fn generate_key(
        &mut self,
        explicit_key: Option<&str>,
        pointer_key: impl FnOnce() -> Option<String>,
        prefix: &str,
    ) -> Option<String> {
        let mut count = 0;
        if let Some(top) = self.counters.last_mut() {
            *top += 1;
            count = *top;
        }

        let key = match explicit_key {
            Some(key) => Some(key.to_string()),
            None if count > 0 => Some(format!("{prefix}{count}")),
            None => pointer_key(),
        };

        self.counters.push(0);
        key
    }

    /// Pop the frame of the element being closed.
    ///
    /// Returns false if no frame was open.
    pub fn close(&mut self) -> bool {
        self.counters.pop().is_some()
    }

    /// Advance the current parent's counter for a slot that rendered nothing.
    pub fn skip_child(&mut self) {
        if let Some(top) = self.counters.last_mut() {
            *top += 1;
        }
    }

    /// Drop frames above `depth`, restoring an earlier stack state.
    pub fn truncate(&mut self, depth: usize) {
        self.counters.truncate(depth);
    }

    /// Overwrite the innermost counter.
    pub(crate) fn set_top(&mut self, value: usize) {
        if let Some(top) = self.counters.last_mut() {
            *top = value;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
