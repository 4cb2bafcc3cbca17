//! Keyed tree differ - the reference patch engine.
//!
//! [`TreeDiff`] compares the previous tree of a component with the newly
//! constructed one and lists the operations needed to turn one into the
//! other. Nodes are matched by key; unkeyed nodes are matched in order
//! among the unkeyed siblings. A matched node is kept (its identity
//! survives the rerender) and only its attributes, text and children are
//! patched.
//!
//! # Algorithm
//!
//! 1. Roots: same kind, tag and key -> keep and recurse; else replace
//! 2. For each child of the new tree:
//!    - keyed: look up the previous sibling with the same key
//!    - unkeyed: take the next unused unkeyed previous sibling
//!    - found and placed before the last kept sibling: emit a move
//!    - not found: create
//! 3. Previous siblings left unused: remove

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::tree::Node;
use crate::types::Value;

/// Child-index path from the root of the new tree.
pub type NodePath = Vec<usize>;

/// One operation against the render target.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Create { path: NodePath, key: Option<String> },
    Remove { path: NodePath, key: Option<String> },
    Replace { path: NodePath },
    Move { path: NodePath, key: Option<String>, from: usize },
    SetAttr { path: NodePath, name: String, value: Value },
    RemoveAttr { path: NodePath, name: String },
    SetText { path: NodePath, text: String },
}

/// Result of one patch pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatchReport {
    pub patches: Vec<Patch>,
    /// Nodes created (including whole new subtrees).
    pub created: usize,
    /// Nodes removed (including whole old subtrees).
    pub removed: usize,
    /// Nodes whose identity survived.
    pub kept: usize,
}

impl PatchReport {
    /// True if the target needs no mutation.
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

/// Applies a newly constructed tree to the render target.
pub trait Patcher {
    fn patch(&mut self, previous: Option<&Node>, next: &Node) -> PatchReport;
}

// =============================================================================
// TreeDiff
// =============================================================================

/// Keyed differ keeping running totals across passes.
#[derive(Debug, Default)]
pub struct TreeDiff {
    passes: usize,
    patches: usize,
}

impl TreeDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of patch passes run.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Total operations emitted across all passes.
    pub fn total_patches(&self) -> usize {
        self.patches
    }
}

impl Patcher for TreeDiff {
    fn patch(&mut self, previous: Option<&Node>, next: &Node) -> PatchReport {
        let mut report = PatchReport::default();
        match previous {
            Some(prev) => diff_node(prev, next, &mut Vec::new(), &mut report),
            None => {
                report.created += count_nodes(next);
                report.patches.push(Patch::Create {
                    path: Vec::new(),
                    key: next.key().map(str::to_string),
                });
            }
        }
        self.passes += 1;
        self.patches += report.patches.len();
        report
    }
}

/// Same node kind, tag and key.
fn same_identity(a: &Node, b: &Node) -> bool {
    match (a, b) {
        (Node::Text(_), Node::Text(_)) => true,
        (Node::Element(a), Node::Element(b)) => a.tag == b.tag && a.key == b.key,
        _ => false,
    }
}

fn count_nodes(node: &Node) -> usize {
    1 + node.children().iter().map(count_nodes).sum::<usize>()
}

fn diff_node(prev: &Node, next: &Node, path: &mut NodePath, report: &mut PatchReport) {
    if !same_identity(prev, next) {
        report.removed += count_nodes(prev);
        report.created += count_nodes(next);
        report.patches.push(Patch::Replace { path: path.clone() });
        return;
    }
    report.kept += 1;

    match (prev, next) {
        (Node::Text(old), Node::Text(new)) => {
            if old != new {
                report.patches.push(Patch::SetText {
                    path: path.clone(),
                    text: new.clone(),
                });
            }
        }
        (Node::Element(old), Node::Element(new)) => {
            for (name, value) in &new.attrs {
                if old.attrs.get(name) != Some(value) {
                    report.patches.push(Patch::SetAttr {
                        path: path.clone(),
                        name: name.clone(),
                        value: value.clone(),
                    });
                }
            }
            for name in old.attrs.keys() {
                if !new.attrs.contains_key(name) {
                    report.patches.push(Patch::RemoveAttr {
                        path: path.clone(),
                        name: name.clone(),
                    });
                }
            }
            diff_children(&old.children, &new.children, path, report);
        }
        _ => {}
    }
}

fn diff_children(prev: &[Node], next: &[Node], path: &mut NodePath, report: &mut PatchReport) {
    let mut keyed: HashMap<&str, usize> = HashMap::new();
    let mut unkeyed: VecDeque<usize> = VecDeque::new();
    for (index, child) in prev.iter().enumerate() {
        match child.key() {
            Some(key) => {
                keyed.insert(key, index);
            }
            None => unkeyed.push_back(index),
        }
    }

    let mut used = vec![false; prev.len()];
    let mut last_placed = 0;

    for (index, child) in next.iter().enumerate() {
        path.push(index);

        let matched = match child.key() {
            Some(key) => keyed.remove(key),
            None => unkeyed.pop_front(),
        };

        match matched {
            Some(from) => {
                used[from] = true;
                if from < last_placed {
                    report.patches.push(Patch::Move {
                        path: path.clone(),
                        key: child.key().map(str::to_string),
                        from,
                    });
                } else {
                    last_placed = from;
                }
                diff_node(&prev[from], child, path, report);
            }
            None => {
                report.created += count_nodes(child);
                report.patches.push(Patch::Create {
                    path: path.clone(),
                    key: child.key().map(str::to_string),
                });
            }
        }

        path.pop();
    }

    for (index, old) in prev.iter().enumerate() {
        if !used[index] {
            report.removed += count_nodes(old);
            let mut removed_path = path.clone();
            removed_path.push(index);
            report.patches.push(Patch::Remove {
                path: removed_path,
                key: old.key().map(str::to_string),
            });
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
