//! Remove dispatch nodes that no longer represent a real choice.
//!
//! After merging, a branch may find all of its tags pointing at one
//! distinct child; its test decides nothing and the child takes its place.
//! The replacement may itself be simplifiable, so the walk continues
//! through it.

use crate::node::{rewire_children, NodeCtx, NodeRef};

pub fn skip_no_choice(ctx: &NodeCtx, node: &NodeRef) -> NodeRef {
    if node.is_leaf() {
        return node.clone();
    }
    let children = node.distinct_children();
    if children.len() == 1 {
        return skip_no_choice(ctx, &children[0]);
    }
    rewire_children(ctx, node, |child| skip_no_choice(ctx, child))
}
