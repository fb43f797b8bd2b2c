//! The cross-branch merge pass.
//!
//! Local merging only sees siblings. This pass walks each tree depth from
//! the deepest level up to the root's children, gathers every node at that
//! depth regardless of parent, coalesces across the whole collection with
//! the same greedy policy as the local pass, and repoints the edges of the
//! parents one level up at the merged results. Handling deeper levels
//! first means two parents whose subtrees were merged now share literally
//! the same child, which is exactly what makes them comparable (and their
//! case labels groupable) on the next iteration.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::merge::greedy_coalesce;
use crate::node::{rewire_children, rewire_edges, NodeCtx, NodeRef};

pub fn merge_relative(ctx: &NodeCtx, cfg: &Config, root: &NodeRef) -> NodeRef {
    let mut root = root.clone();
    let height = root.height();
    for level in (1..height).rev() {
        let nodes = gather_level(&root, level);
        if nodes.len() < 2 {
            continue;
        }
        let replace = greedy_coalesce(ctx, cfg, &nodes);
        if !replace.is_empty() {
            root = rewrite_level(ctx, &root, level, &replace);
        }
    }
    root
}

/// Every node sitting `level` edges below the root, deduplicated, in
/// creation order. Leaves that terminate above the requested level are
/// simply not part of it.
fn gather_level(root: &NodeRef, level: usize) -> Vec<NodeRef> {
    let mut found: BTreeMap<u32, NodeRef> = BTreeMap::new();
    gather_into(root, level, &mut found);
    found.into_values().collect()
}

fn gather_into(node: &NodeRef, remaining: usize, found: &mut BTreeMap<u32, NodeRef>) {
    if remaining == 0 {
        found.entry(node.seq).or_insert_with(|| node.clone());
        return;
    }
    for child in node.distinct_children() {
        gather_into(&child, remaining - 1, found);
    }
}

/// Repoint the edges of every node `level - 1` edges below the root
/// according to `replace` (including header-tag escape edges).
fn rewrite_level(
    ctx: &NodeCtx,
    node: &NodeRef,
    level: usize,
    replace: &BTreeMap<u32, NodeRef>,
) -> NodeRef {
    if node.is_leaf() {
        return node.clone();
    }
    if level == 1 {
        rewire_edges(ctx, node, replace)
    } else {
        rewire_children(ctx, node, |child| rewrite_level(ctx, child, level - 1, replace))
    }
}
