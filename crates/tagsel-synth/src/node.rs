//! The decision-diagram node model.
//!
//! A diagram is a tree of [`Node`]s shared through `Rc`: after merging, one
//! node may be reachable from several edges at once. Nodes are immutable
//! once published -- every transformation builds new nodes and repoints
//! edges, so a node that is an operand of several pending merges is never
//! observed mid-rewrite. Each node carries a creation sequence number drawn
//! from a per-diagram counter; edge rewiring keeps the old number, fresh
//! nodes draw a new one. The sequence number is used only for deterministic
//! ordering and identity during a pass, never for correctness.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tagsel_types::{HtId, LlRule, PtId};

pub type NodeRef = Rc<Node>;

/// Combined primary tags of both operands, ordered by definition order.
pub type TagPair = (PtId, PtId);

#[derive(Debug)]
pub struct Node {
    pub seq: u32,
    pub kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
    /// Terminal: one resolved rule.
    Leaf(LlRule),
    /// Keyed by the combined primary tags of both operands.
    TagPair { edges: BTreeMap<TagPair, NodeRef> },
    /// Keyed by one operand's primary tag.
    Pt { op: usize, edges: BTreeMap<PtId, NodeRef> },
    /// Keyed by one operand's header tag. When the operand's primary tag
    /// never needs disambiguation, `edges` is empty and the single `escape`
    /// child is reached without consuming a header tag.
    Ht { op: usize, edges: BTreeMap<HtId, NodeRef>, escape: Option<NodeRef> },
}

/// Per-diagram node factory owning the creation counter.
#[derive(Debug, Default)]
pub struct NodeCtx {
    next: Cell<u32>,
}

impl NodeCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a newly created node.
    pub fn fresh(&self, kind: NodeKind) -> NodeRef {
        let seq = self.next.get();
        self.next.set(seq + 1);
        Rc::new(Node { seq, kind })
    }

    /// Publish a rewired copy of an existing node, keeping its identity
    /// (sequence number) for ordering purposes.
    pub fn rewire(&self, seq: u32, kind: NodeKind) -> NodeRef {
        Rc::new(Node { seq, kind })
    }
}

/// The distinct children behind an edge map, in creation order.
pub fn distinct_edge_children<K: Ord>(edges: &BTreeMap<K, NodeRef>) -> Vec<NodeRef> {
    let mut by_seq: BTreeMap<u32, NodeRef> = BTreeMap::new();
    for child in edges.values() {
        by_seq.entry(child.seq).or_insert_with(|| child.clone());
    }
    by_seq.into_values().collect()
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Distinct children in creation order. An escape-style header node has
    /// exactly its escape child.
    pub fn distinct_children(&self) -> Vec<NodeRef> {
        match &self.kind {
            NodeKind::Leaf(_) => Vec::new(),
            NodeKind::TagPair { edges } => distinct_edge_children(edges),
            NodeKind::Pt { edges, .. } => distinct_edge_children(edges),
            NodeKind::Ht { edges, escape, .. } => match escape {
                Some(child) => vec![child.clone()],
                None => distinct_edge_children(edges),
            },
        }
    }

    /// Height of the subtree; a leaf counts 1.
    pub fn height(&self) -> usize {
        1 + self
            .distinct_children()
            .iter()
            .map(|c| c.height())
            .max()
            .unwrap_or(0)
    }

    /// Visit every leaf rule in the subtree. Shared leaves may be visited
    /// more than once.
    pub fn for_each_leaf<'a>(&'a self, f: &mut impl FnMut(&'a LlRule)) {
        match &self.kind {
            NodeKind::Leaf(rule) => f(rule),
            NodeKind::TagPair { edges } => {
                for child in edges.values() {
                    child.for_each_leaf(f);
                }
            }
            NodeKind::Pt { edges, .. } => {
                for child in edges.values() {
                    child.for_each_leaf(f);
                }
            }
            NodeKind::Ht { edges, escape, .. } => {
                if let Some(child) = escape {
                    child.for_each_leaf(f);
                }
                for child in edges.values() {
                    child.for_each_leaf(f);
                }
            }
        }
    }

    /// The action shared by every leaf of the subtree, if there is exactly
    /// one. Compares action text: two rules with equal text count as one
    /// action here, unlike the provenance identity used for compatibility.
    pub fn single_action(&self) -> Option<&str> {
        let mut action: Option<&str> = None;
        let mut uniform = true;
        self.for_each_leaf(&mut |rule| match action {
            None => action = Some(&rule.hl.action),
            Some(a) => {
                if a != rule.hl.action {
                    uniform = false;
                }
            }
        });
        if uniform {
            action
        } else {
            None
        }
    }
}

/// Rebuild a node with `f` applied once to each distinct child, keeping the
/// node's sequence number. Edges that shared a child keep sharing the
/// mapped child.
pub fn rewire_children(
    ctx: &NodeCtx,
    node: &NodeRef,
    mut f: impl FnMut(&NodeRef) -> NodeRef,
) -> NodeRef {
    let mut memo: BTreeMap<u32, NodeRef> = BTreeMap::new();
    let mut map = |child: &NodeRef, memo: &mut BTreeMap<u32, NodeRef>| {
        memo.entry(child.seq).or_insert_with(|| f(child)).clone()
    };
    match &node.kind {
        NodeKind::Leaf(_) => node.clone(),
        NodeKind::TagPair { edges } => {
            let edges = edges.iter().map(|(k, c)| (*k, map(c, &mut memo))).collect();
            ctx.rewire(node.seq, NodeKind::TagPair { edges })
        }
        NodeKind::Pt { op, edges } => {
            let edges = edges.iter().map(|(k, c)| (*k, map(c, &mut memo))).collect();
            ctx.rewire(node.seq, NodeKind::Pt { op: *op, edges })
        }
        NodeKind::Ht { op, edges, escape } => {
            let edges = edges.iter().map(|(k, c)| (*k, map(c, &mut memo))).collect();
            let escape = escape.as_ref().map(|c| map(c, &mut memo));
            ctx.rewire(node.seq, NodeKind::Ht { op: *op, edges, escape })
        }
    }
}

/// Repoint edges whose child appears in `replace` (keyed by sequence
/// number) at the replacement, keeping everything else.
pub fn rewire_edges(ctx: &NodeCtx, node: &NodeRef, replace: &BTreeMap<u32, NodeRef>) -> NodeRef {
    rewire_children(ctx, node, |child| {
        replace.get(&child.seq).cloned().unwrap_or_else(|| child.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tagsel_types::HlRule;

    fn leaf(ctx: &NodeCtx, id: usize, action: &str) -> NodeRef {
        ctx.fresh(NodeKind::Leaf(LlRule {
            rts: Vec::new(),
            hl: Rc::new(HlRule { id, when: Vec::new(), action: action.into() }),
        }))
    }

    #[test]
    fn sequence_numbers_are_monotonic() {
        let ctx = NodeCtx::new();
        let a = leaf(&ctx, 0, "A");
        let b = leaf(&ctx, 1, "B");
        assert!(a.seq < b.seq);
    }

    #[test]
    fn distinct_children_dedup_shared_nodes() {
        let ctx = NodeCtx::new();
        let shared = leaf(&ctx, 0, "A");
        let other = leaf(&ctx, 1, "B");
        let mut edges = BTreeMap::new();
        edges.insert(PtId(0), shared.clone());
        edges.insert(PtId(1), shared.clone());
        edges.insert(PtId(2), other);
        let node = ctx.fresh(NodeKind::Pt { op: 0, edges });
        assert_eq!(node.distinct_children().len(), 2);
        assert_eq!(node.height(), 2);
    }

    #[test]
    fn single_action_compares_text() {
        let ctx = NodeCtx::new();
        let mut edges = BTreeMap::new();
        // Different provenance, same text: still a single action.
        edges.insert(PtId(0), leaf(&ctx, 0, "X"));
        edges.insert(PtId(1), leaf(&ctx, 1, "X"));
        let node = ctx.fresh(NodeKind::Pt { op: 0, edges });
        assert_eq!(node.single_action(), Some("X"));

        let mut edges = BTreeMap::new();
        edges.insert(PtId(0), leaf(&ctx, 0, "X"));
        edges.insert(PtId(1), leaf(&ctx, 1, "Y"));
        let node = ctx.fresh(NodeKind::Pt { op: 0, edges });
        assert_eq!(node.single_action(), None);
    }

    #[test]
    fn rewire_preserves_seq_and_sharing() {
        let ctx = NodeCtx::new();
        let shared = leaf(&ctx, 0, "A");
        let mut edges = BTreeMap::new();
        edges.insert(PtId(0), shared.clone());
        edges.insert(PtId(1), shared);
        let node = ctx.fresh(NodeKind::Pt { op: 0, edges });
        let replacement = leaf(&ctx, 2, "C");
        let mut calls = 0;
        let rewired = rewire_children(&ctx, &node, |_| {
            calls += 1;
            replacement.clone()
        });
        assert_eq!(calls, 1);
        assert_eq!(rewired.seq, node.seq);
        assert_eq!(rewired.distinct_children().len(), 1);
    }
}
