//! The compatibility relation: whether two nodes are interchangeable.
//!
//! Two subtrees are compatible when substituting one for the other cannot
//! change which action any operand tuple reaches. Leaves compare by rule
//! provenance, not action text -- two rules that happen to share text are
//! still distinct choices. Branches must be the same kind over the same
//! operand; then, over the union of their tags, only tags present on both
//! sides constrain: a tag present on one side alone is never observed for
//! the operand combinations routed through the other subtree, so it is
//! free. Kind or operand mismatches make nodes incompatible rather than
//! faulting: the cross-branch pass compares whatever shares a depth, and
//! on a non-uniform tree that includes nodes that do not line up.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::node::{distinct_edge_children, NodeKind, NodeRef};

/// Whether `a` and `b` are interchangeable under the given options.
pub fn compatible(cfg: &Config, a: &NodeRef, b: &NodeRef) -> bool {
    match (&a.kind, &b.kind) {
        (NodeKind::Leaf(ra), NodeKind::Leaf(rb)) => ra.hl.id == rb.hl.id,
        (NodeKind::TagPair { edges: ea }, NodeKind::TagPair { edges: eb }) => {
            keyed_compatible(cfg, ea, eb)
        }
        (NodeKind::Pt { op: oa, edges: ea }, NodeKind::Pt { op: ob, edges: eb }) => {
            oa == ob && keyed_compatible(cfg, ea, eb)
        }
        (
            NodeKind::Ht { op: oa, edges: ea, escape: xa },
            NodeKind::Ht { op: ob, edges: eb, escape: xb },
        ) => oa == ob && ht_compatible(cfg, ea, xa, eb, xb),
        _ => false,
    }
}

/// Branch co-traversal over the keyed union.
///
/// Unless size-increasing merges are permitted, a single-child branch is
/// never weighed against a multi-child branch (the substitution could only
/// grow the emitted switch), and two single-child branches either recurse
/// through their sole children (`correct_compatibility`) or fall back to a
/// shallow comparison of their sole tags.
fn keyed_compatible<K: Ord + Copy>(
    cfg: &Config,
    ea: &BTreeMap<K, NodeRef>,
    eb: &BTreeMap<K, NodeRef>,
) -> bool {
    if !cfg.size_increasing_merge {
        let da = distinct_edge_children(ea);
        let db = distinct_edge_children(eb);
        if (da.len() == 1) != (db.len() == 1) {
            return false;
        }
        if da.len() == 1 && db.len() == 1 {
            if cfg.correct_compatibility {
                return compatible(cfg, &da[0], &db[0]);
            }
            let ka = ea.keys().next();
            let kb = eb.keys().next();
            if ka != kb {
                return false;
            }
        }
    }
    for (tag, ca) in ea {
        if let Some(cb) = eb.get(tag) {
            if !compatible(cfg, ca, cb) {
                return false;
            }
        }
    }
    true
}

/// Header branches additionally admit the "no header tag" escape shape: an
/// escape child stands in for a keyed branch whenever the other side has a
/// single distinct child to recurse into.
fn ht_compatible<K: Ord + Copy>(
    cfg: &Config,
    ea: &BTreeMap<K, NodeRef>,
    xa: &Option<NodeRef>,
    eb: &BTreeMap<K, NodeRef>,
    xb: &Option<NodeRef>,
) -> bool {
    match (xa, xb) {
        (Some(ca), Some(cb)) => compatible(cfg, ca, cb),
        (Some(ca), None) => {
            let db = distinct_edge_children(eb);
            db.len() == 1 && compatible(cfg, ca, &db[0])
        }
        (None, Some(cb)) => {
            let da = distinct_edge_children(ea);
            da.len() == 1 && compatible(cfg, &da[0], cb)
        }
        (None, None) => keyed_compatible(cfg, ea, eb),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeCtx, NodeKind};
    use std::collections::BTreeMap;
    use std::rc::Rc;
    use tagsel_types::{HlRule, HtId, LlRule, PtId};

    fn ctx() -> NodeCtx {
        NodeCtx::new()
    }

    fn leaf_with(ctx: &NodeCtx, hl: &Rc<HlRule>) -> NodeRef {
        ctx.fresh(NodeKind::Leaf(LlRule { rts: Vec::new(), hl: hl.clone() }))
    }

    fn hl(id: usize, action: &str) -> Rc<HlRule> {
        Rc::new(HlRule { id, when: Vec::new(), action: action.into() })
    }

    fn pt_node(ctx: &NodeCtx, children: &[(u32, NodeRef)]) -> NodeRef {
        let edges: BTreeMap<PtId, NodeRef> =
            children.iter().map(|(t, c)| (PtId(*t), c.clone())).collect();
        ctx.fresh(NodeKind::Pt { op: 0, edges })
    }

    #[test]
    fn leaves_compare_by_provenance_not_text() {
        let ctx = ctx();
        let a = hl(0, "X");
        let b = hl(1, "X");
        let cfg = Config::default();
        assert!(compatible(&cfg, &leaf_with(&ctx, &a), &leaf_with(&ctx, &a)));
        assert!(!compatible(&cfg, &leaf_with(&ctx, &a), &leaf_with(&ctx, &b)));
    }

    #[test]
    fn one_sided_tags_impose_no_constraint() {
        let ctx = ctx();
        let r0 = hl(0, "X");
        let r1 = hl(1, "Y");
        let r2 = hl(2, "Z");
        // {0 -> r0, 1 -> r1} vs {0 -> r0, 2 -> r2}: only tag 0 is shared.
        let a = pt_node(&ctx, &[(0, leaf_with(&ctx, &r0)), (1, leaf_with(&ctx, &r1))]);
        let b = pt_node(&ctx, &[(0, leaf_with(&ctx, &r0)), (2, leaf_with(&ctx, &r2))]);
        assert!(compatible(&Config::default(), &a, &b));
    }

    #[test]
    fn shared_tag_with_different_rules_is_incompatible() {
        let ctx = ctx();
        let r0 = hl(0, "X");
        let r1 = hl(1, "Y");
        let a = pt_node(&ctx, &[(0, leaf_with(&ctx, &r0))]);
        let b = pt_node(&ctx, &[(0, leaf_with(&ctx, &r1))]);
        let mut cfg = Config::default();
        // Single-child recursion path.
        assert!(!compatible(&cfg, &a, &b));
        // Shallow path compares the sole tags instead, then co-traverses.
        cfg.correct_compatibility = false;
        assert!(!compatible(&cfg, &a, &b));
    }

    #[test]
    fn single_vs_multi_child_blocked_without_size_increasing_merge() {
        let ctx = ctx();
        let r0 = hl(0, "X");
        let r1 = hl(1, "Y");
        let single = pt_node(&ctx, &[(0, leaf_with(&ctx, &r0))]);
        let multi = pt_node(&ctx, &[(0, leaf_with(&ctx, &r0)), (1, leaf_with(&ctx, &r1))]);
        let mut cfg = Config::default();
        assert!(!compatible(&cfg, &single, &multi));
        cfg.size_increasing_merge = true;
        assert!(compatible(&cfg, &single, &multi));
    }

    #[test]
    fn shallow_single_child_check_compares_sole_tags() {
        let ctx = ctx();
        let r0 = hl(0, "X");
        let a = pt_node(&ctx, &[(0, leaf_with(&ctx, &r0))]);
        let b = pt_node(&ctx, &[(1, leaf_with(&ctx, &r0))]);
        let mut cfg = Config::default();
        // Recursing through the sole children: compatible (same rule).
        assert!(compatible(&cfg, &a, &b));
        // Shallow check: the sole tags differ.
        cfg.correct_compatibility = false;
        assert!(!compatible(&cfg, &a, &b));
    }

    #[test]
    fn escape_matches_keyed_branch_with_single_child() {
        let ctx = ctx();
        let r0 = hl(0, "X");
        let escape = ctx.fresh(NodeKind::Ht {
            op: 0,
            edges: BTreeMap::new(),
            escape: Some(leaf_with(&ctx, &r0)),
        });
        let mut edges = BTreeMap::new();
        edges.insert(HtId(0), leaf_with(&ctx, &r0));
        let keyed = ctx.fresh(NodeKind::Ht { op: 0, edges, escape: None });
        assert!(compatible(&Config::default(), &escape, &keyed));

        let r1 = hl(1, "Y");
        let mut edges = BTreeMap::new();
        edges.insert(HtId(0), leaf_with(&ctx, &r0));
        edges.insert(HtId(1), leaf_with(&ctx, &r1));
        let two_keyed = ctx.fresh(NodeKind::Ht { op: 0, edges, escape: None });
        assert!(!compatible(&Config::default(), &escape, &two_keyed));
    }

    #[test]
    fn kind_mismatch_is_incompatible_not_fatal() {
        let ctx = ctx();
        let r0 = hl(0, "X");
        let leaf = leaf_with(&ctx, &r0);
        let branch = pt_node(&ctx, &[(0, leaf_with(&ctx, &r0))]);
        assert!(!compatible(&Config::default(), &leaf, &branch));
    }
}
