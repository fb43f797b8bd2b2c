//! Merging: the pure union of compatible nodes, the size/speed
//! admissibility policy, and the local sibling-merge pass.

use std::collections::BTreeMap;

use crate::compat::compatible;
use crate::config::Config;
use crate::node::{
    distinct_edge_children, rewire_children, rewire_edges, NodeCtx, NodeKind, NodeRef,
};

/// Merge two compatible nodes into their union. Neither input is mutated;
/// the result is a fresh node. Calling this on incompatible nodes is a
/// programming error.
pub fn merge(ctx: &NodeCtx, a: &NodeRef, b: &NodeRef) -> NodeRef {
    match (&a.kind, &b.kind) {
        (NodeKind::Leaf(_), NodeKind::Leaf(_)) => a.clone(),
        (NodeKind::TagPair { .. }, NodeKind::TagPair { .. }) => {
            panic!("tag-pair nodes are never merge operands")
        }
        (NodeKind::Pt { op, edges: ea }, NodeKind::Pt { op: ob, edges: eb }) => {
            assert_eq!(op, ob, "merge across operand indices");
            ctx.fresh(NodeKind::Pt { op: *op, edges: merge_edges(ctx, ea, eb) })
        }
        (
            NodeKind::Ht { op, edges: ea, escape: xa },
            NodeKind::Ht { op: ob, edges: eb, escape: xb },
        ) => {
            assert_eq!(op, ob, "merge across operand indices");
            if xa.is_some() || xb.is_some() {
                // One side dispenses with the header-tag test; compatibility
                // guarantees the other side has a single distinct child.
                let ca = sole_child(a);
                let cb = sole_child(b);
                ctx.fresh(NodeKind::Ht {
                    op: *op,
                    edges: BTreeMap::new(),
                    escape: Some(merge(ctx, &ca, &cb)),
                })
            } else {
                ctx.fresh(NodeKind::Ht { op: *op, edges: merge_edges(ctx, ea, eb), escape: None })
            }
        }
        _ => panic!("merge invoked on incompatible nodes"),
    }
}

fn sole_child(node: &NodeRef) -> NodeRef {
    node.distinct_children().into_iter().next().expect("branch child")
}

/// Union of two edge maps: one-sided children copy over unchanged, shared
/// tags merge recursively.
fn merge_edges<K: Ord + Copy>(
    ctx: &NodeCtx,
    ea: &BTreeMap<K, NodeRef>,
    eb: &BTreeMap<K, NodeRef>,
) -> BTreeMap<K, NodeRef> {
    let mut out = BTreeMap::new();
    for (tag, ca) in ea {
        match eb.get(tag) {
            Some(cb) => out.insert(*tag, merge(ctx, ca, cb)),
            None => out.insert(*tag, ca.clone()),
        };
    }
    for (tag, cb) in eb {
        if !ea.contains_key(tag) {
            out.insert(*tag, cb.clone());
        }
    }
    out
}

/// Whether `x`'s behavior is fully reproduced by `y` on the tag paths `x`
/// can take: every path reachable in `x` that also exists in `y` ends at a
/// leaf with the same action text. Tags present only on one side impose no
/// constraint.
fn absorbed_by(x: &NodeRef, y: &NodeRef) -> bool {
    match (&x.kind, &y.kind) {
        (NodeKind::Leaf(rx), NodeKind::Leaf(ry)) => rx.hl.action == ry.hl.action,
        (NodeKind::TagPair { edges: ex }, NodeKind::TagPair { edges: ey }) => {
            keyed_absorbed(ex, ey)
        }
        (NodeKind::Pt { op: ox, edges: ex }, NodeKind::Pt { op: oy, edges: ey }) => {
            ox == oy && keyed_absorbed(ex, ey)
        }
        (
            NodeKind::Ht { op: ox, edges: ex, escape: xx },
            NodeKind::Ht { op: oy, edges: ey, escape: xy },
        ) => {
            if ox != oy {
                return false;
            }
            match (xx, xy) {
                (Some(cx), Some(cy)) => absorbed_by(cx, cy),
                (Some(cx), None) => {
                    let dy = distinct_edge_children(ey);
                    dy.len() == 1 && absorbed_by(cx, &dy[0])
                }
                (None, Some(cy)) => {
                    let dx = distinct_edge_children(ex);
                    dx.len() == 1 && absorbed_by(&dx[0], cy)
                }
                (None, None) => keyed_absorbed(ex, ey),
            }
        }
        _ => false,
    }
}

fn keyed_absorbed<K: Ord + Copy>(ex: &BTreeMap<K, NodeRef>, ey: &BTreeMap<K, NodeRef>) -> bool {
    for (tag, cx) in ex {
        if let Some(cy) = ey.get(tag) {
            if !absorbed_by(cx, cy) {
                return false;
            }
        }
    }
    true
}

/// The size/speed policy deciding whether a compatible pair may merge.
///
/// Level 0 keeps switches small and fast: only multi-action subtrees
/// coalesce. Two single-action subtrees merge (at level 1 and up) only when
/// one absorbs the other, so no new case bodies appear. A mixed pair at
/// level 1 requires the single-action side to be absorbed; level 2 admits
/// every remaining compatible pair.
pub fn merge_admissible(cfg: &Config, a: &NodeRef, b: &NodeRef) -> bool {
    let sa = a.single_action().is_some();
    let sb = b.single_action().is_some();
    match (sa, sb) {
        (true, true) => cfg.merge_level >= 1 && (absorbed_by(a, b) || absorbed_by(b, a)),
        (false, false) => true,
        (true, false) => match cfg.merge_level {
            0 => false,
            1 => absorbed_by(a, b),
            _ => true,
        },
        (false, true) => match cfg.merge_level {
            0 => false,
            1 => absorbed_by(b, a),
            _ => true,
        },
    }
}

/// Greedy coalescing over `nodes` in creation order: pick the first
/// unmerged node, fold in every later node compatible with and admissible
/// against the running merged result, repeat. Returns the replacement map
/// (keyed by sequence number) for every node that joined a group of two or
/// more.
pub fn greedy_coalesce(
    ctx: &NodeCtx,
    cfg: &Config,
    nodes: &[NodeRef],
) -> BTreeMap<u32, NodeRef> {
    let mut replaced = vec![false; nodes.len()];
    let mut replace: BTreeMap<u32, NodeRef> = BTreeMap::new();
    for i in 0..nodes.len() {
        if replaced[i] {
            continue;
        }
        replaced[i] = true;
        let mut merged = nodes[i].clone();
        let mut group = vec![nodes[i].seq];
        for j in i + 1..nodes.len() {
            if replaced[j] {
                continue;
            }
            let nj = &nodes[j];
            if !compatible(cfg, &merged, nj) || !merge_admissible(cfg, &merged, nj) {
                continue;
            }
            merged = merge(ctx, &merged, nj);
            group.push(nj.seq);
            replaced[j] = true;
        }
        if group.len() > 1 {
            for seq in group {
                replace.insert(seq, merged.clone());
            }
        }
    }
    replace
}

/// The local merge pass: optimize every child bottom-up, then coalesce
/// compatible, admissible siblings.
pub fn merge_children(ctx: &NodeCtx, cfg: &Config, node: &NodeRef) -> NodeRef {
    if node.is_leaf() {
        return node.clone();
    }
    let node = rewire_children(ctx, node, |child| merge_children(ctx, cfg, child));
    let children = node.distinct_children();
    let node = if children.len() > 1 {
        let replace = greedy_coalesce(ctx, cfg, &children);
        if replace.is_empty() {
            node
        } else {
            rewire_edges(ctx, &node, &replace)
        }
    } else {
        node
    };
    ht_escape_union(ctx, cfg, &node)
}

/// Special case: exactly two header-tag children remain, one escape-style
/// and one keyed over a single distinct child compatible with the escape
/// child. The pair unions into one escape-style branch even though the
/// admissibility policy would not normally merge them, so a header-tag
/// test never survives on branch shape alone.
fn ht_escape_union(ctx: &NodeCtx, cfg: &Config, node: &NodeRef) -> NodeRef {
    let children = node.distinct_children();
    if children.len() != 2 {
        return node.clone();
    }
    for (x, y) in [(&children[0], &children[1]), (&children[1], &children[0])] {
        let NodeKind::Ht { op: ox, escape: Some(cx), .. } = &x.kind else {
            continue;
        };
        let NodeKind::Ht { op: oy, edges: ey, escape: None } = &y.kind else {
            continue;
        };
        if ox != oy {
            continue;
        }
        let dy = distinct_edge_children(ey);
        if dy.len() != 1 || !compatible(cfg, cx, &dy[0]) {
            continue;
        }
        let merged = ctx.fresh(NodeKind::Ht {
            op: *ox,
            edges: BTreeMap::new(),
            escape: Some(merge(ctx, cx, &dy[0])),
        });
        let mut replace = BTreeMap::new();
        replace.insert(x.seq, merged.clone());
        replace.insert(y.seq, merged);
        return rewire_edges(ctx, node, &replace);
    }
    node.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tagsel_types::{HlRule, PtId};

    fn hl(id: usize, action: &str) -> Rc<HlRule> {
        Rc::new(HlRule { id, when: Vec::new(), action: action.into() })
    }

    fn leaf_with(ctx: &NodeCtx, hl: &Rc<HlRule>) -> NodeRef {
        ctx.fresh(NodeKind::Leaf(tagsel_types::LlRule { rts: Vec::new(), hl: hl.clone() }))
    }

    fn pt_node(ctx: &NodeCtx, children: &[(u32, NodeRef)]) -> NodeRef {
        let edges: BTreeMap<PtId, NodeRef> =
            children.iter().map(|(t, c)| (PtId(*t), c.clone())).collect();
        ctx.fresh(NodeKind::Pt { op: 0, edges })
    }

    #[test]
    fn merge_unions_disjoint_edges_and_shares_leaves() {
        let ctx = NodeCtx::new();
        let r = hl(0, "X");
        let a = pt_node(&ctx, &[(0, leaf_with(&ctx, &r))]);
        let b = pt_node(&ctx, &[(1, leaf_with(&ctx, &r))]);
        let merged = merge(&ctx, &a, &b);
        let NodeKind::Pt { edges, .. } = &merged.kind else { panic!() };
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn level0_admits_only_multi_action_pairs() {
        let ctx = NodeCtx::new();
        let r0 = hl(0, "X");
        let r1 = hl(1, "Y");
        let single_a = pt_node(&ctx, &[(0, leaf_with(&ctx, &r0))]);
        let single_b = pt_node(&ctx, &[(1, leaf_with(&ctx, &r0))]);
        let multi_a = pt_node(&ctx, &[(0, leaf_with(&ctx, &r0)), (1, leaf_with(&ctx, &r1))]);
        let multi_b = pt_node(&ctx, &[(2, leaf_with(&ctx, &r0)), (3, leaf_with(&ctx, &r1))]);
        let cfg = Config { merge_level: 0, ..Config::default() };
        assert!(!merge_admissible(&cfg, &single_a, &single_b));
        assert!(!merge_admissible(&cfg, &single_a, &multi_a));
        assert!(merge_admissible(&cfg, &multi_a, &multi_b));
    }

    #[test]
    fn single_action_pairs_need_absorption_at_level_1_and_up() {
        let ctx = NodeCtx::new();
        let r0 = hl(0, "X");
        let r1 = hl(1, "Y");
        // Same tag, different action text: compatible is irrelevant here,
        // absorption fails on the shared path.
        let a = pt_node(&ctx, &[(0, leaf_with(&ctx, &r0))]);
        let b = pt_node(&ctx, &[(0, leaf_with(&ctx, &r1))]);
        let cfg = Config::default();
        assert!(!merge_admissible(&cfg, &a, &b));
        // Disjoint tags absorb vacuously.
        let c = pt_node(&ctx, &[(1, leaf_with(&ctx, &r1))]);
        assert!(merge_admissible(&cfg, &a, &c));
        let cfg1 = Config { merge_level: 1, ..Config::default() };
        assert!(merge_admissible(&cfg1, &a, &c));
    }

    #[test]
    fn mixed_pair_at_level_1_requires_absorption_of_single_side() {
        let ctx = NodeCtx::new();
        let rx = hl(0, "X");
        let ry = hl(1, "Y");
        let single = pt_node(&ctx, &[(0, leaf_with(&ctx, &rx))]);
        // Multi-action tree whose tag-0 path carries action X.
        let absorbing =
            pt_node(&ctx, &[(0, leaf_with(&ctx, &rx)), (1, leaf_with(&ctx, &ry))]);
        // Multi-action tree whose tag-0 path carries action Y.
        let blocking =
            pt_node(&ctx, &[(0, leaf_with(&ctx, &ry)), (1, leaf_with(&ctx, &rx))]);
        let cfg1 = Config { merge_level: 1, ..Config::default() };
        assert!(merge_admissible(&cfg1, &single, &absorbing));
        assert!(!merge_admissible(&cfg1, &single, &blocking));
        let cfg2 = Config::default();
        assert!(merge_admissible(&cfg2, &single, &blocking));
    }

    #[test]
    fn greedy_coalescing_absorbs_later_compatible_nodes() {
        let ctx = NodeCtx::new();
        let r = hl(0, "X");
        // One shared leaf behind a and b, so their union still has a single
        // distinct child and stays comparable with c.
        let shared = leaf_with(&ctx, &r);
        let a = pt_node(&ctx, &[(0, shared.clone())]);
        let b = pt_node(&ctx, &[(1, shared)]);
        let c = pt_node(&ctx, &[(2, leaf_with(&ctx, &r))]);
        let replace = greedy_coalesce(&ctx, &Config::default(), &[a.clone(), b.clone(), c.clone()]);
        assert_eq!(replace.len(), 3);
        let merged = &replace[&a.seq];
        assert_eq!(merged.seq, replace[&b.seq].seq);
        assert_eq!(merged.seq, replace[&c.seq].seq);
        let NodeKind::Pt { edges, .. } = &merged.kind else { panic!() };
        assert_eq!(edges.len(), 3);
    }

    #[test]
    fn local_pass_groups_sibling_leaves_under_one_child() {
        let ctx = NodeCtx::new();
        let r = hl(0, "X");
        let s = hl(1, "Y");
        let parent = pt_node(
            &ctx,
            &[
                (0, leaf_with(&ctx, &r)),
                (1, leaf_with(&ctx, &r)),
                (2, leaf_with(&ctx, &s)),
            ],
        );
        let merged = merge_children(&ctx, &Config::default(), &parent);
        // The two r-leaves collapse into one shared child.
        assert_eq!(merged.distinct_children().len(), 2);
        assert_eq!(merged.seq, parent.seq);
    }

    #[test]
    fn escape_union_removes_needless_header_test() {
        let ctx = NodeCtx::new();
        let r = hl(0, "X");
        let escape_side = ctx.fresh(NodeKind::Ht {
            op: 0,
            edges: BTreeMap::new(),
            escape: Some(leaf_with(&ctx, &r)),
        });
        let mut edges = BTreeMap::new();
        edges.insert(tagsel_types::HtId(0), leaf_with(&ctx, &r));
        let keyed_side = ctx.fresh(NodeKind::Ht { op: 0, edges, escape: None });
        let mut pt_edges = BTreeMap::new();
        pt_edges.insert(PtId(0), escape_side);
        pt_edges.insert(PtId(1), keyed_side);
        let parent = ctx.fresh(NodeKind::Pt { op: 0, edges: pt_edges });

        // At level 0 the admissibility policy refuses the merge (both sides
        // are single-action), so only the special case can union them.
        let cfg = Config { merge_level: 0, ..Config::default() };
        let merged = merge_children(&ctx, &cfg, &parent);
        let children = merged.distinct_children();
        assert_eq!(children.len(), 1);
        let NodeKind::Ht { edges, escape, .. } = &children[0].kind else {
            panic!("expected header node");
        };
        assert!(edges.is_empty());
        assert!(escape.is_some());
    }
}
