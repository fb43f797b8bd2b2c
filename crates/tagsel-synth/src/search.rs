//! The diagram oracle: re-derive the answer for one concrete operand tuple.
//!
//! The oracle walks the diagram the way the emitted code would dispatch --
//! by combined pair, primary tag, or header tag, falling through escape
//! branches unconsumed -- and returns the leaf rule. The verifier uses it
//! to prove that every optimization pass preserved the rule table exactly.

use tagsel_types::{LlRule, LlTable, Registry, RepTypeId};

use crate::error::SynthError;
use crate::node::{NodeKind, NodeRef};

/// The rule the diagram selects for `rts`, or `None` if the walk falls off
/// a missing edge (which the verifier reports as a soundness failure).
pub fn search<'a>(node: &'a NodeRef, rts: &[RepTypeId], reg: &Registry) -> Option<&'a LlRule> {
    match &node.kind {
        NodeKind::Leaf(rule) => Some(rule),
        NodeKind::TagPair { edges } => {
            let key = (reg.rep_pt(rts[0]), reg.rep_pt(rts[1]));
            edges.get(&key).and_then(|child| search(child, rts, reg))
        }
        NodeKind::Pt { op, edges } => {
            edges.get(&reg.rep_pt(rts[*op])).and_then(|child| search(child, rts, reg))
        }
        NodeKind::Ht { op, edges, escape } => match escape {
            Some(child) => search(child, rts, reg),
            None => reg
                .rep_ht(rts[*op])
                .and_then(|tag| edges.get(&tag))
                .and_then(|child| search(child, rts, reg)),
        },
    }
}

/// Check that the diagram answers every table row with the originating
/// rule.
pub fn verify(
    insn: &str,
    root: &NodeRef,
    table: &LlTable,
    reg: &Registry,
) -> Result<(), SynthError> {
    for rule in table.rules() {
        match search(root, &rule.rts, reg) {
            Some(found) if found.hl.id == rule.hl.id => {}
            Some(found) => {
                return Err(SynthError::OracleMismatch {
                    insn: insn.to_string(),
                    tuple: reg.tuple_name(&rule.rts),
                    expected: rule.hl.action.clone(),
                    found: Some(found.hl.action.clone()),
                })
            }
            None => {
                return Err(SynthError::OracleMismatch {
                    insn: insn.to_string(),
                    tuple: reg.tuple_name(&rule.rts),
                    expected: rule.hl.action.clone(),
                    found: None,
                })
            }
        }
    }
    Ok(())
}
