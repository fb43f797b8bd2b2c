//! Diagram construction: insert every rule-table row along the dispatch
//! plan.
//!
//! Each rule walks the plan in order, consuming one criterion per
//! non-skipped step and descending into (creating if absent) the branch
//! child keyed by the relevant tag. Rules with an identical tag prefix
//! share a subtree; where their tags first differ, the tree branches. When
//! the plan is exhausted the insertion target becomes the rule's leaf --
//! finding a node already there means two rows cover one tuple, which is a
//! table-invariant violation, not something to overwrite silently.

use std::collections::BTreeMap;

use tagsel_types::{LlRule, LlTable, Registry, TableError};

use crate::config::Config;
use crate::error::SynthError;
use crate::node::{NodeCtx, NodeKind, NodeRef};
use crate::plan::Criterion;
use crate::{emit, merge, relative, search, simplify};

/// One instruction's decision diagram plus the state needed to transform
/// and render it.
pub struct DecisionDiagram {
    insn: String,
    plan: Vec<Criterion>,
    ctx: NodeCtx,
    root: NodeRef,
}

impl DecisionDiagram {
    /// Build the unmerged diagram for a validated rule table.
    pub fn build(table: &LlTable, reg: &Registry, plan: Vec<Criterion>) -> Result<Self, TableError> {
        let ctx = NodeCtx::new();
        let mut root: Option<NodeRef> = None;
        for rule in table.rules() {
            let digger = Digger { ctx: &ctx, plan: &plan, reg, insn: &table.insn, rule };
            root = Some(digger.dig(0, root.as_ref())?);
        }
        let root = root.ok_or_else(|| TableError::EmptyTable { insn: table.insn.clone() })?;
        Ok(DecisionDiagram { insn: table.insn.clone(), plan, ctx, root })
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn insn(&self) -> &str {
        &self.insn
    }

    pub fn plan(&self) -> &[Criterion] {
        &self.plan
    }

    /// Local sibling-merge pass.
    pub fn merge_children(&mut self, cfg: &Config) {
        self.root = merge::merge_children(&self.ctx, cfg, &self.root);
    }

    /// Remove branches that no longer represent a real choice.
    pub fn skip_no_choice(&mut self) {
        self.root = simplify::skip_no_choice(&self.ctx, &self.root);
    }

    /// Cross-branch merge pass.
    pub fn merge_relative(&mut self, cfg: &Config) {
        self.root = relative::merge_relative(&self.ctx, cfg, &self.root);
    }

    /// Check that the diagram still answers every table row correctly.
    pub fn verify(&self, table: &LlTable, reg: &Registry) -> Result<(), SynthError> {
        search::verify(&self.insn, &self.root, table, reg)
    }

    /// Render the diagram as nested switch code over the given operand
    /// variable names.
    pub fn generate(
        &self,
        reg: &Registry,
        cfg: &Config,
        macros: &emit::Macros,
        vars: &[String],
    ) -> String {
        emit::CodeEmitter::new(reg, cfg, macros, vars).generate(&self.root)
    }
}

struct Digger<'a> {
    ctx: &'a NodeCtx,
    plan: &'a [Criterion],
    reg: &'a Registry,
    insn: &'a str,
    rule: &'a LlRule,
}

impl Digger<'_> {
    fn arity(&self) -> usize {
        self.rule.rts.len()
    }

    fn dig(&self, step: usize, node: Option<&NodeRef>) -> Result<NodeRef, TableError> {
        if step == self.plan.len() {
            if node.is_some() {
                return Err(TableError::DuplicateTuple {
                    insn: self.insn.to_string(),
                    tuple: self.reg.tuple_name(&self.rule.rts),
                });
            }
            return Ok(self.ctx.fresh(NodeKind::Leaf(self.rule.clone())));
        }
        let criterion = self.plan[step];
        if !criterion.available(self.arity()) {
            return self.dig(step + 1, node);
        }
        match criterion {
            Criterion::TagPair => {
                let mut edges = match node {
                    None => BTreeMap::new(),
                    Some(n) => match &n.kind {
                        NodeKind::TagPair { edges } => edges.clone(),
                        _ => panic!("dispatch plan does not match existing tag-pair node"),
                    },
                };
                let key = (self.reg.rep_pt(self.rule.rts[0]), self.reg.rep_pt(self.rule.rts[1]));
                let existing = edges.get(&key).cloned();
                edges.insert(key, self.dig(step + 1, existing.as_ref())?);
                Ok(self.publish(node, NodeKind::TagPair { edges }))
            }
            Criterion::Pt(op) => {
                let mut edges = match node {
                    None => BTreeMap::new(),
                    Some(n) => match &n.kind {
                        NodeKind::Pt { op: existing_op, edges } => {
                            assert_eq!(*existing_op, op, "dispatch plan operand mismatch");
                            edges.clone()
                        }
                        _ => panic!("dispatch plan does not match existing primary-tag node"),
                    },
                };
                let key = self.reg.rep_pt(self.rule.rts[op]);
                let existing = edges.get(&key).cloned();
                edges.insert(key, self.dig(step + 1, existing.as_ref())?);
                Ok(self.publish(node, NodeKind::Pt { op, edges }))
            }
            Criterion::Ht(op) => {
                let (mut edges, mut escape) = match node {
                    None => (BTreeMap::new(), None),
                    Some(n) => match &n.kind {
                        NodeKind::Ht { op: existing_op, edges, escape } => {
                            assert_eq!(*existing_op, op, "dispatch plan operand mismatch");
                            (edges.clone(), escape.clone())
                        }
                        _ => panic!("dispatch plan does not match existing header-tag node"),
                    },
                };
                match self.reg.rep_ht(self.rule.rts[op]) {
                    None => {
                        if !edges.is_empty() {
                            return Err(self.header_mix());
                        }
                        escape = Some(self.dig(step + 1, escape.as_ref())?);
                    }
                    Some(tag) => {
                        if escape.is_some() {
                            return Err(self.header_mix());
                        }
                        let existing = edges.get(&tag).cloned();
                        edges.insert(tag, self.dig(step + 1, existing.as_ref())?);
                    }
                }
                Ok(self.publish(node, NodeKind::Ht { op, edges, escape }))
            }
        }
    }

    fn publish(&self, node: Option<&NodeRef>, kind: NodeKind) -> NodeRef {
        match node {
            None => self.ctx.fresh(kind),
            Some(n) => self.ctx.rewire(n.seq, kind),
        }
    }

    fn header_mix(&self) -> TableError {
        TableError::HeaderTagMix {
            insn: self.insn.to_string(),
            tuple: self.reg.tuple_name(&self.rule.rts),
        }
    }
}
