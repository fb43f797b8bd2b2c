//! Render a decision diagram as nested tag-switch source text.
//!
//! Every branch becomes one `switch` over the relevant tag expression.
//! Tags whose edges lead to the same node (after merging, literally the
//! same node) are grouped as a run of case labels over one emitted body,
//! so merged subtrees are emitted once. An escape-style header branch
//! performs no test and simply emits its child. Leaf actions are emitted
//! verbatim, re-indented to the surrounding nesting.

use std::collections::BTreeMap;

use tagsel_types::{Registry, ERROR_ACTION};

use crate::config::Config;
use crate::node::{NodeKind, NodeRef};

/// Names of the C macros the emitted code dispatches through.
#[derive(Debug, Clone)]
pub struct Macros {
    /// Extracts a value's primary tag.
    pub get_ptag: String,
    /// Extracts a value's header tag.
    pub get_htag: String,
    /// Combines two primary tags into one switchable value.
    pub tag_pair: String,
}

impl Default for Macros {
    fn default() -> Self {
        Macros {
            get_ptag: "GET_PTAG".into(),
            get_htag: "GET_HTAG".into(),
            tag_pair: "TAG_PAIR".into(),
        }
    }
}

impl Macros {
    fn ptag_of(&self, var: &str) -> String {
        format!("{}({})", self.get_ptag, var)
    }

    fn htag_of(&self, var: &str) -> String {
        format!("{}({})", self.get_htag, var)
    }

    fn pair(&self, left: &str, right: &str) -> String {
        format!("{}({}, {})", self.tag_pair, left, right)
    }
}

pub struct CodeEmitter<'a> {
    reg: &'a Registry,
    cfg: &'a Config,
    macros: &'a Macros,
    vars: &'a [String],
    out: String,
    indent: usize,
}

impl<'a> CodeEmitter<'a> {
    pub fn new(reg: &'a Registry, cfg: &'a Config, macros: &'a Macros, vars: &'a [String]) -> Self {
        CodeEmitter { reg, cfg, macros, vars, out: String::new(), indent: 0 }
    }

    pub fn generate(mut self, root: &NodeRef) -> String {
        self.node(root);
        self.out
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Emit action text with its common indentation replaced by ours.
    fn action(&mut self, text: &str) {
        for line in dedent(text) {
            if line.is_empty() {
                self.out.push('\n');
            } else {
                self.line(line);
            }
        }
    }

    fn node(&mut self, node: &NodeRef) {
        match &node.kind {
            NodeKind::Leaf(rule) => {
                if self.cfg.debug_comment {
                    let tuple = self.reg.tuple_name(&rule.rts);
                    self.line(&format!("/* {} by rule {} */", tuple, rule.hl.id));
                }
                self.action(&rule.hl.action);
            }
            NodeKind::TagPair { edges } => {
                let discr = self
                    .macros
                    .pair(&self.macros.ptag_of(&self.vars[0]), &self.macros.ptag_of(&self.vars[1]));
                let groups = group_edges(edges)
                    .into_iter()
                    .map(|(tags, child)| {
                        let labels = tags
                            .iter()
                            .map(|(p1, p2)| {
                                self.macros.pair(&self.reg.pt(*p1).name, &self.reg.pt(*p2).name)
                            })
                            .collect();
                        (labels, child)
                    })
                    .collect();
                let mut pad = Vec::new();
                if self.cfg.pad_cases {
                    for p1 in self.reg.pt_ids() {
                        for p2 in self.reg.pt_ids() {
                            if !edges.contains_key(&(p1, p2)) {
                                pad.push(
                                    self.macros.pair(&self.reg.pt(p1).name, &self.reg.pt(p2).name),
                                );
                            }
                        }
                    }
                }
                self.switch(&discr, groups, pad);
            }
            NodeKind::Pt { op, edges } => {
                let discr = self.macros.ptag_of(&self.vars[*op]);
                let groups = group_edges(edges)
                    .into_iter()
                    .map(|(tags, child)| {
                        (tags.iter().map(|pt| self.reg.pt(*pt).name.clone()).collect(), child)
                    })
                    .collect();
                let mut pad = Vec::new();
                if self.cfg.pad_cases {
                    for pt in self.reg.pt_ids() {
                        if !edges.contains_key(&pt) {
                            pad.push(self.reg.pt(pt).name.clone());
                        }
                    }
                }
                self.switch(&discr, groups, pad);
            }
            NodeKind::Ht { op, edges, escape } => {
                if let Some(child) = escape {
                    // No header-tag test is needed for this primary tag.
                    self.node(child);
                    return;
                }
                let discr = self.macros.htag_of(&self.vars[*op]);
                let groups = group_edges(edges)
                    .into_iter()
                    .map(|(tags, child)| {
                        (tags.iter().map(|ht| self.reg.ht(*ht).name.clone()).collect(), child)
                    })
                    .collect();
                let mut pad = Vec::new();
                if self.cfg.pad_cases {
                    for ht in self.reg.ht_ids() {
                        if !edges.contains_key(&ht) {
                            pad.push(self.reg.ht(ht).name.clone());
                        }
                    }
                }
                self.switch(&discr, groups, pad);
            }
        }
    }

    fn switch(&mut self, discr: &str, groups: Vec<(Vec<String>, NodeRef)>, pad: Vec<String>) {
        self.line(&format!("switch ({discr}) {{"));
        for (labels, child) in groups {
            for label in labels {
                self.line(&format!("case {label}:"));
            }
            self.indent += 1;
            self.line("{");
            self.indent += 1;
            self.node(&child);
            self.indent -= 1;
            self.line("}");
            self.line("break;");
            self.indent -= 1;
        }
        if self.cfg.use_default {
            if self.cfg.pad_cases {
                for label in pad {
                    self.line(&format!("case {label}:"));
                }
            }
            self.line("default:");
            self.indent += 1;
            self.line(ERROR_ACTION);
            self.indent -= 1;
        }
        self.line("}");
    }
}

/// Group edges by child node, keeping each group's tags in tag order and
/// ordering groups by their smallest tag.
fn group_edges<K: Ord + Copy>(edges: &BTreeMap<K, NodeRef>) -> Vec<(Vec<K>, NodeRef)> {
    let mut order: Vec<u32> = Vec::new();
    let mut by_child: BTreeMap<u32, (Vec<K>, NodeRef)> = BTreeMap::new();
    for (tag, child) in edges {
        let entry = by_child.entry(child.seq).or_insert_with(|| {
            order.push(child.seq);
            (Vec::new(), child.clone())
        });
        entry.0.push(*tag);
    }
    order.into_iter().map(|seq| by_child.remove(&seq).unwrap()).collect()
}

/// Strip the common leading indentation and surrounding blank lines.
pub(crate) fn dedent(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let indent = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines.into_iter().map(|l| if l.is_empty() { l } else { &l[indent..] }).collect()
}
