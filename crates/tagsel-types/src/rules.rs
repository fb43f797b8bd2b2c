//! Rule tables: high-level rules over data types, the operand-specification
//! overlay, and the expanded low-level table over representation types.
//!
//! An instruction's high-level rules map tuples of data types to action
//! text. Before synthesis the operand-specification overlay is folded in:
//! `unspecified` tuples are dropped from dispatch entirely, `error` tuples
//! are rerouted to a standard error action, and rules left with no
//! condition are kept aside so the generator can emit them in a dead-code
//! block for diagnosis. The folded rules then expand to one row per tuple
//! of concrete representation types; that low-level table is what the
//! synthesizer consumes, and it must be total and conflict-free.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::TableError;
use crate::registry::{DataTypeId, Registry, RepTypeId};

/// Action emitted for operand tuples the specification marks as errors.
pub const ERROR_ACTION: &str = "LOG_EXIT(\"unexpected operand type\\n\");";

/// A high-level dispatch rule: action text guarded by a disjunction of
/// data-type tuples. The rule's identity (`id`) is the provenance carried
/// through expansion and synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct HlRule {
    pub id: usize,
    pub when: Vec<Vec<DataTypeId>>,
    pub action: String,
}

/// One instruction definition: dispatch operand names plus rules.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub name: String,
    pub operands: Vec<String>,
    pub prologue: Option<String>,
    pub epilogue: Option<String>,
    pub rules: Vec<Rc<HlRule>>,
}

impl Instruction {
    pub fn arity(&self) -> usize {
        self.operands.len()
    }
}

/// What the operand specification says about one operand tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecBehavior {
    /// The tuple is dispatched normally.
    Accept,
    /// The tuple is rerouted to the standard error action.
    Error,
    /// The tuple cannot occur and is dropped from dispatch.
    Unspecified,
}

#[derive(Debug, Clone)]
struct SpecLine {
    insn: String,
    /// One pattern per operand; `None` matches any data type.
    pattern: Vec<Option<DataTypeId>>,
    behavior: SpecBehavior,
}

/// The operand-specification overlay. Lines are matched first-to-last;
/// a tuple no line matches is accepted.
#[derive(Debug, Clone, Default)]
pub struct OperandSpecs {
    lines: Vec<SpecLine>,
}

impl OperandSpecs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one specification line. `None` entries in `pattern` are
    /// wildcards.
    pub fn push(&mut self, insn: &str, pattern: Vec<Option<DataTypeId>>, behavior: SpecBehavior) {
        self.lines.push(SpecLine { insn: insn.to_string(), pattern, behavior });
    }

    /// The behavior of `tuple` for `insn`: first matching line wins,
    /// default accept.
    pub fn behavior(&self, insn: &str, tuple: &[DataTypeId]) -> SpecBehavior {
        for line in &self.lines {
            if line.insn != insn || line.pattern.len() != tuple.len() {
                continue;
            }
            let matches = line
                .pattern
                .iter()
                .zip(tuple)
                .all(|(pat, dt)| pat.map_or(true, |p| p == *dt));
            if matches {
                return line.behavior;
            }
        }
        SpecBehavior::Accept
    }
}

/// An instruction with the operand-specification overlay folded in.
#[derive(Debug, Clone)]
pub struct FoldedInstruction {
    pub name: String,
    pub operands: Vec<String>,
    pub prologue: Option<String>,
    pub epilogue: Option<String>,
    /// Dispatch rules, including the synthetic error rule when the overlay
    /// marked tuples as errors.
    pub rules: Vec<Rc<HlRule>>,
    /// Actions of rules whose whole condition was filtered away. Emitted in
    /// a dead-code block so the dropped code stays visible.
    pub unused_actions: Vec<String>,
    /// Representation tuples dropped from dispatch (`unspecified` tuples).
    pub dropped: Vec<Vec<RepTypeId>>,
}

impl FoldedInstruction {
    pub fn arity(&self) -> usize {
        self.operands.len()
    }
}

/// All tuples of the given arity over `items`, in definition order.
fn tuples<T: Copy>(items: &[T], arity: usize) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = vec![Vec::new()];
    for _ in 0..arity {
        let mut next = Vec::with_capacity(out.len() * items.len());
        for prefix in &out {
            for &item in items {
                let mut tuple = prefix.clone();
                tuple.push(item);
                next.push(tuple);
            }
        }
        out = next;
    }
    out
}

/// Expand one data-type tuple to every representation tuple it covers.
fn expand_dt_tuple(reg: &Registry, dts: &[DataTypeId]) -> Vec<Vec<RepTypeId>> {
    let mut out: Vec<Vec<RepTypeId>> = vec![Vec::new()];
    for &dt in dts {
        let members = &reg.datatype(dt).reptypes;
        let mut next = Vec::with_capacity(out.len() * members.len());
        for prefix in &out {
            for &rt in members {
                let mut tuple = prefix.clone();
                tuple.push(rt);
                next.push(tuple);
            }
        }
        out = next;
    }
    out
}

/// Fold the operand-specification overlay into an instruction's rules.
pub fn fold_operand_specs(
    insn: &Instruction,
    specs: &OperandSpecs,
    reg: &Registry,
) -> FoldedInstruction {
    let arity = insn.arity();
    let all_dts: Vec<DataTypeId> = reg.datatype_ids().collect();

    let mut remove: FxHashSet<Vec<DataTypeId>> = FxHashSet::default();
    let mut error_tuples: Vec<Vec<DataTypeId>> = Vec::new();
    let mut dropped: Vec<Vec<RepTypeId>> = Vec::new();
    for tuple in tuples(&all_dts, arity) {
        match specs.behavior(&insn.name, &tuple) {
            SpecBehavior::Accept => {}
            SpecBehavior::Error => {
                remove.insert(tuple.clone());
                error_tuples.push(tuple);
            }
            SpecBehavior::Unspecified => {
                dropped.extend(expand_dt_tuple(reg, &tuple));
                remove.insert(tuple);
            }
        }
    }

    let mut rules: Vec<Rc<HlRule>> = Vec::new();
    let mut unused_actions: Vec<String> = Vec::new();
    let mut next_id = 0;
    for rule in &insn.rules {
        next_id = next_id.max(rule.id + 1);
        let when: Vec<Vec<DataTypeId>> =
            rule.when.iter().filter(|t| !remove.contains(*t)).cloned().collect();
        if when.is_empty() {
            unused_actions.push(rule.action.clone());
        } else if when.len() == rule.when.len() {
            rules.push(rule.clone());
        } else {
            rules.push(Rc::new(HlRule { id: rule.id, when, action: rule.action.clone() }));
        }
    }
    if !error_tuples.is_empty() {
        rules.push(Rc::new(HlRule {
            id: next_id,
            when: error_tuples,
            action: ERROR_ACTION.to_string(),
        }));
    }

    FoldedInstruction {
        name: insn.name.clone(),
        operands: insn.operands.clone(),
        prologue: insn.prologue.clone(),
        epilogue: insn.epilogue.clone(),
        rules,
        unused_actions,
        dropped,
    }
}

/// One row of the expanded table: a representation tuple and the high-level
/// rule it came from.
#[derive(Debug, Clone)]
pub struct LlRule {
    pub rts: Vec<RepTypeId>,
    pub hl: Rc<HlRule>,
}

/// The expanded low-level rule table for one instruction.
///
/// Total and conflict-free over every representation tuple the overlay did
/// not drop; [`LlTable::expand`] enforces both and fails loudly otherwise.
#[derive(Debug, Clone)]
pub struct LlTable {
    pub insn: String,
    pub arity: usize,
    rules: Vec<LlRule>,
    dropped: FxHashSet<Vec<RepTypeId>>,
}

impl LlTable {
    /// Expand a folded instruction into its low-level table and validate
    /// the table invariants.
    pub fn expand(insn: &FoldedInstruction, reg: &Registry) -> Result<LlTable, TableError> {
        let arity = insn.arity();
        let mut rules: Vec<LlRule> = Vec::new();
        let mut covered: FxHashMap<Vec<RepTypeId>, usize> = FxHashMap::default();
        for rule in &insn.rules {
            for dt_tuple in &rule.when {
                for rts in expand_dt_tuple(reg, dt_tuple) {
                    if covered.insert(rts.clone(), rule.id).is_some() {
                        return Err(TableError::DuplicateTuple {
                            insn: insn.name.clone(),
                            tuple: reg.tuple_name(&rts),
                        });
                    }
                    rules.push(LlRule { rts, hl: rule.clone() });
                }
            }
        }

        let dropped: FxHashSet<Vec<RepTypeId>> = insn.dropped.iter().cloned().collect();
        let all_rts: Vec<RepTypeId> = reg.reptype_ids().collect();
        for tuple in tuples(&all_rts, arity) {
            if dropped.contains(&tuple) || covered.contains_key(&tuple) {
                continue;
            }
            return Err(TableError::UncoveredTuple {
                insn: insn.name.clone(),
                tuple: reg.tuple_name(&tuple),
            });
        }
        if rules.is_empty() {
            return Err(TableError::EmptyTable { insn: insn.name.clone() });
        }

        Ok(LlTable { insn: insn.name.clone(), arity, rules, dropped })
    }

    pub fn rules(&self) -> &[LlRule] {
        &self.rules
    }

    pub fn is_dropped(&self, rts: &[RepTypeId]) -> bool {
        self.dropped.contains(rts)
    }
}
