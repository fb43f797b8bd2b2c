//! Shared helpers for the crate's unit tests.

use std::rc::Rc;

use tagsel_types::{
    fold_operand_specs, DataTypeId, FoldedInstruction, HlRule, Instruction, LlTable, OperandSpecs,
    Registry,
};

/// A small but representative type system: two immediate number
/// representations with their own primary tags, and two heap
/// representations sharing one primary tag behind header tags.
pub fn number_string_registry() -> Registry {
    let mut reg = Registry::new();
    let pt_fix = reg.intern_pt("T_FIXNUM", 0, 3).unwrap();
    let pt_flo = reg.intern_pt("T_FLONUM", 1, 3).unwrap();
    let pt_gen = reg.intern_pt("T_GENERIC", 4, 3).unwrap();
    let ht_str = reg.intern_ht("HTAG_STRING", 1).unwrap();
    reg.define_reptype("fixnum", pt_fix, None, None).unwrap();
    reg.define_reptype("flonum", pt_flo, None, None).unwrap();
    reg.define_reptype("normal_string", pt_gen, Some(ht_str), Some("string_cell".into()))
        .unwrap();
    reg.define_datatype("number", &["fixnum", "flonum"]).unwrap();
    reg.define_datatype("string", &["normal_string"]).unwrap();
    reg
}

/// Like [`number_string_registry`], with a second heap representation so
/// header-tag dispatch has a real choice.
pub fn heap_heavy_registry() -> Registry {
    let mut reg = number_string_registry();
    let pt_gen = reg.intern_pt("T_GENERIC", 4, 3).unwrap();
    let ht_arr = reg.intern_ht("HTAG_ARRAY", 2).unwrap();
    reg.define_reptype("array", pt_gen, Some(ht_arr), Some("array_cell".into())).unwrap();
    reg.define_datatype("array", &["array"]).unwrap();
    reg
}

/// Build one rule body: a disjunction of data-type tuples plus action text.
pub fn rule(reg: &Registry, when: &[&[&str]], action: &str) -> (Vec<Vec<DataTypeId>>, String) {
    let when = when
        .iter()
        .map(|tuple| {
            tuple
                .iter()
                .map(|name| reg.lookup_datatype(name).expect("datatype"))
                .collect()
        })
        .collect();
    (when, action.to_string())
}

/// Assemble an instruction from rule bodies (ids assigned in order) and
/// fold an empty operand specification into it.
pub fn fold(
    reg: &Registry,
    name: &str,
    operands: &[&str],
    rules: &[(Vec<Vec<DataTypeId>>, String)],
) -> FoldedInstruction {
    let insn = Instruction {
        name: name.to_string(),
        operands: operands.iter().map(|s| s.to_string()).collect(),
        prologue: None,
        epilogue: None,
        rules: rules
            .iter()
            .enumerate()
            .map(|(id, (when, action))| {
                Rc::new(HlRule { id, when: when.clone(), action: action.clone() })
            })
            .collect(),
    };
    fold_operand_specs(&insn, &OperandSpecs::new(), reg)
}

pub fn table_for(insn: &FoldedInstruction, reg: &Registry) -> LlTable {
    LlTable::expand(insn, reg).expect("table invariants")
}
