//! Shared fixtures for the integration tests.

// Each test binary uses a different slice of these helpers.
#![allow(dead_code)]

use std::rc::Rc;

use tagsel_types::{
    fold_operand_specs, DataTypeId, FoldedInstruction, HlRule, Instruction, LlTable, OperandSpecs,
    Registry,
};

/// Scenario registry: two immediates plus one heap representation.
pub fn small_registry() -> Registry {
    let mut reg = Registry::new();
    let pt_int = reg.intern_pt("PT_INT", 0, 2).unwrap();
    let pt_float = reg.intern_pt("PT_FLOAT", 1, 2).unwrap();
    let pt_heap = reg.intern_pt("PT_HEAP", 2, 2).unwrap();
    let ht_string = reg.intern_ht("HT_STRING", 1).unwrap();
    reg.define_reptype("int32", pt_int, None, None).unwrap();
    reg.define_reptype("float64", pt_float, None, None).unwrap();
    reg.define_reptype("ptr", pt_heap, Some(ht_string), Some("string_object".into())).unwrap();
    reg.define_datatype("int32", &["int32"]).unwrap();
    reg.define_datatype("float64", &["float64"]).unwrap();
    reg.define_datatype("ptr", &["ptr"]).unwrap();
    reg
}

/// Just the two immediates, for tables quantified over numbers alone.
pub fn numeric_registry() -> Registry {
    let mut reg = Registry::new();
    let pt_int = reg.intern_pt("PT_INT", 0, 2).unwrap();
    let pt_float = reg.intern_pt("PT_FLOAT", 1, 2).unwrap();
    reg.define_reptype("int32", pt_int, None, None).unwrap();
    reg.define_reptype("float64", pt_float, None, None).unwrap();
    reg.define_datatype("int32", &["int32"]).unwrap();
    reg.define_datatype("float64", &["float64"]).unwrap();
    reg
}

/// A richer system: polymorphic string datatype (two header-tagged heap
/// representations), an array type, and a two-representation number type.
pub fn full_registry() -> Registry {
    let mut reg = Registry::new();
    let pt_fix = reg.intern_pt("T_FIXNUM", 0, 3).unwrap();
    let pt_flo = reg.intern_pt("T_FLONUM", 1, 3).unwrap();
    let pt_gen = reg.intern_pt("T_GENERIC", 4, 3).unwrap();
    let ht_str = reg.intern_ht("HTAG_STRING", 1).unwrap();
    let ht_rope = reg.intern_ht("HTAG_ROPE", 2).unwrap();
    let ht_arr = reg.intern_ht("HTAG_ARRAY", 3).unwrap();
    reg.define_reptype("fixnum", pt_fix, None, None).unwrap();
    reg.define_reptype("flonum", pt_flo, None, None).unwrap();
    reg.define_reptype("normal_string", pt_gen, Some(ht_str), Some("string_cell".into()))
        .unwrap();
    reg.define_reptype("rope_string", pt_gen, Some(ht_rope), Some("rope_cell".into())).unwrap();
    reg.define_reptype("array", pt_gen, Some(ht_arr), Some("array_cell".into())).unwrap();
    reg.define_datatype("number", &["fixnum", "flonum"]).unwrap();
    reg.define_datatype("string", &["normal_string", "rope_string"]).unwrap();
    reg.define_datatype("array", &["array"]).unwrap();
    reg
}

pub fn rule(reg: &Registry, when: &[&[&str]], action: &str) -> (Vec<Vec<DataTypeId>>, String) {
    let when = when
        .iter()
        .map(|tuple| {
            tuple.iter().map(|name| reg.lookup_datatype(name).expect("datatype")).collect()
        })
        .collect();
    (when, action.to_string())
}

pub fn instruction(
    name: &str,
    operands: &[&str],
    rules: &[(Vec<Vec<DataTypeId>>, String)],
) -> Instruction {
    Instruction {
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
    }
}

pub fn fold(reg: &Registry, insn: &Instruction) -> FoldedInstruction {
    fold_operand_specs(insn, &OperandSpecs::new(), reg)
}

pub fn table(reg: &Registry, insn: &FoldedInstruction) -> LlTable {
    LlTable::expand(insn, reg).expect("table invariants")
}

/// The total `add` table over [`full_registry`]: a fast number path, a
/// string path for anything involving a string, and a slow remainder.
pub fn full_add(reg: &Registry) -> Instruction {
    instruction(
        "add",
        &["v1", "v2"],
        &[
            rule(reg, &[&["number", "number"]], "dst = num_add(v1, v2);"),
            rule(
                reg,
                &[
                    &["number", "string"],
                    &["string", "number"],
                    &["string", "string"],
                    &["string", "array"],
                    &["array", "string"],
                ],
                "dst = str_concat(to_string(v1), to_string(v2));",
            ),
            rule(
                reg,
                &[&["number", "array"], &["array", "number"], &["array", "array"]],
                "dst = slow_add(v1, v2);",
            ),
        ],
    )
}
