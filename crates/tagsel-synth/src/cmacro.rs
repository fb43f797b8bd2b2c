//! C `#define` generation for the tag encoding and per-data-type
//! membership predicates.
//!
//! A separate output from dispatch synthesis: the VM source includes these
//! definitions so that hand-written code (and the naive backend's
//! `is_<datatype>` tests) can ask about tags without knowing the
//! numbering. The membership predicate is minimal in the sense that a
//! representation whose primary tag is unique among all representations is
//! recognized by the primary tag alone, without touching the object
//! header.

use std::fmt::Write;

use tagsel_types::{HtId, PtId, Registry, RepTypeId};

/// `#define` lines for every primary tag and its mask.
pub fn define_ptags(reg: &Registry) -> String {
    let mut out = String::new();
    for id in reg.pt_ids() {
        let pt = reg.pt(id);
        let _ = writeln!(out, "#define {} {}", pt.name, pt.value);
        let _ = writeln!(out, "#define {}_MASK 0x{:x}", pt.name, (1u32 << pt.bits) - 1);
    }
    out
}

/// `#define` lines for every header tag.
pub fn define_htags(reg: &Registry) -> String {
    let mut out = String::new();
    for id in reg.ht_ids() {
        let ht = reg.ht(id);
        let _ = writeln!(out, "#define {} {}", ht.name, ht.value);
    }
    out
}

/// The minimal C test (over a value `x`) for membership of `dts` within
/// the universe `among`.
pub fn minimum_representation(reg: &Registry, dts: &[RepTypeId], among: &[RepTypeId]) -> String {
    assert!(
        dts.iter().all(|rt| among.contains(rt)),
        "membership test over types outside the universe"
    );
    if among.len() == 1 {
        return "1".to_string();
    }

    let mut unique: Vec<PtId> = Vec::new();
    let mut common: Vec<PtId> = Vec::new();
    let mut hts: Vec<HtId> = Vec::new();
    for &rt in dts {
        let pt = reg.rep_pt(rt);
        if reg.has_unique_pt(rt, among) {
            if !unique.contains(&pt) {
                unique.push(pt);
            }
        } else {
            if !common.contains(&pt) {
                common.push(pt);
            }
            if let Some(ht) = reg.rep_ht(rt) {
                if !hts.contains(&ht) {
                    hts.push(ht);
                }
            }
        }
    }

    let mut out = String::from("(((0");
    for pt in &common {
        let name = &reg.pt(*pt).name;
        let _ = write!(out, " || (((x) & {name}_MASK) == {name})");
    }
    out.push_str(") && (0");
    for ht in &hts {
        let name = &reg.ht(*ht).name;
        let _ = write!(out, " || (obj_header_tag(x) == {name})");
    }
    out.push_str("))");
    for pt in &unique {
        let name = &reg.pt(*pt).name;
        let _ = write!(out, " || (((x) & {name}_MASK) == {name})");
    }
    out.push(')');
    out
}

/// `#define is_<datatype>(x) <test>` for every data type.
pub fn define_datatype_predicates(reg: &Registry) -> String {
    let all: Vec<RepTypeId> = reg.reptype_ids().collect();
    let mut out = String::new();
    for id in reg.datatype_ids() {
        let dt = reg.datatype(id);
        let test = minimum_representation(reg, &dt.reptypes, &all);
        let _ = writeln!(out, "#define is_{}(x) {}", dt.name, test);
    }
    out
}
