//! The naive backend: one membership test per rule, no decision diagram.
//!
//! Emits a chain of `if (is_<datatype>(v) && ...)` tests in rule order,
//! with the disjunction of a rule's tuples OR-ed together. Slower than the
//! switch dispatch and larger for wide tables, but trivially auditable;
//! kept as the comparison baseline. The predicates are the ones generated
//! by [`crate::cmacro::define_datatype_predicates`].

use std::fmt::Write;

use tagsel_types::{FoldedInstruction, LlTable, Registry, ERROR_ACTION};

use crate::config::Config;
use crate::emit::dedent;
use crate::error::SynthError;
use crate::Synthesiser;

pub struct SimpleSynthesiser;

impl Synthesiser for SimpleSynthesiser {
    fn dispatch_code(
        &self,
        insn: &FoldedInstruction,
        reg: &Registry,
        _cfg: &Config,
    ) -> Result<String, SynthError> {
        // The naive backend never dispatches on a tuple the table does not
        // answer, but a broken table must still stop generation.
        LlTable::expand(insn, reg)?;

        let mut out = String::new();
        for (i, rule) in insn.rules.iter().enumerate() {
            let condition = rule
                .when
                .iter()
                .map(|tuple| {
                    let tests: Vec<String> = tuple
                        .iter()
                        .zip(&insn.operands)
                        .map(|(dt, var)| format!("is_{}({})", reg.datatype(*dt).name, var))
                        .collect();
                    format!("({})", tests.join(" && "))
                })
                .collect::<Vec<String>>()
                .join(" || ");
            if i == 0 {
                let _ = writeln!(out, "if ({condition}) {{");
            } else {
                let _ = writeln!(out, "}} else if ({condition}) {{");
            }
            for line in dedent(&rule.action) {
                if line.is_empty() {
                    out.push('\n');
                } else {
                    let _ = writeln!(out, "    {line}");
                }
            }
        }
        let _ = writeln!(out, "}} else {{");
        let _ = writeln!(out, "    {ERROR_ACTION}");
        let _ = writeln!(out, "}}");
        Ok(out)
    }
}
