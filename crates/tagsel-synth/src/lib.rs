//! Decision-diagram synthesis for VM type dispatch.
//!
//! Given the expanded rule table of one instruction, this crate builds a
//! decision tree keyed by an arity-sensitive dispatch plan, coalesces
//! structurally equivalent subtrees (locally between siblings, then across
//! branches at each depth), removes tests that no longer decide anything,
//! and renders the result as nested tag-switch C code. A diagram oracle
//! re-checks the tree against the table after every pass, so an unsound
//! merge stops generation instead of emitting wrong dispatch code.

pub mod builder;
pub mod cmacro;
pub mod compat;
pub mod config;
pub mod emit;
pub mod error;
pub mod merge;
pub mod node;
pub mod plan;
pub mod relative;
pub mod search;
pub mod simple;
pub mod simplify;

#[cfg(test)]
pub(crate) mod testutil;

use std::fmt::Write;

use tagsel_types::{FoldedInstruction, LlTable, Registry};

pub use builder::DecisionDiagram;
pub use config::Config;
pub use emit::Macros;
pub use error::SynthError;
pub use simple::SimpleSynthesiser;

/// A dispatch-code backend: folded instruction in, dispatch body out.
pub trait Synthesiser {
    fn dispatch_code(
        &self,
        insn: &FoldedInstruction,
        reg: &Registry,
        cfg: &Config,
    ) -> Result<String, SynthError>;
}

/// The decision-diagram backend.
#[derive(Default)]
pub struct DiagramSynthesiser {
    pub macros: Macros,
}

impl Synthesiser for DiagramSynthesiser {
    fn dispatch_code(
        &self,
        insn: &FoldedInstruction,
        reg: &Registry,
        cfg: &Config,
    ) -> Result<String, SynthError> {
        let table = LlTable::expand(insn, reg)?;
        let dd = synthesise_diagram(&table, reg, cfg)?;
        Ok(dd.generate(reg, cfg, &self.macros, &insn.operands))
    }
}

/// Run the full optimization pipeline over one rule table: build, local
/// merge, cross-branch merge, simplify. With `verify_diagram` set, the
/// oracle re-checks the tree against the table after every step.
pub fn synthesise_diagram(
    table: &LlTable,
    reg: &Registry,
    cfg: &Config,
) -> Result<DecisionDiagram, SynthError> {
    let mut dd = DecisionDiagram::build(table, reg, plan::default_plan(cfg.use_tagpair))?;
    if cfg.verify_diagram {
        dd.verify(table, reg)?;
    }
    dd.merge_children(cfg);
    if cfg.verify_diagram {
        dd.verify(table, reg)?;
    }
    if cfg.relative_merge {
        dd.merge_relative(cfg);
        if cfg.verify_diagram {
            dd.verify(table, reg)?;
        }
    }
    dd.skip_no_choice();
    if cfg.verify_diagram {
        dd.verify(table, reg)?;
    }
    Ok(dd)
}

/// Wrap an instruction's dispatch body in its full emitted fragment:
/// prologue, execution-count hook, head label, dispatch code, a dead-code
/// block for actions the overlay filtered out, and epilogue.
pub fn synthesise_instruction(
    synth: &dyn Synthesiser,
    insn: &FoldedInstruction,
    reg: &Registry,
    cfg: &Config,
) -> Result<String, SynthError> {
    let dispatch = synth.dispatch_code(insn, reg, cfg)?;
    let mut out = String::new();
    if let Some(prologue) = &insn.prologue {
        let _ = writeln!(out, "{prologue}");
    }
    let mut count = format!("INSN_COUNT{}({}", insn.arity(), insn.name);
    for var in &insn.operands {
        let _ = write!(count, ", {var}");
    }
    let _ = writeln!(out, "{count});");
    let _ = writeln!(out, "{}_HEAD:", insn.name);
    out.push_str(&dispatch);
    for action in &insn.unused_actions {
        let _ = writeln!(out, "if (0) {{");
        for line in emit::dedent(action) {
            if line.is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, "    {line}");
            }
        }
        let _ = writeln!(out, "}}");
    }
    if let Some(epilogue) = &insn.epilogue {
        let _ = writeln!(out, "{epilogue}");
    }
    Ok(out)
}
