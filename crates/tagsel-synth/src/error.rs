use std::fmt;

use serde::Serialize;

use tagsel_types::TableError;

/// A fatal synthesis failure. There is no recovery path: either the input
/// table is inconsistent or an optimization pass broke the diagram, and in
/// both cases emitting dispatch code would be wrong.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SynthError {
    /// The rule table violated its invariants.
    Table(TableError),
    /// The diagram answered a tuple differently from the rule table after
    /// an optimization pass: a soundness bug, surfaced instead of emitted.
    OracleMismatch {
        insn: String,
        tuple: String,
        expected: String,
        found: Option<String>,
    },
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(err) => err.fmt(f),
            Self::OracleMismatch { insn, tuple, expected, found } => match found {
                Some(found) => write!(
                    f,
                    "instruction `{insn}`: diagram answers {tuple} with `{found}`, \
                     rule table says `{expected}`"
                ),
                None => write!(
                    f,
                    "instruction `{insn}`: diagram has no answer for {tuple} \
                     (rule table says `{expected}`)"
                ),
            },
        }
    }
}

impl std::error::Error for SynthError {}

impl From<TableError> for SynthError {
    fn from(err: TableError) -> Self {
        SynthError::Table(err)
    }
}
