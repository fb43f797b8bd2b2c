use std::fmt;

use serde::Serialize;

/// An error in the type or instruction definition inputs.
///
/// Every variant is fatal for the whole run: an inconsistent definition
/// means the tag encoding itself cannot be trusted, so no code is generated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DefError {
    /// A primary tag was defined twice with a different value or bit width.
    PrimaryTagRedefined { name: String },
    /// A header tag was defined twice with a different value.
    HeaderTagRedefined { name: String },
    /// A representation type was defined twice.
    RepTypeRedefined { name: String },
    /// A data type was defined twice.
    DataTypeRedefined { name: String },
    /// A data type was defined with no representation types.
    EmptyDataType { name: String },
    /// A name referred to a representation type that does not exist.
    UnknownRepType { name: String },
    /// A name referred to a data type that does not exist.
    UnknownDataType { name: String },
    /// An instruction declared an unsupported number of dispatch operands.
    BadArity { insn: String, arity: usize },
    /// A rule or specification tuple did not match the instruction's arity.
    BadTupleArity { insn: String, expected: usize, found: usize },
    /// An unrecognized behavior keyword in an operand specification.
    BadBehavior { found: String },
    /// A definition file could not be parsed.
    Parse { message: String },
}

impl fmt::Display for DefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryTagRedefined { name } => {
                write!(f, "primary tag `{name}` is defined twice inconsistently")
            }
            Self::HeaderTagRedefined { name } => {
                write!(f, "header tag `{name}` is defined twice inconsistently")
            }
            Self::RepTypeRedefined { name } => {
                write!(f, "representation type `{name}` is defined twice")
            }
            Self::DataTypeRedefined { name } => {
                write!(f, "data type `{name}` is defined twice")
            }
            Self::EmptyDataType { name } => {
                write!(f, "data type `{name}` has no representation types")
            }
            Self::UnknownRepType { name } => {
                write!(f, "unknown representation type: {name}")
            }
            Self::UnknownDataType { name } => write!(f, "unknown data type: {name}"),
            Self::BadArity { insn, arity } => {
                write!(f, "instruction `{insn}` has {arity} dispatch operands (1 or 2 supported)")
            }
            Self::BadTupleArity { insn, expected, found } => write!(
                f,
                "instruction `{insn}`: rule tuple has {found} types, expected {expected}"
            ),
            Self::BadBehavior { found } => {
                write!(f, "unknown operand behavior `{found}` (accept, error, unspecified)")
            }
            Self::Parse { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for DefError {}

/// A violation of the rule-table invariants for one instruction.
///
/// The table handed to the synthesizer must cover every reachable tuple of
/// representation types exactly once. A gap or an overlap indicates a broken
/// rule definition and must stop code generation for that instruction rather
/// than silently default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableError {
    /// A reachable representation tuple is covered by no rule.
    UncoveredTuple { insn: String, tuple: String },
    /// A representation tuple is covered by more than one rule.
    DuplicateTuple { insn: String, tuple: String },
    /// Representation types sharing one primary tag disagree on whether a
    /// header tag exists, so no consistent dispatch test can be built.
    HeaderTagMix { insn: String, tuple: String },
    /// The instruction's table is empty after overlay filtering.
    EmptyTable { insn: String },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UncoveredTuple { insn, tuple } => {
                write!(f, "instruction `{insn}`: operand tuple {tuple} is not covered by any rule")
            }
            Self::DuplicateTuple { insn, tuple } => {
                write!(f, "instruction `{insn}`: operand tuple {tuple} is covered by two rules")
            }
            Self::HeaderTagMix { insn, tuple } => write!(
                f,
                "instruction `{insn}`: tuple {tuple} mixes header-tagged and untagged \
                 representations under one primary tag"
            ),
            Self::EmptyTable { insn } => {
                write!(f, "instruction `{insn}`: no dispatch rules remain after filtering")
            }
        }
    }
}

impl std::error::Error for TableError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn def_error_display() {
        let err = DefError::PrimaryTagRedefined { name: "T_FIXNUM".into() };
        assert_eq!(err.to_string(), "primary tag `T_FIXNUM` is defined twice inconsistently");
    }

    #[test]
    fn table_error_display() {
        let err = TableError::UncoveredTuple {
            insn: "add".into(),
            tuple: "(flonum, fixnum)".into(),
        };
        assert_eq!(
            err.to_string(),
            "instruction `add`: operand tuple (flonum, fixnum) is not covered by any rule"
        );
    }
}
