//! Shared data model for the tagsel generator: the interned representation
//! type registry, high- and low-level rule tables, the operand-specification
//! overlay, and the TOML definition-file schema.

pub mod def;
pub mod error;
pub mod registry;
pub mod rules;

pub use error::{DefError, TableError};
pub use registry::{
    DataType, DataTypeId, HeaderTag, HtId, PrimaryTag, PtId, Registry, RepType, RepTypeId,
};
pub use rules::{
    fold_operand_specs, FoldedInstruction, HlRule, Instruction, LlRule, LlTable, OperandSpecs,
    SpecBehavior, ERROR_ACTION,
};
