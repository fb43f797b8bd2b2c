//! TOML definition-file schema and loaders.
//!
//! Three inputs drive a generation run: a type-definition file describing
//! the VM's representation and data types, an instruction-definition file
//! with the dispatch rules, and an optional operand-specification file.
//! Rules arrive with their conditions already in disjunctive form (a list
//! of data-type tuples per action); the richer rule-expression language and
//! its normalizer live in front of this boundary.

use std::rc::Rc;

use serde::Deserialize;

use crate::error::DefError;
use crate::registry::{DataTypeId, Registry};
use crate::rules::{HlRule, Instruction, OperandSpecs, SpecBehavior};

/// Schema of the type-definition file.
#[derive(Debug, Deserialize)]
pub struct TypeDefFile {
    #[serde(default)]
    pub reptype: Vec<RepTypeDef>,
    #[serde(default)]
    pub datatype: Vec<DataTypeDef>,
}

#[derive(Debug, Deserialize)]
pub struct RepTypeDef {
    pub name: String,
    pub ptag: PtagDef,
    pub htag: Option<HtagDef>,
    #[serde(rename = "struct")]
    pub struct_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PtagDef {
    pub name: String,
    pub value: u32,
    pub bits: u32,
}

#[derive(Debug, Deserialize)]
pub struct HtagDef {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Deserialize)]
pub struct DataTypeDef {
    pub name: String,
    pub reptypes: Vec<String>,
}

impl TypeDefFile {
    pub fn parse(text: &str) -> Result<Self, DefError> {
        toml::from_str(text).map_err(|e| DefError::Parse { message: e.to_string() })
    }

    /// Intern every definition into a fresh registry.
    pub fn build(&self) -> Result<Registry, DefError> {
        let mut reg = Registry::new();
        for rt in &self.reptype {
            let pt = reg.intern_pt(&rt.ptag.name, rt.ptag.value, rt.ptag.bits)?;
            let ht = match &rt.htag {
                Some(h) => Some(reg.intern_ht(&h.name, h.value)?),
                None => None,
            };
            reg.define_reptype(&rt.name, pt, ht, rt.struct_name.clone())?;
        }
        for dt in &self.datatype {
            let members: Vec<&str> = dt.reptypes.iter().map(String::as_str).collect();
            reg.define_datatype(&dt.name, &members)?;
        }
        Ok(reg)
    }
}

/// Schema of the instruction-definition file.
#[derive(Debug, Deserialize)]
pub struct InsnFile {
    #[serde(default)]
    pub insn: Vec<InsnDef>,
}

#[derive(Debug, Deserialize)]
pub struct InsnDef {
    pub name: String,
    pub operands: Vec<String>,
    pub prologue: Option<String>,
    pub epilogue: Option<String>,
    #[serde(default)]
    pub rule: Vec<RuleDef>,
}

#[derive(Debug, Deserialize)]
pub struct RuleDef {
    /// Disjunction of data-type tuples, one entry per operand.
    pub when: Vec<Vec<String>>,
    pub action: String,
}

impl InsnFile {
    pub fn parse(text: &str) -> Result<Self, DefError> {
        toml::from_str(text).map_err(|e| DefError::Parse { message: e.to_string() })
    }

    /// Resolve data-type names against the registry.
    pub fn build(&self, reg: &Registry) -> Result<Vec<Instruction>, DefError> {
        let mut out = Vec::with_capacity(self.insn.len());
        for def in &self.insn {
            let arity = def.operands.len();
            if arity == 0 || arity > 2 {
                return Err(DefError::BadArity { insn: def.name.clone(), arity });
            }
            let mut rules = Vec::with_capacity(def.rule.len());
            for (id, rule) in def.rule.iter().enumerate() {
                let mut when = Vec::with_capacity(rule.when.len());
                for tuple in &rule.when {
                    if tuple.len() != arity {
                        return Err(DefError::BadTupleArity {
                            insn: def.name.clone(),
                            expected: arity,
                            found: tuple.len(),
                        });
                    }
                    let mut dts = Vec::with_capacity(arity);
                    for name in tuple {
                        let dt = reg
                            .lookup_datatype(name)
                            .ok_or_else(|| DefError::UnknownDataType { name: name.clone() })?;
                        dts.push(dt);
                    }
                    when.push(dts);
                }
                rules.push(Rc::new(HlRule { id, when, action: rule.action.clone() }));
            }
            out.push(Instruction {
                name: def.name.clone(),
                operands: def.operands.clone(),
                prologue: def.prologue.clone(),
                epilogue: def.epilogue.clone(),
                rules,
            });
        }
        Ok(out)
    }
}

/// Schema of the operand-specification file.
#[derive(Debug, Deserialize)]
pub struct OperandSpecFile {
    #[serde(default)]
    pub spec: Vec<SpecDef>,
}

#[derive(Debug, Deserialize)]
pub struct SpecDef {
    pub insn: String,
    /// One data-type name per operand; `"*"` matches any data type.
    pub operands: Vec<String>,
    pub behavior: String,
}

impl OperandSpecFile {
    pub fn parse(text: &str) -> Result<Self, DefError> {
        toml::from_str(text).map_err(|e| DefError::Parse { message: e.to_string() })
    }

    pub fn build(&self, reg: &Registry) -> Result<OperandSpecs, DefError> {
        let mut specs = OperandSpecs::new();
        for def in &self.spec {
            let behavior = match def.behavior.as_str() {
                "accept" => SpecBehavior::Accept,
                "error" => SpecBehavior::Error,
                "unspecified" => SpecBehavior::Unspecified,
                other => return Err(DefError::BadBehavior { found: other.to_string() }),
            };
            let mut pattern: Vec<Option<DataTypeId>> = Vec::with_capacity(def.operands.len());
            for name in &def.operands {
                if name == "*" {
                    pattern.push(None);
                } else {
                    let dt = reg
                        .lookup_datatype(name)
                        .ok_or_else(|| DefError::UnknownDataType { name: name.clone() })?;
                    pattern.push(Some(dt));
                }
            }
            specs.push(&def.insn, pattern, behavior);
        }
        Ok(specs)
    }
}
