//! Interned model of the VM's runtime value representations.
//!
//! A value carries a small primary tag inline; representations that share a
//! primary tag are disambiguated by a secondary header tag stored in the
//! object header. The registry interns all of it once, up front, and is
//! read-only for the rest of the run. Ids are indices in first-definition
//! order, and that order is the only ordering key used anywhere downstream,
//! so two runs over the same definitions produce identical output.

use rustc_hash::FxHashMap;

use crate::error::DefError;

/// Interned primary tag, ordered by definition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PtId(pub u32);

/// Interned header tag, ordered by definition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HtId(pub u32);

/// Interned representation type, ordered by definition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepTypeId(pub u32);

/// Interned language-level data type, ordered by definition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataTypeId(pub u32);

/// A primary tag: the bit pattern carried inline with a value.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryTag {
    pub name: String,
    pub value: u32,
    pub bits: u32,
}

/// A header tag: the secondary discriminator for values sharing one
/// primary tag.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderTag {
    pub name: String,
    pub value: u32,
}

/// One concrete runtime shape: a primary tag plus an optional header tag.
#[derive(Debug, Clone, PartialEq)]
pub struct RepType {
    pub name: String,
    pub pt: PtId,
    pub ht: Option<HtId>,
    /// C struct name backing heap representations, if any.
    pub struct_name: Option<String>,
}

/// A user-visible data type, backed by one or more representation types.
#[derive(Debug, Clone, PartialEq)]
pub struct DataType {
    pub name: String,
    pub reptypes: Vec<RepTypeId>,
}

/// Write-once intern tables for tags, representation types, and data types.
///
/// Built once from the type-definition input before any instruction is
/// synthesized, then treated as immutable.
#[derive(Debug, Default)]
pub struct Registry {
    pts: Vec<PrimaryTag>,
    pt_by_name: FxHashMap<String, PtId>,
    hts: Vec<HeaderTag>,
    ht_by_name: FxHashMap<String, HtId>,
    reptypes: Vec<RepType>,
    reptype_by_name: FxHashMap<String, RepTypeId>,
    datatypes: Vec<DataType>,
    datatype_by_name: FxHashMap<String, DataTypeId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a primary tag. Re-interning the same name with the same
    /// encoding returns the existing id; a different encoding is fatal.
    pub fn intern_pt(&mut self, name: &str, value: u32, bits: u32) -> Result<PtId, DefError> {
        if let Some(&id) = self.pt_by_name.get(name) {
            let pt = &self.pts[id.0 as usize];
            if pt.value != value || pt.bits != bits {
                return Err(DefError::PrimaryTagRedefined { name: name.to_string() });
            }
            return Ok(id);
        }
        let id = PtId(self.pts.len() as u32);
        self.pts.push(PrimaryTag { name: name.to_string(), value, bits });
        self.pt_by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Intern a header tag. Same redefinition rules as [`Self::intern_pt`].
    pub fn intern_ht(&mut self, name: &str, value: u32) -> Result<HtId, DefError> {
        if let Some(&id) = self.ht_by_name.get(name) {
            if self.hts[id.0 as usize].value != value {
                return Err(DefError::HeaderTagRedefined { name: name.to_string() });
            }
            return Ok(id);
        }
        let id = HtId(self.hts.len() as u32);
        self.hts.push(HeaderTag { name: name.to_string(), value });
        self.ht_by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Define a representation type. Defining the same name twice is fatal.
    pub fn define_reptype(
        &mut self,
        name: &str,
        pt: PtId,
        ht: Option<HtId>,
        struct_name: Option<String>,
    ) -> Result<RepTypeId, DefError> {
        if self.reptype_by_name.contains_key(name) {
            return Err(DefError::RepTypeRedefined { name: name.to_string() });
        }
        let id = RepTypeId(self.reptypes.len() as u32);
        self.reptypes.push(RepType { name: name.to_string(), pt, ht, struct_name });
        self.reptype_by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Define a data type over previously defined representation types.
    pub fn define_datatype(&mut self, name: &str, reptypes: &[&str]) -> Result<DataTypeId, DefError> {
        if self.datatype_by_name.contains_key(name) {
            return Err(DefError::DataTypeRedefined { name: name.to_string() });
        }
        if reptypes.is_empty() {
            return Err(DefError::EmptyDataType { name: name.to_string() });
        }
        let mut ids = Vec::with_capacity(reptypes.len());
        for rt in reptypes {
            let id = self
                .reptype_by_name
                .get(*rt)
                .copied()
                .ok_or_else(|| DefError::UnknownRepType { name: rt.to_string() })?;
            ids.push(id);
        }
        let id = DataTypeId(self.datatypes.len() as u32);
        self.datatypes.push(DataType { name: name.to_string(), reptypes: ids });
        self.datatype_by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn pt(&self, id: PtId) -> &PrimaryTag {
        &self.pts[id.0 as usize]
    }

    pub fn ht(&self, id: HtId) -> &HeaderTag {
        &self.hts[id.0 as usize]
    }

    pub fn reptype(&self, id: RepTypeId) -> &RepType {
        &self.reptypes[id.0 as usize]
    }

    pub fn datatype(&self, id: DataTypeId) -> &DataType {
        &self.datatypes[id.0 as usize]
    }

    pub fn lookup_reptype(&self, name: &str) -> Option<RepTypeId> {
        self.reptype_by_name.get(name).copied()
    }

    pub fn lookup_datatype(&self, name: &str) -> Option<DataTypeId> {
        self.datatype_by_name.get(name).copied()
    }

    /// All primary tag ids in definition order.
    pub fn pt_ids(&self) -> impl Iterator<Item = PtId> + '_ {
        (0..self.pts.len() as u32).map(PtId)
    }

    /// All header tag ids in definition order.
    pub fn ht_ids(&self) -> impl Iterator<Item = HtId> + '_ {
        (0..self.hts.len() as u32).map(HtId)
    }

    /// All representation type ids in definition order.
    pub fn reptype_ids(&self) -> impl Iterator<Item = RepTypeId> + '_ {
        (0..self.reptypes.len() as u32).map(RepTypeId)
    }

    /// All data type ids in definition order.
    pub fn datatype_ids(&self) -> impl Iterator<Item = DataTypeId> + '_ {
        (0..self.datatypes.len() as u32).map(DataTypeId)
    }

    /// The primary tag of a representation type.
    pub fn rep_pt(&self, id: RepTypeId) -> PtId {
        self.reptype(id).pt
    }

    /// The header tag of a representation type, if it has one.
    pub fn rep_ht(&self, id: RepTypeId) -> Option<HtId> {
        self.reptype(id).ht
    }

    /// Whether `rt` is the only member of `among` with its primary tag.
    /// Such a representation can be recognized by the primary tag alone.
    pub fn has_unique_pt(&self, rt: RepTypeId, among: &[RepTypeId]) -> bool {
        let pt = self.rep_pt(rt);
        among.iter().all(|&other| other == rt || self.rep_pt(other) != pt)
    }

    /// Render a representation tuple as `(name, name)` for diagnostics.
    pub fn tuple_name(&self, rts: &[RepTypeId]) -> String {
        let names: Vec<&str> =
            rts.iter().map(|&rt| self.reptype(rt).name.as_str()).collect();
        format!("({})", names.join(", "))
    }

    /// Render a data-type tuple as `(name, name)` for diagnostics.
    pub fn dt_tuple_name(&self, dts: &[DataTypeId]) -> String {
        let names: Vec<&str> =
            dts.iter().map(|&dt| self.datatype(dt).name.as_str()).collect();
        format!("({})", names.join(", "))
    }
}
