//! Runtime type descriptors ("modes") and their storage layout.
//!
//! Modes are interned structurally, so two structurally equal modes share one
//! [`ModeId`] and mode equality is id equality.

use indexmap::IndexSet;

use crate::symbol::{Symbol, SymbolTable};

/// Size of the status byte that prefixes every scalar, reference and row value.
pub const STATUS_SIZE: usize = 1;
/// Segment tag plus 64-bit offset.
pub const ADDRESS_SIZE: usize = 9;
pub const REF_SIZE: usize = STATUS_SIZE + ADDRESS_SIZE;
pub const INT_SIZE: usize = STATUS_SIZE + 8;
pub const LONG_INT_SIZE: usize = STATUS_SIZE + 16;
pub const REAL_SIZE: usize = STATUS_SIZE + 8;
pub const BOOL_SIZE: usize = STATUS_SIZE + 1;
pub const CHAR_SIZE: usize = STATUS_SIZE + 4;
pub const BITS_SIZE: usize = STATUS_SIZE + 8;
/// Status, procedure kind, registry index.
pub const PROC_SIZE: usize = STATUS_SIZE + 1 + 4;
/// Status and the mode id of the united value.
pub const UNION_HEADER_SIZE: usize = STATUS_SIZE + 4;

/// Handle to an interned mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeId(pub(crate) u32);

impl ModeId {
    pub const VOID: ModeId = ModeId(0);
    pub const INT: ModeId = ModeId(1);
    pub const LONG_INT: ModeId = ModeId(2);
    pub const REAL: ModeId = ModeId(3);
    pub const LONG_REAL: ModeId = ModeId(4);
    pub const BOOL: ModeId = ModeId(5);
    pub const CHAR: ModeId = ModeId(6);
    pub const BITS: ModeId = ModeId(7);
    /// Mode of `NIL`; identity-compatible with every reference mode.
    pub const NIL: ModeId = ModeId(8);
    /// Any row mode; only used as an operator parameter.
    pub const ROWS: ModeId = ModeId(9);
    pub const STRING: ModeId = ModeId(10);

    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: Symbol,
    pub mode: ModeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mode {
    Void,
    Int,
    LongInt,
    Real,
    LongReal,
    Bool,
    Char,
    Bits,
    Nil,
    Rows,
    Ref(ModeId),
    Row { dims: usize, element: ModeId },
    Struct(Vec<Field>),
    Union(Vec<ModeId>),
    Proc { params: Vec<ModeId>, result: ModeId },
}

#[derive(Debug)]
pub struct ModeTable {
    modes: IndexSet<Mode>,
}

impl Default for ModeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeTable {
    pub fn new() -> Self {
        let mut table = Self {
            modes: IndexSet::new(),
        };
        for mode in [
            Mode::Void,
            Mode::Int,
            Mode::LongInt,
            Mode::Real,
            Mode::LongReal,
            Mode::Bool,
            Mode::Char,
            Mode::Bits,
            Mode::Nil,
            Mode::Rows,
        ] {
            table.intern(mode);
        }
        let string = table.row_of(1, ModeId::CHAR);
        debug_assert_eq!(string, ModeId::STRING);
        table
    }

    pub fn intern(&mut self, mode: Mode) -> ModeId {
        let (index, _) = self.modes.insert_full(mode);
        ModeId(index as u32)
    }

    pub fn get(&self, id: ModeId) -> &Mode {
        self.modes.get_index(id.0 as usize).unwrap_or(&Mode::Void)
    }

    pub fn ref_to(&mut self, mode: ModeId) -> ModeId {
        self.intern(Mode::Ref(mode))
    }

    pub fn row_of(&mut self, dims: usize, element: ModeId) -> ModeId {
        self.intern(Mode::Row { dims, element })
    }

    pub fn proc_of(&mut self, params: Vec<ModeId>, result: ModeId) -> ModeId {
        self.intern(Mode::Proc { params, result })
    }

    pub fn struct_of(&mut self, fields: Vec<Field>) -> ModeId {
        self.intern(Mode::Struct(fields))
    }

    pub fn union_of(&mut self, members: Vec<ModeId>) -> ModeId {
        self.intern(Mode::Union(members))
    }

    pub fn is_ref(&self, id: ModeId) -> bool {
        matches!(self.get(id), Mode::Ref(_))
    }

    pub fn is_struct(&self, id: ModeId) -> bool {
        matches!(self.get(id), Mode::Struct(_))
    }

    pub fn is_union(&self, id: ModeId) -> bool {
        matches!(self.get(id), Mode::Union(_))
    }

    pub fn is_row(&self, id: ModeId) -> bool {
        matches!(self.get(id), Mode::Row { .. })
    }

    /// Structured and row modes occupy aggregate storage.
    pub fn is_stowed(&self, id: ModeId) -> bool {
        self.is_struct(id) || self.is_row(id)
    }

    pub fn deref(&self, id: ModeId) -> Option<ModeId> {
        match self.get(id) {
            Mode::Ref(sub) => Some(*sub),
            _ => None,
        }
    }

    pub fn ref_depth(&self, mut id: ModeId) -> usize {
        let mut depth = 0;
        while let Some(sub) = self.deref(id) {
            depth += 1;
            id = sub;
        }
        depth
    }

    pub fn members(&self, id: ModeId) -> &[Field] {
        match self.get(id) {
            Mode::Struct(fields) => fields,
            _ => &[],
        }
    }

    pub fn union_members(&self, id: ModeId) -> &[ModeId] {
        match self.get(id) {
            Mode::Union(members) => members,
            _ => &[],
        }
    }

    pub fn proc_signature(&self, id: ModeId) -> Option<(&[ModeId], ModeId)> {
        match self.get(id) {
            Mode::Proc { params, result } => Some((params, *result)),
            _ => None,
        }
    }

    pub fn row_shape(&self, id: ModeId) -> Option<(usize, ModeId)> {
        match self.get(id) {
            Mode::Row { dims, element } => Some((*dims, *element)),
            _ => None,
        }
    }

    /// Finds `name` among the members of a structured mode, returning its byte
    /// offset within the structure and its mode.
    pub fn field(&self, id: ModeId, name: Symbol) -> Option<(usize, ModeId)> {
        let mut offset = 0;
        for field in self.members(id) {
            if field.name == name {
                return Some((offset, field.mode));
            }
            offset += self.size(field.mode);
        }
        None
    }

    /// Whether a parameter of mode `param` takes an argument of mode `actual`
    /// without further coercion.
    pub fn accepts(&self, param: ModeId, actual: ModeId) -> bool {
        param == actual || (param == ModeId::ROWS && self.is_row(actual))
    }

    pub fn size(&self, id: ModeId) -> usize {
        match self.get(id) {
            Mode::Void | Mode::Rows => 0,
            Mode::Int => INT_SIZE,
            Mode::LongInt => LONG_INT_SIZE,
            Mode::Real | Mode::LongReal => REAL_SIZE,
            Mode::Bool => BOOL_SIZE,
            Mode::Char => CHAR_SIZE,
            Mode::Bits => BITS_SIZE,
            Mode::Nil | Mode::Ref(_) | Mode::Row { .. } => REF_SIZE,
            Mode::Proc { .. } => PROC_SIZE,
            Mode::Struct(fields) => fields.iter().map(|field| self.size(field.mode)).sum(),
            Mode::Union(members) => {
                UNION_HEADER_SIZE
                    + members
                        .iter()
                        .map(|member| self.size(*member))
                        .max()
                        .unwrap_or(0)
            }
        }
    }

    pub fn describe(&self, id: ModeId, symbols: &SymbolTable) -> String {
        if id == ModeId::STRING {
            return "STRING".to_string();
        }
        match self.get(id) {
            Mode::Void => "VOID".into(),
            Mode::Int => "INT".into(),
            Mode::LongInt => "LONG INT".into(),
            Mode::Real => "REAL".into(),
            Mode::LongReal => "LONG REAL".into(),
            Mode::Bool => "BOOL".into(),
            Mode::Char => "CHAR".into(),
            Mode::Bits => "BITS".into(),
            Mode::Nil => "NIL".into(),
            Mode::Rows => "ROWS".into(),
            Mode::Ref(sub) => format!("REF {}", self.describe(*sub, symbols)),
            Mode::Row { dims, element } => format!(
                "[{}] {}",
                ",".repeat(dims.saturating_sub(1)),
                self.describe(*element, symbols)
            ),
            Mode::Struct(fields) => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|field| {
                        format!(
                            "{} {}",
                            self.describe(field.mode, symbols),
                            symbols.name(field.name)
                        )
                    })
                    .collect();
                format!("STRUCT ({})", fields.join(", "))
            }
            Mode::Union(members) => {
                let members: Vec<String> = members
                    .iter()
                    .map(|member| self.describe(*member, symbols))
                    .collect();
                format!("UNION ({})", members.join(", "))
            }
            Mode::Proc { params, result } => {
                let result = self.describe(*result, symbols);
                if params.is_empty() {
                    format!("PROC {result}")
                } else {
                    let params: Vec<String> = params
                        .iter()
                        .map(|param| self.describe(*param, symbols))
                        .collect();
                    format!("PROC ({}) {result}", params.join(", "))
                }
            }
        }
    }
}
