use crate::{
    diagnostics::Diagnostic,
    memory::{status, Address, Memory, RowDescriptor},
    mode::{Mode, ModeId, ModeTable, CHAR_SIZE},
    stdlib::NativeId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    /// A procedure of the standard environment.
    Native(NativeId),
    /// A routine text of the user's program.
    Routine(u32),
}

/// A decoded value. On the value stack and in memory values are raw bytes laid
/// out by their mode; this is the typed view used at operator, native and
/// rendering boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    /// Storage whose status byte lacks the `INIT` bit.
    Undefined,
    Int(i64),
    LongInt(i128),
    Real(f64),
    LongReal(f64),
    Bool(bool),
    Char(char),
    Bits(u64),
    /// `None` is `NIL`.
    Ref(Option<Address>),
    /// Address of the row's descriptor; `None` for a vacant row.
    Row(Option<Address>),
    Proc(Procedure),
    Struct(Vec<Value>),
    Union { mode: ModeId, value: Box<Value> },
}

impl Value {
    pub fn is_defined(&self) -> bool {
        match self {
            Value::Undefined => false,
            Value::Struct(fields) => fields.iter().all(Value::is_defined),
            Value::Union { value, .. } => value.is_defined(),
            _ => true,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::LongInt(n) => Some(*n as f64),
            Value::Real(x) | Value::LongReal(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_long_int(&self) -> Option<i128> {
        match self {
            Value::Int(n) => Some(*n as i128),
            Value::LongInt(n) => Some(*n),
            _ => None,
        }
    }

    pub fn encode(&self, modes: &ModeTable, mode: ModeId) -> Vec<u8> {
        let size = modes.size(mode);
        let mut out = Vec::with_capacity(size);
        match (modes.get(mode), self) {
            (Mode::Void | Mode::Rows, _) => {}
            (Mode::Struct(fields), Value::Struct(values)) if fields.len() == values.len() => {
                for (field, value) in fields.iter().zip(values) {
                    out.extend(value.encode(modes, field.mode));
                }
            }
            (Mode::Union(members), Value::Union { mode: member, value })
                if members.contains(member) =>
            {
                out.push(status::INIT);
                out.extend_from_slice(&member.index().to_le_bytes());
                out.extend(value.encode(modes, *member));
            }
            (_, Value::Undefined) => {}
            (Mode::Int, Value::Int(n)) => {
                out.push(status::INIT);
                out.extend_from_slice(&n.to_le_bytes());
            }
            (Mode::LongInt, Value::LongInt(n)) => {
                out.push(status::INIT);
                out.extend_from_slice(&n.to_le_bytes());
            }
            (Mode::Real, Value::Real(x)) | (Mode::LongReal, Value::LongReal(x)) => {
                out.push(status::INIT);
                out.extend_from_slice(&x.to_le_bytes());
            }
            (Mode::Bool, Value::Bool(b)) => {
                out.push(status::INIT);
                out.push(u8::from(*b));
            }
            (Mode::Char, Value::Char(c)) => {
                out.push(status::INIT);
                out.extend_from_slice(&(*c as u32).to_le_bytes());
            }
            (Mode::Bits, Value::Bits(bits)) => {
                out.push(status::INIT);
                out.extend_from_slice(&bits.to_le_bytes());
            }
            (Mode::Ref(_) | Mode::Nil, Value::Ref(target))
            | (Mode::Row { .. }, Value::Row(target)) => match target {
                Some(address) => {
                    out.push(status::INIT);
                    address.encode(&mut out);
                }
                None => out.push(status::INIT | status::NIL),
            },
            (Mode::Proc { .. }, Value::Proc(procedure)) => {
                out.push(status::INIT);
                let (kind, index) = match procedure {
                    Procedure::Native(id) => (0u8, id.index()),
                    Procedure::Routine(index) => (1u8, *index),
                };
                out.push(kind);
                out.extend_from_slice(&index.to_le_bytes());
            }
            _ => {}
        }
        out.resize(size, 0);
        out
    }

    pub fn decode(modes: &ModeTable, mode: ModeId, bytes: &[u8]) -> Value {
        let size = modes.size(mode);
        if bytes.len() < size {
            return Value::Undefined;
        }
        match modes.get(mode) {
            Mode::Void | Mode::Rows => return Value::Void,
            Mode::Struct(fields) => {
                let mut offset = 0;
                let mut values = Vec::with_capacity(fields.len());
                for field in fields {
                    let width = modes.size(field.mode);
                    values.push(Value::decode(
                        modes,
                        field.mode,
                        &bytes[offset..offset + width],
                    ));
                    offset += width;
                }
                return Value::Struct(values);
            }
            _ => {}
        }
        let flags = bytes[0];
        if flags & status::INIT == 0 {
            return Value::Undefined;
        }
        let payload = &bytes[1..size];
        match modes.get(mode) {
            Mode::Int => Value::Int(i64::from_le_bytes(array(payload))),
            Mode::LongInt => Value::LongInt(i128::from_le_bytes(array(payload))),
            Mode::Real => Value::Real(f64::from_le_bytes(array(payload))),
            Mode::LongReal => Value::LongReal(f64::from_le_bytes(array(payload))),
            Mode::Bool => Value::Bool(payload[0] != 0),
            Mode::Char => Value::Char(
                char::from_u32(u32::from_le_bytes(array(payload))).unwrap_or('\u{fffd}'),
            ),
            Mode::Bits => Value::Bits(u64::from_le_bytes(array(payload))),
            Mode::Ref(_) | Mode::Nil => Value::Ref(decode_target(flags, payload)),
            Mode::Row { .. } => Value::Row(decode_target(flags, payload)),
            Mode::Proc { .. } => {
                let index = u32::from_le_bytes(array(&payload[1..]));
                if payload[0] == 0 {
                    Value::Proc(Procedure::Native(NativeId::from_index(index)))
                } else {
                    Value::Proc(Procedure::Routine(index))
                }
            }
            Mode::Union(members) => {
                let member = ModeId(u32::from_le_bytes(array(&payload[..4])));
                if !members.contains(&member) {
                    return Value::Undefined;
                }
                Value::Union {
                    mode: member,
                    value: Box::new(Value::decode(modes, member, &payload[4..])),
                }
            }
            Mode::Void | Mode::Rows | Mode::Struct(_) => Value::Void,
        }
    }
}

fn decode_target(flags: u8, payload: &[u8]) -> Option<Address> {
    if flags & status::NIL != 0 {
        None
    } else {
        Address::decode(payload)
    }
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Allocates a row with the given bounds on the heap and returns its descriptor address.
pub fn alloc_row(
    memory: &mut Memory,
    modes: &ModeTable,
    row_mode: ModeId,
    bounds: &[(i64, i64)],
    elements: &[Value],
) -> Result<Address, Diagnostic> {
    let element_mode = modes
        .row_shape(row_mode)
        .map(|(_, element)| element)
        .unwrap_or(ModeId::VOID);
    let width = modes.size(element_mode);
    let mut bytes = Vec::with_capacity(width * elements.len());
    for element in elements {
        bytes.extend(element.encode(modes, element_mode));
    }
    let storage = memory.allocate(bytes.len(), element_mode);
    memory.write(storage, &bytes)?;
    let descriptor = RowDescriptor::dense(storage, bounds);
    store_descriptor(memory, &descriptor, row_mode)
}

/// Allocates a `STRING` holding `text`, indexed from 1.
pub fn alloc_string(memory: &mut Memory, text: &str) -> Result<Address, Diagnostic> {
    let chars: Vec<char> = text.chars().collect();
    let mut bytes = Vec::with_capacity(chars.len() * CHAR_SIZE);
    for ch in &chars {
        bytes.push(status::INIT);
        bytes.extend_from_slice(&(*ch as u32).to_le_bytes());
    }
    let storage = memory.allocate(bytes.len(), ModeId::CHAR);
    memory.write(storage, &bytes)?;
    let descriptor = RowDescriptor::dense(storage, &[(1, chars.len() as i64)]);
    store_descriptor(memory, &descriptor, ModeId::STRING)
}

fn store_descriptor(
    memory: &mut Memory,
    descriptor: &RowDescriptor,
    mode: ModeId,
) -> Result<Address, Diagnostic> {
    let encoded = descriptor.encode();
    let address = memory.allocate(encoded.len(), mode);
    memory.write(address, &encoded)?;
    Ok(address)
}

pub fn read_string(memory: &Memory, descriptor: Option<Address>) -> Result<String, Diagnostic> {
    let Some(address) = descriptor else {
        return Ok(String::new());
    };
    let row = RowDescriptor::read(memory, address)?;
    let mut text = String::with_capacity(row.element_count());
    for index in 0..row.element_count() {
        let bytes = memory.read(row.elements.offset_by(index * CHAR_SIZE), CHAR_SIZE)?;
        if bytes[0] & status::INIT == 0 {
            return Err(Diagnostic::access("string contains an uninitialised character"));
        }
        let code = u32::from_le_bytes(array(&bytes[1..]));
        text.push(char::from_u32(code).unwrap_or('\u{fffd}'));
    }
    Ok(text)
}
