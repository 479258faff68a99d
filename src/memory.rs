//! Byte-addressed storage: the frame stack segment, the heap segment with its
//! handles, row descriptors, and the value stack shared with the host.

use std::fmt;

use crate::{
    diagnostics::Diagnostic,
    mode::{ModeId, ADDRESS_SIZE},
};

/// Status bits stored in the first byte of every scalar, reference and row value.
pub mod status {
    pub const INIT: u8 = 0x01;
    pub const NIL: u8 = 0x02;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Stack,
    Heap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub segment: Segment,
    pub offset: usize,
}

impl Address {
    pub const fn stack(offset: usize) -> Self {
        Self {
            segment: Segment::Stack,
            offset,
        }
    }

    pub const fn heap(offset: usize) -> Self {
        Self {
            segment: Segment::Heap,
            offset,
        }
    }

    pub fn offset_by(self, delta: usize) -> Self {
        Self {
            segment: self.segment,
            offset: self.offset + delta,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(match self.segment {
            Segment::Stack => 0,
            Segment::Heap => 1,
        });
        out.extend_from_slice(&(self.offset as u64).to_le_bytes());
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < ADDRESS_SIZE {
            return None;
        }
        let segment = match bytes[0] {
            0 => Segment::Stack,
            1 => Segment::Heap,
            _ => return None,
        };
        let offset = u64::from_le_bytes(bytes[1..9].try_into().ok()?) as usize;
        Some(Self { segment, offset })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.segment {
            Segment::Stack => write!(f, "stack+{}", self.offset),
            Segment::Heap => write!(f, "heap+{}", self.offset),
        }
    }
}

/// One live heap allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    pub address: Address,
    pub size: usize,
    pub mode: ModeId,
}

#[derive(Debug, Default)]
pub struct Memory {
    stack: Vec<u8>,
    heap: Vec<u8>,
    handles: Vec<Handle>,
    inhibit: usize,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, address: Address, len: usize) -> Result<&[u8], Diagnostic> {
        let segment = self.segment(address.segment);
        segment
            .get(address.offset..address.offset + len)
            .ok_or_else(|| Diagnostic::access(format!("address {address} is outside its segment")))
    }

    pub fn write(&mut self, address: Address, bytes: &[u8]) -> Result<(), Diagnostic> {
        let segment = match address.segment {
            Segment::Stack => &mut self.stack,
            Segment::Heap => &mut self.heap,
        };
        let target = segment
            .get_mut(address.offset..address.offset + bytes.len())
            .ok_or_else(|| Diagnostic::access(format!("address {address} is outside its segment")))?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    /// Reserves zeroed (hence uninitialised) frame storage.
    pub fn push_frame(&mut self, size: usize) -> Address {
        let address = Address::stack(self.stack.len());
        self.stack.resize(self.stack.len() + size, 0);
        address
    }

    pub fn pop_frame(&mut self, address: Address) {
        if address.segment == Segment::Stack && address.offset <= self.stack.len() {
            self.stack.truncate(address.offset);
        }
    }

    pub fn allocate(&mut self, size: usize, mode: ModeId) -> Address {
        let address = Address::heap(self.heap.len());
        self.heap.resize(self.heap.len() + size, 0);
        self.handles.push(Handle {
            address,
            size,
            mode,
        });
        address
    }

    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    pub fn stack_in_use(&self) -> usize {
        self.stack.len()
    }

    pub fn heap_in_use(&self) -> usize {
        self.heap.len()
    }

    /// Forbids the host collector from relocating or reclaiming heap storage.
    pub fn inhibit_collection(&mut self) {
        self.inhibit += 1;
    }

    pub fn release_collection(&mut self) {
        self.inhibit = self.inhibit.saturating_sub(1);
    }

    pub fn may_collect(&self) -> bool {
        self.inhibit == 0
    }

    fn segment(&self, segment: Segment) -> &[u8] {
        match segment {
            Segment::Stack => &self.stack,
            Segment::Heap => &self.heap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub lower: i64,
    pub upper: i64,
    /// Distance between consecutive indices, in elements.
    pub stride: i64,
}

impl Dimension {
    pub fn extent(&self) -> usize {
        (self.upper - self.lower + 1).max(0) as usize
    }
}

/// Heap-resident description of a row: where its elements live and how they are indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDescriptor {
    pub elements: Address,
    pub dimensions: Vec<Dimension>,
}

impl RowDescriptor {
    /// Row-major descriptor for the given `(lower, upper)` bounds.
    pub fn dense(elements: Address, bounds: &[(i64, i64)]) -> Self {
        let mut dimensions = Vec::with_capacity(bounds.len());
        let mut stride = 1i64;
        for &(lower, upper) in bounds.iter().rev() {
            dimensions.push(Dimension {
                lower,
                upper,
                stride,
            });
            stride *= (upper - lower + 1).max(0);
        }
        dimensions.reverse();
        Self {
            elements,
            dimensions,
        }
    }

    pub fn encoded_size(dims: usize) -> usize {
        8 + ADDRESS_SIZE + dims * 24
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::encoded_size(self.dimensions.len()));
        out.extend_from_slice(&(self.dimensions.len() as u64).to_le_bytes());
        self.elements.encode(&mut out);
        for dim in &self.dimensions {
            out.extend_from_slice(&dim.lower.to_le_bytes());
            out.extend_from_slice(&dim.upper.to_le_bytes());
            out.extend_from_slice(&dim.stride.to_le_bytes());
        }
        out
    }

    pub fn read(memory: &Memory, address: Address) -> Result<Self, Diagnostic> {
        let header = memory.read(address, 8 + ADDRESS_SIZE)?;
        let dims = u64::from_le_bytes(read_word(&header[0..8])) as usize;
        let elements = Address::decode(&header[8..])
            .ok_or_else(|| Diagnostic::access(format!("corrupt row descriptor at {address}")))?;
        let body = memory.read(address.offset_by(8 + ADDRESS_SIZE), dims * 24)?;
        let dimensions = body
            .chunks_exact(24)
            .map(|chunk| Dimension {
                lower: i64::from_le_bytes(read_word(&chunk[0..8])),
                upper: i64::from_le_bytes(read_word(&chunk[8..16])),
                stride: i64::from_le_bytes(read_word(&chunk[16..24])),
            })
            .collect();
        Ok(Self {
            elements,
            dimensions,
        })
    }

    pub fn element_count(&self) -> usize {
        self.dimensions.iter().map(Dimension::extent).product()
    }

    /// Element index for one subscript per dimension, bounds-checked.
    pub fn index_of(&self, subscripts: &[i64]) -> Result<usize, Diagnostic> {
        let mut flat = 0i64;
        for (dim, &subscript) in self.dimensions.iter().zip(subscripts) {
            if subscript < dim.lower || subscript > dim.upper {
                return Err(Diagnostic::access(format!(
                    "index {subscript} out of bounds {}:{}",
                    dim.lower, dim.upper
                )));
            }
            flat += (subscript - dim.lower) * dim.stride;
        }
        Ok(flat as usize)
    }
}

fn read_word(bytes: &[u8]) -> [u8; 8] {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    word
}

/// Fixed-capacity byte stack used by both the host and the evaluator.
#[derive(Debug)]
pub struct ValueStack {
    bytes: Vec<u8>,
    capacity: usize,
}

impl ValueStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity.min(1 << 16)),
            capacity,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<(), Diagnostic> {
        if self.bytes.len() + bytes.len() > self.capacity {
            return Err(Diagnostic::resource("value stack overflow"));
        }
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    pub fn pop(&mut self, len: usize) -> Result<Vec<u8>, Diagnostic> {
        if len > self.bytes.len() {
            return Err(Diagnostic::resource("value stack underflow"));
        }
        Ok(self.bytes.split_off(self.bytes.len() - len))
    }

    pub fn pointer(&self) -> usize {
        self.bytes.len()
    }

    /// Discards everything above `pointer`.
    pub fn reset(&mut self, pointer: usize) {
        self.bytes.truncate(pointer);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contents(&self) -> &[u8] {
        &self.bytes
    }
}
