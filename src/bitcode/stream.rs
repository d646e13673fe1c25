//! Bit-level primitives: abbreviation ops, packing and unpacking.
//!
//! Record payloads are packed least-significant bit first. Blob bytes
//! start on a byte boundary, and every payload ends padded to one.

use std::fmt;

/// How one operand of a record is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbbrevOp {
    /// An unsigned integer of the given width in bits.
    Fixed(u8),
    /// A 32-bit element count, then that many elements of the given width.
    Array(u8),
    /// A 32-bit byte length, then that many byte-aligned bytes.
    Blob,
}

impl AbbrevOp {
    const TAG_FIXED: u8 = 0;
    const TAG_ARRAY: u8 = 1;
    const TAG_BLOB: u8 = 2;

    /// Serialize as `(tag, width)`.
    pub fn to_pair(self) -> [u8; 2] {
        match self {
            AbbrevOp::Fixed(w) => [Self::TAG_FIXED, w],
            AbbrevOp::Array(w) => [Self::TAG_ARRAY, w],
            AbbrevOp::Blob => [Self::TAG_BLOB, 0],
        }
    }

    /// Parse a `(tag, width)` pair. Widths above 64 bits are rejected.
    pub fn from_pair(tag: u8, width: u8) -> Option<Self> {
        if width > 64 {
            return None;
        }
        match tag {
            Self::TAG_FIXED => Some(AbbrevOp::Fixed(width)),
            Self::TAG_ARRAY => Some(AbbrevOp::Array(width)),
            Self::TAG_BLOB => Some(AbbrevOp::Blob),
            _ => None,
        }
    }
}

impl fmt::Display for AbbrevOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbbrevOp::Fixed(w) => write!(f, "fixed({w})"),
            AbbrevOp::Array(w) => write!(f, "array({w})"),
            AbbrevOp::Blob => f.write_str("blob"),
        }
    }
}

/// One operand to write.
#[derive(Clone, Copy, Debug)]
pub enum Operand<'a> {
    Int(u64),
    /// Array elements; each byte is one element.
    Array(&'a [u8]),
    Blob(&'a [u8]),
}

/// One decoded operand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(u64),
    Array(Vec<u64>),
    Blob(Vec<u8>),
}

#[inline]
fn mask(width: u8) -> u64 {
    if width >= 64 { u64::MAX } else { (1u64 << width) - 1 }
}

// ============================================================================
// WRITER
// ============================================================================

/// Appends bit-packed fields to a byte buffer.
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    /// Bits already used in the last byte, 0 when aligned.
    used: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the low `width` bits of `value`.
    pub fn write(&mut self, value: u64, width: u8) {
        let mut value = value & mask(width);
        let mut left = width;
        while left > 0 {
            if self.used == 0 {
                self.bytes.push(0);
            }
            let room = 8 - self.used;
            let take = room.min(left);
            let chunk = (value & mask(take)) as u8;
            if let Some(last) = self.bytes.last_mut() {
                *last |= chunk << self.used;
            }
            self.used = (self.used + take) % 8;
            value >>= take;
            left -= take;
        }
    }

    /// Pad with zero bits to the next byte boundary.
    pub fn align(&mut self) {
        self.used = 0;
    }

    /// Append raw bytes at the next byte boundary.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.align();
        self.bytes.extend_from_slice(bytes);
    }

    /// Pack `operands` according to `ops`.
    ///
    /// Operand shapes must match the ops; callers only pass operands built
    /// from the same schema entry.
    pub fn write_operands(&mut self, ops: &[AbbrevOp], operands: &[Operand<'_>]) {
        debug_assert_eq!(ops.len(), operands.len());
        for (op, operand) in ops.iter().zip(operands) {
            match (*op, *operand) {
                (AbbrevOp::Fixed(w), Operand::Int(v)) => self.write(v, w),
                (AbbrevOp::Array(w), Operand::Array(items)) => {
                    self.write(items.len() as u64, 32);
                    for item in items {
                        self.write(u64::from(*item), w);
                    }
                }
                (AbbrevOp::Blob, Operand::Blob(bytes)) => {
                    self.write(bytes.len() as u64, 32);
                    self.write_bytes(bytes);
                }
                (op, operand) => {
                    debug_assert!(false, "operand {operand:?} does not fit {op}");
                }
            }
        }
        self.align();
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.align();
        self.bytes
    }
}

// ============================================================================
// READER
// ============================================================================

/// Reads bit-packed fields from a byte slice.
#[derive(Debug)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    /// Position in bits.
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Read `width` bits, or `None` past the end.
    pub fn read(&mut self, width: u8) -> Option<u64> {
        if self.pos + width as usize > self.bytes.len() * 8 {
            return None;
        }
        let mut value = 0u64;
        let mut filled = 0u8;
        while filled < width {
            let byte = self.bytes[self.pos / 8];
            let offset = (self.pos % 8) as u8;
            let take = (8 - offset).min(width - filled);
            let chunk = (u64::from(byte) >> offset) & mask(take);
            value |= chunk << filled;
            filled += take;
            self.pos += take as usize;
        }
        Some(value)
    }

    /// Skip to the next byte boundary.
    pub fn align(&mut self) {
        self.pos = self.pos.div_ceil(8) * 8;
    }

    /// Read `len` bytes starting at the next byte boundary.
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        self.align();
        let start = self.pos / 8;
        let end = start.checked_add(len)?;
        let out = self.bytes.get(start..end)?;
        self.pos = end * 8;
        Some(out)
    }

    /// Unpack one record payload laid out by `ops`, ending aligned.
    pub fn read_operands(&mut self, ops: &[AbbrevOp]) -> Option<Vec<Value>> {
        let mut values = Vec::with_capacity(ops.len());
        for op in ops {
            let value = match *op {
                AbbrevOp::Fixed(w) => Value::Int(self.read(w)?),
                AbbrevOp::Array(w) => {
                    let count = self.read(32)? as usize;
                    // Cheap sanity bound before allocating.
                    if count.saturating_mul(w.max(1) as usize) > self.remaining_bits() {
                        return None;
                    }
                    let mut items = Vec::with_capacity(count);
                    for _ in 0..count {
                        items.push(self.read(w)?);
                    }
                    Value::Array(items)
                }
                AbbrevOp::Blob => {
                    let len = self.read(32)? as usize;
                    Value::Blob(self.read_bytes(len)?.to_vec())
                }
            };
            values.push(value);
        }
        self.align();
        Some(values)
    }

    fn remaining_bits(&self) -> usize {
        (self.bytes.len() * 8).saturating_sub(self.pos)
    }

    /// Bytes consumed so far, rounded up.
    pub fn consumed(&self) -> usize {
        self.pos.div_ceil(8)
    }
}

// ============================================================================
// BYTE CURSOR
// ============================================================================

/// Byte-level cursor for block framing.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos.min(self.bytes.len())..]
    }

    pub fn u8(&mut self) -> Option<u8> {
        let b = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    pub fn u32_le(&mut self) -> Option<u32> {
        let raw: [u8; 4] = self.bytes.get(self.pos..self.pos + 4)?.try_into().ok()?;
        self.pos += 4;
        Some(u32::from_le_bytes(raw))
    }

    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let out = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(out)
    }

    pub fn advance(&mut self, len: usize) {
        self.pos = self.pos.saturating_add(len).min(self.bytes.len());
    }
}
