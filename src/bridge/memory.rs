//! Read access to the module's linear memory
//!
//! The memory region may be swapped for a larger backing buffer whenever the
//! module grows it, so every read opens a fresh view. Callers never hold on
//! to a view across a call into the module.

use std::borrow::Cow;
use std::ops::Range;

use crate::error::LayoutError;

/// A readable linear memory region
pub trait LinearMemory {
    /// Current size in bytes
    fn size(&self) -> usize;

    /// Read `len` bytes at `offset`.
    ///
    /// In-process memories hand out a borrowed slice; memories that live on
    /// the other side of a foreign boundary copy just the requested range.
    fn read(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>, LayoutError>;
}

impl LinearMemory for [u8] {
    fn size(&self) -> usize {
        self.len()
    }

    fn read(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>, LayoutError> {
        let range = checked_range(offset, len, self.len())?;
        Ok(Cow::Borrowed(&self[range]))
    }
}

impl LinearMemory for Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }

    fn read(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>, LayoutError> {
        self.as_slice().read(offset, len)
    }
}

/// Validate that `offset..offset + len` lies inside a memory of `memory_size` bytes
pub fn checked_range(offset: usize, len: usize, memory_size: usize) -> Result<Range<usize>, LayoutError> {
    offset
        .checked_add(len)
        .filter(|&end| end <= memory_size)
        .map(|end| offset..end)
        .ok_or(LayoutError::OutOfBounds {
            offset,
            len,
            memory_size,
        })
}

/// Read a little-endian `u32`
pub fn read_u32_le<M: LinearMemory + ?Sized>(memory: &M, offset: usize) -> Result<u32, LayoutError> {
    let bytes = memory.read(offset, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a little-endian `f32`
pub fn read_f32_le<M: LinearMemory + ?Sized>(memory: &M, offset: usize) -> Result<f32, LayoutError> {
    read_u32_le(memory, offset).map(f32::from_bits)
}
