//! Utility functions for PE parsing

use crate::formats::pe::types::{PeError, Result};

/// Extension trait for reading primitive types from byte slices
pub trait ReadExt {
    fn read_u8_at(&self, offset: usize) -> Option<u8>;
    fn read_u16_le_at(&self, offset: usize) -> Option<u16>;
    fn read_u32_le_at(&self, offset: usize) -> Option<u32>;
    fn read_u64_le_at(&self, offset: usize) -> Option<u64>;
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]>;
}

impl ReadExt for [u8] {
    #[inline(always)]
    fn read_u8_at(&self, offset: usize) -> Option<u8> {
        self.get(offset).copied()
    }

    #[inline(always)]
    fn read_u16_le_at(&self, offset: usize) -> Option<u16> {
        self.get(offset..offset.checked_add(2)?)
            .and_then(|b| b.try_into().ok())
            .map(u16::from_le_bytes)
    }

    #[inline(always)]
    fn read_u32_le_at(&self, offset: usize) -> Option<u32> {
        self.get(offset..offset.checked_add(4)?)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
    }

    #[inline(always)]
    fn read_u64_le_at(&self, offset: usize) -> Option<u64> {
        self.get(offset..offset.checked_add(8)?)
            .and_then(|b| b.try_into().ok())
            .map(u64::from_le_bytes)
    }

    #[inline(always)]
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.get(offset..offset.checked_add(len)?)
    }
}

/// Read a little-endian u16 or report the offset that fell outside the buffer.
#[inline]
pub fn u16_at(data: &[u8], offset: usize) -> Result<u16> {
    data.read_u16_le_at(offset)
        .ok_or(PeError::InvalidOffset { offset })
}

/// Read a little-endian u32 or report the offset that fell outside the buffer.
#[inline]
pub fn u32_at(data: &[u8], offset: usize) -> Result<u32> {
    data.read_u32_le_at(offset)
        .ok_or(PeError::InvalidOffset { offset })
}

/// Read a little-endian u64 or report the offset that fell outside the buffer.
#[inline]
pub fn u64_at(data: &[u8], offset: usize) -> Result<u64> {
    data.read_u64_le_at(offset)
        .ok_or(PeError::InvalidOffset { offset })
}

/// Read a NUL-terminated string, decoding invalid UTF-8 lossily.
///
/// The string ends at the first NUL, at `max_len` bytes, or at the end of
/// the buffer, whichever comes first.
pub fn read_cstring_lossy(data: &[u8], offset: usize, max_len: usize) -> Result<String> {
    if offset >= data.len() {
        return Err(PeError::InvalidOffset { offset });
    }
    let end = offset.saturating_add(max_len).min(data.len());
    let slice = &data[offset..end];
    let len = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
    Ok(String::from_utf8_lossy(&slice[..len]).into_owned())
}

/// Check if a range is within bounds
#[inline(always)]
pub fn check_bounds(offset: usize, size: usize, data_len: usize) -> Result<()> {
    match offset.checked_add(size) {
        Some(end) if end <= data_len => Ok(()),
        _ => Err(PeError::InvalidOffset { offset }),
    }
}
