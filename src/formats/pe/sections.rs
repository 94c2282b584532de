//! Section management for PE files

use crate::entropy::shannon_entropy;
use crate::formats::pe::types::*;
use crate::formats::pe::utils::{u32_at, ReadExt};

/// Section table in on-disk order, with a VA-sorted index for RVA lookups
#[derive(Debug, Clone)]
pub struct SectionTable {
    sections: Vec<Section>,
    by_va: Vec<usize>,
}

impl SectionTable {
    /// Create a new section table
    pub fn new(sections: Vec<Section>) -> Self {
        let mut by_va: Vec<usize> = (0..sections.len()).collect();
        by_va.sort_by_key(|&i| sections[i].header.virtual_address);
        Self { sections, by_va }
    }

    /// All sections, in the order the section table lists them
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Convert RVA to file offset - O(log n) with binary search
    #[inline]
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        let idx = self
            .by_va
            .binary_search_by(|&i| {
                let h = &self.sections[i].header;
                if rva < h.virtual_address {
                    std::cmp::Ordering::Greater
                } else if h.contains_rva(rva) {
                    std::cmp::Ordering::Equal
                } else {
                    std::cmp::Ordering::Less
                }
            })
            .ok()
            .map(|pos| self.by_va[pos])
            // Overlapping sections break the ordering; fall back to a scan.
            .or_else(|| {
                self.sections
                    .iter()
                    .position(|s| s.header.contains_rva(rva))
            })?;

        let header = &self.sections[idx].header;
        let delta = rva - header.virtual_address;
        header
            .pointer_to_raw_data
            .checked_add(delta)
            .map(|off| off as usize)
    }
}

/// Parse section headers from data
///
/// A table that runs past the end of the file is truncated to the headers
/// that fit; nothing is returned for a header that is only partially present.
pub fn parse_section_headers(data: &[u8], offset: usize, count: u16) -> Result<Vec<SectionHeader>> {
    let mut sections = Vec::with_capacity(count as usize);

    for i in 0..count {
        let section_offset = offset + (i as usize * SECTION_HEADER_SIZE);
        let Some(raw) = data.read_slice_at(section_offset, SECTION_HEADER_SIZE) else {
            if sections.is_empty() {
                return Err(PeError::TruncatedHeader {
                    expected: section_offset + SECTION_HEADER_SIZE,
                    actual: data.len(),
                });
            }
            break;
        };

        let mut name = [0u8; 8];
        name.copy_from_slice(&raw[..8]);

        sections.push(SectionHeader {
            name,
            virtual_size: u32_at(raw, 8)?,
            virtual_address: u32_at(raw, 12)?,
            size_of_raw_data: u32_at(raw, 16)?,
            pointer_to_raw_data: u32_at(raw, 20)?,
            characteristics: u32_at(raw, 36)?,
        });
    }

    Ok(sections)
}

/// Create section objects with data ranges clipped to `file_len`
pub fn create_sections(headers: Vec<SectionHeader>, file_len: usize) -> Vec<Section> {
    headers
        .into_iter()
        .map(|header| {
            let start = (header.pointer_to_raw_data as usize).min(file_len);
            let end = start
                .saturating_add(header.size_of_raw_data as usize)
                .min(file_len);
            Section {
                header,
                data: start..end,
            }
        })
        .collect()
}

impl Section {
    /// Raw bytes of the section as present in the file; may be shorter than
    /// `SizeOfRawData` when the file is truncated.
    pub fn data<'a>(&self, file_data: &'a [u8]) -> &'a [u8] {
        file_data.get(self.data.clone()).unwrap_or(&[])
    }

    /// Shannon entropy of the section's raw bytes (0.0 when empty)
    pub fn entropy(&self, file_data: &[u8]) -> f64 {
        shannon_entropy(self.data(file_data))
    }
}
