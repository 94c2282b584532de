//! Resource directory walking
//!
//! Only the tree shape is needed: the parser counts leaf data entries and
//! the distinct top-level resource types. Resource payloads are never read.

use std::collections::HashSet;

use crate::formats::pe::sections::SectionTable;
use crate::formats::pe::types::*;
use crate::formats::pe::utils::ReadExt;

const RESOURCE_DIRECTORY_SIZE: usize = 16;
const RESOURCE_ENTRY_SIZE: usize = 8;
const SUBDIRECTORY_FLAG: u32 = 0x8000_0000;

/// Summary of a resource tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceSummary {
    /// Top-level type entries (RT_ICON, RT_VERSION, ...)
    pub type_count: usize,
    /// Leaf data entries across the whole tree
    pub leaf_count: usize,
}

struct Walker<'a> {
    data: &'a [u8],
    root: usize,
    options: &'a ParseOptions,
    visited: HashSet<usize>,
    entries_seen: usize,
    leaves: usize,
}

impl Walker<'_> {
    fn walk(&mut self, dir_offset: usize, depth: usize) -> Result<usize> {
        if depth >= self.options.max_resource_depth {
            return Err(PeError::ResourceDepthExceeded);
        }
        // Directories that point back at an ancestor would loop forever.
        if !self.visited.insert(dir_offset) {
            return Err(PeError::MalformedResourceDirectory);
        }

        let abs = self
            .root
            .checked_add(dir_offset)
            .ok_or(PeError::MalformedResourceDirectory)?;
        let header = self
            .data
            .read_slice_at(abs, RESOURCE_DIRECTORY_SIZE)
            .ok_or(PeError::InvalidOffset { offset: abs })?;
        let named = header.read_u16_le_at(12).unwrap_or(0) as usize;
        let ids = header.read_u16_le_at(14).unwrap_or(0) as usize;
        let count = named + ids;

        for i in 0..count {
            self.entries_seen += 1;
            if self.entries_seen > self.options.max_resource_entries {
                return Err(PeError::LimitExceeded("resource entries"));
            }

            let entry_offset = abs + RESOURCE_DIRECTORY_SIZE + i * RESOURCE_ENTRY_SIZE;
            let target = self
                .data
                .read_u32_le_at(entry_offset + 4)
                .ok_or(PeError::InvalidOffset {
                    offset: entry_offset + 4,
                })?;

            if target & SUBDIRECTORY_FLAG != 0 {
                self.walk((target & !SUBDIRECTORY_FLAG) as usize, depth + 1)?;
            } else {
                self.leaves += 1;
            }
        }

        Ok(count)
    }
}

/// Walk the resource directory and count its entries.
///
/// An absent directory yields an empty summary. Loops, depth beyond
/// `max_resource_depth`, and offsets outside the file are errors.
pub fn parse_resources(
    data: &[u8],
    sections: &SectionTable,
    resource_dir: &DataDirectory,
    options: &ParseOptions,
) -> Result<ResourceSummary> {
    if !options.parse_resources || !resource_dir.is_present() {
        return Ok(ResourceSummary::default());
    }

    let rva = resource_dir.virtual_address;
    let root = sections
        .rva_to_offset(rva)
        .ok_or(PeError::InvalidRva { rva })?;

    let mut walker = Walker {
        data,
        root,
        options,
        visited: HashSet::new(),
        entries_seen: 0,
        leaves: 0,
    };
    let type_count = walker.walk(0, 0)?;

    Ok(ResourceSummary {
        type_count,
        leaf_count: walker.leaves,
    })
}
