//! Import table parsing

use tracing::debug;

use crate::formats::pe::sections::SectionTable;
use crate::formats::pe::types::*;
use crate::formats::pe::utils::{read_cstring_lossy, ReadExt};

const MAX_DLL_NAME_LEN: usize = 256;
const MAX_FUNCTION_NAME_LEN: usize = 512;

/// Import table in import-directory order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportTable {
    pub descriptors: Vec<ImportDescriptor>,
}

impl ImportTable {
    /// Get total import count
    pub fn count(&self) -> usize {
        self.descriptors.iter().map(|d| d.entries.len()).sum()
    }

    /// Number of imported modules
    pub fn dll_count(&self) -> usize {
        self.descriptors.len()
    }
}

/// Parse the import directory.
///
/// Descriptors whose name cannot be resolved are skipped; a directory RVA
/// that maps outside every section is an error.
pub fn parse_imports(
    data: &[u8],
    sections: &SectionTable,
    import_dir: &DataDirectory,
    is_64bit: bool,
    options: &ParseOptions,
) -> Result<ImportTable> {
    let mut table = ImportTable::default();
    if !options.parse_imports || !import_dir.is_present() {
        return Ok(table);
    }

    let dir_rva = import_dir.virtual_address;
    let mut offset = sections
        .rva_to_offset(dir_rva)
        .ok_or(PeError::InvalidRva { rva: dir_rva })?;

    loop {
        if table.descriptors.len() >= options.max_import_descriptors {
            debug!(
                limit = options.max_import_descriptors,
                "import descriptor limit reached"
            );
            break;
        }

        let Some(desc) = data.read_slice_at(offset, IMPORT_DESCRIPTOR_SIZE) else {
            break;
        };
        if desc.iter().all(|&b| b == 0) {
            break;
        }

        let original_first_thunk = desc.read_u32_le_at(0).unwrap_or(0);
        let name_rva = desc.read_u32_le_at(12).unwrap_or(0);
        let first_thunk = desc.read_u32_le_at(16).unwrap_or(0);
        offset += IMPORT_DESCRIPTOR_SIZE;

        let Some(dll_name) = sections
            .rva_to_offset(name_rva)
            .and_then(|off| read_cstring_lossy(data, off, MAX_DLL_NAME_LEN).ok())
        else {
            debug!(name_rva, "skipping import descriptor with unreadable name");
            continue;
        };

        let entries = parse_thunks(
            data,
            sections,
            original_first_thunk,
            first_thunk,
            is_64bit,
            options.max_imports_per_descriptor,
        );

        table.descriptors.push(ImportDescriptor { dll_name, entries });
    }

    Ok(table)
}

fn parse_thunks(
    data: &[u8],
    sections: &SectionTable,
    original_first_thunk: u32,
    first_thunk: u32,
    is_64bit: bool,
    max_count: usize,
) -> Vec<ImportEntry> {
    let mut entries = Vec::new();

    // Use original first thunk if available, otherwise first thunk
    let thunk_rva = if original_first_thunk != 0 {
        original_first_thunk
    } else {
        first_thunk
    };
    if thunk_rva == 0 {
        return entries;
    }

    let Some(mut thunk_offset) = sections.rva_to_offset(thunk_rva) else {
        return entries;
    };

    let entry_size = if is_64bit { 8 } else { 4 };
    let ordinal_flag = if is_64bit { 1u64 << 63 } else { 1u64 << 31 };

    while entries.len() < max_count {
        let val = if is_64bit {
            data.read_u64_le_at(thunk_offset)
        } else {
            data.read_u32_le_at(thunk_offset).map(u64::from)
        };
        let Some(val) = val else { break };
        if val == 0 {
            break;
        }

        let entry = if val & ordinal_flag != 0 {
            ImportEntry {
                name: None,
                ordinal: Some((val & 0xFFFF) as u16),
                hint: None,
            }
        } else {
            let hint_name_rva = (val & 0x7FFF_FFFF) as u32;
            match sections.rva_to_offset(hint_name_rva) {
                Some(hint_offset) => ImportEntry {
                    name: read_cstring_lossy(data, hint_offset + 2, MAX_FUNCTION_NAME_LEN)
                        .ok()
                        .filter(|s| !s.is_empty()),
                    ordinal: None,
                    hint: data.read_u16_le_at(hint_offset),
                },
                None => ImportEntry {
                    name: None,
                    ordinal: None,
                    hint: None,
                },
            }
        };

        entries.push(entry);
        thunk_offset += entry_size;
    }

    entries
}
