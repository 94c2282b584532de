//! Imported function names, capped per module and overall.

use crate::error::Result;
use crate::formats::pe::{ImportTable, ParseOptions, PeParser};

/// Imported function names from the import directory.
///
/// From each module only the first `per_module` thunks are considered, and
/// of those only named ones are kept; the combined list is cut to `total`.
/// Encounter order is preserved and duplicates are not removed.
pub fn extract_imports(data: &[u8], per_module: usize, total: usize) -> Result<Vec<String>> {
    let options = ParseOptions {
        parse_resources: false,
        ..ParseOptions::default()
    };
    let pe = PeParser::with_options(data, options)?;
    Ok(cap_imports(pe.imports()?, per_module, total))
}

/// Apply the per-module and overall caps to a parsed import table.
pub fn cap_imports(table: &ImportTable, per_module: usize, total: usize) -> Vec<String> {
    table
        .descriptors
        .iter()
        .flat_map(|desc| desc.entries.iter().take(per_module))
        .filter_map(|entry| entry.name.clone())
        .take(total)
        .collect()
}
