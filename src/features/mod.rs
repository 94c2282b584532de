//! Numeric feature extraction for the model ensemble.
//!
//! A [`FeatureSchema`] names the model input columns in order. Extraction
//! produces a name-keyed [`FeatureTable`] with one row per PE target, and
//! [`prepare_feature_matrix`] lays it out in schema order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::entropy::shannon_entropy;
use crate::error::{MaiwareError, Result};
use crate::formats::pe::PeParser;
use crate::metadata::packer::detect_packer;
use crate::metadata::sections::SectionInfo;
use crate::target::AnalysisTarget;

/// Feature names produced by [`extract_features`].
pub mod names {
    pub const FILE_SIZE: &str = "FileSize";
    pub const ENTROPY_TOTAL: &str = "Entropy_Total";
    pub const NUMBER_OF_SECTIONS: &str = "NumberOfSections";
    pub const TOTAL_DLLS: &str = "Total_DLLs";
    pub const TOTAL_IMPORTS: &str = "Total_Imports";
    pub const TOTAL_RESOURCES: &str = "Total_Resources";
    pub const PACKED: &str = "Packed";
    pub const MACHINE: &str = "Machine";
    pub const CHARACTERISTICS: &str = "Characteristics";
    pub const DLL_CHARACTERISTICS: &str = "DllCharacteristics";
    pub const SUBSYSTEM: &str = "Subsystem";
    pub const SIZE_OF_IMAGE: &str = "SizeOfImage";
    pub const SIZE_OF_CODE: &str = "SizeOfCode";
    pub const ADDRESS_OF_ENTRY_POINT: &str = "AddressOfEntryPoint";
    pub const IS_64BIT: &str = "Is64Bit";
    pub const IS_DLL: &str = "IsDLL";
    pub const MAX_SECTION_ENTROPY: &str = "Max_Section_Entropy";
    pub const MEAN_SECTION_ENTROPY: &str = "Mean_Section_Entropy";
    pub const HAS_DEBUG: &str = "Has_Debug";
    pub const HAS_TLS: &str = "Has_TLS";
    pub const HAS_SIGNATURE: &str = "Has_Signature";
    pub const HAS_RELOCATIONS: &str = "Has_Relocations";
}

/// Section entropy above which the `Packed` feature is set.
pub const PACKED_ENTROPY_THRESHOLD: f64 = 7.5;

/// Ordered model input columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    pub columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(MaiwareError::Schema("no feature columns".into()));
        }
        Ok(Self { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnsFile {
    List(Vec<String>),
    Object { columns: Vec<String> },
}

/// Load the column list: a JSON array, or an object with a `columns` array.
pub fn load_model_columns(path: &Path) -> Result<FeatureSchema> {
    let text = std::fs::read_to_string(path)?;
    let parsed: ColumnsFile = serde_json::from_str(&text).map_err(|e| {
        MaiwareError::Schema(format!("{}: {}", path.display(), e))
    })?;
    let columns = match parsed {
        ColumnsFile::List(columns) | ColumnsFile::Object { columns } => columns,
    };
    FeatureSchema::new(columns)
}

/// Named feature values for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub path: PathBuf,
    pub values: BTreeMap<String, f64>,
}

impl FeatureRow {
    /// Value of `name`, or 0.0 when absent.
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Dense row-major matrix in schema column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Compute every named feature for a PE image.
pub fn pe_features(data: &[u8]) -> Result<BTreeMap<String, f64>> {
    use names::*;

    let pe = PeParser::new(data)?;
    let coff = pe.coff_header();
    let opt = pe.optional_header();

    let sections: Vec<SectionInfo> = pe
        .sections()
        .iter()
        .map(|s| SectionInfo {
            name: s.header.name(),
            entropy: s.entropy(data),
            size: s.data(data).len() as u64,
        })
        .collect();

    // Broken directories reduce to zero counts rather than losing the row.
    let (total_dlls, total_imports) = match pe.imports() {
        Ok(table) => (table.dll_count(), table.count()),
        Err(e) => {
            debug!(error = %e, "import table unreadable");
            (0, 0)
        }
    };
    let total_resources = match pe.resources() {
        Ok(summary) => summary.leaf_count,
        Err(e) => {
            debug!(error = %e, "resource directory unreadable");
            0
        }
    };
    let packed = detect_packer(&sections, PACKED_ENTROPY_THRESHOLD)
        .map(|v| v.is_packed())
        .unwrap_or(false);

    let max_entropy = sections.iter().map(|s| s.entropy).fold(0.0, f64::max);
    let mean_entropy = if sections.is_empty() {
        0.0
    } else {
        sections.iter().map(|s| s.entropy).sum::<f64>() / sections.len() as f64
    };

    let mut values = BTreeMap::new();
    let mut put = |name: &str, value: f64| {
        values.insert(name.to_string(), value);
    };
    put(FILE_SIZE, data.len() as f64);
    put(ENTROPY_TOTAL, shannon_entropy(data));
    put(NUMBER_OF_SECTIONS, sections.len() as f64);
    put(TOTAL_DLLS, total_dlls as f64);
    put(TOTAL_IMPORTS, total_imports as f64);
    put(TOTAL_RESOURCES, total_resources as f64);
    put(PACKED, flag(packed));
    put(MACHINE, coff.machine.raw() as f64);
    put(CHARACTERISTICS, coff.characteristics as f64);
    put(DLL_CHARACTERISTICS, opt.dll_characteristics as f64);
    put(SUBSYSTEM, opt.subsystem as f64);
    put(SIZE_OF_IMAGE, opt.size_of_image as f64);
    put(SIZE_OF_CODE, opt.size_of_code as f64);
    put(ADDRESS_OF_ENTRY_POINT, opt.address_of_entry_point as f64);
    put(IS_64BIT, flag(pe.is_64bit()));
    put(IS_DLL, flag(pe.is_dll()));
    put(MAX_SECTION_ENTROPY, max_entropy);
    put(MEAN_SECTION_ENTROPY, mean_entropy);
    put(HAS_DEBUG, flag(pe.has_debug_info()));
    put(HAS_TLS, flag(pe.has_tls()));
    put(HAS_SIGNATURE, flag(pe.is_signed()));
    put(HAS_RELOCATIONS, flag(pe.has_relocations()));

    Ok(values)
}

/// One row per target that parses as PE; other targets are skipped.
pub fn extract_features(targets: &[&AnalysisTarget], schema: &FeatureSchema) -> Result<FeatureTable> {
    let mut table = FeatureTable::default();

    for target in targets {
        match pe_features(target.bytes()) {
            Ok(values) => {
                let missing = schema
                    .columns
                    .iter()
                    .filter(|c| !values.contains_key(c.as_str()))
                    .count();
                if missing > 0 {
                    debug!(missing, "schema columns without an extracted value");
                }
                table.rows.push(FeatureRow {
                    path: target.path().to_path_buf(),
                    values,
                });
            }
            Err(e) => {
                warn!(path = %target.path().display(), error = %e, "skipping non-PE target");
            }
        }
    }

    Ok(table)
}

/// Lay out the table in schema order; missing or non-finite values are 0.0.
pub fn prepare_feature_matrix(table: &FeatureTable, schema: &FeatureSchema) -> Result<FeatureMatrix> {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            schema
                .columns
                .iter()
                .map(|c| {
                    let v = row.get(c);
                    if v.is_finite() {
                        v
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect();

    Ok(FeatureMatrix {
        columns: schema.columns.clone(),
        rows,
    })
}
