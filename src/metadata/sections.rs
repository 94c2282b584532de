//! Section table with per-section entropy.

use serde::{Deserialize, Serialize};

use crate::entropy::round2;
use crate::error::Result;
use crate::formats::pe::{ParseOptions, PeParser};

/// One PE section as reported in the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionInfo {
    pub name: String,
    /// Shannon entropy of the raw bytes, rounded to two decimals
    pub entropy: f64,
    /// Raw bytes actually present in the file
    pub size: u64,
}

/// Sections in on-disk order.
///
/// Only headers and the section table are parsed; no data directory is
/// followed.
pub fn extract_sections(data: &[u8]) -> Result<Vec<SectionInfo>> {
    let pe = PeParser::with_options(data, ParseOptions::fast())?;
    Ok(pe
        .sections()
        .iter()
        .map(|section| {
            let bytes = section.data(data);
            SectionInfo {
                name: section.header.name(),
                entropy: round2(section.entropy(data)),
                size: bytes.len() as u64,
            }
        })
        .collect())
}
