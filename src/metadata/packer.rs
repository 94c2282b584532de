//! Section-based packer heuristic.
//!
//! Rules are applied in order and the first match wins: a known packer
//! section name, then two or more high-entropy sections, then exactly one.

use std::fmt;

use crate::error::{MaiwareError, Result};
use crate::metadata::sections::SectionInfo;

/// Section names left behind by common packers, matched case-insensitively.
const SECTION_SIGNATURES: &[(&str, &[&str])] = &[
    ("UPX", &["UPX0", "UPX1"]),
    ("ASPack", &[".aspack"]),
    ("Petite", &[".petite"]),
    ("VMProtect", &[".vmp0", ".vmp1"]),
    ("MPRESS", &[".MPRESS1", ".MPRESS2"]),
    ("NsPack", &[".nsp0", ".nsp1", ".nsp2"]),
    ("Themida", &[".themida"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackerVerdict {
    Named(&'static str),
    PossiblyPacked,
    PartialPacking,
    NoneDetected,
    Unknown,
}

impl PackerVerdict {
    /// Whether the verdict suggests packed content.
    pub fn is_packed(&self) -> bool {
        matches!(self, Self::Named(_) | Self::PossiblyPacked)
    }
}

impl fmt::Display for PackerVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::PossiblyPacked => f.write_str("Possibly Packed (High Entropy)"),
            Self::PartialPacking => f.write_str("Suspicious (Partial Packing)"),
            Self::NoneDetected => f.write_str("None Detected"),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

fn signature_match(sections: &[SectionInfo]) -> Option<&'static str> {
    SECTION_SIGNATURES.iter().find_map(|(packer, names)| {
        sections
            .iter()
            .any(|s| names.iter().any(|n| s.name.eq_ignore_ascii_case(n)))
            .then_some(*packer)
    })
}

/// Classify the section list.
///
/// A non-finite entropy value is an error; callers map it to
/// [`PackerVerdict::Unknown`].
pub fn detect_packer(sections: &[SectionInfo], high_entropy_threshold: f64) -> Result<PackerVerdict> {
    if let Some(bad) = sections.iter().find(|s| !s.entropy.is_finite()) {
        return Err(MaiwareError::InvalidInput(format!(
            "section '{}' has non-finite entropy",
            bad.name
        )));
    }

    if let Some(packer) = signature_match(sections) {
        return Ok(PackerVerdict::Named(packer));
    }

    let high = sections
        .iter()
        .filter(|s| s.entropy > high_entropy_threshold)
        .count();

    Ok(match high {
        0 => PackerVerdict::NoneDetected,
        1 => PackerVerdict::PartialPacking,
        _ => PackerVerdict::PossiblyPacked,
    })
}
