//! The serialized analysis record.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::entropy::round2;
use crate::features::{names, FeatureRow};
use crate::metadata::{PeMetadata, SectionInfo};
use crate::voting::{EnsembleClass, EnsembleVerdict};

/// Confidence reported with the degraded verdict.
pub const DEGRADED_CONFIDENCE: f64 = 0.5;

/// Top-level verdict, capitalized on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Benign,
    Suspicious,
    Malware,
}

impl From<EnsembleClass> for Classification {
    fn from(class: EnsembleClass) -> Self {
        match class {
            EnsembleClass::Benign => Self::Benign,
            EnsembleClass::Suspicious => Self::Suspicious,
            EnsembleClass::Malware => Self::Malware,
        }
    }
}

/// Headline model features echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeFeatures {
    pub file_size: u64,
    pub entropy_total: f64,
    pub number_of_sections: u64,
    pub total_dlls: u64,
    pub total_resources: u64,
    pub is_packed: bool,
}

impl PeFeatures {
    pub fn from_row(row: &FeatureRow) -> Self {
        // Feature values are non-negative counts stored as f64.
        let count = |name: &str| row.get(name).max(0.0) as u64;
        Self {
            file_size: count(names::FILE_SIZE),
            entropy_total: round2(row.get(names::ENTROPY_TOTAL)),
            number_of_sections: count(names::NUMBER_OF_SECTIONS),
            total_dlls: count(names::TOTAL_DLLS),
            total_resources: count(names::TOTAL_RESOURCES),
            is_packed: row.get(names::PACKED) == 1.0,
        }
    }
}

/// Everything a successful model path contributes beyond the headline verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationDetails {
    pub votes_benign: u32,
    pub votes_malware: u32,
    pub ensemble_label: u8,
    pub ensemble_score: f64,
    pub ensemble_class: EnsembleClass,
    pub ensemble_class_id: u8,
    pub file_type: String,
    pub packer_detected: String,
    pub section_entropy: Vec<SectionInfo>,
    pub api_imports: Vec<String>,
    pub key_strings: Vec<String>,
    pub pe_features: PeFeatures,
}

/// Result of one analysis.
///
/// `classification` and `confidence_score` are always present. A degraded
/// result carries only those two plus `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub classification: Classification,
    pub confidence_score: f64,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub details: Option<ClassificationDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfg_image: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Safe default verdict for a failed model path.
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            classification: Classification::Suspicious,
            confidence_score: DEGRADED_CONFIDENCE,
            details: None,
            cfg_image: None,
            error: Some(error.into()),
        }
    }

    /// Merge the ensemble verdict, metadata and feature echo.
    pub fn classified(verdict: &EnsembleVerdict, metadata: PeMetadata, features: &FeatureRow) -> Self {
        let score = round2(verdict.ensemble_score.clamp(0.0, 1.0));
        Self {
            classification: verdict.ensemble_class.into(),
            confidence_score: score,
            details: Some(ClassificationDetails {
                votes_benign: verdict.votes_benign,
                votes_malware: verdict.votes_malware,
                ensemble_label: verdict.ensemble_label,
                ensemble_score: score,
                ensemble_class: verdict.ensemble_class,
                ensemble_class_id: verdict.ensemble_class_id,
                file_type: metadata.file_type,
                packer_detected: metadata.packer.to_string(),
                section_entropy: metadata.sections,
                api_imports: metadata.imports,
                key_strings: metadata.strings,
                pe_features: PeFeatures::from_row(features),
            }),
            cfg_image: None,
            error: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.details.is_none()
    }
}
