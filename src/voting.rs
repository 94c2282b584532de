//! Majority voting over ensemble predictions.
//!
//! The rule, per prediction row:
//! - only models in the configured list are counted, in list order;
//! - the label is the majority of per-model labels, a tie going to
//!   `score >= 0.5`;
//! - the score is the weighted mean of per-model scores clamped to [0, 1];
//! - the class comes from the score: below the benign threshold is benign,
//!   at or above the malware threshold is malware, anything between is
//!   suspicious.
//!
//! Voting is a pure function of its inputs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::VotingConfig;
use crate::error::{MaiwareError, Result};
use crate::models::{PredictionRow, PredictionTable};

/// Three-way ensemble class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnsembleClass {
    Benign,
    Suspicious,
    Malware,
}

impl EnsembleClass {
    /// Numeric class id: 0 benign, 1 suspicious, 2 malware.
    pub fn id(self) -> u8 {
        match self {
            Self::Benign => 0,
            Self::Suspicious => 1,
            Self::Malware => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Benign => "benign",
            Self::Suspicious => "suspicious",
            Self::Malware => "malware",
        }
    }

    /// Map a score onto the three bands.
    pub fn from_score(score: f64, config: &VotingConfig) -> Self {
        if score < config.benign_threshold {
            Self::Benign
        } else if score >= config.malware_threshold {
            Self::Malware
        } else {
            Self::Suspicious
        }
    }
}

impl fmt::Display for EnsembleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ensemble verdict for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleVerdict {
    pub votes_benign: u32,
    pub votes_malware: u32,
    /// 0 = benign, 1 = malware
    pub ensemble_label: u8,
    pub ensemble_score: f64,
    pub ensemble_class: EnsembleClass,
    pub ensemble_class_id: u8,
}

/// Auxiliary output of a voting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingSummary {
    pub total_models: usize,
    /// Per row: share of models that voted with the majority label
    pub agreement: Vec<f64>,
}

fn validate(models: &[String], config: &VotingConfig) -> Result<()> {
    if models.is_empty() {
        return Err(MaiwareError::Voting("empty model list".into()));
    }
    let (lo, hi) = (config.benign_threshold, config.malware_threshold);
    if !(lo.is_finite() && hi.is_finite() && (0.0..=1.0).contains(&lo) && lo <= hi && hi <= 1.0) {
        return Err(MaiwareError::Voting(format!(
            "invalid thresholds: benign {lo}, malware {hi}"
        )));
    }
    for model in models {
        let w = config.weight(model);
        if !w.is_finite() || w < 0.0 {
            return Err(MaiwareError::Voting(format!(
                "invalid weight {w} for model '{model}'"
            )));
        }
    }
    Ok(())
}

/// Vote on one row of predictions.
pub fn vote(row: &PredictionRow, models: &[String], config: &VotingConfig) -> Result<EnsembleVerdict> {
    validate(models, config)?;

    let mut votes_benign = 0u32;
    let mut votes_malware = 0u32;
    let mut weighted = 0.0f64;
    let mut total_weight = 0.0f64;

    for model in models {
        let prediction = row
            .get(model)
            .ok_or_else(|| MaiwareError::Voting(format!("no prediction from model '{model}'")))?;
        match prediction.label {
            0 => votes_benign += 1,
            1 => votes_malware += 1,
            other => {
                return Err(MaiwareError::Voting(format!(
                    "model '{model}' produced label {other}"
                )))
            }
        }
        if !prediction.score.is_finite() {
            return Err(MaiwareError::Voting(format!(
                "model '{model}' produced a non-finite score"
            )));
        }
        let w = config.weight(model);
        weighted += w * prediction.score.clamp(0.0, 1.0);
        total_weight += w;
    }

    if total_weight <= 0.0 {
        return Err(MaiwareError::Voting("model weights sum to zero".into()));
    }
    let ensemble_score = (weighted / total_weight).clamp(0.0, 1.0);

    let ensemble_label = match votes_malware.cmp(&votes_benign) {
        std::cmp::Ordering::Greater => 1,
        std::cmp::Ordering::Less => 0,
        std::cmp::Ordering::Equal => u8::from(ensemble_score >= 0.5),
    };
    let ensemble_class = EnsembleClass::from_score(ensemble_score, config);

    Ok(EnsembleVerdict {
        votes_benign,
        votes_malware,
        ensemble_label,
        ensemble_score,
        ensemble_class,
        ensemble_class_id: ensemble_class.id(),
    })
}

/// Vote on every row of the table.
pub fn run_majority_voting(
    predictions: &PredictionTable,
    models: &[String],
    config: &VotingConfig,
) -> Result<(Vec<EnsembleVerdict>, VotingSummary)> {
    let verdicts = predictions
        .rows
        .iter()
        .map(|row| vote(row, models, config))
        .collect::<Result<Vec<_>>>()?;

    let agreement = verdicts
        .iter()
        .map(|v| {
            let majority = v.votes_benign.max(v.votes_malware);
            majority as f64 / models.len() as f64
        })
        .collect();

    Ok((
        verdicts,
        VotingSummary {
            total_models: models.len(),
            agreement,
        },
    ))
}
