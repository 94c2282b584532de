//! Ensemble members and their predictions.
//!
//! Each model is a JSON artifact `<model_dir>/<name>.json` holding a
//! logistic model over the schema columns:
//!
//! ```json
//! { "weights": [0.1, -0.4, ...], "bias": 0.2, "threshold": 0.5 }
//! ```
//!
//! The rest of the crate only sees [`ModelPrediction`] records.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MaiwareError, Result};
use crate::features::FeatureMatrix;

/// One model's verdict for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub model: String,
    /// 0 = benign, 1 = malware
    pub label: u8,
    /// Malware probability in [0, 1]
    pub score: f64,
}

/// Predictions for one target, one per ensemble member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub predictions: Vec<ModelPrediction>,
}

impl PredictionRow {
    pub fn get(&self, model: &str) -> Option<&ModelPrediction> {
        self.predictions.iter().find(|p| p.model == model)
    }
}

/// Predictions for every target, in feature-matrix row order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionTable {
    pub rows: Vec<PredictionRow>,
}

/// A trained ensemble member.
pub trait Classifier {
    fn name(&self) -> &str;

    /// Predict one feature vector laid out in schema order.
    fn predict(&self, features: &[f64]) -> Result<ModelPrediction>;
}

fn default_threshold() -> f64 {
    0.5
}

/// On-disk logistic model.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    #[serde(skip)]
    name: String,
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LinearModel {
    pub fn new(name: impl Into<String>, weights: Vec<f64>, bias: f64, threshold: f64) -> Self {
        Self {
            name: name.into(),
            weights,
            bias,
            threshold,
        }
    }

    /// Load `<model_dir>/<name>.json`.
    pub fn load(model_dir: &Path, name: &str) -> Result<Self> {
        let path = model_dir.join(format!("{name}.json"));
        let text = std::fs::read_to_string(&path)
            .map_err(|e| MaiwareError::model(name, format!("{}: {}", path.display(), e)))?;
        let mut model: LinearModel =
            serde_json::from_str(&text).map_err(|e| MaiwareError::model(name, e.to_string()))?;
        if model.weights.iter().any(|w| !w.is_finite()) || !model.bias.is_finite() {
            return Err(MaiwareError::model(name, "non-finite coefficient"));
        }
        model.name = name.to_string();
        Ok(model)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &[f64]) -> Result<ModelPrediction> {
        if features.len() != self.weights.len() {
            return Err(MaiwareError::model(
                &self.name,
                format!(
                    "expected {} features, got {}",
                    self.weights.len(),
                    features.len()
                ),
            ));
        }
        let z = self
            .weights
            .iter()
            .zip(features)
            .fold(self.bias, |acc, (w, x)| acc + w * x);
        let score = sigmoid(z);
        if !score.is_finite() {
            return Err(MaiwareError::model(&self.name, "non-finite score"));
        }
        Ok(ModelPrediction {
            model: self.name.clone(),
            label: u8::from(score >= self.threshold),
            score,
        })
    }
}

/// Evaluate every row of `matrix` with each classifier, in order.
pub fn run_classifiers(
    matrix: &FeatureMatrix,
    classifiers: &[Box<dyn Classifier>],
) -> Result<PredictionTable> {
    let rows = matrix
        .rows
        .iter()
        .map(|features| {
            let predictions = classifiers
                .iter()
                .map(|c| c.predict(features))
                .collect::<Result<Vec<_>>>()?;
            Ok(PredictionRow { predictions })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(PredictionTable { rows })
}

/// Load each named model from `model_dir` and evaluate the matrix.
pub fn run_models(matrix: &FeatureMatrix, models: &[String], model_dir: &Path) -> Result<PredictionTable> {
    let classifiers = models
        .iter()
        .map(|name| LinearModel::load(model_dir, name).map(|m| Box::new(m) as Box<dyn Classifier>))
        .collect::<Result<Vec<_>>>()?;
    debug!(models = classifiers.len(), rows = matrix.rows.len(), "running ensemble");
    run_classifiers(matrix, &classifiers)
}
