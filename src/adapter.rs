//! The feature/model capability boundary.
//!
//! The pipeline drives classification only through [`ModelAdapter`]. Any
//! `Err` from these calls is a hard failure for the analysis.

use std::path::Path;

use crate::config::VotingConfig;
use crate::error::Result;
use crate::features::{self, FeatureMatrix, FeatureSchema, FeatureTable};
use crate::models::{self, PredictionTable};
use crate::target::AnalysisTarget;
use crate::voting::{self, EnsembleVerdict, VotingSummary};

pub trait ModelAdapter {
    fn load_model_columns(&self, path: &Path) -> Result<FeatureSchema>;

    fn extract_features(
        &self,
        targets: &[&AnalysisTarget],
        schema: &FeatureSchema,
    ) -> Result<FeatureTable>;

    fn prepare_feature_matrix(
        &self,
        table: &FeatureTable,
        schema: &FeatureSchema,
    ) -> Result<FeatureMatrix>;

    fn run_models(
        &self,
        matrix: &FeatureMatrix,
        models: &[String],
        model_dir: &Path,
    ) -> Result<PredictionTable>;

    fn run_majority_voting(
        &self,
        predictions: &PredictionTable,
        models: &[String],
    ) -> Result<(Vec<EnsembleVerdict>, VotingSummary)>;
}

/// JSON schema, PE features, logistic model artifacts, weighted voting.
#[derive(Debug, Clone, Default)]
pub struct DefaultModelAdapter {
    voting: VotingConfig,
}

impl DefaultModelAdapter {
    pub fn new(voting: VotingConfig) -> Self {
        Self { voting }
    }
}

impl ModelAdapter for DefaultModelAdapter {
    fn load_model_columns(&self, path: &Path) -> Result<FeatureSchema> {
        features::load_model_columns(path)
    }

    fn extract_features(
        &self,
        targets: &[&AnalysisTarget],
        schema: &FeatureSchema,
    ) -> Result<FeatureTable> {
        features::extract_features(targets, schema)
    }

    fn prepare_feature_matrix(
        &self,
        table: &FeatureTable,
        schema: &FeatureSchema,
    ) -> Result<FeatureMatrix> {
        features::prepare_feature_matrix(table, schema)
    }

    fn run_models(
        &self,
        matrix: &FeatureMatrix,
        models: &[String],
        model_dir: &Path,
    ) -> Result<PredictionTable> {
        models::run_models(matrix, models, model_dir)
    }

    fn run_majority_voting(
        &self,
        predictions: &PredictionTable,
        models: &[String],
    ) -> Result<(Vec<EnsembleVerdict>, VotingSummary)> {
        voting::run_majority_voting(predictions, models, &self.voting)
    }
}
