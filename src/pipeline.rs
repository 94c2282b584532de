//! Single-file classification pipeline.
//!
//! One call to [`Pipeline::analyze`] runs three paths over the same file:
//!
//! 1. the model path (features, ensemble, vote) through a [`ModelAdapter`];
//! 2. structural metadata through [`crate::metadata`];
//! 3. the call-graph cache through [`CallGraphGenerator`].
//!
//! Only the model path can fail the analysis, and then the result is the
//! fixed degraded verdict. The other two paths drop their own contribution.

use std::path::Path;

use tracing::{debug, error};

use crate::adapter::{DefaultModelAdapter, ModelAdapter};
use crate::callgraph::{CallGraphGenerator, ProcessRunner, ToolRunner};
use crate::config::PipelineConfig;
use crate::error::{MaiwareError, Result};
use crate::features::FeatureRow;
use crate::logging::StageTimer;
use crate::metadata::extract_metadata;
use crate::result::AnalysisResult;
use crate::target::AnalysisTarget;
use crate::voting::EnsembleVerdict;

/// Error text of the degraded result when no feature row was produced.
pub const NO_FEATURES_MESSAGE: &str = "Failed to extract features";

pub struct Pipeline<A = DefaultModelAdapter, R = ProcessRunner> {
    config: PipelineConfig,
    adapter: A,
    callgraph: CallGraphGenerator<R>,
}

impl Pipeline {
    /// Pipeline with the bundled model adapter and a real process runner.
    pub fn new(config: PipelineConfig) -> Self {
        let adapter = DefaultModelAdapter::new(config.voting.clone());
        Self::with_parts(config, adapter, ProcessRunner)
    }
}

impl<A: ModelAdapter, R: ToolRunner> Pipeline<A, R> {
    pub fn with_parts(config: PipelineConfig, adapter: A, runner: R) -> Self {
        let callgraph = CallGraphGenerator::new(config.callgraph.clone(), runner)
            .with_verbose(config.verbose_timing);
        Self {
            config,
            adapter,
            callgraph,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn callgraph(&self) -> &CallGraphGenerator<R> {
        &self.callgraph
    }

    /// Classify the file at `path`. Never fails; see the module docs.
    pub fn analyze(&self, path: &Path) -> AnalysisResult {
        let verbose = self.config.verbose_timing;
        let total = StageTimer::start(verbose, "TOTAL analyze");

        let target = match AnalysisTarget::open(path) {
            Ok(target) => target,
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot open target");
                total.finish();
                return AnalysisResult::degraded(e.to_string());
            }
        };

        let (verdict, features) = match self.classify(&target) {
            Ok(Some(classified)) => classified,
            Ok(None) => {
                error!(path = %path.display(), "no feature row extracted");
                total.finish();
                return AnalysisResult::degraded(NO_FEATURES_MESSAGE);
            }
            Err(e) => {
                let e = crate::log_error!(e, "model path failed");
                total.finish();
                return AnalysisResult::degraded(e.to_string());
            }
        };

        let metadata = extract_metadata(&target, &self.config.metadata, verbose);
        let mut result = AnalysisResult::classified(&verdict, metadata, &features);

        result.cfg_image = self.callgraph.generate(path).map(|artifact| artifact.path);

        total.finish();
        result
    }

    /// The model path. `Ok(None)` when the target yields no feature row.
    fn classify(&self, target: &AnalysisTarget) -> Result<Option<(EnsembleVerdict, FeatureRow)>> {
        let verbose = self.config.verbose_timing;
        let model = &self.config.model;

        let timer = StageTimer::start(verbose, "load_model_columns");
        let schema = self.adapter.load_model_columns(&model.columns_path)?;
        timer.finish();

        let timer = StageTimer::start(verbose, "extract_features");
        let mut table = self.adapter.extract_features(&[target], &schema)?;
        timer.finish();
        if table.is_empty() {
            return Ok(None);
        }

        let timer = StageTimer::start(verbose, "prepare_feature_matrix");
        let matrix = self.adapter.prepare_feature_matrix(&table, &schema)?;
        timer.finish();

        let timer = StageTimer::start(verbose, "run_models");
        let predictions = self
            .adapter
            .run_models(&matrix, &model.models, &model.model_dir)?;
        timer.finish();

        let timer = StageTimer::start(verbose, "run_majority_voting");
        let (verdicts, summary) = self
            .adapter
            .run_majority_voting(&predictions, &model.models)?;
        timer.finish();
        debug!(models = summary.total_models, agreement = ?summary.agreement, "ensemble vote");

        let verdict = verdicts
            .into_iter()
            .next()
            .ok_or_else(|| MaiwareError::Voting("no verdict for target".into()))?;
        let features = table.rows.swap_remove(0);
        Ok(Some((verdict, features)))
    }
}
