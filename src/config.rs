//! Configuration for the classification pipeline.
//!
//! Every section has serde defaults, so a config file only needs the keys it
//! changes. The pipeline never reads the environment itself; the binary
//! applies [`PipelineConfig::with_env_overrides`] once at startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::timeout::DEFAULT_TOOL_TIMEOUT_SECONDS;

/// Environment variable that enables per-stage timing output.
pub const VERBOSE_TIMING_ENV: &str = "VERBOSE_TIMING";

/// Ensemble members evaluated when no model list is configured.
pub const DEFAULT_MODELS: [&str; 13] = [
    "random_forest",
    "extra_trees",
    "gradient_boosting",
    "hist_gradient_boosting",
    "adaboost",
    "bagging",
    "decision_tree",
    "logistic_regression",
    "linear_svm",
    "sgd",
    "knn",
    "naive_bayes",
    "mlp",
];

/// Master configuration for one pipeline instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Log per-stage durations at info level (default: false).
    pub verbose_timing: bool,
    /// Model schema and ensemble configuration.
    pub model: ModelConfig,
    /// Structural metadata extraction limits.
    pub metadata: MetadataConfig,
    /// Ensemble vote thresholds and weights.
    pub voting: VotingConfig,
    /// External call-graph tool and its cache.
    pub callgraph: CallGraphConfig,
}

impl PipelineConfig {
    /// Load a JSON config file; absent keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Apply `VERBOSE_TIMING` (`1`, `true` or `yes`, case-insensitive).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(VERBOSE_TIMING_ENV) {
            if env_flag_enabled(&value) {
                self.verbose_timing = true;
            }
        }
        self
    }
}

/// Whether an environment flag value means "on".
pub fn env_flag_enabled(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Model schema and ensemble membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// JSON file listing the feature columns, in model input order
    /// (default: model_columns.json).
    pub columns_path: PathBuf,
    /// Directory holding one `<name>.json` artifact per model (default: models).
    pub model_dir: PathBuf,
    /// Ensemble members, in voting order.
    pub models: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            columns_path: PathBuf::from("model_columns.json"),
            model_dir: PathBuf::from("models"),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Limits for structural metadata extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Maximum keyword strings reported (default: 10).
    pub max_strings: usize,
    /// Imports considered per imported module (default: 5).
    pub max_imports_per_module: usize,
    /// Imports reported overall (default: 20).
    pub max_imports_total: usize,
    /// Section entropy above which a section counts as packed (default: 7.5).
    pub high_entropy_threshold: f64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            max_strings: 10,
            max_imports_per_module: 5,
            max_imports_total: 20,
            high_entropy_threshold: 7.5,
        }
    }
}

/// Ensemble vote thresholds and per-model weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    /// Scores below this are benign (default: 0.4).
    pub benign_threshold: f64,
    /// Scores at or above this are malware (default: 0.6).
    pub malware_threshold: f64,
    /// Per-model score weights; unlisted models weigh 1.0.
    pub weights: BTreeMap<String, f64>,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            benign_threshold: 0.4,
            malware_threshold: 0.6,
            weights: BTreeMap::new(),
        }
    }
}

impl VotingConfig {
    pub fn weight(&self, model: &str) -> f64 {
        self.weights.get(model).copied().unwrap_or(1.0)
    }
}

#[cfg(windows)]
const DEFAULT_INTERPRETER: &str = "python";
#[cfg(not(windows))]
const DEFAULT_INTERPRETER: &str = "python3";

/// External call-graph tool and its content-addressed cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallGraphConfig {
    /// Generate call graphs at all (default: true).
    pub enabled: bool,
    /// Cache directory; entries are `<sha256>.callgraph.{png,dot}`
    /// (default: tmp_cfg_cache).
    pub cache_dir: PathBuf,
    /// Program to run. A bare name is looked up on `PATH`; anything with a
    /// directory component is skipped when it does not exist
    /// (default: python3, or python on Windows).
    pub program: PathBuf,
    /// Extra arguments placed first, before `script`.
    pub program_args: Vec<String>,
    /// Helper script handed to `program`. Generation is skipped when it does
    /// not exist. `null` runs `program` on its own
    /// (default: extract_callgraph.py).
    pub script: Option<PathBuf>,
    /// Working directory for the tool (default: inherited).
    pub working_dir: Option<PathBuf>,
    /// Node cap passed as `--max-nodes` (default: 20).
    pub max_nodes: u32,
    /// Ask the tool to render an image (default: true).
    pub render: bool,
    /// Pass `--no-load-libs` (default: true on Windows only).
    pub skip_library_loading: bool,
    /// Kill the tool after this many seconds (default: 300; `null` waits forever).
    pub timeout_secs: Option<u64>,
}

impl Default for CallGraphConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from("tmp_cfg_cache"),
            program: PathBuf::from(DEFAULT_INTERPRETER),
            program_args: Vec::new(),
            script: Some(PathBuf::from("extract_callgraph.py")),
            working_dir: None,
            max_nodes: 20,
            render: true,
            skip_library_loading: cfg!(windows),
            timeout_secs: Some(DEFAULT_TOOL_TIMEOUT_SECONDS),
        }
    }
}
