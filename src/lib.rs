//! Single-file PE malware classification.
//!
//! [`Pipeline::analyze`] combines an ensemble model vote with structural PE
//! heuristics and an optional cached call-graph image into one
//! [`AnalysisResult`].

/// Feature/model capability boundary
pub mod adapter;
/// Call-graph cache and external tool runner
pub mod callgraph;
/// Pipeline configuration
pub mod config;
/// Shannon entropy
pub mod entropy;
/// Error types
pub mod error;
/// Model feature extraction
pub mod features;
/// Binary format parsers
pub mod formats;
/// Content fingerprints
pub mod hashing;
/// Tracing setup and stage timing
pub mod logging;
/// Structural PE metadata
pub mod metadata;
/// Ensemble members
pub mod models;
/// The classification pipeline
pub mod pipeline;
/// Serialized analysis record
pub mod result;
/// The file under analysis
pub mod target;
/// Time-bounded operations
pub mod timeout;
/// Majority voting
pub mod voting;

pub use adapter::{DefaultModelAdapter, ModelAdapter};
pub use callgraph::{CallGraphArtifact, CallGraphCache, CallGraphGenerator, ProcessRunner, ToolRunner};
pub use config::PipelineConfig;
pub use error::{MaiwareError, Result};
pub use hashing::{fingerprint_file, ContentFingerprint};
pub use metadata::{extract_metadata, PackerVerdict, PeMetadata, SectionInfo};
pub use pipeline::Pipeline;
pub use result::{AnalysisResult, Classification};
pub use target::AnalysisTarget;
pub use voting::{EnsembleClass, EnsembleVerdict};
