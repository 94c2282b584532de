//! Structural and heuristic facts derived from PE bytes.
//!
//! Extraction never fails as a whole. Each step runs through [`attempt`],
//! which logs a warning and substitutes a default when the step errors:
//! empty lists for sections, imports and strings, the generic label for the
//! file type, and `Unknown` for the packer verdict.

pub mod imports;
pub mod packer;
pub mod pe_type;
pub mod sections;
pub mod strings;

use tracing::warn;

use crate::config::MetadataConfig;
use crate::error::Result;
use crate::logging::StageTimer;
use crate::target::AnalysisTarget;

pub use imports::extract_imports;
pub use packer::{detect_packer, PackerVerdict};
pub use pe_type::{detect_pe_type, PeType};
pub use sections::{extract_sections, SectionInfo};
pub use strings::extract_key_strings;

/// Aggregate metadata for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct PeMetadata {
    pub file_type: String,
    pub packer: PackerVerdict,
    pub sections: Vec<SectionInfo>,
    pub imports: Vec<String>,
    pub strings: Vec<String>,
}

/// Run one soft-failing step: on error, log a warning naming `stage` and
/// return `fallback`.
pub fn attempt<T>(stage: &'static str, fallback: T, step: impl FnOnce() -> Result<T>) -> T {
    match step() {
        Ok(value) => value,
        Err(e) => {
            warn!(stage, error = %e, "metadata step failed; using default");
            fallback
        }
    }
}

/// Extract every metadata field from `target`.
pub fn extract_metadata(
    target: &AnalysisTarget,
    config: &MetadataConfig,
    verbose_timing: bool,
) -> PeMetadata {
    let data = target.bytes();

    let timer = StageTimer::start(verbose_timing, "extract_pe_sections");
    let sections = attempt("sections", Vec::new(), || extract_sections(data));
    timer.finish();

    let timer = StageTimer::start(verbose_timing, "extract_pe_imports");
    let imports = attempt("imports", Vec::new(), || {
        extract_imports(
            data,
            config.max_imports_per_module,
            config.max_imports_total,
        )
    });
    timer.finish();

    let timer = StageTimer::start(verbose_timing, "extract_pe_strings");
    let strings = extract_key_strings(data, config.max_strings);
    timer.finish();

    let timer = StageTimer::start(verbose_timing, "get_pe_type");
    let file_type = detect_pe_type(data);
    timer.finish();

    let timer = StageTimer::start(verbose_timing, "detect_packer");
    let packer = attempt("packer", PackerVerdict::Unknown, || {
        detect_packer(&sections, config.high_entropy_threshold)
    });
    timer.finish();

    PeMetadata {
        file_type,
        packer,
        sections,
        imports,
        strings,
    }
}
