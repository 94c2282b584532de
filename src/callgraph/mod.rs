//! Content-addressed call-graph cache in front of an external tool.
//!
//! Entries live in one flat directory and are named by the SHA-256 of the
//! target's content:
//!
//! ```text
//! <cache_dir>/<sha256>.callgraph.png   rendered image
//! <cache_dir>/<sha256>.callgraph.dot   graph description
//! ```
//!
//! A present image is a hit and the tool is not run. Entries are never
//! evicted. There is no locking: two processes missing on the same content
//! at once both run the tool and write identical files.
//!
//! Every failure here is soft. [`CallGraphGenerator::generate`] logs it and
//! returns `None`.

pub mod runner;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CallGraphConfig;
use crate::error::Result;
use crate::hashing::{fingerprint_file, ContentFingerprint};
use crate::logging::StageTimer;

pub use runner::{ProcessRunner, ToolInvocation, ToolOutput, ToolRunner};

/// Suffix of the rendered image entry.
pub const IMAGE_SUFFIX: &str = ".callgraph.png";
/// Suffix of the graph description entry.
pub const DESCRIPTION_SUFFIX: &str = ".callgraph.dot";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    RenderedImage,
    /// Produced when the rendering toolchain was unavailable
    GraphDescription,
}

/// A resolved cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraphArtifact {
    pub fingerprint: ContentFingerprint,
    pub kind: ArtifactKind,
    pub path: PathBuf,
    /// True when served without running the tool
    pub cached: bool,
}

/// Path layout of the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallGraphCache {
    dir: PathBuf,
}

impl CallGraphCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Output prefix handed to the tool; it appends the suffixes itself.
    pub fn prefix(&self, fp: &ContentFingerprint) -> PathBuf {
        self.dir.join(fp.to_hex())
    }

    pub fn image_path(&self, fp: &ContentFingerprint) -> PathBuf {
        self.dir.join(format!("{}{}", fp.to_hex(), IMAGE_SUFFIX))
    }

    pub fn description_path(&self, fp: &ContentFingerprint) -> PathBuf {
        self.dir.join(format!("{}{}", fp.to_hex(), DESCRIPTION_SUFFIX))
    }

    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// The cached image, if present.
    pub fn lookup(&self, fp: &ContentFingerprint) -> Option<PathBuf> {
        let path = self.image_path(fp);
        path.is_file().then_some(path)
    }

    /// Image first, then description.
    pub fn resolve(&self, fp: &ContentFingerprint) -> Option<(ArtifactKind, PathBuf)> {
        if let Some(path) = self.lookup(fp) {
            return Some((ArtifactKind::RenderedImage, path));
        }
        let path = self.description_path(fp);
        path.is_file()
            .then_some((ArtifactKind::GraphDescription, path))
    }
}

/// Runs the call-graph tool on cache misses.
#[derive(Debug, Clone)]
pub struct CallGraphGenerator<R = ProcessRunner> {
    config: CallGraphConfig,
    cache: CallGraphCache,
    runner: R,
    verbose: bool,
}

impl<R: ToolRunner> CallGraphGenerator<R> {
    pub fn new(config: CallGraphConfig, runner: R) -> Self {
        let cache = CallGraphCache::new(config.cache_dir.clone());
        Self {
            config,
            cache,
            runner,
            verbose: false,
        }
    }

    /// Enable stage timings and the tool's own `--verbose` flag.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn cache(&self) -> &CallGraphCache {
        &self.cache
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Whether the configured program can be run at all.
    ///
    /// A bare program name is resolved on `PATH` at spawn time; a path
    /// with a directory component must exist.
    pub fn tool_available(&self) -> bool {
        let program = &self.config.program;
        if program.as_os_str().is_empty() {
            return false;
        }
        let script_present = self.config.script.as_ref().map_or(true, |s| s.exists());
        (program.components().count() == 1 || program.exists()) && script_present
    }

    /// Command line for one target.
    pub fn invocation(&self, target: &Path, prefix: &Path) -> ToolInvocation {
        let mut args: Vec<OsString> = self
            .config
            .program_args
            .iter()
            .map(OsString::from)
            .collect();
        if let Some(script) = &self.config.script {
            args.push(script.as_os_str().to_owned());
        }
        args.push(target.as_os_str().to_owned());
        args.push("-o".into());
        args.push(prefix.as_os_str().to_owned());
        if self.config.render {
            args.push("--render".into());
        }
        args.push("--max-nodes".into());
        args.push(self.config.max_nodes.to_string().into());
        if self.verbose {
            args.push("--verbose".into());
        }
        if self.config.skip_library_loading {
            args.push("--no-load-libs".into());
        }

        ToolInvocation {
            program: self.config.program.clone(),
            args,
            working_dir: self.config.working_dir.clone(),
            timeout: self.config.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Cached or freshly generated artifact for `target`; `None` on any
    /// failure.
    pub fn generate(&self, target: &Path) -> Option<CallGraphArtifact> {
        if !self.config.enabled {
            debug!("call-graph generation disabled");
            return None;
        }
        if !self.tool_available() {
            debug!(program = %self.config.program.display(), "call-graph tool not found; skipping");
            return None;
        }

        let timer = StageTimer::start(self.verbose, "generate_callgraph_image");
        match self.try_generate(target) {
            Ok(Some(artifact)) => {
                timer.finish_as(if artifact.cached { "cached" } else { "generated" });
                Some(artifact)
            }
            Ok(None) => {
                timer.finish_as("no artifact");
                None
            }
            Err(e) => {
                timer.finish_as("failed");
                warn!(path = %target.display(), error = %e, "call-graph generation failed");
                None
            }
        }
    }

    /// Like [`generate`](Self::generate) but reports hashing, directory and
    /// spawn failures to the caller.
    pub fn try_generate(&self, target: &Path) -> Result<Option<CallGraphArtifact>> {
        self.cache.ensure_dir()?;
        let fingerprint = fingerprint_file(target)?;

        if let Some(path) = self.cache.lookup(&fingerprint) {
            debug!(%fingerprint, path = %path.display(), "call-graph cache hit");
            return Ok(Some(CallGraphArtifact {
                fingerprint,
                kind: ArtifactKind::RenderedImage,
                path,
                cached: true,
            }));
        }

        let invocation = self.invocation(target, &self.cache.prefix(&fingerprint));
        debug!(%fingerprint, "call-graph cache miss; running tool");
        let outcome = self.runner.run(&invocation);

        let resolved = self.cache.resolve(&fingerprint);
        match (&outcome, &resolved) {
            (Ok(output), None) if !output.success => {
                warn!(
                    status = ?output.status,
                    diagnostic = output.diagnostic().unwrap_or(""),
                    "call-graph tool failed"
                );
            }
            (Ok(output), Some(_)) if !output.success || self.verbose => {
                info!(
                    status = ?output.status,
                    diagnostic = output.diagnostic().unwrap_or(""),
                    "call-graph tool output"
                );
            }
            (Err(e), _) => {
                // A killed or unstartable tool may still have written something.
                warn!(error = %e, "call-graph tool did not complete");
            }
            _ => {}
        }

        if resolved.is_none() {
            outcome?;
        }

        Ok(resolved.map(|(kind, path)| CallGraphArtifact {
            fingerprint,
            kind,
            path,
            cached: false,
        }))
    }
}
