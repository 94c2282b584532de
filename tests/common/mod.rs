//! Shared helpers for the integration tests.

#![allow(dead_code)]

pub mod pe_builder;

use std::cell::Cell;
use std::path::{Path, PathBuf};

use maiware::callgraph::{ToolInvocation, ToolOutput, ToolRunner};

pub use pe_builder::{uniform_bytes, PeBuilder};

/// Write `bytes` to `dir/name` and return the path.
pub fn write_sample(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap_or_else(|e| panic!("write {}: {}", path.display(), e));
    path
}

/// Ensemble artifacts for the bundled adapter.
pub mod models {
    use std::path::Path;

    /// Write `model_columns.json` and one logistic model per `(name, weight,
    /// bias)`, each weighting only the first column.
    pub fn write_ensemble(dir: &Path, columns: &[&str], models: &[(&str, f64, f64)]) {
        std::fs::write(
            dir.join("model_columns.json"),
            serde_json::to_string(columns).unwrap(),
        )
        .unwrap();
        let model_dir = dir.join("models");
        std::fs::create_dir_all(&model_dir).unwrap();
        for (name, weight, bias) in models {
            let mut weights = vec![0.0; columns.len()];
            weights[0] = *weight;
            let body = serde_json::json!({ "weights": weights, "bias": bias });
            std::fs::write(model_dir.join(format!("{name}.json")), body.to_string()).unwrap();
        }
    }
}

/// Fake call-graph tool: counts runs and writes the configured artifacts at
/// the `-o` prefix.
pub struct CountingTool {
    pub calls: Cell<usize>,
    writes: &'static [&'static str],
    exit_code: i32,
}

impl CountingTool {
    pub fn new(writes: &'static [&'static str], exit_code: i32) -> Self {
        Self {
            calls: Cell::new(0),
            writes,
            exit_code,
        }
    }
}

impl ToolRunner for CountingTool {
    fn run(&self, invocation: &ToolInvocation) -> maiware::Result<ToolOutput> {
        self.calls.set(self.calls.get() + 1);
        let at = invocation
            .args
            .iter()
            .position(|a| a == "-o")
            .expect("prefix flag");
        let prefix = invocation.args[at + 1].to_string_lossy().into_owned();
        for suffix in self.writes {
            std::fs::write(format!("{prefix}{suffix}"), b"digraph {}").unwrap();
        }
        Ok(ToolOutput {
            status: Some(self.exit_code),
            success: self.exit_code == 0,
            stdout: String::new(),
            stderr: "dot: command not found".into(),
        })
    }
}
