//! Call-graph cache behavior against fake and real tools.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use maiware::callgraph::{
    ArtifactKind, CallGraphGenerator, ProcessRunner, DESCRIPTION_SUFFIX, IMAGE_SUFFIX,
};
use maiware::config::CallGraphConfig;
use maiware::fingerprint_file;

use crate::common::{write_sample, CountingTool, PeBuilder};

fn config(cache: &Path) -> CallGraphConfig {
    CallGraphConfig {
        cache_dir: cache.to_path_buf(),
        program: PathBuf::from("extract-callgraph"),
        script: None,
        ..Default::default()
    }
}

fn sample(dir: &Path) -> PathBuf {
    let data = PeBuilder::new().section(".text", vec![0xC3; 0x200]).build();
    write_sample(dir, "sample.exe", &data)
}

#[test]
fn test_cache_hit_never_runs_tool_again() {
    let dir = tempfile::tempdir().unwrap();
    let target = sample(dir.path());
    let cache = dir.path().join("tmp_cfg_cache");

    let first = CallGraphGenerator::new(config(&cache), CountingTool::new(&[IMAGE_SUFFIX], 0));
    let artifact = first.generate(&target).unwrap();
    assert_eq!(first.runner().calls.get(), 1);
    assert!(!artifact.cached);

    let fp = fingerprint_file(&target).unwrap();
    assert_eq!(artifact.fingerprint, fp);
    assert_eq!(artifact.path, cache.join(format!("{}.callgraph.png", fp.to_hex())));

    // A fresh generator models a later process sharing the cache directory.
    let second = CallGraphGenerator::new(config(&cache), CountingTool::new(&[IMAGE_SUFFIX], 0));
    let again = second.generate(&target).unwrap();
    assert_eq!(second.runner().calls.get(), 0);
    assert!(again.cached);
    assert_eq!(again.path, artifact.path);
}

#[test]
fn test_same_content_elsewhere_shares_entry() {
    let dir = tempfile::tempdir().unwrap();
    let a = sample(dir.path());
    let b = dir.path().join("copy.exe");
    std::fs::copy(&a, &b).unwrap();

    let generator = CallGraphGenerator::new(
        config(&dir.path().join("cache")),
        CountingTool::new(&[IMAGE_SUFFIX], 0),
    );
    let first = generator.generate(&a).unwrap();
    let second = generator.generate(&b).unwrap();
    assert_eq!(first.path, second.path);
    assert_eq!(generator.runner().calls.get(), 1);
}

#[test]
fn test_description_fallback_tolerates_nonzero_exit() {
    let dir = tempfile::tempdir().unwrap();
    let target = sample(dir.path());
    let generator = CallGraphGenerator::new(
        config(&dir.path().join("cache")),
        CountingTool::new(&[DESCRIPTION_SUFFIX], 2),
    );

    let artifact = generator.generate(&target).unwrap();
    assert_eq!(artifact.kind, ArtifactKind::GraphDescription);
    assert!(artifact.path.to_string_lossy().ends_with(".callgraph.dot"));

    // Only an image counts as a hit, so the tool runs again.
    generator.generate(&target).unwrap();
    assert_eq!(generator.runner().calls.get(), 2);
}

#[test]
fn test_no_output_is_no_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let target = sample(dir.path());
    let generator = CallGraphGenerator::new(
        config(&dir.path().join("cache")),
        CountingTool::new(&[], 1),
    );
    assert!(generator.generate(&target).is_none());
}

#[test]
fn test_missing_helper_script_skips_generation() {
    let dir = tempfile::tempdir().unwrap();
    let target = sample(dir.path());
    let mut cfg = config(&dir.path().join("cache"));
    cfg.program = PathBuf::from("python3");
    cfg.script = Some(dir.path().join("scripts").join("extract_callgraph.py"));

    let generator = CallGraphGenerator::new(cfg, CountingTool::new(&[IMAGE_SUFFIX], 0));
    assert!(generator.generate(&target).is_none());
    assert_eq!(generator.runner().calls.get(), 0);
}

#[test]
fn test_uncreatable_cache_dir_is_soft_failure() {
    let dir = tempfile::tempdir().unwrap();
    let target = sample(dir.path());
    let blocker = write_sample(dir.path(), "not-a-dir", b"file");

    let generator = CallGraphGenerator::new(
        config(&blocker.join("cache")),
        CountingTool::new(&[IMAGE_SUFFIX], 0),
    );
    assert!(generator.generate(&target).is_none());
    assert_eq!(generator.runner().calls.get(), 0);
}

#[cfg(unix)]
fn shell_tool(cache: &Path, script: &str, timeout_secs: u64) -> CallGraphConfig {
    CallGraphConfig {
        cache_dir: cache.to_path_buf(),
        program: PathBuf::from("/bin/sh"),
        // The target becomes $0, so the prefix after -o is $2.
        program_args: vec!["-c".into(), script.into()],
        script: None,
        render: false,
        timeout_secs: Some(timeout_secs),
        ..Default::default()
    }
}

#[cfg(unix)]
#[test]
fn test_real_process_writes_description() {
    let dir = tempfile::tempdir().unwrap();
    let target = sample(dir.path());
    let cfg = shell_tool(
        &dir.path().join("cache"),
        r#"echo 'digraph {}' > "$2.callgraph.dot""#,
        30,
    );

    let artifact = CallGraphGenerator::new(cfg, ProcessRunner)
        .generate(&target)
        .unwrap();
    assert_eq!(artifact.kind, ArtifactKind::GraphDescription);
    let body = std::fs::read_to_string(&artifact.path).unwrap();
    assert_eq!(body.trim(), "digraph {}");
}

#[cfg(unix)]
#[test]
fn test_hung_tool_is_killed_and_soft_fails() {
    let dir = tempfile::tempdir().unwrap();
    let target = sample(dir.path());
    let cfg = shell_tool(&dir.path().join("cache"), "sleep 30", 1);

    let start = Instant::now();
    let generator = CallGraphGenerator::new(cfg, ProcessRunner);
    assert!(generator.generate(&target).is_none());
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[cfg(unix)]
#[tokio::test]
async fn test_generate_from_async_context() {
    let dir = tempfile::tempdir().unwrap();
    let target = sample(dir.path());
    let cfg = shell_tool(
        &dir.path().join("cache"),
        r#"echo 'digraph {}' > "$2.callgraph.dot""#,
        30,
    );

    let artifact = CallGraphGenerator::new(cfg, ProcessRunner)
        .generate(&target)
        .unwrap();
    assert_eq!(artifact.kind, ArtifactKind::GraphDescription);
    assert!(!artifact.cached);
}
