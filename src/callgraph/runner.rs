//! Running the external call-graph tool.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tracing::debug;

use crate::error::{MaiwareError, Result};
use crate::timeout::{with_timeout, TimeoutConfig};

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

/// Captured result of a finished tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was terminated by a signal
    pub status: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Trimmed stderr, falling back to stdout; `None` when both are blank.
    pub fn diagnostic(&self) -> Option<&str> {
        [self.stderr.trim(), self.stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
    }
}

/// Runs a tool invocation to completion.
pub trait ToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        (**self).run(invocation)
    }
}

/// Spawns the tool as a child process with captured output.
///
/// The call blocks the current thread. When the invocation carries a
/// timeout, the child is killed once it expires and the run fails with
/// [`MaiwareError::Timeout`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

async fn spawn_and_wait(invocation: &ToolInvocation) -> Result<ToolOutput> {
    let mut cmd = tokio::process::Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &invocation.working_dir {
        cmd.current_dir(dir);
    }
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let child = cmd.spawn().map_err(|e| {
        MaiwareError::Tool(format!(
            "failed to start {}: {}",
            invocation.program.display(),
            e
        ))
    })?;
    let output = child.wait_with_output().await?;

    Ok(ToolOutput {
        status: output.status.code(),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn run_blocking(invocation: &ToolInvocation) -> Result<ToolOutput> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| MaiwareError::Tool(format!("runtime error: {e}")))?;

    rt.block_on(async {
        match invocation.timeout {
            Some(duration) => {
                let config = TimeoutConfig::from_duration(duration, "call-graph tool");
                with_timeout(config, spawn_and_wait(invocation)).await
            }
            None => spawn_and_wait(invocation).await,
        }
    })
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        debug!(program = %invocation.program.display(), args = ?invocation.args, "spawning tool");

        if tokio::runtime::Handle::try_current().is_err() {
            return run_blocking(invocation);
        }

        // A runtime cannot be blocked on from inside another one; give the
        // private runtime its own thread.
        std::thread::scope(|scope| {
            scope
                .spawn(|| run_blocking(invocation))
                .join()
                .map_err(|_| MaiwareError::Tool("tool runner thread panicked".into()))?
        })
    }
}
