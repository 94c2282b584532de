//! Logging and tracing infrastructure for maiware.
//!
//! Diagnostics always go to stderr: stdout is reserved for the serialized
//! analysis result.

use std::sync::Once;
use std::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static INIT: Once = Once::new();

/// Initialize the global tracing subscriber.
///
/// This should be called once at program startup.
/// Subsequent calls are ignored.
pub fn init_tracing() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        // A test harness or embedding application may own the global default.
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();

        debug!("maiware tracing initialized");
    });
}

/// Initialize tracing with JSON output for structured logging.
pub fn init_tracing_json() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_current_span(true);

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();

        debug!("maiware tracing initialized (JSON mode)");
    });
}

/// Measures the duration of one pipeline stage.
///
/// When `enabled` is false the timer is inert, so callers can construct one
/// unconditionally.
#[derive(Debug)]
pub struct StageTimer {
    stage: &'static str,
    start: Instant,
    enabled: bool,
}

impl StageTimer {
    /// Start timing `stage`.
    pub fn start(enabled: bool, stage: &'static str) -> Self {
        Self {
            stage,
            start: Instant::now(),
            enabled,
        }
    }

    /// Name of the stage being timed.
    pub fn stage(&self) -> &'static str {
        self.stage
    }

    /// Elapsed seconds since the timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Report the elapsed time and consume the timer.
    pub fn finish(self) -> f64 {
        let elapsed = self.elapsed_secs();
        if self.enabled {
            info!(
                stage = self.stage,
                elapsed_secs = %format!("{:.3}", elapsed),
                "[TIMING]"
            );
        }
        elapsed
    }

    /// Report the elapsed time under a more specific label.
    pub fn finish_as(self, detail: &'static str) -> f64 {
        let elapsed = self.elapsed_secs();
        if self.enabled {
            info!(
                stage = self.stage,
                detail,
                elapsed_secs = %format!("{:.3}", elapsed),
                "[TIMING]"
            );
        }
        elapsed
    }
}

/// Macro for logging and returning errors
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {{
        let e = $err;
        tracing::error!(error = %e, "Operation failed");
        e
    }};
    ($err:expr, $msg:expr) => {{
        let e = $err;
        tracing::error!(error = %e, message = $msg, "Operation failed");
        e
    }};
}
