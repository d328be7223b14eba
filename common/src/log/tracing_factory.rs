use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

static INIT: Once = Once::new();

/// Where log events are written: stdout for interactive/debug runs, a
/// rolling daily file under `log_dir` for a deployed server.
#[derive(Debug, Clone)]
pub enum LogOutput {
    Stdout,
    RollingFile { log_dir: String, file_prefix: String },
}

/// Sets up the process-wide `tracing` subscriber exactly once. Follow-up
/// calls are no-ops, so every crate entry point (the server binary, an
/// embed-mode caller, a test) can call this defensively.
#[derive(Debug, Clone, Default)]
pub struct TracingFactory;

impl TracingFactory {
    pub fn init(debug: bool, output: LogOutput) {
        INIT.call_once(|| {
            let level = if debug { "debug" } else { "info" };
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

            match output {
                LogOutput::Stdout => {
                    let _ = Registry::default()
                        .with(filter)
                        .with(fmt::layer().with_target(true))
                        .try_init();
                }
                LogOutput::RollingFile { log_dir, file_prefix } => {
                    let appender = tracing_appender::rolling::daily(log_dir, file_prefix);
                    let (writer, guard) = tracing_appender::non_blocking(appender);
                    // Leaking the guard is deliberate: the subscriber must
                    // outlive every caller for the remainder of the process.
                    std::mem::forget(guard);
                    let _ = Registry::default()
                        .with(filter)
                        .with(fmt::layer().with_writer(writer).with_ansi(false))
                        .try_init();
                }
            }
        });
    }

    /// Convenience for tests: stdout output at debug level, idempotent.
    pub fn init_test_log() {
        Self::init(true, LogOutput::Stdout);
    }
}
