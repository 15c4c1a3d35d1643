//! Process-wide tracing setup: a non-blocking file writer plus `RUST_LOG`
//! (or an explicit fallback filter) for engine and test diagnostics.

use std::{path::Path, sync::OnceLock};
use tracing_subscriber::{EnvFilter, fmt};

static GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
static INIT: OnceLock<()> = OnceLock::new();

fn build_env_filter(fallback: &str) -> EnvFilter {
    if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(fallback).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initializes logging once for the whole process; later calls are no-ops.
///
/// `path` is the log file to append to (its parent directories are created
/// if missing); `filter` is the fallback `EnvFilter` string used when
/// `RUST_LOG` isn't set, e.g. `"perft=trace,execute=debug"`.
pub fn init_logging<P: AsRef<Path>>(path: P, filter: &str) {
    INIT.get_or_init(|| {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .expect("open log file");

        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let _ = GUARD.set(guard);

        let subscriber = fmt()
            .with_env_filter(build_env_filter(filter))
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(non_blocking)
            .finish();

        // Idempotent: a prior call (e.g. another test in the same binary) may
        // have already installed a subscriber.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
