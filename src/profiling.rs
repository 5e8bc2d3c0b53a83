//! # Profiling Guide
//!
//! Parallel dispatch always emits `tracing` events: a `debug` event per
//! `run_parallel` call (domain length, chunk count, worker slots), a `debug`
//! event when a workers limit is clamped, a `warn` event per failed chunk and
//! an `error` event when a structural change hits a blocked world.
//!
//! Enable the `profiling` feature to also get spans:
//!
//! ```toml
//! [dependencies]
//! pool_ecs = { version = "0.3", features = ["profiling"] }
//! ```
//!
//! * `run_parallel` (fields `chunks`, `workers`) around the whole dispatch
//! * `chunk` (fields `worker`, `from`, `before`) around each callback
//!
//! ## Collecting Spans
//!
//! ```ignore
//! let _guard = pool_ecs::profiling::init_file_tracing("trace.log")?;
//! // run queries; the guard flushes the file on drop
//! ```
//!
//! Or install any subscriber yourself:
//!
//! ```ignore
//! use tracing_subscriber::prelude::*;
//!
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(tracing_subscriber::EnvFilter::from_default_env())
//!     .init();
//! ```
//!
//! ## Performance Tips
//!
//! 1. Profile in release mode; debug builds also pay for structural guard checks
//! 2. Use `RUST_LOG=pool_ecs=debug` to see dispatch events

#[cfg(feature = "profiling")]
use crate::error::{EcsError, Result};

/// Route all tracing output to `path` through a non-blocking writer.
///
/// Keep the returned guard alive until the program ends; dropping it flushes
/// buffered records.
#[cfg(feature = "profiling")]
pub fn init_file_tracing(
    path: impl AsRef<std::path::Path>,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let file = std::fs::File::create(path.as_ref())?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .try_init()
        .map_err(|e| EcsError::ProfilingSetup(e.to_string()))?;
    Ok(guard)
}
