//! Tracing/logging setup shared by every MeritPath binary.

/// Tracing subscriber configuration.
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide logging from the environment.
///
/// - `RUST_LOG` selects the filter (default `info`)
/// - `MERITPATH_LOG_FORMAT=pretty` switches from JSON to human-readable output
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    crate::tracing::init(LogFormat::from_env());
}
