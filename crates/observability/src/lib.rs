//! Tracing/logging setup shared by Assist binaries.

/// Initialize process-wide tracing with the format from `ASSIST_LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let format = std::env::var("ASSIST_LOG_FORMAT")
        .ok()
        .and_then(|raw| tracing::LogFormat::parse(&raw))
        .unwrap_or_default();
    tracing::init(format);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::LogFormat;
