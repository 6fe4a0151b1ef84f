//! Process-wide logging setup shared by every binary.

/// Initialize structured logging with the `info` default filter.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_FILTER);
}

/// Subscriber configuration (filters, JSON layer).
pub mod tracing;
