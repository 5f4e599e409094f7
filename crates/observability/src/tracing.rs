//! Tracing/logging initialization.
//!
//! JSON lines on stdout; the filter comes from `RUST_LOG` when set.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber, falling back to `default_directives`
/// when `RUST_LOG` is unset or invalid.
///
/// Safe to call multiple times (subsequent calls are no-ops). Returns whether
/// this call installed the subscriber.
pub fn init_with_default(default_directives: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let _ = init_with_default("warn");
        assert!(!init_with_default("debug"));
        ::tracing::info!(component = "observability", "still logging after re-init");
    }
}
