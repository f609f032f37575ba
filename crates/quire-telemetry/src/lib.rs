//! Tracing setup for quire.
//!
//! Logs go to stderr through a `fmt` layer. `RUST_LOG` picks the filter;
//! without it the default directives apply.
//!
//! ```bash
//! RUST_LOG=quire_collab=debug,warn cargo test -p quire-collab
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "info";

/// `RUST_LOG` if set and valid, else `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber with [`DEFAULT_DIRECTIVES`].
///
/// Safe to call more than once, e.g. from every test; only the first call
/// installs anything.
pub fn init_tracing() -> bool {
    init_tracing_with(DEFAULT_DIRECTIVES)
}

/// Like [`init_tracing`] with a different default filter. Returns whether
/// this call installed the subscriber.
pub fn init_tracing_with(default: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        assert!(!init_tracing());
        tracing::info!("still logging");
    }
}
