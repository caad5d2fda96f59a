//! Logging for tests
//!
//! Rewrite decisions are emitted under the `vtx_core::rewrite` target.
//! Embedders install their own subscriber; tests use [`init_test`].

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// Route `vtx_core` debug events to the test writer
///
/// `RUST_LOG` overrides the default `vtx_core=debug` filter.
#[cfg(feature = "logging")]
pub fn init_test() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vtx_core=debug"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
