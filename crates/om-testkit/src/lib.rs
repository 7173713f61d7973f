//! # om-testkit
//!
//! Shared test infrastructure: an in-memory [`FakeConfigurator`] that
//! speaks the client's [`om_client::Transport`] protocol, and fixtures for
//! request parameters.

pub mod fake;
pub mod fixtures;

pub use fake::FakeConfigurator;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Installs a test subscriber honoring `RUST_LOG`; safe to call per test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
