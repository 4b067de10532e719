//! Tracing initialization for tests and binaries
//!
//! Provides centralized tracing setup with environment-based filtering.

use once_cell::sync::Lazy;

/// Initialize tracing for tests with environment-based filtering
///
/// Uses RUST_LOG environment variable to control output:
/// - `RUST_LOG=qcldpc=debug` - Show all debug output
/// - `RUST_LOG=qcldpc::batch=trace` - Trace batch dispatch only
/// - `RUST_LOG=qcldpc=info,qcldpc::ldpc::decode=trace` - Mixed levels
///
/// Call this at the start of each test that needs tracing.
/// Multiple calls are safe (uses once_cell).
pub fn init_test_tracing() {
    static TRACING: Lazy<()> = Lazy::new(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        // Fall back to "qcldpc=warn" if RUST_LOG is not set
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("qcldpc=warn"));

        // another harness may already have installed a subscriber
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .with_test_writer()
            .try_init();
    });

    Lazy::force(&TRACING);
}

/// Initialize tracing for binaries with environment-based filtering
///
/// Call this early in main() to enable tracing throughout the application.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("qcldpc=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();
}
