//! Tracing spans and subscriber setup.
//!
//! Library code only emits `tracing` events; the binary decides where they go
//! by calling [`init_tracing`].

mod spans;

pub use spans::{ExtractionSpan, request_span};

/// Default directives when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,tower_http=info";

/// Installs a formatting subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`. Calling it twice is harmless.
#[cfg(feature = "server")]
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
