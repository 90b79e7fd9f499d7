//! Tracing subscriber setup for binaries.
//!
//! Filter settings come from `RUST_LOG`. The library itself only emits
//! `tracing` events; installing a subscriber is left to the executable.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber writing to stderr.
///
/// ```rust,no_run
/// daemon_core::logging::init();
/// tracing::info!("logging ready");
/// ```
pub fn init() {
    init_with_writer(fmt::writer::BoxMakeWriter::new(std::io::stderr));
}

/// Install the global subscriber with a custom writer. Does nothing if a
/// subscriber is already installed.
pub fn init_with_writer<W>(writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .try_init();
}
