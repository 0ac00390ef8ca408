//! Optional `tracing-subscriber` init helper.
//!
//! The engine never installs a global subscriber itself — only a binary or
//! test harness embedding it should do that. This helper exists so callers
//! don't have to hand-assemble the usual filter + format + span-trace layer
//! stack by hand.

use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a formatting subscriber honoring `RUST_LOG`, defaulting to
/// `info` when unset, with an [`ErrorLayer`] so step/group errors captured
/// as `tracing_error::SpanTrace`-aware values carry their originating span
/// chain. Returns an error if a global subscriber is already installed.
pub fn init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(true))
        .with(ErrorLayer::default())
        .try_init()
}
