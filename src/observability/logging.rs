//! Structured logging.
//!
//! # Responsibilities
//! - Install the global subscriber (env filter + fmt layer)
//! - Raise verbosity in debug mode
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured filter
//! - Installation is fallible instead of panicking when a subscriber exists

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Filter applied in debug mode when `RUST_LOG` is unset.
const DEBUG_FILTER: &str = "qflask=debug,tower_http=debug";

/// Install the global tracing subscriber.
pub fn init(config: &ObservabilityConfig, debug: bool) -> Result<(), TryInitError> {
    let fallback = if debug {
        DEBUG_FILTER
    } else {
        config.log_filter.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
