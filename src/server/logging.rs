//! Logging setup and structured traffic events.
//!
//! # Usage
//!
//! ```rust,ignore
//! use traffic_reset::config::init_config;
//! use traffic_reset::server::logging::init_logging;
//!
//! let config = init_config()?;
//! init_logging(&config.logging);
//! ```

use std::str::FromStr;

use tracing::{debug, info_span, warn, Level};
use uuid::Uuid;

use crate::config::LoggingConfig;

/// Per-client traffic event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficEvent {
    /// Counters were zeroed
    Reset,
    /// The counter update failed and the client was skipped
    ResetFailed,
}

impl std::fmt::Display for TrafficEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrafficEvent::Reset => "reset",
            TrafficEvent::ResetFailed => "reset_failed",
        };
        write!(f, "{}", s)
    }
}

/// Log a per-client traffic event.
///
/// Successful resets are logged at debug level, failures at warn level.
///
/// # Arguments
///
/// * `event` - The type of traffic event
/// * `client_name` - The client's display name
/// * `details` - Optional additional details (the error, for failures)
pub fn log_traffic_event(event: TrafficEvent, client_name: &str, details: Option<&str>) {
    let span = info_span!(
        "traffic_event",
        event = %event,
        client = %client_name,
    );
    let _enter = span.enter();

    match event {
        TrafficEvent::ResetFailed => {
            if let Some(d) = details {
                warn!(error = %d, "Failed to reset traffic for client: {}", client_name);
            } else {
                warn!("Failed to reset traffic for client: {}", client_name);
            }
        }
        TrafficEvent::Reset => {
            if let Some(d) = details {
                debug!(details = %d, "Resetting traffic for client: {}", client_name);
            } else {
                debug!("Resetting traffic for client: {}", client_name);
            }
        }
    }
}

/// Generate a new unique run ID.
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Parse a configured level, falling back to INFO.
pub fn parse_level(level: &str) -> Level {
    Level::from_str(level.trim()).unwrap_or(Level::INFO)
}

/// Install the global fmt subscriber.
///
/// Does nothing when logging is disabled or a subscriber is already set.
pub fn init_logging(config: &LoggingConfig) {
    if !config.enabled {
        return;
    }

    let _ = tracing_subscriber::fmt()
        .with_max_level(parse_level(&config.level))
        .with_target(false)
        .try_init();
}
