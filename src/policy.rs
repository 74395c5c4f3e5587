//! Traffic reset eligibility.
//!
//! Every client has at most one active reset policy, chosen by precedence:
//!
//! 1. **Fixed day** - `traffic_reset_day > 0`. Counters reset when the
//!    calendar day matches, unless the client has already expired. There is
//!    no periodic fallback on other days.
//! 2. **Periodic** - `last_traffic_reset > 0`. Counters reset once
//!    [`PERIODIC_RESET_INTERVAL_SECS`] have elapsed since the last reset.
//!    Expiry is not consulted on this branch.
//! 3. **None** - neither is configured; the client is never reset
//!    automatically.
//!
//! Evaluation is pure: the caller supplies `now`, so a whole batch can be
//! judged against the same instant.

use chrono::{DateTime, Datelike, TimeZone};

use crate::client::Client;

/// Rolling reset interval: 30 days in seconds.
pub const PERIODIC_RESET_INTERVAL_SECS: i64 = 30 * 24 * 60 * 60;

/// The reset policy in effect for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// No reset configured.
    None,
    /// Reset on a fixed day of the month.
    FixedDay {
        day: u32,
        /// Unix seconds; `None` if the client never expires.
        expiry: Option<i64>,
    },
    /// Reset when `interval_secs` have elapsed since `last_reset`.
    Periodic { last_reset: i64, interval_secs: i64 },
}

impl ResetPolicy {
    /// Derive the active policy from a client's settings.
    pub fn for_client(client: &Client) -> Self {
        if client.traffic_reset_day > 0 {
            ResetPolicy::FixedDay {
                day: client.traffic_reset_day as u32,
                expiry: (client.expiry > 0).then_some(client.expiry),
            }
        } else if client.last_traffic_reset > 0 {
            ResetPolicy::Periodic {
                last_reset: client.last_traffic_reset,
                interval_secs: PERIODIC_RESET_INTERVAL_SECS,
            }
        } else {
            ResetPolicy::None
        }
    }

    /// Whether the policy fires at `now`.
    pub fn is_due<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        let now_secs = now.timestamp();

        match *self {
            ResetPolicy::None => false,
            ResetPolicy::FixedDay { day, expiry } => {
                if now.day() != day {
                    return false;
                }
                // Expired clients keep their counters on the reset day
                !matches!(expiry, Some(expiry) if now_secs > expiry)
            }
            ResetPolicy::Periodic {
                last_reset,
                interval_secs,
            } => now_secs.saturating_sub(last_reset) >= interval_secs,
        }
    }

    /// Short label for log output.
    pub fn kind(&self) -> &'static str {
        match self {
            ResetPolicy::None => "none",
            ResetPolicy::FixedDay { .. } => "fixed_day",
            ResetPolicy::Periodic { .. } => "periodic",
        }
    }
}

/// Decide whether `client`'s traffic counters should be reset at `now`.
pub fn should_reset<Tz: TimeZone>(client: &Client, now: &DateTime<Tz>) -> bool {
    ResetPolicy::for_client(client).is_due(now)
}
