//! Client records as stored in the `clients` table.

use sqlx::FromRow;

/// A client account with its traffic counters and reset settings.
///
/// Only the columns this crate reads or writes are mapped. Zero in any of
/// the optional settings means "not configured":
/// - `traffic_reset_day == 0` → no fixed reset day
/// - `expiry == 0` → never expires
/// - `last_traffic_reset == 0` → never reset
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct Client {
    pub id: i64,
    /// Display label, used only in log output.
    pub name: String,
    /// Day of month (1-31) on which the counters are reset.
    pub traffic_reset_day: i32,
    /// Unix seconds after which the client is expired.
    pub expiry: i64,
    /// Unix seconds of the most recent reset.
    pub last_traffic_reset: i64,
    /// Uploaded bytes since the last reset.
    pub up: i64,
    /// Downloaded bytes since the last reset.
    pub down: i64,
}

impl Client {
    /// Whether any reset policy is configured for this client.
    ///
    /// Mirrors the candidate filter used by the storage layer:
    /// `traffic_reset_day > 0 OR last_traffic_reset > 0`.
    pub fn has_reset_policy(&self) -> bool {
        self.traffic_reset_day > 0 || self.last_traffic_reset > 0
    }

    /// Total traffic (up + down) since the last reset.
    pub fn total_traffic(&self) -> i64 {
        self.up.saturating_add(self.down)
    }
}
