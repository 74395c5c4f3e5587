//! Storage seam used by the traffic reset job.
//!
//! The job only needs five operations from storage: fetch the candidates,
//! open a transaction, zero one client's counters inside it, and commit or
//! roll back. [`crate::server::Database`] implements this over SQLite and
//! PostgreSQL; tests can supply their own.

use async_trait::async_trait;

use crate::client::Client;
use crate::errors::ResetResult;

#[async_trait]
pub trait TrafficStore: Send + Sync {
    /// Transaction handle. Dropping it without committing must roll back.
    type Tx: Send;

    /// All clients with `traffic_reset_day > 0 OR last_traffic_reset > 0`.
    async fn fetch_reset_candidates(&self) -> ResetResult<Vec<Client>>;

    async fn begin(&self) -> ResetResult<Self::Tx>;

    /// Set `up = 0`, `down = 0` and `last_traffic_reset = reset_at` for one client.
    async fn reset_client_traffic(
        &self,
        tx: &mut Self::Tx,
        client_id: i64,
        reset_at: i64,
    ) -> ResetResult<()>;

    async fn commit(&self, tx: Self::Tx) -> ResetResult<()>;

    async fn rollback(&self, tx: Self::Tx) -> ResetResult<()>;
}
