//! Executor behaviour against a scripted `TrafficStore`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Mutex;

use traffic_reset::errors::{ResetError, ResetResult};
use traffic_reset::jobs::{
    run_traffic_reset, run_traffic_reset_at, run_traffic_reset_job, CommitMode, JobError,
};
use traffic_reset::{Client, TrafficStore};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Fetch,
    Begin,
    Reset(i64, i64),
    Commit,
    Rollback,
}

/// Records every call and fails where told to.
#[derive(Default)]
struct ScriptedStore {
    clients: Vec<Client>,
    fail_fetch: bool,
    fail_ids: HashSet<i64>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedStore {
    fn with_clients(clients: Vec<Client>) -> Self {
        Self {
            clients,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl TrafficStore for ScriptedStore {
    type Tx = ();

    async fn fetch_reset_candidates(&self) -> ResetResult<Vec<Client>> {
        self.record(Call::Fetch);
        if self.fail_fetch {
            return Err(ResetError::DatabaseError("connection refused".to_string()));
        }
        Ok(self
            .clients
            .iter()
            .filter(|c| c.has_reset_policy())
            .cloned()
            .collect())
    }

    async fn begin(&self) -> ResetResult<()> {
        self.record(Call::Begin);
        Ok(())
    }

    async fn reset_client_traffic(
        &self,
        _tx: &mut (),
        client_id: i64,
        reset_at: i64,
    ) -> ResetResult<()> {
        self.record(Call::Reset(client_id, reset_at));
        if self.fail_ids.contains(&client_id) {
            return Err(ResetError::DatabaseError("constraint violation".to_string()));
        }
        Ok(())
    }

    async fn commit(&self, _tx: ()) -> ResetResult<()> {
        self.record(Call::Commit);
        Ok(())
    }

    async fn rollback(&self, _tx: ()) -> ResetResult<()> {
        self.record(Call::Rollback);
        Ok(())
    }
}

fn client(id: i64, traffic_reset_day: i32, last_traffic_reset: i64) -> Client {
    Client {
        id,
        name: format!("client-{id}"),
        traffic_reset_day,
        last_traffic_reset,
        up: 100,
        down: 200,
        ..Default::default()
    }
}

fn reset_day() -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(2025, 6, 22, 12, 0, 0)
        .unwrap()
        .fixed_offset()
}

#[tokio::test]
async fn fetch_failure_opens_no_transaction() {
    let store = ScriptedStore {
        fail_fetch: true,
        ..Default::default()
    };

    let result = run_traffic_reset_at(&store, &reset_day(), CommitMode::BestEffort).await;

    assert!(matches!(result, Err(JobError::DatabaseError(_))));
    assert_eq!(store.calls(), vec![Call::Fetch]);
}

#[tokio::test]
async fn updates_due_clients_in_retrieval_order_then_commits() {
    let now = reset_day();
    let due = (now - Duration::days(35)).timestamp();
    let recent = (now - Duration::days(20)).timestamp();
    let store = ScriptedStore::with_clients(vec![
        client(5, 22, 0),
        client(2, 1, 0),
        client(4, 0, due),
        client(6, 0, recent),
        client(7, 0, 0),
    ]);

    let summary = run_traffic_reset_at(&store, &now, CommitMode::BestEffort)
        .await
        .expect("run failed");

    assert_eq!(summary.candidates, store.clients.len() - 1);
    assert_eq!(summary.reset, 2);
    assert_eq!(
        store.calls(),
        vec![
            Call::Fetch,
            Call::Begin,
            Call::Reset(5, now.timestamp()),
            Call::Reset(4, now.timestamp()),
            Call::Commit,
        ]
    );
}

#[tokio::test]
async fn best_effort_commits_after_a_failed_update() {
    let now = reset_day();
    let due = (now - Duration::days(35)).timestamp();
    let mut store = ScriptedStore::with_clients(vec![
        client(2, 1, 0),
        client(3, 0, due),
        client(4, 0, due),
    ]);
    store.fail_ids.insert(3);

    let summary = run_traffic_reset_at(&store, &now, CommitMode::BestEffort)
        .await
        .expect("per-client failures must not fail the run");

    assert_eq!(summary.reset, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        store.calls(),
        vec![
            Call::Fetch,
            Call::Begin,
            Call::Reset(3, now.timestamp()),
            Call::Reset(4, now.timestamp()),
            Call::Commit,
        ]
    );
}

#[tokio::test]
async fn all_or_nothing_stops_and_rolls_back() {
    let now = reset_day();
    let due = (now - Duration::days(35)).timestamp();
    let mut store =
        ScriptedStore::with_clients(vec![client(1, 0, due), client(2, 0, due), client(3, 0, due)]);
    store.fail_ids.insert(2);

    let result = run_traffic_reset_at(&store, &now, CommitMode::AllOrNothing).await;

    assert!(matches!(result, Err(JobError::ExecutionError(_))));
    assert_eq!(
        store.calls(),
        vec![
            Call::Fetch,
            Call::Begin,
            Call::Reset(1, now.timestamp()),
            Call::Reset(2, now.timestamp()),
            Call::Rollback,
        ]
    );
}

#[tokio::test]
async fn scheduled_entry_point_swallows_failures() {
    let store = ScriptedStore {
        fail_fetch: true,
        ..Default::default()
    };

    // Must return normally; the failure is only logged.
    run_traffic_reset_job(&store, CommitMode::BestEffort).await;

    assert_eq!(store.calls(), vec![Call::Fetch]);
}

#[tokio::test]
async fn manual_run_reports_failures_to_the_caller() {
    let store = ScriptedStore {
        fail_fetch: true,
        ..Default::default()
    };

    let result = run_traffic_reset(&store, CommitMode::BestEffort).await;

    assert!(matches!(result, Err(JobError::DatabaseError(_))));
    assert_eq!(store.calls(), vec![Call::Fetch]);
}
