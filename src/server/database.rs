use async_trait::async_trait;
use sqlx::{query, query_as, Connection};
use std::sync::Arc;
use tracing::error;

#[cfg(feature = "sqlite")]
use sqlx::{Sqlite, SqlitePool};

#[cfg(feature = "postgres")]
use sqlx::{PgPool, Postgres};

use crate::client::Client;
use crate::config::{get_config, DatabaseConfig};
use crate::errors::{ResetError, ResetResult};
use crate::store::TrafficStore;

const SELECT_CLIENT_COLUMNS: &str =
    "SELECT id, name, traffic_reset_day, expiry, last_traffic_reset, up, down FROM clients";

/// Unified database abstraction over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

/// An open transaction on either backend.
///
/// Dropping it without calling [`TrafficStore::commit`] rolls it back.
pub enum DatabaseTransaction {
    #[cfg(feature = "sqlite")]
    SQLite(sqlx::Transaction<'static, Sqlite>),
    #[cfg(feature = "postgres")]
    Postgres(sqlx::Transaction<'static, Postgres>),
}

fn db_err(op: &str, e: sqlx::Error) -> ResetError {
    error!("{op} failed: {e}");
    ResetError::DatabaseError(format!("{op}: {e}"))
}

fn update_err(e: sqlx::Error) -> ResetError {
    ResetError::DatabaseError(format!("reset_client_traffic: {e}"))
}

impl Database {
    /// Initialize the database connection from the global configuration.
    ///
    /// See `crate::config` for configuration options.
    pub async fn new() -> ResetResult<Arc<Self>> {
        let config = get_config()?;
        Self::connect(&config.database).await.map(Arc::new)
    }

    /// Connect using an explicit database configuration.
    pub async fn connect(db_config: &DatabaseConfig) -> ResetResult<Self> {
        match db_config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let pool = SqlitePool::connect(&db_config.sqlite_url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to SQLite: {e}");
                        ResetError::DatabaseError(format!("failed to connect to SQLite: {e}"))
                    })?;

                Ok(Database::SQLite(pool))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(ResetError::ConfigError(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPool::connect(&db_config.postgres_url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to PostgreSQL: {e}");
                        ResetError::DatabaseError(format!(
                            "failed to connect to PostgreSQL: {e}"
                        ))
                    })?;

                Ok(Database::Postgres(pool))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(ResetError::ConfigError(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            other => Err(ResetError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Database backend name, for log output.
    pub fn db_type(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
        }
    }

    /// Insert a new client or update an existing one, keyed on `id`.
    ///
    /// Clients are owned by the panel; this exists for provisioning and tests.
    pub async fn insert_client(&self, client: &Client) -> ResetResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(
                    r#"
                    INSERT INTO clients (id, name, traffic_reset_day, expiry, last_traffic_reset, up, down)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(id) DO UPDATE SET
                        name               = excluded.name,
                        traffic_reset_day  = excluded.traffic_reset_day,
                        expiry             = excluded.expiry,
                        last_traffic_reset = excluded.last_traffic_reset,
                        up                 = excluded.up,
                        down               = excluded.down
                    "#,
                )
                .bind(client.id)
                .bind(&client.name)
                .bind(client.traffic_reset_day)
                .bind(client.expiry)
                .bind(client.last_traffic_reset)
                .bind(client.up)
                .bind(client.down)
                .execute(pool)
                .await
                .map_err(|e| db_err("SQLite insert_client", e))?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    r#"
                    INSERT INTO clients (id, name, traffic_reset_day, expiry, last_traffic_reset, up, down)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT (id) DO UPDATE SET
                        name               = EXCLUDED.name,
                        traffic_reset_day  = EXCLUDED.traffic_reset_day,
                        expiry             = EXCLUDED.expiry,
                        last_traffic_reset = EXCLUDED.last_traffic_reset,
                        up                 = EXCLUDED.up,
                        down               = EXCLUDED.down
                    "#,
                )
                .bind(client.id)
                .bind(&client.name)
                .bind(client.traffic_reset_day)
                .bind(client.expiry)
                .bind(client.last_traffic_reset)
                .bind(client.up)
                .bind(client.down)
                .execute(pool)
                .await
                .map_err(|e| db_err("Postgres insert_client", e))?;
            }
        }

        Ok(())
    }

    /// Fetch a client by its ID.
    ///
    /// Returns:
    /// - `Ok(Some(Client))` if found
    /// - `Ok(None)` if not found
    /// - `Err(ResetError::DatabaseError)` on DB failure
    pub async fn get_client(&self, client_id: i64) -> ResetResult<Option<Client>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                let sql = format!("{SELECT_CLIENT_COLUMNS} WHERE id = ?");
                let client = query_as::<_, Client>(&sql)
                    .bind(client_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| db_err("SQLite get_client", e))?;

                Ok(client)
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let sql = format!("{SELECT_CLIENT_COLUMNS} WHERE id = $1");
                let client = query_as::<_, Client>(&sql)
                    .bind(client_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| db_err("Postgres get_client", e))?;

                Ok(client)
            }
        }
    }
}

#[async_trait]
impl TrafficStore for Database {
    type Tx = DatabaseTransaction;

    async fn fetch_reset_candidates(&self) -> ResetResult<Vec<Client>> {
        let sql = format!(
            "{SELECT_CLIENT_COLUMNS} WHERE traffic_reset_day > 0 OR last_traffic_reset > 0 ORDER BY id"
        );

        let clients = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, Client>(&sql)
                .fetch_all(pool)
                .await
                .map_err(|e| db_err("SQLite fetch_reset_candidates", e))?,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, Client>(&sql)
                .fetch_all(pool)
                .await
                .map_err(|e| db_err("Postgres fetch_reset_candidates", e))?,
        };

        Ok(clients)
    }

    async fn begin(&self) -> ResetResult<DatabaseTransaction> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => pool
                .begin()
                .await
                .map(DatabaseTransaction::SQLite)
                .map_err(|e| db_err("SQLite begin", e)),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => pool
                .begin()
                .await
                .map(DatabaseTransaction::Postgres)
                .map_err(|e| db_err("Postgres begin", e)),
        }
    }

    async fn reset_client_traffic(
        &self,
        tx: &mut DatabaseTransaction,
        client_id: i64,
        reset_at: i64,
    ) -> ResetResult<()> {
        // Per-row failures are reported by the caller, so no error! here.
        // Each update runs in its own savepoint: on Postgres a failed statement
        // otherwise aborts the whole transaction and COMMIT turns into ROLLBACK.
        let rows_affected = match tx {
            #[cfg(feature = "sqlite")]
            DatabaseTransaction::SQLite(tx) => {
                let mut savepoint = Connection::begin(&mut **tx).await.map_err(update_err)?;

                let result = query(
                    "UPDATE clients \
                         SET up = 0, down = 0, last_traffic_reset = ? \
                         WHERE id = ?",
                )
                .bind(reset_at)
                .bind(client_id)
                .execute(&mut *savepoint)
                .await;

                match result {
                    Ok(done) => {
                        savepoint.commit().await.map_err(update_err)?;
                        done.rows_affected()
                    }
                    Err(e) => {
                        savepoint.rollback().await.map_err(update_err)?;
                        return Err(update_err(e));
                    }
                }
            }
            #[cfg(feature = "postgres")]
            DatabaseTransaction::Postgres(tx) => {
                let mut savepoint = Connection::begin(&mut **tx).await.map_err(update_err)?;

                let result = query(
                    "UPDATE clients \
                         SET up = 0, down = 0, last_traffic_reset = $1 \
                         WHERE id = $2",
                )
                .bind(reset_at)
                .bind(client_id)
                .execute(&mut *savepoint)
                .await;

                match result {
                    Ok(done) => {
                        savepoint.commit().await.map_err(update_err)?;
                        done.rows_affected()
                    }
                    Err(e) => {
                        savepoint.rollback().await.map_err(update_err)?;
                        return Err(update_err(e));
                    }
                }
            }
        };

        if rows_affected == 0 {
            return Err(ResetError::DatabaseError(format!(
                "client {client_id} not found"
            )));
        }

        Ok(())
    }

    async fn commit(&self, tx: DatabaseTransaction) -> ResetResult<()> {
        match tx {
            #[cfg(feature = "sqlite")]
            DatabaseTransaction::SQLite(tx) => {
                tx.commit().await.map_err(|e| db_err("SQLite commit", e))
            }
            #[cfg(feature = "postgres")]
            DatabaseTransaction::Postgres(tx) => {
                tx.commit().await.map_err(|e| db_err("Postgres commit", e))
            }
        }
    }

    async fn rollback(&self, tx: DatabaseTransaction) -> ResetResult<()> {
        match tx {
            #[cfg(feature = "sqlite")]
            DatabaseTransaction::SQLite(tx) => {
                tx.rollback().await.map_err(|e| db_err("SQLite rollback", e))
            }
            #[cfg(feature = "postgres")]
            DatabaseTransaction::Postgres(tx) => tx
                .rollback()
                .await
                .map_err(|e| db_err("Postgres rollback", e)),
        }
    }
}
