//! Background jobs.
//!
//! # Available Jobs
//!
//! - **Traffic Reset**: zeroes the `up`/`down` counters of clients whose
//!   fixed reset day has come or whose 30-day period has elapsed
//!
//! The job functions themselves are always available; the cron-driven
//! [`JobScheduler`] requires the `background-jobs` feature.
//!
//! # Usage
//!
//! ```rust,ignore
//! use traffic_reset::jobs::{JobScheduler, JobConfig};
//! use traffic_reset::server::Database;
//!
//! let db = Database::new().await?;
//! let config = JobConfig::default();
//! let scheduler = JobScheduler::new(db, config).await?;
//! scheduler.start().await?;
//! ```

mod traffic_reset;

pub use traffic_reset::{
    run_traffic_reset, run_traffic_reset_at, run_traffic_reset_job, CommitMode, ResetSummary,
};

use crate::config::JobsConfig;

/// Configuration for background jobs.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Whether the traffic reset job is scheduled (default: true)
    pub traffic_reset_enabled: bool,
    /// Cron expression for the traffic reset job (default: daily at midnight)
    pub traffic_reset_cron: String,
    /// Transaction handling for failed updates (default: best effort)
    pub commit_mode: CommitMode,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            traffic_reset_enabled: true,
            traffic_reset_cron: "0 0 0 * * *".to_string(),
            commit_mode: CommitMode::BestEffort,
        }
    }
}

impl From<&JobsConfig> for JobConfig {
    fn from(config: &JobsConfig) -> Self {
        Self {
            traffic_reset_enabled: config.traffic_reset_enabled,
            traffic_reset_cron: config.traffic_reset_cron.clone(),
            commit_mode: if config.traffic_reset_all_or_nothing {
                CommitMode::AllOrNothing
            } else {
                CommitMode::BestEffort
            },
        }
    }
}

/// Errors that can occur in the job scheduler.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Scheduler error: {0}")]
    SchedulerError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Job execution error: {0}")]
    ExecutionError(String),
}

impl From<crate::errors::ResetError> for JobError {
    fn from(err: crate::errors::ResetError) -> Self {
        JobError::DatabaseError(err.to_string())
    }
}

#[cfg(feature = "background-jobs")]
pub use scheduler::JobScheduler;

#[cfg(feature = "background-jobs")]
mod scheduler {
    use std::sync::Arc;
    use tokio_cron_scheduler::{Job, JobScheduler as TokioJobScheduler};
    use tracing::info;

    use crate::server::database::Database;

    use super::{run_traffic_reset, run_traffic_reset_job, JobConfig, JobError, ResetSummary};

    /// Cron-driven background job scheduler.
    pub struct JobScheduler {
        scheduler: TokioJobScheduler,
        db: Arc<Database>,
        config: JobConfig,
    }

    impl JobScheduler {
        /// Create a new job scheduler.
        pub async fn new(db: Arc<Database>, config: JobConfig) -> Result<Self, JobError> {
            let scheduler = TokioJobScheduler::new()
                .await
                .map_err(|e| JobError::SchedulerError(e.to_string()))?;

            Ok(Self {
                scheduler,
                db,
                config,
            })
        }

        /// Start the job scheduler with all configured jobs.
        pub async fn start(&self) -> Result<(), JobError> {
            info!("Starting traffic reset job scheduler");

            if self.config.traffic_reset_enabled {
                self.add_traffic_reset_job().await?;
            }

            self.scheduler
                .start()
                .await
                .map_err(|e| JobError::SchedulerError(e.to_string()))?;

            info!("Job scheduler started successfully");

            Ok(())
        }

        /// Stop the job scheduler.
        pub async fn shutdown(&mut self) -> Result<(), JobError> {
            info!("Shutting down job scheduler");
            self.scheduler
                .shutdown()
                .await
                .map_err(|e| JobError::SchedulerError(e.to_string()))?;
            Ok(())
        }

        /// Add the traffic reset job.
        async fn add_traffic_reset_job(&self) -> Result<(), JobError> {
            let db = Arc::clone(&self.db);
            let mode = self.config.commit_mode;

            let job = Job::new_async(
                self.config.traffic_reset_cron.as_str(),
                move |_uuid, _l| {
                    let db = Arc::clone(&db);
                    Box::pin(async move {
                        run_traffic_reset_job(&*db, mode).await;
                    })
                },
            )
            .map_err(|e| JobError::SchedulerError(e.to_string()))?;

            self.scheduler
                .add(job)
                .await
                .map_err(|e| JobError::SchedulerError(e.to_string()))?;

            info!(
                "Added traffic reset job (schedule: {}, mode: {:?}, db: {})",
                self.config.traffic_reset_cron,
                self.config.commit_mode,
                self.db.db_type()
            );

            Ok(())
        }

        /// Run the traffic reset immediately (useful for testing or manual triggers).
        pub async fn run_traffic_reset_now(&self) -> Result<ResetSummary, JobError> {
            run_traffic_reset(&*self.db, self.config.commit_mode).await
        }
    }
}
