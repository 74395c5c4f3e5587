use std::env;

use tracing::{error, info};

use traffic_reset::config::init_config;
use traffic_reset::jobs::{run_traffic_reset, JobConfig, JobScheduler};
use traffic_reset::server::{init_logging, Database};

/// `traffic-reset` runs the scheduler until Ctrl-C.
/// `traffic-reset run-once` performs a single reset pass and exits non-zero
/// if the pass fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = init_config()?;
    init_logging(&config.logging);

    let db = Database::new().await?;
    let job_config = JobConfig::from(&config.jobs);

    let args: Vec<String> = env::args().collect();
    if args.get(1).map(String::as_str) == Some("run-once") {
        info!("Running a single traffic reset pass");
        let summary = run_traffic_reset(&*db, job_config.commit_mode).await?;
        info!(
            candidates = summary.candidates,
            reset = summary.reset,
            failed = summary.failed,
            "Traffic reset completed"
        );
        return Ok(());
    }

    let mut scheduler = JobScheduler::new(db, job_config).await?;
    scheduler.start().await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }

    scheduler.shutdown().await?;
    Ok(())
}
