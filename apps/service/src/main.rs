use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use pingkeeper_service::config::Config;
use pingkeeper_service::database::{DatabaseImpl, initialize_database};
use pingkeeper_service::monitoring::{HttpProbe, MonitorScheduler};
use pingkeeper_service::pool::open_pool;

/// Standalone monitor scheduler: loads enabled monitors from the store and
/// probes them until interrupted.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the config file (defaults to $XDG_CONFIG_HOME/pingkeeper/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_tracing();
    let args = Args::parse();

    let config = Config::from_config(args.config.as_deref()).context("failed to load config")?;
    tracing::info!("{}", config);

    let pool = open_pool(&config.database.path)
        .await
        .with_context(|| format!("failed to open database at {}", config.database.path))?;
    {
        let conn = pool.get().await.context("failed to get database connection")?;
        initialize_database(&conn).await?;
    }

    let probe = HttpProbe::new(config.probe.timeout_seconds, &config.probe.user_agent)?;
    let scheduler =
        MonitorScheduler::new(Arc::new(probe), Arc::new(DatabaseImpl::new_from_pool(pool)));
    scheduler.initialize_scheduler().await?;
    tracing::info!(monitors = scheduler.task_count().await, "Pingkeeper running, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    scheduler.stop_all_monitors().await;

    Ok(())
}
