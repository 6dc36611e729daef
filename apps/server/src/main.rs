#![warn(clippy::all, clippy::pedantic)]

use std::env;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use anyhow::Context;

mod error;
mod response;
mod routes;

use error::AppError;
use logger::init_tracing;
use pingkeeper_service::config::Config;
use pingkeeper_service::database::{DatabaseImpl, initialize_database};
use pingkeeper_service::monitoring::{HttpProbe, MonitorScheduler};
use pingkeeper_service::pool::open_pool;

/// Config path from the runtime environment, falling back to one baked in
/// from `.env` at build time
fn config_path() -> Option<String> {
    env::var("PINGKEEPER_CONFIG").ok().or_else(|| option_env!("PINGKEEPER_CONFIG").map(str::to_string))
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    init_tracing();

    let config = Config::from_config(config_path())?;
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
    if let Err(e) = scheduler.initialize_scheduler().await {
        tracing::warn!("{e}; retry with POST /api/scheduler/init");
    }

    run_server(web::Data::new(scheduler.clone()), &config.http.bind, config.http.port).await?;

    scheduler.stop_all_monitors().await;
    Ok(())
}

async fn run_server(
    scheduler: web::Data<MonitorScheduler>,
    bind: &str,
    port: u16,
) -> Result<(), AppError> {
    tracing::info!("Listening on {bind}:{port}");
    HttpServer::new(move || App::new().app_data(scheduler.clone()).configure(routes::routes))
        .bind((bind, port))?
        .run()
        .await?;

    Ok(())
}
