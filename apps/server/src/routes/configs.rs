use actix_web::{HttpResponse, delete, get, post, web};
use pingkeeper_service::monitoring::MonitorScheduler;
use pingkeeper_service::validation::MonitorDraft;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::response::ApiResponse;

macros_utils::routes! {
    route list_configs,
    route save_config,
    route delete_config,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SavedConfig {
    id: String,
}

/// One monitor when `id` is given (null if unknown), otherwise all of them
/// in creation order.
#[get("/api/configs")]
pub async fn list_configs(
    scheduler: web::Data<MonitorScheduler>,
    query: web::Query<IdQuery>,
) -> Result<HttpResponse, AppError> {
    let database = scheduler.database();
    match query.into_inner().id {
        Some(id) => Ok(ApiResponse::data(database.get_monitor(&id).await?).into()),
        None => Ok(ApiResponse::data(database.list_monitors().await?).into()),
    }
}

/// Create or update a monitor, then bring its schedule in line
#[post("/api/configs")]
pub async fn save_config(
    scheduler: web::Data<MonitorScheduler>,
    draft: web::Json<MonitorDraft>,
) -> Result<HttpResponse, AppError> {
    let draft = draft.into_inner();
    let existing = match draft.id.as_deref() {
        Some(id) => scheduler.database().get_monitor(id).await?,
        None => None,
    };

    let monitor = draft.into_definition(existing.as_ref())?;
    scheduler.database().save_monitor(&monitor).await?;
    scheduler.schedule_monitor(&monitor).await;

    tracing::info!(monitor = %monitor.id, updated = existing.is_some(), "Monitor saved");
    Ok(ApiResponse::data(SavedConfig { id: monitor.id }).into())
}

#[delete("/api/configs")]
pub async fn delete_config(
    scheduler: web::Data<MonitorScheduler>,
    query: web::Query<IdQuery>,
) -> Result<HttpResponse, AppError> {
    let Some(id) = query.into_inner().id else {
        return Err(AppError::BadRequest("id is required".to_string()));
    };

    scheduler.stop_monitor(&id).await;
    if !scheduler.database().delete_monitor(&id).await? {
        return Err(AppError::NotFound(format!("monitor {id} not found")));
    }

    tracing::info!(monitor = %id, "Monitor deleted");
    Ok(ApiResponse::message("Monitor deleted").into())
}
