use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::ErrorResponse,
    Json,
};
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{Error, Notification},
    startup::AppState,
};

pub async fn list_notifications(State(state): State<Arc<AppState>>) -> Json<Vec<Notification>> {
    Json(state.manager.notifications().list().await)
}

pub async fn dismiss_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    if state.manager.notifications().dismiss(id).await {
        debug!("dismissed notification {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound(format!("notification {} not found", id)).into())
    }
}
