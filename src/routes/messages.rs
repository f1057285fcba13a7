use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::message_dto::{SendMessagePayload, UnreadCountResponse},
    error::Result,
    models::message::Message,
    services::audit_service::Actor,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/admin/messages",
    request_body = SendMessagePayload,
    responses(
        (status = 201, description = "Message delivered to the applicant", body = Message),
        (status = 400, description = "Invalid payload or unknown CV")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<SendMessagePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    // Unknown CV is a 404.
    state.cv_service.get(payload.cv_id).await?;
    let message = state
        .message_service
        .create(payload.cv_id, payload.message.trim())
        .await?;
    state
        .audit_service
        .record(
            &actor,
            "message.sent",
            "cv",
            payload.cv_id,
            Some(json!({ "message_id": message.id })),
        )
        .await;
    Ok((StatusCode::CREATED, Json(message)))
}

#[utoipa::path(
    get,
    path = "/api/admin/cvs/{id}/messages",
    params(("id" = Uuid, Path, description = "CV ID")),
    responses(
        (status = 200, description = "Messages for the CV, oldest first", body = [Message]),
        (status = 404, description = "CV not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_for_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.cv_service.get(id).await?;
    let messages = state.message_service.list_for_cv(id).await?;
    Ok(Json(messages))
}

#[utoipa::path(
    get,
    path = "/api/admin/messages/unread",
    responses((status = 200, description = "Unread messages across all CVs", body = UnreadCountResponse)),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn total_unread(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let unread = state.message_service.total_unread_count().await?;
    Ok(Json(UnreadCountResponse { unread }))
}
