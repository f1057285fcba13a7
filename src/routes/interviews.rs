use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::interview_dto::{InterviewListQuery, ScheduleInterviewPayload, UpdateInterviewPayload},
    error::Result,
    models::interview::Interview,
    services::audit_service::Actor,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/admin/interviews",
    request_body = ScheduleInterviewPayload,
    responses(
        (status = 201, description = "Interview scheduled and applicant invited", body = Interview),
        (status = 404, description = "CV not found"),
        (status = 409, description = "CV already has an interview")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn schedule_interview(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<ScheduleInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let interview = state.interview_service.schedule(payload, &actor).await?;
    Ok((StatusCode::CREATED, Json(interview)))
}

#[utoipa::path(
    get,
    path = "/api/admin/interviews",
    params(
        ("status" = Option<String>, Query, description = "scheduled, confirmed or declined"),
        ("cv_id" = Option<Uuid>, Query, description = "Filter by CV")
    ),
    responses((status = 200, description = "Interviews ordered by date", body = [Interview])),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_interviews(
    State(state): State<AppState>,
    Query(query): Query<InterviewListQuery>,
) -> Result<impl IntoResponse> {
    let items = state.interview_service.list(query).await?;
    Ok(Json(items))
}

#[utoipa::path(
    patch,
    path = "/api/admin/interviews/{id}",
    params(("id" = Uuid, Path, description = "Interview ID")),
    request_body = UpdateInterviewPayload,
    responses(
        (status = 200, description = "Interview updated", body = Interview),
        (status = 404, description = "Interview not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<UpdateInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let interview = state.interview_service.update(id, payload, &actor).await?;
    Ok(Json(interview))
}

#[utoipa::path(
    delete,
    path = "/api/admin/interviews/{id}",
    params(("id" = Uuid, Path, description = "Interview ID")),
    responses(
        (status = 204, description = "Interview cancelled"),
        (status = 404, description = "Interview not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn delete_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<impl IntoResponse> {
    state.interview_service.delete(id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
