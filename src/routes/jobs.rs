use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::job_dto::{
        ApplicationsCountResponse, CreateJobPostingPayload, JobListQuery, JobPostingListResponse,
        JobPostingPublicListResponse, JobPostingResponse, JobPostingSummary, JobPublicQuery,
        ReconcileResponse, UpdateJobPostingPayload,
    },
    error::Result,
    services::audit_service::Actor,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/admin/jobs",
    request_body = CreateJobPostingPayload,
    responses(
        (status = 201, description = "Job posting created", body = JobPostingResponse),
        (status = 400, description = "Invalid payload")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateJobPostingPayload>,
) -> Result<impl IntoResponse> {
    let payload = payload.trimmed();
    payload.validate()?;
    let job = state.job_service.create(payload).await?;
    state
        .audit_service
        .record(&actor, "job.created", "job_posting", job.id, Some(json!({ "title": job.title })))
        .await;
    Ok((StatusCode::CREATED, Json(JobPostingResponse::from(job))))
}

#[utoipa::path(
    patch,
    path = "/api/admin/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job posting ID")),
    request_body = UpdateJobPostingPayload,
    responses(
        (status = 200, description = "Job posting updated", body = JobPostingResponse),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Job posting not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<UpdateJobPostingPayload>,
) -> Result<impl IntoResponse> {
    let payload = payload.trimmed();
    payload.validate()?;
    let changes = serde_json::to_value(&payload)?;
    let job = state.job_service.update(id, payload).await?;
    state
        .audit_service
        .record(&actor, "job.updated", "job_posting", id, Some(changes))
        .await;
    Ok(Json(JobPostingResponse::from(job)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job posting ID")),
    responses(
        (status = 204, description = "Job posting deleted"),
        (status = 404, description = "Job posting not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<impl IntoResponse> {
    state.job_service.delete(id).await?;
    state
        .audit_service
        .record(&actor, "job.deleted", "job_posting", id, None)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/admin/jobs",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "active or inactive"),
        ("department" = Option<String>, Query, description = "Filter by department"),
        ("search" = Option<String>, Query, description = "Matches title or location")
    ),
    responses(
        (status = 200, description = "Paginated job postings", body = JobPostingListResponse)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse> {
    let result = state.job_service.list(query).await?;
    Ok(Json(JobPostingListResponse::from(result)))
}

#[utoipa::path(
    get,
    path = "/api/admin/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job posting ID")),
    responses(
        (status = 200, description = "Job posting found", body = JobPostingResponse),
        (status = 404, description = "Job posting not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get_by_id(id).await?;
    Ok(Json(JobPostingResponse::from(job)))
}

#[utoipa::path(
    post,
    path = "/api/admin/jobs/{id}/applications/increment",
    params(("id" = Uuid, Path, description = "Job posting ID")),
    responses(
        (status = 200, description = "New application count", body = ApplicationsCountResponse),
        (status = 404, description = "Job posting not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn increment_applications(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let applications_count = state.job_service.increment(id).await?;
    Ok(Json(ApplicationsCountResponse {
        job_id: id,
        applications_count,
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/jobs/{id}/applications/decrement",
    params(("id" = Uuid, Path, description = "Job posting ID")),
    responses(
        (status = 200, description = "New application count, never below zero", body = ApplicationsCountResponse),
        (status = 404, description = "Job posting not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn decrement_applications(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let applications_count = state.job_service.decrement(id).await?;
    Ok(Json(ApplicationsCountResponse {
        job_id: id,
        applications_count,
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/jobs/reconcile",
    responses(
        (status = 200, description = "Counters recomputed from CV rows", body = ReconcileResponse)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn reconcile_counts(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let corrected = state.job_service.reconcile_counts().await?;
    Ok(Json(ReconcileResponse { corrected }))
}

#[utoipa::path(
    get,
    path = "/api/jobs",
    params(("limit" = Option<i64>, Query, description = "Number of items to return")),
    responses(
        (status = 200, description = "Open job postings", body = JobPostingPublicListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_public_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobPublicQuery>,
) -> Result<impl IntoResponse> {
    let items = state.job_service.list_active(query.limit.unwrap_or(20)).await?;
    let summaries: Vec<JobPostingSummary> = items.into_iter().map(Into::into).collect();
    Ok(Json(JobPostingPublicListResponse { items: summaries }))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job posting ID")),
    responses(
        (status = 200, description = "Active job posting", body = JobPostingResponse),
        (status = 404, description = "Job posting not found or inactive")
    )
)]
#[axum::debug_handler]
pub async fn get_public_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get_active(id).await?;
    Ok(Json(JobPostingResponse::from(job)))
}
