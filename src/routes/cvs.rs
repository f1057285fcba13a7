use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::cv_dto::{
        ClustersResponse, CvDetailResponse, CvListQuery, CvListResponse, RankingQuery,
        RankingResponse, UpdateCvStatusPayload, UpdateRequirementsMatchPayload,
    },
    error::{Error, Result},
    models::cv::Cv,
    services::{
        audit_service::Actor,
        export_service::{ExportService, XLSX_CONTENT_TYPE},
        scoring::{cluster, rank, score, CvFilter, ScoreWeights},
    },
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/admin/cvs",
    params(
        ("status" = Option<String>, Query, description = "pending, accepted or rejected"),
        ("job_id" = Option<Uuid>, Query, description = "Applied job posting"),
        ("min_experience" = Option<i32>, Query, description = "Minimum years of experience"),
        ("skill" = Option<String>, Query, description = "Skill substring, case-insensitive"),
        ("search" = Option<String>, Query, description = "Matches name, email or position")
    ),
    responses((status = 200, description = "Filtered CVs, newest first", body = CvListResponse)),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_cvs(
    State(state): State<AppState>,
    Query(query): Query<CvListQuery>,
) -> Result<impl IntoResponse> {
    let filter = CvFilter::from(query);
    let items = state.cv_service.list(&filter).await?;
    Ok(Json(CvListResponse {
        total: items.len(),
        items,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/cvs/{id}",
    params(("id" = Uuid, Path, description = "CV ID")),
    responses(
        (status = 200, description = "CV with score, interview and unread count", body = CvDetailResponse),
        (status = 404, description = "CV not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.get(id).await?;

    let interview = match state.interview_service.get_for_cv(id).await {
        Ok(interview) => Some(interview),
        Err(Error::NotFound(_)) => None,
        Err(e) => return Err(e),
    };
    let job_title = match cv.job_id {
        Some(job_id) => match state.job_service.get_by_id(job_id).await {
            Ok(job) => Some(job.title),
            Err(Error::NotFound(_)) => None,
            Err(e) => return Err(e),
        },
        None => None,
    };
    let unread_messages = state.message_service.unread_count(id).await?;

    Ok(Json(CvDetailResponse {
        score: score(&cv, &ScoreWeights::default()),
        cv,
        job_title,
        interview,
        unread_messages,
    }))
}

#[utoipa::path(
    patch,
    path = "/api/admin/cvs/{id}/status",
    params(("id" = Uuid, Path, description = "CV ID")),
    request_body = UpdateCvStatusPayload,
    responses(
        (status = 200, description = "Status updated and applicant notified", body = Cv),
        (status = 404, description = "CV not found"),
        (status = 409, description = "CV was already decided")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<UpdateCvStatusPayload>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.update_status(id, payload.status, &actor).await?;
    Ok(Json(cv))
}

#[utoipa::path(
    patch,
    path = "/api/admin/cvs/{id}/match",
    params(("id" = Uuid, Path, description = "CV ID")),
    request_body = UpdateRequirementsMatchPayload,
    responses(
        (status = 200, description = "Requirements match stored", body = Cv),
        (status = 400, description = "Value outside 0..=100"),
        (status = 404, description = "CV not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_match(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<UpdateRequirementsMatchPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let cv = state
        .cv_service
        .set_requirements_match(id, payload.requirements_match, &actor)
        .await?;
    Ok(Json(cv))
}

#[utoipa::path(
    delete,
    path = "/api/admin/cvs/{id}",
    params(("id" = Uuid, Path, description = "CV ID")),
    responses(
        (status = 204, description = "CV, its interview and messages deleted"),
        (status = 404, description = "CV not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn delete_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.delete(id, &actor).await?;
    if let Some(url) = cv.avatar_url.as_deref() {
        if let Err(e) = state.avatar_service.remove(url).await {
            tracing::warn!(cv_id = %id, error = ?e, "failed to remove avatar of deleted cv");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/admin/cvs/ranking",
    params(
        ("status" = Option<String>, Query, description = "pending, accepted or rejected"),
        ("job_id" = Option<Uuid>, Query, description = "Applied job posting"),
        ("min_experience" = Option<i32>, Query, description = "Minimum years of experience"),
        ("skill" = Option<String>, Query, description = "Skill substring"),
        ("search" = Option<String>, Query, description = "Matches name, email or position"),
        ("limit" = Option<usize>, Query, description = "Maximum number of ranked CVs"),
        ("skill_weight" = Option<f64>, Query, description = "Points per listed skill"),
        ("experience_weight" = Option<f64>, Query, description = "Points per year of experience"),
        ("match_weight" = Option<f64>, Query, description = "Points per requirements-match percent"),
        ("portfolio_bonus" = Option<f64>, Query, description = "Bonus for a portfolio link"),
        ("certification_bonus" = Option<f64>, Query, description = "Bonus for any certification"),
        ("language_bonus" = Option<f64>, Query, description = "Points per language beyond the first")
    ),
    responses(
        (status = 200, description = "CVs ordered by score", body = RankingResponse),
        (status = 400, description = "Weight is not a finite number")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn ranking(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> Result<impl IntoResponse> {
    let weights = query.weights()?;
    let cvs = query.filter().apply(state.cv_service.list_all().await?);
    Ok(Json(RankingResponse {
        items: rank(&cvs, &weights, query.limit),
        weights,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/cvs/clusters",
    params(
        ("status" = Option<String>, Query, description = "pending, accepted or rejected"),
        ("job_id" = Option<Uuid>, Query, description = "Applied job posting"),
        ("skill" = Option<String>, Query, description = "Skill substring")
    ),
    responses(
        (status = 200, description = "CVs grouped into experience bands", body = ClustersResponse),
        (status = 400, description = "Weight is not a finite number")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn clusters(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> Result<impl IntoResponse> {
    let weights = query.weights()?;
    let cvs = query.filter().apply(state.cv_service.list_all().await?);
    Ok(Json(ClustersResponse {
        clusters: cluster(&cvs, &weights),
        weights,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/cvs/export",
    params(
        ("status" = Option<String>, Query, description = "pending, accepted or rejected"),
        ("job_id" = Option<Uuid>, Query, description = "Applied job posting"),
        ("min_experience" = Option<i32>, Query, description = "Minimum years of experience"),
        ("skill" = Option<String>, Query, description = "Skill substring"),
        ("search" = Option<String>, Query, description = "Matches name, email or position")
    ),
    responses((status = 200, description = "XLSX workbook attachment")),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn export_cvs(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> Result<impl IntoResponse> {
    let weights = query.weights()?;
    let cvs = query.filter().apply(state.cv_service.list_all().await?);
    let job_titles: HashMap<Uuid, String> = state
        .job_service
        .list_all()
        .await?
        .into_iter()
        .map(|job| (job.id, job.title))
        .collect();

    let buffer = ExportService::generate_cvs_xlsx(&cvs, &job_titles, &weights)?;
    let disposition = format!("attachment; filename=\"{}\"", ExportService::filename());
    tracing::info!(rows = cvs.len(), "cv export generated");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
