//! Applicant routes. The caller's CV is resolved from the token subject.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        cv_dto::{ApplyPayload, CreateCvPayload, UpdateCvPayload},
        interview_dto::InterviewResponsePayload,
        message_dto::{MarkedReadResponse, UnreadCountResponse},
    },
    error::{Error, Result},
    middleware::auth::Claims,
    models::{cv::Cv, interview::Interview, message::Message},
    AppState,
};

const AVATAR_FIELDS: [&str; 2] = ["avatar", "file"];

#[utoipa::path(
    post,
    path = "/api/me/cv",
    request_body = CreateCvPayload,
    responses(
        (status = 201, description = "CV submitted", body = Cv),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Applicant already has a CV")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_cv(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCvPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let cv = state.cv_service.create(&claims.sub, payload).await?;
    Ok((StatusCode::CREATED, Json(cv)))
}

#[utoipa::path(
    get,
    path = "/api/me/cv",
    responses(
        (status = 200, description = "The caller's CV", body = Cv),
        (status = 404, description = "No CV submitted yet")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_cv(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.get_by_user(&claims.sub).await?;
    Ok(Json(cv))
}

#[utoipa::path(
    patch,
    path = "/api/me/cv",
    request_body = UpdateCvPayload,
    responses(
        (status = 200, description = "CV updated", body = Cv),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "No CV submitted yet")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_cv(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateCvPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let cv = state.cv_service.update_profile(&claims.sub, payload).await?;
    Ok(Json(cv))
}

#[utoipa::path(
    post,
    path = "/api/me/cv/avatar",
    request_body(content = String, content_type = "multipart/form-data", description = "`avatar` file field: jpeg, png or webp"),
    responses(
        (status = 200, description = "Avatar stored", body = Cv),
        (status = 400, description = "Missing, oversized or unsupported image"),
        (status = 404, description = "No CV submitted yet")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.get_by_user(&claims.sub).await?;

    let mut data = None;
    while let Some(field) = multipart.next_field().await? {
        let is_avatar = field
            .name()
            .map(|name| AVATAR_FIELDS.contains(&name))
            .unwrap_or(false);
        if is_avatar {
            data = Some(field.bytes().await?);
            break;
        }
    }
    let data = data.ok_or_else(|| Error::BadRequest("Missing avatar file field".into()))?;

    let url = state.avatar_service.upload(cv.id, data).await?;
    let (updated, previous) = state.cv_service.set_avatar(cv.id, Some(&url)).await?;
    if let Some(previous) = previous.filter(|p| *p != url) {
        if let Err(e) = state.avatar_service.remove(&previous).await {
            tracing::warn!(cv_id = %cv.id, error = ?e, "failed to remove replaced avatar");
        }
    }
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/me/cv/avatar",
    responses(
        (status = 200, description = "Avatar removed", body = Cv),
        (status = 404, description = "No CV submitted yet")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn remove_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.get_by_user(&claims.sub).await?;
    let (updated, previous) = state.cv_service.set_avatar(cv.id, None).await?;
    if let Some(previous) = previous {
        if let Err(e) = state.avatar_service.remove(&previous).await {
            tracing::warn!(cv_id = %cv.id, error = ?e, "failed to remove avatar object");
        }
    }
    Ok(Json(updated))
}

#[utoipa::path(
    post,
    path = "/api/me/cv/apply",
    request_body = ApplyPayload,
    responses(
        (status = 200, description = "Application recorded", body = Cv),
        (status = 400, description = "Posting closed"),
        (status = 404, description = "CV or posting not found"),
        (status = 409, description = "Already applied to this posting")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ApplyPayload>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.apply_to_job(&claims.sub, payload.job_id).await?;
    Ok(Json(cv))
}

#[utoipa::path(
    post,
    path = "/api/me/cv/withdraw",
    responses(
        (status = 200, description = "Application withdrawn", body = Cv),
        (status = 400, description = "No active application"),
        (status = 404, description = "No CV submitted yet")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.withdraw_application(&claims.sub).await?;
    Ok(Json(cv))
}

#[utoipa::path(
    get,
    path = "/api/me/interview",
    responses(
        (status = 200, description = "The caller's interview", body = Interview),
        (status = 404, description = "No interview scheduled")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.get_by_user(&claims.sub).await?;
    let interview = state.interview_service.get_for_cv(cv.id).await?;
    Ok(Json(interview))
}

#[utoipa::path(
    post,
    path = "/api/me/interview/respond",
    request_body = InterviewResponsePayload,
    responses(
        (status = 200, description = "Response recorded", body = Interview),
        (status = 400, description = "Response must be confirmed or declined"),
        (status = 404, description = "No interview scheduled"),
        (status = 409, description = "Interview already answered")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn respond_to_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<InterviewResponsePayload>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.get_by_user(&claims.sub).await?;
    let interview = state.interview_service.respond(cv.id, payload.status).await?;
    Ok(Json(interview))
}

#[utoipa::path(
    get,
    path = "/api/me/messages",
    responses(
        (status = 200, description = "Messages, oldest first", body = [Message]),
        (status = 404, description = "No CV submitted yet")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.get_by_user(&claims.sub).await?;
    let messages = state.message_service.list_for_cv(cv.id).await?;
    Ok(Json(messages))
}

#[utoipa::path(
    get,
    path = "/api/me/messages/unread",
    responses((status = 200, description = "Unread message count", body = UnreadCountResponse)),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.get_by_user(&claims.sub).await?;
    let unread = state.message_service.unread_count(cv.id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

#[utoipa::path(
    post,
    path = "/api/me/messages/{id}/read",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message marked read", body = Message),
        (status = 404, description = "Message not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.get_by_user(&claims.sub).await?;
    let message = state.message_service.mark_read(cv.id, id).await?;
    Ok(Json(message))
}

#[utoipa::path(
    post,
    path = "/api/me/messages/read-all",
    responses((status = 200, description = "Number of messages marked read", body = MarkedReadResponse)),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let cv = state.cv_service.get_by_user(&claims.sub).await?;
    let updated = state.message_service.mark_all_read(cv.id).await?;
    Ok(Json(MarkedReadResponse { updated }))
}
