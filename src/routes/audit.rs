use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::Result, models::audit_log::AuditLog, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuditLogQuery {
    pub entity_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    params(
        ("entity_id" = Option<Uuid>, Query, description = "Only entries for this entity"),
        ("limit" = Option<i64>, Query, description = "Maximum entries, 1..=500, default 100")
    ),
    responses((status = 200, description = "Audit entries, newest first", body = [AuditLog])),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> Result<impl IntoResponse> {
    let logs = state
        .audit_service
        .list(query.entity_id, query.limit.unwrap_or(100))
        .await?;
    Ok(Json(logs))
}
