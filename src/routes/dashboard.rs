use axum::{
    extract::State,
    response::{IntoResponse, Json},
};

use crate::{error::Result, services::dashboard_service::DashboardStats, AppState};

#[utoipa::path(
    get,
    path = "/api/admin/dashboard/stats",
    responses((status = 200, description = "Recruiting pipeline aggregates", body = DashboardStats)),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.dashboard_service.stats().await?;
    Ok(Json(stats))
}
