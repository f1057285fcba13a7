pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer, services::ServeDir, trace::TraceLayer,
};

use crate::middleware::{auth, cors::cors_layer, rate_limit};
use crate::services::{
    audit_service::AuditService,
    cv_service::CvService,
    dashboard_service::DashboardService,
    interview_service::InterviewService,
    job_service::JobService,
    message_service::MessageService,
    realtime::EventBus,
    storage::{AvatarService, LocalObjectStore, ObjectStore},
};

const BODY_LIMIT_SLACK: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub job_service: JobService,
    pub cv_service: CvService,
    pub interview_service: InterviewService,
    pub message_service: MessageService,
    pub audit_service: AuditService,
    pub dashboard_service: DashboardService,
    pub avatar_service: AvatarService,
    pub events: EventBus,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(
            &config.uploads_dir,
            config.public_base_url.clone(),
        ));
        Self::with_store(pool, store)
    }

    pub fn with_store(pool: PgPool, store: Arc<dyn ObjectStore>) -> Self {
        let config = crate::config::get_config();

        let audit_service = AuditService::new(pool.clone());
        let job_service = JobService::new(pool.clone());
        let cv_service = CvService::new(pool.clone(), audit_service.clone());
        let interview_service = InterviewService::new(pool.clone(), audit_service.clone());
        let message_service = MessageService::new(pool.clone());
        let dashboard_service = DashboardService::new(
            cv_service.clone(),
            interview_service.clone(),
            job_service.clone(),
            message_service.clone(),
        );
        let avatar_service = AvatarService::new(store, config.max_avatar_bytes);

        Self {
            job_service,
            cv_service,
            interview_service,
            message_service,
            audit_service,
            dashboard_service,
            avatar_service,
            events: EventBus::new(),
        }
    }
}

/// Full HTTP surface: public, applicant and staff routers, each behind its own rate limit.
pub fn build_router(state: AppState) -> Router {
    let config = crate::config::get_config();

    let public_api = Router::new()
        .route("/api/jobs", get(routes::jobs::list_public_jobs))
        .route("/api/jobs/:id", get(routes::jobs::get_public_job))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.public_rps),
            rate_limit::rps_middleware,
        ));

    let applicant_api = Router::new()
        .route(
            "/api/me/cv",
            post(routes::me::create_cv)
                .get(routes::me::get_cv)
                .patch(routes::me::update_cv),
        )
        .route(
            "/api/me/cv/avatar",
            post(routes::me::upload_avatar).delete(routes::me::remove_avatar),
        )
        .route("/api/me/cv/apply", post(routes::me::apply))
        .route("/api/me/cv/withdraw", post(routes::me::withdraw))
        .route("/api/me/interview", get(routes::me::get_interview))
        .route("/api/me/interview/respond", post(routes::me::respond_to_interview))
        .route("/api/me/messages", get(routes::me::list_messages))
        .route("/api/me/messages/unread", get(routes::me::unread_count))
        .route("/api/me/messages/read-all", post(routes::me::mark_all_read))
        .route("/api/me/messages/:id/read", post(routes::me::mark_read))
        .route("/api/me/events", get(routes::events::applicant_events))
        .layer(DefaultBodyLimit::max(config.max_avatar_bytes + BODY_LIMIT_SLACK))
        .route_layer(axum::middleware::from_fn(auth::require_applicant))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.public_rps),
            rate_limit::rps_middleware,
        ));

    let admin_api = Router::new()
        .route("/api/admin/cvs", get(routes::cvs::list_cvs))
        .route("/api/admin/cvs/ranking", get(routes::cvs::ranking))
        .route("/api/admin/cvs/clusters", get(routes::cvs::clusters))
        .route("/api/admin/cvs/export", get(routes::cvs::export_cvs))
        .route(
            "/api/admin/cvs/:id",
            get(routes::cvs::get_cv).delete(routes::cvs::delete_cv),
        )
        .route("/api/admin/cvs/:id/status", patch(routes::cvs::update_status))
        .route("/api/admin/cvs/:id/match", patch(routes::cvs::update_match))
        .route("/api/admin/cvs/:id/messages", get(routes::messages::list_for_cv))
        .route("/api/admin/messages", post(routes::messages::send_message))
        .route("/api/admin/messages/unread", get(routes::messages::total_unread))
        .route(
            "/api/admin/interviews",
            get(routes::interviews::list_interviews).post(routes::interviews::schedule_interview),
        )
        .route(
            "/api/admin/interviews/:id",
            patch(routes::interviews::update_interview).delete(routes::interviews::delete_interview),
        )
        .route(
            "/api/admin/jobs",
            get(routes::jobs::list_jobs).post(routes::jobs::create_job),
        )
        .route("/api/admin/jobs/reconcile", post(routes::jobs::reconcile_counts))
        .route(
            "/api/admin/jobs/:id",
            get(routes::jobs::get_job)
                .patch(routes::jobs::update_job)
                .delete(routes::jobs::delete_job),
        )
        .route(
            "/api/admin/jobs/:id/applications/increment",
            post(routes::jobs::increment_applications),
        )
        .route(
            "/api/admin/jobs/:id/applications/decrement",
            post(routes::jobs::decrement_applications),
        )
        .route("/api/admin/dashboard/stats", get(routes::dashboard::stats))
        .route("/api/admin/audit-logs", get(routes::audit::list_audit_logs))
        .route("/api/admin/events", get(routes::events::admin_events))
        .route_layer(axum::middleware::from_fn(auth::require_staff))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.admin_rps),
            rate_limit::rps_middleware,
        ));

    tracing::debug!(uploads_dir = %config.uploads_dir, "serving stored objects");

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/openapi.json", get(routes::openapi::openapi_json))
        .merge(public_api)
        .merge(applicant_api)
        .merge(admin_api)
        .nest_service("/storage", ServeDir::new(&config.uploads_dir))
        .with_state(state)
        .layer(cors_layer(&config.cors_origins))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
