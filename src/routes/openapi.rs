use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    dto::{
        cv_dto::{
            ApplyPayload, ClustersResponse, CreateCvPayload, CvDetailResponse, CvListResponse,
            RankingResponse, UpdateCvPayload, UpdateCvStatusPayload,
            UpdateRequirementsMatchPayload,
        },
        interview_dto::{InterviewResponsePayload, ScheduleInterviewPayload, UpdateInterviewPayload},
        job_dto::{
            ApplicationsCountResponse, CreateJobPostingPayload, JobPostingListResponse,
            JobPostingPublicListResponse, JobPostingResponse, JobPostingSummary,
            ReconcileResponse, UpdateJobPostingPayload,
        },
        message_dto::{MarkedReadResponse, SendMessagePayload, UnreadCountResponse},
    },
    models::{
        audit_log::AuditLog,
        cv::{Cv, CvStatus},
        interview::{Interview, InterviewStatus},
        job_posting::JobStatus,
        message::Message,
    },
    services::{
        dashboard_service::{DailyCount, DashboardStats, PostingApplications, SkillCount, StatusCount},
        scoring::{CvCluster, ExperienceBand, RankedCv, ScoreWeights},
    },
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Cona recruiting API"),
    paths(
        super::health::health,
        super::jobs::list_public_jobs,
        super::jobs::get_public_job,
        super::jobs::list_jobs,
        super::jobs::create_job,
        super::jobs::get_job,
        super::jobs::update_job,
        super::jobs::delete_job,
        super::jobs::increment_applications,
        super::jobs::decrement_applications,
        super::jobs::reconcile_counts,
        super::me::create_cv,
        super::me::get_cv,
        super::me::update_cv,
        super::me::upload_avatar,
        super::me::remove_avatar,
        super::me::apply,
        super::me::withdraw,
        super::me::get_interview,
        super::me::respond_to_interview,
        super::me::list_messages,
        super::me::unread_count,
        super::me::mark_read,
        super::me::mark_all_read,
        super::cvs::list_cvs,
        super::cvs::get_cv,
        super::cvs::update_status,
        super::cvs::update_match,
        super::cvs::delete_cv,
        super::cvs::ranking,
        super::cvs::clusters,
        super::cvs::export_cvs,
        super::messages::send_message,
        super::messages::list_for_cv,
        super::messages::total_unread,
        super::interviews::schedule_interview,
        super::interviews::list_interviews,
        super::interviews::update_interview,
        super::interviews::delete_interview,
        super::dashboard::stats,
        super::audit::list_audit_logs,
        super::events::admin_events,
        super::events::applicant_events,
    ),
    components(schemas(
        Cv, CvStatus, Interview, InterviewStatus, Message, JobStatus, AuditLog,
        CreateCvPayload, UpdateCvPayload, UpdateCvStatusPayload, UpdateRequirementsMatchPayload,
        ApplyPayload, CvDetailResponse, CvListResponse, RankingResponse, ClustersResponse,
        ScheduleInterviewPayload, UpdateInterviewPayload, InterviewResponsePayload,
        CreateJobPostingPayload, UpdateJobPostingPayload, JobPostingResponse, JobPostingSummary,
        JobPostingListResponse, JobPostingPublicListResponse, ApplicationsCountResponse,
        ReconcileResponse, SendMessagePayload, UnreadCountResponse, MarkedReadResponse,
        DashboardStats, StatusCount, SkillCount, DailyCount, PostingApplications,
        ScoreWeights, RankedCv, CvCluster, ExperienceBand,
    )),
    modifiers(&BearerAuth),
    tags((name = "cona", description = "Recruiting CRUD, dashboard and realtime endpoints"))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
