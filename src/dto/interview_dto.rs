use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::interview::InterviewStatus;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ScheduleInterviewPayload {
    pub cv_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    #[validate(length(max = 500))]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateInterviewPayload {
    pub scheduled_at: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    #[validate(length(max = 10000))]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InterviewResponsePayload {
    pub status: InterviewStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InterviewListQuery {
    pub status: Option<InterviewStatus>,
    pub cv_id: Option<Uuid>,
}
