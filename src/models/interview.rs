use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "interview_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InterviewStatus {
    Scheduled,
    Confirmed,
    Declined,
}

impl InterviewStatus {
    pub const ALL: [InterviewStatus; 3] = [
        InterviewStatus::Scheduled,
        InterviewStatus::Confirmed,
        InterviewStatus::Declined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "scheduled",
            InterviewStatus::Confirmed => "confirmed",
            InterviewStatus::Declined => "declined",
        }
    }

    /// Applicants answer a scheduled interview exactly once.
    pub fn accepts_response(&self, response: InterviewStatus) -> bool {
        *self == InterviewStatus::Scheduled && response != InterviewStatus::Scheduled
    }
}

impl std::fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Interview {
    pub id: Uuid,
    pub cv_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub location: Option<String>,
    pub status: InterviewStatus,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_interview_accepts_confirm_or_decline() {
        let s = InterviewStatus::Scheduled;
        assert!(s.accepts_response(InterviewStatus::Confirmed));
        assert!(s.accepts_response(InterviewStatus::Declined));
        assert!(!s.accepts_response(InterviewStatus::Scheduled));
    }

    #[test]
    fn answered_interview_rejects_new_response() {
        assert!(!InterviewStatus::Confirmed.accepts_response(InterviewStatus::Declined));
        assert!(!InterviewStatus::Declined.accepts_response(InterviewStatus::Confirmed));
    }
}
