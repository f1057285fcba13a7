use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "cv_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CvStatus {
    Pending,
    Accepted,
    Rejected,
}

impl CvStatus {
    pub const ALL: [CvStatus; 3] = [CvStatus::Pending, CvStatus::Accepted, CvStatus::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            CvStatus::Pending => "pending",
            CvStatus::Accepted => "accepted",
            CvStatus::Rejected => "rejected",
        }
    }

    /// Review decisions are one-way: only a pending CV can be accepted or rejected.
    pub fn can_transition_to(&self, next: CvStatus) -> bool {
        matches!(
            (self, next),
            (CvStatus::Pending, CvStatus::Accepted) | (CvStatus::Pending, CvStatus::Rejected)
        )
    }
}

impl std::fmt::Display for CvStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Cv {
    pub id: Uuid,
    pub user_id: String,
    pub applicant_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub education: Option<String>,
    pub current_position: Option<String>,
    pub summary: Option<String>,
    pub years_experience: i32,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub certifications: Vec<String>,
    pub portfolio_url: Option<String>,
    pub status: CvStatus,
    pub requirements_match: i32,
    pub job_id: Option<Uuid>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cv {
    pub fn has_portfolio(&self) -> bool {
        self.portfolio_url
            .as_deref()
            .map(|u| !u.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        let needle = skill.trim().to_lowercase();
        self.skills
            .iter()
            .any(|s| s.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_cvs_can_be_decided() {
        assert!(CvStatus::Pending.can_transition_to(CvStatus::Accepted));
        assert!(CvStatus::Pending.can_transition_to(CvStatus::Rejected));
        assert!(!CvStatus::Accepted.can_transition_to(CvStatus::Rejected));
        assert!(!CvStatus::Rejected.can_transition_to(CvStatus::Pending));
        assert!(!CvStatus::Pending.can_transition_to(CvStatus::Pending));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&CvStatus::Accepted).unwrap();
        assert_eq!(json, "\"accepted\"");
    }
}
