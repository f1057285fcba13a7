use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Inactive,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub department: String,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub currency: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: JobStatus,
    pub applications_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobPosting {
    /// A posting takes applications while active and on or before its deadline.
    pub fn is_open(&self, today: NaiveDate) -> bool {
        self.status == JobStatus::Active && self.deadline.map(|d| d >= today).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(status: JobStatus, deadline: Option<NaiveDate>) -> JobPosting {
        JobPosting {
            id: Uuid::new_v4(),
            title: "Data Analyst".into(),
            department: "Analytics".into(),
            location: None,
            employment_type: None,
            description: None,
            requirements: None,
            salary_min: None,
            salary_max: None,
            currency: None,
            deadline,
            status,
            applications_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn open_until_end_of_deadline_day() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert!(posting(JobStatus::Active, None).is_open(today));
        assert!(posting(JobStatus::Active, Some(today)).is_open(today));
        assert!(!posting(JobStatus::Active, Some(yesterday)).is_open(today));
        assert!(!posting(JobStatus::Inactive, None).is_open(today));
    }
}
