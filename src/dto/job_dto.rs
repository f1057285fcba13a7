use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::job_posting::{JobPosting, JobStatus};
use crate::services::job_service::JobList;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateJobPostingPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 120))]
    pub department: String,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateJobPostingPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<JobStatus>,
}

fn trim_owned(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.len() == value.len() {
        value
    } else {
        trimmed.to_string()
    }
}

impl CreateJobPostingPayload {
    /// Strips surrounding whitespace so blank names fail the length rules.
    pub fn trimmed(mut self) -> Self {
        self.title = trim_owned(self.title);
        self.department = trim_owned(self.department);
        self
    }
}

impl UpdateJobPostingPayload {
    pub fn trimmed(mut self) -> Self {
        self.title = self.title.map(trim_owned);
        self.department = self.department.map(trim_owned);
        self
    }
}

/// Rejects an inverted salary range when both ends are present.
pub fn check_salary_range(min: Option<Decimal>, max: Option<Decimal>) -> crate::error::Result<()> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(crate::error::Error::BadRequest(
                "salary_min must not exceed salary_max".into(),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobPostingResponse {
    pub id: uuid::Uuid,
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

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobPostingSummary {
    pub id: uuid::Uuid,
    pub title: String,
    pub department: String,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub currency: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobPostingListResponse {
    pub items: Vec<JobPostingResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobPostingPublicListResponse {
    pub items: Vec<JobPostingSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<JobStatus>,
    pub department: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobPublicQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationsCountResponse {
    pub job_id: uuid::Uuid,
    pub applications_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconcileResponse {
    pub corrected: u64,
}

impl From<JobPosting> for JobPostingResponse {
    fn from(value: JobPosting) -> Self {
        Self {
            id: value.id,
            title: value.title,
            department: value.department,
            location: value.location,
            employment_type: value.employment_type,
            description: value.description,
            requirements: value.requirements,
            salary_min: value.salary_min,
            salary_max: value.salary_max,
            currency: value.currency,
            deadline: value.deadline,
            status: value.status,
            applications_count: value.applications_count,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

const SUMMARY_CHARS: usize = 320;

impl From<JobPosting> for JobPostingSummary {
    fn from(value: JobPosting) -> Self {
        let summary = value
            .description
            .as_ref()
            .or(value.requirements.as_ref())
            .map(|text| {
                let trimmed = text.trim();
                if trimmed.chars().count() > SUMMARY_CHARS {
                    format!("{}…", trimmed.chars().take(SUMMARY_CHARS).collect::<String>())
                } else {
                    trimmed.to_string()
                }
            });

        Self {
            id: value.id,
            title: value.title,
            department: value.department,
            location: value.location,
            employment_type: value.employment_type,
            salary_min: value.salary_min,
            salary_max: value.salary_max,
            currency: value.currency,
            deadline: value.deadline,
            summary,
        }
    }
}

impl From<JobList> for JobPostingListResponse {
    fn from(value: JobList) -> Self {
        Self {
            items: value.items.into_iter().map(Into::into).collect(),
            total: value.total,
            page: value.page,
            per_page: value.per_page,
            total_pages: value.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn posting(description: Option<String>) -> JobPosting {
        JobPosting {
            id: uuid::Uuid::new_v4(),
            title: "Backend Engineer".into(),
            department: "Engineering".into(),
            location: None,
            employment_type: None,
            description,
            requirements: Some("Rust".into()),
            salary_min: None,
            salary_max: None,
            currency: None,
            deadline: None,
            status: JobStatus::Active,
            applications_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn blank_title_or_department_fails_validation() {
        let payload: CreateJobPostingPayload = serde_json::from_value(serde_json::json!({
            "title": "   ",
            "department": " Engineering ",
        }))
        .unwrap();
        let payload = payload.trimmed();
        assert_eq!(payload.department, "Engineering");
        assert!(payload.validate().is_err());

        let update: UpdateJobPostingPayload = serde_json::from_value(serde_json::json!({
            "department": "\t",
        }))
        .unwrap();
        assert!(update.trimmed().validate().is_err());
    }

    #[test]
    fn inverted_salary_range_is_rejected() {
        assert!(check_salary_range(Some(dec(5000)), Some(dec(3000))).is_err());
        assert!(check_salary_range(Some(dec(3000)), Some(dec(5000))).is_ok());
        assert!(check_salary_range(None, Some(dec(5000))).is_ok());
    }

    #[test]
    fn summary_falls_back_to_requirements_and_truncates() {
        let summary = JobPostingSummary::from(posting(None));
        assert_eq!(summary.summary.as_deref(), Some("Rust"));

        let long = "x".repeat(SUMMARY_CHARS + 10);
        let summary = JobPostingSummary::from(posting(Some(long)));
        let text = summary.summary.unwrap();
        assert_eq!(text.chars().count(), SUMMARY_CHARS + 1);
        assert!(text.ends_with('…'));
    }

    #[test]
    fn empty_title_fails_validation() {
        let payload = CreateJobPostingPayload {
            title: String::new(),
            department: "Engineering".into(),
            location: None,
            employment_type: None,
            description: None,
            requirements: None,
            salary_min: None,
            salary_max: None,
            currency: None,
            deadline: None,
            status: None,
        };
        assert!(payload.validate().is_err());
    }
}
