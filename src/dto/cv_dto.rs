use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::models::cv::{Cv, CvStatus};
use crate::models::interview::Interview;
use crate::services::scoring::{CvCluster, CvFilter, RankedCv, ScoreWeights};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCvPayload {
    #[validate(length(min = 1, max = 200))]
    pub applicant_name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub education: Option<String>,
    pub current_position: Option<String>,
    #[validate(length(max = 5000))]
    pub summary: Option<String>,
    #[validate(range(min = 0, max = 70))]
    #[serde(default)]
    pub years_experience: i32,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[validate(url)]
    pub portfolio_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCvPayload {
    #[validate(length(min = 1, max = 200))]
    pub applicant_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub education: Option<String>,
    pub current_position: Option<String>,
    #[validate(length(max = 5000))]
    pub summary: Option<String>,
    #[validate(range(min = 0, max = 70))]
    pub years_experience: Option<i32>,
    #[validate(length(max = 100))]
    pub skills: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
    #[validate(url)]
    pub portfolio_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateCvStatusPayload {
    pub status: CvStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateRequirementsMatchPayload {
    #[validate(range(min = 0, max = 100))]
    pub requirements_match: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplyPayload {
    pub job_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CvListQuery {
    pub status: Option<CvStatus>,
    pub job_id: Option<Uuid>,
    pub min_experience: Option<i32>,
    pub skill: Option<String>,
    pub search: Option<String>,
}

impl From<CvListQuery> for CvFilter {
    fn from(q: CvListQuery) -> Self {
        CvFilter {
            status: q.status,
            job_id: q.job_id,
            min_experience: q.min_experience,
            skill: q.skill,
            search: q.search,
        }
    }
}

/// Ranking and clustering take the list filters plus optional weight overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RankingQuery {
    pub status: Option<CvStatus>,
    pub job_id: Option<Uuid>,
    pub min_experience: Option<i32>,
    pub skill: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub skill_weight: Option<f64>,
    pub experience_weight: Option<f64>,
    pub match_weight: Option<f64>,
    pub portfolio_bonus: Option<f64>,
    pub certification_bonus: Option<f64>,
    pub language_bonus: Option<f64>,
}

impl RankingQuery {
    pub fn filter(&self) -> CvFilter {
        CvFilter {
            status: self.status,
            job_id: self.job_id,
            min_experience: self.min_experience,
            skill: self.skill.clone(),
            search: self.search.clone(),
        }
    }

    pub fn weights(&self) -> Result<ScoreWeights> {
        let d = ScoreWeights::default();
        let weights = ScoreWeights {
            skill: self.skill_weight.unwrap_or(d.skill),
            experience: self.experience_weight.unwrap_or(d.experience),
            requirements_match: self.match_weight.unwrap_or(d.requirements_match),
            portfolio_bonus: self.portfolio_bonus.unwrap_or(d.portfolio_bonus),
            certification_bonus: self.certification_bonus.unwrap_or(d.certification_bonus),
            language_bonus: self.language_bonus.unwrap_or(d.language_bonus),
        };
        weights.check()?;
        Ok(weights)
    }
}

/// Staff view of a single CV.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CvDetailResponse {
    pub cv: Cv,
    pub score: f64,
    pub job_title: Option<String>,
    pub interview: Option<Interview>,
    pub unread_messages: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CvListResponse {
    pub items: Vec<Cv>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RankingResponse {
    pub weights: ScoreWeights,
    pub items: Vec<RankedCv>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClustersResponse {
    pub weights: ScoreWeights,
    pub clusters: Vec<CvCluster>,
}
