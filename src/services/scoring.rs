//! CV scoring for the review dashboard.
//!
//! A CV's score is a weighted sum over a handful of profile fields:
//!
//! ```text
//! score = skills * skill
//!       + years_experience * experience
//!       + requirements_match * requirements_match
//!       + portfolio_bonus      (portfolio link present)
//!       + certification_bonus  (at least one certification)
//!       + language_bonus * (languages - 1)
//! ```
//!
//! Ranking, clustering and filtering all run in memory over rows fetched
//! wholesale from the `cvs` table.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::cv::{Cv, CvStatus};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScoreWeights {
    pub skill: f64,
    pub experience: f64,
    pub requirements_match: f64,
    pub portfolio_bonus: f64,
    pub certification_bonus: f64,
    pub language_bonus: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            skill: 5.0,
            experience: 3.0,
            requirements_match: 0.5,
            portfolio_bonus: 10.0,
            certification_bonus: 5.0,
            language_bonus: 2.0,
        }
    }
}

impl ScoreWeights {
    /// Weights must be finite numbers; `inf` or `NaN` would make scores unorderable.
    pub fn check(&self) -> Result<()> {
        let named = [
            ("skill_weight", self.skill),
            ("experience_weight", self.experience),
            ("match_weight", self.requirements_match),
            ("portfolio_bonus", self.portfolio_bonus),
            ("certification_bonus", self.certification_bonus),
            ("language_bonus", self.language_bonus),
        ];
        match named.iter().find(|(_, value)| !value.is_finite()) {
            Some((name, _)) => Err(Error::BadRequest(format!("{} must be a finite number", name))),
            None => Ok(()),
        }
    }
}

pub fn score(cv: &Cv, weights: &ScoreWeights) -> f64 {
    let mut total = cv.skills.len() as f64 * weights.skill
        + f64::from(cv.years_experience.max(0)) * weights.experience
        + f64::from(cv.requirements_match.clamp(0, 100)) * weights.requirements_match;

    if cv.has_portfolio() {
        total += weights.portfolio_bonus;
    }
    if !cv.certifications.is_empty() {
        total += weights.certification_bonus;
    }
    let extra_languages = cv.languages.len().saturating_sub(1);
    total += extra_languages as f64 * weights.language_bonus;

    round2(total)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RankedCv {
    pub rank: usize,
    pub cv_id: Uuid,
    pub applicant_name: String,
    pub status: CvStatus,
    pub years_experience: i32,
    pub skills_count: usize,
    pub requirements_match: i32,
    pub job_id: Option<Uuid>,
    pub avatar_url: Option<String>,
    pub score: f64,
}

fn compare_scored(a: (&Cv, f64), b: (&Cv, f64)) -> Ordering {
    b.1.total_cmp(&a.1)
        .then_with(|| b.0.requirements_match.cmp(&a.0.requirements_match))
        .then_with(|| a.0.applicant_name.cmp(&b.0.applicant_name))
}

/// Highest score first; ties fall back to requirements match, then name.
pub fn rank(cvs: &[Cv], weights: &ScoreWeights, limit: Option<usize>) -> Vec<RankedCv> {
    let mut scored: Vec<(&Cv, f64)> = cvs.iter().map(|cv| (cv, score(cv, weights))).collect();
    scored.sort_by(|a, b| compare_scored(*a, *b));

    let take = limit.unwrap_or(scored.len());
    scored
        .into_iter()
        .take(take)
        .enumerate()
        .map(|(idx, (cv, score))| RankedCv {
            rank: idx + 1,
            cv_id: cv.id,
            applicant_name: cv.applicant_name.clone(),
            status: cv.status,
            years_experience: cv.years_experience,
            skills_count: cv.skills.len(),
            requirements_match: cv.requirements_match,
            job_id: cv.job_id,
            avatar_url: cv.avatar_url.clone(),
            score,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceBand {
    Junior,
    Mid,
    Senior,
}

impl ExperienceBand {
    pub const ALL: [ExperienceBand; 3] = [
        ExperienceBand::Junior,
        ExperienceBand::Mid,
        ExperienceBand::Senior,
    ];

    pub fn of(years: i32) -> Self {
        match years {
            i32::MIN..=2 => ExperienceBand::Junior,
            3..=5 => ExperienceBand::Mid,
            _ => ExperienceBand::Senior,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CvCluster {
    pub band: ExperienceBand,
    pub count: usize,
    pub average_score: f64,
    pub average_match: f64,
    pub members: Vec<RankedCv>,
}

/// Groups CVs into experience bands. Every band is present, empty ones included.
pub fn cluster(cvs: &[Cv], weights: &ScoreWeights) -> Vec<CvCluster> {
    ExperienceBand::ALL
        .iter()
        .map(|band| {
            let in_band: Vec<Cv> = cvs
                .iter()
                .filter(|cv| ExperienceBand::of(cv.years_experience) == *band)
                .cloned()
                .collect();
            let members = rank(&in_band, weights, None);
            let count = members.len();
            let (average_score, average_match) = if count == 0 {
                (0.0, 0.0)
            } else {
                let score_sum: f64 = members.iter().map(|m| m.score).sum();
                let match_sum: f64 = members.iter().map(|m| f64::from(m.requirements_match)).sum();
                (round2(score_sum / count as f64), round2(match_sum / count as f64))
            };
            CvCluster {
                band: *band,
                count,
                average_score,
                average_match,
                members,
            }
        })
        .collect()
}

/// In-memory counterpart of the CV list filters.
#[derive(Debug, Clone, Default)]
pub struct CvFilter {
    pub status: Option<CvStatus>,
    pub job_id: Option<Uuid>,
    pub min_experience: Option<i32>,
    pub skill: Option<String>,
    pub search: Option<String>,
}

impl CvFilter {
    pub fn matches(&self, cv: &Cv) -> bool {
        if let Some(status) = self.status {
            if cv.status != status {
                return false;
            }
        }
        if let Some(job_id) = self.job_id {
            if cv.job_id != Some(job_id) {
                return false;
            }
        }
        if let Some(min) = self.min_experience {
            if cv.years_experience < min {
                return false;
            }
        }
        if let Some(skill) = self.skill.as_deref().filter(|s| !s.trim().is_empty()) {
            if !cv.has_skill(skill) {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let needle = search.trim().to_lowercase();
            let haystacks = [
                Some(cv.applicant_name.as_str()),
                Some(cv.email.as_str()),
                cv.current_position.as_deref(),
            ];
            if !haystacks
                .iter()
                .flatten()
                .any(|h| h.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, cvs: Vec<Cv>) -> Vec<Cv> {
        cvs.into_iter().filter(|cv| self.matches(cv)).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn sample_cv(name: &str, years: i32, skills: &[&str], matched: i32) -> Cv {
        Cv {
            id: Uuid::new_v4(),
            user_id: format!("user-{}", name),
            applicant_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: None,
            location: None,
            education: None,
            current_position: None,
            summary: None,
            years_experience: years,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            languages: vec![],
            certifications: vec![],
            portfolio_url: None,
            status: CvStatus::Pending,
            requirements_match: matched,
            job_id: None,
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn score_is_weighted_sum_with_bonuses() {
        let mut cv = sample_cv("Ana", 4, &["rust", "sql"], 80);
        let w = ScoreWeights::default();
        // 2*5 + 4*3 + 80*0.5
        assert_eq!(score(&cv, &w), 62.0);

        cv.portfolio_url = Some("https://ana.dev".into());
        cv.certifications = vec!["AWS".into()];
        cv.languages = vec!["en".into(), "es".into(), "pt".into()];
        // + 10 + 5 + 2*2
        assert_eq!(score(&cv, &w), 81.0);
    }

    #[test]
    fn blank_portfolio_earns_no_bonus() {
        let mut cv = sample_cv("Bo", 0, &[], 0);
        cv.portfolio_url = Some("   ".into());
        assert_eq!(score(&cv, &ScoreWeights::default()), 0.0);
    }

    #[test]
    fn rank_orders_by_score_then_match_then_name() {
        let a = sample_cv("Zed", 1, &["a"], 10); // 5 + 3 + 5 = 13
        let b = sample_cv("Amy", 1, &["a"], 10); // same score, same match
        let c = sample_cv("Cat", 5, &["a", "b", "c"], 90); // 15 + 15 + 45 = 75
        let ranked = rank(&[a, b, c], &ScoreWeights::default(), None);
        let names: Vec<&str> = ranked.iter().map(|r| r.applicant_name.as_str()).collect();
        assert_eq!(names, vec!["Cat", "Amy", "Zed"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn rank_respects_limit() {
        let cvs: Vec<Cv> = (0..5).map(|i| sample_cv(&format!("c{}", i), i, &[], 0)).collect();
        let ranked = rank(&cvs, &ScoreWeights::default(), Some(2));
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].years_experience, 4);
    }

    #[test]
    fn non_finite_weights_are_rejected() {
        assert!(ScoreWeights::default().check().is_ok());
        let inf = ScoreWeights {
            skill: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(inf.check(), Err(Error::BadRequest(msg)) if msg.contains("skill_weight")));
        let nan = ScoreWeights {
            language_bonus: f64::NAN,
            ..Default::default()
        };
        assert!(nan.check().is_err());
    }

    #[test]
    fn rank_stays_ordered_even_with_nan_scores() {
        // 0 skills * inf = NaN, others score inf.
        let weights = ScoreWeights {
            skill: f64::INFINITY,
            ..Default::default()
        };
        let cvs = vec![
            sample_cv("A", 1, &[], 10),
            sample_cv("B", 2, &["x"], 20),
            sample_cv("C", 3, &[], 30),
            sample_cv("D", 4, &["y"], 40),
        ];
        let ranked = rank(&cvs, &weights, None);
        assert_eq!(ranked.len(), 4);
        let ranks: Vec<usize> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn clusters_cover_every_band() {
        let cvs = vec![
            sample_cv("J", 1, &[], 40),
            sample_cv("M1", 3, &[], 60),
            sample_cv("M2", 5, &[], 80),
        ];
        let clusters = cluster(&cvs, &ScoreWeights::default());
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].band, ExperienceBand::Junior);
        assert_eq!(clusters[0].count, 1);
        assert_eq!(clusters[1].count, 2);
        assert_eq!(clusters[1].average_match, 70.0);
        assert_eq!(clusters[2].count, 0);
        assert_eq!(clusters[2].average_score, 0.0);
    }

    #[test]
    fn filter_combines_criteria() {
        let mut a = sample_cv("Ana", 6, &["Rust", "Postgres"], 70);
        a.status = CvStatus::Accepted;
        let b = sample_cv("Ben", 2, &["Go"], 50);

        let by_skill = CvFilter {
            skill: Some("rust".into()),
            ..Default::default()
        };
        assert!(by_skill.matches(&a));
        assert!(!by_skill.matches(&b));

        let by_status_and_exp = CvFilter {
            status: Some(CvStatus::Accepted),
            min_experience: Some(5),
            ..Default::default()
        };
        assert_eq!(by_status_and_exp.apply(vec![a.clone(), b.clone()]).len(), 1);

        let by_search = CvFilter {
            search: Some("BEN@".into()),
            ..Default::default()
        };
        assert!(by_search.matches(&b));
        assert!(!by_search.matches(&a));
    }
}
