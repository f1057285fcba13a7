use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::Result;
use crate::models::cv::{Cv, CvStatus};
use crate::models::interview::{Interview, InterviewStatus};
use crate::models::job_posting::{JobPosting, JobStatus};
use crate::services::cv_service::CvService;
use crate::services::interview_service::InterviewService;
use crate::services::job_service::JobService;
use crate::services::message_service::MessageService;

const TOP_SKILLS: usize = 10;
const DAILY_WINDOW: u64 = 7;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkillCount {
    pub skill: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostingApplications {
    pub job_id: Uuid,
    pub title: String,
    pub status: JobStatus,
    pub applications_count: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_cvs: usize,
    pub cvs_by_status: Vec<StatusCount>,
    pub average_requirements_match: f64,
    pub total_interviews: usize,
    pub interviews_by_status: Vec<StatusCount>,
    pub unread_messages: i64,
    pub active_postings: usize,
    pub applications_per_posting: Vec<PostingApplications>,
    pub top_skills: Vec<SkillCount>,
    pub cvs_last_7_days: Vec<DailyCount>,
}

impl DashboardStats {
    pub fn compute(
        cvs: &[Cv],
        interviews: &[Interview],
        jobs: &[JobPosting],
        unread_messages: i64,
        today: NaiveDate,
    ) -> Self {
        let cvs_by_status = CvStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: status.as_str().to_string(),
                count: cvs.iter().filter(|cv| cv.status == *status).count(),
            })
            .collect();

        let interviews_by_status = InterviewStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: status.as_str().to_string(),
                count: interviews.iter().filter(|i| i.status == *status).count(),
            })
            .collect();

        let average_requirements_match = if cvs.is_empty() {
            0.0
        } else {
            let sum: f64 = cvs.iter().map(|cv| f64::from(cv.requirements_match)).sum();
            ((sum / cvs.len() as f64) * 100.0).round() / 100.0
        };

        let mut applications_per_posting: Vec<PostingApplications> = jobs
            .iter()
            .map(|job| PostingApplications {
                job_id: job.id,
                title: job.title.clone(),
                status: job.status,
                applications_count: job.applications_count,
            })
            .collect();
        applications_per_posting.sort_by(|a, b| {
            b.applications_count
                .cmp(&a.applications_count)
                .then_with(|| a.title.cmp(&b.title))
        });

        Self {
            total_cvs: cvs.len(),
            cvs_by_status,
            average_requirements_match,
            total_interviews: interviews.len(),
            interviews_by_status,
            unread_messages,
            active_postings: jobs
                .iter()
                .filter(|j| j.is_open(today))
                .count(),
            applications_per_posting,
            top_skills: top_skills(cvs, TOP_SKILLS),
            cvs_last_7_days: daily_counts(cvs, today, DAILY_WINDOW),
        }
    }
}

/// Skill frequency across CVs, case-insensitive. A CV counts each skill once.
pub fn top_skills(cvs: &[Cv], limit: usize) -> Vec<SkillCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for cv in cvs {
        let mut seen: Vec<String> = Vec::new();
        for skill in &cv.skills {
            let key = skill.trim().to_lowercase();
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            *counts.entry(key.clone()).or_default() += 1;
            seen.push(key);
        }
    }

    let mut ranked: Vec<SkillCount> = counts
        .into_iter()
        .map(|(skill, count)| SkillCount { skill, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.skill.cmp(&b.skill)));
    ranked.truncate(limit);
    ranked
}

/// CVs submitted on each of the last `days` days, oldest first, zero-filled.
pub fn daily_counts(cvs: &[Cv], today: NaiveDate, days: u64) -> Vec<DailyCount> {
    let start = today
        .checked_sub_days(Days::new(days.saturating_sub(1)))
        .unwrap_or(today);
    let mut buckets: BTreeMap<NaiveDate, usize> = start
        .iter_days()
        .take_while(|d| *d <= today)
        .map(|d| (d, 0))
        .collect();

    for cv in cvs {
        if let Some(count) = buckets.get_mut(&cv.created_at.date_naive()) {
            *count += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

#[derive(Clone)]
pub struct DashboardService {
    cvs: CvService,
    interviews: InterviewService,
    jobs: JobService,
    messages: MessageService,
}

impl DashboardService {
    pub fn new(
        cvs: CvService,
        interviews: InterviewService,
        jobs: JobService,
        messages: MessageService,
    ) -> Self {
        Self {
            cvs,
            interviews,
            jobs,
            messages,
        }
    }

    pub async fn stats(&self) -> Result<DashboardStats> {
        let (cvs, interviews, jobs, unread) = tokio::try_join!(
            self.cvs.list_all(),
            self.interviews.list_all(),
            self.jobs.list_all(),
            self.messages.total_unread_count(),
        )?;
        Ok(DashboardStats::compute(
            &cvs,
            &interviews,
            &jobs,
            unread,
            Utc::now().date_naive(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::scoring::tests::sample_cv;
    use chrono::{TimeZone, Utc};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn every_status_is_reported() {
        let mut a = sample_cv("A", 1, &[], 40);
        a.status = CvStatus::Accepted;
        let b = sample_cv("B", 1, &[], 60);

        let stats = DashboardStats::compute(&[a, b], &[], &[], 3, day(2026, 5, 10));
        assert_eq!(stats.total_cvs, 2);
        let counts: Vec<(&str, usize)> = stats
            .cvs_by_status
            .iter()
            .map(|s| (s.status.as_str(), s.count))
            .collect();
        assert_eq!(counts, vec![("pending", 1), ("accepted", 1), ("rejected", 0)]);
        assert_eq!(stats.interviews_by_status.len(), 3);
        assert!(stats.interviews_by_status.iter().all(|s| s.count == 0));
        assert_eq!(stats.average_requirements_match, 50.0);
        assert_eq!(stats.unread_messages, 3);
    }

    #[test]
    fn empty_dashboard_has_zero_average() {
        let stats = DashboardStats::compute(&[], &[], &[], 0, day(2026, 5, 10));
        assert_eq!(stats.average_requirements_match, 0.0);
        assert!(stats.top_skills.is_empty());
        assert_eq!(stats.cvs_last_7_days.len(), 7);
    }

    #[test]
    fn top_skills_break_ties_alphabetically() {
        let cvs = vec![
            sample_cv("A", 1, &["Rust", "sql", "rust"], 0),
            sample_cv("B", 1, &["SQL", "Go"], 0),
            sample_cv("C", 1, &["go", "Rust"], 0),
            sample_cv("D", 1, &["Elixir"], 0),
        ];
        let top = top_skills(&cvs, 3);
        let pairs: Vec<(&str, usize)> = top.iter().map(|s| (s.skill.as_str(), s.count)).collect();
        assert_eq!(pairs, vec![("go", 2), ("rust", 2), ("sql", 2)]);
    }

    #[test]
    fn daily_counts_cover_the_window() {
        let today = day(2026, 5, 10);
        let mut recent = sample_cv("A", 1, &[], 0);
        recent.created_at = Utc.with_ymd_and_hms(2026, 5, 10, 9, 0, 0).unwrap();
        let mut older = sample_cv("B", 1, &[], 0);
        older.created_at = Utc.with_ymd_and_hms(2026, 5, 4, 23, 0, 0).unwrap();
        let mut outside = sample_cv("C", 1, &[], 0);
        outside.created_at = Utc.with_ymd_and_hms(2026, 5, 3, 12, 0, 0).unwrap();

        let counts = daily_counts(&[recent, older, outside], today, 7);
        assert_eq!(counts.len(), 7);
        assert_eq!(counts[0].date, day(2026, 5, 4));
        assert_eq!(counts[0].count, 1);
        assert_eq!(counts[6].date, today);
        assert_eq!(counts[6].count, 1);
        assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), 2);
    }
}
