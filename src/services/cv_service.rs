use chrono::Utc;
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::like::contains_pattern;
use crate::dto::cv_dto::{CreateCvPayload, UpdateCvPayload};
use crate::error::{Error, Result};
use crate::models::cv::{Cv, CvStatus};
use crate::models::job_posting::JobPosting;
use crate::services::audit_service::{Actor, AuditService};
use crate::services::job_service::{decrement_applications, increment_applications, JOB_COLUMNS};
use crate::services::message_service;
use crate::services::scoring::CvFilter;

pub(crate) const CV_COLUMNS: &str = "id, user_id, applicant_name, email, phone, location, education, current_position, summary, years_experience, skills, languages, certifications, portfolio_url, status, requirements_match, job_id, avatar_url, created_at, updated_at";

#[derive(Clone)]
pub struct CvService {
    pool: PgPool,
    audit: AuditService,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if item.is_empty() || out.iter().any(|o| o.eq_ignore_ascii_case(item)) {
            continue;
        }
        out.push(item.to_string());
    }
    out
}

pub fn status_message(status: CvStatus) -> &'static str {
    match status {
        CvStatus::Pending => "Your CV is pending review.",
        CvStatus::Accepted => "Congratulations! Your CV has been accepted.",
        CvStatus::Rejected => "Thank you for applying. Unfortunately your CV was not selected.",
    }
}

impl CvService {
    pub fn new(pool: PgPool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    async fn lock_by_user(tx: &mut Transaction<'_, Postgres>, user_id: &str) -> Result<Cv> {
        let query = format!("SELECT {} FROM cvs WHERE user_id = $1 FOR UPDATE", CV_COLUMNS);
        sqlx::query_as::<_, Cv>(&query)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::NotFound("CV not found".into()))
    }

    async fn lock_by_id(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Cv> {
        let query = format!("SELECT {} FROM cvs WHERE id = $1 FOR UPDATE", CV_COLUMNS);
        sqlx::query_as::<_, Cv>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::NotFound("CV not found".into()))
    }

    pub async fn create(&self, user_id: &str, payload: CreateCvPayload) -> Result<Cv> {
        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM cvs WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_some() {
            return Err(Error::Conflict("This applicant already has a CV.".into()));
        }

        let query = format!(
            r#"
            INSERT INTO cvs (
                user_id, applicant_name, email, phone, location, education, current_position,
                summary, years_experience, skills, languages, certifications, portfolio_url
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            CV_COLUMNS
        );
        let cv = sqlx::query_as::<_, Cv>(&query)
            .bind(user_id)
            .bind(payload.applicant_name.trim())
            .bind(payload.email.trim().to_lowercase())
            .bind(non_blank(&payload.phone))
            .bind(non_blank(&payload.location))
            .bind(non_blank(&payload.education))
            .bind(non_blank(&payload.current_position))
            .bind(non_blank(&payload.summary))
            .bind(payload.years_experience)
            .bind(clean_list(payload.skills))
            .bind(clean_list(payload.languages))
            .bind(clean_list(payload.certifications))
            .bind(non_blank(&payload.portfolio_url))
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(cv_id = %cv.id, user_id, "cv submitted");
        Ok(cv)
    }

    pub async fn get(&self, id: Uuid) -> Result<Cv> {
        let query = format!("SELECT {} FROM cvs WHERE id = $1", CV_COLUMNS);
        sqlx::query_as::<_, Cv>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("CV not found".into()))
    }

    pub async fn get_by_user(&self, user_id: &str) -> Result<Cv> {
        let query = format!("SELECT {} FROM cvs WHERE user_id = $1", CV_COLUMNS);
        sqlx::query_as::<_, Cv>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("CV not found".into()))
    }

    pub async fn update_profile(&self, user_id: &str, payload: UpdateCvPayload) -> Result<Cv> {
        let query = format!(
            r#"
            UPDATE cvs
            SET
                applicant_name = COALESCE($2, applicant_name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                location = COALESCE($5, location),
                education = COALESCE($6, education),
                current_position = COALESCE($7, current_position),
                summary = COALESCE($8, summary),
                years_experience = COALESCE($9, years_experience),
                skills = COALESCE($10, skills),
                languages = COALESCE($11, languages),
                certifications = COALESCE($12, certifications),
                portfolio_url = COALESCE($13, portfolio_url),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING {}
            "#,
            CV_COLUMNS
        );
        sqlx::query_as::<_, Cv>(&query)
            .bind(user_id)
            .bind(non_blank(&payload.applicant_name))
            .bind(non_blank(&payload.email).map(|e| e.to_lowercase()))
            .bind(non_blank(&payload.phone))
            .bind(non_blank(&payload.location))
            .bind(non_blank(&payload.education))
            .bind(non_blank(&payload.current_position))
            .bind(non_blank(&payload.summary))
            .bind(payload.years_experience)
            .bind(payload.skills.map(clean_list))
            .bind(payload.languages.map(clean_list))
            .bind(payload.certifications.map(clean_list))
            .bind(non_blank(&payload.portfolio_url))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("CV not found".into()))
    }

    pub async fn list(&self, filter: &CvFilter) -> Result<Vec<Cv>> {
        let query = format!(
            r#"
            SELECT {}
            FROM cvs
            WHERE ($1::cv_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR job_id = $2)
              AND ($3::int IS NULL OR years_experience >= $3)
              AND ($4::text IS NULL OR EXISTS (
                    SELECT 1 FROM unnest(skills) AS s WHERE s ILIKE $4 ESCAPE '\'
                  ))
              AND ($5::text IS NULL
                   OR applicant_name ILIKE $5 ESCAPE '\'
                   OR email ILIKE $5 ESCAPE '\'
                   OR COALESCE(current_position, '') ILIKE $5 ESCAPE '\')
            ORDER BY created_at DESC
            "#,
            CV_COLUMNS
        );
        let cvs = sqlx::query_as::<_, Cv>(&query)
            .bind(filter.status)
            .bind(filter.job_id)
            .bind(filter.min_experience)
            .bind(non_blank(&filter.skill).map(|s| contains_pattern(&s)))
            .bind(non_blank(&filter.search).map(|s| contains_pattern(&s)))
            .fetch_all(&self.pool)
            .await?;
        Ok(cvs)
    }

    pub async fn list_all(&self) -> Result<Vec<Cv>> {
        self.list(&CvFilter::default()).await
    }

    pub async fn update_status(&self, id: Uuid, status: CvStatus, actor: &Actor) -> Result<Cv> {
        let mut tx = self.pool.begin().await?;
        let current = Self::lock_by_id(&mut tx, id).await?;

        if current.status == status {
            return Ok(current);
        }
        if !current.status.can_transition_to(status) {
            return Err(Error::Conflict(format!(
                "Cannot change CV status from {} to {}",
                current.status, status
            )));
        }

        let query = format!(
            "UPDATE cvs SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            CV_COLUMNS
        );
        let updated = sqlx::query_as::<_, Cv>(&query)
            .bind(status)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        message_service::append(&mut *tx, id, status_message(status)).await?;
        tx.commit().await?;

        tracing::info!(cv_id = %id, from = %current.status, to = %status, "cv status changed");
        self.audit
            .record(
                actor,
                "cv.status_changed",
                "cv",
                id,
                Some(json!({ "from": current.status, "to": status })),
            )
            .await;
        Ok(updated)
    }

    pub async fn set_requirements_match(&self, id: Uuid, value: i32, actor: &Actor) -> Result<Cv> {
        let query = format!(
            "UPDATE cvs SET requirements_match = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            CV_COLUMNS
        );
        let cv = sqlx::query_as::<_, Cv>(&query)
            .bind(value.clamp(0, 100))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("CV not found".into()))?;
        self.audit
            .record(
                actor,
                "cv.match_updated",
                "cv",
                id,
                Some(json!({ "requirements_match": cv.requirements_match })),
            )
            .await;
        Ok(cv)
    }

    /// Points the applicant's CV at a posting and moves the application counters
    /// in the same transaction.
    pub async fn apply_to_job(&self, user_id: &str, job_id: Uuid) -> Result<Cv> {
        let mut tx = self.pool.begin().await?;
        let cv = Self::lock_by_user(&mut tx, user_id).await?;

        if cv.job_id == Some(job_id) {
            return Err(Error::Conflict("You have already applied to this job.".into()));
        }

        let job_query = format!("SELECT {} FROM job_postings WHERE id = $1 FOR SHARE", JOB_COLUMNS);
        let job = sqlx::query_as::<_, JobPosting>(&job_query)
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("Job posting not found".into()))?;
        if !job.is_open(Utc::now().date_naive()) {
            return Err(Error::BadRequest("This job posting is no longer accepting applications.".into()));
        }

        if let Some(previous) = cv.job_id {
            decrement_applications(&mut *tx, previous).await?;
        }

        let query = format!(
            "UPDATE cvs SET job_id = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            CV_COLUMNS
        );
        let updated = sqlx::query_as::<_, Cv>(&query)
            .bind(job_id)
            .bind(cv.id)
            .fetch_one(&mut *tx)
            .await?;
        increment_applications(&mut *tx, job_id).await?;
        message_service::append(
            &mut *tx,
            cv.id,
            &format!("Your application for \"{}\" was received.", job.title),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(cv_id = %cv.id, job_id = %job_id, previous_job = ?cv.job_id, "applied to job");
        Ok(updated)
    }

    pub async fn withdraw_application(&self, user_id: &str) -> Result<Cv> {
        let mut tx = self.pool.begin().await?;
        let cv = Self::lock_by_user(&mut tx, user_id).await?;
        let job_id = cv
            .job_id
            .ok_or_else(|| Error::BadRequest("There is no application to withdraw.".into()))?;

        let query = format!(
            "UPDATE cvs SET job_id = NULL, updated_at = NOW() WHERE id = $1 RETURNING {}",
            CV_COLUMNS
        );
        let updated = sqlx::query_as::<_, Cv>(&query)
            .bind(cv.id)
            .fetch_one(&mut *tx)
            .await?;
        decrement_applications(&mut *tx, job_id).await?;
        tx.commit().await?;

        tracing::info!(cv_id = %cv.id, job_id = %job_id, "application withdrawn");
        Ok(updated)
    }

    /// Deletes the CV and releases its application. Returns the removed row.
    pub async fn delete(&self, id: Uuid, actor: &Actor) -> Result<Cv> {
        let mut tx = self.pool.begin().await?;
        let cv = Self::lock_by_id(&mut tx, id).await?;
        if let Some(job_id) = cv.job_id {
            decrement_applications(&mut *tx, job_id).await?;
        }
        sqlx::query("DELETE FROM cvs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(cv_id = %id, "cv deleted");
        self.audit
            .record(
                actor,
                "cv.deleted",
                "cv",
                id,
                Some(json!({ "applicant_name": cv.applicant_name, "job_id": cv.job_id })),
            )
            .await;
        Ok(cv)
    }

    /// Stores the new avatar URL and hands back the one it replaced.
    pub async fn set_avatar(&self, cv_id: Uuid, avatar_url: Option<&str>) -> Result<(Cv, Option<String>)> {
        let mut tx = self.pool.begin().await?;
        let current = Self::lock_by_id(&mut tx, cv_id).await?;
        let query = format!(
            "UPDATE cvs SET avatar_url = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            CV_COLUMNS
        );
        let updated = sqlx::query_as::<_, Cv>(&query)
            .bind(avatar_url)
            .bind(cv_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok((updated, current.avatar_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_list_trims_and_dedupes_case_insensitively() {
        let cleaned = clean_list(vec![
            " Rust ".into(),
            "rust".into(),
            "".into(),
            "SQL".into(),
        ]);
        assert_eq!(cleaned, vec!["Rust".to_string(), "SQL".to_string()]);
    }

    #[test]
    fn blank_optional_fields_become_null() {
        assert_eq!(non_blank(&Some("   ".into())), None);
        assert_eq!(non_blank(&Some(" Lisbon ".into())), Some("Lisbon".into()));
        assert_eq!(non_blank(&None), None);
    }

    #[test]
    fn every_status_has_a_message() {
        for status in CvStatus::ALL {
            assert!(!status_message(status).is_empty());
        }
    }
}
