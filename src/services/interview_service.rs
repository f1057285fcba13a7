use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::interview_dto::{InterviewListQuery, ScheduleInterviewPayload, UpdateInterviewPayload};
use crate::error::{Error, Result};
use crate::models::interview::{Interview, InterviewStatus};
use crate::services::audit_service::{Actor, AuditService};
use crate::services::message_service;

const INTERVIEW_COLUMNS: &str =
    "id, cv_id, scheduled_at, location, status, feedback, created_at, updated_at";

#[derive(Clone)]
pub struct InterviewService {
    pool: PgPool,
    audit: AuditService,
}

fn invitation_text(scheduled_at: DateTime<Utc>, location: Option<&str>) -> String {
    let when = scheduled_at.format("%Y-%m-%d %H:%M UTC");
    match location {
        Some(place) if !place.trim().is_empty() => {
            format!("You are invited to an interview on {} at {}.", when, place.trim())
        }
        _ => format!("You are invited to an interview on {}.", when),
    }
}

impl InterviewService {
    pub fn new(pool: PgPool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    /// One interview per CV; the applicant gets an invitation message.
    pub async fn schedule(&self, payload: ScheduleInterviewPayload, actor: &Actor) -> Result<Interview> {
        let mut tx = self.pool.begin().await?;

        let cv_exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM cvs WHERE id = $1 FOR UPDATE")
            .bind(payload.cv_id)
            .fetch_optional(&mut *tx)
            .await?;
        if cv_exists.is_none() {
            return Err(Error::NotFound("CV not found".into()));
        }

        let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM interviews WHERE cv_id = $1")
            .bind(payload.cv_id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(Error::Conflict("An interview is already scheduled for this CV.".into()));
        }

        let location = payload
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty());
        let query = format!(
            r#"
            INSERT INTO interviews (cv_id, scheduled_at, location, status)
            VALUES ($1, $2, $3, 'scheduled')
            RETURNING {}
            "#,
            INTERVIEW_COLUMNS
        );
        let interview = sqlx::query_as::<_, Interview>(&query)
            .bind(payload.cv_id)
            .bind(payload.scheduled_at)
            .bind(location)
            .fetch_one(&mut *tx)
            .await?;
        message_service::append(
            &mut *tx,
            payload.cv_id,
            &invitation_text(interview.scheduled_at, interview.location.as_deref()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(interview_id = %interview.id, cv_id = %interview.cv_id, "interview scheduled");
        self.audit
            .record(
                actor,
                "interview.scheduled",
                "interview",
                interview.id,
                Some(json!({ "cv_id": interview.cv_id, "scheduled_at": interview.scheduled_at })),
            )
            .await;
        Ok(interview)
    }

    pub async fn list(&self, query: InterviewListQuery) -> Result<Vec<Interview>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM interviews
            WHERE ($1::interview_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR cv_id = $2)
            ORDER BY scheduled_at ASC
            "#,
            INTERVIEW_COLUMNS
        );
        let items = sqlx::query_as::<_, Interview>(&sql)
            .bind(query.status)
            .bind(query.cv_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn list_all(&self) -> Result<Vec<Interview>> {
        self.list(InterviewListQuery::default()).await
    }

    pub async fn get_for_cv(&self, cv_id: Uuid) -> Result<Interview> {
        let sql = format!("SELECT {} FROM interviews WHERE cv_id = $1", INTERVIEW_COLUMNS);
        sqlx::query_as::<_, Interview>(&sql)
            .bind(cv_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("No interview scheduled".into()))
    }

    /// A new date puts the interview back to `scheduled` and notifies the applicant.
    pub async fn update(&self, id: Uuid, payload: UpdateInterviewPayload, actor: &Actor) -> Result<Interview> {
        let rescheduled = payload.scheduled_at.is_some();
        let sql = format!(
            r#"
            UPDATE interviews
            SET
                scheduled_at = COALESCE($2, scheduled_at),
                location = COALESCE($3, location),
                feedback = COALESCE($4, feedback),
                status = CASE WHEN $5 THEN 'scheduled'::interview_status ELSE status END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            INTERVIEW_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let interview = sqlx::query_as::<_, Interview>(&sql)
            .bind(id)
            .bind(payload.scheduled_at)
            .bind(payload.location.as_deref().map(str::trim))
            .bind(payload.feedback)
            .bind(rescheduled)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("Interview not found".into()))?;
        if rescheduled {
            message_service::append(
                &mut *tx,
                interview.cv_id,
                &format!(
                    "Your interview was rescheduled. {}",
                    invitation_text(interview.scheduled_at, interview.location.as_deref())
                ),
            )
            .await?;
        }
        tx.commit().await?;

        self.audit
            .record(
                actor,
                "interview.updated",
                "interview",
                id,
                Some(json!({ "rescheduled": rescheduled, "status": interview.status })),
            )
            .await;
        Ok(interview)
    }

    /// Applicant confirms or declines their own scheduled interview.
    pub async fn respond(&self, cv_id: Uuid, response: InterviewStatus) -> Result<Interview> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {} FROM interviews WHERE cv_id = $1 FOR UPDATE", INTERVIEW_COLUMNS);
        let current = sqlx::query_as::<_, Interview>(&sql)
            .bind(cv_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("No interview scheduled".into()))?;

        if response == InterviewStatus::Scheduled {
            return Err(Error::BadRequest("Response must be confirmed or declined".into()));
        }
        if !current.status.accepts_response(response) {
            return Err(Error::Conflict(format!("Interview is already {}", current.status)));
        }

        let sql = format!(
            "UPDATE interviews SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            INTERVIEW_COLUMNS
        );
        let interview = sqlx::query_as::<_, Interview>(&sql)
            .bind(response)
            .bind(current.id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(interview_id = %interview.id, status = %response, "interview response recorded");
        Ok(interview)
    }

    pub async fn delete(&self, id: Uuid, actor: &Actor) -> Result<()> {
        let res = sqlx::query("DELETE FROM interviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Interview not found".into()));
        }
        tracing::info!(interview_id = %id, "interview cancelled");
        self.audit
            .record(actor, "interview.cancelled", "interview", id, None)
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn invitation_mentions_time_and_place() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 14, 30, 0).unwrap();
        assert_eq!(
            invitation_text(at, Some(" Room 4 ")),
            "You are invited to an interview on 2026-03-04 14:30 UTC at Room 4."
        );
        assert_eq!(
            invitation_text(at, Some("")),
            "You are invited to an interview on 2026-03-04 14:30 UTC."
        );
        assert_eq!(
            invitation_text(at, None),
            "You are invited to an interview on 2026-03-04 14:30 UTC."
        );
    }
}
