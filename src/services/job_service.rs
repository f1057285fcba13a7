use crate::database::like::contains_pattern;
use crate::dto::job_dto::{
    check_salary_range, CreateJobPostingPayload, JobListQuery, UpdateJobPostingPayload,
};
use crate::error::{Error, Result};
use crate::models::job_posting::{JobPosting, JobStatus};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

pub(crate) const JOB_COLUMNS: &str = "id, title, department, location, employment_type, description, requirements, salary_min, salary_max, currency, deadline, status, applications_count, created_at, updated_at";

#[derive(Clone)]
pub struct JobService {
    pool: PgPool,
}

pub struct JobList {
    pub items: Vec<JobPosting>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Bumps the application counter. `None` when the posting does not exist.
pub async fn increment_applications<'e, E: PgExecutor<'e>>(
    executor: E,
    job_id: Uuid,
) -> Result<Option<i32>> {
    let count = sqlx::query_scalar::<_, Option<i32>>("SELECT increment_applications($1)")
        .bind(job_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Lowers the application counter, never below zero.
pub async fn decrement_applications<'e, E: PgExecutor<'e>>(
    executor: E,
    job_id: Uuid,
) -> Result<Option<i32>> {
    let count = sqlx::query_scalar::<_, Option<i32>>("SELECT decrement_applications($1)")
        .bind(job_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Normalises `page`/`per_page` and computes the row offset.
fn page_window(page: Option<i64>, per_page: Option<i64>) -> Result<(i64, i64, i64)> {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1)
        .checked_mul(per_page)
        .ok_or_else(|| Error::BadRequest("Page is out of range".into()))?;
    Ok((page, per_page, offset))
}

impl JobService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, payload: CreateJobPostingPayload) -> Result<JobPosting> {
        let payload = payload.trimmed();
        check_salary_range(payload.salary_min, payload.salary_max)?;
        let status = payload.status.unwrap_or(JobStatus::Active);

        let query = format!(
            r#"
            INSERT INTO job_postings (
                title, department, location, employment_type, description,
                requirements, salary_min, salary_max, currency, deadline, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        let job = sqlx::query_as::<_, JobPosting>(&query)
            .bind(&payload.title)
            .bind(&payload.department)
            .bind(&payload.location)
            .bind(&payload.employment_type)
            .bind(&payload.description)
            .bind(&payload.requirements)
            .bind(payload.salary_min)
            .bind(payload.salary_max)
            .bind(&payload.currency)
            .bind(payload.deadline)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(job_id = %job.id, title = %job.title, "job posting created");
        Ok(job)
    }

    pub async fn update(&self, id: Uuid, payload: UpdateJobPostingPayload) -> Result<JobPosting> {
        let payload = payload.trimmed();
        let mut tx = self.pool.begin().await?;
        let lock = format!("SELECT {} FROM job_postings WHERE id = $1 FOR UPDATE", JOB_COLUMNS);
        let current = sqlx::query_as::<_, JobPosting>(&lock)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("Job posting not found".into()))?;
        check_salary_range(
            payload.salary_min.or(current.salary_min),
            payload.salary_max.or(current.salary_max),
        )?;

        let query = format!(
            r#"
            UPDATE job_postings
            SET
                title = COALESCE($2, title),
                department = COALESCE($3, department),
                location = COALESCE($4, location),
                employment_type = COALESCE($5, employment_type),
                description = COALESCE($6, description),
                requirements = COALESCE($7, requirements),
                salary_min = COALESCE($8, salary_min),
                salary_max = COALESCE($9, salary_max),
                currency = COALESCE($10, currency),
                deadline = COALESCE($11, deadline),
                status = COALESCE($12, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        let job = sqlx::query_as::<_, JobPosting>(&query)
            .bind(id)
            .bind(payload.title)
            .bind(payload.department)
            .bind(payload.location)
            .bind(payload.employment_type)
            .bind(payload.description)
            .bind(payload.requirements)
            .bind(payload.salary_min)
            .bind(payload.salary_max)
            .bind(payload.currency)
            .bind(payload.deadline)
            .bind(payload.status)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(job)
    }

    pub async fn list(&self, query: JobListQuery) -> Result<JobList> {
        let (page, per_page, offset) = page_window(query.page, query.per_page)?;

        let mut filters = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = query.status {
            filters.push(format!("status = CAST(${} AS job_status)", args.len() + 1));
            args.push(status.as_str().to_string());
        }
        if let Some(department) = query.department.filter(|d| !d.trim().is_empty()) {
            filters.push(format!("department ILIKE ${} ESCAPE '\\'", args.len() + 1));
            args.push(contains_pattern(&department));
        }
        if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
            let first = args.len() + 1;
            let second = first + 1;
            filters.push(format!(
                "(title ILIKE ${} ESCAPE '\\' OR COALESCE(location, '') ILIKE ${} ESCAPE '\\')",
                first, second
            ));
            args.push(contains_pattern(&search));
            args.push(contains_pattern(&search));
        }

        let where_clause = if filters.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };

        let items_query = format!(
            "SELECT {} FROM job_postings {} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            JOB_COLUMNS,
            where_clause,
            args.len() + 1,
            args.len() + 2
        );
        let total_query = format!("SELECT COUNT(*) FROM job_postings {}", where_clause);

        let mut items_statement = sqlx::query_as::<_, JobPosting>(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        items_statement = items_statement.bind(per_page).bind(offset);
        let items = items_statement.fetch_all(&self.pool).await?;

        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total = total_statement.fetch_one(&self.pool).await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(JobList {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn list_all(&self) -> Result<Vec<JobPosting>> {
        let query = format!("SELECT {} FROM job_postings ORDER BY created_at DESC", JOB_COLUMNS);
        let items = sqlx::query_as::<_, JobPosting>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<JobPosting> {
        let query = format!("SELECT {} FROM job_postings WHERE id = $1", JOB_COLUMNS);
        let job = sqlx::query_as::<_, JobPosting>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job posting not found".into()))?;
        Ok(job)
    }

    /// Applicant-facing lookup; inactive postings are hidden.
    pub async fn get_active(&self, id: Uuid) -> Result<JobPosting> {
        let job = self.get_by_id(id).await?;
        if job.status != JobStatus::Active {
            return Err(Error::NotFound("Job posting not found".into()));
        }
        Ok(job)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let res = sqlx::query("DELETE FROM job_postings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Job posting not found".into()));
        }
        tracing::info!(job_id = %id, "job posting deleted");
        Ok(())
    }

    pub async fn list_active(&self, limit: i64) -> Result<Vec<JobPosting>> {
        let limit = if limit <= 0 { 20 } else { limit.min(100) };
        let query = format!(
            r#"
            SELECT {}
            FROM job_postings
            WHERE status = 'active' AND (deadline IS NULL OR deadline >= CURRENT_DATE)
            ORDER BY created_at DESC
            LIMIT $1
            "#,
            JOB_COLUMNS
        );
        let items = sqlx::query_as::<_, JobPosting>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn increment(&self, job_id: Uuid) -> Result<i32> {
        increment_applications(&self.pool, job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job posting not found".into()))
    }

    pub async fn decrement(&self, job_id: Uuid) -> Result<i32> {
        decrement_applications(&self.pool, job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job posting not found".into()))
    }

    /// Recomputes every counter from the CVs that reference the posting.
    /// Returns how many postings had drifted.
    pub async fn reconcile_counts(&self) -> Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE job_postings j
            SET applications_count = c.actual, updated_at = NOW()
            FROM (
                SELECT jp.id, COUNT(cv.id)::int AS actual
                FROM job_postings jp
                LEFT JOIN cvs cv ON cv.job_id = jp.id
                GROUP BY jp.id
            ) c
            WHERE j.id = c.id AND j.applications_count <> c.actual
            "#,
        )
        .execute(&self.pool)
        .await?;

        let corrected = res.rows_affected();
        if corrected > 0 {
            tracing::warn!(corrected, "application counters reconciled");
        }
        Ok(corrected)
    }

    pub async fn deactivate_expired(&self) -> Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE job_postings
            SET status = 'inactive', updated_at = NOW()
            WHERE status = 'active' AND deadline < CURRENT_DATE
            "#,
        )
        .execute(&self.pool)
        .await?;
        let closed = res.rows_affected();
        if closed > 0 {
            tracing::info!(closed, "expired job postings deactivated");
        }
        Ok(closed)
    }
}
