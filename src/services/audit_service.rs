use crate::error::Result;
use crate::models::audit_log::AuditLog;
use serde_json::Value as JsonValue;
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::PgPool;
use uuid::Uuid;

/// Who performed an admin action and from where.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub subject: Option<String>,
    pub ip: Option<IpNetwork>,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn log(
        &self,
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        changes: Option<JsonValue>,
    ) -> Result<AuditLog> {
        let row = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (actor, action, entity_type, entity_id, changes, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, actor, action, entity_type, entity_id, changes, ip_address, user_agent, created_at
            "#,
        )
        .bind(&actor.subject)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(changes)
        .bind(actor.ip)
        .bind(&actor.user_agent)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Audit failures never fail the audited operation.
    pub async fn record(
        &self,
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        changes: Option<JsonValue>,
    ) {
        if let Err(e) = self.log(actor, action, entity_type, entity_id, changes).await {
            tracing::error!(error = ?e, action, entity_id = %entity_id, "failed to write audit log");
        }
    }

    pub async fn list(&self, entity_id: Option<Uuid>, limit: i64) -> Result<Vec<AuditLog>> {
        let limit = limit.clamp(1, 500);
        let rows = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, actor, action, entity_type, entity_id, changes, ip_address, user_agent, created_at
            FROM audit_logs
            WHERE ($1::uuid IS NULL OR entity_id = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(entity_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
