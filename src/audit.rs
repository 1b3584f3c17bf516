use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult, state::AppState};

/// A single audit entry: who did what to which table.
#[derive(Debug)]
pub struct AuditEvent<'a> {
    pub actor: Option<Uuid>,
    pub action: &'a str,
    pub resource: &'a str,
    pub metadata: Value,
}

pub async fn log_audit(pool: &DbPool, event: &AuditEvent<'_>) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event.actor)
    .bind(event.action)
    .bind(event.resource)
    .bind(&event.metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write an audit entry after the fact. Failures are logged and swallowed.
pub async fn record(state: &AppState, actor: Uuid, action: &str, resource: &str, metadata: Value) {
    let event = AuditEvent {
        actor: Some(actor),
        action,
        resource,
        metadata,
    };
    if let Err(err) = log_audit(state.pool(), &event).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
