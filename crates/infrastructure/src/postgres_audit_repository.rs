use async_trait::async_trait;
use sqlx::PgPool;
use warden_application::{AuditEvent, AuditRepository};
use warden_core::{AppError, AppResult};

/// PostgreSQL-backed append-only audit repository.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let tenant_id = event.tenant_id;
        let action = event.action.as_str();

        sqlx::query(
            r#"
            INSERT INTO audit_log_entries (
                tenant_id,
                subject,
                action,
                resource_type,
                resource_id,
                detail
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(event.subject)
        .bind(action)
        .bind(event.resource_type)
        .bind(event.resource_id)
        .bind(event.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to append audit event '{action}' for tenant '{tenant_id}': {error}"
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;
    use warden_application::{AuditEvent, AuditRepository};
    use warden_core::TenantId;
    use warden_domain::AuditAction;

    use super::PostgresAuditRepository;
    use crate::postgres_test_pool;

    #[tokio::test]
    async fn appended_event_is_stored_with_action_code() {
        let Some(pool) = postgres_test_pool().await else {
            return;
        };

        let repository = PostgresAuditRepository::new(pool.clone());
        let tenant_id = TenantId::new();
        let appended = repository
            .append_event(AuditEvent {
                tenant_id,
                subject: "bob".to_owned(),
                action: AuditAction::TicketApproved,
                resource_type: "ticket".to_owned(),
                resource_id: "ticket-1".to_owned(),
                detail: None,
            })
            .await;
        assert!(appended.is_ok());

        let action = stored_action(&pool, tenant_id).await;
        assert_eq!(action.as_deref(), Some("ticket.approved"));
    }

    async fn stored_action(pool: &PgPool, tenant_id: TenantId) -> Option<String> {
        sqlx::query_scalar::<_, String>(
            "SELECT action FROM audit_log_entries WHERE tenant_id = $1",
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(pool)
        .await
        .unwrap_or_else(|_| unreachable!())
    }
}
