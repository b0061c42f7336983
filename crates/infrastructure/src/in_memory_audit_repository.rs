use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use warden_application::{AuditEvent, AuditRepository};
use warden_core::AppResult;

/// In-memory append-only audit log.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded event in append order.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        debug!(
            tenant_id = %event.tenant_id,
            action = event.action.as_str(),
            resource_id = event.resource_id.as_str(),
            "audit event recorded"
        );
        self.events.write().await.push(event);
        Ok(())
    }
}
