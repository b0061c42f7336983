use serde::{Deserialize, Serialize};

use crate::TenantId;

/// Authenticated principal acting on behalf of a request.
///
/// The identity is resolved by the surrounding platform; Warden only
/// consumes it to stamp requesters, assignees and grant authors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    subject: String,
    display_name: String,
    tenant_id: TenantId,
}

impl Principal {
    /// Creates a principal from identity-provider and tenancy data.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        display_name: impl Into<String>,
        tenant_id: TenantId,
    ) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
            tenant_id,
        }
    }

    /// Returns the stable subject identifier.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the human-readable name, falling back to the subject.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            return self.subject.as_str();
        }

        self.display_name.as_str()
    }

    /// Returns the tenant the principal acts in.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
