use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by ticket use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a ticket is submitted.
    TicketSubmitted,
    /// Emitted when a ticket's title or metadata changes.
    TicketUpdated,
    /// Emitted when a ticket is approved.
    TicketApproved,
    /// Emitted when a ticket is rejected.
    TicketRejected,
    /// Emitted when a ticket is closed.
    TicketClosed,
    /// Emitted when approval materializes a permission grant.
    PermissionGrantCreated,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TicketSubmitted => "ticket.submitted",
            Self::TicketUpdated => "ticket.updated",
            Self::TicketApproved => "ticket.approved",
            Self::TicketRejected => "ticket.rejected",
            Self::TicketClosed => "ticket.closed",
            Self::PermissionGrantCreated => "permission_grant.created",
        }
    }
}
