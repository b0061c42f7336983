use std::net::IpAddr;

use chrono::{DateTime, Utc};
use warden_domain::{
    GrantPermissionRequest, Host, PermissionGrant, Ticket, TicketAction, TicketKind,
    TicketMetaPatch, TicketParticipant, TicketStatus,
};

/// Payload for submitting a grant-permission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitGrantPermissionRequestInput {
    /// Ticket title.
    pub title: String,
    /// Reviewers allowed to act on the ticket.
    pub assignees: Vec<TicketParticipant>,
    /// Requested grant.
    pub request: GrantPermissionRequest,
}

/// Payload for submitting an asset-access request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitAssetAccessRequestInput {
    /// Ticket title.
    pub title: String,
    /// Reviewers allowed to act on the ticket.
    pub assignees: Vec<TicketParticipant>,
    /// Requested host addresses.
    pub ips: Vec<IpAddr>,
    /// Free-form host name hint.
    pub host_name: Option<String>,
    /// Requested start of validity.
    pub date_start: Option<DateTime<Utc>>,
    /// Requested end of validity.
    pub date_expired: Option<DateTime<Utc>>,
}

/// Ticket listing filters. Listing is always scoped to the caller's tickets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketListQuery {
    /// Optional status filter.
    pub status: Option<TicketStatus>,
    /// Optional recorded-action filter.
    pub action: Option<TicketAction>,
    /// Optional kind filter.
    pub kind: Option<TicketKind>,
}

impl TicketListQuery {
    /// Returns whether `ticket` passes every filter.
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.status.is_none_or(|status| ticket.status() == status)
            && self.action.is_none_or(|action| ticket.action() == Some(action))
            && self.kind.is_none_or(|kind| ticket.kind() == kind)
    }
}

/// General ticket update. An `action` here goes through the same guarded
/// decision as the dedicated approve/reject operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketUpdateInput {
    /// Replacement title.
    pub title: Option<String>,
    /// Same-kind metadata patch.
    pub meta: Option<TicketMetaPatch>,
    /// Decision to record.
    pub action: Option<TicketAction>,
}

/// Committed result of a ticket mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketActionOutcome {
    /// Ticket state after commit.
    pub ticket: Ticket,
    /// Grant materialized by a first approval, if any.
    pub grant: Option<PermissionGrant>,
}

/// Assignee-only view of how a grant request would resolve right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantResolutionPreview {
    /// Hosts currently matching the requested IPs.
    pub hosts: Vec<Host>,
    /// Whether the requested system account currently exists.
    pub system_user_exists: bool,
}
