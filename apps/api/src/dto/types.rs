use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Reviewer named on a submitted ticket.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/assignee-request.ts"
)]
pub struct AssigneeRequest {
    pub subject: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Incoming payload for a grant-permission request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/submit-grant-permission-request.ts"
)]
pub struct SubmitGrantPermissionRequest {
    pub title: String,
    pub assignees: Vec<AssigneeRequest>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ips: Vec<String>,
    #[serde(default)]
    pub system_user: Option<String>,
    #[serde(default)]
    pub date_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_expired: Option<DateTime<Utc>>,
}

/// Incoming payload for an asset-access request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/submit-asset-access-request.ts"
)]
pub struct SubmitAssetAccessRequest {
    pub title: String,
    pub assignees: Vec<AssigneeRequest>,
    #[serde(default)]
    pub ips: Vec<String>,
    #[serde(default)]
    pub host_name: Option<String>,
    #[serde(default)]
    pub date_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_expired: Option<DateTime<Utc>>,
}

/// Partial metadata change, tagged by ticket kind.
#[derive(Debug, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/ticket-meta-patch-request.ts"
)]
pub enum TicketMetaPatchRequest {
    GrantPermission {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        ips: Option<Vec<String>>,
        #[serde(default)]
        system_user: Option<String>,
        #[serde(default)]
        date_start: Option<DateTime<Utc>>,
        #[serde(default)]
        date_expired: Option<DateTime<Utc>>,
    },
    AssetAccess {
        #[serde(default)]
        ips: Option<Vec<String>>,
        #[serde(default)]
        host_name: Option<String>,
        #[serde(default)]
        date_start: Option<DateTime<Utc>>,
        #[serde(default)]
        date_expired: Option<DateTime<Utc>>,
        #[serde(default)]
        confirmed_assets: Option<Vec<String>>,
        #[serde(default)]
        confirmed_system_users: Option<Vec<String>>,
    },
}

/// Incoming payload for a general ticket update.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-ticket-request.ts"
)]
pub struct UpdateTicketRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub meta: Option<TicketMetaPatchRequest>,
    /// `approve` or `reject`.
    #[serde(default)]
    pub action: Option<String>,
}

/// Ticket listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct TicketListQueryParams {
    pub status: Option<String>,
    pub action: Option<String>,
    pub kind: Option<String>,
}

/// API representation of a ticket participant.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/ticket-participant-response.ts"
)]
pub struct TicketParticipantResponse {
    pub subject: String,
    pub display_name: String,
}

/// API representation of ticket metadata.
#[derive(Debug, Serialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/ticket-meta-response.ts"
)]
pub enum TicketMetaResponse {
    GrantPermission {
        name: String,
        ips: Vec<String>,
        system_user: Option<String>,
        date_start: Option<DateTime<Utc>>,
        date_expired: Option<DateTime<Utc>>,
    },
    AssetAccess {
        ips: Vec<String>,
        host_name: Option<String>,
        date_start: Option<DateTime<Utc>>,
        date_expired: Option<DateTime<Utc>>,
        confirmed_assets: Vec<String>,
        confirmed_system_users: Vec<String>,
    },
}

/// API representation of a ticket.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/ticket-response.ts"
)]
pub struct TicketResponse {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub status: String,
    pub action: Option<String>,
    pub requester: TicketParticipantResponse,
    pub assignees: Vec<TicketParticipantResponse>,
    pub assignee: Option<TicketParticipantResponse>,
    pub meta: TicketMetaResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// API representation of a permission grant.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-grant-response.ts"
)]
pub struct PermissionGrantResponse {
    pub id: String,
    pub name: String,
    pub created_by: String,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub host_ids: Vec<String>,
    pub account_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Ticket state after a decision or update, with any grant it created.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/ticket-action-response.ts"
)]
pub struct TicketActionResponse {
    pub ticket: TicketResponse,
    pub grant: Option<PermissionGrantResponse>,
}

/// API representation of an inventory host.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/host-response.ts"
)]
pub struct HostResponse {
    pub id: String,
    pub ip: String,
    pub hostname: String,
}

/// Current resolution of a grant request. Both fields are null for callers
/// that may not act on the ticket.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/grant-resolution-response.ts"
)]
pub struct GrantResolutionResponse {
    pub hosts: Option<Vec<HostResponse>>,
    pub system_user_exists: Option<bool>,
}
