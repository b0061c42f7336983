//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod asset;
mod grant_resolution;
mod permission_grant;
mod security;
mod ticket;
mod ticket_meta;

pub use asset::{AccountId, Host, HostId, SystemAccount};
pub use grant_resolution::{ResolvedGrantTargets, ensure_hosts_match, require_account};
pub use permission_grant::{
    DEFAULT_GRANT_VALIDITY_YEARS, NewPermissionGrant, PermissionGrant, PermissionGrantId,
    default_valid_until,
};
pub use security::AuditAction;
pub use ticket::{
    ActionTransition, Ticket, TicketAction, TicketId, TicketKind, TicketParticipant, TicketPatch,
    TicketRecord, TicketStatus, TicketSubmission,
};
pub use ticket_meta::{
    ASSET_ACCESS_HOST_NAME_MAX_CHARS, AssetAccessPatch, AssetAccessRequest,
    GRANT_NAME_MAX_CHARS, GrantPermissionPatch, GrantPermissionRequest,
    SYSTEM_USER_MAX_CHARS, TicketMeta, TicketMetaPatch,
};
