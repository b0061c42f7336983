//! Application services and ports.

#![forbid(unsafe_code)]

mod ticket_ports;
mod ticket_service;

pub use ticket_ports::{
    AssetDirectory, AssigneeAuthorizer, AuditEvent, AuditRepository, GrantResolutionPreview,
    SubmitAssetAccessRequestInput, SubmitGrantPermissionRequestInput, TicketActionAuthorizer,
    TicketActionOutcome, TicketListQuery, TicketRepository, TicketTransaction, TicketUpdateInput,
};
pub use ticket_service::TicketService;
