mod audit;
mod authorizer;
mod inputs;
mod repository;

pub use audit::{AuditEvent, AuditRepository};
pub use authorizer::{AssigneeAuthorizer, TicketActionAuthorizer};
pub use inputs::{
    GrantResolutionPreview, SubmitAssetAccessRequestInput, SubmitGrantPermissionRequestInput,
    TicketActionOutcome, TicketListQuery, TicketUpdateInput,
};
pub use repository::{AssetDirectory, TicketRepository, TicketTransaction};
