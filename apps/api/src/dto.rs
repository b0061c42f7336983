mod conversions;
mod types;

pub use conversions::parse_ips;
pub use types::{
    GrantResolutionResponse, HealthResponse, PermissionGrantResponse, SubmitAssetAccessRequest,
    SubmitGrantPermissionRequest, TicketActionResponse, TicketListQueryParams, TicketResponse,
    UpdateTicketRequest,
};
