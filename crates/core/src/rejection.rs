use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request-rejection reasons raised by the ticket workflow.
///
/// A rejection never mutates state and is never retried automatically: it
/// reports bad input or a stale view of the ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The ticket is closed and accepts no further actions.
    #[error("ticket is closed")]
    TicketClosed,
    /// The requested action has already been recorded on the ticket.
    #[error("ticket action is already set")]
    TicketActionAlreadySet,
    /// Requested host IPs did not resolve to the same number of hosts.
    #[error("requested asset ips do not match existing hosts")]
    AssetsIpsNotMatch,
    /// The requested system account does not exist.
    #[error("requested system user was not found")]
    SystemUserNotFound,
}

impl Rejection {
    /// Returns a stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::TicketClosed => "ticket_closed",
            Self::TicketActionAlreadySet => "ticket_action_already_set",
            Self::AssetsIpsNotMatch => "assets_ips_not_match",
            Self::SystemUserNotFound => "system_user_not_found",
        }
    }
}
