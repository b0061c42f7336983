use warden_core::Principal;
use warden_domain::Ticket;

/// Capability check deciding who may record actions on a ticket.
pub trait TicketActionAuthorizer: Send + Sync {
    /// Returns whether `principal` may approve, reject or close `ticket` as a reviewer.
    fn can_act(&self, ticket: &Ticket, principal: &Principal) -> bool;
}

/// Allows exactly the ticket's assignees to act.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssigneeAuthorizer;

impl TicketActionAuthorizer for AssigneeAuthorizer {
    fn can_act(&self, ticket: &Ticket, principal: &Principal) -> bool {
        ticket.is_assignee(principal.subject())
    }
}
