use warden_application::TicketService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub ticket_service: TicketService,
}
