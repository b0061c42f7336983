use std::net::IpAddr;

use async_trait::async_trait;
use warden_core::{AppResult, TenantId};
use warden_domain::{
    Host, NewPermissionGrant, PermissionGrant, PermissionGrantId, SystemAccount, Ticket, TicketId,
};

use super::TicketListQuery;

/// Ticket persistence port.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Persists a newly submitted ticket.
    async fn insert_ticket(&self, tenant_id: TenantId, ticket: &Ticket) -> AppResult<()>;

    /// Finds one ticket without locking it.
    async fn find_ticket(
        &self,
        tenant_id: TenantId,
        ticket_id: TicketId,
    ) -> AppResult<Option<Ticket>>;

    /// Lists tickets where `subject` is the requester or an assignee, newest first.
    async fn list_tickets_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
        query: TicketListQuery,
    ) -> AppResult<Vec<Ticket>>;

    /// Finds one committed permission grant.
    async fn find_grant(
        &self,
        tenant_id: TenantId,
        grant_id: PermissionGrantId,
    ) -> AppResult<Option<PermissionGrant>>;

    /// Starts an all-or-nothing unit of work.
    ///
    /// Dropping the transaction without calling
    /// [`TicketTransaction::commit`] discards every write made through it.
    async fn begin(&self, tenant_id: TenantId) -> AppResult<Box<dyn TicketTransaction>>;
}

/// Read-only lookups against the asset inventory.
#[async_trait]
pub trait AssetDirectory: Send + Sync {
    /// Returns hosts whose IP exactly matches one of `ips`.
    async fn find_hosts_by_ips(&self, tenant_id: TenantId, ips: &[IpAddr]) -> AppResult<Vec<Host>>;

    /// Returns the system account with `username`, if any.
    async fn find_account_by_name(
        &self,
        tenant_id: TenantId,
        username: &str,
    ) -> AppResult<Option<SystemAccount>>;
}

/// Unit of work covering a ticket lock, its mutation and grant creation.
///
/// Implementations hold an exclusive lock on every ticket returned by
/// [`TicketTransaction::lock_ticket`] until commit or drop, and keep resolved
/// hosts and accounts stable for the same span.
#[async_trait]
pub trait TicketTransaction: Send {
    /// Loads and exclusively locks one ticket.
    async fn lock_ticket(&mut self, ticket_id: TicketId) -> AppResult<Option<Ticket>>;

    /// Returns hosts whose IP exactly matches one of `ips`.
    async fn find_hosts_by_ips(&mut self, ips: &[IpAddr]) -> AppResult<Vec<Host>>;

    /// Returns the system account with `username`, if any.
    async fn find_account_by_name(&mut self, username: &str) -> AppResult<Option<SystemAccount>>;

    /// Writes the ticket's current state.
    async fn save_ticket(&mut self, ticket: &Ticket) -> AppResult<()>;

    /// Creates a grant, applying store defaults to absent validity bounds.
    async fn create_grant(&mut self, grant: NewPermissionGrant) -> AppResult<PermissionGrant>;

    /// Links hosts to a grant created in this transaction.
    async fn attach_hosts(&mut self, grant_id: PermissionGrantId, hosts: &[Host]) -> AppResult<()>;

    /// Links a system account to a grant created in this transaction.
    async fn attach_account(
        &mut self,
        grant_id: PermissionGrantId,
        account: &SystemAccount,
    ) -> AppResult<()>;

    /// Makes every write visible atomically. The transaction is finished afterwards.
    async fn commit(&mut self) -> AppResult<()>;
}
