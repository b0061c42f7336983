use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use warden_application::{AssetDirectory, TicketListQuery, TicketRepository, TicketTransaction};
use warden_core::{AppError, AppResult, TenantId};
use warden_domain::{
    AccountId, Host, HostId, NewPermissionGrant, PermissionGrant, PermissionGrantId,
    SystemAccount, Ticket, TicketId,
};

#[derive(Debug, Clone, Default)]
struct TicketStoreState {
    tickets: HashMap<(TenantId, TicketId), Ticket>,
    hosts: HashMap<(TenantId, HostId), Host>,
    accounts: HashMap<(TenantId, AccountId), SystemAccount>,
    grants: HashMap<(TenantId, PermissionGrantId), PermissionGrant>,
}

impl TicketStoreState {
    fn hosts_by_ips(&self, tenant_id: TenantId, ips: &[IpAddr]) -> Vec<Host> {
        let mut hosts: Vec<Host> = self
            .hosts
            .iter()
            .filter_map(|((stored_tenant_id, _), host)| {
                (*stored_tenant_id == tenant_id && ips.contains(&host.ip())).then_some(host.clone())
            })
            .collect();
        hosts.sort_by(|left, right| left.hostname().cmp(right.hostname()));
        hosts
    }

    fn account_by_name(&self, tenant_id: TenantId, username: &str) -> Option<SystemAccount> {
        self.accounts
            .iter()
            .find(|((stored_tenant_id, _), account)| {
                *stored_tenant_id == tenant_id && account.username() == username
            })
            .map(|(_, account)| account.clone())
    }
}

/// In-memory ticket store.
///
/// Transactions hold the store's write lock until they commit or drop, so
/// ticket mutations are fully serialized. Writes are staged on a copy and
/// only published on commit.
///
/// Each transaction copies the whole store and blocks every tenant until it
/// finishes. This adapter backs development runs and tests; deployments use
/// [`crate::PostgresTicketRepository`], which locks single rows.
#[derive(Debug, Default)]
pub struct InMemoryTicketRepository {
    state: Arc<RwLock<TicketStoreState>>,
}

impl InMemoryTicketRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a host to the inventory. IPs are unique per tenant.
    pub async fn insert_host(&self, tenant_id: TenantId, host: Host) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state
            .hosts
            .iter()
            .any(|((stored_tenant_id, _), stored)| {
                *stored_tenant_id == tenant_id && stored.ip() == host.ip()
            })
        {
            return Err(AppError::Conflict(format!(
                "host with ip '{}' already exists for tenant '{tenant_id}'",
                host.ip()
            )));
        }

        state.hosts.insert((tenant_id, host.id()), host);
        Ok(())
    }

    /// Adds a system account to the inventory. Usernames are unique per tenant.
    pub async fn insert_account(&self, tenant_id: TenantId, account: SystemAccount) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.account_by_name(tenant_id, account.username()).is_some() {
            return Err(AppError::Conflict(format!(
                "system account '{}' already exists for tenant '{tenant_id}'",
                account.username()
            )));
        }

        state.accounts.insert((tenant_id, account.id()), account);
        Ok(())
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn insert_ticket(&self, tenant_id: TenantId, ticket: &Ticket) -> AppResult<()> {
        let key = (tenant_id, ticket.id());
        let mut state = self.state.write().await;

        if state.tickets.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "ticket '{}' already exists for tenant '{tenant_id}'",
                ticket.id()
            )));
        }

        state.tickets.insert(key, ticket.clone());
        Ok(())
    }

    async fn find_ticket(
        &self,
        tenant_id: TenantId,
        ticket_id: TicketId,
    ) -> AppResult<Option<Ticket>> {
        Ok(self
            .state
            .read()
            .await
            .tickets
            .get(&(tenant_id, ticket_id))
            .cloned())
    }

    async fn list_tickets_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
        query: TicketListQuery,
    ) -> AppResult<Vec<Ticket>> {
        let state = self.state.read().await;

        let mut tickets: Vec<Ticket> = state
            .tickets
            .iter()
            .filter_map(|((stored_tenant_id, _), ticket)| {
                (*stored_tenant_id == tenant_id
                    && ticket.is_participant(subject)
                    && query.matches(ticket))
                .then_some(ticket.clone())
            })
            .collect();
        tickets.sort_by(|left, right| right.created_at().cmp(&left.created_at()));

        Ok(tickets)
    }

    async fn find_grant(
        &self,
        tenant_id: TenantId,
        grant_id: PermissionGrantId,
    ) -> AppResult<Option<PermissionGrant>> {
        Ok(self
            .state
            .read()
            .await
            .grants
            .get(&(tenant_id, grant_id))
            .cloned())
    }

    async fn begin(&self, tenant_id: TenantId) -> AppResult<Box<dyn TicketTransaction>> {
        let guard = Arc::clone(&self.state).write_owned().await;
        let staged = (*guard).clone();

        Ok(Box::new(InMemoryTicketTransaction {
            tenant_id,
            guard: Some(guard),
            staged,
        }))
    }
}

#[async_trait]
impl AssetDirectory for InMemoryTicketRepository {
    async fn find_hosts_by_ips(&self, tenant_id: TenantId, ips: &[IpAddr]) -> AppResult<Vec<Host>> {
        Ok(self.state.read().await.hosts_by_ips(tenant_id, ips))
    }

    async fn find_account_by_name(
        &self,
        tenant_id: TenantId,
        username: &str,
    ) -> AppResult<Option<SystemAccount>> {
        Ok(self.state.read().await.account_by_name(tenant_id, username))
    }
}

struct InMemoryTicketTransaction {
    tenant_id: TenantId,
    guard: Option<OwnedRwLockWriteGuard<TicketStoreState>>,
    staged: TicketStoreState,
}

impl InMemoryTicketTransaction {
    fn ensure_open(&self) -> AppResult<()> {
        if self.guard.is_some() {
            return Ok(());
        }

        Err(AppError::Internal(
            "in-memory ticket transaction is already committed".to_owned(),
        ))
    }

    fn staged_grant(&mut self, grant_id: PermissionGrantId) -> AppResult<&mut PermissionGrant> {
        let tenant_id = self.tenant_id;
        self.staged
            .grants
            .get_mut(&(tenant_id, grant_id))
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "permission grant '{grant_id}' does not exist for tenant '{tenant_id}'"
                ))
            })
    }
}

#[async_trait]
impl TicketTransaction for InMemoryTicketTransaction {
    async fn lock_ticket(&mut self, ticket_id: TicketId) -> AppResult<Option<Ticket>> {
        self.ensure_open()?;
        Ok(self
            .staged
            .tickets
            .get(&(self.tenant_id, ticket_id))
            .cloned())
    }

    async fn find_hosts_by_ips(&mut self, ips: &[IpAddr]) -> AppResult<Vec<Host>> {
        self.ensure_open()?;
        Ok(self.staged.hosts_by_ips(self.tenant_id, ips))
    }

    async fn find_account_by_name(&mut self, username: &str) -> AppResult<Option<SystemAccount>> {
        self.ensure_open()?;
        Ok(self.staged.account_by_name(self.tenant_id, username))
    }

    async fn save_ticket(&mut self, ticket: &Ticket) -> AppResult<()> {
        self.ensure_open()?;
        let key = (self.tenant_id, ticket.id());
        let Some(stored) = self.staged.tickets.get_mut(&key) else {
            return Err(AppError::NotFound(format!(
                "ticket '{}' does not exist for tenant '{}'",
                ticket.id(),
                self.tenant_id
            )));
        };

        *stored = ticket.clone();
        Ok(())
    }

    async fn create_grant(&mut self, grant: NewPermissionGrant) -> AppResult<PermissionGrant> {
        self.ensure_open()?;
        let grant = PermissionGrant::from_new(PermissionGrantId::new(), grant, Utc::now());
        self.staged
            .grants
            .insert((self.tenant_id, grant.id), grant.clone());
        Ok(grant)
    }

    async fn attach_hosts(&mut self, grant_id: PermissionGrantId, hosts: &[Host]) -> AppResult<()> {
        self.ensure_open()?;
        let grant = self.staged_grant(grant_id)?;
        for host in hosts {
            if !grant.host_ids.contains(&host.id()) {
                grant.host_ids.push(host.id());
            }
        }

        Ok(())
    }

    async fn attach_account(
        &mut self,
        grant_id: PermissionGrantId,
        account: &SystemAccount,
    ) -> AppResult<()> {
        self.ensure_open()?;
        let grant = self.staged_grant(grant_id)?;
        if !grant.account_ids.contains(&account.id()) {
            grant.account_ids.push(account.id());
        }

        Ok(())
    }

    async fn commit(&mut self) -> AppResult<()> {
        let mut guard = self.guard.take().ok_or_else(|| {
            AppError::Internal("in-memory ticket transaction is already committed".to_owned())
        })?;

        *guard = std::mem::take(&mut self.staged);
        Ok(())
    }
}
