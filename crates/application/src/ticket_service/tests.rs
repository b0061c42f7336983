use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use warden_core::{AppError, AppResult, Principal, Rejection, TenantId};
use warden_domain::{
    AccountId, AssetAccessPatch, AuditAction, GrantPermissionPatch, GrantPermissionRequest, Host,
    HostId, NewPermissionGrant, PermissionGrant, PermissionGrantId, SystemAccount, Ticket,
    TicketAction, TicketId, TicketMetaPatch, TicketParticipant, TicketStatus,
    default_valid_until,
};

use crate::ticket_ports::{
    AssetDirectory, AuditEvent, AuditRepository, SubmitAssetAccessRequestInput,
    SubmitGrantPermissionRequestInput, TicketActionAuthorizer, TicketListQuery, TicketRepository,
    TicketTransaction, TicketUpdateInput,
};

use super::TicketService;

#[derive(Debug, Clone, Default)]
struct FakeState {
    tickets: HashMap<TicketId, (TenantId, Ticket)>,
    hosts: Vec<(TenantId, Host)>,
    accounts: Vec<(TenantId, SystemAccount)>,
    grants: Vec<(TenantId, PermissionGrant)>,
}

impl FakeState {
    fn hosts_by_ips(&self, tenant_id: TenantId, ips: &[IpAddr]) -> Vec<Host> {
        self.hosts
            .iter()
            .filter(|(stored_tenant_id, host)| {
                *stored_tenant_id == tenant_id && ips.contains(&host.ip())
            })
            .map(|(_, host)| host.clone())
            .collect()
    }

    fn account_by_name(&self, tenant_id: TenantId, username: &str) -> Option<SystemAccount> {
        self.accounts
            .iter()
            .find(|(stored_tenant_id, account)| {
                *stored_tenant_id == tenant_id && account.username() == username
            })
            .map(|(_, account)| account.clone())
    }

    fn grant_mut(&mut self, grant_id: PermissionGrantId) -> AppResult<&mut PermissionGrant> {
        self.grants
            .iter_mut()
            .map(|(_, grant)| grant)
            .find(|grant| grant.id == grant_id)
            .ok_or_else(|| AppError::NotFound(format!("grant '{grant_id}' not staged")))
    }
}

#[derive(Default)]
struct FakeTicketRepository {
    state: Arc<Mutex<FakeState>>,
    fail_attach_hosts: bool,
}

impl FakeTicketRepository {
    async fn seed_host(&self, tenant_id: TenantId, ip: &str) -> Host {
        let host = Host::new(
            HostId::new(),
            ip.parse().unwrap_or_else(|_| unreachable!()),
            format!("host-{ip}"),
        )
        .unwrap_or_else(|_| unreachable!());
        self.state
            .lock()
            .await
            .hosts
            .push((tenant_id, host.clone()));
        host
    }

    async fn seed_account(&self, tenant_id: TenantId, username: &str) -> SystemAccount {
        let account =
            SystemAccount::new(AccountId::new(), username).unwrap_or_else(|_| unreachable!());
        self.state
            .lock()
            .await
            .accounts
            .push((tenant_id, account.clone()));
        account
    }

    async fn grants(&self) -> Vec<PermissionGrant> {
        self.state
            .lock()
            .await
            .grants
            .iter()
            .map(|(_, grant)| grant.clone())
            .collect()
    }
}

#[async_trait]
impl TicketRepository for FakeTicketRepository {
    async fn insert_ticket(&self, tenant_id: TenantId, ticket: &Ticket) -> AppResult<()> {
        self.state
            .lock()
            .await
            .tickets
            .insert(ticket.id(), (tenant_id, ticket.clone()));
        Ok(())
    }

    async fn find_ticket(
        &self,
        tenant_id: TenantId,
        ticket_id: TicketId,
    ) -> AppResult<Option<Ticket>> {
        Ok(self
            .state
            .lock()
            .await
            .tickets
            .get(&ticket_id)
            .filter(|(stored_tenant_id, _)| *stored_tenant_id == tenant_id)
            .map(|(_, ticket)| ticket.clone()))
    }

    async fn list_tickets_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
        query: TicketListQuery,
    ) -> AppResult<Vec<Ticket>> {
        Ok(self
            .state
            .lock()
            .await
            .tickets
            .values()
            .filter(|(stored_tenant_id, ticket)| {
                *stored_tenant_id == tenant_id
                    && ticket.is_participant(subject)
                    && query.matches(ticket)
            })
            .map(|(_, ticket)| ticket.clone())
            .collect())
    }

    async fn find_grant(
        &self,
        tenant_id: TenantId,
        grant_id: PermissionGrantId,
    ) -> AppResult<Option<PermissionGrant>> {
        Ok(self
            .state
            .lock()
            .await
            .grants
            .iter()
            .find(|(stored_tenant_id, grant)| {
                *stored_tenant_id == tenant_id && grant.id == grant_id
            })
            .map(|(_, grant)| grant.clone()))
    }

    async fn begin(&self, tenant_id: TenantId) -> AppResult<Box<dyn TicketTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(FakeTicketTransaction {
            tenant_id,
            guard: Some(guard),
            staged,
            fail_attach_hosts: self.fail_attach_hosts,
        }))
    }
}

#[async_trait]
impl AssetDirectory for FakeTicketRepository {
    async fn find_hosts_by_ips(&self, tenant_id: TenantId, ips: &[IpAddr]) -> AppResult<Vec<Host>> {
        Ok(self.state.lock().await.hosts_by_ips(tenant_id, ips))
    }

    async fn find_account_by_name(
        &self,
        tenant_id: TenantId,
        username: &str,
    ) -> AppResult<Option<SystemAccount>> {
        Ok(self.state.lock().await.account_by_name(tenant_id, username))
    }
}

struct FakeTicketTransaction {
    tenant_id: TenantId,
    guard: Option<OwnedMutexGuard<FakeState>>,
    staged: FakeState,
    fail_attach_hosts: bool,
}

#[async_trait]
impl TicketTransaction for FakeTicketTransaction {
    async fn lock_ticket(&mut self, ticket_id: TicketId) -> AppResult<Option<Ticket>> {
        Ok(self
            .staged
            .tickets
            .get(&ticket_id)
            .filter(|(stored_tenant_id, _)| *stored_tenant_id == self.tenant_id)
            .map(|(_, ticket)| ticket.clone()))
    }

    async fn find_hosts_by_ips(&mut self, ips: &[IpAddr]) -> AppResult<Vec<Host>> {
        Ok(self.staged.hosts_by_ips(self.tenant_id, ips))
    }

    async fn find_account_by_name(&mut self, username: &str) -> AppResult<Option<SystemAccount>> {
        Ok(self.staged.account_by_name(self.tenant_id, username))
    }

    async fn save_ticket(&mut self, ticket: &Ticket) -> AppResult<()> {
        self.staged
            .tickets
            .insert(ticket.id(), (self.tenant_id, ticket.clone()));
        Ok(())
    }

    async fn create_grant(&mut self, grant: NewPermissionGrant) -> AppResult<PermissionGrant> {
        let grant = PermissionGrant::from_new(PermissionGrantId::new(), grant, Utc::now());
        self.staged.grants.push((self.tenant_id, grant.clone()));
        Ok(grant)
    }

    async fn attach_hosts(&mut self, grant_id: PermissionGrantId, hosts: &[Host]) -> AppResult<()> {
        if self.fail_attach_hosts {
            return Err(AppError::Internal("host relation insert failed".to_owned()));
        }

        self.staged
            .grant_mut(grant_id)?
            .host_ids
            .extend(hosts.iter().map(Host::id));
        Ok(())
    }

    async fn attach_account(
        &mut self,
        grant_id: PermissionGrantId,
        account: &SystemAccount,
    ) -> AppResult<()> {
        self.staged.grant_mut(grant_id)?.account_ids.push(account.id());
        Ok(())
    }

    async fn commit(&mut self) -> AppResult<()> {
        let mut guard = self
            .guard
            .take()
            .ok_or_else(|| AppError::Internal("transaction already finished".to_owned()))?;
        *guard = std::mem::take(&mut self.staged);
        Ok(())
    }
}

#[derive(Default)]
struct FakeAuditRepository {
    events: Mutex<Vec<AuditEvent>>,
    fail_on: Option<AuditAction>,
}

impl FakeAuditRepository {
    async fn actions(&self) -> Vec<AuditAction> {
        self.events
            .lock()
            .await
            .iter()
            .map(|event| event.action)
            .collect()
    }
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        if self.fail_on == Some(event.action) {
            return Err(AppError::Internal("audit store unavailable".to_owned()));
        }

        self.events.lock().await.push(event);
        Ok(())
    }
}

struct Harness {
    service: TicketService,
    repository: Arc<FakeTicketRepository>,
    audit: Arc<FakeAuditRepository>,
    tenant_id: TenantId,
}

fn harness_with(repository: FakeTicketRepository) -> Harness {
    harness_with_audit(repository, FakeAuditRepository::default())
}

fn harness_with_audit(repository: FakeTicketRepository, audit: FakeAuditRepository) -> Harness {
    let repository = Arc::new(repository);
    let audit = Arc::new(audit);
    let service = TicketService::new(repository.clone(), repository.clone(), audit.clone());

    Harness {
        service,
        repository,
        audit,
        tenant_id: TenantId::new(),
    }
}

fn harness() -> Harness {
    harness_with(FakeTicketRepository::default())
}

impl Harness {
    fn principal(&self, subject: &str) -> Principal {
        Principal::new(subject, subject, self.tenant_id)
    }

    async fn seed_inventory(&self) -> (Vec<Host>, SystemAccount) {
        let first = self.repository.seed_host(self.tenant_id, "10.0.0.1").await;
        let second = self.repository.seed_host(self.tenant_id, "10.0.0.2").await;
        let account = self.repository.seed_account(self.tenant_id, "root").await;
        (vec![first, second], account)
    }

    async fn submit_grant(&self, request: GrantPermissionRequest) -> Ticket {
        self.service
            .submit_grant_permission_request(
                &self.principal("alice"),
                SubmitGrantPermissionRequestInput {
                    title: "db access".to_owned(),
                    assignees: vec![
                        TicketParticipant::new("bob", "Bob"),
                        TicketParticipant::new("carol", "Carol"),
                    ],
                    request,
                },
            )
            .await
            .unwrap_or_else(|_| unreachable!())
    }
}

fn ip(value: &str) -> IpAddr {
    value.parse().unwrap_or_else(|_| unreachable!())
}

fn grant_request() -> GrantPermissionRequest {
    GrantPermissionRequest {
        name: "db-readers".to_owned(),
        ips: vec![ip("10.0.0.1"), ip("10.0.0.2")],
        system_user: Some("root".to_owned()),
        date_start: None,
        date_expired: None,
    }
}

#[tokio::test]
async fn first_approval_materializes_grant_with_resolved_targets() {
    let harness = harness();
    let (hosts, account) = harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;

    let outcome = harness
        .service
        .approve(&harness.principal("bob"), ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(outcome.ticket.action(), Some(TicketAction::Approve));
    assert_eq!(
        outcome.ticket.assignee().map(|assignee| assignee.subject.as_str()),
        Some("bob")
    );
    let grant = outcome.grant.unwrap_or_else(|| unreachable!());
    assert_eq!(grant.name, "db-readers");
    assert_eq!(grant.created_by, "bob");
    assert_eq!(grant.account_ids, vec![account.id()]);
    let mut expected_hosts: Vec<HostId> = hosts.iter().map(Host::id).collect();
    let mut granted_hosts = grant.host_ids.clone();
    expected_hosts.sort();
    granted_hosts.sort();
    assert_eq!(granted_hosts, expected_hosts);

    let stored = harness.repository.grants().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0], grant);

    assert_eq!(
        harness.audit.actions().await,
        vec![
            AuditAction::TicketSubmitted,
            AuditAction::TicketApproved,
            AuditAction::PermissionGrantCreated,
        ]
    );
}

#[tokio::test]
async fn absent_dates_take_store_defaults() {
    let harness = harness();
    harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;

    let before = Utc::now();
    let grant = harness
        .service
        .approve(&harness.principal("bob"), ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!())
        .grant
        .unwrap_or_else(|| unreachable!());

    assert!(grant.valid_from >= before);
    assert_eq!(grant.valid_until, default_valid_until(grant.created_at));
}

#[tokio::test]
async fn explicit_dates_are_copied_to_grant() {
    let harness = harness();
    harness.seed_inventory().await;
    let start = Utc::now() + Duration::days(1);
    let expired = start + Duration::days(30);
    let ticket = harness
        .submit_grant(GrantPermissionRequest {
            date_start: Some(start),
            date_expired: Some(expired),
            ..grant_request()
        })
        .await;

    let grant = harness
        .service
        .approve(&harness.principal("bob"), ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!())
        .grant
        .unwrap_or_else(|| unreachable!());

    assert_eq!(grant.valid_from, start);
    assert_eq!(grant.valid_until, expired);
}

#[tokio::test]
async fn approving_twice_is_rejected_without_second_grant() {
    let harness = harness();
    harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;
    let bob = harness.principal("bob");

    assert!(harness.service.approve(&bob, ticket.id()).await.is_ok());
    let second = harness.service.approve(&bob, ticket.id()).await;

    assert!(matches!(
        second,
        Err(AppError::Rejected(Rejection::TicketActionAlreadySet))
    ));
    assert_eq!(harness.repository.grants().await.len(), 1);
}

#[tokio::test]
async fn closed_ticket_refuses_actions() {
    let harness = harness();
    harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;

    let closed = harness
        .service
        .close_ticket(&harness.principal("alice"), ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(closed.status(), TicketStatus::Closed);

    let approve = harness
        .service
        .approve(&harness.principal("bob"), ticket.id())
        .await;
    let reject = harness
        .service
        .reject(&harness.principal("bob"), ticket.id())
        .await;

    assert!(matches!(
        approve,
        Err(AppError::Rejected(Rejection::TicketClosed))
    ));
    assert!(matches!(
        reject,
        Err(AppError::Rejected(Rejection::TicketClosed))
    ));
    assert!(harness.repository.grants().await.is_empty());
}

#[tokio::test]
async fn closing_twice_is_rejected() {
    let harness = harness();
    let ticket = harness.submit_grant(grant_request()).await;
    let bob = harness.principal("bob");

    assert!(harness.service.close_ticket(&bob, ticket.id()).await.is_ok());
    let second = harness.service.close_ticket(&bob, ticket.id()).await;

    assert!(matches!(
        second,
        Err(AppError::Rejected(Rejection::TicketClosed))
    ));
}

#[tokio::test]
async fn ip_count_mismatch_rejects_and_leaves_ticket_unchanged() {
    let harness = harness();
    harness.repository.seed_host(harness.tenant_id, "10.0.0.1").await;
    harness.repository.seed_account(harness.tenant_id, "root").await;
    let ticket = harness.submit_grant(grant_request()).await;

    let result = harness
        .service
        .approve(&harness.principal("bob"), ticket.id())
        .await;

    assert!(matches!(
        result,
        Err(AppError::Rejected(Rejection::AssetsIpsNotMatch))
    ));
    let stored = harness
        .service
        .get_ticket(&harness.principal("alice"), ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(stored.action(), None);
    assert!(harness.repository.grants().await.is_empty());
}

#[tokio::test]
async fn unknown_system_user_rejects() {
    let harness = harness();
    harness.repository.seed_host(harness.tenant_id, "10.0.0.1").await;
    harness.repository.seed_host(harness.tenant_id, "10.0.0.2").await;
    let ticket = harness.submit_grant(grant_request()).await;

    let result = harness
        .service
        .approve(&harness.principal("bob"), ticket.id())
        .await;

    assert!(matches!(
        result,
        Err(AppError::Rejected(Rejection::SystemUserNotFound))
    ));
    assert!(harness.repository.grants().await.is_empty());
}

#[tokio::test]
async fn missing_system_user_field_rejects() {
    let harness = harness();
    harness.seed_inventory().await;
    let ticket = harness
        .submit_grant(GrantPermissionRequest {
            system_user: None,
            ..grant_request()
        })
        .await;

    let result = harness
        .service
        .approve(&harness.principal("bob"), ticket.id())
        .await;

    assert!(matches!(
        result,
        Err(AppError::Rejected(Rejection::SystemUserNotFound))
    ));
}

#[tokio::test]
async fn failed_relation_write_rolls_back_decision_and_grant() {
    let harness = harness_with(FakeTicketRepository {
        fail_attach_hosts: true,
        ..FakeTicketRepository::default()
    });
    harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;

    let result = harness
        .service
        .approve(&harness.principal("bob"), ticket.id())
        .await;

    assert!(matches!(result, Err(AppError::Internal(_))));
    let stored = harness
        .service
        .get_ticket(&harness.principal("bob"), ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(stored.action(), None);
    assert!(stored.assignee().is_none());
    assert!(harness.repository.grants().await.is_empty());
    assert_eq!(
        harness.audit.actions().await,
        vec![AuditAction::TicketSubmitted]
    );
}

#[tokio::test]
async fn concurrent_approvals_create_exactly_one_grant() {
    let harness = harness();
    harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;
    let bob = harness.principal("bob");
    let carol = harness.principal("carol");

    let (first, second) = tokio::join!(
        harness.service.approve(&bob, ticket.id()),
        harness.service.approve(&carol, ticket.id())
    );

    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|succeeded| **succeeded)
        .count();
    assert_eq!(successes, 1);
    let failure = if first.is_err() { first } else { second };
    assert!(matches!(
        failure,
        Err(AppError::Rejected(Rejection::TicketActionAlreadySet))
    ));
    assert_eq!(harness.repository.grants().await.len(), 1);
}

#[tokio::test]
async fn reject_then_approve_does_not_materialize() {
    let harness = harness();
    harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;
    let bob = harness.principal("bob");

    let rejected = harness
        .service
        .reject(&bob, ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(rejected.ticket.action(), Some(TicketAction::Reject));
    assert!(rejected.grant.is_none());

    let approved = harness
        .service
        .approve(&bob, ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(approved.ticket.action(), Some(TicketAction::Approve));
    assert!(approved.grant.is_none());
    assert!(harness.repository.grants().await.is_empty());
}

#[tokio::test]
async fn reject_after_approve_keeps_grant() {
    let harness = harness();
    harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;
    let bob = harness.principal("bob");

    assert!(harness.service.approve(&bob, ticket.id()).await.is_ok());
    let rejected = harness
        .service
        .reject(&bob, ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(rejected.ticket.action(), Some(TicketAction::Reject));
    assert_eq!(harness.repository.grants().await.len(), 1);
}

#[tokio::test]
async fn non_assignee_cannot_decide() {
    let harness = harness();
    harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;

    let result = harness
        .service
        .approve(&harness.principal("alice"), ticket.id())
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert!(harness.repository.grants().await.is_empty());
}

#[tokio::test]
async fn custom_authorizer_replaces_assignee_policy() {
    struct RequesterMayAct;

    impl TicketActionAuthorizer for RequesterMayAct {
        fn can_act(&self, ticket: &Ticket, principal: &Principal) -> bool {
            ticket.is_requester(principal.subject())
        }
    }

    let mut harness = harness();
    harness.service = harness
        .service
        .clone()
        .with_action_authorizer(Arc::new(RequesterMayAct));
    harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;

    assert!(
        harness
            .service
            .approve(&harness.principal("alice"), ticket.id())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn close_requires_requester_or_authorized_reviewer() {
    struct OnlyCarolMayAct;

    impl TicketActionAuthorizer for OnlyCarolMayAct {
        fn can_act(&self, _ticket: &Ticket, principal: &Principal) -> bool {
            principal.subject() == "carol"
        }
    }

    let mut harness = harness();
    harness.service = harness
        .service
        .clone()
        .with_action_authorizer(Arc::new(OnlyCarolMayAct));
    let reviewed = harness.submit_grant(grant_request()).await;
    let own = harness.submit_grant(grant_request()).await;

    let denied = harness
        .service
        .close_ticket(&harness.principal("bob"), reviewed.id())
        .await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
    let still_open = harness
        .service
        .get_ticket(&harness.principal("alice"), reviewed.id())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(still_open.status(), TicketStatus::Open);

    let by_reviewer = harness
        .service
        .close_ticket(&harness.principal("carol"), reviewed.id())
        .await
        .unwrap_or_else(|_| unreachable!());
    let by_requester = harness
        .service
        .close_ticket(&harness.principal("alice"), own.id())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(by_reviewer.status(), TicketStatus::Closed);
    assert_eq!(by_requester.status(), TicketStatus::Closed);
}

#[tokio::test]
async fn committed_approval_survives_audit_failure() {
    let harness = harness_with_audit(
        FakeTicketRepository::default(),
        FakeAuditRepository {
            fail_on: Some(AuditAction::TicketApproved),
            ..FakeAuditRepository::default()
        },
    );
    harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;
    let bob = harness.principal("bob");

    let outcome = harness.service.approve(&bob, ticket.id()).await;

    assert!(outcome.is_ok());
    let outcome = outcome.unwrap_or_else(|_| unreachable!());
    assert_eq!(outcome.ticket.action(), Some(TicketAction::Approve));
    let grant = outcome.grant.unwrap_or_else(|| unreachable!());
    assert_eq!(harness.repository.grants().await, vec![grant]);
    assert_eq!(
        harness.audit.actions().await,
        vec![
            AuditAction::TicketSubmitted,
            AuditAction::PermissionGrantCreated,
        ]
    );

    let repeated = harness.service.approve(&bob, ticket.id()).await;
    assert!(matches!(
        repeated,
        Err(AppError::Rejected(Rejection::TicketActionAlreadySet))
    ));
}

#[tokio::test]
async fn approving_asset_access_request_creates_no_grant() {
    let harness = harness();
    harness.seed_inventory().await;
    let ticket = harness
        .service
        .submit_asset_access_request(
            &harness.principal("alice"),
            SubmitAssetAccessRequestInput {
                title: "jump host".to_owned(),
                assignees: vec![TicketParticipant::new("bob", "Bob")],
                ips: vec![ip("10.0.0.9")],
                host_name: Some("jump".to_owned()),
                date_start: None,
                date_expired: None,
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    let outcome = harness
        .service
        .approve(&harness.principal("bob"), ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(outcome.ticket.action(), Some(TicketAction::Approve));
    assert!(outcome.grant.is_none());
    assert!(harness.repository.grants().await.is_empty());
}

#[tokio::test]
async fn update_driven_approval_matches_dedicated_approval() {
    let dedicated = harness();
    dedicated.seed_inventory().await;
    let dedicated_ticket = dedicated.submit_grant(grant_request()).await;
    let dedicated_outcome = dedicated
        .service
        .approve(&dedicated.principal("bob"), dedicated_ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!());

    let updated = harness();
    updated.seed_inventory().await;
    let updated_ticket = updated.submit_grant(grant_request()).await;
    let updated_outcome = updated
        .service
        .update_ticket(
            &updated.principal("bob"),
            updated_ticket.id(),
            TicketUpdateInput {
                action: Some(TicketAction::Approve),
                ..TicketUpdateInput::default()
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(
        updated_outcome.ticket.action(),
        dedicated_outcome.ticket.action()
    );
    let dedicated_grant = dedicated_outcome.grant.unwrap_or_else(|| unreachable!());
    let updated_grant = updated_outcome.grant.unwrap_or_else(|| unreachable!());
    assert_eq!(updated_grant.name, dedicated_grant.name);
    assert_eq!(updated_grant.created_by, dedicated_grant.created_by);
    assert_eq!(updated_grant.host_ids.len(), dedicated_grant.host_ids.len());
    assert_eq!(updated_grant.account_ids.len(), 1);
}

#[tokio::test]
async fn update_driven_approval_on_closed_ticket_is_rejected() {
    let harness = harness();
    harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;
    let bob = harness.principal("bob");
    assert!(harness.service.close_ticket(&bob, ticket.id()).await.is_ok());

    let result = harness
        .service
        .update_ticket(
            &bob,
            ticket.id(),
            TicketUpdateInput {
                action: Some(TicketAction::Approve),
                ..TicketUpdateInput::default()
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(AppError::Rejected(Rejection::TicketClosed))
    ));
    assert!(harness.repository.grants().await.is_empty());
}

#[tokio::test]
async fn update_resolves_patched_meta_before_approving() {
    let harness = harness();
    harness.seed_inventory().await;
    let ticket = harness
        .submit_grant(GrantPermissionRequest {
            ips: vec![ip("10.0.0.1"), ip("10.0.0.99")],
            ..grant_request()
        })
        .await;

    let outcome = harness
        .service
        .update_ticket(
            &harness.principal("bob"),
            ticket.id(),
            TicketUpdateInput {
                meta: Some(TicketMetaPatch::GrantPermission(GrantPermissionPatch {
                    ips: Some(vec![ip("10.0.0.1")]),
                    ..GrantPermissionPatch::default()
                })),
                action: Some(TicketAction::Approve),
                ..TicketUpdateInput::default()
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    let grant = outcome.grant.unwrap_or_else(|| unreachable!());
    assert_eq!(grant.host_ids.len(), 1);
}

#[tokio::test]
async fn requester_update_cannot_set_confirmations() {
    let harness = harness();
    let ticket = harness
        .service
        .submit_asset_access_request(
            &harness.principal("alice"),
            SubmitAssetAccessRequestInput {
                title: "jump host".to_owned(),
                assignees: vec![TicketParticipant::new("bob", "Bob")],
                ips: vec![ip("10.0.0.9")],
                host_name: None,
                date_start: None,
                date_expired: None,
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    let patch = |host_name: &str| TicketUpdateInput {
        meta: Some(TicketMetaPatch::AssetAccess(AssetAccessPatch {
            host_name: Some(host_name.to_owned()),
            confirmed_assets: Some(vec![HostId::new()]),
            ..AssetAccessPatch::default()
        })),
        ..TicketUpdateInput::default()
    };

    let by_requester = harness
        .service
        .update_ticket(&harness.principal("alice"), ticket.id(), patch("jump-a"))
        .await
        .unwrap_or_else(|_| unreachable!());
    let by_assignee = harness
        .service
        .update_ticket(&harness.principal("bob"), ticket.id(), patch("jump-b"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let Some(request_view) = asset_request(&by_requester.ticket) else {
        unreachable!()
    };
    assert_eq!(request_view.0.as_deref(), Some("jump-a"));
    assert!(request_view.1.is_empty());

    let Some(assignee_view) = asset_request(&by_assignee.ticket) else {
        unreachable!()
    };
    assert_eq!(assignee_view.0.as_deref(), Some("jump-b"));
    assert_eq!(assignee_view.1.len(), 1);
}

fn asset_request(ticket: &Ticket) -> Option<(Option<String>, Vec<HostId>)> {
    match ticket.meta() {
        warden_domain::TicketMeta::AssetAccess(request) => Some((
            request.host_name.clone(),
            request.confirmed_assets.clone(),
        )),
        warden_domain::TicketMeta::GrantPermission(_) => None,
    }
}

#[tokio::test]
async fn empty_update_is_invalid() {
    let harness = harness();
    let ticket = harness.submit_grant(grant_request()).await;

    let result = harness
        .service
        .update_ticket(
            &harness.principal("bob"),
            ticket.id(),
            TicketUpdateInput::default(),
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn outsiders_cannot_read_or_update() {
    let harness = harness();
    let ticket = harness.submit_grant(grant_request()).await;
    let mallory = harness.principal("mallory");

    let read = harness.service.get_ticket(&mallory, ticket.id()).await;
    let update = harness
        .service
        .update_ticket(
            &mallory,
            ticket.id(),
            TicketUpdateInput {
                title: Some("mine".to_owned()),
                ..TicketUpdateInput::default()
            },
        )
        .await;

    assert!(matches!(read, Err(AppError::Forbidden(_))));
    assert!(matches!(update, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn unknown_ticket_is_not_found() {
    let harness = harness();

    let result = harness
        .service
        .approve(&harness.principal("bob"), TicketId::new())
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn list_is_scoped_to_participants_and_filters() {
    let harness = harness();
    harness.seed_inventory().await;
    let first = harness.submit_grant(grant_request()).await;
    harness.submit_grant(grant_request()).await;
    assert!(
        harness
            .service
            .approve(&harness.principal("bob"), first.id())
            .await
            .is_ok()
    );

    let for_bob = harness
        .service
        .list_tickets(&harness.principal("bob"), TicketListQuery::default())
        .await
        .unwrap_or_else(|_| unreachable!());
    let approved = harness
        .service
        .list_tickets(
            &harness.principal("alice"),
            TicketListQuery {
                action: Some(TicketAction::Approve),
                ..TicketListQuery::default()
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    let for_outsider = harness
        .service
        .list_tickets(&harness.principal("mallory"), TicketListQuery::default())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(for_bob.len(), 2);
    assert_eq!(approved.len(), 1);
    assert!(for_outsider.is_empty());
}

#[tokio::test]
async fn preview_is_limited_to_assignees() {
    let harness = harness();
    harness.repository.seed_host(harness.tenant_id, "10.0.0.1").await;
    let ticket = harness.submit_grant(grant_request()).await;

    let for_assignee = harness
        .service
        .preview_grant_resolution(&harness.principal("bob"), ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    let for_requester = harness
        .service
        .preview_grant_resolution(&harness.principal("alice"), ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(for_assignee.hosts.len(), 1);
    assert!(!for_assignee.system_user_exists);
    assert!(for_requester.is_none());
}

#[tokio::test]
async fn submit_rejects_ticket_without_assignees() {
    let harness = harness();

    let result = harness
        .service
        .submit_grant_permission_request(
            &harness.principal("alice"),
            SubmitGrantPermissionRequestInput {
                title: "db access".to_owned(),
                assignees: Vec::new(),
                request: grant_request(),
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn grant_is_readable_by_its_approver_only() {
    let harness = harness();
    harness.seed_inventory().await;
    let ticket = harness.submit_grant(grant_request()).await;
    let grant = harness
        .service
        .approve(&harness.principal("bob"), ticket.id())
        .await
        .unwrap_or_else(|_| unreachable!())
        .grant
        .unwrap_or_else(|| unreachable!());

    let by_approver = harness
        .service
        .get_grant(&harness.principal("bob"), grant.id)
        .await;
    let by_other = harness
        .service
        .get_grant(&harness.principal("carol"), grant.id)
        .await;
    let missing = harness
        .service
        .get_grant(&harness.principal("bob"), PermissionGrantId::new())
        .await;

    assert_eq!(by_approver.ok(), Some(grant));
    assert!(matches!(by_other, Err(AppError::Forbidden(_))));
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}
