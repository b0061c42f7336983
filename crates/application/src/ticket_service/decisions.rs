use chrono::DateTime;

use super::*;

impl TicketService {
    /// Approves a ticket. The first approval of a grant-permission request
    /// creates the permission grant in the same transaction.
    pub async fn approve(
        &self,
        actor: &Principal,
        ticket_id: TicketId,
    ) -> AppResult<TicketActionOutcome> {
        self.perform_action(actor, ticket_id, TicketAction::Approve)
            .await
    }

    /// Rejects a ticket.
    pub async fn reject(
        &self,
        actor: &Principal,
        ticket_id: TicketId,
    ) -> AppResult<TicketActionOutcome> {
        self.perform_action(actor, ticket_id, TicketAction::Reject)
            .await
    }

    /// Records a review decision on a ticket.
    pub async fn perform_action(
        &self,
        actor: &Principal,
        ticket_id: TicketId,
        action: TicketAction,
    ) -> AppResult<TicketActionOutcome> {
        let result = self.perform_action_inner(actor, ticket_id, action).await;
        if let Err(error) = &result {
            log_rejection(actor, ticket_id, action.as_str(), error);
        }

        result
    }

    async fn perform_action_inner(
        &self,
        actor: &Principal,
        ticket_id: TicketId,
        action: TicketAction,
    ) -> AppResult<TicketActionOutcome> {
        let mut transaction = self.repository.begin(actor.tenant_id()).await?;
        let mut ticket = Self::lock_ticket(transaction.as_mut(), actor, ticket_id).await?;
        self.require_can_act(&ticket, actor)?;

        let grant =
            decide_locked(transaction.as_mut(), actor, &mut ticket, action, Utc::now()).await?;
        transaction.commit().await?;

        self.append_decision_audit(actor, &ticket, action, grant.as_ref())
            .await;

        let grant_id = grant.as_ref().map(|grant| grant.id.to_string());
        info!(
            tenant_id = %actor.tenant_id(),
            %ticket_id,
            subject = actor.subject(),
            action = action.as_str(),
            grant_id = grant_id.as_deref(),
            "ticket action recorded"
        );

        Ok(TicketActionOutcome { ticket, grant })
    }

    /// Closes a ticket. The requester may always close; anyone else needs
    /// the action authorizer's approval.
    pub async fn close_ticket(&self, actor: &Principal, ticket_id: TicketId) -> AppResult<Ticket> {
        let result = self.close_ticket_inner(actor, ticket_id).await;
        if let Err(error) = &result {
            log_rejection(actor, ticket_id, "close", error);
        }

        result
    }

    async fn close_ticket_inner(&self, actor: &Principal, ticket_id: TicketId) -> AppResult<Ticket> {
        let mut transaction = self.repository.begin(actor.tenant_id()).await?;
        let mut ticket = Self::lock_ticket(transaction.as_mut(), actor, ticket_id).await?;
        if !ticket.is_requester(actor.subject()) {
            self.require_can_act(&ticket, actor)?;
        }

        ticket.close(Utc::now())?;
        transaction.save_ticket(&ticket).await?;
        transaction.commit().await?;

        self.append_audit(
            actor,
            AuditAction::TicketClosed,
            "ticket",
            ticket.id().to_string(),
            None,
        )
        .await;

        info!(
            tenant_id = %actor.tenant_id(),
            %ticket_id,
            subject = actor.subject(),
            "ticket closed"
        );

        Ok(ticket)
    }
}

/// Records `action` on a ticket locked by `transaction`.
///
/// Guards run against the locked row. Host and account lookups for a first
/// approval happen before any write so a failed lookup leaves nothing staged.
pub(super) async fn decide_locked(
    transaction: &mut dyn TicketTransaction,
    actor: &Principal,
    ticket: &mut Ticket,
    action: TicketAction,
    now: DateTime<Utc>,
) -> AppResult<Option<PermissionGrant>> {
    ticket.ensure_can_set_action(action)?;

    let pending_grant = match (action, ticket.action(), ticket.meta().as_grant_permission()) {
        (TicketAction::Approve, None, Some(request)) => {
            let hosts = transaction.find_hosts_by_ips(request.ips.as_slice()).await?;
            let account = match request.system_user.as_deref() {
                Some(username) => transaction.find_account_by_name(username).await?,
                None => None,
            };
            let targets = ResolvedGrantTargets::resolve(request, hosts, account)?;
            let new_grant = ResolvedGrantTargets::new_grant(request, actor.subject());
            Some((targets, new_grant))
        }
        _ => None,
    };

    let transition = ticket.apply_action(action, participant(actor), now)?;
    transaction.save_ticket(ticket).await?;

    let Some((targets, new_grant)) = pending_grant else {
        return Ok(None);
    };
    if !transition.is_first_approval() {
        return Ok(None);
    }

    let mut grant = transaction.create_grant(new_grant).await?;
    transaction
        .attach_account(grant.id, targets.account())
        .await?;
    transaction.attach_hosts(grant.id, targets.hosts()).await?;

    grant.account_ids.push(targets.account().id());
    grant
        .host_ids
        .extend(targets.hosts().iter().map(|host| host.id()));

    Ok(Some(grant))
}
