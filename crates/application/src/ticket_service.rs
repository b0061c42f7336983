use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use warden_core::{AppError, AppResult, Principal};
use warden_domain::{
    AuditAction, PermissionGrant, ResolvedGrantTargets, Ticket, TicketAction, TicketId,
    TicketParticipant,
};

use crate::ticket_ports::{
    AssigneeAuthorizer, AssetDirectory, AuditEvent, AuditRepository, GrantResolutionPreview,
    SubmitAssetAccessRequestInput, SubmitGrantPermissionRequestInput, TicketActionAuthorizer,
    TicketActionOutcome, TicketListQuery, TicketRepository, TicketTransaction, TicketUpdateInput,
};

mod decisions;
mod queries;
mod submit;
mod updates;

/// Ticket workflow service: submission, review decisions and grant materialization.
#[derive(Clone)]
pub struct TicketService {
    repository: Arc<dyn TicketRepository>,
    asset_directory: Arc<dyn AssetDirectory>,
    audit_repository: Arc<dyn AuditRepository>,
    action_authorizer: Arc<dyn TicketActionAuthorizer>,
}

impl TicketService {
    /// Creates a ticket service where only assignees may act on tickets.
    #[must_use]
    pub fn new(
        repository: Arc<dyn TicketRepository>,
        asset_directory: Arc<dyn AssetDirectory>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            asset_directory,
            audit_repository,
            action_authorizer: Arc::new(AssigneeAuthorizer),
        }
    }

    /// Replaces the policy deciding who may approve or reject.
    #[must_use]
    pub fn with_action_authorizer(
        mut self,
        action_authorizer: Arc<dyn TicketActionAuthorizer>,
    ) -> Self {
        self.action_authorizer = action_authorizer;
        self
    }

    fn require_can_act(&self, ticket: &Ticket, actor: &Principal) -> AppResult<()> {
        if self.action_authorizer.can_act(ticket, actor) {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "subject '{}' is not an assignee of ticket '{}'",
            actor.subject(),
            ticket.id()
        )))
    }

    fn require_participant(ticket: &Ticket, actor: &Principal) -> AppResult<()> {
        if ticket.is_participant(actor.subject()) {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "subject '{}' is neither requester nor assignee of ticket '{}'",
            actor.subject(),
            ticket.id()
        )))
    }

    async fn lock_ticket(
        transaction: &mut dyn TicketTransaction,
        actor: &Principal,
        ticket_id: TicketId,
    ) -> AppResult<Ticket> {
        transaction.lock_ticket(ticket_id).await?.ok_or_else(|| {
            AppError::NotFound(format!(
                "ticket '{ticket_id}' does not exist for tenant '{}'",
                actor.tenant_id()
            ))
        })
    }

    /// Appends an audit event for a mutation that is already committed.
    ///
    /// The mutation stands even if the audit store fails, so the failure is
    /// logged instead of returned to the caller.
    async fn append_audit(
        &self,
        actor: &Principal,
        action: AuditAction,
        resource_type: &str,
        resource_id: String,
        detail: Option<String>,
    ) {
        let result = self
            .audit_repository
            .append_event(AuditEvent {
                tenant_id: actor.tenant_id(),
                subject: actor.subject().to_owned(),
                action,
                resource_type: resource_type.to_owned(),
                resource_id: resource_id.clone(),
                detail,
            })
            .await;

        if let Err(audit_error) = result {
            error!(
                tenant_id = %actor.tenant_id(),
                subject = actor.subject(),
                action = action.as_str(),
                resource_type,
                resource_id = resource_id.as_str(),
                error = %audit_error,
                "failed to append audit event for committed change"
            );
        }
    }

    async fn append_decision_audit(
        &self,
        actor: &Principal,
        ticket: &Ticket,
        action: TicketAction,
        grant: Option<&PermissionGrant>,
    ) {
        let audit_action = match action {
            TicketAction::Approve => AuditAction::TicketApproved,
            TicketAction::Reject => AuditAction::TicketRejected,
        };
        self.append_audit(
            actor,
            audit_action,
            "ticket",
            ticket.id().to_string(),
            Some(format!("{} ticket '{}'", ticket.kind().as_str(), ticket.title())),
        )
        .await;

        if let Some(grant) = grant {
            self.append_audit(
                actor,
                AuditAction::PermissionGrantCreated,
                "permission_grant",
                grant.id.to_string(),
                Some(format!(
                    "materialized from ticket '{}' with {} host(s) and {} account(s)",
                    ticket.id(),
                    grant.host_ids.len(),
                    grant.account_ids.len()
                )),
            )
            .await;
        }
    }
}

fn participant(actor: &Principal) -> TicketParticipant {
    TicketParticipant::new(actor.subject(), actor.display_name())
}

fn log_rejection(actor: &Principal, ticket_id: TicketId, operation: &str, error: &AppError) {
    if let Some(rejection) = error.rejection() {
        warn!(
            tenant_id = %actor.tenant_id(),
            %ticket_id,
            subject = actor.subject(),
            operation,
            rejection = rejection.code(),
            "ticket operation rejected"
        );
    }
}

#[cfg(test)]
mod tests;
