use warden_domain::TicketPatch;

use super::decisions::decide_locked;
use super::*;

impl TicketService {
    /// Applies a general update to a ticket.
    ///
    /// Title and metadata changes are open to participants. An `action` in
    /// the update is held to the same guards as [`TicketService::perform_action`]
    /// and materializes the grant on a first approval. Confirmation fields of
    /// asset-access metadata are only taken from assignees.
    pub async fn update_ticket(
        &self,
        actor: &Principal,
        ticket_id: TicketId,
        input: TicketUpdateInput,
    ) -> AppResult<TicketActionOutcome> {
        if input.title.is_none() && input.meta.is_none() && input.action.is_none() {
            return Err(AppError::Validation(
                "ticket update must change title, meta or action".to_owned(),
            ));
        }

        let result = self.update_ticket_inner(actor, ticket_id, input).await;
        if let Err(error) = &result {
            log_rejection(actor, ticket_id, "update", error);
        }

        result
    }

    async fn update_ticket_inner(
        &self,
        actor: &Principal,
        ticket_id: TicketId,
        input: TicketUpdateInput,
    ) -> AppResult<TicketActionOutcome> {
        let now = Utc::now();
        let mut transaction = self.repository.begin(actor.tenant_id()).await?;
        let mut ticket = Self::lock_ticket(transaction.as_mut(), actor, ticket_id).await?;
        Self::require_participant(&ticket, actor)?;
        if input.action.is_some() {
            self.require_can_act(&ticket, actor)?;
        }

        let has_patch = input.title.is_some() || input.meta.is_some();
        if has_patch {
            let include_confirmations = ticket.is_assignee(actor.subject());
            ticket.apply_patch(
                TicketPatch {
                    title: input.title,
                    meta: input.meta,
                },
                include_confirmations,
                now,
            )?;
        }

        let grant = match input.action {
            Some(action) => {
                decide_locked(transaction.as_mut(), actor, &mut ticket, action, now).await?
            }
            None => {
                transaction.save_ticket(&ticket).await?;
                None
            }
        };
        transaction.commit().await?;

        if has_patch {
            self.append_audit(
                actor,
                AuditAction::TicketUpdated,
                "ticket",
                ticket.id().to_string(),
                None,
            )
            .await;
        }
        if let Some(action) = input.action {
            self.append_decision_audit(actor, &ticket, action, grant.as_ref())
                .await;
        }

        info!(
            tenant_id = %actor.tenant_id(),
            %ticket_id,
            subject = actor.subject(),
            action = input.action.map(|action| action.as_str()),
            "ticket updated"
        );

        Ok(TicketActionOutcome { ticket, grant })
    }
}
