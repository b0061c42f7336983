use warden_domain::PermissionGrantId;

use super::*;

impl TicketService {
    /// Returns one ticket visible to its requester and assignees.
    pub async fn get_ticket(&self, actor: &Principal, ticket_id: TicketId) -> AppResult<Ticket> {
        let ticket = self
            .repository
            .find_ticket(actor.tenant_id(), ticket_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "ticket '{ticket_id}' does not exist for tenant '{}'",
                    actor.tenant_id()
                ))
            })?;

        Self::require_participant(&ticket, actor)?;
        Ok(ticket)
    }

    /// Lists tickets the caller submitted or reviews, newest first.
    pub async fn list_tickets(
        &self,
        actor: &Principal,
        query: TicketListQuery,
    ) -> AppResult<Vec<Ticket>> {
        self.repository
            .list_tickets_for_subject(actor.tenant_id(), actor.subject(), query)
            .await
    }

    /// Previews how a grant request resolves against the current inventory.
    ///
    /// Returns `None` for callers that may not act on the ticket.
    pub async fn preview_grant_resolution(
        &self,
        actor: &Principal,
        ticket_id: TicketId,
    ) -> AppResult<Option<GrantResolutionPreview>> {
        let ticket = self.get_ticket(actor, ticket_id).await?;
        if !self.action_authorizer.can_act(&ticket, actor) {
            return Ok(None);
        }

        let Some(request) = ticket.meta().as_grant_permission() else {
            return Err(AppError::Validation(format!(
                "ticket '{ticket_id}' is not a grant permission request"
            )));
        };

        let hosts = self
            .asset_directory
            .find_hosts_by_ips(actor.tenant_id(), request.ips.as_slice())
            .await?;

        let system_user_exists = match request.system_user.as_deref() {
            Some(username) => self
                .asset_directory
                .find_account_by_name(actor.tenant_id(), username)
                .await?
                .is_some(),
            None => false,
        };

        Ok(Some(GrantResolutionPreview {
            hosts,
            system_user_exists,
        }))
    }

    /// Returns a materialized grant to the subject that approved it.
    pub async fn get_grant(
        &self,
        actor: &Principal,
        grant_id: PermissionGrantId,
    ) -> AppResult<PermissionGrant> {
        let grant = self
            .repository
            .find_grant(actor.tenant_id(), grant_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "permission grant '{grant_id}' does not exist for tenant '{}'",
                    actor.tenant_id()
                ))
            })?;

        if grant.created_by != actor.subject() {
            return Err(AppError::Forbidden(format!(
                "subject '{}' did not approve permission grant '{grant_id}'",
                actor.subject()
            )));
        }

        Ok(grant)
    }
}
