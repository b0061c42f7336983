use warden_domain::{AssetAccessRequest, TicketMeta, TicketSubmission};

use super::*;

impl TicketService {
    /// Submits a request that materializes a permission grant when approved.
    pub async fn submit_grant_permission_request(
        &self,
        actor: &Principal,
        input: SubmitGrantPermissionRequestInput,
    ) -> AppResult<Ticket> {
        self.submit(
            actor,
            input.title,
            input.assignees,
            TicketMeta::GrantPermission(input.request),
        )
        .await
    }

    /// Submits a request for access to assets.
    pub async fn submit_asset_access_request(
        &self,
        actor: &Principal,
        input: SubmitAssetAccessRequestInput,
    ) -> AppResult<Ticket> {
        self.submit(
            actor,
            input.title,
            input.assignees,
            TicketMeta::AssetAccess(AssetAccessRequest {
                ips: input.ips,
                host_name: input.host_name,
                date_start: input.date_start,
                date_expired: input.date_expired,
                confirmed_assets: Vec::new(),
                confirmed_system_users: Vec::new(),
            }),
        )
        .await
    }

    async fn submit(
        &self,
        actor: &Principal,
        title: String,
        assignees: Vec<TicketParticipant>,
        meta: TicketMeta,
    ) -> AppResult<Ticket> {
        let ticket = Ticket::submit(
            TicketSubmission {
                title,
                requester: participant(actor),
                assignees,
                meta,
            },
            Utc::now(),
        )?;

        self.repository
            .insert_ticket(actor.tenant_id(), &ticket)
            .await?;

        self.append_audit(
            actor,
            AuditAction::TicketSubmitted,
            "ticket",
            ticket.id().to_string(),
            Some(format!(
                "{} ticket '{}' assigned to {} reviewer(s)",
                ticket.kind().as_str(),
                ticket.title(),
                ticket.assignees().len()
            )),
        )
        .await;

        info!(
            tenant_id = %actor.tenant_id(),
            ticket_id = %ticket.id(),
            subject = actor.subject(),
            kind = ticket.kind().as_str(),
            "ticket submitted"
        );

        Ok(ticket)
    }
}
