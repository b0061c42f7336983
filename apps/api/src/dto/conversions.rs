use std::net::IpAddr;

use uuid::Uuid;
use warden_application::{GrantResolutionPreview, TicketActionOutcome, TicketListQuery};
use warden_core::{AppError, AppResult};
use warden_domain::{
    AccountId, AssetAccessPatch, GrantPermissionPatch, Host, HostId, PermissionGrant, Ticket,
    TicketMeta, TicketMetaPatch, TicketParticipant,
};

use super::types::{
    AssigneeRequest, GrantResolutionResponse, HostResponse, PermissionGrantResponse,
    TicketActionResponse, TicketListQueryParams, TicketMetaPatchRequest, TicketMetaResponse,
    TicketParticipantResponse, TicketResponse,
};

/// Parses textual IP addresses from a request body.
pub fn parse_ips(values: Vec<String>) -> AppResult<Vec<IpAddr>> {
    values
        .into_iter()
        .map(|value| {
            value.trim().parse::<IpAddr>().map_err(|error| {
                AppError::Validation(format!("invalid ip address '{value}': {error}"))
            })
        })
        .collect()
}

fn parse_uuids(values: Vec<String>, label: &str) -> AppResult<Vec<Uuid>> {
    values
        .into_iter()
        .map(|value| {
            Uuid::parse_str(value.as_str())
                .map_err(|error| AppError::Validation(format!("invalid {label} '{value}': {error}")))
        })
        .collect()
}

impl From<AssigneeRequest> for TicketParticipant {
    fn from(value: AssigneeRequest) -> Self {
        let display_name = value
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| value.subject.clone());
        TicketParticipant::new(value.subject, display_name)
    }
}

impl TryFrom<TicketMetaPatchRequest> for TicketMetaPatch {
    type Error = AppError;

    fn try_from(value: TicketMetaPatchRequest) -> Result<Self, Self::Error> {
        Ok(match value {
            TicketMetaPatchRequest::GrantPermission {
                name,
                ips,
                system_user,
                date_start,
                date_expired,
            } => TicketMetaPatch::GrantPermission(GrantPermissionPatch {
                name,
                ips: ips.map(parse_ips).transpose()?,
                system_user,
                date_start,
                date_expired,
            }),
            TicketMetaPatchRequest::AssetAccess {
                ips,
                host_name,
                date_start,
                date_expired,
                confirmed_assets,
                confirmed_system_users,
            } => TicketMetaPatch::AssetAccess(AssetAccessPatch {
                ips: ips.map(parse_ips).transpose()?,
                host_name,
                date_start,
                date_expired,
                confirmed_assets: confirmed_assets
                    .map(|values| parse_uuids(values, "confirmed asset id"))
                    .transpose()?
                    .map(|ids| ids.into_iter().map(HostId::from_uuid).collect()),
                confirmed_system_users: confirmed_system_users
                    .map(|values| parse_uuids(values, "confirmed system user id"))
                    .transpose()?
                    .map(|ids| ids.into_iter().map(AccountId::from_uuid).collect()),
            }),
        })
    }
}

impl TryFrom<TicketListQueryParams> for TicketListQuery {
    type Error = AppError;

    fn try_from(value: TicketListQueryParams) -> Result<Self, Self::Error> {
        Ok(TicketListQuery {
            status: value.status.as_deref().map(str::parse).transpose()?,
            action: value.action.as_deref().map(str::parse).transpose()?,
            kind: value.kind.as_deref().map(str::parse).transpose()?,
        })
    }
}

impl From<&TicketParticipant> for TicketParticipantResponse {
    fn from(value: &TicketParticipant) -> Self {
        Self {
            subject: value.subject.clone(),
            display_name: value.display_name.clone(),
        }
    }
}

impl From<&TicketMeta> for TicketMetaResponse {
    fn from(value: &TicketMeta) -> Self {
        match value {
            TicketMeta::GrantPermission(request) => Self::GrantPermission {
                name: request.name.clone(),
                ips: request.ips.iter().map(ToString::to_string).collect(),
                system_user: request.system_user.clone(),
                date_start: request.date_start,
                date_expired: request.date_expired,
            },
            TicketMeta::AssetAccess(request) => Self::AssetAccess {
                ips: request.ips.iter().map(ToString::to_string).collect(),
                host_name: request.host_name.clone(),
                date_start: request.date_start,
                date_expired: request.date_expired,
                confirmed_assets: request
                    .confirmed_assets
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                confirmed_system_users: request
                    .confirmed_system_users
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            },
        }
    }
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id().to_string(),
            title: ticket.title().to_owned(),
            kind: ticket.kind().as_str().to_owned(),
            status: ticket.status().as_str().to_owned(),
            action: ticket.action().map(|action| action.as_str().to_owned()),
            requester: TicketParticipantResponse::from(ticket.requester()),
            assignees: ticket
                .assignees()
                .iter()
                .map(TicketParticipantResponse::from)
                .collect(),
            assignee: ticket.assignee().map(TicketParticipantResponse::from),
            meta: TicketMetaResponse::from(ticket.meta()),
            created_at: ticket.created_at(),
            updated_at: ticket.updated_at(),
        }
    }
}

impl From<PermissionGrant> for PermissionGrantResponse {
    fn from(grant: PermissionGrant) -> Self {
        Self {
            id: grant.id.to_string(),
            name: grant.name,
            created_by: grant.created_by,
            valid_from: grant.valid_from,
            valid_until: grant.valid_until,
            host_ids: grant.host_ids.iter().map(ToString::to_string).collect(),
            account_ids: grant.account_ids.iter().map(ToString::to_string).collect(),
            created_at: grant.created_at,
        }
    }
}

impl From<TicketActionOutcome> for TicketActionResponse {
    fn from(outcome: TicketActionOutcome) -> Self {
        Self {
            ticket: TicketResponse::from(outcome.ticket),
            grant: outcome.grant.map(PermissionGrantResponse::from),
        }
    }
}

impl From<&Host> for HostResponse {
    fn from(host: &Host) -> Self {
        Self {
            id: host.id().to_string(),
            ip: host.ip().to_string(),
            hostname: host.hostname().to_owned(),
        }
    }
}

impl From<Option<GrantResolutionPreview>> for GrantResolutionResponse {
    fn from(preview: Option<GrantResolutionPreview>) -> Self {
        match preview {
            Some(preview) => Self {
                hosts: Some(preview.hosts.iter().map(HostResponse::from).collect()),
                system_user_exists: Some(preview.system_user_exists),
            },
            None => Self {
                hosts: None,
                system_user_exists: None,
            },
        }
    }
}
