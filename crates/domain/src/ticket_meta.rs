use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{AppError, AppResult};

use crate::{AccountId, HostId, TicketKind};

/// Maximum length of a requested grant name.
pub const GRANT_NAME_MAX_CHARS: usize = 128;

/// Maximum length of a requested system account name.
pub const SYSTEM_USER_MAX_CHARS: usize = 64;

/// Maximum length of the free-form host name on asset access requests.
pub const ASSET_ACCESS_HOST_NAME_MAX_CHARS: usize = 256;

/// Payload of a "grant permission" request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantPermissionRequest {
    /// Name given to the grant on approval. May be empty.
    #[serde(default)]
    pub name: String,
    /// Host addresses the requester wants access to.
    #[serde(default)]
    pub ips: Vec<IpAddr>,
    /// System account name the requester wants to log in as.
    #[serde(default)]
    pub system_user: Option<String>,
    /// Requested start of validity.
    #[serde(default)]
    pub date_start: Option<DateTime<Utc>>,
    /// Requested end of validity.
    #[serde(default)]
    pub date_expired: Option<DateTime<Utc>>,
}

impl GrantPermissionRequest {
    /// Validates field bounds and the validity window.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.chars().count() > GRANT_NAME_MAX_CHARS {
            return Err(AppError::Validation(format!(
                "grant name must not exceed {GRANT_NAME_MAX_CHARS} characters"
            )));
        }

        if let Some(system_user) = self.system_user.as_deref() {
            if system_user.trim().is_empty() {
                return Err(AppError::Validation(
                    "system_user must not be blank when provided".to_owned(),
                ));
            }

            if system_user.chars().count() > SYSTEM_USER_MAX_CHARS {
                return Err(AppError::Validation(format!(
                    "system_user must not exceed {SYSTEM_USER_MAX_CHARS} characters"
                )));
            }
        }

        validate_window(self.date_start, self.date_expired)
    }

    fn merge(&mut self, patch: GrantPermissionPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(ips) = patch.ips {
            self.ips = ips;
        }
        if let Some(system_user) = patch.system_user {
            self.system_user = Some(system_user);
        }
        if let Some(date_start) = patch.date_start {
            self.date_start = Some(date_start);
        }
        if let Some(date_expired) = patch.date_expired {
            self.date_expired = Some(date_expired);
        }
    }
}

/// Payload of an "asset access" request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAccessRequest {
    /// Host addresses the requester wants access to.
    #[serde(default)]
    pub ips: Vec<IpAddr>,
    /// Free-form host name hint.
    #[serde(default)]
    pub host_name: Option<String>,
    /// Requested start of validity.
    #[serde(default)]
    pub date_start: Option<DateTime<Utc>>,
    /// Requested end of validity.
    #[serde(default)]
    pub date_expired: Option<DateTime<Utc>>,
    /// Hosts confirmed by an assignee.
    #[serde(default)]
    pub confirmed_assets: Vec<HostId>,
    /// System accounts confirmed by an assignee.
    #[serde(default)]
    pub confirmed_system_users: Vec<AccountId>,
}

impl AssetAccessRequest {
    /// Validates field bounds and the validity window.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(host_name) = self.host_name.as_deref()
            && host_name.chars().count() > ASSET_ACCESS_HOST_NAME_MAX_CHARS
        {
            return Err(AppError::Validation(format!(
                "host_name must not exceed {ASSET_ACCESS_HOST_NAME_MAX_CHARS} characters"
            )));
        }

        validate_window(self.date_start, self.date_expired)
    }

    fn merge(&mut self, patch: AssetAccessPatch, include_confirmations: bool) {
        if let Some(ips) = patch.ips {
            self.ips = ips;
        }
        if let Some(host_name) = patch.host_name {
            self.host_name = Some(host_name);
        }
        if let Some(date_start) = patch.date_start {
            self.date_start = Some(date_start);
        }
        if let Some(date_expired) = patch.date_expired {
            self.date_expired = Some(date_expired);
        }
        if !include_confirmations {
            return;
        }
        if let Some(confirmed_assets) = patch.confirmed_assets {
            self.confirmed_assets = confirmed_assets;
        }
        if let Some(confirmed_system_users) = patch.confirmed_system_users {
            self.confirmed_system_users = confirmed_system_users;
        }
    }
}

/// Type-specific ticket payload. The variant fixes the ticket kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TicketMeta {
    /// Request to materialize a permission grant on approval.
    GrantPermission(GrantPermissionRequest),
    /// Request for access to assets, confirmed by an assignee.
    AssetAccess(AssetAccessRequest),
}

impl TicketMeta {
    /// Returns the ticket kind implied by this payload.
    #[must_use]
    pub fn kind(&self) -> TicketKind {
        match self {
            Self::GrantPermission(_) => TicketKind::GrantPermissionRequest,
            Self::AssetAccess(_) => TicketKind::AssetAccessRequest,
        }
    }

    /// Returns the grant-permission payload when this is one.
    #[must_use]
    pub fn as_grant_permission(&self) -> Option<&GrantPermissionRequest> {
        match self {
            Self::GrantPermission(request) => Some(request),
            Self::AssetAccess(_) => None,
        }
    }

    /// Validates the payload for its kind.
    pub fn validate(&self) -> AppResult<()> {
        match self {
            Self::GrantPermission(request) => request.validate(),
            Self::AssetAccess(request) => request.validate(),
        }
    }

    /// Merges a same-kind patch over this payload.
    ///
    /// Assignee confirmations on asset access requests are only taken from
    /// the patch when `include_confirmations` is set.
    pub fn merge(&mut self, patch: TicketMetaPatch, include_confirmations: bool) -> AppResult<()> {
        match (self, patch) {
            (Self::GrantPermission(request), TicketMetaPatch::GrantPermission(patch)) => {
                request.merge(patch);
            }
            (Self::AssetAccess(request), TicketMetaPatch::AssetAccess(patch)) => {
                request.merge(patch, include_confirmations);
            }
            (current, patch) => {
                return Err(AppError::Validation(format!(
                    "metadata for '{}' cannot be applied to a '{}' ticket",
                    patch.kind().as_str(),
                    current.kind().as_str()
                )));
            }
        }

        Ok(())
    }
}

/// Partial update of a grant-permission payload. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantPermissionPatch {
    /// Replacement grant name.
    pub name: Option<String>,
    /// Replacement host addresses.
    pub ips: Option<Vec<IpAddr>>,
    /// Replacement system account name.
    pub system_user: Option<String>,
    /// Replacement validity start.
    pub date_start: Option<DateTime<Utc>>,
    /// Replacement validity end.
    pub date_expired: Option<DateTime<Utc>>,
}

/// Partial update of an asset-access payload. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetAccessPatch {
    /// Replacement host addresses.
    pub ips: Option<Vec<IpAddr>>,
    /// Replacement host name hint.
    pub host_name: Option<String>,
    /// Replacement validity start.
    pub date_start: Option<DateTime<Utc>>,
    /// Replacement validity end.
    pub date_expired: Option<DateTime<Utc>>,
    /// Replacement confirmed hosts. Assignees only.
    pub confirmed_assets: Option<Vec<HostId>>,
    /// Replacement confirmed accounts. Assignees only.
    pub confirmed_system_users: Option<Vec<AccountId>>,
}

/// Kind-tagged metadata patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketMetaPatch {
    /// Patch for a grant-permission request.
    GrantPermission(GrantPermissionPatch),
    /// Patch for an asset-access request.
    AssetAccess(AssetAccessPatch),
}

impl TicketMetaPatch {
    /// Returns the ticket kind this patch targets.
    #[must_use]
    pub fn kind(&self) -> TicketKind {
        match self {
            Self::GrantPermission(_) => TicketKind::GrantPermissionRequest,
            Self::AssetAccess(_) => TicketKind::AssetAccessRequest,
        }
    }
}

fn validate_window(
    date_start: Option<DateTime<Utc>>,
    date_expired: Option<DateTime<Utc>>,
) -> AppResult<()> {
    if let (Some(start), Some(expired)) = (date_start, date_expired)
        && expired <= start
    {
        return Err(AppError::Validation(
            "date_expired must be after date_start".to_owned(),
        ));
    }

    Ok(())
}
