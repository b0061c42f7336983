use std::fmt::{Display, Formatter};

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AccountId, HostId};

/// Validity span applied when a grant is created without an end date.
pub const DEFAULT_GRANT_VALIDITY_YEARS: u32 = 70;

/// Returns the default end of validity for a grant created at `now`.
#[must_use]
pub fn default_valid_until(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(DEFAULT_GRANT_VALIDITY_YEARS * 12))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Unique identifier for a permission grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionGrantId(Uuid);

impl PermissionGrantId {
    /// Creates a new random grant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a grant identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PermissionGrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PermissionGrantId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Fields for a grant about to be created.
///
/// Absent validity bounds stay absent so the grant store applies its own
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPermissionGrant {
    /// Grant name. May be empty.
    pub name: String,
    /// Subject that approved the originating ticket.
    pub created_by: String,
    /// Explicit start of validity.
    pub valid_from: Option<DateTime<Utc>>,
    /// Explicit end of validity.
    pub valid_until: Option<DateTime<Utc>>,
}

/// Enforceable permission linking accounts to hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Grant identifier.
    pub id: PermissionGrantId,
    /// Grant name.
    pub name: String,
    /// Subject that approved the originating ticket.
    pub created_by: String,
    /// Start of validity.
    pub valid_from: DateTime<Utc>,
    /// End of validity.
    pub valid_until: DateTime<Utc>,
    /// Linked hosts.
    pub host_ids: Vec<HostId>,
    /// Linked system accounts.
    pub account_ids: Vec<AccountId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl PermissionGrant {
    /// Builds a stored grant from creation fields, filling absent bounds with defaults.
    #[must_use]
    pub fn from_new(id: PermissionGrantId, grant: NewPermissionGrant, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: grant.name,
            created_by: grant.created_by,
            valid_from: grant.valid_from.unwrap_or(now),
            valid_until: grant.valid_until.unwrap_or_else(|| default_valid_until(now)),
            host_ids: Vec::new(),
            account_ids: Vec::new(),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Duration, Utc};

    use super::{NewPermissionGrant, PermissionGrant, PermissionGrantId};

    #[test]
    fn absent_bounds_fall_back_to_store_defaults() {
        let now = Utc::now();
        let grant = PermissionGrant::from_new(
            PermissionGrantId::new(),
            NewPermissionGrant {
                name: String::new(),
                created_by: "bob".to_owned(),
                valid_from: None,
                valid_until: None,
            },
            now,
        );

        assert_eq!(grant.valid_from, now);
        assert_eq!(grant.valid_until.year(), now.year() + 70);
        assert!(grant.valid_from < grant.valid_until);
    }

    #[test]
    fn explicit_bounds_are_kept() {
        let now = Utc::now();
        let start = now + Duration::days(1);
        let grant = PermissionGrant::from_new(
            PermissionGrantId::new(),
            NewPermissionGrant {
                name: "ops".to_owned(),
                created_by: "bob".to_owned(),
                valid_from: Some(start),
                valid_until: None,
            },
            now,
        );

        assert_eq!(grant.valid_from, start);
        assert_eq!(grant.valid_until.year(), now.year() + 70);
    }
}
