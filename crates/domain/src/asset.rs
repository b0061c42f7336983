use std::fmt::{Display, Formatter};
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::{AppResult, NonEmptyString};

/// Unique identifier for a managed host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostId(Uuid);

impl HostId {
    /// Creates a new random host identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a host identifier from an existing UUID value.
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

impl Default for HostId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for HostId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a system account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Creates a new random account identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an account identifier from an existing UUID value.
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

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AccountId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Host owned by the asset inventory and addressable by IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    id: HostId,
    ip: IpAddr,
    hostname: NonEmptyString,
}

impl Host {
    /// Creates a host record.
    pub fn new(id: HostId, ip: IpAddr, hostname: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            ip,
            hostname: NonEmptyString::new(hostname)?,
        })
    }

    /// Returns the host identifier.
    #[must_use]
    pub fn id(&self) -> HostId {
        self.id
    }

    /// Returns the host IP address.
    #[must_use]
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Returns the host name.
    #[must_use]
    pub fn hostname(&self) -> &str {
        self.hostname.as_str()
    }
}

/// Login account that can be granted on hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemAccount {
    id: AccountId,
    username: NonEmptyString,
}

impl SystemAccount {
    /// Creates a system account record.
    pub fn new(id: AccountId, username: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            username: NonEmptyString::new(username)?,
        })
    }

    /// Returns the account identifier.
    #[must_use]
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Returns the account username.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_str()
    }
}
