use warden_core::Rejection;

use crate::{GrantPermissionRequest, Host, NewPermissionGrant, SystemAccount};

/// Checks that the requested IPs resolved to as many hosts as were requested.
///
/// Resolution is by membership, so the count is the only signal: a missing
/// host, a duplicated request IP or two hosts sharing one IP all mismatch.
pub fn ensure_hosts_match(requested_ips: usize, resolved: &[Host]) -> Result<(), Rejection> {
    if resolved.len() != requested_ips {
        return Err(Rejection::AssetsIpsNotMatch);
    }

    Ok(())
}

/// Requires that the requested system account was found.
pub fn require_account(account: Option<SystemAccount>) -> Result<SystemAccount, Rejection> {
    account.ok_or(Rejection::SystemUserNotFound)
}

/// Hosts and account resolved for a grant-permission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGrantTargets {
    hosts: Vec<Host>,
    account: SystemAccount,
}

impl ResolvedGrantTargets {
    /// Validates lookups performed for `request`.
    pub fn resolve(
        request: &GrantPermissionRequest,
        hosts: Vec<Host>,
        account: Option<SystemAccount>,
    ) -> Result<Self, Rejection> {
        ensure_hosts_match(request.ips.len(), &hosts)?;
        let account = require_account(account)?;

        Ok(Self { hosts, account })
    }

    /// Returns the resolved hosts.
    #[must_use]
    pub fn hosts(&self) -> &[Host] {
        self.hosts.as_slice()
    }

    /// Returns the resolved account.
    #[must_use]
    pub fn account(&self) -> &SystemAccount {
        &self.account
    }

    /// Builds grant creation fields for `request`, approved by `approved_by`.
    #[must_use]
    pub fn new_grant(request: &GrantPermissionRequest, approved_by: &str) -> NewPermissionGrant {
        NewPermissionGrant {
            name: request.name.clone(),
            created_by: approved_by.to_owned(),
            valid_from: request.date_start,
            valid_until: request.date_expired,
        }
    }
}
