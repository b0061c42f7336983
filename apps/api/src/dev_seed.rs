use std::net::IpAddr;

use tracing::info;
use uuid::Uuid;
use warden_core::{AppError, AppResult, TenantId};
use warden_domain::{AccountId, Host, HostId, SystemAccount};
use warden_infrastructure::InMemoryTicketRepository;

const DEV_SEED_TENANT_ID: &str = "11111111-1111-1111-1111-111111111111";
const DEV_SEED_HOSTS: [(&str, &str); 3] = [
    ("10.0.0.1", "bastion-01"),
    ("10.0.0.2", "db-primary"),
    ("10.0.0.3", "db-replica"),
];
const DEV_SEED_ACCOUNTS: [&str; 2] = ["root", "deploy"];

/// Seeds demo inventory into the in-memory store.
pub async fn seed_inventory(repository: &InMemoryTicketRepository) -> AppResult<TenantId> {
    let tenant_id = Uuid::parse_str(DEV_SEED_TENANT_ID)
        .map(TenantId::from_uuid)
        .map_err(|error| AppError::Internal(format!("invalid DEV_SEED_TENANT_ID: {error}")))?;

    for (ip, hostname) in DEV_SEED_HOSTS {
        let ip = ip
            .parse::<IpAddr>()
            .map_err(|error| AppError::Internal(format!("invalid dev seed ip '{ip}': {error}")))?;
        repository
            .insert_host(tenant_id, Host::new(HostId::new(), ip, hostname)?)
            .await?;
    }

    for username in DEV_SEED_ACCOUNTS {
        repository
            .insert_account(tenant_id, SystemAccount::new(AccountId::new(), username)?)
            .await?;
    }

    info!(
        %tenant_id,
        hosts = DEV_SEED_HOSTS.len(),
        accounts = DEV_SEED_ACCOUNTS.len(),
        "seeded dev inventory"
    );

    Ok(tenant_id)
}
