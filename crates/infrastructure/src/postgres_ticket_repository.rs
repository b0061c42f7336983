use std::collections::HashMap;
use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use warden_application::{AssetDirectory, TicketListQuery, TicketRepository, TicketTransaction};
use warden_core::{AppError, AppResult, TenantId};
use warden_domain::{
    AccountId, Host, HostId, PermissionGrant, PermissionGrantId, SystemAccount, Ticket, TicketId,
    TicketMeta, TicketParticipant, TicketRecord,
};

mod transaction;

use transaction::PostgresTicketTransaction;

/// PostgreSQL-backed ticket, inventory and grant store.
#[derive(Clone)]
pub struct PostgresTicketRepository {
    pool: PgPool,
}

impl PostgresTicketRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn acquire(&self, purpose: &str) -> AppResult<sqlx::pool::PoolConnection<Postgres>> {
        self.pool.acquire().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to acquire connection to {purpose}: {error}"
            ))
        })
    }
}

#[derive(Debug, FromRow)]
struct TicketRow {
    id: Uuid,
    title: String,
    status: String,
    action: Option<String>,
    requester_subject: String,
    requester_display_name: String,
    assignee_subject: Option<String>,
    assignee_display_name: Option<String>,
    meta: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct AssigneeRow {
    ticket_id: Uuid,
    subject: String,
    display_name: String,
}

#[derive(Debug, FromRow)]
struct HostRow {
    id: Uuid,
    ip: String,
    hostname: String,
}

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    username: String,
}

#[derive(Debug, FromRow)]
struct GrantRow {
    id: Uuid,
    name: String,
    created_by: String,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowLock {
    None,
    Update,
    Share,
}

impl RowLock {
    fn clause(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Update => " FOR UPDATE",
            Self::Share => " FOR SHARE",
        }
    }
}

const TICKET_COLUMNS: &str = "t.id, t.title, t.status, t.action, t.requester_subject, \
     t.requester_display_name, t.assignee_subject, t.assignee_display_name, t.meta, \
     t.created_at, t.updated_at";

#[async_trait]
impl TicketRepository for PostgresTicketRepository {
    async fn insert_ticket(&self, tenant_id: TenantId, ticket: &Ticket) -> AppResult<()> {
        let meta = meta_to_value(ticket.meta())?;
        let mut assignee_rows = Vec::with_capacity(ticket.assignees().len());
        for (position, assignee) in ticket.assignees().iter().enumerate() {
            let position = i32::try_from(position).map_err(|error| {
                AppError::Validation(format!("too many assignees on ticket: {error}"))
            })?;
            assignee_rows.push((position, assignee.clone()));
        }

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start ticket insert transaction in tenant '{tenant_id}': {error}"
            ))
        })?;

        sqlx::query(
            r#"
            INSERT INTO tickets (
                id,
                tenant_id,
                title,
                kind,
                status,
                action,
                requester_subject,
                requester_display_name,
                assignee_subject,
                assignee_display_name,
                meta,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(ticket.id().as_uuid())
        .bind(tenant_id.as_uuid())
        .bind(ticket.title())
        .bind(ticket.kind().as_str())
        .bind(ticket.status().as_str())
        .bind(ticket.action().map(|action| action.as_str()))
        .bind(ticket.requester().subject.as_str())
        .bind(ticket.requester().display_name.as_str())
        .bind(ticket.assignee().map(|assignee| assignee.subject.as_str()))
        .bind(ticket.assignee().map(|assignee| assignee.display_name.as_str()))
        .bind(&meta)
        .bind(ticket.created_at())
        .bind(ticket.updated_at())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to insert ticket '{}' in tenant '{tenant_id}': {error}",
                ticket.id()
            ))
        })?;

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO ticket_assignees (ticket_id, subject, display_name, position) ",
        );
        builder.push_values(assignee_rows, |mut row, (position, assignee)| {
            row.push_bind(ticket.id().as_uuid())
                .push_bind(assignee.subject)
                .push_bind(assignee.display_name)
                .push_bind(position);
        });
        builder
            .build()
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to insert assignees of ticket '{}' in tenant '{tenant_id}': {error}",
                    ticket.id()
                ))
            })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit ticket insert transaction in tenant '{tenant_id}': {error}"
            ))
        })
    }

    async fn find_ticket(
        &self,
        tenant_id: TenantId,
        ticket_id: TicketId,
    ) -> AppResult<Option<Ticket>> {
        let mut connection = self.acquire("read ticket").await?;
        fetch_ticket(&mut connection, tenant_id, ticket_id, RowLock::None).await
    }

    async fn list_tickets_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
        query: TicketListQuery,
    ) -> AppResult<Vec<Ticket>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT ");
        builder.push(TICKET_COLUMNS);
        builder.push(" FROM tickets t WHERE t.tenant_id = ");
        builder.push_bind(tenant_id.as_uuid());
        builder.push(" AND (t.requester_subject = ");
        builder.push_bind(subject);
        builder.push(
            " OR EXISTS (SELECT 1 FROM ticket_assignees a WHERE a.ticket_id = t.id AND a.subject = ",
        );
        builder.push_bind(subject);
        builder.push("))");

        if let Some(status) = query.status {
            builder.push(" AND t.status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(action) = query.action {
            builder.push(" AND t.action = ");
            builder.push_bind(action.as_str());
        }
        if let Some(kind) = query.kind {
            builder.push(" AND t.kind = ");
            builder.push_bind(kind.as_str());
        }
        builder.push(" ORDER BY t.created_at DESC, t.id");

        let rows = builder
            .build_query_as::<TicketRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to list tickets for subject '{subject}' in tenant '{tenant_id}': {error}"
                ))
            })?;

        let ticket_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut connection = self.acquire("list ticket assignees").await?;
        let mut assignees = fetch_assignees(&mut connection, ticket_ids.as_slice()).await?;

        rows.into_iter()
            .map(|row| {
                let row_assignees = assignees.remove(&row.id).unwrap_or_default();
                ticket_from_row(row, row_assignees)
            })
            .collect()
    }

    async fn find_grant(
        &self,
        tenant_id: TenantId,
        grant_id: PermissionGrantId,
    ) -> AppResult<Option<PermissionGrant>> {
        let row = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT id, name, created_by, valid_from, valid_until, created_at
            FROM permission_grants
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(grant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find permission grant '{grant_id}' in tenant '{tenant_id}': {error}"
            ))
        })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let host_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT host_id FROM permission_grant_hosts WHERE grant_id = $1 ORDER BY host_id",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load hosts of permission grant '{grant_id}': {error}"
            ))
        })?;

        let account_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT account_id FROM permission_grant_accounts WHERE grant_id = $1 ORDER BY account_id",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load accounts of permission grant '{grant_id}': {error}"
            ))
        })?;

        let mut grant = grant_from_row(row);
        grant.host_ids = host_ids.into_iter().map(HostId::from_uuid).collect();
        grant.account_ids = account_ids.into_iter().map(AccountId::from_uuid).collect();
        Ok(Some(grant))
    }

    async fn begin(&self, tenant_id: TenantId) -> AppResult<Box<dyn TicketTransaction>> {
        let transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start ticket transaction in tenant '{tenant_id}': {error}"
            ))
        })?;

        Ok(Box::new(PostgresTicketTransaction::new(
            tenant_id,
            transaction,
        )))
    }
}

#[async_trait]
impl AssetDirectory for PostgresTicketRepository {
    async fn find_hosts_by_ips(&self, tenant_id: TenantId, ips: &[IpAddr]) -> AppResult<Vec<Host>> {
        let mut connection = self.acquire("read hosts").await?;
        fetch_hosts(&mut connection, tenant_id, ips, RowLock::None).await
    }

    async fn find_account_by_name(
        &self,
        tenant_id: TenantId,
        username: &str,
    ) -> AppResult<Option<SystemAccount>> {
        let mut connection = self.acquire("read system accounts").await?;
        fetch_account(&mut connection, tenant_id, username, RowLock::None).await
    }
}

async fn fetch_ticket(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    ticket_id: TicketId,
    lock: RowLock,
) -> AppResult<Option<Ticket>> {
    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT ");
    builder.push(TICKET_COLUMNS);
    builder.push(" FROM tickets t WHERE t.tenant_id = ");
    builder.push_bind(tenant_id.as_uuid());
    builder.push(" AND t.id = ");
    builder.push_bind(ticket_id.as_uuid());
    builder.push(lock.clause());

    let row = builder
        .build_query_as::<TicketRow>()
        .fetch_optional(&mut *connection)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load ticket '{ticket_id}' in tenant '{tenant_id}': {error}"
            ))
        })?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut assignees = fetch_assignees(connection, &[row.id]).await?;
    let row_assignees = assignees.remove(&row.id).unwrap_or_default();
    ticket_from_row(row, row_assignees).map(Some)
}

async fn fetch_assignees(
    connection: &mut PgConnection,
    ticket_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<TicketParticipant>>> {
    if ticket_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, AssigneeRow>(
        r#"
        SELECT ticket_id, subject, display_name
        FROM ticket_assignees
        WHERE ticket_id = ANY($1)
        ORDER BY ticket_id, position
        "#,
    )
    .bind(ticket_ids)
    .fetch_all(connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to load ticket assignees: {error}")))?;

    let mut assignees: HashMap<Uuid, Vec<TicketParticipant>> = HashMap::new();
    for row in rows {
        assignees
            .entry(row.ticket_id)
            .or_default()
            .push(TicketParticipant::new(row.subject, row.display_name));
    }

    Ok(assignees)
}

async fn fetch_hosts(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    ips: &[IpAddr],
    lock: RowLock,
) -> AppResult<Vec<Host>> {
    if ips.is_empty() {
        return Ok(Vec::new());
    }

    let ip_values: Vec<String> = ips.iter().map(IpAddr::to_string).collect();
    let mut builder: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("SELECT id, ip, hostname FROM hosts WHERE tenant_id = ");
    builder.push_bind(tenant_id.as_uuid());
    builder.push(" AND ip = ANY(");
    builder.push_bind(ip_values);
    builder.push(") ORDER BY hostname, id");
    builder.push(lock.clause());

    let rows = builder
        .build_query_as::<HostRow>()
        .fetch_all(connection)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to look up hosts by ip in tenant '{tenant_id}': {error}"
            ))
        })?;

    rows.into_iter()
        .map(|row| {
            let ip = row.ip.parse::<IpAddr>().map_err(|error| {
                AppError::Internal(format!(
                    "stored host '{}' has invalid ip '{}': {error}",
                    row.id, row.ip
                ))
            })?;
            Host::new(HostId::from_uuid(row.id), ip, row.hostname)
        })
        .collect()
}

async fn fetch_account(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    username: &str,
    lock: RowLock,
) -> AppResult<Option<SystemAccount>> {
    let mut builder: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("SELECT id, username FROM system_accounts WHERE tenant_id = ");
    builder.push_bind(tenant_id.as_uuid());
    builder.push(" AND username = ");
    builder.push_bind(username);
    builder.push(lock.clause());

    let row = builder
        .build_query_as::<AccountRow>()
        .fetch_optional(connection)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to look up system account '{username}' in tenant '{tenant_id}': {error}"
            ))
        })?;

    row.map(|row| SystemAccount::new(AccountId::from_uuid(row.id), row.username))
        .transpose()
}

fn meta_to_value(meta: &TicketMeta) -> AppResult<Value> {
    serde_json::to_value(meta)
        .map_err(|error| AppError::Internal(format!("failed to encode ticket meta: {error}")))
}

fn ticket_from_row(row: TicketRow, assignees: Vec<TicketParticipant>) -> AppResult<Ticket> {
    let meta = serde_json::from_value::<TicketMeta>(row.meta).map_err(|error| {
        AppError::Internal(format!(
            "stored ticket '{}' has invalid meta: {error}",
            row.id
        ))
    })?;

    let assignee = match (row.assignee_subject, row.assignee_display_name) {
        (Some(subject), display_name) => Some(TicketParticipant::new(
            subject.clone(),
            display_name.unwrap_or(subject),
        )),
        (None, _) => None,
    };

    Ticket::from_record(TicketRecord {
        id: TicketId::from_uuid(row.id),
        title: row.title,
        status: row.status.parse()?,
        action: row.action.as_deref().map(str::parse).transpose()?,
        requester: TicketParticipant::new(row.requester_subject, row.requester_display_name),
        assignees,
        assignee,
        meta,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn grant_from_row(row: GrantRow) -> PermissionGrant {
    PermissionGrant {
        id: PermissionGrantId::from_uuid(row.id),
        name: row.name,
        created_by: row.created_by,
        valid_from: row.valid_from,
        valid_until: row.valid_until,
        host_ids: Vec::new(),
        account_ids: Vec::new(),
        created_at: row.created_at,
    }
}
