use sqlx::Transaction;
use tracing::debug;
use warden_domain::NewPermissionGrant;

use super::*;

/// Unit of work over one PostgreSQL transaction.
///
/// The locked ticket row stays `FOR UPDATE` until commit; inventory rows read
/// for grant resolution are held `FOR SHARE`. Dropping without commit rolls
/// back.
pub(super) struct PostgresTicketTransaction {
    tenant_id: TenantId,
    transaction: Option<Transaction<'static, Postgres>>,
}

impl PostgresTicketTransaction {
    pub(super) fn new(tenant_id: TenantId, transaction: Transaction<'static, Postgres>) -> Self {
        Self {
            tenant_id,
            transaction: Some(transaction),
        }
    }

    fn connection(&mut self) -> AppResult<&mut PgConnection> {
        self.transaction.as_deref_mut().ok_or_else(|| {
            AppError::Internal("ticket transaction is already committed".to_owned())
        })
    }
}

#[async_trait]
impl TicketTransaction for PostgresTicketTransaction {
    async fn lock_ticket(&mut self, ticket_id: TicketId) -> AppResult<Option<Ticket>> {
        let tenant_id = self.tenant_id;
        fetch_ticket(self.connection()?, tenant_id, ticket_id, RowLock::Update).await
    }

    async fn find_hosts_by_ips(&mut self, ips: &[IpAddr]) -> AppResult<Vec<Host>> {
        let tenant_id = self.tenant_id;
        fetch_hosts(self.connection()?, tenant_id, ips, RowLock::Share).await
    }

    async fn find_account_by_name(&mut self, username: &str) -> AppResult<Option<SystemAccount>> {
        let tenant_id = self.tenant_id;
        fetch_account(self.connection()?, tenant_id, username, RowLock::Share).await
    }

    async fn save_ticket(&mut self, ticket: &Ticket) -> AppResult<()> {
        let tenant_id = self.tenant_id;
        let meta = meta_to_value(ticket.meta())?;

        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET title = $3,
                status = $4,
                action = $5,
                assignee_subject = $6,
                assignee_display_name = $7,
                meta = $8,
                updated_at = $9
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(ticket.id().as_uuid())
        .bind(ticket.title())
        .bind(ticket.status().as_str())
        .bind(ticket.action().map(|action| action.as_str()))
        .bind(ticket.assignee().map(|assignee| assignee.subject.as_str()))
        .bind(ticket.assignee().map(|assignee| assignee.display_name.as_str()))
        .bind(&meta)
        .bind(ticket.updated_at())
        .execute(self.connection()?)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to save ticket '{}' in tenant '{tenant_id}': {error}",
                ticket.id()
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "ticket '{}' does not exist for tenant '{tenant_id}'",
                ticket.id()
            )));
        }

        Ok(())
    }

    async fn create_grant(&mut self, grant: NewPermissionGrant) -> AppResult<PermissionGrant> {
        let tenant_id = self.tenant_id;
        let grant_id = PermissionGrantId::new();

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO permission_grants (id, tenant_id, name, created_by");
        if grant.valid_from.is_some() {
            builder.push(", valid_from");
        }
        if grant.valid_until.is_some() {
            builder.push(", valid_until");
        }
        builder.push(") VALUES (");
        {
            let mut values = builder.separated(", ");
            values.push_bind(grant_id.as_uuid());
            values.push_bind(tenant_id.as_uuid());
            values.push_bind(grant.name);
            values.push_bind(grant.created_by);
            if let Some(valid_from) = grant.valid_from {
                values.push_bind(valid_from);
            }
            if let Some(valid_until) = grant.valid_until {
                values.push_bind(valid_until);
            }
        }
        builder.push(") RETURNING id, name, created_by, valid_from, valid_until, created_at");

        let row = builder
            .build_query_as::<GrantRow>()
            .fetch_one(self.connection()?)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to create permission grant in tenant '{tenant_id}': {error}"
                ))
            })?;

        debug!(%tenant_id, %grant_id, "permission grant row created");
        Ok(grant_from_row(row))
    }

    async fn attach_hosts(&mut self, grant_id: PermissionGrantId, hosts: &[Host]) -> AppResult<()> {
        if hosts.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO permission_grant_hosts (grant_id, host_id) ");
        builder.push_values(hosts, |mut row, host| {
            row.push_bind(grant_id.as_uuid())
                .push_bind(host.id().as_uuid());
        });
        builder.push(" ON CONFLICT DO NOTHING");

        builder
            .build()
            .execute(self.connection()?)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to link hosts to permission grant '{grant_id}': {error}"
                ))
            })?;

        Ok(())
    }

    async fn attach_account(
        &mut self,
        grant_id: PermissionGrantId,
        account: &SystemAccount,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permission_grant_accounts (grant_id, account_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(grant_id.as_uuid())
        .bind(account.id().as_uuid())
        .execute(self.connection()?)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to link account '{}' to permission grant '{grant_id}': {error}",
                account.username()
            ))
        })?;

        Ok(())
    }

    async fn commit(&mut self) -> AppResult<()> {
        let tenant_id = self.tenant_id;
        let transaction = self.transaction.take().ok_or_else(|| {
            AppError::Internal("ticket transaction is already committed".to_owned())
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit ticket transaction in tenant '{tenant_id}': {error}"
            ))
        })
    }
}
