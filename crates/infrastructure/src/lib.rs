//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_repository;
mod in_memory_ticket_repository;
mod postgres_audit_repository;
mod postgres_ticket_repository;

pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use in_memory_ticket_repository::InMemoryTicketRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_ticket_repository::PostgresTicketRepository;

/// Migrations for every PostgreSQL adapter in this crate.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[cfg(test)]
async fn postgres_test_pool() -> Option<sqlx::PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres adapter tests: {error}");
    }

    Some(pool)
}
