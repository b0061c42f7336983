//! Warden API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dev_seed;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use warden_application::TicketService;
use warden_core::AppError;
use warden_infrastructure::{
    InMemoryAuditRepository, InMemoryTicketRepository, MIGRATOR, PostgresAuditRepository,
    PostgresTicketRepository,
};

use crate::api_config::{ApiConfig, StoreConfig, init_tracing};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let ticket_service = match &config.store {
        StoreConfig::Postgres { database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to connect to database: {error}"))
                })?;

            MIGRATOR
                .run(&pool)
                .await
                .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

            if config.migrate_only {
                info!("database migrations applied successfully");
                return Ok(());
            }

            if config.seed_dev_assets {
                warn!("WARDEN_SEED_DEV_ASSETS only applies to the memory store; ignoring");
            }

            let ticket_repository = Arc::new(PostgresTicketRepository::new(pool.clone()));
            TicketService::new(
                ticket_repository.clone(),
                ticket_repository,
                Arc::new(PostgresAuditRepository::new(pool)),
            )
        }
        StoreConfig::Memory => {
            if config.migrate_only {
                return Err(AppError::Validation(
                    "migrate requires WARDEN_STORE=postgres".to_owned(),
                ));
            }

            let ticket_repository = Arc::new(InMemoryTicketRepository::new());
            if config.seed_dev_assets {
                dev_seed::seed_inventory(&ticket_repository).await?;
            }

            warn!("using in-memory ticket store; data is lost on restart");
            TicketService::new(
                ticket_repository.clone(),
                ticket_repository,
                Arc::new(InMemoryAuditRepository::new()),
            )
        }
    };

    let app = api_router::build_router(AppState { ticket_service }, config.cors_origin.as_deref())?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "warden-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
