use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use warden_core::AppError;

use crate::middleware::{DISPLAY_NAME_HEADER, SUBJECT_HEADER, TENANT_HEADER};
use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState, cors_origin: Option<&str>) -> Result<Router, AppError> {
    let protected_routes = Router::new()
        .route("/api/tickets", get(handlers::tickets::list_tickets_handler))
        .route(
            "/api/tickets/grant-permission",
            post(handlers::tickets::submit_grant_permission_handler),
        )
        .route(
            "/api/tickets/asset-access",
            post(handlers::tickets::submit_asset_access_handler),
        )
        .route(
            "/api/tickets/{ticket_id}",
            get(handlers::tickets::get_ticket_handler)
                .patch(handlers::tickets::update_ticket_handler),
        )
        .route(
            "/api/tickets/{ticket_id}/approve",
            post(handlers::tickets::approve_ticket_handler),
        )
        .route(
            "/api/tickets/{ticket_id}/reject",
            post(handlers::tickets::reject_ticket_handler),
        )
        .route(
            "/api/tickets/{ticket_id}/close",
            post(handlers::tickets::close_ticket_handler),
        )
        .route(
            "/api/tickets/{ticket_id}/resolution",
            get(handlers::tickets::ticket_resolution_handler),
        )
        .route(
            "/api/grants/{grant_id}",
            get(handlers::grants::get_grant_handler),
        )
        .route_layer(from_fn(middleware::require_principal));

    let mut router = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http());

    if let Some(origin) = cors_origin {
        router = router.layer(cors_layer(origin)?);
    }

    Ok(router.with_state(app_state))
}

fn cors_layer(origin: &str) -> Result<CorsLayer, AppError> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|error| AppError::Validation(format!("invalid API_CORS_ORIGIN: {error}")))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(SUBJECT_HEADER),
            HeaderName::from_static(TENANT_HEADER),
            HeaderName::from_static(DISPLAY_NAME_HEADER),
        ]))
}
