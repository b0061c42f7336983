use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use warden_application::{
    SubmitAssetAccessRequestInput, SubmitGrantPermissionRequestInput, TicketListQuery,
    TicketUpdateInput,
};
use warden_core::Principal;
use warden_domain::{GrantPermissionRequest, TicketId, TicketMetaPatch};

use crate::dto::{
    GrantResolutionResponse, SubmitAssetAccessRequest, SubmitGrantPermissionRequest,
    TicketActionResponse, TicketListQueryParams, TicketResponse, UpdateTicketRequest, parse_ips,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn submit_grant_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Json(payload): Json<SubmitGrantPermissionRequest>,
) -> ApiResult<(StatusCode, Json<TicketResponse>)> {
    let ticket = state
        .ticket_service
        .submit_grant_permission_request(
            &user,
            SubmitGrantPermissionRequestInput {
                title: payload.title,
                assignees: payload.assignees.into_iter().map(Into::into).collect(),
                request: GrantPermissionRequest {
                    name: payload.name,
                    ips: parse_ips(payload.ips)?,
                    system_user: payload.system_user,
                    date_start: payload.date_start,
                    date_expired: payload.date_expired,
                },
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}

pub async fn submit_asset_access_handler(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Json(payload): Json<SubmitAssetAccessRequest>,
) -> ApiResult<(StatusCode, Json<TicketResponse>)> {
    let ticket = state
        .ticket_service
        .submit_asset_access_request(
            &user,
            SubmitAssetAccessRequestInput {
                title: payload.title,
                assignees: payload.assignees.into_iter().map(Into::into).collect(),
                ips: parse_ips(payload.ips)?,
                host_name: payload.host_name,
                date_start: payload.date_start,
                date_expired: payload.date_expired,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}

pub async fn list_tickets_handler(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Query(query): Query<TicketListQueryParams>,
) -> ApiResult<Json<Vec<TicketResponse>>> {
    let tickets = state
        .ticket_service
        .list_tickets(&user, TicketListQuery::try_from(query)?)
        .await?
        .into_iter()
        .map(TicketResponse::from)
        .collect();

    Ok(Json(tickets))
}

pub async fn get_ticket_handler(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Json<TicketResponse>> {
    let ticket = state
        .ticket_service
        .get_ticket(&user, TicketId::parse(ticket_id.as_str())?)
        .await?;

    Ok(Json(TicketResponse::from(ticket)))
}

pub async fn update_ticket_handler(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(ticket_id): Path<String>,
    Json(payload): Json<UpdateTicketRequest>,
) -> ApiResult<Json<TicketActionResponse>> {
    let input = TicketUpdateInput {
        title: payload.title,
        meta: payload.meta.map(TicketMetaPatch::try_from).transpose()?,
        action: payload.action.as_deref().map(str::parse).transpose()?,
    };

    let outcome = state
        .ticket_service
        .update_ticket(&user, TicketId::parse(ticket_id.as_str())?, input)
        .await?;

    Ok(Json(TicketActionResponse::from(outcome)))
}

pub async fn approve_ticket_handler(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Json<TicketActionResponse>> {
    let outcome = state
        .ticket_service
        .approve(&user, TicketId::parse(ticket_id.as_str())?)
        .await?;

    Ok(Json(TicketActionResponse::from(outcome)))
}

pub async fn reject_ticket_handler(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Json<TicketActionResponse>> {
    let outcome = state
        .ticket_service
        .reject(&user, TicketId::parse(ticket_id.as_str())?)
        .await?;

    Ok(Json(TicketActionResponse::from(outcome)))
}

pub async fn close_ticket_handler(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Json<TicketResponse>> {
    let ticket = state
        .ticket_service
        .close_ticket(&user, TicketId::parse(ticket_id.as_str())?)
        .await?;

    Ok(Json(TicketResponse::from(ticket)))
}

pub async fn ticket_resolution_handler(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Json<GrantResolutionResponse>> {
    let preview = state
        .ticket_service
        .preview_grant_resolution(&user, TicketId::parse(ticket_id.as_str())?)
        .await?;

    Ok(Json(GrantResolutionResponse::from(preview)))
}
