use axum::Json;
use axum::extract::{Extension, Path, State};
use uuid::Uuid;
use warden_core::{AppError, Principal};
use warden_domain::PermissionGrantId;

use crate::dto::PermissionGrantResponse;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn get_grant_handler(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(grant_id): Path<String>,
) -> ApiResult<Json<PermissionGrantResponse>> {
    let grant_id = Uuid::parse_str(grant_id.as_str())
        .map(PermissionGrantId::from_uuid)
        .map_err(|error| {
            AppError::Validation(format!("invalid permission grant id '{grant_id}': {error}"))
        })?;

    let grant = state.ticket_service.get_grant(&user, grant_id).await?;
    Ok(Json(PermissionGrantResponse::from(grant)))
}
