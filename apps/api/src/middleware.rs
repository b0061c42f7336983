use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;
use warden_core::{AppError, Principal, TenantId};

use crate::error::ApiResult;

pub const SUBJECT_HEADER: &str = "x-warden-subject";
pub const TENANT_HEADER: &str = "x-warden-tenant";
pub const DISPLAY_NAME_HEADER: &str = "x-warden-display-name";

/// Builds the acting principal from headers set by the trusted gateway.
pub async fn require_principal(mut request: Request, next: Next) -> ApiResult<Response> {
    let principal = principal_from_headers(request.headers())?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, AppError> {
    let subject = header_value(headers, SUBJECT_HEADER)?
        .ok_or_else(|| AppError::Unauthorized(format!("{SUBJECT_HEADER} header is required")))?;
    let tenant = header_value(headers, TENANT_HEADER)?
        .ok_or_else(|| AppError::Unauthorized(format!("{TENANT_HEADER} header is required")))?;
    let tenant_id = Uuid::parse_str(tenant.as_str())
        .map(TenantId::from_uuid)
        .map_err(|error| AppError::Unauthorized(format!("invalid {TENANT_HEADER}: {error}")))?;

    let display_name =
        header_value(headers, DISPLAY_NAME_HEADER)?.unwrap_or_else(|| subject.clone());

    Ok(Principal::new(subject, display_name, tenant_id))
}

fn header_value(headers: &HeaderMap, name: &str) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized(format!("{name} header must be visible ASCII")))?
        .trim();

    Ok((!value.is_empty()).then(|| value.to_owned()))
}
