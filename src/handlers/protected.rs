use axum::{extract::Extension, http::Uri};
use serde::Serialize;

use crate::error::ApiError;
use crate::identity::Identity;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/session - identity the gate validated for this request
pub async fn session(identity: Option<Extension<Identity>>) -> ApiResult<Identity> {
    let Extension(identity) = identity.ok_or_else(|| ApiError::unauthorized("No validated session"))?;
    Ok(ApiResponse::success(identity))
}

#[derive(Debug, Serialize)]
pub struct PageView {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

/// Fallback for every page the gate let through. Stands in for the rendered dashboard page.
pub async fn page(uri: Uri, identity: Option<Extension<Identity>>) -> ApiResponse<PageView> {
    ApiResponse::success(PageView {
        path: uri.path().to_string(),
        identity: identity.map(|Extension(identity)| identity),
    })
}
