//! Handlers for the role-scoped subtrees. Rendering lives in the frontend;
//! the gateway only confirms who entered where.

use axum::{extract::Extension, http::Uri, response::IntoResponse, Json};

use crate::context::{PortalContext, RequestContext};

pub async fn page(
    Extension(portal): Extension<PortalContext>,
    Extension(request): Extension<RequestContext>,
    uri: Uri,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "scope": portal.scope().as_str(),
        "role": portal.role().as_str(),
        "path": uri.path(),
        "request_id": request.request_id().to_string(),
    }))
}
