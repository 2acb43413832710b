use axum::{
    extract::Query,
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::app::errors;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub from: Option<String>,
}

/// GET /login - public; echoes where the user will be sent back to.
pub async fn login_page(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    Json(serde_json::json!({
        "page": "login",
        "from": query.from,
    }))
}

pub async fn not_found(uri: Uri) -> axum::response::Response {
    errors::json_error(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("no route for {}", uri.path()),
    )
}
