//! Session endpoints: post-login landing, logout, and guard introspection.
//!
//! `/session/explain` answers "why was I sent to the login page?" for the
//! caller's own cookies; it never reveals anything about other sessions.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use agriportal_auth::{CanonicalRole, Location, RouteGuard, Scope, SessionProvider};

use crate::app::errors;
use crate::context::{CookieSession, ROLE_COOKIE, TOKEN_COOKIE};

pub fn router() -> Router {
    Router::new()
        .route("/landing", get(landing))
        .route("/logout", post(logout))
        .route("/explain", get(explain))
        .route("/scopes", get(list_scopes))
}

/// GET /session/landing - send the caller to their role's dashboard.
pub async fn landing(Extension(guard): Extension<Arc<RouteGuard>>, headers: HeaderMap) -> Response {
    let session = CookieSession::from_headers(&headers);

    let has_token = session.token().is_some_and(|t| !t.trim().is_empty());
    if !has_token {
        return Redirect::to(guard.login_path()).into_response();
    }

    let role = CanonicalRole::from_optional(session.role().as_deref());
    let target = guard
        .table()
        .landing_path(&role)
        .unwrap_or(guard.login_path());

    tracing::debug!(role = %role, landing = target, "landing redirect");
    Redirect::to(target).into_response()
}

/// POST /session/logout - expire the session cookies and go to login.
pub async fn logout(Extension(guard): Extension<Arc<RouteGuard>>) -> Response {
    let mut res = Redirect::to(guard.login_path()).into_response();
    for name in [TOKEN_COOKIE, ROLE_COOKIE] {
        let cookie = format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            res.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    tracing::info!("session cookies cleared");
    res
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub scope: String,
    pub path: Option<String>,
}

/// GET /session/explain?scope=LAB - the guard's decision for the caller.
pub async fn explain(
    Extension(guard): Extension<Arc<RouteGuard>>,
    Query(query): Query<ExplainQuery>,
    headers: HeaderMap,
) -> Response {
    let scope = Scope::new(&query.scope);
    if scope.as_str().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_scope", "scope must not be empty");
    }

    let session = CookieSession::from_headers(&headers);
    let location = Location::new(query.path.unwrap_or_else(|| "/".to_string()));
    let decision = guard.evaluate(&session, &scope, &location);
    let role = CanonicalRole::from_optional(session.role().as_deref());
    let allowed_set = guard.table().allowed(&scope);
    let allowed: Vec<&str> = allowed_set.iter().map(|r| r.as_str()).collect();

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "scope": scope.as_str(),
            "role": role.as_str(),
            "allowed_roles": allowed,
            "state": decision.state,
            "decision": decision.action,
        })),
    )
        .into_response()
}

/// GET /session/scopes - the compatibility table.
pub async fn list_scopes(Extension(guard): Extension<Arc<RouteGuard>>) -> impl IntoResponse {
    let scopes: Vec<_> = guard.table().entries().cloned().collect();
    Json(serde_json::json!({ "scopes": scopes }))
}
