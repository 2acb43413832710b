//! HTTP application wiring (Axum router).
//!
//! - `routes/`: HTTP routes + handlers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use agriportal_auth::{RoleCompatibilityTable, RouteGuard, Scope};

use crate::config::GatewayConfig;
use crate::middleware::{self, ScopeGuardState};

pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &GatewayConfig) -> Router {
    let table = Arc::new(RoleCompatibilityTable::default());
    let guard = Arc::new(RouteGuard::new(table).with_login_path(config.login_path.clone()));
    build_app_with_guard(guard)
}

/// Build the router around an explicit guard (custom tables, tests).
///
/// The guard's login path is registered as a literal route and must not
/// overlap [`RESERVED_PATHS`](crate::config::RESERVED_PATHS).
pub fn build_app_with_guard(guard: Arc<RouteGuard>) -> Router {
    let protected = Router::new()
        .merge(scoped("/admin", Scope::admin(), &guard))
        .merge(scoped("/employee", Scope::employee(), &guard))
        .merge(scoped("/lab", Scope::lab(), &guard))
        .merge(
            Router::new()
                .route("/dashboard", get(routes::portal::page))
                .route_layer(axum::middleware::from_fn_with_state(
                    ScopeGuardState {
                        guard: guard.clone(),
                        scope: Scope::user(),
                    },
                    middleware::scope_guard,
                )),
        );

    Router::new()
        .route("/health", get(routes::system::health))
        .route(guard.login_path(), get(routes::system::login_page))
        .nest("/session", routes::session::router())
        .merge(protected)
        .fallback(routes::system::not_found)
        .layer(Extension(guard))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::request_context)))
}

/// `prefix` and everything below it, behind the guard for `scope`.
fn scoped(prefix: &str, scope: Scope, guard: &Arc<RouteGuard>) -> Router {
    Router::new()
        .route(prefix, get(routes::portal::page))
        .route(&format!("{prefix}/*rest"), get(routes::portal::page))
        .route_layer(axum::middleware::from_fn_with_state(
            ScopeGuardState {
                guard: guard.clone(),
                scope,
            },
            middleware::scope_guard,
        ))
}
