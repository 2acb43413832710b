use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use agriportal_auth::{
    CanonicalRole, GuardAction, Location, Navigator, RouteGuard, Scope, SessionProvider,
};
use agriportal_core::RequestId;

use crate::context::{CookieSession, PortalContext, RequestContext};
use crate::navigator::HttpNavigator;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-subtree guard configuration.
#[derive(Clone)]
pub struct ScopeGuardState {
    pub guard: Arc<RouteGuard>,
    pub scope: Scope,
}

/// Run the route guard for the subtree's scope before the handler.
pub async fn scope_guard(
    State(state): State<ScopeGuardState>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = CookieSession::from_headers(req.headers());
    let location = Location {
        path: req.uri().path().to_string(),
        query: req.uri().query().map(str::to_string),
    };

    let decision = state.guard.evaluate(&session, &state.scope, &location);

    match decision.action {
        GuardAction::Render => {
            tracing::debug!(scope = %state.scope, path = %location.path, "guard passed");
            let role = CanonicalRole::from_optional(session.role().as_deref());
            req.extensions_mut()
                .insert(PortalContext::new(state.scope.clone(), role));
            next.run(req).await
        }
        GuardAction::Redirect(redirect) => {
            tracing::info!(
                scope = %state.scope,
                path = %location.path,
                outcome = decision.state.as_str(),
                "guard redirected to login"
            );
            HttpNavigator.redirect(&redirect.path, redirect.replace, redirect.preserved.as_ref())
        }
    }
}

/// Attach a correlation id, a tracing span and the `x-request-id` header.
pub async fn request_context(mut req: Request, next: Next) -> Response {
    let request_id = RequestId::new();
    req.extensions_mut().insert(RequestContext::new(request_id));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut res = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}
