//! Turns guard redirects into HTTP responses.

use axum::response::{IntoResponse, Redirect, Response};

use agriportal_auth::{Location, Navigator};

/// Query parameter carrying the preserved location to the login page.
pub const FROM_PARAM: &str = "from";

/// [`Navigator`] for the HTTP gateway.
///
/// `replace` maps to `303 See Other` (the browser follows with a GET and does
/// not keep the protected URL as the current entry); a push maps to `307`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpNavigator;

impl HttpNavigator {
    pub fn target(path: &str, preserved: Option<&Location>) -> String {
        let Some(location) = preserved else {
            return path.to_string();
        };

        match serde_urlencoded::to_string([(FROM_PARAM, location.to_string())]) {
            Ok(query) => {
                let sep = if path.contains('?') { '&' } else { '?' };
                format!("{path}{sep}{query}")
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode preserved location; dropping it");
                path.to_string()
            }
        }
    }
}

impl Navigator for HttpNavigator {
    type Output = Response;

    fn redirect(&self, path: &str, replace: bool, preserved: Option<&Location>) -> Response {
        let target = Self::target(path, preserved);
        if replace {
            Redirect::to(&target).into_response()
        } else {
            Redirect::temporary(&target).into_response()
        }
    }
}
