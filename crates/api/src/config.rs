//! Gateway configuration (environment driven).

use std::net::SocketAddr;

use thiserror::Error;

use agriportal_auth::LOGIN_PATH;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Paths the gateway routes itself; the login page may not live at or below them.
pub const RESERVED_PATHS: [&str; 6] = [
    "/health",
    "/dashboard",
    "/admin",
    "/employee",
    "/lab",
    "/session",
];

/// Characters the router would read as parameters, wildcards or a query.
const ROUTE_SYNTAX: [char; 6] = [':', '*', '?', '#', '{', '}'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    /// Where the guard sends users who may not enter a scope.
    pub login_path: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("AGRIPORTAL_BIND '{value}' is not a socket address: {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },

    #[error("AGRIPORTAL_LOGIN_PATH '{0}' must be an absolute literal path")]
    InvalidLoginPath(String),

    #[error("AGRIPORTAL_LOGIN_PATH '{path}' collides with the gateway route {reserved}")]
    ReservedLoginPath {
        path: String,
        reserved: &'static str,
    },
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            login_path: LOGIN_PATH.to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (tests pass a closure over a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup("AGRIPORTAL_BIND").unwrap_or_else(|| {
            tracing::warn!("AGRIPORTAL_BIND not set; using {DEFAULT_BIND_ADDR}");
            DEFAULT_BIND_ADDR.to_string()
        });
        let bind_addr = bind
            .trim()
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: bind.clone(),
                source,
            })?;

        let login_path = lookup("AGRIPORTAL_LOGIN_PATH")
            .map(|p| p.trim().to_string())
            .unwrap_or_else(|| LOGIN_PATH.to_string());
        validate_login_path(&login_path)?;

        Ok(Self {
            bind_addr,
            login_path,
        })
    }
}

fn validate_login_path(path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') || path.contains(ROUTE_SYNTAX) {
        return Err(ConfigError::InvalidLoginPath(path.to_string()));
    }

    let reserved = RESERVED_PATHS.into_iter().find(|r| {
        path.strip_prefix(r)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    });
    match reserved {
        Some(reserved) => Err(ConfigError::ReservedLoginPath {
            path: path.to_string(),
            reserved,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, GatewayConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = GatewayConfig::from_lookup(lookup(&[
            ("AGRIPORTAL_BIND", "127.0.0.1:9000"),
            ("AGRIPORTAL_LOGIN_PATH", "/auth-login"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.login_path, "/auth-login");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&[("AGRIPORTAL_BIND", "localhost")])),
            Err(ConfigError::InvalidBindAddr { .. })
        ));
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&[("AGRIPORTAL_LOGIN_PATH", "login")])),
            Err(ConfigError::InvalidLoginPath(_))
        ));
    }

    #[test]
    fn login_path_may_not_shadow_gateway_routes() {
        for path in RESERVED_PATHS {
            for candidate in [path.to_string(), format!("{path}/login")] {
                assert!(
                    matches!(
                        GatewayConfig::from_lookup(lookup(&[("AGRIPORTAL_LOGIN_PATH", candidate.as_str())])),
                        Err(ConfigError::ReservedLoginPath { .. })
                    ),
                    "{candidate}"
                );
            }
        }

        let cfg = GatewayConfig::from_lookup(lookup(&[("AGRIPORTAL_LOGIN_PATH", "/lab-login")]))
            .unwrap();
        assert_eq!(cfg.login_path, "/lab-login");
    }

    #[test]
    fn login_path_must_be_literal() {
        for path in ["/:page", "/auth/*rest", "/login?next=1", "/login#top", "/{page}"] {
            assert!(
                matches!(
                    GatewayConfig::from_lookup(lookup(&[("AGRIPORTAL_LOGIN_PATH", path)])),
                    Err(ConfigError::InvalidLoginPath(_))
                ),
                "{path}"
            );
        }
    }
}
