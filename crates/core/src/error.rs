//! Portal-wide error model.

use thiserror::Error;

/// Portal-level error.
///
/// Authorization outcomes are *not* errors (the route guard returns them as
/// values). This covers malformed input handed to the portal primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortalError {
    /// A value failed validation (e.g. an unknown login kind).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl PortalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
