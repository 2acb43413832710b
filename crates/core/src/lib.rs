//! `agriportal-core`: shared primitives for the portal session gate.
//!
//! This crate contains no I/O and no HTTP concerns.

pub mod error;
pub mod id;

pub use error::PortalError;
pub use id::{RequestId, UserId};
