//! `agriportal-client`
//!
//! **Responsibility:** the session side of the portal client.
//!
//! This crate provides:
//! - A file-backed token store that survives restarts
//! - Session lifecycle (establish on login, destroy on logout or auth failure)
//! - Client-side throttling of login attempts and API calls
//!
//! The backend remains the authority; nothing here talks to the network.

pub mod manager;
pub mod store;
pub mod throttle;

pub use manager::{LoginResponse, SessionError, SessionManager};
pub use store::FileTokenStore;
pub use throttle::{LimitKind, RateDecision, RateLimiter};
