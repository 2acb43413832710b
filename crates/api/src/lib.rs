//! HTTP gateway: serves the role-scoped portal subtrees behind the route guard.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
pub mod navigator;
