//! HTTP API layer for courier.
//!
//! This crate provides the REST surface over the core services:
//!
//! - **Endpoints**: feed, read-state mutation, unread count, admin authoring
//! - **Extractors**: bearer-token authentication
//! - **Middleware**: application state and auth
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
