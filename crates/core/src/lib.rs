//! Core business logic for courier.

pub mod services;

pub use services::*;
