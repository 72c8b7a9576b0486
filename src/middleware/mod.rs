//! Middleware for the challan portal API
//!
//! Request tracing and authentication extractors.

pub mod auth;
mod tracing;

pub use auth::{AdminUser, AuthenticatedUser, BankUser, PublicUser};
pub use tracing::request_tracing;
