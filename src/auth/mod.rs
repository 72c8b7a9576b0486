//! Authentication for the challan portal
//!
//! - Password login with bcrypt hashes
//! - Short-lived JWT access tokens
//! - Single-use refresh tokens, stored as SHA-256 digests and rotated on use
//! - Approval gating for bank accounts

mod jwt;
mod password;
mod service;

pub use jwt::{hash_refresh_token, Claims, IssuedTokens, JwtError, TokenIssuer};
pub use password::{hash_password, verify_password, PasswordError};
pub use service::{AuthError, AuthService};
