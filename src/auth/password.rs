//! Password hashing

use thiserror::Error;

#[derive(Error, Debug)]
#[error("Password hashing failed: {0}")]
pub struct PasswordError(String);

impl From<bcrypt::BcryptError> for PasswordError {
    fn from(e: bcrypt::BcryptError) -> Self {
        PasswordError(e.to_string())
    }
}

impl From<tokio::task::JoinError> for PasswordError {
    fn from(e: tokio::task::JoinError) -> Self {
        PasswordError(e.to_string())
    }
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Returns `Ok(false)` on a mismatch; errors only on a malformed stored hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, PasswordError> {
    Ok(bcrypt::verify(password, password_hash)?)
}
