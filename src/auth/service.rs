//! Authentication service
//!
//! Password login, refresh-token rotation and revocation, account
//! registration and the bank approval workflow.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::OnceCell;
use validator::{Validate, ValidationErrors};

use crate::models::{
    ApplicantRegisterRequest, ApplicantRegistration, ApprovalDecision, BankProfile,
    NewApplicant, NewRefreshToken, NewUser, RegisterBankRequest, RegisterUserRequest, TokenPair,
    User, UserRole,
};
use crate::repository::{
    conflict_message, RefreshTokenRepository, Repositories, StoreError, UserRepository,
};
use crate::validation::check_identity;

use super::jwt::{hash_refresh_token, JwtError, TokenIssuer};
use super::password::{hash_password, verify_password, PasswordError};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Bank account is pending administrator approval")]
    PendingApproval { reason: Option<String> },

    #[error("Refresh token not found")]
    TokenNotFound,

    #[error("Refresh token expired or revoked")]
    TokenExpiredOrRevoked,

    #[error("User not found")]
    UserNotFound,

    #[error("User is not a bank account")]
    NotABankUser,

    #[error("Bank account approval has already been resolved")]
    ApprovalAlreadyResolved,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(constraint) => {
                AuthError::Conflict(conflict_message(&constraint).to_string())
            }
            other => AuthError::Store(other),
        }
    }
}

impl From<ValidationErrors> for AuthError {
    fn from(e: ValidationErrors) -> Self {
        AuthError::Validation(e.to_string())
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    issuer: TokenIssuer,
    bcrypt_cost: u32,
    /// Hash checked on unknown usernames so a miss costs as much as a wrong password
    dummy_hash: Arc<OnceCell<String>>,
}

const DUMMY_PASSWORD: &str = "challan-portal-unknown-user";

impl AuthService {
    pub fn new(repositories: &Repositories, issuer: TokenIssuer, bcrypt_cost: u32) -> Self {
        Self {
            users: repositories.users.clone(),
            refresh_tokens: repositories.refresh_tokens.clone(),
            issuer,
            bcrypt_cost,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Check credentials and open a new session
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            tracing::warn!(username = %username, "Login rejected: unknown username");
            let dummy_hash = self
                .dummy_hash
                .get_or_try_init(|| self.hash(DUMMY_PASSWORD))
                .await?;
            self.check_password(password, dummy_hash).await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !self.check_password(password, &user.password_hash).await? {
            tracing::warn!(user_id = user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        ensure_may_sign_in(&user)?;

        let tokens = self.start_session(&user).await?;
        tracing::info!(user_id = user.id, role = user.role.as_str(), "User logged in");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new pair, revoking the presented token
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let token_hash = hash_refresh_token(refresh_token);
        let stored = self
            .refresh_tokens
            .find_by_hash(&token_hash)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        let now = Utc::now();
        if !stored.is_usable(now) {
            tracing::warn!(user_id = stored.user_id, "Refresh rejected: token expired or revoked");
            return Err(AuthError::TokenExpiredOrRevoked);
        }

        let user = self
            .users
            .find_by_id(stored.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        ensure_may_sign_in(&user)?;

        let issued = self.issuer.issue(&user)?;
        let replacement = NewRefreshToken {
            user_id: user.id,
            token_hash: issued.refresh_token_hash,
            expiry_date: issued.refresh_expires_at,
        };

        // The conditional revoke inside `rotate` decides concurrent refreshes
        match self.refresh_tokens.rotate(&token_hash, now, replacement).await? {
            Some(_) => {
                tracing::info!(user_id = user.id, "Refresh token rotated");
                Ok(issued.pair)
            }
            None => {
                tracing::warn!(user_id = user.id, "Refresh rejected: token already rotated");
                Err(AuthError::TokenExpiredOrRevoked)
            }
        }
    }

    /// Revoke a refresh token; unknown or already revoked tokens are ignored
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        let revoked = self
            .refresh_tokens
            .revoke(&hash_refresh_token(refresh_token))
            .await?;
        if revoked {
            tracing::info!("Refresh token revoked");
        }
        Ok(())
    }

    /// Revoke every live refresh token of a user
    pub async fn revoke_all(&self, user_id: i64) -> Result<u64, AuthError> {
        let count = self.refresh_tokens.revoke_all_for_user(user_id).await?;
        tracing::info!(user_id, count, "Revoked all refresh tokens");
        Ok(count)
    }

    pub async fn current_user(&self, user_id: i64) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Self-service bank registration; the account waits for approval
    pub async fn register_bank(&self, request: RegisterBankRequest) -> Result<User, AuthError> {
        request.validate()?;

        let user = self
            .users
            .insert(NewUser {
                username: request.username.clone(),
                password_hash: self.hash(&request.password).await?,
                role: UserRole::Bank,
                is_approved: false,
                profile: request.profile(),
                approved_at: None,
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "Bank account registered, pending approval");
        Ok(user)
    }

    /// Create a public account together with its applicant profile and sign it in
    pub async fn register_public(
        &self,
        request: ApplicantRegisterRequest,
    ) -> Result<ApplicantRegistration, AuthError> {
        request.validate()?;
        check_identity(&request.cnic, &request.mobile_no)
            .map_err(|(_, message)| AuthError::Validation(message.to_string()))?;

        let password_hash = self.hash(&request.password).await?;
        let (user, applicant) = self
            .users
            .insert_with_applicant(
                NewUser {
                    username: request.username,
                    password_hash,
                    role: UserRole::Public,
                    is_approved: false,
                    profile: BankProfile::default(),
                    approved_at: None,
                },
                NewApplicant {
                    full_name: request.full_name,
                    cnic: request.cnic,
                    mobile_no: request.mobile_no,
                    email: request.email,
                    user_id: None,
                },
            )
            .await?;

        let tokens = self.start_session(&user).await?;
        tracing::info!(user_id = user.id, applicant_id = applicant.id, "Public account registered");

        Ok(ApplicantRegistration {
            tokens,
            username: user.username,
            full_name: applicant.full_name,
            cnic: applicant.cnic,
            mobile_no: applicant.mobile_no,
        })
    }

    /// Administrator-created Admin or Bank account, active immediately
    pub async fn register_admin_user(
        &self,
        request: RegisterUserRequest,
    ) -> Result<User, AuthError> {
        request.validate()?;

        let profile = match request.role {
            UserRole::Bank => request.profile,
            UserRole::Admin => BankProfile::default(),
            UserRole::Public => {
                return Err(AuthError::Validation(
                    "Public accounts are created through applicant registration".to_string(),
                ))
            }
        };

        let user = self
            .users
            .insert(NewUser {
                username: request.username,
                password_hash: self.hash(&request.password).await?,
                role: request.role,
                is_approved: true,
                profile,
                approved_at: Some(Utc::now()),
            })
            .await?;

        tracing::info!(user_id = user.id, role = user.role.as_str(), "Account created by administrator");
        Ok(user)
    }

    /// Seed the first administrator; returns whether an account was created
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        if let Some(existing) = self.users.find_by_username(username).await? {
            if existing.role != UserRole::Admin {
                tracing::warn!(username = %username, "Bootstrap admin username is taken by a non-admin account");
            }
            return Ok(false);
        }

        let inserted = self
            .users
            .insert(NewUser {
                username: username.to_string(),
                password_hash: self.hash(password).await?,
                role: UserRole::Admin,
                is_approved: true,
                profile: BankProfile::default(),
                approved_at: Some(Utc::now()),
            })
            .await;

        match inserted {
            Ok(user) => {
                tracing::info!(user_id = user.id, username = %username, "Bootstrap admin created");
                Ok(true)
            }
            // Another instance seeded it first
            Err(StoreError::Conflict(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Bank approval
    // ========================================================================

    pub async fn list_pending_banks(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.users.list_pending_banks().await?)
    }

    pub async fn approve(&self, user_id: i64) -> Result<User, AuthError> {
        let user = self.resolve(user_id, ApprovalDecision::Approve).await?;
        tracing::info!(user_id, "Bank account approved");
        Ok(user)
    }

    pub async fn reject(&self, user_id: i64, reason: &str) -> Result<User, AuthError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AuthError::Validation(
                "A rejection reason is required".to_string(),
            ));
        }

        let user = self
            .resolve(user_id, ApprovalDecision::Reject(reason.to_string()))
            .await?;
        tracing::info!(user_id, reason = %reason, "Bank account rejected");
        Ok(user)
    }

    async fn resolve(&self, user_id: i64, decision: ApprovalDecision) -> Result<User, AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.role != UserRole::Bank {
            return Err(AuthError::NotABankUser);
        }
        if !user.is_pending_bank() {
            return Err(AuthError::ApprovalAlreadyResolved);
        }

        // A concurrent decision may have landed since the read above
        self.users
            .resolve_approval(user_id, decision, Utc::now())
            .await?
            .ok_or(AuthError::ApprovalAlreadyResolved)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn start_session(&self, user: &User) -> Result<TokenPair, AuthError> {
        let issued = self.issuer.issue(user)?;
        self.refresh_tokens
            .insert(NewRefreshToken {
                user_id: user.id,
                token_hash: issued.refresh_token_hash,
                expiry_date: issued.refresh_expires_at,
            })
            .await?;
        Ok(issued.pair)
    }

    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        let hashed = tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(PasswordError::from)??;
        Ok(hashed)
    }

    async fn check_password(&self, password: &str, password_hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .map_err(PasswordError::from)??;
        Ok(matches)
    }
}

/// Bank accounts may not sign in until an administrator approves them
fn ensure_may_sign_in(user: &User) -> Result<(), AuthError> {
    if user.role == UserRole::Bank && !user.is_approved {
        return Err(AuthError::PendingApproval {
            reason: user.rejection_reason.clone(),
        });
    }
    Ok(())
}
