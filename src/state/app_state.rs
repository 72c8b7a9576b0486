//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthService, TokenIssuer};
use crate::catalog::FeeCatalog;
use crate::challan::ChallanService;
use crate::config::Config;
use crate::payment::PaymentVerifier;
use crate::repository::{Repositories, StoreHealth};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub token_issuer: Arc<TokenIssuer>,
    pub fee_catalog: Arc<FeeCatalog>,
    pub challan_service: Arc<ChallanService>,
    pub payment_verifier: Arc<PaymentVerifier>,
    pub store_health: Arc<dyn StoreHealth>,
}

impl AppState {
    /// Wire every service over one set of repositories
    pub fn new(repositories: Repositories, config: &Config) -> Self {
        let token_issuer = TokenIssuer::new(
            config.jwt_secret.clone(),
            config.jwt_access_token_ttl_seconds,
            config.jwt_refresh_token_ttl_days,
        );

        Self {
            auth_service: Arc::new(AuthService::new(
                &repositories,
                token_issuer.clone(),
                config.bcrypt_cost,
            )),
            token_issuer: Arc::new(token_issuer),
            fee_catalog: Arc::new(FeeCatalog::new(&repositories)),
            challan_service: Arc::new(ChallanService::new(&repositories)),
            payment_verifier: Arc::new(PaymentVerifier::new(&repositories)),
            store_health: repositories.health,
        }
    }
}

impl FromRef<AppState> for Arc<TokenIssuer> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.token_issuer.clone()
    }
}
