//! Shared fixtures for the integration tests
#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use challan_portal::challan::today;
use challan_portal::config::{Config, Environment};
use challan_portal::models::{
    AuthContext, FeeKind, FeeTitle, FeeTitleDraft, FeeTitleRequest, GenerateChallanRequest,
    RecheckingInput, RegisterBankRequest, UserRole,
};
use challan_portal::repository::Repositories;
use challan_portal::state::AppState;

pub const ADMIN_USERNAME: &str = "root-admin";
pub const ADMIN_PASSWORD: &str = "admin-password-1";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        environment: Environment::Development,
        port: 0,
        db_max_connections: 1,
        cors_allowed_origins: None,
        log_level: "warn".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        jwt_access_token_ttl_seconds: 7200,
        jwt_refresh_token_ttl_days: 7,
        bootstrap_admin: None,
        bcrypt_cost: 4,
    }
}

/// Services wired over a fresh in-memory store
pub struct TestApp {
    pub state: AppState,
    pub repos: Repositories,
}

impl TestApp {
    pub fn new() -> Self {
        let repos = Repositories::in_memory();
        let state = AppState::new(repos.clone(), &test_config());
        Self { state, repos }
    }

    /// Same as [`TestApp::new`] with the bootstrap admin seeded
    pub async fn with_admin() -> Self {
        let app = Self::new();
        app.state
            .auth_service
            .ensure_admin(ADMIN_USERNAME, ADMIN_PASSWORD)
            .await
            .unwrap();
        app
    }

    pub async fn flat_fee_title(&self, title: &str, amount: Decimal) -> FeeTitle {
        self.state
            .fee_catalog
            .create(FeeTitleRequest {
                title: title.to_string(),
                amount,
                fee_kind: FeeKind::Flat,
                has_expiry: false,
                expiry_date: None,
            })
            .await
            .unwrap()
    }

    pub async fn per_subject_fee_title(&self, title: &str, amount: Decimal) -> FeeTitle {
        self.state
            .fee_catalog
            .create(FeeTitleRequest {
                title: title.to_string(),
                amount,
                fee_kind: FeeKind::PerSubject,
                has_expiry: true,
                expiry_date: Some(today() + Duration::days(30)),
            })
            .await
            .unwrap()
    }

    /// Catalog validation refuses past dates, so this goes to the store directly
    pub async fn fee_title_expiring_on(&self, title: &str, expiry_date: NaiveDate) -> FeeTitle {
        self.repos
            .fee_titles
            .insert(FeeTitleDraft {
                title: title.to_string(),
                amount: Decimal::new(150_000, 2),
                fee_kind: FeeKind::Flat,
                has_expiry: true,
                expiry_date: Some(expiry_date),
            })
            .await
            .unwrap()
    }

    /// Register a bank account and approve it, returning its id
    pub async fn approved_bank(&self, username: &str) -> i64 {
        let user = self
            .state
            .auth_service
            .register_bank(bank_request(username))
            .await
            .unwrap();
        self.state.auth_service.approve(user.id).await.unwrap();
        user.id
    }
}

pub fn admin_context() -> AuthContext {
    AuthContext {
        user_id: 1,
        username: ADMIN_USERNAME.to_string(),
        role: UserRole::Admin,
    }
}

pub fn public_context(user_id: i64) -> AuthContext {
    AuthContext {
        user_id,
        username: format!("applicant-{}", user_id),
        role: UserRole::Public,
    }
}

pub fn bank_request(username: &str) -> RegisterBankRequest {
    RegisterBankRequest {
        username: username.to_string(),
        password: "bank-password-1".to_string(),
        bank_name: "HBL Mall Road".to_string(),
        branch_code: "0042".to_string(),
        contact_person: Some("Imran Ali".to_string()),
        contact_number: Some("0300-7654321".to_string()),
        email: Some("mallroad@hbl.example".to_string()),
    }
}

pub fn challan_request(fee_title_id: i64, cnic: &str) -> GenerateChallanRequest {
    GenerateChallanRequest {
        applicant_name: "Ayesha Khan".to_string(),
        cnic: cnic.to_string(),
        mobile_no: "0300-1234567".to_string(),
        email: None,
        fee_title_id,
        recheck: RecheckingInput::default(),
    }
}

pub fn recheck_request(
    fee_title_id: i64,
    cnic: &str,
    subjects: &[&str],
    number_of_subjects: i64,
) -> GenerateChallanRequest {
    GenerateChallanRequest {
        recheck: RecheckingInput {
            number_of_subjects: Some(number_of_subjects),
            subject_names: Some(subjects.iter().map(|s| s.to_string()).collect()),
            category: Some("Annual".to_string()),
            roll_no: Some("R-2024-118".to_string()),
        },
        ..challan_request(fee_title_id, cnic)
    }
}
