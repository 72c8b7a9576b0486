//! Store behavior against a real Postgres database
//!
//! Run with `TEST_DATABASE_URL` pointing at a disposable database and
//! `--ignored --test-threads=1`; every test truncates the schema first.

mod common;

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use sqlx::PgPool;

    use challan_portal::auth::AuthError;
    use challan_portal::catalog::CatalogError;
    use challan_portal::db;
    use challan_portal::models::BranchInfo;
    use challan_portal::payment::PaymentError;
    use challan_portal::repository::Repositories;
    use challan_portal::state::AppState;

    use crate::common::{admin_context, bank_request, challan_request, test_config};

    /// Helper to create a migrated, empty test database
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/challan_portal_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(4)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        db::run_migrations(&pool).await.expect("Failed to migrate");

        sqlx::query(
            "TRUNCATE bank_transactions, challans, applicants, fee_titles, refresh_tokens, users RESTART IDENTITY CASCADE",
        )
        .execute(&pool)
        .await
        .expect("Failed to truncate");

        pool
    }

    fn state(pool: PgPool) -> AppState {
        AppState::new(Repositories::postgres(pool), &test_config())
    }

    async fn tuition(state: &AppState) -> i64 {
        state
            .fee_catalog
            .create(challan_portal::models::FeeTitleRequest {
                title: "Tuition".to_string(),
                amount: dec!(1000),
                fee_kind: Default::default(),
                has_expiry: false,
                expiry_date: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_concurrent_payments_settle_once() {
        let state = state(setup_test_db().await);
        let fee_title_id = tuition(&state).await;
        let challan_no = state
            .challan_service
            .generate(&admin_context(), challan_request(fee_title_id, "35202-1234567-1"))
            .await
            .unwrap()
            .challan
            .challan_no;

        let branch = || BranchInfo {
            branch_name: "Main Branch".to_string(),
            branch_code: "001".to_string(),
        };
        let verifier = state.payment_verifier.clone();
        let other = state.payment_verifier.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { verifier.pay(challan_no, branch()).await }),
            tokio::spawn(async move { other.pay(challan_no, branch()).await }),
        );
        let results = [a.unwrap(), b.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(PaymentError::AlreadyPaid { .. }))));
        assert_eq!(
            state
                .payment_verifier
                .transactions(challan_no)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_unique_constraints_map_to_conflicts() {
        let state = state(setup_test_db().await);

        state
            .auth_service
            .register_bank(bank_request("hbl-mall"))
            .await
            .unwrap();
        match state.auth_service.register_bank(bank_request("hbl-mall")).await {
            Err(AuthError::Conflict(message)) => assert_eq!(message, "Username already exists"),
            other => panic!("unexpected: {:?}", other),
        }

        let fee_title_id = tuition(&state).await;
        state
            .challan_service
            .generate(&admin_context(), challan_request(fee_title_id, "35202-1234567-1"))
            .await
            .unwrap();
        assert!(matches!(
            state.fee_catalog.delete(fee_title_id).await,
            Err(CatalogError::Conflict(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_refresh_rotation_persists() {
        let state = state(setup_test_db().await);
        let auth = &state.auth_service;

        assert!(auth.ensure_admin("root-admin", "admin-password-1").await.unwrap());
        let pair = auth.login("root-admin", "admin-password-1").await.unwrap();
        auth.refresh(&pair.refresh_token).await.unwrap();

        assert!(matches!(
            auth.refresh(&pair.refresh_token).await,
            Err(AuthError::TokenExpiredOrRevoked)
        ));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_health_ping() {
        let state = state(setup_test_db().await);
        assert!(state.store_health.ping().await.is_ok());
    }
}
