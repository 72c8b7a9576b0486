//! Login, refresh rotation, registration and bank approval

mod common;

#[cfg(test)]
mod tests {
    use challan_portal::auth::AuthError;
    use challan_portal::models::{
        ApplicantRegisterRequest, BankProfile, RegisterUserRequest, UserRole,
    };

    use crate::common::{bank_request, TestApp, ADMIN_PASSWORD, ADMIN_USERNAME};

    fn applicant_request(username: &str, cnic: &str) -> ApplicantRegisterRequest {
        ApplicantRegisterRequest {
            username: username.to_string(),
            password: "applicant-pass".to_string(),
            full_name: "Bilal Ahmed".to_string(),
            cnic: cnic.to_string(),
            mobile_no: "0321-7654321".to_string(),
            email: None,
        }
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_rejected() {
        let app = TestApp::with_admin().await;

        let result = app.state.auth_service.login(ADMIN_USERNAME, "not-it").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));

        let result = app.state.auth_service.login("nobody", ADMIN_PASSWORD).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_admin_login_issues_verifiable_tokens() {
        let app = TestApp::with_admin().await;

        let pair = app
            .state
            .auth_service
            .login(ADMIN_USERNAME, ADMIN_PASSWORD)
            .await
            .unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 7200);

        let claims = app.state.token_issuer.verify_access_token(&pair.access_token).unwrap();
        let context = claims.into_context().unwrap();
        assert_eq!(context.username, ADMIN_USERNAME);
        assert_eq!(context.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_bank_cannot_log_in_until_approved() {
        let app = TestApp::with_admin().await;
        let auth = &app.state.auth_service;

        let bank = auth.register_bank(bank_request("hbl-mall")).await.unwrap();
        assert!(!bank.is_approved);

        let pending = auth.list_pending_banks().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, bank.id);

        let result = auth.login("hbl-mall", "bank-password-1").await;
        assert!(matches!(
            result,
            Err(AuthError::PendingApproval { reason: None })
        ));

        let approved = auth.approve(bank.id).await.unwrap();
        assert!(approved.is_approved);
        assert!(approved.approved_at.is_some());
        assert!(auth.list_pending_banks().await.unwrap().is_empty());

        assert!(auth.login("hbl-mall", "bank-password-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_rejection_reason_is_reported_on_login() {
        let app = TestApp::new();
        let auth = &app.state.auth_service;

        let bank = auth.register_bank(bank_request("mcb-gulberg")).await.unwrap();
        auth.reject(bank.id, "  Branch code not on file  ").await.unwrap();

        match auth.login("mcb-gulberg", "bank-password-1").await {
            Err(AuthError::PendingApproval { reason }) => {
                assert_eq!(reason.as_deref(), Some("Branch code not on file"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reject_requires_a_reason() {
        let app = TestApp::new();
        let auth = &app.state.auth_service;

        let bank = auth.register_bank(bank_request("ubl-saddar")).await.unwrap();
        assert!(matches!(
            auth.reject(bank.id, "   ").await,
            Err(AuthError::Validation(_))
        ));
        assert_eq!(auth.list_pending_banks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_approval_is_resolved_once() {
        let app = TestApp::with_admin().await;
        let auth = &app.state.auth_service;

        let bank = auth.register_bank(bank_request("abl-cantt")).await.unwrap();
        auth.approve(bank.id).await.unwrap();

        assert!(matches!(
            auth.approve(bank.id).await,
            Err(AuthError::ApprovalAlreadyResolved)
        ));
        assert!(matches!(
            auth.reject(bank.id, "Too late").await,
            Err(AuthError::ApprovalAlreadyResolved)
        ));
    }

    #[tokio::test]
    async fn test_only_bank_accounts_can_be_approved() {
        let app = TestApp::with_admin().await;
        let auth = &app.state.auth_service;
        let admin = auth.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let admin_id = app
            .state
            .token_issuer
            .verify_access_token(&admin.access_token)
            .unwrap()
            .into_context()
            .unwrap()
            .user_id;

        assert!(matches!(
            auth.approve(admin_id).await,
            Err(AuthError::NotABankUser)
        ));
        assert!(matches!(
            auth.approve(9_999).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_refresh_token_rotates_once() {
        let app = TestApp::with_admin().await;
        let auth = &app.state.auth_service;

        let first = auth.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let second = auth.refresh(&first.refresh_token).await.unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        // The presented token was revoked by the rotation
        assert!(matches!(
            auth.refresh(&first.refresh_token).await,
            Err(AuthError::TokenExpiredOrRevoked)
        ));
        assert!(auth.refresh(&second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_has_one_winner() {
        let app = TestApp::with_admin().await;
        let auth = &app.state.auth_service;

        let pair = auth.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let (a, b) = tokio::join!(
            auth.refresh(&pair.refresh_token),
            auth.refresh(&pair.refresh_token)
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_refresh_token() {
        let app = TestApp::new();
        assert!(matches!(
            app.state.auth_service.refresh("not-a-real-token").await,
            Err(AuthError::TokenNotFound)
        ));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let app = TestApp::with_admin().await;
        let auth = &app.state.auth_service;

        let pair = auth.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        auth.revoke(&pair.refresh_token).await.unwrap();
        auth.revoke(&pair.refresh_token).await.unwrap();
        auth.revoke("never-issued").await.unwrap();

        assert!(matches!(
            auth.refresh(&pair.refresh_token).await,
            Err(AuthError::TokenExpiredOrRevoked)
        ));
    }

    #[tokio::test]
    async fn test_revoke_all_ends_every_session() {
        let app = TestApp::with_admin().await;
        let auth = &app.state.auth_service;

        let first = auth.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let second = auth.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let user_id = app
            .state
            .token_issuer
            .verify_access_token(&first.access_token)
            .unwrap()
            .into_context()
            .unwrap()
            .user_id;

        assert_eq!(auth.revoke_all(user_id).await.unwrap(), 2);
        assert_eq!(auth.revoke_all(user_id).await.unwrap(), 0);

        for token in [first.refresh_token, second.refresh_token] {
            assert!(auth.refresh(&token).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_public_registration_signs_in() {
        let app = TestApp::new();
        let auth = &app.state.auth_service;

        let registration = auth
            .register_public(applicant_request("bilal", "35202-1234567-1"))
            .await
            .unwrap();
        assert_eq!(registration.username, "bilal");
        assert_eq!(registration.cnic, "35202-1234567-1");

        let context = app
            .state
            .token_issuer
            .verify_access_token(&registration.tokens.access_token)
            .unwrap()
            .into_context()
            .unwrap();
        assert_eq!(context.role, UserRole::Public);

        let applicant = app
            .repos
            .applicants
            .find_by_cnic("35202-1234567-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(applicant.user_id, Some(context.user_id));

        // Public accounts need no approval
        assert!(auth.login("bilal", "applicant-pass").await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_username_and_cnic_conflict() {
        let app = TestApp::new();
        let auth = &app.state.auth_service;

        auth.register_public(applicant_request("bilal", "35202-1234567-1"))
            .await
            .unwrap();

        match auth
            .register_public(applicant_request("bilal", "35202-7654321-1"))
            .await
        {
            Err(AuthError::Conflict(message)) => assert_eq!(message, "Username already exists"),
            other => panic!("unexpected: {:?}", other),
        }

        match auth
            .register_public(applicant_request("bilal-2", "35202-1234567-1"))
            .await
        {
            Err(AuthError::Conflict(message)) => {
                assert_eq!(message, "An applicant with this CNIC is already registered")
            }
            other => panic!("unexpected: {:?}", other),
        }

        // The failed attempt left no account behind
        assert!(matches!(
            auth.login("bilal-2", "applicant-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_registration_checks_identity_formats() {
        let app = TestApp::new();
        let auth = &app.state.auth_service;

        let result = auth
            .register_public(applicant_request("bilal", "3520212345671"))
            .await;
        assert!(matches!(result, Err(AuthError::Validation(_))));

        let mut request = applicant_request("bilal", "35202-1234567-1");
        request.mobile_no = "03217654321".to_string();
        assert!(matches!(
            auth.register_public(request).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let app = TestApp::new();
        let auth = &app.state.auth_service;

        assert!(auth.ensure_admin(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap());
        assert!(!auth.ensure_admin(ADMIN_USERNAME, "other-password").await.unwrap());

        // The original password still works
        assert!(auth.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.is_ok());
    }

    #[tokio::test]
    async fn test_admin_created_bank_is_active() {
        let app = TestApp::with_admin().await;
        let auth = &app.state.auth_service;

        let user = auth
            .register_admin_user(RegisterUserRequest {
                username: "meezan-dha".to_string(),
                password: "bank-password-1".to_string(),
                role: UserRole::Bank,
                profile: BankProfile {
                    bank_name: Some("Meezan DHA".to_string()),
                    branch_code: Some("0107".to_string()),
                    ..BankProfile::default()
                },
            })
            .await
            .unwrap();

        assert!(user.is_approved);
        assert_eq!(user.profile.branch_code.as_deref(), Some("0107"));
        assert!(auth.login("meezan-dha", "bank-password-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_admin_cannot_create_public_accounts() {
        let app = TestApp::new();

        let result = app
            .state
            .auth_service
            .register_admin_user(RegisterUserRequest {
                username: "walk-in".to_string(),
                password: "walk-in-pass".to_string(),
                role: UserRole::Public,
                profile: BankProfile::default(),
            })
            .await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }
}
