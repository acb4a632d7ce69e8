mod common;

use anyhow::Result;
use cash_manager::application::{AppError, LedgerService};
use cash_manager::domain::ValidationError;
use cash_manager::identity::AuthError;
use tempfile::TempDir;

use common::{register, registration, test_options, test_service, PASSWORD};

#[tokio::test]
async fn test_register_creates_profile_and_signs_in() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let user = register(&service, "Ada Lovelace", "Ada@Example.com").await?;
    assert_eq!(user.full_name, "Ada Lovelace");
    assert_eq!(user.email, "ada@example.com");

    let current = service.current_user().expect("registration signs the user in");
    assert_eq!(current.uid, user.id);

    let profile = service.profile(&user.id).await?;
    assert_eq!(profile, Some(user));

    Ok(())
}

#[tokio::test]
async fn test_register_password_mismatch() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let mut request = registration("Ada Lovelace", "ada@example.com");
    request.confirm_password = "something else".into();

    let result = service.register(request).await;
    assert!(matches!(
        result,
        Err(AppError::Validation(ValidationError::PasswordMismatch))
    ));
    assert!(service.current_user().is_none());

    // No account was created
    let sign_in = service.sign_in("ada@example.com", PASSWORD).await;
    assert!(matches!(
        sign_in,
        Err(AppError::Auth(AuthError::InvalidCredentials))
    ));

    Ok(())
}

#[tokio::test]
async fn test_register_requires_full_name() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service.register(registration("   ", "ada@example.com")).await;
    assert!(matches!(
        result,
        Err(AppError::Validation(ValidationError::MissingField(_)))
    ));

    Ok(())
}

#[tokio::test]
async fn test_register_duplicate_email() -> Result<()> {
    let (service, _temp) = test_service().await?;
    register(&service, "Ada Lovelace", "ada@example.com").await?;

    let result = service
        .register(registration("Someone Else", "ADA@example.com"))
        .await;
    assert!(matches!(
        result,
        Err(AppError::Auth(AuthError::EmailAlreadyInUse(_)))
    ));

    Ok(())
}

#[tokio::test]
async fn test_register_rejects_weak_password_and_bad_email() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let mut weak = registration("Ada Lovelace", "ada@example.com");
    weak.password = "12345".into();
    weak.confirm_password = "12345".into();
    assert!(matches!(
        service.register(weak).await,
        Err(AppError::Auth(AuthError::WeakPassword))
    ));

    let bad_email = registration("Ada Lovelace", "not-an-email");
    assert!(matches!(
        service.register(bad_email).await,
        Err(AppError::Auth(AuthError::InvalidEmail(_)))
    ));

    Ok(())
}

#[tokio::test]
async fn test_sign_in_and_out() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = register(&service, "Ada Lovelace", "ada@example.com").await?;

    service.sign_out().await?;
    assert!(service.current_user().is_none());

    let wrong = service.sign_in("ada@example.com", "wrong password").await;
    assert!(matches!(wrong, Err(AppError::Auth(AuthError::InvalidCredentials))));
    assert!(service.current_user().is_none());

    let unknown = service.sign_in("nobody@example.com", PASSWORD).await;
    assert!(matches!(unknown, Err(AppError::Auth(AuthError::InvalidCredentials))));

    let signed_in = service.sign_in("ada@example.com", PASSWORD).await?;
    assert_eq!(signed_in.uid, user.id);
    assert_eq!(service.current_user(), Some(signed_in));

    Ok(())
}

#[tokio::test]
async fn test_sign_in_requires_fields() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(matches!(
        service.sign_in("", PASSWORD).await,
        Err(AppError::Validation(ValidationError::MissingField("email")))
    ));
    assert!(matches!(
        service.sign_in("ada@example.com", "").await,
        Err(AppError::Validation(ValidationError::MissingField("password")))
    ));

    Ok(())
}

#[tokio::test]
async fn test_session_persists_across_connections() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let options = test_options(&temp_dir);

    let user = {
        let service = LedgerService::init(&options).await?;
        register(&service, "Ada Lovelace", "ada@example.com").await?
    };

    let reopened = LedgerService::connect(&options).await?;
    let current = reopened.current_user().expect("session should be restored");
    assert_eq!(current.uid, user.id);

    reopened.sign_out().await?;

    let after_sign_out = LedgerService::connect(&options).await?;
    assert!(after_sign_out.current_user().is_none());

    Ok(())
}

#[tokio::test]
async fn test_current_user_change_notifications() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let mut changes = service.subscribe();
    assert!(changes.borrow_and_update().is_none());

    let user = register(&service, "Ada Lovelace", "ada@example.com").await?;
    assert!(changes.has_changed()?);
    assert_eq!(
        changes.borrow_and_update().as_ref().map(|u| u.uid.clone()),
        Some(user.id.clone())
    );

    service.sign_out().await?;
    assert!(changes.has_changed()?);
    assert!(changes.borrow_and_update().is_none());

    Ok(())
}

#[tokio::test]
async fn test_display_name_falls_back_to_email() -> Result<()> {
    use cash_manager::application::Dashboard;
    use cash_manager::domain::Ledger;
    use cash_manager::identity::AuthUser;

    let dashboard = Dashboard {
        user: AuthUser {
            uid: "uid".into(),
            email: "ada@example.com".into(),
        },
        profile: None,
        ledger: Ledger::default(),
    };
    assert_eq!(dashboard.display_name(), "ada@example.com");

    Ok(())
}
