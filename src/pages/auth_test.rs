use super::*;
use crate::test_helpers::{FakeBackend, store_with};
use std::sync::atomic::Ordering;

fn filled(mode: AuthMode, kind: AccountKind) -> AuthForm {
    let mut form = AuthForm::new(mode, kind);
    form.set(AuthField::Email, "  a@b.com ");
    form.set(AuthField::Password, "secret");
    form.set(AuthField::ConfirmPassword, "secret");
    form.set(AuthField::FullName, "Jane Smith");
    form
}

#[test]
fn validate_login_input_trims_and_requires_both() {
    assert_eq!(
        validate_login_input(" a@b.com ", "pw").unwrap(),
        ("a@b.com".to_owned(), "pw".to_owned())
    );
    assert!(matches!(validate_login_input("   ", "pw"), Err(SessionError::ValidationFailure(_))));
    assert!(matches!(validate_login_input("a@b.com", ""), Err(SessionError::ValidationFailure(_))));
}

#[test]
fn auth_page_redirects_only_signed_in_visitors() {
    assert_eq!(auth_page_redirect(AuthPhase::Unknown), None);
    assert_eq!(auth_page_redirect(AuthPhase::Anonymous), None);
    assert_eq!(
        auth_page_redirect(AuthPhase::Authenticated(AccountKind::Organization)),
        Some(Route::VendorDashboard)
    );
}

#[test]
fn labels_follow_mode_and_kind() {
    assert_eq!(name_label(AccountKind::Individual), "FULL NAME");
    assert_eq!(name_label(AccountKind::Organization), "CONTACT NAME");
    assert_eq!(AuthForm::new(AuthMode::Login, AccountKind::Individual).submit_label(), "AUTHENTICATE USER");
    assert_eq!(
        AuthForm::new(AuthMode::Register, AccountKind::Organization).submit_label(),
        "INITIALIZE VENDOR ACCOUNT"
    );
}

#[tokio::test]
async fn login_submit_returns_dashboard_for_kind() {
    let (store, backend, _) = store_with(FakeBackend::accepting());
    let mut form = filled(AuthMode::Login, AccountKind::Organization);

    let route = form.submit(&store).await.unwrap();

    assert_eq!(route, Route::VendorDashboard);
    assert_eq!(form.error(), None);
    assert_eq!(store.identity().unwrap().email, "a@b.com");
    assert_eq!(backend.sign_in_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_login_fails_before_request() {
    let (store, backend, _) = store_with(FakeBackend::accepting());
    let mut form = AuthForm::default();

    let err = form.submit(&store).await.unwrap_err();

    assert!(matches!(err, SessionError::ValidationFailure(_)));
    assert_eq!(form.error(), Some("Enter your email and password."));
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn register_mismatch_sets_error_and_editing_clears_it() {
    let (store, backend, _) = store_with(FakeBackend::accepting());
    let mut form = filled(AuthMode::Register, AccountKind::Individual);
    form.set(AuthField::ConfirmPassword, "different");

    let err = form.submit(&store).await.unwrap_err();

    assert!(matches!(err, SessionError::ValidationFailure(_)));
    assert_eq!(form.error(), Some("Passwords do not match"));
    assert_eq!(backend.total_calls(), 0);

    form.set(AuthField::ConfirmPassword, "secret");
    assert_eq!(form.error(), None);
}

#[tokio::test]
async fn vendor_registration_carries_organization() {
    let (store, backend, _) = store_with(FakeBackend::accepting());
    let mut form = filled(AuthMode::Register, AccountKind::Organization);
    form.set(AuthField::OrganizationName, " ACME ");

    let route = form.submit(&store).await.unwrap();

    assert_eq!(route, Route::VendorDashboard);
    let identity = store.identity().unwrap();
    assert_eq!(identity.display_name, "Jane Smith");
    assert_eq!(identity.organization_name.as_deref(), Some("ACME"));
    assert_eq!(backend.sign_up_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_login_keeps_backend_message() {
    let (store, _, _) = store_with(FakeBackend::accepting().rejecting_auth(401));
    let mut form = filled(AuthMode::Login, AccountKind::Individual);

    assert!(form.submit(&store).await.is_err());
    assert_eq!(form.error(), Some("Invalid credentials"));
    assert!(store.identity().is_none());
}
