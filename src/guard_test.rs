use super::*;
use crate::test_helpers::{FakeBackend, store_with};
use std::time::Duration;
use tokio::time::timeout;

// =============================================================
// decide
// =============================================================

#[test]
fn pending_while_unknown_regardless_of_requirement() {
    for required in [None, Some(AccountKind::Individual), Some(AccountKind::Organization)] {
        assert_eq!(decide(AuthPhase::Unknown, required, Route::Auth), GuardDecision::Pending);
    }
}

#[test]
fn anonymous_redirects_to_fallback() {
    assert_eq!(
        decide(AuthPhase::Anonymous, Some(AccountKind::Individual), Route::Auth),
        GuardDecision::Redirect(Route::Auth)
    );
    assert_eq!(decide(AuthPhase::Anonymous, None, Route::Home), GuardDecision::Redirect(Route::Home));
}

#[test]
fn wrong_kind_redirects_to_own_dashboard_not_fallback() {
    assert_eq!(
        decide(AuthPhase::Authenticated(AccountKind::Individual), Some(AccountKind::Organization), Route::Auth),
        GuardDecision::Redirect(Route::UserDashboard)
    );
    assert_eq!(
        decide(AuthPhase::Authenticated(AccountKind::Organization), Some(AccountKind::Individual), Route::Home),
        GuardDecision::Redirect(Route::VendorDashboard)
    );
}

#[test]
fn matching_or_unrestricted_kind_renders() {
    assert_eq!(
        decide(AuthPhase::Authenticated(AccountKind::Organization), Some(AccountKind::Organization), Route::Auth),
        GuardDecision::Render
    );
    assert_eq!(decide(AuthPhase::Authenticated(AccountKind::Individual), None, Route::Auth), GuardDecision::Render);
}

// =============================================================
// Route
// =============================================================

#[test]
fn route_paths_round_trip() {
    for route in Route::ALL {
        assert_eq!(Route::from_path(route.path()), Some(route));
    }
    assert_eq!(Route::from_path("/vendor/dashboard/"), Some(Route::VendorDashboard));
    assert_eq!(Route::from_path("/admin"), None);
}

#[test]
fn dashboards_are_guarded_by_their_kind() {
    assert_eq!(Route::Home.guard(), None);
    assert_eq!(Route::Auth.guard(), None);
    assert_eq!(Route::UserDashboard.guard().and_then(|g| g.required()), Some(AccountKind::Individual));
    assert_eq!(Route::VendorDashboard.guard().and_then(|g| g.required()), Some(AccountKind::Organization));
}

// =============================================================
// RouteGuard against a live store
// =============================================================

#[tokio::test]
async fn settle_waits_for_startup_check() {
    let (store, _, _) = store_with(FakeBackend::accepting());
    let guard = RouteGuard::new().require(AccountKind::Individual);
    let mut rx = store.subscribe();
    assert_eq!(guard.evaluate(&store.snapshot()), GuardDecision::Pending);

    let check_store = store.clone();
    let settle = tokio::spawn(async move { guard.settle(&mut rx).await });
    tokio::task::yield_now().await;
    check_store.check_auth().await;

    let decision = timeout(Duration::from_secs(2), settle).await.unwrap().unwrap();
    assert_eq!(decision, GuardDecision::Redirect(Route::Auth));
}

#[tokio::test]
async fn settle_does_not_redirect_during_login() {
    let (store, _, _) = store_with(FakeBackend::accepting().with_latency(Duration::from_millis(50)));
    store.check_auth().await;
    let guard = RouteGuard::new().require(AccountKind::Organization);

    let login_store = store.clone();
    let login =
        tokio::spawn(async move { login_store.login("v@acme.test", "pw", AccountKind::Organization).await });
    let mut rx = store.subscribe();
    timeout(Duration::from_secs(2), rx.wait_for(SessionState::is_loading)).await.unwrap().unwrap();
    assert_eq!(guard.evaluate(&store.snapshot()), GuardDecision::Pending);

    let decision = timeout(Duration::from_secs(2), guard.settle(&mut rx)).await.unwrap();
    assert_eq!(decision, GuardDecision::Render);
    login.await.unwrap().unwrap();
}

#[tokio::test]
async fn next_change_reruns_after_logout() {
    let (store, _, _) = store_with(FakeBackend::accepting());
    store.login("a@b.com", "x", AccountKind::Individual).await.unwrap();
    let guard = RouteGuard::new().require(AccountKind::Individual);
    let mut rx = store.subscribe();
    assert_eq!(guard.settle(&mut rx).await, GuardDecision::Render);

    store.logout();

    assert_eq!(guard.next_change(&mut rx).await, Some(GuardDecision::Redirect(Route::Auth)));
}

#[tokio::test]
async fn changing_required_kind_changes_decision() {
    let (store, _, _) = store_with(FakeBackend::accepting());
    store.login("a@b.com", "x", AccountKind::Individual).await.unwrap();
    let mut guard = RouteGuard::new().with_fallback(Route::Home);

    assert_eq!(guard.evaluate(&store.snapshot()), GuardDecision::Render);
    guard.set_required(Some(AccountKind::Organization));
    assert_eq!(guard.evaluate(&store.snapshot()), GuardDecision::Redirect(Route::UserDashboard));
}

#[tokio::test]
async fn next_change_ends_when_store_dropped() {
    let (store, _, _) = store_with(FakeBackend::accepting());
    let guard = RouteGuard::new();
    let mut rx = store.subscribe();
    drop(store);

    assert_eq!(guard.next_change(&mut rx).await, None);
}
