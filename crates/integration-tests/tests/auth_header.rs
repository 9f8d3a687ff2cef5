//! Integration tests for bearer header attachment.

#![allow(clippy::unwrap_used)]

use stns_client::{ApiError, RefreshError};
use stns_integration_tests::MockBackend;

#[tokio::test]
async fn test_request_without_token_has_no_authorization_header() {
    let backend = MockBackend::start().await;
    let app = backend.app();

    let err = app.categories().all().await.unwrap_err();

    let seen = backend.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].authorization.is_none());
    // With nothing stored there is nothing to refresh with.
    assert!(matches!(
        err,
        ApiError::SessionExpired(RefreshError::MissingRefreshToken)
    ));
    assert_eq!(backend.refresh_calls(), 0);
}

#[tokio::test]
async fn test_request_with_token_carries_bearer_header() {
    let backend = MockBackend::start().await;
    let app = backend.app();
    app.session().login(backend.issue_tokens());

    app.categories().all().await.unwrap();

    let seen = backend.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer access-1"));
}

#[tokio::test]
async fn test_every_attempt_has_its_own_request_id() {
    let backend = MockBackend::start().await;
    let app = backend.app();
    app.session().login(backend.issue_tokens());

    app.categories().all().await.unwrap();
    app.products().all().await.unwrap();

    let ids: Vec<String> = backend
        .seen()
        .into_iter()
        .map(|r| r.request_id.unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_logout_stops_sending_the_token() {
    let backend = MockBackend::start().await;
    let app = backend.app();
    app.session().login(backend.issue_tokens());
    app.logout();

    let _ = app.categories().all().await;

    assert!(backend.seen()[0].authorization.is_none());
}
