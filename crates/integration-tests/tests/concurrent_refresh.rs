//! Integration tests for single-flight refresh.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use futures::future::join_all;
use stns_client::{AccessToken, ApiError, RefreshError, ViewScope};
use stns_integration_tests::MockBackend;

const CONCURRENT_CALLS: usize = 8;

#[tokio::test]
async fn test_concurrent_401s_cause_one_refresh() {
    let backend = MockBackend::start().await;
    let app = backend.app();
    app.session().login(backend.issue_tokens());
    backend.expire_access_token();
    backend.set_refresh_delay(Duration::from_millis(100));

    let results = join_all((0..CONCURRENT_CALLS).map(|_| app.categories().all())).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(app.session().token(), Some(AccessToken::new("access-2")));
}

#[tokio::test]
async fn test_concurrent_401s_across_tasks_cause_one_refresh() {
    let backend = MockBackend::start().await;
    let app = backend.app();
    app.session().login(backend.issue_tokens());
    backend.expire_access_token();
    backend.set_refresh_delay(Duration::from_millis(50));

    let tasks: Vec<_> = (0..CONCURRENT_CALLS)
        .map(|_| {
            let products = app.products().clone();
            tokio::spawn(async move { products.all().await })
        })
        .collect();
    for task in join_all(tasks).await {
        task.unwrap().unwrap();
    }

    assert_eq!(backend.refresh_calls(), 1);
}

#[tokio::test]
async fn test_concurrent_refresh_failure_is_shared() {
    let backend = MockBackend::start().await;
    let app = backend.app();
    app.session().login(backend.issue_tokens());
    backend.expire_access_token();
    backend.reject_refresh();
    backend.set_refresh_delay(Duration::from_millis(50));

    let results = join_all((0..CONCURRENT_CALLS).map(|_| app.categories().all())).await;

    assert_eq!(backend.refresh_calls(), 1);
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(ApiError::SessionExpired(RefreshError::Rejected { .. }))))
        .count();
    let ended = results
        .iter()
        .filter(|r| matches!(r, Err(ApiError::SessionExpired(RefreshError::SessionEnded))))
        .count();
    assert_eq!(rejected, 1);
    assert_eq!(ended, CONCURRENT_CALLS - 1);
    assert!(!app.session().is_authenticated());
}

#[tokio::test]
async fn test_closing_the_refreshing_view_does_not_restart_refresh() {
    let backend = MockBackend::start().await;
    let app = backend.app();
    app.session().login(backend.issue_tokens());
    backend.expire_access_token();
    backend.set_refresh_delay(Duration::from_millis(200));

    let first_view = ViewScope::new();
    let first = {
        let scope = first_view.handle();
        let categories = app.categories().clone();
        tokio::spawn(async move { scope.run(categories.all()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second = {
        let categories = app.categories().clone();
        tokio::spawn(async move { categories.all().await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    first_view.close();

    assert!(first.await.unwrap().is_err());
    assert!(!second.await.unwrap().unwrap().is_empty());
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(app.session().token(), Some(AccessToken::new("access-2")));
}
