//! Integration tests for the cart session lifecycle on disk.
//!
//! Every "restart" builds a new `CartStore` over the same data directory, the
//! way a fresh CLI invocation does.

use std::path::Path;
use std::sync::Arc;

use oakline_cart::api::ProductCatalog;
use oakline_cart::identity::SessionIdentity;
use oakline_cart::notify::NotificationLog;
use oakline_cart::storage::{FileStorage, LocalStorage};
use oakline_cart::testing::InMemoryCartApi;
use oakline_cart::{CartError, CartStore, SessionPhase};
use oakline_core::ProductId;
use oakline_integration_tests::{product, temp_data_dir};
use secrecy::SecretString;

const KEY: &str = "cart";

fn token() -> SecretString {
    SecretString::from("tok_Vb3$nX8@qT1k")
}

fn api() -> Arc<InMemoryCartApi> {
    Arc::new(InMemoryCartApi::new().with_products([
        product(1, "Oak Side Table", 8900),
        product(2, "Wool Throw", 4550),
        product(3, "Brass Lamp", 12000),
    ]))
}

/// One process lifetime: a store over `dir`.
fn start(dir: &Path, api: &Arc<InMemoryCartApi>, identity: &Arc<SessionIdentity>) -> CartStore {
    CartStore::new(
        Arc::new(FileStorage::new(dir)),
        KEY,
        api.clone(),
        identity.clone(),
        Arc::new(NotificationLog::new()),
    )
}

async fn anonymous_cart(dir: &Path, api: &Arc<InMemoryCartApi>, lines: &[(i32, u32)]) {
    let identity = Arc::new(SessionIdentity::anonymous());
    let mut store = start(dir, api, &identity);
    store.load().await.expect("Anonymous load failed");
    for &(id, quantity) in lines {
        let product = api.product(ProductId::new(id)).await.expect("Lookup failed");
        store.add_line(&product, quantity).await.expect("Add failed");
    }
}

#[tokio::test]
async fn test_anonymous_cart_survives_restart() {
    let dir = temp_data_dir();
    let api = api();
    anonymous_cart(&dir, &api, &[(1, 2), (3, 1)]).await;

    let identity = Arc::new(SessionIdentity::anonymous());
    let mut store = start(&dir, &api, &identity);
    store.load().await.expect("Reload failed");

    assert_eq!(store.phase(), SessionPhase::LocalBacked);
    assert_eq!(store.item_count(), 3);
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn test_malformed_snapshot_loads_as_empty_cart() {
    let dir = temp_data_dir();
    FileStorage::new(&dir)
        .write(KEY, "{\"version\":1,\"lines\":[{\"product\":")
        .await
        .expect("Failed to write snapshot");

    let api = api();
    let identity = Arc::new(SessionIdentity::anonymous());
    let mut store = start(&dir, &api, &identity);
    store.load().await.expect("Load should not fail on bad data");

    assert_eq!(store.phase(), SessionPhase::LocalBacked);
    assert!(store.lines().is_empty());
}

#[tokio::test]
async fn test_signed_in_startup_merges_saved_cart() {
    let dir = temp_data_dir();
    let api = api();
    api.seed_line(ProductId::new(3), 2);
    anonymous_cart(&dir, &api, &[(3, 1), (2, 4)]).await;

    let identity = Arc::new(SessionIdentity::authenticated(token()));
    let mut store = start(&dir, &api, &identity);
    store.load().await.expect("Signed-in load failed");

    assert_eq!(store.phase(), SessionPhase::RemoteBacked);
    assert_eq!(api.quantity_of(ProductId::new(3)), 3);
    assert_eq!(api.quantity_of(ProductId::new(2)), 4);
    assert_eq!(store.item_count(), 7);

    let saved = FileStorage::new(&dir).read(KEY).await.expect("Read failed");
    assert!(saved.is_none());

    // Next start has nothing to merge
    let adds = api.add_calls();
    let mut store = start(&dir, &api, &identity);
    store.load().await.expect("Second load failed");
    assert_eq!(api.add_calls(), adds);
    assert_eq!(store.item_count(), 7);
}

#[tokio::test]
async fn test_interrupted_merge_resumes_after_restart() {
    let dir = temp_data_dir();
    let api = api();
    anonymous_cart(&dir, &api, &[(1, 1), (2, 2), (3, 3)]).await;

    let identity = Arc::new(SessionIdentity::authenticated(token()));
    api.fail_mutations_after(2);
    let mut store = start(&dir, &api, &identity);
    let err = store.load().await.unwrap_err();
    assert!(
        matches!(err, CartError::Reconcile { merged: 2, total: 3, .. }),
        "got {err:?}"
    );
    assert_eq!(store.phase(), SessionPhase::LocalBacked);
    assert_eq!(store.item_count(), 3);
    drop(store);

    api.heal();
    let mut store = start(&dir, &api, &identity);
    store.load().await.expect("Resumed load failed");

    assert_eq!(store.phase(), SessionPhase::RemoteBacked);
    assert_eq!(api.quantity_of(ProductId::new(1)), 1);
    assert_eq!(api.quantity_of(ProductId::new(2)), 2);
    assert_eq!(api.quantity_of(ProductId::new(3)), 3);
}

#[tokio::test]
async fn test_sign_out_starts_an_empty_local_cart() {
    let dir = temp_data_dir();
    let api = api();
    api.seed_line(ProductId::new(1), 1);
    let identity = Arc::new(SessionIdentity::authenticated(token()));
    let mut store = start(&dir, &api, &identity);
    store.load().await.expect("Signed-in load failed");
    assert_eq!(store.item_count(), 1);

    identity.logout();
    let report = store.refresh_session().await.expect("Sign-out failed");

    assert!(report.is_none());
    assert_eq!(store.phase(), SessionPhase::LocalBacked);
    assert!(store.lines().is_empty());
    // The account cart is untouched
    assert_eq!(api.quantity_of(ProductId::new(1)), 1);
}

#[tokio::test]
async fn test_status_watch_follows_session() {
    let dir = temp_data_dir();
    let api = api();
    let identity = Arc::new(SessionIdentity::authenticated(token()));
    let mut store = start(&dir, &api, &identity);
    let status = store.subscribe();

    assert_eq!(status.borrow().phase, SessionPhase::Uninitialized);
    store.load().await.expect("Load failed");

    let current = *status.borrow();
    assert_eq!(current.phase, SessionPhase::RemoteBacked);
    assert!(!current.loading);
}
