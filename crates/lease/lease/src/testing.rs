use std::time::Duration;

use crate::error::LeaseError;
use crate::key::{LeaderToken, LeaseKey};
use crate::store::LeaseStore;

const TTL: Duration = Duration::from_secs(10);

/// Run the full lease store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
/// Every check uses its own key, so the suite can share a store with other
/// tests as long as their keys do not start with `conformance:`.
///
/// # Errors
///
/// Returns an error if the store fails to answer.
pub async fn run_lease_conformance_tests(store: &dyn LeaseStore) -> Result<(), LeaseError> {
    test_acquire_vacant(store).await?;
    test_acquire_held(store).await?;
    test_extend_by_holder(store).await?;
    test_extend_by_other(store).await?;
    test_extend_missing(store).await?;
    test_delete_by_holder(store).await?;
    test_delete_by_other(store).await?;
    test_reacquire_after_delete(store).await?;
    Ok(())
}

async fn test_acquire_vacant(store: &dyn LeaseStore) -> Result<(), LeaseError> {
    let key = LeaseKey::new("conformance:acquire-vacant");
    let token = LeaderToken::generate();
    assert!(
        store.set_if_absent(&key, &token, TTL).await?,
        "set_if_absent on a vacant key should succeed"
    );
    assert_eq!(store.holder(&key).await?, Some(token));
    Ok(())
}

async fn test_acquire_held(store: &dyn LeaseStore) -> Result<(), LeaseError> {
    let key = LeaseKey::new("conformance:acquire-held");
    let first = LeaderToken::generate();
    let second = LeaderToken::generate();
    assert!(store.set_if_absent(&key, &first, TTL).await?);
    assert!(
        !store.set_if_absent(&key, &second, TTL).await?,
        "set_if_absent on a held key should fail"
    );
    assert_eq!(
        store.holder(&key).await?,
        Some(first),
        "original holder should remain"
    );
    Ok(())
}

async fn test_extend_by_holder(store: &dyn LeaseStore) -> Result<(), LeaseError> {
    let key = LeaseKey::new("conformance:extend-holder");
    let token = LeaderToken::generate();
    assert!(store.set_if_absent(&key, &token, TTL).await?);
    assert!(
        store
            .compare_and_extend(&key, &token, Duration::from_secs(20))
            .await?,
        "holder should be able to extend"
    );
    assert_eq!(store.holder(&key).await?, Some(token));
    Ok(())
}

async fn test_extend_by_other(store: &dyn LeaseStore) -> Result<(), LeaseError> {
    let key = LeaseKey::new("conformance:extend-other");
    let holder = LeaderToken::generate();
    let other = LeaderToken::generate();
    assert!(store.set_if_absent(&key, &holder, TTL).await?);
    assert!(
        !store.compare_and_extend(&key, &other, TTL).await?,
        "non-holder must not extend"
    );
    assert_eq!(store.holder(&key).await?, Some(holder));
    Ok(())
}

async fn test_extend_missing(store: &dyn LeaseStore) -> Result<(), LeaseError> {
    let key = LeaseKey::new("conformance:extend-missing");
    let token = LeaderToken::generate();
    assert!(
        !store.compare_and_extend(&key, &token, TTL).await?,
        "extending a missing key should fail"
    );
    assert!(
        store.holder(&key).await?.is_none(),
        "failed extend must not create the key"
    );
    Ok(())
}

async fn test_delete_by_holder(store: &dyn LeaseStore) -> Result<(), LeaseError> {
    let key = LeaseKey::new("conformance:delete-holder");
    let token = LeaderToken::generate();
    assert!(store.set_if_absent(&key, &token, TTL).await?);
    assert!(store.compare_and_delete(&key, &token).await?);
    assert!(store.holder(&key).await?.is_none());
    assert!(
        !store.compare_and_delete(&key, &token).await?,
        "second delete should report nothing removed"
    );
    Ok(())
}

async fn test_delete_by_other(store: &dyn LeaseStore) -> Result<(), LeaseError> {
    let key = LeaseKey::new("conformance:delete-other");
    let holder = LeaderToken::generate();
    let other = LeaderToken::generate();
    assert!(store.set_if_absent(&key, &holder, TTL).await?);
    assert!(
        !store.compare_and_delete(&key, &other).await?,
        "non-holder must not delete"
    );
    assert_eq!(store.holder(&key).await?, Some(holder));
    Ok(())
}

async fn test_reacquire_after_delete(store: &dyn LeaseStore) -> Result<(), LeaseError> {
    let key = LeaseKey::new("conformance:reacquire");
    let first = LeaderToken::generate();
    let second = LeaderToken::generate();
    assert!(store.set_if_absent(&key, &first, TTL).await?);
    assert!(store.compare_and_delete(&key, &first).await?);
    assert!(
        store.set_if_absent(&key, &second, TTL).await?,
        "released key should be acquirable"
    );
    assert_eq!(store.holder(&key).await?, Some(second));
    Ok(())
}
