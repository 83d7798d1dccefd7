//! Round-trips through the object-store content store backends.

use std::sync::Arc;

use report_pipeline::domain::ports::{ContentStore, ContentStoreError};
use report_pipeline::domain::ObjectKey;
use report_pipeline::outbound::storage::ObjectStoreContentStore;
use report_pipeline::test_support::FixedClock;
use rstest::rstest;

#[rstest]
#[case::single_byte(vec![0x00])]
#[case::binary(vec![0xff, 0x00, 0x7f, 0x80, 0x0a, 0x0d])]
#[case::large((0..=255_u8).cycle().take(256 * 1024).collect())]
#[tokio::test]
async fn in_memory_get_returns_what_put_stored(#[case] data: Vec<u8>) {
    let store = ObjectStoreContentStore::in_memory(Arc::new(FixedClock::at(2024, 2, 29, 23, 59, 59)));
    let key = store.put(&data, "card1").await.expect("put succeeds");

    assert_eq!(key.as_str(), "2024/02/29/card1-2024-02-29T23-59-59.xlsx");
    assert_eq!(store.get(&key).await.expect("get succeeds"), data);
}

#[tokio::test]
async fn local_directory_lays_out_date_partitions() {
    let root = tempfile::tempdir().expect("temp dir");
    let store = ObjectStoreContentStore::local(root.path()).expect("local store");

    let key = store.put(b"xlsx", "card5").await.expect("put succeeds");
    assert!(root.path().join(key.as_str()).is_file());
    assert_eq!(store.get(&key).await.expect("get succeeds"), b"xlsx".to_vec());
}

#[tokio::test]
async fn reading_an_unknown_key_is_not_found() {
    let root = tempfile::tempdir().expect("temp dir");
    let store = ObjectStoreContentStore::local(root.path()).expect("local store");
    let key = ObjectKey::parse("2020/01/01/absent.xlsx").expect("key");

    let error = store.get(&key).await.expect_err("object is absent");
    assert!(matches!(error, ContentStoreError::NotFound { .. }));
}

#[test]
fn opening_a_missing_local_root_fails() {
    let root = tempfile::tempdir().expect("temp dir");
    let missing = root.path().join("does-not-exist");
    assert!(ObjectStoreContentStore::local(&missing).is_err());
}
