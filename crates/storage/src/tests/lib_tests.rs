use super::*;

#[tokio::test]
async fn stores_and_reads_back_value() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.set("modamatch_prompt", "hola").await.expect("set");
    let value = storage.get("modamatch_prompt").await.expect("get");
    assert_eq!(value.as_deref(), Some("hola"));
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn missing_key_reads_as_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage.get("nope").await.expect("get").is_none());
}

#[tokio::test]
async fn set_overwrites_and_bumps_timestamp() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.set("k", "first").await.expect("first");
    let first = storage.entry("k").await.expect("entry").expect("present");
    storage.set("k", "second").await.expect("second");
    let second = storage.entry("k").await.expect("entry").expect("present");

    assert_eq!(second.value, "second");
    assert!(second.updated_at >= first.updated_at);
}

#[tokio::test]
async fn remove_deletes_key_and_is_idempotent() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.set("k", "v").await.expect("set");
    storage.remove("k").await.expect("remove");
    storage.remove("k").await.expect("remove again");
    assert!(storage.get("k").await.expect("get").is_none());
}

#[tokio::test]
async fn write_over_quota_is_rejected_and_keeps_previous_value() {
    let storage = Storage::with_quota("sqlite::memory:", 16).await.expect("db");
    storage.set("k", "small").await.expect("fits");

    let err = storage
        .set("k", "this value is far too long")
        .await
        .expect_err("over quota");
    assert!(matches!(err, StorageError::QuotaExceeded { quota: 16, .. }));
    assert_eq!(storage.get("k").await.expect("get").as_deref(), Some("small"));
}

#[tokio::test]
async fn quota_counts_other_keys_but_not_the_replaced_value() {
    let storage = Storage::with_quota("sqlite::memory:", 19).await.expect("db");
    storage.set("a", "123456789").await.expect("a");
    // Replacing "a" with an equally sized value must not double count it.
    storage.set("a", "987654321").await.expect("replace a");
    assert_eq!(storage.used_bytes().await.expect("used"), 10);

    let err = storage.set("b", "123456789").await.expect_err("b does not fit");
    assert!(matches!(
        err,
        StorageError::QuotaExceeded {
            requested: 20,
            quota: 19,
            ..
        }
    ));
}

#[tokio::test]
async fn quota_measures_bytes_not_characters() {
    let storage = Storage::with_quota("sqlite::memory:", 8).await.expect("db");
    // 1 byte key + 3 * 2 byte characters = 7 bytes.
    storage.set("k", "ñññ").await.expect("fits");
    assert_eq!(storage.used_bytes().await.expect("used"), 7);
    storage.set("k", "ññññ").await.expect_err("9 bytes");
}

#[tokio::test]
async fn clear_prefix_only_touches_namespace() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.set("modamatch_prompt", "p").await.expect("set");
    storage.set("modamatch_original_image", "i").await.expect("set");
    storage.set("other_key", "o").await.expect("set");

    let removed = storage.clear_prefix("modamatch_").await.expect("clear");
    assert_eq!(removed, 2);
    assert_eq!(storage.get("other_key").await.expect("get").as_deref(), Some("o"));
}

#[tokio::test]
async fn clear_prefix_treats_underscore_literally() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.set("a_b", "1").await.expect("set");
    storage.set("axb", "2").await.expect("set");

    assert_eq!(storage.clear_prefix("a_").await.expect("clear"), 1);
    assert!(storage.get("axb").await.expect("get").is_some());
}

#[test]
fn sqlite_path_ignores_memory_urls() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/modamatch.db?mode=rwc"),
        Some(PathBuf::from("./data/modamatch.db"))
    );
}
