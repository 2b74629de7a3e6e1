mod test_helpers;

use serde_json::json;
use test_helpers::TestDb;
use vuvur_storage::settings;

#[tokio::test]
async fn test_set_and_get_override() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    settings::set_override(pool, "scan_interval", &json!(600))
        .await
        .unwrap();

    let overrides = settings::get_overrides(pool).await.unwrap();
    assert_eq!(overrides.get("scan_interval"), Some(&json!(600)));
}

#[tokio::test]
async fn test_update_existing_override() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    settings::set_override(pool, "default_sort", &json!("file_asc"))
        .await
        .unwrap();
    settings::set_override(pool, "default_sort", &json!("random"))
        .await
        .unwrap();

    let overrides = settings::get_overrides(pool).await.unwrap();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides["default_sort"], json!("random"));
}

#[tokio::test]
async fn test_set_overrides_writes_every_key() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let changes = json!({ "scan_interval": 60, "default_sort": "file_desc" });
    settings::set_overrides(pool, changes.as_object().unwrap())
        .await
        .unwrap();

    let overrides = settings::get_overrides(pool).await.unwrap();
    assert_eq!(overrides.len(), 2);
    assert_eq!(overrides["scan_interval"], json!(60));
    assert_eq!(overrides["default_sort"], json!("file_desc"));
}

#[tokio::test]
async fn test_set_overrides_is_all_or_nothing() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    settings::set_override(pool, "scan_interval", &json!(600))
        .await
        .unwrap();

    // Make the last write of the batch fail inside the transaction
    sqlx::query(
        "CREATE TRIGGER reject_write BEFORE INSERT ON settings
         WHEN NEW.key = 'zz_rejected'
         BEGIN SELECT RAISE(ABORT, 'rejected'); END",
    )
    .execute(pool)
    .await
    .unwrap();

    let changes = json!({ "scan_interval": 60, "zz_rejected": true });
    assert!(settings::set_overrides(pool, changes.as_object().unwrap())
        .await
        .is_err());

    let overrides = settings::get_overrides(pool).await.unwrap();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides["scan_interval"], json!(600));
}

#[tokio::test]
async fn test_unreadable_value_is_skipped() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    sqlx::query("INSERT INTO settings (key, value, updated_at) VALUES ('broken', 'not json', 0)")
        .execute(pool)
        .await
        .unwrap();
    settings::set_override(pool, "scan_interval", &json!(5))
        .await
        .unwrap();

    let overrides = settings::get_overrides(pool).await.unwrap();
    assert_eq!(overrides.len(), 1);
    assert!(overrides.contains_key("scan_interval"));
}
