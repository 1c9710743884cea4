//! Integration tests for the advisory lock around store operations.
//!
//! Separate `RecordStore` instances over one directory stand in for separate
//! processes: they share nothing but the files.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;
use trellis::config::StoreConfig;
use trellis::domain::Record;
use trellis::error::Error;
use trellis::store::{LockBody, RecordStore};

mod common;
use common::{fast_config, store_in};

fn write_lock(config: &StoreConfig, age: Duration) {
    let body = LockBody {
        owner_id: 99_999,
        timestamp_millis: Utc::now().timestamp_millis()
            - i64::try_from(age.as_millis()).unwrap(),
    };
    std::fs::write(config.lock_path(), serde_json::to_vec(&body).unwrap()).unwrap();
}

fn patient_config(dir: &TempDir) -> StoreConfig {
    StoreConfig {
        max_retries: 500,
        retry_delay: Duration::from_millis(5),
        ..fast_config(dir.path())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_creates_of_one_id_write_one_line() {
    let dir = TempDir::new().unwrap();
    let first = Arc::new(RecordStore::new(patient_config(&dir)));
    let second = Arc::new(RecordStore::new(patient_config(&dir)));

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = if i % 2 == 0 {
            Arc::clone(&first)
        } else {
            Arc::clone(&second)
        };
        handles.push(tokio::spawn(async move {
            store
                .create(Record::new("t-1", format!("Attempt {i}")))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let content = std::fs::read_to_string(first.data_path()).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(!first.lock_path().exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_updates_lose_nothing() {
    let dir = TempDir::new().unwrap();
    let stores: Vec<Arc<RecordStore>> = (0..3)
        .map(|_| Arc::new(RecordStore::new(patient_config(&dir))))
        .collect();

    let mut handles = Vec::new();
    for i in 0..12 {
        let store = Arc::clone(&stores[i % stores.len()]);
        handles.push(tokio::spawn(async move {
            store
                .update(move |mut records| {
                    records.push(Record::new(format!("t-{i}"), format!("Task {i}")));
                    records
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let (records, warnings) = stores[0].load().await.unwrap();
    assert!(warnings.is_empty());
    assert_eq!(records.len(), 12);
    assert!(!stores[0].lock_path().exists());
}

#[tokio::test]
async fn stale_lock_is_reclaimed() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(dir.path());
    write_lock(&config, Duration::from_secs(120));
    let store = RecordStore::new(config);

    store.create(Record::new("t-1", "After crash")).await.unwrap();

    let (records, _) = store.load().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(!store.lock_path().exists());
}

#[tokio::test]
async fn live_lock_times_out_after_configured_retries() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        max_retries: 3,
        ..fast_config(dir.path())
    };
    write_lock(&config, Duration::ZERO);
    let store = RecordStore::new(config);

    let err = store.create(Record::new("t-1", "Blocked")).await.unwrap_err();

    match err {
        Error::LockTimeout { path, attempts } => {
            assert_eq!(path, store.lock_path());
            assert_eq!(attempts, 4);
        }
        other => panic!("expected LockTimeout, got {other:?}"),
    }
    assert!(store.lock_path().exists(), "someone else's lock must survive");
    assert!(!store.data_path().exists());
}

#[tokio::test]
async fn waits_for_holder_to_release() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        max_retries: 200,
        ..fast_config(dir.path())
    };
    write_lock(&config, Duration::ZERO);
    let lock_path = config.lock_path();
    let store = RecordStore::new(config);

    let holder = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        tokio::fs::remove_file(lock_path).await.unwrap();
    });

    store.create(Record::new("t-1", "Patient")).await.unwrap();
    holder.await.unwrap();

    assert!(!store.lock_path().exists());
    let (records, _) = store.load().await.unwrap();
    assert_eq!(records[0].title, "Patient");
}

#[tokio::test]
async fn unreadable_lock_body_ages_by_modification_time() {
    let dir = TempDir::new().unwrap();
    let fresh = StoreConfig {
        max_retries: 2,
        ..fast_config(dir.path())
    };
    std::fs::write(fresh.lock_path(), b"").unwrap();

    let err = RecordStore::new(fresh.clone())
        .load()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::LockTimeout { .. }));

    tokio::time::sleep(Duration::from_millis(30)).await;
    let impatient = StoreConfig {
        lock_timeout: Duration::from_millis(10),
        ..fresh
    };
    let (records, _) = RecordStore::new(impatient).load().await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn lock_is_released_when_the_operation_fails() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());
    store.create(Record::new("t-1", "Keep")).await.unwrap();
    let before = std::fs::read_to_string(store.data_path()).unwrap();

    let err = store
        .update(|mut records| {
            records[0].title = "   ".to_string();
            records
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let refused = store
        .try_update(|_| Err(Error::Config("refused".to_string())))
        .await
        .unwrap_err();
    assert!(matches!(refused, Error::Config(_)));

    assert!(!store.lock_path().exists());
    assert_eq!(std::fs::read_to_string(store.data_path()).unwrap(), before);
}

#[tokio::test]
async fn operations_in_one_process_queue_in_order() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(store_in(dir.path()));

    let mut handles = Vec::new();
    for i in 0..5 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .create(Record::new(format!("t-{i}"), format!("Task {i}")))
                .await
        }));
        tokio::task::yield_now().await;
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let (records, _) = store.load().await.unwrap();
    assert_eq!(records.len(), 5);
}
