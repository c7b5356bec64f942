//! Hot reload: an out-of-band edit of the policy resource is picked up
//! without restarting the process.

use std::sync::Arc;
use std::time::Duration;

use error_policy::*;

const SUPPRESS_DEADLOCKS: &str = r#"{ "ignoredErrors": [ { "pattern": "deadlocked", "description": "edited by ops", "enabled": true } ] }"#;

async fn eventually(store: &ErrorPolicyStore, message: &str) -> bool {
    for _ in 0..200 {
        if store.classify_message(message).is_suppressed() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

#[tokio::test]
async fn test_poller_reload_reflects_external_edit() {
    let source = Arc::new(MemoryPolicySource::with_contents("{}"));
    let store = Arc::new(ErrorPolicyStore::open(source.clone()).await);
    assert!(!store.classify_message("Transaction was deadlocked").is_suppressed());

    let (_watch, events) = poll_modifications(source.clone(), Duration::from_millis(10)).await;
    let reloader = store.attach_watcher(events);

    source.replace(SUPPRESS_DEADLOCKS);
    assert!(eventually(&store, "Transaction was deadlocked").await);
    assert_eq!(store.origin(), PolicyOrigin::Loaded);

    reloader.abort();
}

#[tokio::test]
async fn test_poller_reload_after_removal_installs_default() {
    let source = Arc::new(MemoryPolicySource::with_contents(SUPPRESS_DEADLOCKS));
    let store = Arc::new(ErrorPolicyStore::open(source.clone()).await);
    assert!(store.classify_message("deadlocked").is_suppressed());

    let (_watch, events) = poll_modifications(source.clone(), Duration::from_millis(10)).await;
    store.attach_watcher(events);

    source.remove();
    for _ in 0..200 {
        if store.origin() == PolicyOrigin::Default {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(store.origin(), PolicyOrigin::Default);
    assert!(!store.classify_message("deadlocked").is_suppressed());
}

#[tokio::test]
async fn test_file_watcher_reload_reflects_external_edit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("error-filter.json");
    std::fs::write(&path, "{}").unwrap();

    let store = Arc::new(ErrorPolicyStore::open(Arc::new(FilePolicySource::new(&path))).await);
    let (_watch, events) = watch_file(&path).unwrap();
    store.attach_watcher(events);

    std::fs::write(&path, SUPPRESS_DEADLOCKS).unwrap();
    assert!(eventually(&store, "Transaction was deadlocked").await);
}

#[tokio::test]
async fn test_watcher_task_ends_when_store_is_dropped() {
    let source = Arc::new(MemoryPolicySource::with_contents("{}"));
    let store = Arc::new(ErrorPolicyStore::open(source.clone()).await);

    let (_watch, events) = poll_modifications(source.clone(), Duration::from_millis(10)).await;
    let reloader = store.attach_watcher(events);
    drop(store);

    source.replace(SUPPRESS_DEADLOCKS);
    tokio::time::timeout(Duration::from_secs(5), reloader)
        .await
        .unwrap()
        .unwrap();
}
