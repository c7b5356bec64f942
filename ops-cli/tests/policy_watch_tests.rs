//! A long-running session keeps out-of-band edits to the filter file.

use std::time::Duration;

use error_policy::{ErrorPolicyStore, PolicyConfig};
use rxops::cli::AddRule;
use rxops::{exceptions, policy, ExceptionsCommand};

const EDITED: &str = r#"{ "ignoredErrors": [ { "pattern": "deadlocked", "description": "edited by ops", "enabled": true } ] }"#;

async fn eventually(store: &ErrorPolicyStore, message: &str) -> bool {
    for _ in 0..200 {
        if store.classify_message(message).is_suppressed() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_external_edit_survives_following_add() {
    colored::control::set_override(false);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("error-filter.json");
    std::fs::write(&path, "{}").unwrap();

    let (store, _watch) = policy::open_watched(&path, false).await;
    assert!(!store.classify_message("Transaction was deadlocked").is_suppressed());

    std::fs::write(&path, EDITED).unwrap();
    assert!(eventually(&store, "Transaction was deadlocked").await);

    let mut out = Vec::new();
    exceptions::execute(
        &store,
        ExceptionsCommand::AddError(AddRule {
            pattern: "login failed".into(),
            description: "Kiosk retries".into(),
            disabled: false,
        }),
        &mut out,
    )
    .await
    .unwrap();

    let persisted = PolicyConfig::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let patterns: Vec<&str> = persisted.error_rules.iter().map(|r| r.pattern.as_str()).collect();
    assert_eq!(patterns, vec!["deadlocked", "login failed"]);
}

#[tokio::test]
async fn test_missing_directory_falls_back_to_polling() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent").join("error-filter.json");

    let (store, _watch) = policy::open_watched(&path, false).await;
    assert_eq!(store.origin(), error_policy::PolicyOrigin::Default);
}
