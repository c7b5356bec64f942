//! Log events emitted by classification and decide
//!
//! Events are captured through a JSON `fmt` layer writing into a shared
//! buffer, installed as the thread-local default for each test.

use std::io;
use std::sync::Arc;

use error_policy::*;
use parking_lot::Mutex;
use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn events(&self) -> Vec<Value> {
        let bytes = self.0.lock().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn find(&self, message: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|event| event["fields"]["message"] == message)
            .collect()
    }
}

fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(move || writer.clone()),
    );
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}

#[derive(Debug)]
struct DriverError(&'static str);

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for DriverError {}

async fn store_with(document: &str) -> ErrorPolicyStore {
    ErrorPolicyStore::open(Arc::new(MemoryPolicySource::with_contents(document))).await
}

#[tokio::test]
async fn test_ignored_error_event_names_first_inserted_rule() {
    let store = store_with(
        r#"{
  "ignoredErrors": [
    { "pattern": "deadlock", "description": "Nightly batch contention", "enabled": true },
    { "pattern": "deadlocked", "description": "Second rule", "enabled": true }
  ],
  "logIgnoredErrors": true
}"#,
    )
    .await;
    let (captured, _guard) = capture();

    store.decide(&DriverError("Transaction was deadlocked on lock resources"), "Query Execution");

    let events = captured.find("Ignored error");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["level"], "INFO");
    assert_eq!(events[0]["fields"]["description"], "Nightly batch contention");
    assert_eq!(events[0]["fields"]["rule_kind"], "exact");
    assert!(captured.find("Error").is_empty());
}

#[tokio::test]
async fn test_ignored_error_event_requires_flag() {
    let store = store_with(
        r#"{ "ignoredErrors": [ { "pattern": "deadlock", "description": "", "enabled": true } ] }"#,
    )
    .await;
    let (captured, _guard) = capture();

    store.decide(&DriverError("deadlock victim"), "Query Execution");

    assert!(captured.find("Ignored error").is_empty());
    assert!(captured.find("Error").is_empty());
}

#[tokio::test]
async fn test_propagated_failure_logged_at_configured_level() {
    let store = store_with(r#"{ "settings": { "logLevel": "error" } }"#).await;
    let (captured, _guard) = capture();

    store.decide(&DriverError("Invalid object name 'cdc_patient_data'"), "DW Production Query");

    let events = captured.find("Error");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["level"], "ERROR");
    assert_eq!(events[0]["fields"]["context"], "DW Production Query");
    assert_eq!(events[0]["fields"]["error"], "Invalid object name 'cdc_patient_data'");
}

#[tokio::test]
async fn test_propagated_failure_defaults_to_warn() {
    let store = store_with("{}").await;
    let (captured, _guard) = capture();

    store.decide(&DriverError("connection reset"), "Database Connection");

    let events = captured.find("Error");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["level"], "WARN");
}
