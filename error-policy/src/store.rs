use std::fmt::Display;
use std::sync::{Arc, Weak};

use logger_redacted::redact;
use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::classifier::{Classification, CompiledPolicy, Decision};
use crate::error::Result;
use crate::model::{ErrorRule, LogLevel, PolicyConfig, RegexRule};
use crate::providers::PolicySource;
use crate::watcher::ConfigChanged;

/// Where the in-memory policy came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOrigin {
    /// Parsed from the backing resource
    Loaded,
    /// Empty permissive fallback
    Default,
}

struct Snapshot {
    policy: Arc<CompiledPolicy>,
    origin: PolicyOrigin,
}

#[derive(Clone, Copy)]
enum PersistWhen {
    Changed,
    Always,
}

/// Process-wide error suppression policy.
///
/// Construct one at the composition root and hand out `Arc` clones. Reads
/// take the current snapshot and never block on authoring; authoring calls
/// are serialised among themselves. A reload triggered by the watcher is not
/// ordered against authoring: whichever write the watcher observes last wins.
pub struct ErrorPolicyStore {
    source: Arc<dyn PolicySource>,
    current: RwLock<Snapshot>,
    authoring: Mutex<()>,
    development_mode: bool,
}

impl ErrorPolicyStore {
    /// Create a store holding the default policy. Call [`load`](Self::load)
    /// to read the backing resource.
    pub fn new(source: Arc<dyn PolicySource>) -> Self {
        Self {
            source,
            current: RwLock::new(Snapshot {
                policy: Arc::new(CompiledPolicy::compile(PolicyConfig::default())),
                origin: PolicyOrigin::Default,
            }),
            authoring: Mutex::new(()),
            development_mode: false,
        }
    }

    /// Create and load in one step.
    pub async fn open(source: Arc<dyn PolicySource>) -> Self {
        let store = Self::new(source);
        store.load().await;
        store
    }

    /// Log the full error source chain for propagated failures
    pub fn with_development_mode(mut self, enabled: bool) -> Self {
        self.development_mode = enabled;
        self
    }

    pub fn source(&self) -> &Arc<dyn PolicySource> {
        &self.source
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Read the backing resource and replace the in-memory policy.
    ///
    /// Never fails: an unreadable or malformed document installs the default
    /// policy and logs a warning.
    pub async fn load(&self) -> PolicyOrigin {
        let (config, origin) = match self.read_config().await {
            Ok(config) => (config, PolicyOrigin::Loaded),
            Err(e) => {
                warn!(
                    resource = %self.source.describe(),
                    code = e.code(),
                    error = %e,
                    "Error filter config not found or invalid, using defaults"
                );
                (PolicyConfig::default(), PolicyOrigin::Default)
            }
        };

        debug!(
            resource = %self.source.describe(),
            exact_rules = config.error_rules.len(),
            regex_rules = config.regex_rules.len(),
            "Error filter config installed"
        );
        self.install(config, origin);
        origin
    }

    async fn read_config(&self) -> Result<PolicyConfig> {
        let raw = self.source.read().await?;
        PolicyConfig::from_json(&raw)
    }

    fn install(&self, config: PolicyConfig, origin: PolicyOrigin) {
        let policy = Arc::new(CompiledPolicy::compile(config));
        *self.current.write() = Snapshot { policy, origin };
    }

    pub fn origin(&self) -> PolicyOrigin {
        self.current.read().origin
    }

    /// The compiled policy as of now. Later reloads do not affect it.
    pub fn snapshot(&self) -> Arc<CompiledPolicy> {
        Arc::clone(&self.current.read().policy)
    }

    pub fn config(&self) -> PolicyConfig {
        self.snapshot().config().clone()
    }

    // =========================================================================
    // Classification
    // =========================================================================

    pub fn classify<E: Display + ?Sized>(&self, error: &E) -> Classification {
        self.classify_message(&error.to_string())
    }

    pub fn classify_message(&self, message: &str) -> Classification {
        let policy = self.snapshot();
        let classification = policy.classify_message(message);

        if let Some(rule) = classification.rule() {
            if policy.config().log_suppressed_errors {
                info!(
                    rule_kind = %rule.kind,
                    description = %rule.description,
                    "Ignored error"
                );
            }
        }

        classification
    }

    /// Classify and, when the error is not suppressed, log it at the
    /// configured level under `context`.
    pub fn decide<E>(&self, error: &E, context: &str) -> Decision
    where
        E: std::error::Error + ?Sized,
    {
        let classification = self.classify(error);
        let decision = Decision::from(&classification);

        if decision.should_log {
            self.log_failure(error, context);
        } else {
            debug!(context = context, "Error suppressed by policy");
        }

        decision
    }

    fn log_failure<E>(&self, error: &E, context: &str)
    where
        E: std::error::Error + ?Sized,
    {
        let level = self.snapshot().config().settings.log_level;
        let message = error.to_string();
        let message = redact(&message);

        match level {
            LogLevel::Error => error!(context = context, error = %message, "Error"),
            LogLevel::Warn => warn!(context = context, error = %message, "Error"),
        }

        if self.development_mode {
            let detail = format!("{error:?}");
            error!(context = context, detail = %redact(&detail), "Error detail");

            let mut cause = error.source();
            let mut depth = 1_usize;
            while let Some(err) = cause {
                let text = err.to_string();
                error!(context = context, depth, cause = %redact(&text), "Caused by");
                cause = err.source();
                depth += 1;
            }
        }
    }

    // =========================================================================
    // Authoring
    // =========================================================================

    /// Returns whether the rule was added (false when the pattern exists).
    pub async fn add_error_rule<P, D>(&self, pattern: P, description: D, enabled: bool) -> bool
    where
        P: Into<String>,
        D: Into<String>,
    {
        let rule = ErrorRule::new(pattern, description, enabled);
        self.author(PersistWhen::Changed, move |config| config.add_error_rule(rule))
            .await
    }

    pub async fn add_regex_rule<P, D>(&self, pattern: P, description: D, enabled: bool) -> bool
    where
        P: Into<String>,
        D: Into<String>,
    {
        let rule = RegexRule::new(pattern, description, enabled);
        self.author(PersistWhen::Changed, move |config| config.add_regex_rule(rule))
            .await
    }

    /// Persists even when nothing matched.
    pub async fn remove_error_rule(&self, pattern: &str) -> bool {
        self.author(PersistWhen::Always, |config| config.remove_error_rule(pattern))
            .await
    }

    pub async fn remove_regex_rule(&self, pattern: &str) -> bool {
        self.author(PersistWhen::Always, |config| config.remove_regex_rule(pattern))
            .await
    }

    /// No-op when the pattern is unknown.
    pub async fn toggle_error_rule(&self, pattern: &str, enabled: bool) -> bool {
        self.author(PersistWhen::Changed, |config| {
            config.toggle_error_rule(pattern, enabled)
        })
        .await
    }

    pub async fn toggle_regex_rule(&self, pattern: &str, enabled: bool) -> bool {
        self.author(PersistWhen::Changed, |config| {
            config.toggle_regex_rule(pattern, enabled)
        })
        .await
    }

    pub async fn set_log_suppressed_errors(&self, enabled: bool) {
        self.author(PersistWhen::Always, |config| {
            config.log_suppressed_errors = enabled;
            true
        })
        .await;
    }

    async fn author<F>(&self, when: PersistWhen, mutate: F) -> bool
    where
        F: FnOnce(&mut PolicyConfig) -> bool + Send,
    {
        let _guard = self.authoring.lock().await;

        let mut config = self.config();
        let changed = mutate(&mut config);
        if changed {
            let origin = self.origin();
            self.install(config.clone(), origin);
        }

        if (changed || matches!(when, PersistWhen::Always)) && self.persist_config(&config).await {
            self.current.write().origin = PolicyOrigin::Loaded;
        }

        changed
    }

    /// Write the current policy to the backing resource. Failures are logged
    /// and swallowed.
    pub async fn persist(&self) {
        let config = self.config();
        if self.persist_config(&config).await {
            self.current.write().origin = PolicyOrigin::Loaded;
        }
    }

    async fn persist_config(&self, config: &PolicyConfig) -> bool {
        match self.write_config(config).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    resource = %self.source.describe(),
                    code = e.code(),
                    error = %e,
                    "Failed to save error filter config"
                );
                false
            }
        }
    }

    /// Write the current policy to the backing resource.
    ///
    /// # Errors
    ///
    /// Serialization or resource write failures.
    pub async fn try_persist(&self) -> Result<()> {
        self.write_config(self.snapshot().config()).await
    }

    async fn write_config(&self, config: &PolicyConfig) -> Result<()> {
        let json = config.to_json_pretty()?;
        self.source.write(&json).await
    }

    // =========================================================================
    // Reload
    // =========================================================================

    /// Reload on every event until the channel closes or the store is
    /// dropped.
    pub fn attach_watcher(self: &Arc<Self>, mut events: mpsc::Receiver<ConfigChanged>) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(store) = store.upgrade() else {
                    break;
                };
                info!(
                    resource = %store.source.describe(),
                    modified = ?event.modified,
                    "Error filter config updated, reloading..."
                );
                store.load().await;
            }
            debug!("Error filter watcher detached");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryPolicySource;

    #[derive(Debug)]
    struct DriverError(String);

    impl Display for DriverError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl std::error::Error for DriverError {}

    /// Serves a fixed document and records every write.
    struct RecordingSource {
        document: &'static str,
        writes: parking_lot::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl PolicySource for RecordingSource {
        async fn read(&self) -> Result<String> {
            Ok(self.document.to_string())
        }

        async fn write(&self, contents: &str) -> Result<()> {
            self.writes.lock().push(contents.to_string());
            Ok(())
        }

        async fn modified(&self) -> Result<Option<std::time::SystemTime>> {
            Ok(None)
        }

        fn describe(&self) -> String {
            "recording".to_string()
        }
    }

    #[tokio::test]
    async fn test_missing_resource_installs_default() {
        let store = ErrorPolicyStore::open(Arc::new(MemoryPolicySource::new())).await;
        assert_eq!(store.origin(), PolicyOrigin::Default);
        assert_eq!(store.config(), PolicyConfig::default());
    }

    #[tokio::test]
    async fn test_decide_suppressed_and_propagated() {
        let source = MemoryPolicySource::with_contents(
            r#"{ "ignoredErrors": [ { "pattern": "login failed", "description": "kiosk", "enabled": true } ] }"#,
        );
        let store = ErrorPolicyStore::open(Arc::new(source))
            .await
            .with_development_mode(true);

        let suppressed = store.decide(&DriverError("Login Failed: bad password".into()), "Login Validation");
        assert!(!suppressed.should_log && !suppressed.should_throw);

        let propagated = store.decide(&DriverError("Invalid object name 'cdc_patient_data'".into()), "Query Execution");
        assert!(propagated.should_log && propagated.should_throw);
    }

    #[tokio::test]
    async fn test_toggle_unknown_pattern_does_not_persist() {
        let source = Arc::new(MemoryPolicySource::with_contents("{}"));
        let store = ErrorPolicyStore::open(source.clone()).await;

        assert!(!store.toggle_error_rule("nope", false).await);
        assert_eq!(source.contents().as_deref(), Some("{}"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_authoring_persists_its_own_mutation_during_reloads() {
        let source = Arc::new(RecordingSource {
            document: "{}",
            writes: parking_lot::Mutex::new(Vec::new()),
        });
        let store = Arc::new(ErrorPolicyStore::open(source.clone()).await);

        let reloader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..500 {
                    store.load().await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let patterns: Vec<String> = (0..50).map(|i| format!("rule-{i}")).collect();
        for pattern in &patterns {
            assert!(store.add_error_rule(pattern.as_str(), "", true).await);
        }
        reloader.await.unwrap();

        let writes = source.writes.lock();
        assert_eq!(writes.len(), patterns.len());
        for (written, pattern) in writes.iter().zip(&patterns) {
            let config = PolicyConfig::from_json(written).unwrap();
            assert!(config.error_rules.iter().any(|r| &r.pattern == pattern));
        }
    }

    #[tokio::test]
    async fn test_first_persist_marks_policy_loaded() {
        let source = Arc::new(MemoryPolicySource::new());
        let store = ErrorPolicyStore::open(source.clone()).await;
        assert_eq!(store.origin(), PolicyOrigin::Default);

        source.reject_writes(true);
        store.add_error_rule("timeout", "", true).await;
        assert_eq!(store.origin(), PolicyOrigin::Default);

        source.reject_writes(false);
        store.add_error_rule("deadlock", "", true).await;
        assert_eq!(store.origin(), PolicyOrigin::Loaded);
        assert!(source.contents().unwrap().contains("deadlock"));
    }

    #[tokio::test]
    async fn test_remove_unknown_pattern_still_persists() {
        let source = Arc::new(MemoryPolicySource::with_contents("{}"));
        let store = ErrorPolicyStore::open(source.clone()).await;

        assert!(!store.remove_regex_rule("nope").await);
        let written = source.contents().unwrap();
        assert!(written.contains("\"ignoredPatterns\""));
    }
}
