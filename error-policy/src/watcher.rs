// Change detection for the policy resource.
//
// Watchers only publish `ConfigChanged`; the store decides what to do with
// it (see `ErrorPolicyStore::attach_watcher`).
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::{PolicyError, Result};
use crate::providers::PolicySource;

/// Default interval between modification checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// The backing resource changed underneath the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChanged {
    pub modified: Option<SystemTime>,
}

/// Keeps a watcher alive; dropping it stops change detection.
pub struct WatchHandle {
    task: Option<JoinHandle<()>>,
    _fs_watcher: Option<RecommendedWatcher>,
}

impl WatchHandle {
    pub fn stop(self) {}
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Poll `source.modified()` and publish an event whenever it differs from
/// the last observed value.
///
/// The channel holds a single pending event: if a reload is already queued,
/// further changes are folded into it.
pub async fn poll_modifications(
    source: Arc<dyn PolicySource>,
    interval: Duration,
) -> (WatchHandle, mpsc::Receiver<ConfigChanged>) {
    let (tx, rx) = mpsc::channel(1);
    let mut last_seen = source.modified().await.ok().flatten();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let modified = match source.modified().await {
                Ok(modified) => modified,
                Err(e) => {
                    debug!(resource = %source.describe(), error = %e, "Policy modification check failed");
                    continue;
                }
            };

            if modified == last_seen {
                continue;
            }
            last_seen = modified;

            match tx.try_send(ConfigChanged { modified }) {
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Closed(_)) => break,
            }
        }
    });

    (
        WatchHandle {
            task: Some(task),
            _fs_watcher: None,
        },
        rx,
    )
}

/// Watch a policy file through the platform's filesystem notifications.
///
/// The parent directory is watched rather than the file itself so editors
/// that save by rename are still seen.
///
/// # Errors
///
/// The path has no file name, or the platform watcher cannot be created.
pub fn watch_file(path: &Path) -> Result<(WatchHandle, mpsc::Receiver<ConfigChanged>)> {
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| PolicyError::WatchTarget(path.display().to_string()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let target = path.to_path_buf();

    let (tx, rx) = mpsc::channel(1);
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Policy file watcher error");
                return;
            }
        };

        let touches_target = event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()));
        let relevant = matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        );

        if touches_target && relevant {
            let modified = std::fs::metadata(&target).and_then(|m| m.modified()).ok();
            if let Err(TrySendError::Closed(_)) = tx.try_send(ConfigChanged { modified }) {
                debug!("Policy file watcher has no subscriber");
            }
        }
    })?;
    watcher.watch(&directory, RecursiveMode::NonRecursive)?;

    Ok((
        WatchHandle {
            task: None,
            _fs_watcher: Some(watcher),
        },
        rx,
    ))
}
