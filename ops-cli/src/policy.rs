// Error filter store as the binary runs it: loaded once, reloaded on edits.
use std::path::Path;
use std::sync::Arc;

use error_policy::{poll_modifications, watch_file, ErrorPolicyStore, FilePolicySource, WatchHandle, DEFAULT_POLL_INTERVAL};
use tracing::{debug, warn};

/// Open the filter document at `path` and keep the store in step with
/// out-of-band edits for as long as the returned handle lives.
///
/// Filesystem notifications are preferred; when the platform watcher cannot
/// be created the file's modification time is polled instead.
pub async fn open_watched(path: &Path, development: bool) -> (Arc<ErrorPolicyStore>, WatchHandle) {
    let source = Arc::new(FilePolicySource::new(path));
    let store = Arc::new(
        ErrorPolicyStore::open(source.clone())
            .await
            .with_development_mode(development),
    );

    let (watch, events) = match watch_file(path) {
        Ok(watching) => watching,
        Err(e) => {
            warn!(policy = %path.display(), error = %e, "File watcher unavailable, polling for changes");
            poll_modifications(source, DEFAULT_POLL_INTERVAL).await
        }
    };
    store.attach_watcher(events);

    debug!(policy = %path.display(), origin = ?store.origin(), "Error filter ready");
    (store, watch)
}
