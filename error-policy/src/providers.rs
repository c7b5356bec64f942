// Backing resources for the error filter document.
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{PolicyError, Result};

/// Durable store holding the serialized policy document
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// Read the whole document.
    async fn read(&self) -> Result<String>;

    /// Replace the whole document.
    async fn write(&self, contents: &str) -> Result<()>;

    /// Modification marker used for change detection; `None` when the
    /// resource does not exist.
    async fn modified(&self) -> Result<Option<SystemTime>>;

    /// Human-readable name for logs.
    fn describe(&self) -> String;

    /// Filesystem location, when there is one.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// JSON file on local disk
pub struct FilePolicySource {
    path: PathBuf,
}

impl FilePolicySource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl PolicySource for FilePolicySource {
    async fn read(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| PolicyError::Unreadable {
                resource: self.describe(),
                source,
            })
    }

    /// Writes a sibling staging file and renames it over the document so a
    /// concurrent reader never sees a half-written file.
    async fn write(&self, contents: &str) -> Result<()> {
        let staging = self.staging_path();
        let persist_err = |source| PolicyError::PersistFailed {
            resource: self.describe(),
            source,
        };

        tokio::fs::write(&staging, contents).await.map_err(persist_err)?;
        tokio::fs::rename(&staging, &self.path).await.map_err(persist_err)
    }

    async fn modified(&self) -> Result<Option<SystemTime>> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.modified().map(Some).map_err(|source| PolicyError::Unreadable {
                resource: self.describe(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PolicyError::Unreadable {
                resource: self.describe(),
                source,
            }),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

#[derive(Default)]
struct MemoryState {
    contents: Option<String>,
    revision: u64,
    reject_writes: bool,
}

/// In-memory policy resource for tests and embedded use.
///
/// Every write or external replacement bumps a revision counter that stands
/// in for the modification time.
#[derive(Default)]
pub struct MemoryPolicySource {
    state: Mutex<MemoryState>,
}

impl MemoryPolicySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents<S: Into<String>>(contents: S) -> Self {
        let source = Self::new();
        source.replace(contents);
        source
    }

    /// Simulate an out-of-band edit.
    pub fn replace<S: Into<String>>(&self, contents: S) {
        let mut state = self.state.lock();
        state.contents = Some(contents.into());
        state.revision += 1;
    }

    pub fn remove(&self) {
        let mut state = self.state.lock();
        state.contents = None;
        state.revision += 1;
    }

    pub fn contents(&self) -> Option<String> {
        self.state.lock().contents.clone()
    }

    /// Make subsequent writes fail, to exercise persistence errors.
    pub fn reject_writes(&self, reject: bool) {
        self.state.lock().reject_writes = reject;
    }
}

#[async_trait]
impl PolicySource for MemoryPolicySource {
    async fn read(&self) -> Result<String> {
        self.state
            .lock()
            .contents
            .clone()
            .ok_or_else(|| PolicyError::Unreadable {
                resource: self.describe(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no policy document"),
            })
    }

    async fn write(&self, contents: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.reject_writes {
            return Err(PolicyError::PersistFailed {
                resource: self.describe(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "writes rejected"),
            });
        }
        state.contents = Some(contents.to_string());
        state.revision += 1;
        Ok(())
    }

    async fn modified(&self) -> Result<Option<SystemTime>> {
        let state = self.state.lock();
        Ok(state
            .contents
            .as_ref()
            .map(|_| SystemTime::UNIX_EPOCH + Duration::from_secs(state.revision)))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_source_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = FilePolicySource::new(dir.path().join("error-filter.json"));

        assert!(source.modified().await.unwrap().is_none());
        assert!(matches!(source.read().await, Err(PolicyError::Unreadable { .. })));

        source.write("{}").await.unwrap();
        assert_eq!(source.read().await.unwrap(), "{}");
        assert!(source.modified().await.unwrap().is_some());
        assert!(!dir.path().join("error-filter.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_memory_source_revisions() {
        let source = MemoryPolicySource::new();
        assert!(source.modified().await.unwrap().is_none());

        source.replace("{}");
        let first = source.modified().await.unwrap();
        source.write("{ }").await.unwrap();
        let second = source.modified().await.unwrap();
        assert_ne!(first, second);

        source.reject_writes(true);
        assert!(matches!(source.write("{}").await, Err(PolicyError::PersistFailed { .. })));
        assert_eq!(source.contents().as_deref(), Some("{ }"));
    }
}
