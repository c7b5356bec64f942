// Lazily opened, per-target connection pools.
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::DatabaseResult;
use crate::transport::{DatabaseTarget, SqlTransport, TransportConnector};

type Slot = Mutex<Option<Arc<dyn SqlTransport>>>;

/// One pool per [`DatabaseTarget`], opened on first use.
///
/// Concurrent first use opens a single pool. A closed target reopens on
/// its next use.
pub struct PoolRegistry {
    connector: Arc<dyn TransportConnector>,
    primary: Slot,
    warehouse: Slot,
}

impl PoolRegistry {
    pub fn new(connector: Arc<dyn TransportConnector>) -> Self {
        Self {
            connector,
            primary: Mutex::new(None),
            warehouse: Mutex::new(None),
        }
    }

    fn slot(&self, target: DatabaseTarget) -> &Slot {
        match target {
            DatabaseTarget::Primary => &self.primary,
            DatabaseTarget::Warehouse => &self.warehouse,
        }
    }

    /// The open pool for `target`, connecting if there is none.
    ///
    /// # Errors
    ///
    /// The connector failed; nothing is cached and the next call retries.
    pub async fn acquire(&self, target: DatabaseTarget) -> DatabaseResult<Arc<dyn SqlTransport>> {
        let mut slot = self.slot(target).lock().await;
        if let Some(transport) = slot.as_ref() {
            return Ok(Arc::clone(transport));
        }

        let transport = self.connector.connect(target).await?;
        info!(target_db = %target, "Connected to database");
        *slot = Some(Arc::clone(&transport));
        Ok(transport)
    }

    pub async fn is_open(&self, target: DatabaseTarget) -> bool {
        self.slot(target).lock().await.is_some()
    }

    /// Returns whether a pool was open.
    pub async fn close(&self, target: DatabaseTarget) -> bool {
        let transport = self.slot(target).lock().await.take();
        match transport {
            Some(transport) => {
                transport.close().await;
                true
            }
            None => false,
        }
    }

    pub async fn close_all(&self) {
        self.close(DatabaseTarget::Primary).await;
        self.close(DatabaseTarget::Warehouse).await;
    }
}
