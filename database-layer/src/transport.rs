// Driver seam between the resilient facade and a concrete database.
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DatabaseResult;
use crate::params::TypedParam;

/// One result row keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The two databases the data layer talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseTarget {
    /// The operational database named by `DB_NAME`
    Primary,
    /// The reporting warehouse (`dw_production` unless configured)
    Warehouse,
}

impl DatabaseTarget {
    /// Policy context for failures while opening the pool.
    pub fn connection_context(self) -> &'static str {
        match self {
            Self::Primary => "Database Connection",
            Self::Warehouse => "DW Production Connection",
        }
    }

    /// Policy context for query failures when the caller gave none.
    pub fn query_context(self) -> &'static str {
        match self {
            Self::Primary => "Query Execution",
            Self::Warehouse => "DW Production Query",
        }
    }
}

impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Warehouse => write!(f, "warehouse"),
        }
    }
}

/// An open connection pool to one database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SqlTransport: Send + Sync {
    /// Run SQL text with `@name` placeholders bound from `params`.
    async fn query(&self, sql: &str, params: &[TypedParam]) -> DatabaseResult<Vec<Row>>;

    /// Invoke a stored procedure with named arguments.
    async fn execute_procedure(&self, name: &str, params: &[TypedParam]) -> DatabaseResult<Vec<Row>>;

    /// Release every pooled connection.
    async fn close(&self);
}

/// Opens transports on demand.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, target: DatabaseTarget) -> DatabaseResult<Arc<dyn SqlTransport>>;
}
