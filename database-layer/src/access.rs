use std::sync::Arc;

use error_policy::ErrorPolicyStore;
use tracing::debug;

use crate::error::DatabaseResult;
use crate::params::{ParamTyping, Params};
use crate::pool::PoolRegistry;
use crate::transport::{DatabaseTarget, Row, SqlTransport, TransportConnector};

/// Result of an operation whose failure may have been suppressed by policy
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Suppressed,
}

impl<T> Outcome<T> {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Suppressed => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Suppressed => Outcome::Suppressed,
        }
    }
}

impl<T: Default> Outcome<T> {
    /// The value, or the empty default when suppressed.
    pub fn unwrap_or_default(self) -> T {
        self.completed().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Query(String),
    Procedure(String),
}

/// One data-layer operation: what to run, where, with which parameters,
/// and the context label failures are reported under.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    command: Command,
    target: DatabaseTarget,
    params: Params,
    context: Option<String>,
}

impl DataRequest {
    pub fn query<S: Into<String>>(sql: S) -> Self {
        Self::new(Command::Query(sql.into()))
    }

    pub fn procedure<S: Into<String>>(name: S) -> Self {
        Self::new(Command::Procedure(name.into()))
    }

    fn new(command: Command) -> Self {
        Self {
            command,
            target: DatabaseTarget::Primary,
            params: Params::new(),
            context: None,
        }
    }

    #[must_use]
    pub fn on(mut self, target: DatabaseTarget) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn bind<N: Into<String>, V: Into<crate::params::ParamValue>>(mut self, name: N, value: V) -> Self {
        self.params = self.params.bind(name, value);
        self
    }

    #[must_use]
    pub fn context<S: Into<String>>(mut self, label: S) -> Self {
        self.context = Some(label.into());
        self
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn target(&self) -> DatabaseTarget {
        self.target
    }

    /// The caller's label, or the default for the command and target.
    pub fn context_label(&self) -> String {
        if let Some(label) = &self.context {
            return label.clone();
        }
        match &self.command {
            Command::Query(_) => self.target.query_context().to_string(),
            Command::Procedure(name) => format!("Executing Stored Procedure: {name}"),
        }
    }
}

/// Policy-guarded access to the primary and warehouse databases.
///
/// Every failure, including failure to open a pool, is decided by the
/// shared [`ErrorPolicyStore`]. A suppressed failure yields an empty
/// result; anything else is logged under the request's context label and
/// returned unchanged.
pub struct ResilientDataAccess {
    pools: PoolRegistry,
    policy: Arc<ErrorPolicyStore>,
    typing: ParamTyping,
}

impl ResilientDataAccess {
    pub fn new(connector: Arc<dyn TransportConnector>, policy: Arc<ErrorPolicyStore>) -> Self {
        Self {
            pools: PoolRegistry::new(connector),
            policy,
            typing: ParamTyping::default(),
        }
    }

    #[must_use]
    pub fn with_param_typing(mut self, typing: ParamTyping) -> Self {
        self.typing = typing;
        self
    }

    pub fn policy(&self) -> &Arc<ErrorPolicyStore> {
        &self.policy
    }

    pub fn pools(&self) -> &PoolRegistry {
        &self.pools
    }

    // =========================================================================
    // Outcome-returning API
    // =========================================================================

    /// Open (or reuse) the pool for `target`, deciding connection failures
    /// under the target's connection label.
    ///
    /// # Errors
    ///
    /// The connection failure, when policy does not suppress it.
    pub async fn connect(&self, target: DatabaseTarget) -> DatabaseResult<Outcome<Arc<dyn SqlTransport>>> {
        let result = self.pools.acquire(target).await;
        self.settle(result, target.connection_context())
    }

    /// Run a request and report whether a failure was suppressed.
    ///
    /// # Errors
    ///
    /// Any unsuppressed connection or execution failure.
    pub async fn run(&self, request: &DataRequest) -> DatabaseResult<Outcome<Vec<Row>>> {
        let transport = match self.connect(request.target).await? {
            Outcome::Completed(transport) => transport,
            Outcome::Suppressed => return Ok(Outcome::Suppressed),
        };

        let params = request.params.typed(&self.typing);
        debug!(
            target_db = %request.target,
            context = %request.context_label(),
            params = params.len(),
            "Executing data request"
        );

        let result = match &request.command {
            Command::Query(sql) => transport.query(sql, &params).await,
            Command::Procedure(name) => transport.execute_procedure(name, &params).await,
        };
        self.settle(result, &request.context_label())
    }

    fn settle<T>(&self, result: DatabaseResult<T>, context: &str) -> DatabaseResult<Outcome<T>> {
        match result {
            Ok(value) => Ok(Outcome::Completed(value)),
            Err(err) => {
                if self.policy.decide(&err, context).should_throw {
                    Err(err)
                } else {
                    Ok(Outcome::Suppressed)
                }
            }
        }
    }

    // =========================================================================
    // Plain API: suppressed failures read as empty results
    // =========================================================================

    /// All rows, or an empty list when the failure was suppressed.
    ///
    /// # Errors
    ///
    /// Any unsuppressed failure.
    pub async fn fetch_all(&self, request: &DataRequest) -> DatabaseResult<Vec<Row>> {
        Ok(self.run(request).await?.unwrap_or_default())
    }

    /// The first row, or `None` when there is none or the failure was
    /// suppressed.
    ///
    /// # Errors
    ///
    /// Any unsuppressed failure.
    pub async fn fetch_optional(&self, request: &DataRequest) -> DatabaseResult<Option<Row>> {
        Ok(self.fetch_all(request).await?.into_iter().next())
    }

    /// Query the primary database under "Query Execution".
    ///
    /// # Errors
    ///
    /// Any unsuppressed failure.
    pub async fn query(&self, sql: &str, params: Params) -> DatabaseResult<Vec<Row>> {
        self.fetch_all(&DataRequest::query(sql).with_params(params)).await
    }

    /// Query the warehouse database under "DW Production Query".
    ///
    /// # Errors
    ///
    /// Any unsuppressed failure.
    pub async fn query_warehouse(&self, sql: &str, params: Params) -> DatabaseResult<Vec<Row>> {
        let request = DataRequest::query(sql)
            .on(DatabaseTarget::Warehouse)
            .with_params(params);
        self.fetch_all(&request).await
    }

    /// Invoke a stored procedure on the primary database.
    ///
    /// # Errors
    ///
    /// Any unsuppressed failure.
    pub async fn execute_procedure(&self, name: &str, params: Params) -> DatabaseResult<Vec<Row>> {
        self.fetch_all(&DataRequest::procedure(name).with_params(params)).await
    }

    /// Close both pools. Safe to call more than once.
    pub async fn close(&self) {
        self.pools.close_all().await;
    }
}
