//! Policy-guarded data access for RxOps
//!
//! Dashboards and services query two Postgres databases: the operational
//! database and the `dw_production` reporting warehouse. Every failure,
//! including failure to open a pool, is handed to the shared
//! [`ErrorPolicyStore`](error_policy::ErrorPolicyStore): a suppressed
//! failure degrades to an empty result, anything else is logged under the
//! operation's context label and returned to the caller unchanged.
//!
//! # Key Features
//!
//! - **Lazy pools**: one per [`DatabaseTarget`], opened on first use and
//!   closed idempotently
//! - **Named parameters**: `@name` placeholders with inferred SQL types
//! - **Stored procedures**: invoked as Postgres functions with named arguments
//! - **Two result shapes**: [`Outcome`] reports suppression explicitly, the
//!   plain methods collapse it to empty
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use database_layer::{DataRequest, DatabaseSettings, Params, PgConnector, ResilientDataAccess};
//! use error_policy::{ErrorPolicyStore, FilePolicySource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let policy = Arc::new(ErrorPolicyStore::open(Arc::new(FilePolicySource::new("error-filter.json"))).await);
//!     let connector = Arc::new(PgConnector::new(DatabaseSettings::from_env()?));
//!     let db = ResilientDataAccess::new(connector, policy);
//!
//!     let rows = db
//!         .query("SELECT * FROM orders WHERE store_id = @store", Params::new().bind("store", 12))
//!         .await?;
//!
//!     let login = DataRequest::procedure("usp_sys_login_validation")
//!         .bind("username", "kiosk")
//!         .context("Login Validation");
//!     let outcome = db.run(&login).await?;
//!
//!     println!("{} orders, login suppressed: {}", rows.len(), outcome.is_suppressed());
//!     db.close().await;
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod error;
pub mod params;
pub mod pool;
pub mod postgres;
pub mod settings;
pub mod sql;
pub mod transport;

pub use access::*;
pub use error::*;
pub use params::*;
pub use pool::*;
pub use postgres::*;
pub use settings::*;
pub use transport::*;
