//! Error suppression policy for the RxOps data layer
//!
//! Every data-layer failure in RxOps is routed through a single
//! [`ErrorPolicyStore`], which decides whether the failure is propagated
//! to the caller or swallowed so the caller degrades to an empty result.
//! The decision is driven by an operator-maintained JSON document:
//!
//! - **Exact rules**: case-folded substring matches, evaluated first
//! - **Regex rules**: evaluated only when no exact rule matched and
//!   `useRegexMatching` is on
//! - **Settings**: case sensitivity and the severity used for propagated failures
//!
//! Rules are scanned in insertion order and the first enabled match wins.
//!
//! # Hot Reload
//!
//! The document can be edited while the process runs. A watcher
//! ([`poll_modifications`] or [`watch_file`]) publishes [`ConfigChanged`]
//! events and [`ErrorPolicyStore::attach_watcher`] reloads on each one.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use error_policy::{ErrorPolicyStore, FilePolicySource, poll_modifications, DEFAULT_POLL_INTERVAL};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = Arc::new(FilePolicySource::new("error-filter.json"));
//!     let store = Arc::new(ErrorPolicyStore::open(source.clone()).await);
//!
//!     let (_watch, events) = poll_modifications(source, DEFAULT_POLL_INTERVAL).await;
//!     store.attach_watcher(events);
//!
//!     store.add_error_rule("login failed", "Kiosk password retries", true).await;
//!     assert!(store.classify_message("Login failed for user 'kiosk'").is_suppressed());
//! }
//! ```

pub mod classifier;
pub mod error;
pub mod model;
pub mod providers;
pub mod store;
pub mod watcher;

pub use classifier::*;
pub use error::*;
pub use model::*;
pub use providers::*;
pub use store::*;
pub use watcher::*;
