//! Common error handling utilities for RxOps
//!
//! This module provides the workspace-wide error type and the stable error
//! codes used across all RxOps crates. Library crates keep their own
//! `thiserror` enums and expose a `code()` that maps onto [`codes`], so log
//! events from every layer can be correlated by code.
//!
//! # Error Categories
//!
//! - **DatabaseError**: Data-layer failures the error policy did not suppress
//! - **ConfigError**: Settings and policy-resource problems
//! - **ValidationError**: Operator input errors
//! - **IoError**: Filesystem and terminal errors
//!
//! # Example
//!
//! ```rust
//! use error_common::{RxOpsError, Result};
//!
//! fn require_pattern(pattern: &str) -> Result<&str> {
//!     if pattern.trim().is_empty() {
//!         return Err(RxOpsError::ValidationError("pattern cannot be empty".into()));
//!     }
//!     Ok(pattern)
//! }
//!
//! assert!(require_pattern("").is_err());
//! assert_eq!(require_pattern("login failed").ok(), Some("login failed"));
//! ```

pub mod types;
pub mod codes;

pub use types::*;
