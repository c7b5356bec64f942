//! Operator tooling for RxOps
//!
//! The `rxops` binary manages the error filter document that decides which
//! data-layer failures are suppressed, and runs quick diagnostics against
//! the primary and warehouse databases.
//!
//! # Command Categories
//!
//! - **`exceptions`**: list, add, toggle and remove suppression rules, test
//!   a message against them, or drive the same actions from a menu
//! - **`db`**: connection check with table listing, column inspection
//!
//! Every command writes to a caller-supplied [`std::io::Write`] so the
//! handlers can be exercised without a terminal.

pub mod cli;
pub mod db;
pub mod exceptions;
pub mod interactive;
pub mod policy;

pub use cli::{Cli, Commands, DbCommand, ExceptionsCommand};
