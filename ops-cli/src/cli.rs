// Command-line surface of the `rxops` binary.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// RxOps operator tool
#[derive(Parser, Debug)]
#[command(name = "rxops")]
#[command(about = "Manage the RxOps error filter and inspect its databases")]
#[command(version)]
pub struct Cli {
    /// Error filter document
    #[arg(long, env = "RXOPS_ERROR_FILTER", default_value = "error-filter.json", global = true)]
    pub policy: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage ignored error patterns
    #[command(subcommand)]
    Exceptions(ExceptionsCommand),
    /// Database diagnostics
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ExceptionsCommand {
    /// Show every rule and setting
    List,
    /// Ignore errors containing a substring
    AddError(AddRule),
    /// Ignore errors matching a regular expression
    AddRegex(AddRule),
    /// Enable or disable an error pattern
    ToggleError(ToggleRule),
    /// Enable or disable a regex pattern
    ToggleRegex(ToggleRule),
    /// Delete an error pattern
    RemoveError(PatternArg),
    /// Delete a regex pattern
    RemoveRegex(PatternArg),
    /// Log errors when a rule suppresses them
    LogSuppressed {
        #[arg(value_enum)]
        switch: Switch,
    },
    /// Check whether a message would be ignored
    Test {
        /// Error message to classify
        message: String,
    },
    /// Menu-driven exception manager
    Interactive,
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct AddRule {
    pub pattern: String,

    /// What the rule is for
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Add the rule switched off
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct ToggleRule {
    pub pattern: String,

    /// Switch the rule on (default: flip)
    #[arg(long, conflicts_with = "off")]
    pub on: bool,

    /// Switch the rule off (default: flip)
    #[arg(long)]
    pub off: bool,
}

impl ToggleRule {
    /// The requested state given the rule's current one.
    pub fn resolve(&self, current: bool) -> bool {
        if self.on {
            true
        } else if self.off {
            false
        } else {
            !current
        }
    }
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct PatternArg {
    pub pattern: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
    Toggle,
}

impl Switch {
    pub fn resolve(self, current: bool) -> bool {
        match self {
            Self::On => true,
            Self::Off => false,
            Self::Toggle => !current,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum DbCommand {
    /// Connect, print the server version and list tables
    Check {
        /// Inspect the warehouse database instead of the primary one
        #[arg(long)]
        warehouse: bool,
    },
    /// List a table's columns and data types
    Columns {
        table: String,

        /// Inspect the warehouse database instead of the primary one
        #[arg(long)]
        warehouse: bool,
    },
}
