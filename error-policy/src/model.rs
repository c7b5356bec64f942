// Error filter document model. Field names follow the on-disk JSON format.
use serde::{Deserialize, Serialize};

use crate::error::Result;

fn enabled_by_default() -> bool {
    true
}

/// Substring suppression rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRule {
    pub pattern: String,
    #[serde(default)]
    pub description: String,
    /// Missing in the document reads as disabled.
    #[serde(default)]
    pub enabled: bool,
}

impl ErrorRule {
    pub fn new<P: Into<String>, D: Into<String>>(pattern: P, description: D, enabled: bool) -> Self {
        Self {
            pattern: pattern.into(),
            description: description.into(),
            enabled,
        }
    }
}

/// Regular-expression suppression rule, consulted after the substring rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexRule {
    #[serde(rename = "regex")]
    pub pattern: String,
    #[serde(default)]
    pub description: String,
    /// Missing in the document reads as disabled.
    #[serde(default)]
    pub enabled: bool,
}

impl RegexRule {
    pub fn new<P: Into<String>, D: Into<String>>(pattern: P, description: D, enabled: bool) -> Self {
        Self {
            pattern: pattern.into(),
            description: description.into(),
            enabled,
        }
    }
}

/// Severity used when an unsuppressed failure is logged.
///
/// Anything other than `"error"` in the document reads as `Warn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum LogLevel {
    #[default]
    Warn,
    Error,
}

impl From<String> for LogLevel {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("error") {
            Self::Error
        } else {
            Self::Warn
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySettings {
    #[serde(default = "enabled_by_default")]
    pub use_regex_matching: bool,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            use_regex_matching: true,
            case_sensitive: false,
            log_level: LogLevel::Warn,
        }
    }
}

/// Root of the error filter document.
///
/// `Default` is the empty, permissive policy installed whenever the backing
/// resource cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(rename = "ignoredErrors", default)]
    pub error_rules: Vec<ErrorRule>,
    #[serde(rename = "ignoredPatterns", default)]
    pub regex_rules: Vec<RegexRule>,
    #[serde(rename = "logIgnoredErrors", default)]
    pub log_suppressed_errors: bool,
    #[serde(default)]
    pub settings: PolicySettings,
}

impl PolicyConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // =========================================================================
    // Authoring
    // =========================================================================

    /// Append unless a rule with the same pattern exists. Returns whether
    /// the rule was added.
    pub fn add_error_rule(&mut self, rule: ErrorRule) -> bool {
        if self.error_rules.iter().any(|r| r.pattern == rule.pattern) {
            return false;
        }
        self.error_rules.push(rule);
        true
    }

    pub fn add_regex_rule(&mut self, rule: RegexRule) -> bool {
        if self.regex_rules.iter().any(|r| r.pattern == rule.pattern) {
            return false;
        }
        self.regex_rules.push(rule);
        true
    }

    /// Returns whether anything was removed.
    pub fn remove_error_rule(&mut self, pattern: &str) -> bool {
        let before = self.error_rules.len();
        self.error_rules.retain(|r| r.pattern != pattern);
        self.error_rules.len() != before
    }

    pub fn remove_regex_rule(&mut self, pattern: &str) -> bool {
        let before = self.regex_rules.len();
        self.regex_rules.retain(|r| r.pattern != pattern);
        self.regex_rules.len() != before
    }

    /// Returns whether a rule with this pattern was found.
    pub fn toggle_error_rule(&mut self, pattern: &str, enabled: bool) -> bool {
        match self.error_rules.iter_mut().find(|r| r.pattern == pattern) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn toggle_regex_rule(&mut self, pattern: &str, enabled: bool) -> bool {
        match self.regex_rules.iter_mut().find(|r| r.pattern == pattern) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }
}
