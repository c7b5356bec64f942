use std::fmt;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::error::PolicyError;
use crate::model::PolicyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Exact,
    Regex,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Regex => write!(f, "regex"),
        }
    }
}

/// The rule that caused a suppression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRule {
    pub kind: RuleKind,
    pub pattern: String,
    pub description: String,
}

/// Outcome of classifying one error message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    rule: Option<MatchedRule>,
}

impl Classification {
    pub fn not_suppressed() -> Self {
        Self { rule: None }
    }

    pub fn suppressed_by(rule: MatchedRule) -> Self {
        Self { rule: Some(rule) }
    }

    pub fn is_suppressed(&self) -> bool {
        self.rule.is_some()
    }

    pub fn rule(&self) -> Option<&MatchedRule> {
        self.rule.as_ref()
    }
}

/// What the caller should do with a failure. Both flags are always equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub should_log: bool,
    pub should_throw: bool,
}

impl From<&Classification> for Decision {
    fn from(classification: &Classification) -> Self {
        let propagate = !classification.is_suppressed();
        Self {
            should_log: propagate,
            should_throw: propagate,
        }
    }
}

/// A policy document with its matchers prepared for classification.
///
/// Substring patterns are case-folded once and regex rules compiled once per
/// snapshot. A regex that fails to compile is reported here and then never
/// matches.
#[derive(Debug)]
pub struct CompiledPolicy {
    config: PolicyConfig,
    exact_patterns: Vec<String>,
    regexes: Vec<Option<Regex>>,
}

impl CompiledPolicy {
    pub fn compile(config: PolicyConfig) -> Self {
        let case_sensitive = config.settings.case_sensitive;

        let exact_patterns = config
            .error_rules
            .iter()
            .map(|rule| fold_case(&rule.pattern, case_sensitive))
            .collect();

        let regexes = config
            .regex_rules
            .iter()
            .map(|rule| {
                match RegexBuilder::new(&rule.pattern)
                    .case_insensitive(!case_sensitive)
                    .build()
                {
                    Ok(regex) => Some(regex),
                    Err(source) => {
                        let err = PolicyError::InvalidRegex {
                            pattern: rule.pattern.clone(),
                            source,
                        };
                        warn!(code = err.code(), error = %err, "Skipping regex rule");
                        None
                    }
                }
            })
            .collect();

        Self {
            config,
            exact_patterns,
            regexes,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Ordered first-match scan: enabled substring rules, then (when regex
    /// matching is on) enabled regex rules against the original message.
    pub fn classify_message(&self, message: &str) -> Classification {
        let compare_message = fold_case(message, self.config.settings.case_sensitive);

        let exact = self
            .config
            .error_rules
            .iter()
            .zip(&self.exact_patterns)
            .find(|(rule, pattern)| rule.enabled && compare_message.contains(pattern.as_str()));

        if let Some((rule, _)) = exact {
            return Classification::suppressed_by(MatchedRule {
                kind: RuleKind::Exact,
                pattern: rule.pattern.clone(),
                description: rule.description.clone(),
            });
        }

        if !self.config.settings.use_regex_matching {
            return Classification::not_suppressed();
        }

        let by_regex = self
            .config
            .regex_rules
            .iter()
            .zip(&self.regexes)
            .find(|(rule, regex)| {
                rule.enabled && regex.as_ref().is_some_and(|re| re.is_match(message))
            });

        match by_regex {
            Some((rule, _)) => Classification::suppressed_by(MatchedRule {
                kind: RuleKind::Regex,
                pattern: rule.pattern.clone(),
                description: rule.description.clone(),
            }),
            None => Classification::not_suppressed(),
        }
    }
}

fn fold_case(value: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        value.to_string()
    } else {
        value.to_lowercase()
    }
}
