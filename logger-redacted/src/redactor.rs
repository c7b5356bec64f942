use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{Captures, Regex, Replacer};

lazy_static! {
    static ref DSN_CREDENTIAL_REGEX: Regex = Regex::new(r"(?i)\b(postgres(?:ql)?://[^:/\s@]+):[^@\s]+@").unwrap();
    static ref ASSIGNED_CREDENTIAL_REGEX: Regex = Regex::new(r#"(?i)\b(password|pwd|secret|token)\s*[=:]\s*(?:"[^"]*"|'[^']*'|[^\s;,]+)"#).unwrap();
    static ref EMAIL_REGEX: Regex = Regex::new(r"\b(?P<local>[A-Za-z0-9._%+-]+)@(?P<domain>[A-Za-z0-9.-]+\.[A-Za-z]{2,})\b").unwrap();
    static ref SSN_REGEX: Regex = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap();
    static ref PHONE_REGEX: Regex = Regex::new(r"(?:\+1[-.\s]?)?\(?\b[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s][0-9]{4}\b").unwrap();
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_credentials: bool,
    pub redact_emails: bool,
    pub redact_ssn: bool,
    pub redact_phones: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_credentials: true,
            redact_emails: true,
            redact_ssn: true,
            redact_phones: true,
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionConfig {
    pub fn with_custom_pattern<S: Into<String>>(mut self, pattern: Regex, replacement: S) -> Self {
        self.custom_patterns.push((pattern, replacement.into()));
        self
    }
}

/// Redactor for error text headed to the logs.
///
/// Database errors regularly echo back parameter values (patient e-mails,
/// phone numbers) and connection strings; this strips them before they are
/// written. Text without sensitive content is returned borrowed.
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut result = Cow::Borrowed(text);

        // Credentials first: a DSN's `user:pass@host` would otherwise be
        // half-eaten by the e-mail pattern.
        if self.config.redact_credentials {
            result = replace(result, &DSN_CREDENTIAL_REGEX, "${1}:[REDACTED]@");
            result = replace(result, &ASSIGNED_CREDENTIAL_REGEX, "${1}=[REDACTED]");
        }

        if self.config.redact_emails {
            result = replace(result, &EMAIL_REGEX, |caps: &Captures| {
                format!("{}***@{}***", first_char(&caps["local"]), first_char(&caps["domain"]))
            });
        }

        if self.config.redact_ssn {
            result = replace(result, &SSN_REGEX, "***-**-****");
        }

        if self.config.redact_phones {
            result = replace(result, &PHONE_REGEX, "(***) ***-****");
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = replace(result, pattern, replacement.as_str());
        }

        result
    }
}

fn replace<'a, R: Replacer>(text: Cow<'a, str>, pattern: &Regex, replacer: R) -> Cow<'a, str> {
    let replaced = match pattern.replace_all(&text, replacer) {
        Cow::Owned(s) => Some(s),
        Cow::Borrowed(_) => None,
    };
    match replaced {
        Some(s) => Cow::Owned(s),
        None => text,
    }
}

fn first_char(value: &str) -> String {
    value.chars().next().map(String::from).unwrap_or_default()
}
