// Exception manager: the operator view of the error filter.
use std::io::Write;

use colored::Colorize;
use error_common::{Result, RxOpsError};
use error_policy::{ErrorPolicyStore, PolicyConfig};

use crate::cli::{AddRule, ExceptionsCommand, PatternArg, Switch, ToggleRule};
use crate::interactive;

/// Which rule list an operation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleList {
    Errors,
    Regexes,
}

impl RuleList {
    fn noun(self) -> &'static str {
        match self {
            Self::Errors => "error pattern",
            Self::Regexes => "regex pattern",
        }
    }

    /// `(pattern, enabled)` pairs in rule order.
    pub fn entries(self, config: &PolicyConfig) -> Vec<(String, bool)> {
        match self {
            Self::Errors => config
                .error_rules
                .iter()
                .map(|r| (r.pattern.clone(), r.enabled))
                .collect(),
            Self::Regexes => config
                .regex_rules
                .iter()
                .map(|r| (r.pattern.clone(), r.enabled))
                .collect(),
        }
    }
}

pub async fn execute<W: Write>(
    store: &ErrorPolicyStore,
    command: ExceptionsCommand,
    out: &mut W,
) -> Result<()> {
    match command {
        ExceptionsCommand::List => render_policy(&store.config(), out),
        ExceptionsCommand::AddError(rule) => add(store, RuleList::Errors, rule, out).await,
        ExceptionsCommand::AddRegex(rule) => add(store, RuleList::Regexes, rule, out).await,
        ExceptionsCommand::ToggleError(toggle) => {
            set_enabled(store, RuleList::Errors, &toggle, out).await
        }
        ExceptionsCommand::ToggleRegex(toggle) => {
            set_enabled(store, RuleList::Regexes, &toggle, out).await
        }
        ExceptionsCommand::RemoveError(PatternArg { pattern }) => {
            remove(store, RuleList::Errors, &pattern, out).await
        }
        ExceptionsCommand::RemoveRegex(PatternArg { pattern }) => {
            remove(store, RuleList::Regexes, &pattern, out).await
        }
        ExceptionsCommand::LogSuppressed { switch } => log_suppressed(store, switch, out).await,
        ExceptionsCommand::Test { message } => test_message(store, &message, out),
        ExceptionsCommand::Interactive => interactive::run(store, out).await,
    }
}

fn status(enabled: bool) -> colored::ColoredString {
    if enabled {
        "✓".green()
    } else {
        "✗".red()
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

pub fn render_policy<W: Write>(config: &PolicyConfig, out: &mut W) -> Result<()> {
    writeln!(out, "\n{}", "--- Ignored Error Patterns ---".bold())?;
    if config.error_rules.is_empty() {
        writeln!(out, "No error patterns configured")?;
    }
    for (index, rule) in config.error_rules.iter().enumerate() {
        writeln!(out, "{}. [{}] \"{}\"", index + 1, status(rule.enabled), rule.pattern)?;
        writeln!(out, "   Description: {}", describe(&rule.description))?;
    }

    writeln!(out, "\n{}", "--- Ignored Regex Patterns ---".bold())?;
    if config.regex_rules.is_empty() {
        writeln!(out, "No regex patterns configured")?;
    }
    for (index, rule) in config.regex_rules.iter().enumerate() {
        writeln!(out, "{}. [{}] /{}/", index + 1, status(rule.enabled), rule.pattern)?;
        writeln!(out, "   Description: {}", describe(&rule.description))?;
    }

    writeln!(out, "\nLog Ignored Errors: {}", yes_no(config.log_suppressed_errors))?;
    writeln!(out, "Case Sensitive: {}", yes_no(config.settings.case_sensitive))?;
    writeln!(out, "Use Regex Matching: {}", yes_no(config.settings.use_regex_matching))?;
    Ok(())
}

fn describe(description: &str) -> &str {
    if description.is_empty() {
        "N/A"
    } else {
        description
    }
}

pub async fn add<W: Write>(store: &ErrorPolicyStore, list: RuleList, rule: AddRule, out: &mut W) -> Result<()> {
    let AddRule {
        pattern,
        description,
        disabled,
    } = rule;

    let added = match list {
        RuleList::Errors => store.add_error_rule(pattern.clone(), description, !disabled).await,
        RuleList::Regexes => store.add_regex_rule(pattern.clone(), description, !disabled).await,
    };

    if added {
        writeln!(out, "{} {} added successfully", "✓".green(), capitalize(list.noun()))?;
        Ok(())
    } else {
        Err(RxOpsError::ValidationError(format!(
            "{} \"{pattern}\" already exists",
            capitalize(list.noun())
        )))
    }
}

pub async fn set_enabled<W: Write>(
    store: &ErrorPolicyStore,
    list: RuleList,
    toggle: &ToggleRule,
    out: &mut W,
) -> Result<()> {
    let current = list
        .entries(&store.config())
        .into_iter()
        .find(|(pattern, _)| *pattern == toggle.pattern)
        .map(|(_, enabled)| enabled)
        .ok_or_else(|| not_found(list, &toggle.pattern))?;

    let enabled = toggle.resolve(current);
    match list {
        RuleList::Errors => store.toggle_error_rule(&toggle.pattern, enabled).await,
        RuleList::Regexes => store.toggle_regex_rule(&toggle.pattern, enabled).await,
    };

    writeln!(out, "{} Pattern toggled {}", "✓".green(), if enabled { "ON" } else { "OFF" })?;
    Ok(())
}

pub async fn remove<W: Write>(store: &ErrorPolicyStore, list: RuleList, pattern: &str, out: &mut W) -> Result<()> {
    let removed = match list {
        RuleList::Errors => store.remove_error_rule(pattern).await,
        RuleList::Regexes => store.remove_regex_rule(pattern).await,
    };

    if removed {
        writeln!(out, "{} Pattern removed successfully", "✓".green())?;
        Ok(())
    } else {
        Err(not_found(list, pattern))
    }
}

pub async fn log_suppressed<W: Write>(store: &ErrorPolicyStore, switch: Switch, out: &mut W) -> Result<()> {
    let enabled = switch.resolve(store.config().log_suppressed_errors);
    store.set_log_suppressed_errors(enabled).await;
    writeln!(
        out,
        "{} Logging of ignored errors {}",
        "✓".green(),
        if enabled { "enabled" } else { "disabled" }
    )?;
    Ok(())
}

pub fn test_message<W: Write>(store: &ErrorPolicyStore, message: &str, out: &mut W) -> Result<()> {
    let classification = store.classify_message(message);
    match classification.rule() {
        Some(rule) => {
            writeln!(out, "{} This error would be {}", "✓".green(), "IGNORED".green().bold())?;
            writeln!(out, "   Rule: {} \"{}\"", rule.kind, rule.pattern)?;
            writeln!(out, "   Description: {}", describe(&rule.description))?;
        }
        None => writeln!(out, "{} This error would {} be ignored", "✗".red(), "NOT".red().bold())?,
    }
    Ok(())
}

fn not_found(list: RuleList, pattern: &str) -> RxOpsError {
    RxOpsError::ValidationError(format!("No {} \"{pattern}\"", list.noun()))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
