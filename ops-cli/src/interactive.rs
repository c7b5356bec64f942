// Menu-driven exception manager.
use std::io::Write;

use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use error_common::{Result, RxOpsError};
use error_policy::ErrorPolicyStore;
use tracing::debug;

use crate::cli::{AddRule, Switch, ToggleRule};
use crate::exceptions::{self, RuleList};

const MENU: [&str; 10] = [
    "View current exceptions",
    "Add new error pattern",
    "Add new regex pattern",
    "Toggle error pattern",
    "Toggle regex pattern",
    "Remove error pattern",
    "Remove regex pattern",
    "Toggle logging of ignored errors",
    "Test error against filters",
    "Exit",
];

fn prompt_failed(err: dialoguer::Error) -> RxOpsError {
    RxOpsError::InternalError(format!("Prompt failed: {err}"))
}

/// Run the menu until the operator exits. Rule-level failures are reported
/// and the menu continues.
pub async fn run<W: Write>(store: &ErrorPolicyStore, out: &mut W) -> Result<()> {
    let theme = ColorfulTheme::default();
    writeln!(out, "{}", "Welcome to Error Exception Manager".bold())?;
    writeln!(out, "This tool helps you manage error filtering for your application")?;

    loop {
        let choice = Select::with_theme(&theme)
            .with_prompt("Error Exception Manager")
            .items(&MENU)
            .default(0)
            .interact_opt()
            .map_err(prompt_failed)?;

        let result = match choice {
            Some(0) => exceptions::render_policy(&store.config(), out),
            Some(1) => add(&theme, store, RuleList::Errors, out).await,
            Some(2) => add(&theme, store, RuleList::Regexes, out).await,
            Some(3) => toggle(&theme, store, RuleList::Errors, out).await,
            Some(4) => toggle(&theme, store, RuleList::Regexes, out).await,
            Some(5) => remove(&theme, store, RuleList::Errors, out).await,
            Some(6) => remove(&theme, store, RuleList::Regexes, out).await,
            Some(7) => exceptions::log_suppressed(store, Switch::Toggle, out).await,
            Some(8) => test(&theme, store, out),
            _ => break,
        };

        if let Err(e) = result {
            debug!(error = %e, "Menu action failed");
            writeln!(out, "{} {e}", "✗".red())?;
        }
    }

    writeln!(out, "Goodbye!")?;
    Ok(())
}

async fn add<W: Write>(theme: &ColorfulTheme, store: &ErrorPolicyStore, list: RuleList, out: &mut W) -> Result<()> {
    let prompt = match list {
        RuleList::Errors => "Enter error pattern to ignore",
        RuleList::Regexes => "Enter regex pattern to ignore",
    };
    let pattern: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .interact_text()
        .map_err(prompt_failed)?;
    let description: String = Input::with_theme(theme)
        .with_prompt("Enter description (optional)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_failed)?;
    let enabled = Confirm::with_theme(theme)
        .with_prompt("Enable immediately?")
        .default(true)
        .interact()
        .map_err(prompt_failed)?;

    let rule = AddRule {
        pattern,
        description,
        disabled: !enabled,
    };
    exceptions::add(store, list, rule, out).await
}

/// Pick a rule by position; `None` when the list is empty or the operator
/// backs out.
fn pick<W: Write>(
    theme: &ColorfulTheme,
    store: &ErrorPolicyStore,
    list: RuleList,
    action: &str,
    out: &mut W,
) -> Result<Option<(String, bool)>> {
    let entries = list.entries(&store.config());
    if entries.is_empty() {
        writeln!(out, "No patterns to {action}")?;
        return Ok(None);
    }

    let labels: Vec<String> = entries
        .iter()
        .map(|(pattern, enabled)| format!("[{}] {pattern}", if *enabled { "✓" } else { "✗" }))
        .collect();
    let index = Select::with_theme(theme)
        .with_prompt(format!("Select pattern to {action}"))
        .items(&labels)
        .interact_opt()
        .map_err(prompt_failed)?;

    Ok(index.and_then(|i| entries.into_iter().nth(i)))
}

async fn toggle<W: Write>(theme: &ColorfulTheme, store: &ErrorPolicyStore, list: RuleList, out: &mut W) -> Result<()> {
    let Some((pattern, _)) = pick(theme, store, list, "toggle", out)? else {
        return Ok(());
    };
    let toggle = ToggleRule {
        pattern,
        on: false,
        off: false,
    };
    exceptions::set_enabled(store, list, &toggle, out).await
}

async fn remove<W: Write>(theme: &ColorfulTheme, store: &ErrorPolicyStore, list: RuleList, out: &mut W) -> Result<()> {
    let Some((pattern, _)) = pick(theme, store, list, "remove", out)? else {
        return Ok(());
    };
    exceptions::remove(store, list, &pattern, out).await
}

fn test<W: Write>(theme: &ColorfulTheme, store: &ErrorPolicyStore, out: &mut W) -> Result<()> {
    let message: String = Input::with_theme(theme)
        .with_prompt("Enter error message to test")
        .interact_text()
        .map_err(prompt_failed)?;
    exceptions::test_message(store, &message, out)
}
