//! Diff display

use colored::{ColoredString, Colorize};
use declarative::{Action, AttributeChange, DiffSummary, ResourceDiff, group_by_type};
use serde_json::Value;
use similar::{ChangeTag, TextDiff};

fn kind_title(kind: &str) -> &str {
    match kind {
        "user" => "Users",
        "role" => "Roles",
        "role_permissions" => "Role permissions",
        "group" => "Groups",
        "group_role_binding" => "Group role bindings",
        "tag" => "Tags",
        "dataset" => "Datasets",
        "dataset_columns" => "Dataset columns",
        "dataset_metrics" => "Dataset metrics",
        "dataset_folder" => "Dataset folders",
        other => other,
    }
}

fn symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => action.symbol().green(),
        Action::Update => action.symbol().yellow(),
        Action::Replace | Action::Delete => action.symbol().red(),
        Action::NoOp => action.symbol().dimmed(),
    }
}

/// Compact one-line rendering of an attribute value
pub fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "(none)".to_string(),
        Some(Value::String(s)) => format!("{s:?}"),
        Some(other) => other.to_string(),
    }
}

fn text(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) => Some(s.as_str()),
        None | Some(Value::Null) => Some(""),
        Some(_) => None,
    }
}

fn multiline(change: &AttributeChange) -> Option<(&str, &str)> {
    let (before, after) = (text(change.before.as_ref())?, text(change.after.as_ref())?);
    (before.contains('\n') || after.contains('\n')).then_some((before, after))
}

fn display_change(change: &AttributeChange) {
    if let Some((before, after)) = multiline(change) {
        println!("│       {}:", change.path);
        for line in TextDiff::from_lines(before, after).iter_all_changes() {
            let text = line.value().trim_end_matches('\n');
            match line.tag() {
                ChangeTag::Delete => println!("│         {}", format!("- {text}").red()),
                ChangeTag::Insert => println!("│         {}", format!("+ {text}").green()),
                ChangeTag::Equal => println!("│         {}", format!("  {text}").dimmed()),
            }
        }
        return;
    }

    let line = match (&change.before, &change.after) {
        (None, after) => format!("{} = {}", change.path, format_value(after.as_ref())),
        (before, None) => format!("{}: {} → (none)", change.path, format_value(before.as_ref())),
        (before, after) => format!(
            "{}: {} → {}",
            change.path,
            format_value(before.as_ref()),
            format_value(after.as_ref())
        ),
    };
    println!("│       {}", line.dimmed());
}

fn describe(diff: &ResourceDiff) -> String {
    match diff.action {
        Action::Create => "(will create)".to_string(),
        Action::Delete => "(will destroy)".to_string(),
        Action::Replace => "(must be replaced)".to_string(),
        Action::Update => match diff.changes.len() {
            1 => "1 attribute".to_string(),
            n => format!("{n} attributes"),
        },
        Action::NoOp => String::new(),
    }
}

/// Print the planned changes, grouped by kind
///
/// Attribute-level changes are listed under each resource when `verbose`
/// is set or the resource is updated in place.
pub fn display_diff(diffs: &[ResourceDiff], verbose: bool) {
    let changed: Vec<ResourceDiff> = diffs
        .iter()
        .filter(|d| d.action.is_change())
        .cloned()
        .collect();

    if changed.is_empty() {
        println!();
        println!("  {} No changes. Infrastructure matches the configuration.", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Planned Changes".bold()
    );
    println!("│");

    for (kind, kind_diffs) in group_by_type(&changed) {
        println!("│ {}", kind_title(&kind).bold());
        for diff in kind_diffs {
            println!(
                "│   {} {:<30} {}",
                symbol(diff.action),
                diff.address.to_string(),
                describe(diff).dimmed()
            );
            if verbose || matches!(diff.action, Action::Update | Action::Replace) {
                for change in &diff.changes {
                    display_change(change);
                }
            }
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(&changed);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to add, {} to change, {} to replace, {} to destroy)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.replacements.to_string().red(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}
