use colored::Colorize;
use declarative::{Diagnostic, Diagnostics, Severity};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

fn diagnostic_line(diag: &Diagnostic) -> String {
    let at = diag
        .path
        .as_deref()
        .map(|p| format!(" (at {p})"))
        .unwrap_or_default();
    format!("{}{at}: {}", diag.summary.bold(), diag.detail)
}

/// Print the diagnostics of one resource; errors go to stderr
pub fn diagnostics(address: &str, diags: &Diagnostics) {
    for diag in diags {
        match diag.severity {
            Severity::Error => eprintln!("{} {} {}", "✗".red(), address.red(), diagnostic_line(diag)),
            Severity::Warning => {
                println!("{} {} {}", "⚠".yellow(), address.yellow(), diagnostic_line(diag));
            }
        }
    }
}
