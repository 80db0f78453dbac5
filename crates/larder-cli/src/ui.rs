//! Console output for the operator menu

use colored::*;
use crossterm::terminal::size;
use std::io::{self, BufRead, Write};

use larder_core::{CompletionResult, Error, Result};
use larder_rag::IngestionReport;

use crate::loader::LoadFailure;

/// Display the startup banner
pub fn display_banner() {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = 60.min(terminal_width.saturating_sub(4)).max(40);
    let inner = banner_width - 2;

    let line = |text: &str| {
        let padding = inner.saturating_sub(text.chars().count() + 2);
        format!("│  {}{}│", text, " ".repeat(padding))
    };

    println!();
    println!("{}", format!("┌{}┐", "─".repeat(inner)).blue());
    println!("{}", line("").blue());
    println!(
        "│  {}{}│",
        "Larder".blue().bold(),
        " ".repeat(inner.saturating_sub(8))
    );
    println!("{}", line("Ask questions about your recipe collection").blue());
    println!("{}", line("").blue());
    println!("{}", line(&format!("v{}", env!("CARGO_PKG_VERSION"))).dimmed());
    println!("{}", format!("└{}┘", "─".repeat(inner)).blue());
    println!();
}

/// Display the menu
pub fn print_menu() {
    println!("{}", "Choose an option:".bold());
    println!("  {} - Upload documents", "1".green());
    println!("  {} - Vectorize and index corpus", "2".green());
    println!("  {} - Query (empty line returns to the menu)", "3".green());
    println!("  {} - Show this menu", "help".green());
    println!("  {} - Quit", "q".green());
    println!();
}

/// Print `label`, then read one trimmed line. `None` at end of input.
pub fn prompt<R: BufRead>(input: &mut R, label: &str) -> Result<Option<String>> {
    print!("{} ", label.green().bold());
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        println!();
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Print an answer followed by its token usage
pub fn print_answer(result: &CompletionResult) {
    println!();
    println!("{}", result.text);
    println!();
    println!(
        "{}",
        format!(
            "tokens: {} prompt, {} completion",
            result.prompt_tokens, result.response_tokens
        )
        .dimmed()
    );
    println!();
}

/// Print the outcome of an upload or vectorize run
pub fn print_report(operation: &str, report: &IngestionReport) {
    let status = format!("{}: {} document(s) stored", operation, report.upserted);
    if report.is_complete() {
        println!("{} {}", "✅".green(), status);
    } else {
        println!(
            "{} {}, {} skipped",
            "⚠️".yellow(),
            status,
            report.failures.len()
        );
        for failure in &report.failures {
            println!("  {} {}: {}", "•".yellow(), failure.document, failure.error);
        }
    }
}

/// Print entries of the ingestion source that could not be read
pub fn print_load_failures(failures: &[LoadFailure]) {
    for failure in failures {
        println!("  {} {}: {}", "•".yellow(), failure.source, failure.reason);
    }
}

/// Print a failed operation with its underlying message
pub fn print_failure(operation: &str, error: &Error) {
    println!("{} {} failed: {}", "❌".red(), operation, error);
}
