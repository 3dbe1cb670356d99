//! Output formatting for compiled trees and diagnostics.

use crate::cli::OutputFormat;
use jinja_parser::SyntaxError;
use js_ast::Program;
use miette::{IntoDiagnostic, Result};
use source_map::LineIndex;
use std::path::Path;

// ANSI colors
const RED: &str = "\x1b[31m";
const GRAY: &str = "\x1b[90m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Formatter for compiled output and errors.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a compiled module tree.
    pub fn print_program(&self, file: &Path, program: &Program) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(program).into_diagnostic()?;
                println!("{}", json);
            }
            OutputFormat::Human => {
                println!("{GREEN}✓{RESET} {}", file.display());
            }
        }
        Ok(())
    }

    /// Print a syntax error against its source.
    pub fn print_syntax_error(&self, file: &Path, error: &SyntaxError, source: &str) {
        match self.format {
            OutputFormat::Json => {
                let payload = serde_json::json!({
                    "file": file.display().to_string(),
                    "message": error.to_string(),
                    "offset": error.location.start.offset,
                    "line": error.location.start.line,
                    "column": error.location.start.column,
                    "code": error.code.as_str(),
                });
                eprintln!("{}", payload);
            }
            OutputFormat::Human => {
                self.print_error_human(file, error, source);
            }
        }
    }

    fn print_error_human(&self, file: &Path, error: &SyntaxError, source: &str) {
        let start = error.location.start;
        println!(
            "\n{BOLD}{}{RESET}:{GRAY}{}:{}{RESET}",
            file.display(),
            start.line,
            start.column
        );

        // Show the offending source line with an underline.
        let index = LineIndex::new(source);
        let line_col = index.line_col(start.offset);
        if let Some(line_content) = source.lines().nth(line_col.line as usize) {
            let trimmed = line_content.trim_start();
            let indent = line_content.len() - trimmed.len();
            println!("  {GRAY}│{RESET}");
            println!("  {GRAY}│{RESET} {}", trimmed);

            let underline_start = (line_col.col as usize).saturating_sub(indent);
            let underline_len = (error.location.len() as usize)
                .max(1)
                .min(trimmed.len().saturating_sub(underline_start));
            if underline_start < trimmed.len() && underline_len > 0 {
                println!(
                    "  {GRAY}│{RESET} {}{RED}{}{RESET}",
                    " ".repeat(underline_start),
                    "~".repeat(underline_len)
                );
            }
        }

        println!(
            "  {GRAY}╰─{RESET} {RED}✖ error{RESET}: {} {GRAY}[{}]{RESET}",
            error.message,
            error.code.as_str()
        );
    }

    /// Print the run summary.
    pub fn print_summary(&self, compiled: usize, skipped: usize, failed: usize) {
        if matches!(self.format, OutputFormat::Human) {
            let status = if failed > 0 {
                format!("{RED}{} failed{RESET}", failed)
            } else {
                format!("{GREEN}ok{RESET}")
            };
            println!(
                "\n{} compiled, {} skipped, {}",
                compiled, skipped, status
            );
        }
    }
}
