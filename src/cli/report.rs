//! Report formatting and printing utilities.
//!
//! The flag report goes to stdout (or the `--output` file). Diagnostics and
//! the summary go to stderr in cargo-style format, so stdout can be piped.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use indexmap::IndexMap;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use super::commands::{CommandResult, CommandSummary, ExtractSummary, OutputFormat};
use crate::core::{FlagReport, FlagSource};
use crate::issues::{Diagnostic, Report, ReportLocation};
use crate::utils::{display_path, plural};

/// Success mark for consistent output formatting.
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓

/// Failure mark for consistent output formatting.
pub const FAILURE_MARK: &str = "\u{2718}"; // ✘

/// One read in `--json` output. Line and column are 1-based; columns count
/// UTF-16 code units.
#[derive(Debug, Serialize)]
struct JsonRead {
    path: String,
    line: usize,
    column: usize,
    source: FlagSource,
}

/// Render `report` in `format`. Paths are shown relative to `root`.
pub fn render(report: &FlagReport, format: OutputFormat, root: &Path) -> Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Flags => {
            for flag in report.flags.keys() {
                out.push_str(flag);
                out.push('\n');
            }
        }
        OutputFormat::Locations => {
            for (flag, reads) in &report.flags {
                out.push_str(flag);
                out.push('\n');
                for read in reads {
                    out.push_str(&format!(
                        "  {}:{}:{} [{}]\n",
                        display_path(root, &read.file_path),
                        read.row + 1,
                        read.col_start + 1,
                        read.source
                    ));
                }
            }
        }
        OutputFormat::Json => {
            let flags: IndexMap<&str, Vec<JsonRead>> = report
                .flags
                .iter()
                .map(|(flag, reads)| {
                    let reads = reads
                        .iter()
                        .map(|read| JsonRead {
                            path: display_path(root, &read.file_path),
                            line: read.row + 1,
                            column: read.col_start + 1,
                            source: read.source,
                        })
                        .collect();
                    (flag.as_str(), reads)
                })
                .collect();
            out = serde_json::to_string_pretty(&flags).context("Failed to serialize report")?;
            out.push('\n');
        }
    }
    Ok(out)
}

/// Print the result of a command.
pub fn print(result: &CommandResult) {
    let mut stderr = io::stderr().lock();
    match &result.summary {
        CommandSummary::Extract(summary) => {
            if summary.output.is_none() {
                let _ = io::stdout().lock().write_all(summary.rendered.as_bytes());
            }
            print_diagnostics_to(&result.diagnostics, &result.root_dir, &mut stderr);
            print_extract_summary_to(summary, &result.diagnostics, &mut stderr);
        }
        CommandSummary::Init(summary) => {
            let _ = writeln!(
                io::stdout().lock(),
                "{} {}",
                SUCCESS_MARK.green(),
                format!("Created {}", summary.path.display()).green()
            );
        }
    }
}

/// Print diagnostics in cargo-style format.
pub fn print_diagnostics_to<W: Write>(diagnostics: &[Diagnostic], root: &Path, writer: &mut W) {
    let max_line_width = diagnostics
        .iter()
        .map(|d| d.location().line_col().0)
        .max()
        .map(|n| n.to_string().len())
        .unwrap_or(1);

    for diagnostic in diagnostics {
        print_diagnostic(diagnostic, root, writer, max_line_width);
    }
}

fn print_diagnostic<W: Write>(
    diagnostic: &Diagnostic,
    root: &Path,
    writer: &mut W,
    max_line_width: usize,
) {
    let location = diagnostic.location();
    let path = display_path(root, location.path());

    let _ = writeln!(
        writer,
        "{}: \"{}\"  {}",
        "warning".bold().yellow(),
        diagnostic.message(),
        diagnostic.rule().to_string().dimmed().cyan()
    );

    match &location {
        ReportLocation::Source(context) => {
            let (line, col) = (context.line, context.col);
            let _ = writeln!(writer, "  {} {}:{}:{}", "-->".blue(), path, line, col);
            let _ = writeln!(writer, "{:>width$} {}", "", "|".blue(), width = max_line_width);
            let _ = writeln!(
                writer,
                "{:>width$} {} {}",
                line.to_string().blue(),
                "|".blue(),
                context.source_line,
                width = max_line_width
            );

            // Caret pointing to the column
            let prefix = utf16_prefix(&context.source_line, col.saturating_sub(1));
            let _ = writeln!(
                writer,
                "{:>width$} {} {:>padding$}{}",
                "",
                "|".blue(),
                "",
                "^".yellow(),
                width = max_line_width,
                padding = UnicodeWidthStr::width(prefix)
            );
        }
        ReportLocation::File { .. } => {
            let _ = writeln!(writer, "  {} {}", "-->".blue(), path);
        }
    }

    if let Some(details) = diagnostic.details() {
        let _ = writeln!(
            writer,
            "{:>width$} {} {} {}",
            "",
            "=".blue(),
            "note:".bold(),
            details,
            width = max_line_width
        );
    }

    if let Some(hint) = diagnostic.hint() {
        let _ = writeln!(
            writer,
            "{:>width$} {} {} {}",
            "",
            "=".blue(),
            "hint:".bold().cyan(),
            hint,
            width = max_line_width
        );
    }

    let _ = writeln!(writer);
}

/// The start of `line` spanning `units` UTF-16 code units.
fn utf16_prefix(line: &str, units: usize) -> &str {
    let mut seen = 0;
    for (offset, c) in line.char_indices() {
        if seen >= units {
            return &line[..offset];
        }
        seen += c.len_utf16();
    }
    line
}

fn print_extract_summary_to<W: Write>(
    summary: &ExtractSummary,
    diagnostics: &[Diagnostic],
    writer: &mut W,
) {
    let found = format!(
        "Found {} ({}) in {}",
        plural(summary.report.flags.len(), "flag"),
        plural(summary.report.read_count(), "read"),
        plural(summary.files_analyzed, "file"),
    );

    if diagnostics.is_empty() {
        let _ = writeln!(writer, "{} {}", SUCCESS_MARK.green(), found.green());
    } else {
        let _ = writeln!(
            writer,
            "{} {}, {}",
            FAILURE_MARK.yellow(),
            found,
            plural(diagnostics.len(), "warning").yellow()
        );
    }

    if let Some(path) = &summary.output {
        let _ = writeln!(writer, "  {} {}", "wrote".dimmed(), path.display());
    }
}
