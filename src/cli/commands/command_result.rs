use std::path::PathBuf;

use crate::cli::exit_status::ExitStatus;
use crate::core::FlagReport;
use crate::issues::Diagnostic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One flag id per line.
    Flags,
    /// Flag ids followed by their read locations.
    Locations,
    Json,
}

#[derive(Debug)]
pub enum CommandSummary {
    Extract(ExtractSummary),
    Init(InitSummary),
}

#[derive(Debug)]
pub struct ExtractSummary {
    /// The report after filters were applied.
    pub report: FlagReport,
    pub format: OutputFormat,
    /// Report text in `format`.
    pub rendered: String,
    /// File the report was written to; stdout when `None`.
    pub output: Option<PathBuf>,
    pub files_analyzed: usize,
}

#[derive(Debug)]
pub struct InitSummary {
    pub path: PathBuf,
}

/// Result of running ngflags commands
#[derive(Debug)]
pub struct CommandResult {
    pub summary: CommandSummary,
    /// Warnings produced during extraction. Empty for `init`.
    pub diagnostics: Vec<Diagnostic>,
    /// Root that reported paths are shown relative to.
    pub root_dir: PathBuf,
    /// Exit with [`ExitStatus::Failure`] when there are diagnostics.
    pub strict: bool,
}

impl CommandResult {
    pub fn exit_status(&self) -> ExitStatus {
        if self.strict && !self.diagnostics.is_empty() {
            ExitStatus::Failure
        } else {
            ExitStatus::Success
        }
    }
}
