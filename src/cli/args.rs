//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `extract`: List every feature flag read in components and templates
//! - `init`: Initialize the `.ngflagsrc.json` configuration file

use std::path::PathBuf;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};

use crate::core::FlagSource;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }

    /// Number of `-v` flags given to the command.
    pub fn verbosity(&self) -> u8 {
        match &self.command {
            Some(Command::Extract(cmd)) => cmd.common.verbose,
            Some(Command::Init) | None => 0,
        }
    }
}

/// Common arguments shared by all analysis commands.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Project root to analyze (default: current directory)
    #[arg(long)]
    pub source_root: Option<PathBuf>,

    /// Name of the flag container type (overrides config file)
    #[arg(long, env = "NGFLAGS_FLAG_SET_TYPE")]
    pub flag_set_type: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceFilter {
    Component,
    Template,
}

impl From<SourceFilter> for FlagSource {
    fn from(filter: SourceFilter) -> Self {
        match filter {
            SourceFilter::Component => FlagSource::Component,
            SourceFilter::Template => FlagSource::Template,
        }
    }
}

#[derive(Debug, Args)]
pub struct ExtractCommand {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Print every read location under its flag as path:line:column.
    /// Columns count UTF-16 code units, as editors do
    #[arg(long, conflicts_with = "json")]
    pub locations: bool,

    /// Print reads as a JSON object keyed by flag id
    #[arg(long)]
    pub json: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only report these flags.
    /// Can be specified multiple times: --flag beta --flag new-dashboard
    #[arg(long = "flag", value_name = "FLAG")]
    pub flags: Vec<String>,

    /// Only report reads from component code or from templates
    #[arg(long, value_enum)]
    pub source: Option<SourceFilter>,

    /// Only report reads in files matching this glob (relative to the source root)
    #[arg(long, value_name = "GLOB")]
    pub path: Option<String>,

    /// Exit with status 1 when any warning was produced
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List feature flags read by Angular components and templates
    Extract(ExtractCommand),
    /// Initialize a new .ngflagsrc.json configuration file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_and_json_conflict() {
        let result = Arguments::try_parse_from(["ngflags", "extract", "--locations", "--json"]);
        assert!(result.is_err());
    }

    #[test]
    fn verbosity_is_counted() {
        let args = Arguments::try_parse_from(["ngflags", "extract", "-vv"]).unwrap();
        assert_eq!(args.verbosity(), 2);
    }

    #[test]
    fn repeated_flag_filter() {
        let args = Arguments::try_parse_from([
            "ngflags", "extract", "--flag", "a", "--flag", "b", "--source", "template",
        ])
        .unwrap();
        let Some(Command::Extract(cmd)) = args.command else {
            panic!("expected extract");
        };
        assert_eq!(cmd.flags, vec!["a", "b"]);
        assert_eq!(cmd.source, Some(SourceFilter::Template));
    }
}
