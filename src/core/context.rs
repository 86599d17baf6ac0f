use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use tracing::{debug, info, instrument, warn};

use crate::{
    cli::args::CommonArgs,
    config::{Config, load_config},
    core::{
        aggregate::{FlagReport, aggregate},
        bridge::TypeBridge,
        checker::Checker,
        error::ExtractError,
        extract::extract_from_unit,
        file_scanner::scan_files,
    },
    issues::Diagnostic,
};

/// Output of one extraction run.
#[derive(Debug)]
pub struct Extraction {
    pub report: FlagReport,
    /// Sorted by path, line and column.
    pub diagnostics: Vec<Diagnostic>,
    pub files_analyzed: usize,
}

/// Configuration and file set of one run.
///
/// # Configuration Priority
///
/// 1. CLI arguments (`--flag-set-type`)
/// 2. `.ngflagsrc.json`, searched upwards from the source root
/// 3. Built-in defaults
pub struct ExtractContext {
    pub config: Config,
    /// Canonical project root; every reported path lies below it.
    pub root_dir: PathBuf,
    /// Component sources to analyze, sorted.
    pub files: Vec<PathBuf>,
    /// Paths that could not be accessed while scanning.
    pub skipped_count: usize,
}

impl ExtractContext {
    /// Create a context from command line arguments.
    ///
    /// # Errors
    ///
    /// Returns error if the source root does not exist or the config file is invalid.
    pub fn new(common_args: &CommonArgs) -> Result<Self> {
        let source_root = common_args
            .source_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        let config_result = load_config(&source_root)?;
        match &config_result.path {
            Some(path) => info!(config = %path.display(), "loaded configuration"),
            None => info!("no {} found, using default configuration", crate::config::CONFIG_FILE_NAME),
        }

        let mut config = config_result.config;
        if let Some(flag_set_type) = &common_args.flag_set_type {
            config.flag_set_type = flag_set_type.clone();
        }
        config.validate()?;

        Self::with_config(&source_root, config)
    }

    /// Create a context for `root_dir` with an already loaded configuration.
    pub fn with_config(root_dir: &Path, config: Config) -> Result<Self> {
        let root_dir = root_dir
            .canonicalize()
            .with_context(|| format!("Invalid source root: {}", root_dir.display()))?;

        let scan_result = scan_files(&root_dir, &config);
        if scan_result.skipped_count > 0 {
            warn!(count = scan_result.skipped_count, "paths skipped due to access errors");
        }

        Ok(Self {
            config,
            root_dir,
            files: scan_result.files,
            skipped_count: scan_result.skipped_count,
        })
    }

    /// Analyze every file and aggregate the reads.
    ///
    /// The checker and the translation cache live for the whole run, so a
    /// file imported by many components is parsed once.
    #[instrument(skip_all, fields(root = %self.root_dir.display(), files = self.files.len()))]
    pub fn run(&self) -> Result<Extraction, ExtractError> {
        let checker = Checker::new();
        let bridge = TypeBridge::new(&checker);
        let target = self.config.flag_set_type.as_str();

        let mut reads = Vec::new();
        let mut diagnostics = Vec::new();
        for path in &self.files {
            let unit = checker.program().load(path)?;
            let extraction = extract_from_unit(&bridge, &checker, &unit, target)?;
            debug!(
                path = %path.display(),
                reads = extraction.reads.len(),
                diagnostics = extraction.diagnostics.len(),
                "analyzed file"
            );
            reads.extend(extraction.reads);
            diagnostics.extend(extraction.diagnostics);
        }

        diagnostics.sort_by_key(Diagnostic::sort_key);
        diagnostics.dedup();
        let report = aggregate(reads);
        info!(flags = report.flags.len(), reads = report.read_count(), "extraction finished");

        Ok(Extraction {
            report,
            diagnostics,
            files_analyzed: self.files.len(),
        })
    }
}
