use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Ok, Result, bail};
use glob::Pattern;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = ".ngflagsrc.json";

pub const DEFAULT_FLAG_SET_TYPE: &str = "LDFlagSet";

pub const TEST_FILE_PATTERNS: &[&str] = &["**/*.spec.ts", "**/*.test.ts", "**/__tests__/**"];

/// Files produced by the Angular compiler or code generators.
pub const GENERATED_FILE_PATTERNS: &[&str] = &[
    "**/*.ngtypecheck.ts",
    "**/*.ngfactory.ts",
    "**/*.ngsummary.ts",
    "**/*.generated.ts",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Name of the type whose keyed reads are flag reads.
    #[serde(default = "default_flag_set_type")]
    pub flag_set_type: String,
    #[serde(default = "default_includes")]
    pub includes: Vec<String>,
    #[serde(default = "default_ignores")]
    pub ignores: Vec<String>,
    #[serde(default = "default_true")]
    pub ignore_test_files: bool,
    #[serde(default = "default_true")]
    pub ignore_generated: bool,
}

fn default_flag_set_type() -> String {
    DEFAULT_FLAG_SET_TYPE.to_string()
}

fn default_includes() -> Vec<String> {
    vec!["src".to_string()]
}

fn default_ignores() -> Vec<String> {
    vec!["**/node_modules/**".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flag_set_type: default_flag_set_type(),
            includes: default_includes(),
            ignores: default_ignores(),
            ignore_test_files: true,
            ignore_generated: true,
        }
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// Rejects invalid glob patterns in `ignores` and `includes`, and an empty
    /// `flagSetType`.
    pub fn validate(&self) -> Result<()> {
        if self.flag_set_type.trim().is_empty() {
            bail!("'flagSetType' must not be empty");
        }

        for pattern in &self.ignores {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid glob pattern in 'ignores': \"{}\"", pattern))?;
        }

        // Patterns without wildcards are literal directory paths.
        for pattern in &self.includes {
            if pattern.contains('*') || pattern.contains('?') {
                Pattern::new(pattern).with_context(|| {
                    format!("Invalid glob pattern in 'includes': \"{}\"", pattern)
                })?;
            }
        }

        Ok(())
    }

    /// Patterns of files that are never analyzed under this configuration.
    pub fn skipped_file_patterns(&self) -> Vec<&'static str> {
        let mut patterns = Vec::new();
        if self.ignore_test_files {
            patterns.extend_from_slice(TEST_FILE_PATTERNS);
        }
        if self.ignore_generated {
            patterns.extend_from_slice(GENERATED_FILE_PATTERNS);
        }
        patterns
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// The file the configuration was read from, `None` for defaults.
    pub path: Option<PathBuf>,
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(ConfigLoadResult {
                config,
                path: Some(path),
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            path: None,
        }),
    }
}
