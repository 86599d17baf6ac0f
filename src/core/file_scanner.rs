use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use glob::{Pattern, glob};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Config;

/// Check if a pattern contains glob wildcards (* or ?).
/// Patterns without wildcards are treated as literal directory paths.
fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Result of scanning files.
pub struct ScanResult {
    /// Component sources to analyze, sorted.
    pub files: Vec<PathBuf>,
    pub skipped_count: usize,
}

/// Collect the TypeScript sources under `base_dir` selected by `config`.
pub fn scan_files(base_dir: &Path, config: &Config) -> ScanResult {
    let mut files: BTreeSet<PathBuf> = BTreeSet::new();
    let mut skipped_count = 0;

    let mut literal_ignore_paths: Vec<PathBuf> = Vec::new();
    let mut glob_patterns: Vec<Pattern> = Vec::new();

    for p in &config.ignores {
        if is_glob_pattern(p) {
            match Pattern::new(p) {
                Ok(pattern) => glob_patterns.push(pattern),
                Err(e) => warn!(pattern = %p, error = %e, "invalid ignore pattern"),
            }
        } else {
            literal_ignore_paths.push(base_dir.join(p));
        }
    }

    for p in config.skipped_file_patterns() {
        if let Ok(pattern) = Pattern::new(p) {
            glob_patterns.push(pattern);
        }
    }

    let dirs_to_scan: Vec<PathBuf> = if config.includes.is_empty() {
        vec![base_dir.to_path_buf()]
    } else {
        let mut paths = Vec::new();
        for inc in &config.includes {
            if is_glob_pattern(inc) {
                let full_pattern = base_dir.join(inc);
                match glob(&full_pattern.to_string_lossy()) {
                    Ok(entries) => paths.extend(entries.flatten().filter(|entry| entry.is_dir())),
                    Err(e) => warn!(pattern = %inc, error = %e, "invalid include pattern"),
                }
            } else {
                let path = base_dir.join(inc);
                if path.exists() {
                    paths.push(path);
                } else {
                    warn!(path = %path.display(), "include path does not exist");
                }
            }
        }
        paths
    };

    for dir in dirs_to_scan {
        for entry in WalkDir::new(dir) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    skipped_count += 1;
                    warn!(error = %e, "cannot access path");
                    continue;
                }
            };
            let path = entry.path();

            if literal_ignore_paths
                .iter()
                .any(|ignore_path| path.starts_with(ignore_path))
            {
                continue;
            }

            let path_str = path.to_string_lossy();
            if glob_patterns.iter().any(|p| p.matches(&path_str)) {
                continue;
            }

            if path.is_file() && is_scannable_file(path) {
                files.insert(path.to_path_buf());
            }
        }
    }

    debug!(files = files.len(), skipped = skipped_count, "scanned source files");
    ScanResult {
        files: files.into_iter().collect(),
        skipped_count,
    }
}

fn is_scannable_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".ts") && !name.ends_with(".d.ts")
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn config(includes: &[&str], ignores: &[&str]) -> Config {
        Config {
            includes: includes.iter().map(|s| s.to_string()).collect(),
            ignores: ignores.iter().map(|s| s.to_string()).collect(),
            ignore_test_files: false,
            ignore_generated: false,
            ..Default::default()
        }
    }

    fn names(result: &ScanResult, base: &Path) -> Vec<String> {
        result
            .files
            .iter()
            .map(|f| f.strip_prefix(base).unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_scan_ts_files_sorted() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        File::create(base.join("b.component.ts")).unwrap();
        File::create(base.join("a.component.ts")).unwrap();
        File::create(base.join("a.component.html")).unwrap();
        File::create(base.join("typings.d.ts")).unwrap();

        let result = scan_files(base, &config(&[], &[]));

        assert_eq!(names(&result, base), vec!["a.component.ts", "b.component.ts"]);
    }

    #[test]
    fn test_scan_ignores_node_modules_by_default() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        let src = base.join("src");
        fs::create_dir_all(src.join("node_modules/lib")).unwrap();
        File::create(src.join("node_modules/lib/index.ts")).unwrap();
        File::create(src.join("app.component.ts")).unwrap();

        let result = scan_files(base, &Config::default());

        assert_eq!(names(&result, base), vec!["src/app.component.ts"]);
    }

    #[test]
    fn test_scan_skips_test_and_generated_files() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        let src = base.join("src");
        fs::create_dir(&src).unwrap();
        for name in [
            "app.component.ts",
            "app.component.spec.ts",
            "util.test.ts",
            "app.component.ngtypecheck.ts",
            "api.generated.ts",
        ] {
            File::create(src.join(name)).unwrap();
        }

        let result = scan_files(base, &Config::default());
        assert_eq!(names(&result, base), vec!["src/app.component.ts"]);

        let keep_all = Config {
            ignore_test_files: false,
            ignore_generated: false,
            ..Default::default()
        };
        assert_eq!(scan_files(base, &keep_all).files.len(), 5);
    }

    #[test]
    fn test_scan_with_glob_include() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("projects/admin")).unwrap();
        fs::create_dir_all(base.join("projects/shop")).unwrap();
        fs::create_dir_all(base.join("tools")).unwrap();
        File::create(base.join("projects/admin/a.ts")).unwrap();
        File::create(base.join("projects/shop/b.ts")).unwrap();
        File::create(base.join("tools/c.ts")).unwrap();

        let result = scan_files(base, &config(&["projects/*"], &[]));

        assert_eq!(names(&result, base), vec!["projects/admin/a.ts", "projects/shop/b.ts"]);
    }

    #[test]
    fn test_scan_deduplicates_overlapping_includes() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("src/app")).unwrap();
        File::create(base.join("src/app/a.ts")).unwrap();

        let result = scan_files(base, &config(&["src", "src/app"], &[]));

        assert_eq!(result.files.len(), 1);
    }

    #[test]
    fn test_scan_ignores_literal_and_glob_patterns() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("src/legacy")).unwrap();
        File::create(base.join("src/a.ts")).unwrap();
        File::create(base.join("src/a.stories.ts")).unwrap();
        File::create(base.join("src/legacy/b.ts")).unwrap();

        let result = scan_files(base, &config(&["src"], &["src/legacy", "**/*.stories.ts"]));

        assert_eq!(names(&result, base), vec!["src/a.ts"]);
    }

    #[test]
    fn test_scan_with_nonexistent_include() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir(base.join("src")).unwrap();
        File::create(base.join("src/a.ts")).unwrap();

        let result = scan_files(base, &config(&["src", "missing"], &[]));

        assert_eq!(result.files.len(), 1);
    }

    #[test]
    fn test_is_scannable_file() {
        assert!(is_scannable_file(Path::new("app.component.ts")));
        assert!(!is_scannable_file(Path::new("globals.d.ts")));
        assert!(!is_scannable_file(Path::new("app.component.html")));
        assert!(!is_scannable_file(Path::new("app.tsx")));
    }

    #[test]
    fn test_is_glob_pattern() {
        assert!(is_glob_pattern("src/*"));
        assert!(is_glob_pattern("file?.ts"));
        assert!(!is_glob_pattern("src/app"));
    }
}
