//! Common utility functions shared across the codebase.

use std::path::Path;

/// Render `path` relative to `root` with forward slashes.
///
/// Paths outside `root` are rendered as they are.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use ngflags::utils::display_path;
///
/// let root = Path::new("/work/app");
/// assert_eq!(display_path(root, Path::new("/work/app/src/a.component.ts")), "src/a.component.ts");
/// assert_eq!(display_path(root, Path::new("/elsewhere/b.ts")), "/elsewhere/b.ts");
/// ```
pub fn display_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

/// `"1 file"`, `"2 files"`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::*;

    #[test]
    fn test_display_path() {
        let root = Path::new("/work/app");
        assert_eq!(
            display_path(root, Path::new("/work/app/src/x/a.component.html")),
            "src/x/a.component.html"
        );
        assert_eq!(display_path(root, Path::new("/work/other.ts")), "/work/other.ts");
        assert_eq!(display_path(root, root), "");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(0, "flag"), "0 flags");
        assert_eq!(plural(1, "flag"), "1 flag");
        assert_eq!(plural(3, "warning"), "3 warnings");
    }
}
