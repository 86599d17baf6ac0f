use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use crate::config::Config;
use crate::core::context::{ExtractContext, Extraction};

/// Throwaway project directory for pipeline tests.
pub struct TestProject {
    _dir: TempDir,
    root: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        // Keeps config lookup from leaving the project.
        fs::create_dir(root.join(".git")).unwrap();
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/")
    }

    pub fn context(&self) -> ExtractContext {
        ExtractContext::with_config(&self.root, Config::default()).unwrap()
    }

    pub fn run(&self) -> Extraction {
        self.context().run().unwrap()
    }
}
