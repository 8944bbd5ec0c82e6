//! Index of templated pages and REST resources.
//!
//! The index is resolved from the shared cache under `"files"` when the
//! pipeline is built and is read-only afterwards.

use crate::stages::rest::RestResource;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

/// Known templated-page files and REST resources.
///
/// Page paths are stored as `public_root.join(relative)`, exactly the form the
/// page resolver probes.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    page_files: BTreeSet<PathBuf>,
    rest_resources: Vec<RestResource>,
}

impl FileIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `public_root` recursively for files ending in `suffix`.
    ///
    /// Hidden entries (names starting with `.`) are skipped.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the root or a subdirectory cannot be read.
    pub fn scan(public_root: &Path, suffix: &str) -> io::Result<Self> {
        let mut index = Self::new();
        let mut pending = vec![public_root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                if name.starts_with('.') {
                    continue;
                }

                let path = dir.join(name);
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if name.ends_with(suffix) {
                    index.page_files.insert(path);
                }
            }
        }

        tracing::debug!(
            root = %public_root.display(),
            pages = index.page_files.len(),
            "scanned public root for templated pages"
        );
        Ok(index)
    }

    /// Adds a templated-page file.
    #[must_use]
    pub fn with_page(mut self, path: impl Into<PathBuf>) -> Self {
        self.page_files.insert(path.into());
        self
    }

    /// Adds a REST resource.
    #[must_use]
    pub fn with_rest_resource(mut self, resource: RestResource) -> Self {
        self.rest_resources.push(resource);
        self
    }

    /// Returns true if `path` is a known templated-page file.
    pub fn contains_page(&self, path: &Path) -> bool {
        self.page_files.contains(path)
    }

    /// Returns the known templated-page files.
    pub fn page_files(&self) -> &BTreeSet<PathBuf> {
        &self.page_files
    }

    /// Returns the REST resources.
    pub fn rest_resources(&self) -> &[RestResource] {
        &self.rest_resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_finds_pages_recursively() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.feather.html"), "<p>home</p>").unwrap();
        fs::write(dir.path().join("style.css"), "body {}").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/intro.feather.html"), "<p>intro</p>").unwrap();
        fs::create_dir(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join(".cache/stale.feather.html"), "").unwrap();

        let index = FileIndex::scan(dir.path(), ".feather.html").unwrap();
        assert_eq!(index.page_files().len(), 2);
        assert!(index.contains_page(&dir.path().join("index.feather.html")));
        assert!(index.contains_page(&dir.path().join("docs/intro.feather.html")));
        assert!(!index.contains_page(&dir.path().join("style.css")));
    }

    #[test]
    fn test_scan_missing_root_fails() {
        assert!(FileIndex::scan(Path::new("/nonexistent/public"), ".feather.html").is_err());
    }
}
