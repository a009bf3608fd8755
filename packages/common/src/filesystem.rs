use crate::error::{CommonError, CommonResult};
use scl_foundation::TagSchema;
use scl_parser::{parse, Document};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// File extensions recognised as SCL by default
pub const DEFAULT_EXTENSIONS: [&str; 7] = ["scd", "scl", "icd", "cid", "iid", "ssd", "sed"];

/// File system abstraction for SCL file discovery and testing
pub trait FileSystem {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error>;

    /// Every file below `root` (or `root` itself), sorted by path
    fn files_under(&self, root: &Path) -> Vec<PathBuf>;
}

/// Real file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }

    fn files_under(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect()
    }
}

/// Mock file system for testing
pub struct MockFileSystem {
    pub files: HashMap<PathBuf, String>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.files.keys().any(|f| f.starts_with(path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, path.display().to_string())
        })
    }

    fn files_under(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|f| f.starts_with(root))
            .cloned()
            .collect();
        files.sort();
        files
    }
}

/// True when `path` has one of `extensions`, compared case-insensitively
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|candidate| candidate.as_ref().eq_ignore_ascii_case(ext))
        })
}

/// SCL files at or below `root`
pub fn find_scl_files<F: FileSystem, S: AsRef<str>>(
    fs: &F,
    root: &Path,
    extensions: &[S],
) -> CommonResult<Vec<PathBuf>> {
    if !fs.exists(root) {
        return Err(CommonError::NotFound(root.to_path_buf()));
    }
    let files: Vec<PathBuf> = fs
        .files_under(root)
        .into_iter()
        .filter(|path| has_extension(path, extensions))
        .collect();
    debug!(root = %root.display(), count = files.len(), "found SCL files");
    Ok(files)
}

/// Read and parse one SCL file
pub fn load_document<F: FileSystem>(fs: &F, path: &Path) -> CommonResult<Document> {
    if !fs.exists(path) {
        return Err(CommonError::NotFound(path.to_path_buf()));
    }
    let source = fs.read_to_string(path)?;
    Ok(parse(&source)?)
}

/// Read a replacement tag schema
pub fn load_schema<F: FileSystem>(fs: &F, path: &Path) -> CommonResult<TagSchema> {
    let source = fs.read_to_string(path)?;
    Ok(TagSchema::from_json(&source)?)
}
