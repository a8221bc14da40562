//! Single-level directory listing.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::batch_rename::ListingError;

/// One directory entry as seen when the listing was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    /// Regular file, or a symlink that resolves to one.
    pub is_file: bool,
    pub modified: Option<SystemTime>,
}

/// Snapshot of a directory's direct children.
#[derive(Debug, Clone, Default)]
pub struct DirectoryListing {
    path: PathBuf,
    entries: Vec<FileEntry>,
    /// Names differing only in case refer to the same file.
    case_insensitive: bool,
}

/// Default file systems on macOS and Windows ignore case in file names.
const CASE_INSENSITIVE_PLATFORM: bool = cfg!(any(target_os = "macos", target_os = "windows"));

impl FileEntry {
    /// Regular file entry without a modification time.
    #[must_use]
    pub fn file(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_file: true,
            modified: None,
        }
    }

    /// Non-file entry such as a directory.
    #[must_use]
    pub fn other(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_file: false,
            modified: None,
        }
    }

    /// File name without the last extension.
    #[must_use]
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.name)
    }

    /// Last extension without the leading dot, as written on disk.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|ext| ext.to_str())
    }

    /// Case-insensitive extension comparison. The expected extension has no leading dot.
    #[must_use]
    pub fn has_extension(&self, extension: &str) -> bool {
        self.extension()
            .is_some_and(|ext| ext.to_lowercase() == extension.to_lowercase())
    }
}

impl DirectoryListing {
    /// Read the direct children of `path`, sorted by file name.
    ///
    /// Entries whose names are not valid UTF-8 are skipped since no generated name can match them.
    ///
    /// # Errors
    /// Returns an error if the path does not exist, is not a directory, or cannot be read.
    pub fn read(path: &Path) -> Result<Self, ListingError> {
        if !path.exists() {
            return Err(ListingError::NotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(ListingError::NotADirectory(path.to_path_buf()));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(path).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|error| ListingError::Read {
                path: path.to_path_buf(),
                source: error.into(),
            })?;
            let Some(name) = entry.file_name().to_str() else {
                log::warn!("Skipping non UTF-8 file name: {}", entry.path().display());
                continue;
            };
            // Follow symlinks the same way a plain stat would
            let metadata = fs::metadata(entry.path()).ok();
            entries.push(FileEntry {
                name: name.to_string(),
                is_file: metadata.as_ref().is_some_and(fs::Metadata::is_file),
                modified: metadata.and_then(|meta| meta.modified().ok()),
            });
        }

        log::debug!("Listed {} entries in {}", entries.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            case_insensitive: CASE_INSENSITIVE_PLATFORM,
        })
    }

    /// Build a listing from known entries without touching the filesystem.
    #[must_use]
    pub fn from_entries(path: impl Into<PathBuf>, entries: Vec<FileEntry>) -> Self {
        Self {
            path: path.into(),
            entries,
            case_insensitive: false,
        }
    }

    /// Treat names that differ only in case as the same file.
    #[must_use]
    pub const fn with_case_insensitive_names(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    #[must_use]
    pub const fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Key for comparing file names in this directory.
    #[must_use]
    pub fn name_key<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if self.case_insensitive {
            Cow::Owned(name.to_lowercase())
        } else {
            Cow::Borrowed(name)
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Regular files with the given extension, in listing order.
    pub fn files_with_extension<'a>(&'a self, extension: &'a str) -> impl Iterator<Item = &'a FileEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.is_file && entry.has_extension(extension))
    }

    /// Names of all entries, including directories.
    #[must_use]
    pub fn names(&self) -> HashSet<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }
}
