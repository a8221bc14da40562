//! Error types for planning and committing renames.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Exit status for unresolved naming conflicts the user declined to fix.
pub const EXIT_UNRESOLVED_CONFLICT: u8 = 2;
/// Exit status for a missing or invalid target directory.
pub const EXIT_INVALID_DIRECTORY: u8 = 1;
/// Exit status for a failure in the middle of the two-phase commit.
pub const EXIT_COMMIT_FAILED: u8 = 3;

/// Invalid pattern or replacement template.
///
/// Always raised before any file is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("Pattern '{pattern}' has no capture group")]
    NoCaptureGroup { pattern: String },

    #[error("Only a single pattern is supported here, got '{source_text}'")]
    MultiplePatterns { source_text: String },

    #[error("Template references ${reference} but the pattern only has {available} capture group(s)")]
    UnknownGroupReference { reference: usize, available: usize },

    #[error("Unknown regex flag '{flag}', expected a combination of 'i', 'm' and 's'")]
    UnknownFlag { flag: char },
}

/// Failure reading the directory to rename in.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Directory does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to read directory {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Which half of the two-phase commit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPhase {
    /// Moving sources to temporary names.
    Stage,
    /// Moving temporary names to final targets.
    Finalize,
}

impl std::fmt::Display for CommitPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stage => write!(f, "phase 1 (source -> temporary)"),
            Self::Finalize => write!(f, "phase 2 (temporary -> target)"),
        }
    }
}

/// A rename failed mid-batch. Not retried and not rolled back.
#[derive(Debug, Error)]
#[error("Rename failed in {phase} at step {step}/{total}: {} -> {}: {source}", .from.display(), .to.display())]
pub struct CommitError {
    pub phase: CommitPhase,
    /// One-based index of the failing entry.
    pub step: usize,
    pub total: usize,
    pub from: PathBuf,
    pub to: PathBuf,
    /// Marker present in every leftover temporary file name.
    pub marker: String,
    #[source]
    pub source: io::Error,
}

/// Umbrella error for the whole rename flow.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error(transparent)]
    Listing(#[from] ListingError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("{count} naming conflict(s) left unresolved")]
    UnresolvedConflicts { count: usize },

    #[error(transparent)]
    Commit(#[from] CommitError),
}

impl RenameError {
    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            // Pattern errors are re-prompted interactively,
            // reaching the top level means non-interactive input was invalid.
            Self::Listing(_) | Self::Pattern(_) => EXIT_INVALID_DIRECTORY,
            Self::UnresolvedConflicts { .. } => EXIT_UNRESOLVED_CONFLICT,
            Self::Commit(_) => EXIT_COMMIT_FAILED,
        }
    }
}
