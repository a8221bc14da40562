//! Batch rename engine.
//!
//! Turns a directory listing and naming options into a [`RenamePlan`],
//! checks the plan for naming conflicts and fixes them with numeric suffixes,
//! and finally commits it with a two-phase rename that cannot clobber files mid-batch.
//!
//! The engine does no terminal IO. Callers decide how to ask the user
//! and pass the answers in as plain values.

mod commit;
mod conflict;
mod error;
mod listing;
mod numbering;
mod pattern;
mod plan;
mod preset;
mod template;

pub use commit::{FsRenamer, Renamer, TEMP_MARKER, TempTag, commit, commit_with};
pub use conflict::{
    CONFLICT_EXAMPLE_LIMIT, ConflictRecord, Resolution, check_conflicts, detect_conflicts, resolve_conflicts,
};
pub use error::{
    CommitError, CommitPhase, EXIT_COMMIT_FAILED, EXIT_INVALID_DIRECTORY, EXIT_UNRESOLVED_CONFLICT, ListingError,
    PatternError, RenameError,
};
pub use listing::{DirectoryListing, FileEntry};
pub use numbering::{NumberingConfig, render};
pub use pattern::{MatchResult, MatchSpec, RegexFlags, find_match};
pub use plan::{
    DEFAULT_EPISODE_MARKER, NamingMode, PlanRequest, RenameEntry, RenamePlan, SortKey, TailPolicy, build_plan,
};
pub use preset::{EPISODE_PRESETS, EpisodePreset, VIDEO_EXTENSIONS, dotify, normalize_extension};
pub use template::Template;
