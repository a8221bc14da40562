//! Two-phase execution of a rename plan.
//!
//! Every source is first moved to a temporary name carrying [`TEMP_MARKER`],
//! and only then are the temporary names moved to their targets.
//! This way no rename can clobber a file that a later entry still has to move,
//! whatever permutation the plan describes.
//!
//! A failure stops the batch immediately. Nothing is rolled back:
//! leftovers keep the temporary marker in their names so they can be found and fixed by hand.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::batch_rename::{CommitError, CommitPhase, RenamePlan};

/// Substring present in every temporary file name.
pub const TEMP_MARKER: &str = "__tmp__";

/// Atomic rename primitive.
pub trait Renamer {
    /// Rename `from` to `to` atomically.
    ///
    /// # Errors
    /// Returns the underlying IO error.
    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Renames with [`std::fs::rename`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FsRenamer;

impl Renamer for FsRenamer {
    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

/// Suffix appended to source names during the first phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempTag(String);

impl TempTag {
    /// Tag unique to this process and moment, e.g. `.__tmp__4242_1700000000000__`.
    #[must_use]
    pub fn new() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_millis())
            .unwrap_or_default();
        Self::from_parts(std::process::id(), millis)
    }

    #[must_use]
    pub fn from_parts(process_id: u32, millis: u128) -> Self {
        Self(format!(".{TEMP_MARKER}{process_id}_{millis}__"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Temporary name for a source file.
    #[must_use]
    pub fn apply(&self, name: &str) -> String {
        format!("{name}{}", self.0)
    }
}

impl Default for TempTag {
    fn default() -> Self {
        Self::new()
    }
}

/// Execute the plan inside `directory` using the real filesystem.
///
/// # Errors
/// Returns the first failing rename. Files already moved keep their temporary names.
pub fn commit(directory: &Path, plan: &RenamePlan) -> Result<usize, CommitError> {
    commit_with(directory, plan, &TempTag::new(), &mut FsRenamer)
}

/// Execute the plan with a given temporary tag and rename primitive.
///
/// Returns the number of files renamed.
///
/// # Errors
/// Returns the first failing rename. Files already moved keep their temporary names.
pub fn commit_with<R: Renamer>(
    directory: &Path,
    plan: &RenamePlan,
    tag: &TempTag,
    renamer: &mut R,
) -> Result<usize, CommitError> {
    let total = plan.len();
    let staged: Vec<(PathBuf, PathBuf, PathBuf)> = plan
        .iter()
        .map(|entry| {
            (
                directory.join(&entry.source),
                directory.join(tag.apply(&entry.source)),
                directory.join(&entry.target),
            )
        })
        .collect();

    log::info!("Phase 1: moving {total} file(s) to temporary names with tag {}", tag.as_str());
    for (index, (source, temporary, _)) in staged.iter().enumerate() {
        run_step(renamer, CommitPhase::Stage, index, total, source, temporary)?;
    }

    log::info!("Phase 2: moving {total} file(s) to their final names");
    for (index, (_, temporary, target)) in staged.iter().enumerate() {
        run_step(renamer, CommitPhase::Finalize, index, total, temporary, target)?;
    }

    Ok(total)
}

fn run_step<R: Renamer>(
    renamer: &mut R,
    phase: CommitPhase,
    index: usize,
    total: usize,
    from: &Path,
    to: &Path,
) -> Result<(), CommitError> {
    log::debug!("{} -> {}", from.display(), to.display());
    renamer.rename(from, to).map_err(|source| CommitError {
        phase,
        step: index + 1,
        total,
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        marker: TEMP_MARKER.to_string(),
        source,
    })
}
