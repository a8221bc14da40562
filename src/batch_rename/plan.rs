//! Building rename plans from a directory listing.

use std::fmt;
use std::time::SystemTime;

use serde::Deserialize;

use crate::batch_rename::{DirectoryListing, FileEntry, MatchResult, MatchSpec, NumberingConfig, Template};

/// Episode marker inserted before the episode number by default.
pub const DEFAULT_EPISODE_MARKER: &str = "E";

/// One planned rename inside the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEntry {
    pub source: String,
    pub target: String,
}

/// Ordered list of renames for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenamePlan {
    entries: Vec<RenameEntry>,
}

/// Ordering used for sequential numbering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    #[serde(alias = "modified")]
    #[value(alias = "modified")]
    Mtime,
}

/// What to do with the text after the episode match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailPolicy {
    /// Keep the original tail with surrounding dots trimmed.
    Preserve,
    /// Replace every tail with the same text.
    Replace(String),
}

/// How new names are generated.
#[derive(Debug, Clone)]
pub enum NamingMode {
    /// `prefix + number + "." + extension` in sorted order.
    Sequential {
        prefix: String,
        sort_key: SortKey,
        numbering: NumberingConfig,
    },
    /// Substitute capture groups into a template.
    Template { spec: MatchSpec, template: Template },
    /// `prefix + "." + marker + episode + tail`, with group 1 as the episode number.
    Episode {
        spec: MatchSpec,
        prefix: String,
        marker: String,
        tail: TailPolicy,
        numbering: NumberingConfig,
    },
    /// Rename every matching file to the prefix, or keep its base if the prefix is empty.
    MatchOnly { spec: MatchSpec, prefix: String },
}

/// Everything needed to plan one batch.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// Source extension without the leading dot, compared case-insensitively.
    pub extension: String,
    /// Replacement extension without the leading dot.
    pub new_extension: Option<String>,
    pub mode: NamingMode,
}

impl RenameEntry {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for RenameEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

impl RenamePlan {
    #[must_use]
    pub const fn new(entries: Vec<RenameEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[RenameEntry] {
        &self.entries
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenameEntry> {
        self.entries.iter()
    }

    /// Names that will be moved away by this plan.
    #[must_use]
    pub fn sources(&self) -> std::collections::HashSet<&str> {
        self.entries.iter().map(|entry| entry.source.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a RenamePlan {
    type Item = &'a RenameEntry;
    type IntoIter = std::slice::Iter<'a, RenameEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<S: Into<String>, T: Into<String>> FromIterator<(S, T)> for RenamePlan {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(source, target)| RenameEntry::new(source, target))
                .collect(),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Mtime => write!(f, "mtime"),
        }
    }
}

impl PlanRequest {
    /// Extension written on generated names, or `None` to keep the file's own.
    fn target_extension(&self) -> Option<&str> {
        match (&self.new_extension, &self.mode) {
            (Some(extension), _) => Some(extension.as_str()),
            (None, NamingMode::Episode { .. }) => None,
            (None, _) => Some(self.extension.as_str()),
        }
    }

    /// Number of candidate files that the naming mode would act on.
    ///
    /// Used to report matches before asking for the rest of the naming options.
    #[must_use]
    pub fn count_matches(listing: &DirectoryListing, extension: &str, spec: Option<&MatchSpec>) -> usize {
        let candidates = listing.files_with_extension(extension);
        match spec {
            Some(spec) if spec.capture_group_count() > 0 => candidates
                .filter(|entry| spec.find_match(entry.stem()).is_some())
                .count(),
            Some(spec) if !spec.is_empty() => candidates.filter(|entry| spec.is_match(entry.stem())).count(),
            _ => candidates.count(),
        }
    }

    /// Number of candidate files whose first capture group holds a numeric episode.
    #[must_use]
    pub fn count_episode_matches(listing: &DirectoryListing, extension: &str, spec: &MatchSpec) -> usize {
        listing
            .files_with_extension(extension)
            .filter(|entry| spec.find_match(entry.stem()).as_ref().and_then(episode_number).is_some())
            .count()
    }
}

/// Generate the rename plan for a listing.
///
/// Files whose new name equals the current one are left out.
#[must_use]
pub fn build_plan(listing: &DirectoryListing, request: &PlanRequest) -> RenamePlan {
    let candidates: Vec<&FileEntry> = listing.files_with_extension(&request.extension).collect();
    let extension = request.target_extension();

    let targets: Vec<(&FileEntry, String)> = match &request.mode {
        NamingMode::Sequential {
            prefix,
            sort_key,
            numbering,
        } => sequential_names(candidates, prefix, *sort_key, *numbering),
        NamingMode::Template { spec, template } => candidates
            .into_iter()
            .filter_map(|entry| {
                let result = spec.find_match(entry.stem())?;
                Some((entry, template.substitute(&result)))
            })
            .collect(),
        NamingMode::Episode {
            spec,
            prefix,
            marker,
            tail,
            numbering,
        } => candidates
            .into_iter()
            .filter_map(|entry| {
                let base = episode_name(entry.stem(), spec, prefix, marker, tail, *numbering)?;
                Some((entry, base))
            })
            .collect(),
        NamingMode::MatchOnly { spec, prefix } => candidates
            .into_iter()
            .filter(|entry| spec.is_match(entry.stem()))
            .map(|entry| {
                let base = if prefix.is_empty() { entry.stem() } else { prefix };
                (entry, base.to_string())
            })
            .collect(),
    };

    let mut entries = Vec::with_capacity(targets.len());
    for (entry, base) in targets {
        let target = match extension.or_else(|| entry.extension()) {
            Some(ext) if !ext.is_empty() => format!("{base}.{ext}"),
            _ => base,
        };
        if target == entry.name {
            log::debug!("Skipping unchanged: {}", entry.name);
            continue;
        }
        if !is_valid_file_name(&target) {
            log::warn!("Skipping {}: generated name '{target}' is not a valid file name", entry.name);
            continue;
        }
        log::debug!("Plan: {} -> {target}", entry.name);
        entries.push(RenameEntry::new(entry.name.clone(), target));
    }

    RenamePlan::new(entries)
}

fn sequential_names<'a>(
    mut files: Vec<&'a FileEntry>,
    prefix: &str,
    sort_key: SortKey,
    numbering: NumberingConfig,
) -> Vec<(&'a FileEntry, String)> {
    match sort_key {
        SortKey::Name => files.sort_by(|a, b| a.name.cmp(&b.name)),
        SortKey::Mtime => {
            files.sort_by_key(|entry| entry.modified.unwrap_or(SystemTime::UNIX_EPOCH));
        }
    }

    files
        .into_iter()
        .zip(numbering.start..)
        .map(|(entry, number)| (entry, format!("{prefix}{}", numbering.render(number))))
        .collect()
}

/// Episode number from the first capture group. Non-numeric captures do not count as an episode.
fn episode_number(result: &MatchResult) -> Option<u64> {
    result.group(1)?.parse().ok()
}

/// Compose `prefix.E<episode>[.tail]` for a matching base name.
fn episode_name(
    base: &str,
    spec: &MatchSpec,
    prefix: &str,
    marker: &str,
    tail: &TailPolicy,
    numbering: NumberingConfig,
) -> Option<String> {
    let result = spec.find_match(base)?;
    let Some(episode) = episode_number(&result) else {
        log::debug!("Skipping {base}: episode '{}' is not a number", result.group(1).unwrap_or_default());
        return None;
    };
    let episode = numbering.render(episode);

    let middle = match tail {
        TailPolicy::Replace(suffix) => suffix.as_str(),
        TailPolicy::Preserve => result.surrounding(base).1.trim_matches('.'),
    };
    let left = prefix.strip_suffix('.').unwrap_or(prefix);

    Some(if middle.is_empty() {
        format!("{left}.{marker}{episode}")
    } else {
        format!("{left}.{marker}{episode}.{middle}")
    })
}

fn is_valid_file_name(name: &str) -> bool {
    !matches!(name, "" | "." | "..") && !name.contains(['/', '\0', std::path::MAIN_SEPARATOR])
}
