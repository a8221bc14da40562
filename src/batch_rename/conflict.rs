//! Detecting and resolving naming conflicts in a plan.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::batch_rename::{DirectoryListing, NumberingConfig, RenameEntry, RenameError, RenamePlan};

/// Number of example conflicts shown before summarising the rest.
pub const CONFLICT_EXAMPLE_LIMIT: usize = 2;

/// A problem with a planned target name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictRecord {
    /// Two plan entries produce the same target.
    Duplicate {
        target: String,
        /// First source seen with this target, then the current one.
        sources: [String; 2],
    },
    /// Target already exists and is not itself renamed away by the plan.
    Exists { target: String, source: String },
}

/// Caller's answer when conflicts are found and auto-resolve was not preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Append numeric suffixes using this numbering.
    AutoResolve(NumberingConfig),
    /// Stop without renaming anything.
    Abort,
}

impl ConflictRecord {
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Duplicate { target, .. } | Self::Exists { target, .. } => target,
        }
    }
}

impl fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate { target, sources } => write!(
                f,
                "multiple files would be renamed to the same name -> {target} ({} and {})",
                sources[0], sources[1]
            ),
            Self::Exists { target, source } => write!(f, "target already exists -> {target} (from {source})"),
        }
    }
}

/// Find duplicate targets and collisions with untouched existing files.
///
/// Names are compared with [`DirectoryListing::name_key`],
/// so a case-insensitive listing also catches targets that differ only in case.
#[must_use]
pub fn detect_conflicts(listing: &DirectoryListing, plan: &RenamePlan) -> Vec<ConflictRecord> {
    let existing: HashSet<Cow<str>> = listing.entries().iter().map(|entry| listing.name_key(&entry.name)).collect();
    let sources: HashSet<Cow<str>> = plan.iter().map(|entry| listing.name_key(&entry.source)).collect();
    let mut first_source_for_target: HashMap<Cow<str>, &str> = HashMap::new();
    let mut conflicts = Vec::new();

    for RenameEntry { source, target } in plan {
        let key = listing.name_key(target);
        if let Some(first) = first_source_for_target.get(&key) {
            conflicts.push(ConflictRecord::Duplicate {
                target: target.clone(),
                sources: [(*first).to_string(), source.clone()],
            });
        } else {
            first_source_for_target.insert(key.clone(), source);
        }

        if existing.contains(&key) && !sources.contains(&key) {
            conflicts.push(ConflictRecord::Exists {
                target: target.clone(),
                source: source.clone(),
            });
        }
    }

    conflicts
}

/// Return the plan unchanged if it is conflict free, otherwise resolve or abort.
///
/// `decide` is only called when conflicts exist and `auto_resolve` is false.
///
/// # Errors
/// Returns [`RenameError::UnresolvedConflicts`] if `decide` chooses to abort.
pub fn check_conflicts<F>(
    listing: &DirectoryListing,
    plan: RenamePlan,
    numbering: NumberingConfig,
    auto_resolve: bool,
    decide: F,
) -> Result<RenamePlan, RenameError>
where
    F: FnOnce(&[ConflictRecord]) -> Resolution,
{
    let conflicts = detect_conflicts(listing, &plan);
    if conflicts.is_empty() {
        return Ok(plan);
    }
    log::info!("Found {} naming conflict(s)", conflicts.len());

    let numbering = if auto_resolve {
        numbering
    } else {
        match decide(&conflicts) {
            Resolution::AutoResolve(numbering) => numbering,
            Resolution::Abort => {
                return Err(RenameError::UnresolvedConflicts {
                    count: conflicts.len(),
                });
            }
        }
    };

    Ok(resolve_conflicts(listing, &plan, numbering))
}

/// Append numeric suffixes to conflicting targets.
///
/// Each distinct original target gets its own counter starting at `numbering.start`.
/// Names already taken by untouched files, by unchanged plan targets,
/// or by earlier resolutions are skipped.
#[must_use]
pub fn resolve_conflicts(listing: &DirectoryListing, plan: &RenamePlan, numbering: NumberingConfig) -> RenamePlan {
    let key = |name: &str| listing.name_key(name).into_owned();
    let sources: HashSet<String> = plan.iter().map(|entry| key(&entry.source)).collect();
    let untouched: HashSet<String> = listing
        .entries()
        .iter()
        .map(|entry| key(&entry.name))
        .filter(|name| !sources.contains(name))
        .collect();

    let mut target_counts: HashMap<String, usize> = HashMap::new();
    for entry in plan {
        *target_counts.entry(key(&entry.target)).or_default() += 1;
    }
    let is_conflicting = |target: &str| {
        let target = key(target);
        target_counts[&target] > 1 || untouched.contains(&target)
    };

    // Targets that pass through unchanged must not be handed out as suffixed names
    let mut taken: HashSet<String> = untouched.clone();
    taken.extend(
        plan.iter()
            .filter(|entry| !is_conflicting(&entry.target))
            .map(|entry| key(&entry.target)),
    );

    let mut counters: HashMap<String, u64> = HashMap::new();
    let mut resolved = Vec::with_capacity(plan.len());
    for entry in plan {
        if !is_conflicting(&entry.target) {
            resolved.push(entry.clone());
            continue;
        }

        let (stem, extension) = split_extension(&entry.target);
        let mut counter = counters
            .get(&key(&entry.target))
            .map_or(numbering.start, |previous| previous + 1);
        let mut candidate = format!("{stem}{}{extension}", numbering.render(counter));
        while taken.contains(&key(&candidate)) {
            counter += 1;
            candidate = format!("{stem}{}{extension}", numbering.render(counter));
        }

        log::debug!("Resolved conflict: {} -> {candidate}", entry.source);
        counters.insert(key(&entry.target), counter);
        taken.insert(key(&candidate));
        resolved.push(RenameEntry::new(entry.source.clone(), candidate));
    }

    RenamePlan::new(resolved)
}

/// Split `name` into stem and extension, keeping the dot with the extension.
///
/// Leading dots belong to the stem, so `.bashrc` has no extension.
fn split_extension(name: &str) -> (&str, &str) {
    let leading_dots = name.len() - name.trim_start_matches('.').len();
    match name[leading_dots..].rfind('.') {
        Some(index) => name.split_at(leading_dots + index),
        None => (name, ""),
    }
}


#[cfg(test)]
mod resolve_conflicts_tests {
    use super::*;
    use crate::batch_rename::FileEntry;

    fn listing(names: &[&str]) -> DirectoryListing {
        DirectoryListing::from_entries(".", names.iter().map(|name| FileEntry::file(name)).collect())
    }

    fn targets(plan: &RenamePlan) -> Vec<&str> {
        plan.iter().map(|entry| entry.target.as_str()).collect()
    }

    fn assert_conflict_free(listing: &DirectoryListing, plan: &RenamePlan) {
        let sources = plan.sources();
        let mut seen = HashSet::new();
        for entry in plan {
            assert!(seen.insert(entry.target.as_str()), "duplicate target {}", entry.target);
            if listing.names().contains(entry.target.as_str()) {
                assert!(sources.contains(entry.target.as_str()), "collides with {}", entry.target);
            }
        }
    }

    #[test]
    fn duplicates_get_increasing_suffixes() {
        let listing = listing(&["a.txt", "b.txt"]);
        let plan: RenamePlan = [("a.txt", "out.txt"), ("b.txt", "out.txt")].into_iter().collect();
        let resolved = resolve_conflicts(&listing, &plan, NumberingConfig::new(1, 0));
        assert_eq!(targets(&resolved), vec!["out1.txt", "out2.txt"]);
    }

    #[test]
    fn existing_file_is_left_alone() {
        let listing = listing(&["x.txt", "y.txt"]);
        let plan: RenamePlan = [("y.txt", "x.txt")].into_iter().collect();
        let resolved = resolve_conflicts(&listing, &plan, NumberingConfig::new(1, 0));
        assert_eq!(resolved.entries(), &[RenameEntry::new("y.txt", "x1.txt")]);
    }

    #[test]
    fn counters_are_per_original_target() {
        let listing = listing(&["a", "b", "c", "d"]);
        let plan: RenamePlan = [("a", "x.mkv"), ("b", "y.mkv"), ("c", "x.mkv"), ("d", "y.mkv")]
            .into_iter()
            .collect();
        let resolved = resolve_conflicts(&listing, &plan, NumberingConfig::new(0, 2));
        assert_eq!(targets(&resolved), vec!["x00.mkv", "y00.mkv", "x01.mkv", "y01.mkv"]);
    }

    #[test]
    fn skips_taken_suffixed_names() {
        let listing = listing(&["a.txt", "b.txt", "out1.txt", "out2.txt"]);
        let plan: RenamePlan = [("a.txt", "out.txt"), ("b.txt", "out.txt")].into_iter().collect();
        let resolved = resolve_conflicts(&listing, &plan, NumberingConfig::new(1, 0));
        assert_eq!(targets(&resolved), vec!["out3.txt", "out4.txt"]);
        assert_conflict_free(&listing, &resolved);
    }

    #[test]
    fn does_not_hand_out_a_name_another_entry_keeps() {
        let listing = listing(&["a.txt", "b.txt", "c.txt"]);
        let plan: RenamePlan = [("a.txt", "out.txt"), ("b.txt", "out.txt"), ("c.txt", "out1.txt")]
            .into_iter()
            .collect();
        let resolved = resolve_conflicts(&listing, &plan, NumberingConfig::new(1, 0));
        assert_eq!(targets(&resolved), vec!["out2.txt", "out3.txt", "out1.txt"]);
        assert_conflict_free(&listing, &resolved);
    }

    #[test]
    fn unconflicted_entries_keep_order_and_name() {
        let listing = listing(&["a.txt", "b.txt", "c.txt", "taken.txt"]);
        let plan: RenamePlan = [("a.txt", "one.txt"), ("b.txt", "taken.txt"), ("c.txt", "two.txt")]
            .into_iter()
            .collect();
        let resolved = resolve_conflicts(&listing, &plan, NumberingConfig::new(1, 0));
        assert_eq!(targets(&resolved), vec!["one.txt", "taken1.txt", "two.txt"]);
    }

    #[test]
    fn case_insensitive_resolution_skips_names_taken_in_other_case() {
        let listing = listing(&["a.txt", "b.txt", "OUT1.txt"]).with_case_insensitive_names(true);
        let plan: RenamePlan = [("a.txt", "out.txt"), ("b.txt", "Out.txt")].into_iter().collect();
        let resolved = resolve_conflicts(&listing, &plan, NumberingConfig::new(1, 0));
        assert_eq!(targets(&resolved), vec!["out2.txt", "Out3.txt"]);
        assert!(detect_conflicts(&listing, &resolved).is_empty());
    }

    #[test]
    fn suffix_goes_before_last_extension_only() {
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension("..hidden.txt"), ("..hidden", ".txt"));
        assert_eq!(split_extension("noext"), ("noext", ""));
    }

    #[test]
    fn resolving_a_clean_plan_is_a_no_op() {
        let listing = listing(&["a.txt", "b.txt"]);
        let plan: RenamePlan = [("a.txt", "b.txt"), ("b.txt", "c.txt")].into_iter().collect();
        let resolved = resolve_conflicts(&listing, &plan, NumberingConfig::new(1, 0));
        assert_eq!(resolved, plan);
        let again = resolve_conflicts(&listing, &resolved, NumberingConfig::new(1, 0));
        assert_eq!(again, resolved);
    }

    #[test]
    fn many_duplicates_and_collisions_end_up_distinct() {
        let mut names: Vec<String> = (0..20).map(|i| format!("src{i}.txt")).collect();
        names.extend(["ep.txt".to_string(), "ep0.txt".to_string(), "ep3.txt".to_string()]);
        let entries = names.iter().map(|name| FileEntry::file(name)).collect();
        let listing = DirectoryListing::from_entries(".", entries);
        let plan: RenamePlan = (0..20)
            .map(|i| (format!("src{i}.txt"), if i % 2 == 0 { "ep.txt".to_string() } else { format!("ep{i}.txt") }))
            .collect();

        let resolved = resolve_conflicts(&listing, &plan, NumberingConfig::default());
        assert_eq!(resolved.len(), plan.len());
        assert_conflict_free(&listing, &resolved);
        assert!(detect_conflicts(&listing, &resolved).is_empty());
    }
}

#[cfg(test)]
mod check_conflicts_tests {
    use super::*;
    use crate::batch_rename::FileEntry;

    fn listing(names: &[&str]) -> DirectoryListing {
        DirectoryListing::from_entries(".", names.iter().map(|name| FileEntry::file(name)).collect())
    }

    #[test]
    fn clean_plan_is_returned_without_asking() {
        let plan: RenamePlan = [("a.txt", "b.txt")].into_iter().collect();
        let result = check_conflicts(&listing(&["a.txt"]), plan.clone(), NumberingConfig::default(), false, |_| {
            panic!("should not ask")
        })
        .unwrap();
        assert_eq!(result, plan);
    }

    #[test]
    fn auto_resolve_skips_decision() {
        let plan: RenamePlan = [("a.txt", "out.txt"), ("b.txt", "out.txt")].into_iter().collect();
        let result = check_conflicts(
            &listing(&["a.txt", "b.txt"]),
            plan,
            NumberingConfig::new(1, 0),
            true,
            |_| panic!("should not ask"),
        )
        .unwrap();
        let targets: Vec<&str> = result.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["out1.txt", "out2.txt"]);
    }

    #[test]
    fn decision_can_choose_numbering() {
        let plan: RenamePlan = [("y.txt", "x.txt")].into_iter().collect();
        let result = check_conflicts(
            &listing(&["x.txt", "y.txt"]),
            plan,
            NumberingConfig::default(),
            false,
            |conflicts| {
                assert_eq!(conflicts.len(), 1);
                Resolution::AutoResolve(NumberingConfig::new(5, 2))
            },
        )
        .unwrap();
        assert_eq!(result.entries(), &[RenameEntry::new("y.txt", "x05.txt")]);
    }

    #[test]
    fn abort_is_an_unresolved_conflict_error() {
        let plan: RenamePlan = [("a.txt", "out.txt"), ("b.txt", "out.txt")].into_iter().collect();
        let error = check_conflicts(
            &listing(&["a.txt", "b.txt"]),
            plan,
            NumberingConfig::default(),
            false,
            |_| Resolution::Abort,
        )
        .unwrap_err();
        assert!(matches!(error, RenameError::UnresolvedConflicts { count: 1 }));
        assert_eq!(error.exit_code(), 2);
    }
}
