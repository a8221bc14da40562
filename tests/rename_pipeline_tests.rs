//! End-to-end tests for plan -> resolve -> commit on real directories.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use rx_rename::batch_rename::{
    CommitPhase, DEFAULT_EPISODE_MARKER, DirectoryListing, MatchSpec, NamingMode, NumberingConfig, PlanRequest,
    RegexFlags, RenameError, RenamePlan, Renamer, Resolution, SortKey, TEMP_MARKER, TailPolicy, TempTag, Template,
    build_plan, check_conflicts, commit, commit_with, detect_conflicts,
};
use tempfile::{TempDir, tempdir};

fn directory_with(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().unwrap();
    for (name, content) in files {
        let mut file = File::create(dir.path().join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }
    dir
}

fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

fn targets(plan: &RenamePlan) -> Vec<&str> {
    plan.iter().map(|entry| entry.target.as_str()).collect()
}

#[test]
fn sequential_numbering_scenario() {
    let dir = directory_with(&[("c.txt", "C"), ("a.txt", "A"), ("b.txt", "B")]);
    let listing = DirectoryListing::read(dir.path()).unwrap();
    let request = PlanRequest {
        extension: "txt".to_string(),
        new_extension: None,
        mode: NamingMode::Sequential {
            prefix: "file.".to_string(),
            sort_key: SortKey::Name,
            numbering: NumberingConfig::new(1, 2),
        },
    };

    let plan = build_plan(&listing, &request);
    let pairs: Vec<(&str, &str)> = plan
        .iter()
        .map(|entry| (entry.source.as_str(), entry.target.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("a.txt", "file.01.txt"),
            ("b.txt", "file.02.txt"),
            ("c.txt", "file.03.txt")
        ]
    );

    let plan = check_conflicts(&listing, plan, NumberingConfig::default(), false, |_| Resolution::Abort).unwrap();
    assert_eq!(commit(dir.path(), &plan).unwrap(), 3);
    assert_eq!(dir_names(dir.path()), vec!["file.01.txt", "file.02.txt", "file.03.txt"]);
    assert_eq!(read(dir.path(), "file.03.txt"), "C");
}

#[test]
fn episode_scenario_keeps_digits() {
    let dir = directory_with(&[("Show.E1.mkv", "1"), ("Show.E2.mkv", "2"), ("notes.txt", "")]);
    let listing = DirectoryListing::read(dir.path()).unwrap();
    let request = PlanRequest {
        extension: "mkv".to_string(),
        new_extension: None,
        mode: NamingMode::Episode {
            spec: MatchSpec::parse_single(r"E(\d+)", RegexFlags::IGNORE_CASE).unwrap(),
            prefix: "Show.S01".to_string(),
            marker: DEFAULT_EPISODE_MARKER.to_string(),
            tail: TailPolicy::Preserve,
            numbering: NumberingConfig::default(),
        },
    };

    let plan = build_plan(&listing, &request);
    assert_eq!(targets(&plan), vec!["Show.S01.E1.mkv", "Show.S01.E2.mkv"]);

    commit(dir.path(), &plan).unwrap();
    assert_eq!(
        dir_names(dir.path()),
        vec!["Show.S01.E1.mkv", "Show.S01.E2.mkv", "notes.txt"]
    );
}

#[test]
fn duplicate_targets_scenario() {
    let dir = directory_with(&[("a1.txt", "first"), ("b2.txt", "second")]);
    let listing = DirectoryListing::read(dir.path()).unwrap();
    let request = PlanRequest {
        extension: "txt".to_string(),
        new_extension: None,
        mode: NamingMode::MatchOnly {
            spec: MatchSpec::parse(r"[a-z]\d", RegexFlags::default()).unwrap(),
            prefix: "out".to_string(),
        },
    };

    let plan = build_plan(&listing, &request);
    assert_eq!(targets(&plan), vec!["out.txt", "out.txt"]);
    assert_eq!(detect_conflicts(&listing, &plan).len(), 1);

    let plan = check_conflicts(&listing, plan, NumberingConfig::new(1, 0), true, |_| {
        panic!("auto-resolve must not ask")
    })
    .unwrap();
    assert_eq!(targets(&plan), vec!["out1.txt", "out2.txt"]);

    commit(dir.path(), &plan).unwrap();
    assert_eq!(read(dir.path(), "out1.txt"), "first");
    assert_eq!(read(dir.path(), "out2.txt"), "second");
}

#[test]
fn existing_file_scenario() {
    let dir = directory_with(&[("x.txt", "keep me"), ("raw_x.dat", "data")]);
    let listing = DirectoryListing::read(dir.path()).unwrap();
    let spec = MatchSpec::parse(r"raw_(x)", RegexFlags::default()).unwrap();
    let request = PlanRequest {
        extension: "dat".to_string(),
        new_extension: Some("txt".to_string()),
        mode: NamingMode::Template {
            template: Template::parse("$1", spec.capture_group_count()).unwrap(),
            spec,
        },
    };

    let plan = build_plan(&listing, &request);
    assert_eq!(targets(&plan), vec!["x.txt"]);

    let plan = check_conflicts(&listing, plan, NumberingConfig::default(), false, |conflicts| {
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].target(), "x.txt");
        Resolution::AutoResolve(NumberingConfig::new(1, 0))
    })
    .unwrap();
    assert_eq!(targets(&plan), vec!["x1.txt"]);

    commit(dir.path(), &plan).unwrap();
    assert_eq!(read(dir.path(), "x.txt"), "keep me");
    assert_eq!(read(dir.path(), "x1.txt"), "data");
}

#[test]
fn declined_conflicts_exit_with_status_two() {
    let dir = directory_with(&[("a.txt", ""), ("b.txt", "")]);
    let listing = DirectoryListing::read(dir.path()).unwrap();
    let plan: RenamePlan = [("a.txt", "same.txt"), ("b.txt", "same.txt")].into_iter().collect();

    let error = check_conflicts(&listing, plan, NumberingConfig::default(), false, |_| Resolution::Abort).unwrap_err();
    assert!(matches!(error, RenameError::UnresolvedConflicts { count: 1 }));
    assert_eq!(error.exit_code(), 2);
    assert_eq!(dir_names(dir.path()), vec!["a.txt", "b.txt"]);
}

/// Lets a fixed number of renames through, then fails.
struct InterruptAfter {
    remaining: usize,
}

impl Renamer for InterruptAfter {
    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted"));
        }
        self.remaining -= 1;
        fs::rename(from, to)
    }
}

#[test]
fn interrupted_commit_scenario() {
    let files = [("1.txt", "one"), ("2.txt", "two"), ("3.txt", "three")];
    let dir = directory_with(&files);
    let plan: RenamePlan = [("1.txt", "2.txt"), ("2.txt", "3.txt"), ("3.txt", "1.txt")]
        .into_iter()
        .collect();

    let tag = TempTag::new();
    let error = commit_with(dir.path(), &plan, &tag, &mut InterruptAfter { remaining: 2 }).unwrap_err();
    assert_eq!(error.phase, CommitPhase::Stage);
    assert_eq!(error.step, 3);

    let error = RenameError::from(error);
    assert_eq!(error.exit_code(), 3);

    let names = dir_names(dir.path());
    let marked: Vec<&String> = names.iter().filter(|name| name.contains(TEMP_MARKER)).collect();
    assert_eq!(marked.len(), 2);

    // No content is lost: every original content is still present under some name
    let contents: HashSet<String> = names.iter().map(|name| read(dir.path(), name)).collect();
    let expected: HashSet<String> = files.iter().map(|(_, content)| (*content).to_string()).collect();
    assert_eq!(contents, expected);
}

#[test]
fn resolved_plans_are_unique_and_avoid_untouched_files() {
    let dir = directory_with(&[
        ("out1.txt", "existing"),
        ("a.log", ""),
        ("b.log", ""),
        ("c.log", ""),
    ]);
    let listing = DirectoryListing::read(dir.path()).unwrap();
    let request = PlanRequest {
        extension: "log".to_string(),
        new_extension: Some("txt".to_string()),
        mode: NamingMode::MatchOnly {
            spec: MatchSpec::parse(r"\w", RegexFlags::default()).unwrap(),
            prefix: "out".to_string(),
        },
    };

    let plan = build_plan(&listing, &request);
    let plan = check_conflicts(&listing, plan, NumberingConfig::new(1, 0), true, |_| Resolution::Abort).unwrap();

    let resolved: HashSet<&str> = targets(&plan).into_iter().collect();
    assert_eq!(resolved.len(), plan.len());
    assert!(!resolved.contains("out1.txt"));
    assert!(detect_conflicts(&listing, &plan).is_empty());

    commit(dir.path(), &plan).unwrap();
    assert_eq!(read(dir.path(), "out1.txt"), "existing");
    assert_eq!(dir_names(dir.path()).len(), 4);
}
