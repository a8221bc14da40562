//! Regex matching against file base names.

use std::fmt;

use itertools::Itertools;
use regex::{Regex, RegexBuilder};

use crate::batch_rename::PatternError;

/// Regex flags given as a combination of `i`, `m` and `s`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_matches_new_line: bool,
}

impl RegexFlags {
    /// Case-insensitive only, used by all episode presets.
    pub const IGNORE_CASE: Self = Self {
        case_insensitive: true,
        multi_line: false,
        dot_matches_new_line: false,
    };

    /// Parse a flag string such as `"i"`, `"im"` or `"ims"`.
    ///
    /// Whitespace is ignored and letters are case-insensitive.
    ///
    /// # Errors
    /// Returns an error for any character other than `i`, `m` or `s`.
    pub fn parse(flags: &str) -> Result<Self, PatternError> {
        let mut result = Self::default();
        for flag in flags.chars().filter(|c| !c.is_whitespace()) {
            match flag.to_ascii_lowercase() {
                'i' => result.case_insensitive = true,
                'm' => result.multi_line = true,
                's' => result.dot_matches_new_line = true,
                _ => return Err(PatternError::UnknownFlag { flag }),
            }
        }
        Ok(result)
    }
}

impl fmt::Display for RegexFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.case_insensitive {
            write!(f, "i")?;
        }
        if self.multi_line {
            write!(f, "m")?;
        }
        if self.dot_matches_new_line {
            write!(f, "s")?;
        }
        Ok(())
    }
}

/// Compiled patterns to search file names with.
///
/// An empty spec means files are numbered sequentially instead of matched.
#[derive(Debug, Clone, Default)]
pub struct MatchSpec {
    patterns: Vec<Regex>,
    flags: RegexFlags,
}

/// First successful match in a base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Byte offset where the whole match starts.
    pub start: usize,
    /// Byte offset where the whole match ends.
    pub end: usize,
    /// Captured text for groups `1..=N`, `None` if the group did not participate.
    groups: Vec<Option<String>>,
}

impl MatchSpec {
    /// Compile a comma-separated list of patterns.
    ///
    /// Empty items are skipped, so an empty or blank source gives an empty spec.
    ///
    /// # Errors
    /// Returns an error naming the first pattern that fails to compile.
    pub fn parse(source: &str, flags: RegexFlags) -> Result<Self, PatternError> {
        let patterns = source
            .split(',')
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| compile(pattern, flags))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("Compiled {} pattern(s) with flags '{flags}'", patterns.len());
        Ok(Self { patterns, flags })
    }

    /// Compile exactly one pattern that must contain a capture group.
    ///
    /// Used for custom episode patterns where the first group is the episode number.
    ///
    /// # Errors
    /// Returns an error if the source is empty, contains a comma,
    /// fails to compile, or has no capture group.
    pub fn parse_single(source: &str, flags: RegexFlags) -> Result<Self, PatternError> {
        let source = source.trim();
        if source.contains(',') {
            return Err(PatternError::MultiplePatterns {
                source_text: source.to_string(),
            });
        }
        if source.is_empty() {
            return Err(PatternError::InvalidRegex {
                pattern: String::new(),
                message: "empty pattern".to_string(),
            });
        }
        let spec = Self::parse(source, flags)?;
        if spec.capture_group_count() == 0 {
            return Err(PatternError::NoCaptureGroup {
                pattern: source.to_string(),
            });
        }
        Ok(spec)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[must_use]
    pub const fn flags(&self) -> RegexFlags {
        self.flags
    }

    #[must_use]
    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    /// Total number of capture groups summed over all patterns.
    #[must_use]
    pub fn capture_group_count(&self) -> usize {
        self.patterns
            .iter()
            .map(|regex| regex.captures_len().saturating_sub(1))
            .sum()
    }

    /// Find the first match that captured at least one group.
    #[must_use]
    pub fn find_match(&self, base_name: &str) -> Option<MatchResult> {
        find_match(base_name, &self.patterns)
    }

    /// True if any pattern matches anywhere in the base name, captures or not.
    #[must_use]
    pub fn is_match(&self, base_name: &str) -> bool {
        self.patterns.iter().any(|regex| regex.is_match(base_name))
    }
}

impl fmt::Display for MatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.patterns.iter().map(Regex::as_str).join(","))
    }
}

impl MatchResult {
    /// Captured text for group `index`, counting from 1.
    #[must_use]
    pub fn group(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.groups.get(i))
            .and_then(Option::as_deref)
    }

    /// Number of capture groups in the pattern that matched.
    #[must_use]
    pub const fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Split the base name into the text before and after the match.
    #[must_use]
    pub fn surrounding<'a>(&self, base_name: &'a str) -> (&'a str, &'a str) {
        (&base_name[..self.start], &base_name[self.end..])
    }
}

/// Try patterns in order and return the first match with a participating capture group.
///
/// The search is unanchored. A pattern that matches without capturing anything
/// counts as no match, and the next pattern is tried.
#[must_use]
pub fn find_match(base_name: &str, patterns: &[Regex]) -> Option<MatchResult> {
    patterns.iter().find_map(|regex| {
        let captures = regex.captures(base_name)?;
        let groups: Vec<Option<String>> = captures
            .iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_string()))
            .collect();

        if groups.iter().all(Option::is_none) {
            return None;
        }

        let whole = captures.get(0)?;
        Some(MatchResult {
            start: whole.start(),
            end: whole.end(),
            groups,
        })
    })
}

fn compile(pattern: &str, flags: RegexFlags) -> Result<Regex, PatternError> {
    RegexBuilder::new(pattern)
        .case_insensitive(flags.case_insensitive)
        .multi_line(flags.multi_line)
        .dot_matches_new_line(flags.dot_matches_new_line)
        .build()
        .map_err(|error| PatternError::InvalidRegex {
            pattern: pattern.to_string(),
            message: error.to_string(),
        })
}

#[cfg(test)]
mod regex_flags_tests {
    use super::*;

    #[test]
    fn parses_flag_combinations() {
        assert_eq!(RegexFlags::parse("").unwrap(), RegexFlags::default());
        assert_eq!(RegexFlags::parse("i").unwrap(), RegexFlags::IGNORE_CASE);

        let all = RegexFlags::parse("ImS").unwrap();
        assert!(all.case_insensitive);
        assert!(all.multi_line);
        assert!(all.dot_matches_new_line);
        assert_eq!(all.to_string(), "ims");
    }

    #[test]
    fn rejects_unknown_flag() {
        assert_eq!(
            RegexFlags::parse("ix"),
            Err(PatternError::UnknownFlag { flag: 'x' })
        );
    }
}


#[cfg(test)]
mod find_match_tests {
    use super::*;

    fn spec(source: &str) -> MatchSpec {
        MatchSpec::parse(source, RegexFlags::default()).unwrap()
    }

    #[test]
    fn finds_unanchored_match_with_span() {
        let result = spec(r"E(\d+)").find_match("Show.E12.1080p").unwrap();
        assert_eq!((result.start, result.end), (5, 8));
        assert_eq!(result.group(1), Some("12"));
        assert_eq!(result.surrounding("Show.E12.1080p"), ("Show.", ".1080p"));
    }

    #[test]
    fn tries_patterns_in_order() {
        let result = spec(r"S\d+\.E(\d+),E(\d+)").find_match("Show.S01.E03").unwrap();
        assert_eq!(result.start, 5);
        assert_eq!(result.group(1), Some("03"));

        let result = spec(r"X(\d+),E(\d+)").find_match("Show.E07").unwrap();
        assert_eq!(result.group(1), Some("07"));
    }

    #[test]
    fn match_without_capture_group_is_skipped() {
        assert!(spec(r"Show").find_match("Show.E01").is_none());
        let result = spec(r"Show,E(\d+)").find_match("Show.E01").unwrap();
        assert_eq!(result.group(1), Some("01"));
    }

    #[test]
    fn match_where_no_group_participates_is_skipped() {
        assert!(spec(r"Show(\d+)?").find_match("Show.E01").is_none());
    }

    #[test]
    fn optional_groups_are_absent() {
        let result = spec(r"(a)|(b)").find_match("xb").unwrap();
        assert_eq!(result.group_count(), 2);
        assert_eq!(result.group(1), None);
        assert_eq!(result.group(2), Some("b"));
        assert_eq!(result.group(0), None);
        assert_eq!(result.group(3), None);
    }

    #[test]
    fn no_match_returns_none() {
        assert!(spec(r"E(\d+)").find_match("Trailer").is_none());
        assert!(MatchSpec::default().find_match("anything").is_none());
    }

    #[test]
    fn is_match_ignores_groups() {
        assert!(spec(r"Show").is_match("Show.E01"));
        assert!(!spec(r"Movie").is_match("Show.E01"));
    }
}
