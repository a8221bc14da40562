//! Built-in choices for the episode renaming mode and input normalization.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Video extensions offered as quick picks.
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mkv", "mp4", "avi", "mov"];

/// Preset episode pattern. The first capture group is the episode number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodePreset {
    pub pattern: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

/// Episode presets, all matched case-insensitively.
pub const EPISODE_PRESETS: [EpisodePreset; 3] = [
    EpisodePreset {
        pattern: r"E(\d+)",
        description: "E01, E02, e10",
        example: "Show.Name.E22.mkv",
    },
    EpisodePreset {
        pattern: r"S\d+\.E(\d+)",
        description: "S01.E01, S02.E05",
        example: "Show.Name.S01.E22.mkv",
    },
    EpisodePreset {
        pattern: r"Ep(\d+)",
        description: "Ep1, Ep10",
        example: "Show.Name.Ep22.mkv",
    },
];

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\u{3000}]+").expect("Failed to compile whitespace regex"));

static DOT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{2,}").expect("Failed to compile dot regex"));

/// Turn user input like `"State of Divinity S01"` into `"State.of.Divinity.S01"`.
///
/// Text that already contains a dot is only trimmed.
/// The result is NFC normalized so composed characters stay composed in file names.
///
/// ```rust
/// use rx_rename::batch_rename::dotify;
///
/// assert_eq!(dotify("  State of  Divinity S01 "), "State.of.Divinity.S01");
/// assert_eq!(dotify(" Already.Dotted Name "), "Already.Dotted Name");
/// ```
#[must_use]
pub fn dotify(text: &str) -> String {
    let trimmed = text.trim();
    let result = if trimmed.contains('.') {
        trimmed.to_string()
    } else {
        let dotted = WHITESPACE_RUN.replace_all(trimmed, ".");
        DOT_RUN.replace_all(&dotted, ".").into_owned()
    };
    result.nfc().collect()
}

/// Normalize an extension given by the user: trim, strip leading dots and lowercase.
#[must_use]
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}
