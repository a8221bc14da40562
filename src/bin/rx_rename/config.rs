use std::{fmt, fs};

use anyhow::Context;
use serde::Deserialize;

use rx_rename::batch_rename::{DEFAULT_EPISODE_MARKER, SortKey, normalize_extension};

use crate::{Args, Mode};

/// Final config created from CLI arguments and user config file.
#[derive(Debug, Default)]
pub struct Config {
    pub(crate) mode: Option<Mode>,
    pub(crate) extension: Option<String>,
    pub(crate) pattern: Option<String>,
    pub(crate) flags: Option<String>,
    pub(crate) template: Option<String>,
    pub(crate) prefix: Option<String>,
    pub(crate) suffix: Option<String>,
    pub(crate) keep_tail: bool,
    pub(crate) new_extension: Option<String>,
    pub(crate) start: Option<u64>,
    pub(crate) padding: Option<usize>,
    /// Movie mode padding, only taken from the command line.
    pub(crate) episode_padding: Option<usize>,
    pub(crate) sort: Option<SortKey>,
    pub(crate) auto_resolve: bool,
    pub(crate) conflict_start: Option<u64>,
    pub(crate) conflict_padding: Option<usize>,
    pub(crate) assume_yes: bool,
    pub(crate) episode_marker: String,
    pub(crate) debug: bool,
    pub(crate) dryrun: bool,
    pub(crate) verbose: bool,
}

/// Config from the user config file
#[derive(Debug, Default, Deserialize)]
struct RenameConfig {
    #[serde(default)]
    auto_resolve: bool,
    #[serde(default)]
    dryrun: bool,
    #[serde(default)]
    episode_marker: Option<String>,
    #[serde(default)]
    extension: Option<String>,
    #[serde(default)]
    flags: Option<String>,
    #[serde(default)]
    padding: Option<usize>,
    #[serde(default)]
    sort: Option<SortKey>,
    #[serde(default)]
    start: Option<u64>,
    #[serde(default)]
    verbose: bool,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    rx_rename: RenameConfig,
}

impl RenameConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    fn get_user_config() -> anyhow::Result<Self> {
        let Some(path) = rx_rename::config_path() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.rx_rename)
            .context("Failed to parse rx_rename config TOML")
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or parsed.
    pub fn from_args(args: Args) -> anyhow::Result<Self> {
        let user_config = RenameConfig::get_user_config()?;
        Ok(Self::combine(args, user_config))
    }

    /// Merge with precedence: args > config file > default.
    fn combine(args: Args, user_config: RenameConfig) -> Self {
        let episode_marker = user_config
            .episode_marker
            .filter(|marker| !marker.trim().is_empty())
            .map_or_else(|| DEFAULT_EPISODE_MARKER.to_string(), |marker| marker.trim().to_string());

        Self {
            mode: args.mode,
            extension: args
                .extension
                .or(user_config.extension)
                .map(|extension| normalize_extension(&extension))
                .filter(|extension| !extension.is_empty()),
            pattern: args.pattern,
            flags: args.flags.or(user_config.flags),
            template: args.template,
            prefix: args.prefix,
            suffix: args.suffix,
            keep_tail: args.keep_tail,
            new_extension: args
                .new_extension
                .map(|extension| normalize_extension(&extension))
                .filter(|extension| !extension.is_empty()),
            start: args.start.or(user_config.start),
            episode_padding: args.padding,
            padding: args.padding.or(user_config.padding),
            sort: args.sort.or(user_config.sort),
            auto_resolve: args.auto_resolve || user_config.auto_resolve,
            conflict_start: args.conflict_start,
            conflict_padding: args.conflict_padding,
            assume_yes: args.yes,
            episode_marker,
            debug: args.debug,
            dryrun: args.print || user_config.dryrun,
            verbose: args.verbose || user_config.verbose,
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |value: Option<&str>| value.map_or_else(|| "-".to_string(), |value| format!("\"{value}\""));
        writeln!(f, "Config:")?;
        writeln!(f, "  auto resolve:   {}", rx_rename::colorize_bool(self.auto_resolve))?;
        writeln!(f, "  dryrun:         {}", rx_rename::colorize_bool(self.dryrun))?;
        writeln!(f, "  verbose:        {}", rx_rename::colorize_bool(self.verbose))?;
        writeln!(f, "  yes:            {}", rx_rename::colorize_bool(self.assume_yes))?;
        writeln!(f, "  extension:      {}", show(self.extension.as_deref()))?;
        writeln!(f, "  pattern:        {}", show(self.pattern.as_deref()))?;
        writeln!(f, "  flags:          {}", show(self.flags.as_deref()))?;
        writeln!(f, "  template:       {}", show(self.template.as_deref()))?;
        writeln!(f, "  prefix:         {}", show(self.prefix.as_deref()))?;
        writeln!(f, "  suffix:         {}", show(self.suffix.as_deref()))?;
        writeln!(f, "  new extension:  {}", show(self.new_extension.as_deref()))?;
        writeln!(f, "  episode marker: \"{}\"", self.episode_marker)?;
        writeln!(
            f,
            "  numbering:      start {}, padding {}",
            self.start.unwrap_or_default(),
            self.padding.unwrap_or_default()
        )?;
        write!(
            f,
            "  sort:           {}",
            self.sort.map_or_else(|| "-".to_string(), |sort| sort.to_string())
        )
    }
}


#[cfg(test)]
mod config_from_args_tests {
    use super::*;

    use std::fs::File;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use clap::Parser;
    use tempfile::tempdir;

    use crate::flow::{Outcome, RenameFlow};

    fn parse_args(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rxrename").chain(args.iter().copied())).expect("should parse")
    }

    fn default_args() -> Args {
        parse_args(&[])
    }

    #[test]
    fn defaults_without_args_or_config() {
        let config = Config::combine(default_args(), RenameConfig::default());
        assert!(config.mode.is_none());
        assert!(config.extension.is_none());
        assert!(!config.auto_resolve);
        assert!(!config.dryrun);
        assert!(!config.assume_yes);
        assert_eq!(config.episode_marker, DEFAULT_EPISODE_MARKER);
    }

    #[test]
    fn args_override_config_values() {
        let user_config = RenameConfig {
            extension: Some("mp4".to_string()),
            start: Some(5),
            padding: Some(3),
            sort: Some(SortKey::Mtime),
            flags: Some("i".to_string()),
            ..Default::default()
        };
        let args = parse_args(&["-e", ".MKV", "-s", "1", "-w", "2", "--sort", "name", "-f", "s"]);
        let config = Config::combine(args, user_config);
        assert_eq!(config.extension.as_deref(), Some("mkv"));
        assert_eq!(config.start, Some(1));
        assert_eq!(config.padding, Some(2));
        assert_eq!(config.sort, Some(SortKey::Name));
        assert_eq!(config.flags.as_deref(), Some("s"));
    }

    #[test]
    fn config_fills_missing_args() {
        let user_config = RenameConfig {
            extension: Some("Avi".to_string()),
            start: Some(7),
            auto_resolve: true,
            dryrun: true,
            episode_marker: Some(" Ep ".to_string()),
            ..Default::default()
        };
        let config = Config::combine(default_args(), user_config);
        assert_eq!(config.extension.as_deref(), Some("avi"));
        assert_eq!(config.start, Some(7));
        assert!(config.auto_resolve);
        assert!(config.dryrun);
        assert_eq!(config.episode_marker, "Ep");
    }

    #[test]
    fn blank_episode_marker_falls_back_to_default() {
        let user_config = RenameConfig {
            episode_marker: Some("  ".to_string()),
            ..Default::default()
        };
        let config = Config::combine(default_args(), user_config);
        assert_eq!(config.episode_marker, DEFAULT_EPISODE_MARKER);
    }

    #[test]
    fn new_extension_is_normalized() {
        let config = Config::combine(parse_args(&["-n", "..MP4"]), RenameConfig::default());
        assert_eq!(config.new_extension.as_deref(), Some("mp4"));

        let config = Config::combine(parse_args(&["-n", "."]), RenameConfig::default());
        assert!(config.new_extension.is_none());
    }

    #[test]
    fn config_padding_does_not_pad_episodes() {
        let user_config = RenameConfig {
            padding: Some(2),
            ..Default::default()
        };
        let config = Config::combine(default_args(), user_config);
        assert_eq!(config.padding, Some(2));
        assert!(config.episode_padding.is_none());

        let config = Config::combine(parse_args(&["-w", "3"]), RenameConfig::default());
        assert_eq!(config.episode_padding, Some(3));
    }

    #[test]
    fn movie_mode_ignores_sequential_padding_from_config() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("Show.E1.mkv")).unwrap();
        let args = parse_args(&[
            "--mode", "movie", "-e", "mkv", "-r", r"E(\d+)", "--prefix", "Show.S01", "-k", "-y",
        ]);
        let user_config = RenameConfig {
            padding: Some(2),
            start: Some(1),
            ..Default::default()
        };
        let config = Config::combine(args, user_config);

        let outcome = RenameFlow::new(config, dir.path().to_path_buf(), Arc::new(AtomicBool::new(false)))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(outcome, Outcome::Renamed(1));
        assert!(dir.path().join("Show.S01.E1.mkv").exists());
    }

    #[test]
    fn print_flag_enables_dryrun() {
        let config = Config::combine(parse_args(&["-p"]), RenameConfig::default());
        assert!(config.dryrun);
    }
}
