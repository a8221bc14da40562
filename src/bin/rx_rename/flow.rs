//! Movie and custom rename flows.
//!
//! Values given on the command line or in the user config are used as is,
//! everything else is asked interactively.
//! With `--yes` confirmations are accepted and optional questions take their defaults.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use colored::Colorize;

use rx_rename::batch_rename::{
    CONFLICT_EXAMPLE_LIMIT, ConflictRecord, DirectoryListing, EPISODE_PRESETS, MatchSpec, NamingMode,
    NumberingConfig, PatternError, PlanRequest, RegexFlags, RenameError, RenamePlan, Resolution, SortKey,
    TailPolicy, Template, VIDEO_EXTENSIONS, build_plan, check_conflicts, commit, dotify,
    normalize_extension,
};
use rx_rename::{print_error, print_warning};

use crate::Mode;
use crate::config::Config;
use crate::prompt;

const CUSTOM_CHOICE: &str = "custom";

/// How a run finished without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Renamed(usize),
    DryRun(usize),
    NothingToRename,
    NoMatches,
    Cancelled,
}

/// Rename session for one directory.
pub struct RenameFlow {
    config: Config,
    directory: PathBuf,
    listing: DirectoryListing,
    committing: Arc<AtomicBool>,
}

/// Fully configured batch ready for planning.
struct Batch {
    request: PlanRequest,
    /// Numbering for conflict suffixes when not asked interactively.
    conflict_numbering: NumberingConfig,
    ask_conflict_numbering: bool,
}

enum MatchCheck {
    Found,
    Retry,
    Stop,
}

enum CustomNaming {
    Sequential,
    Template(MatchSpec, Template),
    MatchOnly(MatchSpec),
}

impl RenameFlow {
    /// Read the directory and prepare a session.
    ///
    /// `committing` is raised while files are being renamed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be read.
    pub fn new(config: Config, directory: PathBuf, committing: Arc<AtomicBool>) -> Result<Self, RenameError> {
        let listing = DirectoryListing::read(&directory)?;
        log::debug!("Read {} entries from {}", listing.entries().len(), directory.display());
        Ok(Self {
            config,
            directory,
            listing,
            committing,
        })
    }

    /// Collect the naming options, then plan, preview and commit.
    pub fn run(&mut self) -> Result<Outcome> {
        let mode = match self.config.mode {
            Some(mode) => mode,
            None => {
                let index = prompt::select(
                    "Select mode",
                    &["Movie mode (episode presets)", "Custom mode (regular expressions)"],
                )?;
                if index == 0 { Mode::Movie } else { Mode::Custom }
            }
        };

        let batch = match mode {
            Mode::Movie => self.movie_batch()?,
            Mode::Custom => self.custom_batch()?,
        };

        match batch {
            Some(batch) => self.execute(&batch),
            None => Ok(Outcome::NoMatches),
        }
    }

    fn movie_batch(&mut self) -> Result<Option<Batch>> {
        println!("{}", "== Movie mode ==".magenta().bold());

        let Some(extension) = self.choose_extension(true)? else {
            return Ok(None);
        };
        let Some(spec) = self.choose_episode_pattern(&extension)? else {
            return Ok(None);
        };

        let prefix = match self.config.prefix.take() {
            Some(prefix) => prefix,
            None => prompt::text("New prefix (e.g. State.of.Divinity.S01)")?,
        };
        let prefix = dotify(&prefix);
        let tail = self.choose_tail()?;

        // Episodes keep their digits unless padding is given on the command line.
        let numbering = NumberingConfig::new(0, self.config.episode_padding.unwrap_or_default());
        let request = PlanRequest {
            extension,
            new_extension: self.config.new_extension.clone(),
            mode: NamingMode::Episode {
                spec,
                prefix,
                marker: self.config.episode_marker.clone(),
                tail,
                numbering,
            },
        };

        Ok(Some(Batch {
            request,
            conflict_numbering: NumberingConfig::new(
                self.config.conflict_start.unwrap_or_default(),
                self.config.conflict_padding.unwrap_or_default(),
            ),
            ask_conflict_numbering: false,
        }))
    }

    fn custom_batch(&mut self) -> Result<Option<Batch>> {
        println!("{}", "== Custom mode ==".blue().bold());

        let Some(extension) = self.choose_extension(false)? else {
            return Ok(None);
        };
        let Some(naming) = self.choose_custom_naming(&extension)? else {
            return Ok(None);
        };

        let (mode, numbering) = match naming {
            CustomNaming::Sequential => {
                let prefix = match self.config.prefix.take() {
                    Some(prefix) => prefix,
                    None => prompt::text("Prefix for the new names (e.g. file_)")?,
                };
                let sort_key = self.choose_sort_key()?;
                let numbering = self.ask_numbering("Sequence", self.config.start, self.config.padding)?;
                (
                    NamingMode::Sequential {
                        prefix: dotify(&prefix),
                        sort_key,
                        numbering,
                    },
                    numbering,
                )
            }
            CustomNaming::Template(spec, template) => {
                (NamingMode::Template { spec, template }, NumberingConfig::default())
            }
            CustomNaming::MatchOnly(spec) => {
                let prefix = match self.config.prefix.take() {
                    Some(prefix) => prefix,
                    None => prompt::optional_text("Prefix for the new names (empty keeps the name)")?,
                };
                (
                    NamingMode::MatchOnly {
                        spec,
                        prefix: dotify(&prefix),
                    },
                    NumberingConfig::default(),
                )
            }
        };

        let new_extension = self.choose_new_extension(&extension)?;
        let ask_conflict_numbering = self.config.conflict_start.is_none() && self.config.conflict_padding.is_none();
        Ok(Some(Batch {
            request: PlanRequest {
                extension,
                new_extension,
                mode,
            },
            conflict_numbering: NumberingConfig::new(
                self.config.conflict_start.unwrap_or(numbering.start),
                self.config.conflict_padding.unwrap_or(numbering.padding_width),
            ),
            ask_conflict_numbering,
        }))
    }

    fn choose_extension(&mut self, quick_picks: bool) -> Result<Option<String>> {
        loop {
            let extension = match self.config.extension.take() {
                Some(extension) => extension,
                None if quick_picks => {
                    let mut items = VIDEO_EXTENSIONS.to_vec();
                    items.push(CUSTOM_CHOICE);
                    let index = prompt::select("Select the file extension to process", &items)?;
                    match VIDEO_EXTENSIONS.get(index) {
                        Some(extension) => (*extension).to_string(),
                        None => prompt::text("File extension (without dot)")?,
                    }
                }
                None => prompt::text("File extension (without dot)")?,
            };

            let extension = normalize_extension(&extension);
            if extension.is_empty() {
                print_warning!("Extension cannot be empty");
                continue;
            }
            let count = PlanRequest::count_matches(&self.listing, &extension, None);
            match self.check_matches(&extension, count)? {
                MatchCheck::Found => return Ok(Some(extension)),
                MatchCheck::Retry => {}
                MatchCheck::Stop => return Ok(None),
            }
        }
    }

    fn choose_episode_pattern(&mut self, extension: &str) -> Result<Option<MatchSpec>> {
        loop {
            let spec = if let Some(source) = self.config.pattern.take() {
                let flags = self.configured_flags(RegexFlags::IGNORE_CASE)?;
                match MatchSpec::parse_single(&source, flags) {
                    Ok(spec) => spec,
                    Err(error) => {
                        self.invalid_input(error)?;
                        continue;
                    }
                }
            } else {
                self.prompt_episode_pattern()?
            };

            let count = PlanRequest::count_episode_matches(&self.listing, extension, &spec);
            match self.check_matches(extension, count)? {
                MatchCheck::Found => return Ok(Some(spec)),
                MatchCheck::Retry => {}
                MatchCheck::Stop => return Ok(None),
            }
        }
    }

    fn prompt_episode_pattern(&self) -> Result<MatchSpec> {
        println!("\n{}", "The pattern locates the episode number.".dimmed());
        let mut items: Vec<String> = EPISODE_PRESETS
            .iter()
            .map(|preset| {
                format!(
                    "{} - matches {} (e.g. {}, ignores case)",
                    preset.pattern, preset.description, preset.example
                )
            })
            .collect();
        items.push("Custom regex - a single pattern with your own match flags".to_string());

        let index = prompt::select("Select the pattern type", &items)?;
        if let Some(preset) = EPISODE_PRESETS.get(index) {
            return Ok(MatchSpec::parse_single(preset.pattern, RegexFlags::IGNORE_CASE).map_err(RenameError::from)?);
        }

        let source = loop {
            let source = prompt::text(r"Custom regex, the first capture group is the episode number (e.g. E(\d+))")?;
            match MatchSpec::parse_single(&source, RegexFlags::default()) {
                Ok(_) => break source,
                Err(error) => {
                    print_error!("{error}");
                    if matches!(error, PatternError::NoCaptureGroup { .. }) {
                        println!("{}", r"Example: (\d+) in E(\d+) is a capture group".dimmed());
                    }
                }
            }
        };

        let flags = self.prompt_flags()?;
        Ok(MatchSpec::parse_single(&source, flags).map_err(RenameError::from)?)
    }

    fn prompt_flags(&self) -> Result<RegexFlags> {
        if self.config.flags.is_some() || self.config.assume_yes {
            return self.configured_flags(RegexFlags::default());
        }

        println!("\n{}", "Match flags:".bold());
        println!("{}", "  i = ignore case (recommended)".dimmed());
        println!("{}", "  m = multi-line mode".dimmed());
        println!("{}", "  s = dot matches newline".dimmed());
        println!("{}", "  Combine freely, e.g. im or ims. Leave empty for none.".dimmed());
        loop {
            let input = prompt::optional_text("Match flags")?;
            match RegexFlags::parse(&input) {
                Ok(flags) => return Ok(flags),
                Err(error) => print_error!("{error}"),
            }
        }
    }

    fn choose_tail(&self) -> Result<TailPolicy> {
        if let Some(suffix) = &self.config.suffix {
            return Ok(TailPolicy::Replace(dotify(suffix)));
        }
        if self.config.keep_tail || self.config.assume_yes {
            return Ok(TailPolicy::Preserve);
        }

        println!(
            "\n{}",
            "The suffix is everything between the episode number and the extension.".dimmed()
        );
        let index = prompt::select(
            "Suffix handling",
            &["Keep the original suffix", "Replace with a fixed suffix"],
        )?;
        if index == 0 {
            Ok(TailPolicy::Preserve)
        } else {
            Ok(TailPolicy::Replace(dotify(&prompt::text("Suffix (without extension)")?)))
        }
    }

    fn choose_custom_naming(&mut self, extension: &str) -> Result<Option<CustomNaming>> {
        loop {
            let source = match self.config.pattern.take() {
                Some(source) => source,
                None => {
                    println!("\n{}", "Pattern:".bold());
                    println!("{}", "- Leave empty to number the files sequentially".dimmed());
                    println!("{}", "- A regex extracts parts of the name with capture groups".dimmed());
                    println!("{}", "-- Separate several patterns with commas, the first match wins".dimmed());
                    println!("{}", r"-- Example: ([A-Z]+)(\d+) has two groups, referenced as $1 and $2".dimmed());
                    prompt::optional_text("Pattern (empty for sequential numbering)")?
                }
            };

            let flags = self.configured_flags(RegexFlags::default())?;
            let spec = match MatchSpec::parse(&source, flags) {
                Ok(spec) => spec,
                Err(error) => {
                    self.invalid_input(error)?;
                    continue;
                }
            };
            if spec.is_empty() {
                return Ok(Some(CustomNaming::Sequential));
            }

            let count = PlanRequest::count_matches(&self.listing, extension, Some(&spec));
            match self.check_matches(extension, count)? {
                MatchCheck::Found => {}
                MatchCheck::Retry => continue,
                MatchCheck::Stop => return Ok(None),
            }

            let groups = spec.capture_group_count();
            if groups == 0 {
                print_warning!("The pattern has no capture groups, nothing can be substituted.");
                if self.confirm("Continue? Matching files get the prefix as their new name", false)? {
                    return Ok(Some(CustomNaming::MatchOnly(spec)));
                }
                continue;
            }

            println!("\n{}", format!("Found {groups} capture group(s).").bold());
            println!("{}", "Reference them in the template with $1, $2, $3 ...".dimmed());
            println!("{}", r"Example: for ([A-Z]+)(\d+) use '$1_$2' or 'Name.$2'".dimmed());
            let template = self.choose_template(groups)?;
            return Ok(Some(CustomNaming::Template(spec, template)));
        }
    }

    fn choose_template(&mut self, groups: usize) -> Result<Template> {
        loop {
            let source = match self.config.template.take() {
                Some(source) => source,
                None => prompt::text("Replacement template")?,
            };
            let template = match Template::parse(&source, groups) {
                Ok(template) => template,
                Err(error) => {
                    self.invalid_input(error)?;
                    continue;
                }
            };
            if !template.has_references() {
                print_warning!("The template does not reference any capture group ($1, $2 ...)");
                if !self.confirm("Continue anyway?", true)? {
                    continue;
                }
            }
            return Ok(template);
        }
    }

    fn choose_sort_key(&self) -> Result<SortKey> {
        if let Some(sort_key) = self.config.sort {
            return Ok(sort_key);
        }
        if self.config.assume_yes {
            return Ok(SortKey::default());
        }
        let index = prompt::select(
            "Sort files for numbering",
            &["By file name (name)", "By modification time (mtime)"],
        )?;
        Ok(if index == 0 { SortKey::Name } else { SortKey::Mtime })
    }

    fn ask_numbering(&self, label: &str, start: Option<u64>, padding: Option<usize>) -> Result<NumberingConfig> {
        let start = match start {
            Some(start) => start,
            None if self.config.assume_yes => 0,
            None => prompt::number(&format!("{label} start number"), 0_u64)?,
        };
        let padding = match padding {
            Some(padding) => padding,
            None if self.config.assume_yes => 0,
            None => prompt::number(&format!("{label} digit count (2 gives 01, 02; 0 disables padding)"), 0_usize)?,
        };
        Ok(NumberingConfig::new(start, padding))
    }

    fn choose_new_extension(&self, extension: &str) -> Result<Option<String>> {
        if let Some(new_extension) = &self.config.new_extension {
            return Ok(Some(new_extension.clone()));
        }
        if self.config.assume_yes || !prompt::confirm("Replace the file extension?", false)? {
            return Ok(None);
        }
        let new_extension = normalize_extension(&prompt::text_with_default("New extension (without dot)", extension)?);
        Ok(Some(new_extension).filter(|new_extension| !new_extension.is_empty()))
    }

    /// Report how many candidates match and decide whether to continue.
    fn check_matches(&self, extension: &str, count: usize) -> Result<MatchCheck> {
        let message = format!("Found {count} matching .{extension} file(s)");
        if count > 0 {
            println!("{}", message.yellow());
            return Ok(MatchCheck::Found);
        }

        println!("{}", message.red());
        if self.config.assume_yes || !prompt::confirm("No matching files found, configure again?", true)? {
            println!("{}", "Cancelled.".dimmed());
            return Ok(MatchCheck::Stop);
        }
        Ok(MatchCheck::Retry)
    }

    fn configured_flags(&self, default: RegexFlags) -> Result<RegexFlags> {
        match &self.config.flags {
            Some(flags) => Ok(RegexFlags::parse(flags).map_err(RenameError::from)?),
            None => Ok(default),
        }
    }

    /// Report an invalid pattern or template so it can be entered again.
    ///
    /// Non-interactive runs fail instead.
    fn invalid_input(&self, error: PatternError) -> Result<()> {
        if self.config.assume_yes {
            return Err(RenameError::from(error).into());
        }
        print_error!("{error}");
        Ok(())
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.config.assume_yes {
            return Ok(true);
        }
        prompt::confirm(prompt, default)
    }

    fn execute(&self, batch: &Batch) -> Result<Outcome> {
        let plan = build_plan(&self.listing, &batch.request);
        if plan.is_empty() {
            print_warning!("No files to rename, check the directory, extension and pattern.");
            return Ok(Outcome::NothingToRename);
        }

        let plan = self.resolve(plan, batch)?;
        self.preview(&plan);

        if self.config.dryrun {
            println!("{}", "Dryrun: no files were renamed.".yellow());
            return Ok(Outcome::DryRun(plan.len()));
        }
        if !self.confirm("Apply the renames above?", false)? {
            println!("{}", "Cancelled.".dimmed());
            return Ok(Outcome::Cancelled);
        }

        self.committing.store(true, Ordering::SeqCst);
        let result = commit(&self.directory, &plan);
        self.committing.store(false, Ordering::SeqCst);

        let renamed = result.map_err(RenameError::from)?;
        println!("{}", format!("Renamed {renamed} file(s).").green().bold());
        Ok(Outcome::Renamed(renamed))
    }

    fn resolve(&self, plan: RenamePlan, batch: &Batch) -> Result<RenamePlan> {
        let mut found_conflicts = false;
        let mut prompt_error = None;
        // Auto-resolve is answered inside the decision so conflicts are still reported.
        let result = check_conflicts(&self.listing, plan, batch.conflict_numbering, false, |conflicts| {
            found_conflicts = true;
            report_conflicts(conflicts);
            if self.config.auto_resolve {
                return Resolution::AutoResolve(batch.conflict_numbering);
            }
            self.ask_resolution(batch).unwrap_or_else(|error| {
                prompt_error = Some(error);
                Resolution::Abort
            })
        });
        if let Some(error) = prompt_error {
            return Err(error);
        }

        let plan = result.inspect_err(|_| print_error!("Resolve the conflicts and try again."))?;
        if found_conflicts {
            println!("{}", "Added numeric suffixes to the conflicting files.".green());
        }
        Ok(plan)
    }

    fn ask_resolution(&self, batch: &Batch) -> Result<Resolution> {
        eprintln!("\n{}", "Naming conflicts detected.".red().bold());
        if !self.confirm("Append numeric suffixes to resolve the conflicts?", true)? {
            return Ok(Resolution::Abort);
        }
        if batch.ask_conflict_numbering && !self.config.assume_yes {
            println!("\n{}", "Numbering for the conflict suffixes:".bold());
            let numbering = self.ask_numbering("Conflict suffix", None, None)?;
            return Ok(Resolution::AutoResolve(numbering));
        }
        Ok(Resolution::AutoResolve(batch.conflict_numbering))
    }

    fn preview(&self, plan: &RenamePlan) {
        println!("\n{} {}", "Directory:".bold(), self.directory.display().to_string().cyan());
        println!("{}\n", format!("Rename plan ({} file(s)):", plan.len()).bold());
        for entry in plan {
            rx_rename::show_diff(&entry.source, &entry.target);
            println!();
        }
    }
}

fn report_conflicts(conflicts: &[ConflictRecord]) {
    for conflict in conflicts.iter().take(CONFLICT_EXAMPLE_LIMIT) {
        eprintln!("{} {conflict}", "Conflict:".red());
    }
    if conflicts.len() > CONFLICT_EXAMPLE_LIMIT {
        let remaining = conflicts.len() - CONFLICT_EXAMPLE_LIMIT;
        eprintln!("{}", format!("... and {remaining} more conflict(s)").dimmed());
    }
}
