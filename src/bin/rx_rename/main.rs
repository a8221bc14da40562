mod config;
mod flow;
mod prompt;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use colored::Colorize;

use rx_rename::batch_rename::{RenameError, SortKey, TEMP_MARKER};
use rx_rename::{print_error, print_warning};

use crate::config::Config;
use crate::flow::{Outcome, RenameFlow};

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Batch rename files with episode presets or custom regex patterns"
)]
pub struct Args {
    /// Directory containing the files to rename
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<PathBuf>,

    /// Renaming mode
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// File extension to process
    #[arg(short, long, value_name = "EXTENSION")]
    extension: Option<String>,

    /// Regex pattern, comma-separated list in custom mode. Empty numbers files sequentially
    #[arg(short = 'r', long, value_name = "REGEX", allow_hyphen_values = true)]
    pattern: Option<String>,

    /// Regex flags: any combination of i, m and s
    #[arg(short, long, value_name = "FLAGS")]
    flags: Option<String>,

    /// Replacement template referencing capture groups as $1, $2 ...
    #[arg(short, long, allow_hyphen_values = true)]
    template: Option<String>,

    /// Prefix for the new names
    #[arg(long, allow_hyphen_values = true)]
    prefix: Option<String>,

    /// Replace the text after the episode number with this suffix
    #[arg(long, allow_hyphen_values = true, conflicts_with = "keep_tail")]
    suffix: Option<String>,

    /// Keep the original text after the episode number
    #[arg(short, long)]
    keep_tail: bool,

    /// Replace the file extension
    #[arg(short, long, value_name = "EXTENSION")]
    new_extension: Option<String>,

    /// Start number for sequential numbering
    #[arg(short, long)]
    start: Option<u64>,

    /// Zero-pad numbers to this many digits
    #[arg(short = 'w', long, value_name = "DIGITS")]
    padding: Option<usize>,

    /// Sort order for sequential numbering
    #[arg(long, value_enum)]
    sort: Option<SortKey>,

    /// Resolve naming conflicts with numeric suffixes without asking
    #[arg(short, long)]
    auto_resolve: bool,

    /// Start number for conflict suffixes
    #[arg(long, value_name = "NUMBER")]
    conflict_start: Option<u64>,

    /// Zero-pad conflict suffixes to this many digits
    #[arg(long, value_name = "DIGITS")]
    conflict_padding: Option<usize>,

    /// Answer yes to confirmations and use defaults for optional questions
    #[arg(short, long)]
    yes: bool,

    /// Only print changes without renaming
    #[arg(short, long)]
    print: bool,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print debug information
    #[arg(short = 'd', long)]
    debug: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,
}

/// Which set of questions to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Episode presets for video files
    Movie,
    /// Sequential numbering or regex capture groups
    Custom,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        return match rx_rename::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME")) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                print_error!("{error:?}");
                ExitCode::FAILURE
            }
        };
    }

    match run(args) {
        Ok(outcome) => {
            log::info!("Finished: {outcome:?}");
            ExitCode::SUCCESS
        }
        Err(error) => exit_with_error(&error),
    }
}

fn run(args: Args) -> anyhow::Result<Outcome> {
    let directory = rx_rename::resolve_directory(args.path.as_deref()).map_err(RenameError::from)?;
    let config = Config::from_args(args)?;
    init_logging(&config);
    if config.debug {
        println!("{config}");
    }

    let committing = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(Arc::clone(&committing))?;

    println!("{}", "rxrename: batch rename".bold());
    let mut flow = RenameFlow::new(config, directory, committing)?;
    let outcome = flow.run()?;
    match outcome {
        Outcome::Renamed(count) => log::info!("Renamed {count} file(s)"),
        Outcome::DryRun(count) => log::info!("Dryrun planned {count} rename(s)"),
        Outcome::NothingToRename | Outcome::NoMatches | Outcome::Cancelled => {}
    }
    Ok(outcome)
}

fn init_logging(config: &Config) {
    let level = if config.debug {
        log::LevelFilter::Debug
    } else if config.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    // RUST_LOG still overrides the level chosen from flags.
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}

/// Ctrl+C before the commit cancels the run.
/// During the commit it is only acknowledged so the batch is not left half renamed.
fn install_interrupt_handler(committing: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        if committing.load(Ordering::SeqCst) {
            println!(
                "\n{}",
                "Received Ctrl+C, finishing the current rename batch...".yellow().bold()
            );
        } else {
            println!("\n{}", "Cancelled.".dimmed());
            std::process::exit(0);
        }
    })
    .context("Failed to set Ctrl+C handler")
}

fn exit_with_error(error: &anyhow::Error) -> ExitCode {
    if is_interrupted(error) {
        println!("\n{}", "Cancelled.".dimmed());
        return ExitCode::SUCCESS;
    }

    let Some(rename_error) = error.downcast_ref::<RenameError>() else {
        print_error!("{error:?}");
        return ExitCode::FAILURE;
    };

    match rename_error {
        RenameError::UnresolvedConflicts { count } => {
            print_error!("{count} naming conflict(s) left unresolved, nothing was renamed");
        }
        RenameError::Commit(commit_error) => {
            print_error!("{commit_error}");
            let directory = commit_error.from.parent().map(|dir| dir.display().to_string()).unwrap_or_default();
            print_warning!(
                "Renaming stopped partway. Files whose names contain '{TEMP_MARKER}' in {directory} may need to be renamed by hand."
            );
        }
        RenameError::Listing(_) | RenameError::Pattern(_) => print_error!("{rename_error}"),
    }
    ExitCode::from(rename_error.exit_code())
}

/// Prompts fail with an interrupted IO error when the user aborts them.
fn is_interrupted(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        let io_error = if let Some(dialoguer::Error::IO(io_error)) = cause.downcast_ref::<dialoguer::Error>() {
            Some(io_error)
        } else {
            cause.downcast_ref::<io::Error>()
        };
        io_error.is_some_and(|io_error| io_error.kind() == io::ErrorKind::Interrupted)
    })
}
