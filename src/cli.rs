use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, ValueEnum};

use matchday_sync::scheduler::JobKind;

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}

/// Job selectable with `--job`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobArg {
    Discovery,
    Lineups,
    Live,
    PostMatch,
}

impl From<JobArg> for JobKind {
    fn from(arg: JobArg) -> Self {
        match arg {
            JobArg::Discovery => JobKind::Discovery,
            JobArg::Lineups => JobKind::Lineups,
            JobArg::Live => JobKind::Live,
            JobArg::PostMatch => JobKind::PostMatch,
        }
    }
}

/// Determines if the process should do one thing and exit instead of
/// running the scheduler until interrupted.
pub fn is_one_shot(args: &Args) -> bool {
    args.once || args.job.is_some() || args.warm.is_some() || args.clear_cache || args.list_config
}

/// Football match data synchronizer
///
/// Keeps a local store of matches, lineups, events, statistics and
/// highlights in sync with an upstream football API, caching every
/// response with a freshness window suited to its data type.
///
/// Without a one-shot option the scheduler runs until Ctrl-C:
/// - discovery twice a day, fetching each tracked league's upcoming matches
/// - lineups every few minutes for matches about to kick off
/// - live scores every minute
/// - post-match backfill of events, statistics and highlights
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(styles = get_styles())]
pub struct Args {
    /// Path to a config file. Defaults to the platform config directory.
    #[arg(long = "config", value_name = "PATH", help_heading = "Configuration")]
    pub config: Option<String>,

    /// List current configuration settings
    #[arg(long = "list-config", short = 'l', help_heading = "Configuration")]
    pub list_config: bool,

    /// Run every job once in dependency order, print the status report as JSON and exit.
    #[arg(short, long, help_heading = "One-shot")]
    pub once: bool,

    /// Run a single job once and exit.
    #[arg(long, value_enum, value_name = "JOB", help_heading = "One-shot")]
    pub job: Option<JobArg>,

    /// Warm the cached match feed of every tracked league for a date in YYYY-MM-DD format.
    #[arg(long, value_name = "DATE", help_heading = "One-shot")]
    pub warm: Option<String>,

    /// Empty the response cache and exit.
    #[arg(long = "clear-cache", help_heading = "One-shot")]
    pub clear_cache: bool,

    /// Enable debug logging, also written to the terminal.
    #[arg(long = "debug", help_heading = "Debug")]
    pub debug: bool,

    /// Specify a custom log file path. If not provided, logs will be written to the default location.
    #[arg(long = "log-file", help_heading = "Debug")]
    pub log_file: Option<String>,
}
