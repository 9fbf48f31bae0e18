use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "eng-digest")]
#[command(author, version, long_about = None)]
#[command(
    about = "Multi-project engineering summaries for Slack",
    long_about = "eng-digest pulls issues from Jira or Linear, merged pull requests from GitHub \
                  and incidents from PagerDuty, rolls completed work up with Claude and renders \
                  one Slack-ready report per configured project."
)]
pub struct Cli {
    /// Path to config file (default: ~/.config/eng-digest/config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Disable the rollup cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommands (default: summary)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the multi-project summary
    Summary(SummaryArgs),

    /// Per-user resolved issue and merged PR counts
    Metrics(MetricsArgs),

    /// Initialize configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Config,

    /// Clear the cache
    ClearCache,

    /// Show cache statistics
    CacheStats,
}

/// How much detail each project gets
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// Title and progress bar only
    Terse,
    /// Title, progress, rollup, links and completed milestones
    #[default]
    Full,
    /// Full plus one block per open milestone
    Verbose,
}

#[derive(Args, Debug, Default)]
pub struct SummaryArgs {
    /// Number of days to look back (default: from config)
    #[arg(short, long, value_name = "DAYS")]
    pub days: Option<u32>,

    /// Output detail
    #[arg(short, long, value_enum, default_value_t = Format::Full)]
    pub format: Format,

    /// Skip the Misc project
    #[arg(long)]
    pub no_misc: bool,

    /// Write the rendered summary to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Post the rendered summary to the configured Slack webhook
    #[arg(long)]
    pub publish: bool,
}

#[derive(Args, Debug, Default)]
pub struct MetricsArgs {
    /// Number of days to look back (default: from config)
    #[arg(short, long, value_name = "DAYS")]
    pub days: Option<u32>,

    /// Post the metrics to the configured Slack webhook
    #[arg(long)]
    pub publish: bool,
}

impl Cli {
    /// Validate CLI arguments
    pub fn validate(&self) -> Result<(), String> {
        let days = match self.command {
            Some(Commands::Summary(ref args)) => args.days,
            Some(Commands::Metrics(ref args)) => args.days,
            _ => None,
        };

        if days == Some(0) {
            return Err("--days must be greater than 0".to_string());
        }

        Ok(())
    }
}
