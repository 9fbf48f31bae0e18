mod ai;
mod api;
mod cli;
mod config;
mod error;
mod metrics;
mod model;
mod orchestrator;
mod render;
mod summary;

#[cfg(test)]
mod test_support;

use ai::{CachedSummarizer, ClaudeClient, SummaryCache};
use anyhow::{Context, Result};
use api::github::GitHubClient;
use api::jira::JiraClient;
use api::linear::LinearClient;
use api::pagerduty::PagerDutyClient;
use api::slack::SlackWebhook;
use api::{ProjectManagementApi, TextSummarizer};
use clap::Parser;
use cli::{Cli, Commands, Format, MetricsArgs, SummaryArgs};
use config::{Config, ProjectManagementConfig};
use indicatif::{ProgressBar, ProgressStyle};
use model::ReportWindow;
use orchestrator::Orchestrator;
use render::SlackMarkup;
use std::sync::Arc;
use std::time::Duration;
use summary::Services;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Summary(ref args)) => run_summary(&cli, args).await,
        Some(Commands::Metrics(ref args)) => run_metrics(&cli, args).await,
        Some(ref command) => handle_command(&cli, command),
        None => run_summary(&cli, &SummaryArgs::default()).await,
    }
}

/// Logs go to stderr; RUST_LOG wins over -v
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("eng_digest={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = match cli.config {
        Some(ref path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let mut config = Config::load_from(&path).with_context(|| {
        format!(
            "could not load {} (run `eng-digest init` to create one)",
            path.display()
        )
    })?;

    if cli.no_cache {
        config.cache_enabled = false;
    }
    Ok(config)
}

fn build_services(config: &Config) -> Result<Services> {
    let pm_token = config.project_management_token()?;
    let pm: Arc<dyn ProjectManagementApi> = match config.project_management {
        ProjectManagementConfig::Jira {
            ref base_url,
            ref email,
            ..
        } => Arc::new(JiraClient::new(base_url.clone(), email.clone(), pm_token)?),
        ProjectManagementConfig::Linear { .. } => Arc::new(LinearClient::new(pm_token)?),
    };

    let github = Arc::new(GitHubClient::new(config.github_token())?);

    let mut claude_client = ClaudeClient::new(config.claude_api_key()?)?;
    if let Some(ref model) = config.claude_model {
        claude_client = claude_client.with_model(model.clone());
    }
    if let Some(max_tokens) = config.claude_max_tokens {
        claude_client = claude_client.with_max_tokens(max_tokens);
    }
    let claude: Arc<dyn TextSummarizer> = Arc::new(claude_client);
    let summarizer: Arc<dyn TextSummarizer> = if config.cache_enabled {
        let cache = SummaryCache::from_config(config).context("could not open rollup cache")?;
        match cache.cleanup_expired() {
            Ok(removed) if removed > 0 => info!(removed, "dropped expired rollups"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "rollup cache cleanup failed"),
        }
        Arc::new(CachedSummarizer::new(claude, cache))
    } else {
        claude
    };

    Ok(Services::new(pm, github, summarizer, config.github_orgs.clone()))
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

async fn run_summary(cli: &Cli, args: &SummaryArgs) -> Result<()> {
    let config = load_config(cli)?;
    let services = build_services(&config)?;

    let mut orchestrator = Orchestrator::new(services);
    if let Some((token, service_ids)) = config.pagerduty_settings() {
        orchestrator =
            orchestrator.with_pager_duty(Arc::new(PagerDutyClient::new(token)?), service_ids);
    }

    let days = args.days.unwrap_or(config.default_timespan_days);
    let window = ReportWindow::days_back(days);
    let include_misc = config.include_misc && !args.no_misc;
    info!(
        projects = config.projects.len(),
        days, include_misc, "building summary"
    );

    let progress = spinner("Collecting issues, pull requests and rollups...");
    let result = orchestrator
        .create_summary(
            &config.projects,
            &config.users,
            &config.misc_users(),
            &config.summary_name,
            window,
            include_misc,
        )
        .await;
    progress.finish_and_clear();
    let summary = result.context("summary run failed")?;

    let markup = match args.format {
        Format::Terse => summary.to_terse_slack_markup(),
        Format::Full => summary.to_slack_markup(),
        Format::Verbose => summary.to_verbose_slack_markdown(),
    };

    emit(&config, &markup, args.output.as_deref(), args.publish).await
}

async fn run_metrics(cli: &Cli, args: &MetricsArgs) -> Result<()> {
    let config = load_config(cli)?;
    let services = build_services(&config)?;

    let days = args.days.unwrap_or(config.default_timespan_days);
    let window = ReportWindow::days_back(days);

    let progress = spinner("Counting resolved issues and merged pull requests...");
    let result = metrics::collect_user_metrics(&services, &config.users, window).await;
    progress.finish_and_clear();
    let user_metrics = result.context("metrics run failed")?;

    let title = format!("{} metrics", config.summary_name);
    let markup = metrics::to_slack_markup(&title, &window, &user_metrics);

    emit(&config, &markup, None, args.publish).await
}

/// Write markup to a file or stdout, then optionally post it to Slack
async fn emit(
    config: &Config,
    markup: &str,
    output: Option<&std::path::Path>,
    publish: bool,
) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, markup)
                .with_context(|| format!("could not write {}", path.display()))?;
            eprintln!("✓ Wrote summary to {}", path.display());
        }
        None => println!("{}", markup),
    }

    if publish {
        let url = config
            .slack_webhook_url()
            .context("--publish needs slack_webhook_url (or SLACK_WEBHOOK_URL)")?;
        SlackWebhook::new(url)?
            .publish(markup)
            .await
            .context("could not publish to Slack")?;
        eprintln!("✓ Published to Slack");
    }

    Ok(())
}

fn handle_command(cli: &Cli, command: &Commands) -> Result<()> {
    match command {
        Commands::Init { force } => {
            let config_path = match cli.config {
                Some(ref path) => path.clone(),
                None => Config::default_config_path()?,
            };

            if config_path.exists() && !force {
                eprintln!("Config file already exists at: {}", config_path.display());
                eprintln!("Use --force to overwrite");
                std::process::exit(1);
            }

            Config::create_default_at(&config_path)?;
            println!("✓ Created config file at: {}", config_path.display());
            println!("\nNext steps:");
            println!("  1. Add [[projects]] and [[users]] entries");
            println!("  2. Set ANTHROPIC_AUTH_TOKEN and JIRA_API_TOKEN (or LINEAR_API_KEY)");
            println!("  3. Optionally set GITHUB_TOKEN, PAGERDUTY_TOKEN and SLACK_WEBHOOK_URL");
        }
        Commands::Config => {
            let config = load_config(cli)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("Current configuration:\n");
            println!("{}", toml_str);
        }
        Commands::ClearCache => {
            let cache_dir = Config::default_cache_dir()?;
            if !cache_dir.exists() {
                println!("Cache directory does not exist");
            } else {
                let cache = SummaryCache::new(&cache_dir, 1)
                    .context("could not open rollup cache")?;
                let removed = cache.clear()?;
                println!("✓ Cleared {} cached rollups from {}", removed, cache_dir.display());
            }
        }
        Commands::CacheStats => {
            let cache_dir = Config::default_cache_dir()?;
            if !cache_dir.exists() {
                println!("Cache directory does not exist");
            } else {
                println!("Cache directory: {}", cache_dir.display());

                match SummaryCache::new(&cache_dir, 1) {
                    Ok(cache) => {
                        let stats = cache.stats();
                        println!("Total entries: {}", stats.total_entries);
                        println!("Database size: {}", stats.format_size());
                    }
                    Err(e) => println!("Could not open cache database: {}", e),
                }
            }
        }
        Commands::Summary(_) | Commands::Metrics(_) => {}
    }
    Ok(())
}
