mod cli;
mod logging;

use chrono::NaiveDate;
use clap::Parser;
use cli::Args;
use matchday_sync::config::Config;
use matchday_sync::data_fetcher::models::League;
use matchday_sync::data_fetcher::{ApiClient, CacheStore, FileCacheStore};
use matchday_sync::error::AppError;
use matchday_sync::feed::FeedService;
use matchday_sync::scheduler::{JobContext, JobKind, Scheduler};
use matchday_sync::store::MemoryStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // Read config before logging so a configured log path is honoured
    let loaded = Config::read(args.config.as_deref()).await;
    let (log_file_path, _guard) = logging::setup_logging(&args, loaded.as_ref().ok()).await?;
    info!("Logs are being written to: {log_file_path}");

    let config = loaded.inspect_err(|e| error!("Failed to read configuration: {e}"))?;

    if args.list_config {
        config.display();
        return Ok(());
    }

    let cache: Arc<dyn CacheStore> = Arc::new(FileCacheStore::new(config.cache_path()));
    if args.clear_cache {
        cache.clear().await?;
        println!("Cache cleared: {}", config.cache_path());
        return Ok(());
    }

    config
        .validate()
        .inspect_err(|e| error!("Invalid configuration: {e}"))?;
    let client = ApiClient::new(&config, Arc::clone(&cache))?;

    if let Some(date) = &args.warm {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
            AppError::datetime_parse_error(format!("Invalid date '{date}', expected YYYY-MM-DD: {e}"))
        })?;
        let report = FeedService::new(client, &config).warm_feed(date).await;
        return print_json(&report);
    }

    // The relational store is external; in-process records start from the tracked leagues
    let store = Arc::new(MemoryStore::with_leagues(config.leagues.iter().map(League::from)));
    let scheduler = Scheduler::new(JobContext::new(client, store, &config));

    if let Some(job) = args.job {
        let kind = JobKind::from(job);
        if scheduler.run_job_once(kind).await?.is_none() {
            info!("{} was already running", kind.name());
        }
        return print_json(&scheduler.report().await);
    }

    if args.once {
        return print_json(&scheduler.run_all_once().await);
    }

    if config.leagues.is_empty() {
        return Err(AppError::config_error(
            "No leagues configured; add at least one [[leagues]] entry",
        ));
    }

    scheduler.start();
    info!(
        "Synchronizing {} leagues, press Ctrl-C to stop",
        config.leagues.len()
    );
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    scheduler.stop().await;

    Ok(())
}
