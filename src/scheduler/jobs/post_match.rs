use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use tracing::{debug, info, instrument, warn};

use super::{JobContext, JobOutcome, persist_lineups, process_matches};
use crate::data_fetcher::api::RequestDescriptor;
use crate::data_fetcher::models::{Match, StageFlags};
use crate::data_fetcher::processors::{
    normalize_events, normalize_highlights, normalize_statistics,
};
use crate::error::AppError;
use crate::store::{MatchFilter, Stage};

const JOB: &str = "post-match";

/// Backfills events, statistics, highlights and missing lineups of
/// recently finished matches.
///
/// Stages run in that order and independently: a failed or empty stage
/// leaves its flag unset without blocking the rest. After all stages were
/// attempted the match gets the flags of the stages that stored data and a
/// processed timestamp.
#[instrument(skip(ctx))]
pub async fn run(ctx: &JobContext, now: DateTime<Utc>) -> Result<JobOutcome, AppError> {
    let since = now - Duration::hours(ctx.settings.post_match_lookback_hours);
    let candidates = ctx
        .store
        .find_matches_needing(Stage::PostMatch, &MatchFilter::recently_finished(since))
        .await?;
    let count = candidates.len();

    let outcome = process_matches(JOB, candidates, ctx.settings.stage_concurrency, |record| async move {
        backfill(ctx, &record, now).await
    })
    .await;

    info!(
        "{}: {} candidates, {} enriched, {} unchanged, {} failed",
        JOB, count, outcome.processed, outcome.skipped, outcome.failed
    );
    Ok(outcome)
}

/// True when at least one new flag was set.
async fn backfill(ctx: &JobContext, record: &Match, now: DateTime<Utc>) -> Result<bool, AppError> {
    let stored = record.flags;
    let mut flags = StageFlags::default();

    if !stored.has_events {
        flags.has_events = attempt(record, "events", store_events(ctx, record)).await;
    }
    if !stored.has_statistics {
        flags.has_statistics = attempt(record, "statistics", store_statistics(ctx, record)).await;
    }
    if !stored.has_highlights {
        flags.has_highlights = attempt(record, "highlights", store_highlights(ctx, record)).await;
    }
    if !stored.has_lineups {
        flags.has_lineups = attempt(record, "lineups", persist_lineups(ctx, record)).await;
    }

    ctx.store.mark_stages(record.id, flags, Some(now)).await?;
    Ok(flags != StageFlags::default())
}

/// Awaits one stage; failures are logged and read as "no data stored".
async fn attempt(
    record: &Match,
    stage: &str,
    work: impl Future<Output = Result<bool, AppError>>,
) -> bool {
    match work.await {
        Ok(stored) => {
            if !stored {
                debug!("{}: match {} has no {} yet", JOB, record.id, stage);
            }
            stored
        }
        Err(e) if e.is_not_found() => {
            debug!("{}: no {} upstream for match {}", JOB, stage, record.id);
            false
        }
        Err(e) => {
            warn!("{}: {} for match {} failed: {}", JOB, stage, record.id, e);
            false
        }
    }
}

async fn store_events(ctx: &JobContext, record: &Match) -> Result<bool, AppError> {
    let payload = ctx.client.request(&RequestDescriptor::events(record.id)).await?;
    let events = normalize_events(&payload, record.id);
    if events.is_empty() {
        return Ok(false);
    }
    ctx.store.upsert_events(record.id, &events).await?;
    Ok(true)
}

async fn store_statistics(ctx: &JobContext, record: &Match) -> Result<bool, AppError> {
    let payload = ctx
        .client
        .request(&RequestDescriptor::statistics(record.id))
        .await?;
    let statistics = normalize_statistics(&payload, record.id);
    if statistics.is_empty() {
        return Ok(false);
    }
    ctx.store.upsert_statistics(record.id, &statistics).await?;
    Ok(true)
}

async fn store_highlights(ctx: &JobContext, record: &Match) -> Result<bool, AppError> {
    let payload = ctx
        .client
        .request(&RequestDescriptor::highlights(record.id))
        .await?;
    let highlights = normalize_highlights(&payload, record.id);
    for highlight in &highlights {
        ctx.store.upsert_highlight(highlight).await?;
    }
    Ok(!highlights.is_empty())
}
