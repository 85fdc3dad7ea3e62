use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use super::{JobContext, JobOutcome, day_listings, invalidate, process_matches};
use crate::data_fetcher::api::RequestDescriptor;
use crate::data_fetcher::models::Match;
use crate::data_fetcher::processors::{find_match, normalize_matches};
use crate::error::AppError;
use crate::store::{MatchFilter, Stage};

const JOB: &str = "live";

/// Re-fetches score and status of matches in progress, plus scheduled ones
/// whose kickoff already passed. Never sets stage flags.
#[instrument(skip(ctx))]
pub async fn run(ctx: &JobContext, now: DateTime<Utc>) -> Result<JobOutcome, AppError> {
    let live = ctx
        .store
        .find_matches_needing(Stage::Live, &MatchFilter::live())
        .await?;
    let overdue = ctx
        .store
        .find_matches_needing(
            Stage::Live,
            &MatchFilter::overdue(now - Duration::hours(ctx.settings.live_overdue_hours), now),
        )
        .await?;

    let candidates: Vec<Match> = live
        .into_iter()
        .chain(overdue)
        .map(|record| (record.id, record))
        .collect::<BTreeMap<_, _>>()
        .into_values()
        .collect();
    let count = candidates.len();

    let outcome = process_matches(JOB, candidates, ctx.settings.stage_concurrency, |record| async move {
        refresh(ctx, &record, now).await
    })
    .await;

    info!(
        "{}: {} candidates, {} changed, {} unchanged, {} failed",
        JOB, count, outcome.processed, outcome.skipped, outcome.failed
    );
    Ok(outcome)
}

/// True when the stored record changed.
async fn refresh(ctx: &JobContext, stored: &Match, now: DateTime<Utc>) -> Result<bool, AppError> {
    // Bypass the cache: the single-match lifetime is longer than the polling cadence
    let payload = ctx
        .client
        .request_fresh(&RequestDescriptor::match_by_id(stored.id))
        .await?;

    let Some(bundle) = find_match(normalize_matches(&payload, Some(stored.league_id), now), stored.id)
    else {
        debug!("{}: payload for match {} did not contain it", JOB, stored.id);
        return Ok(false);
    };

    if bundle.record.same_content(stored) {
        return Ok(false);
    }
    debug!(
        "{}: match {} now {:?} {:?}-{:?}",
        JOB, stored.id, bundle.record.status, bundle.record.score.home, bundle.record.score.away
    );
    ctx.store.upsert_match(&bundle.record).await?;
    let mut stale = day_listings(ctx, &bundle.record).await;
    if stored.kickoff.date_naive() != bundle.record.kickoff.date_naive() {
        stale.extend(day_listings(ctx, stored).await);
    }
    invalidate(ctx, &stale).await;
    Ok(true)
}
