//! The four lifecycle jobs.
//!
//! Each job is a plain async function over a [`JobContext`]. Per-match and
//! per-league failures are logged and counted in the [`JobOutcome`]; only a
//! failure to set the run up (the candidate query itself) is returned as an
//! error.

use futures::{FutureExt, StreamExt, stream};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{BatchSettings, Config, SchedulerSettings};
use crate::data_fetcher::api::{ApiClient, RequestDescriptor};
use crate::data_fetcher::models::{Match, MatchId};
use crate::data_fetcher::processors::normalize_lineups;
use crate::error::AppError;
use crate::store::{LeagueFilter, MatchStore};

pub mod discovery;
pub mod lineups;
pub mod live;
pub mod post_match;

/// Everything a job run needs. Cheap to clone.
#[derive(Clone)]
pub struct JobContext {
    pub client: ApiClient,
    pub store: Arc<dyn MatchStore>,
    pub settings: SchedulerSettings,
    pub batch: BatchSettings,
}

impl JobContext {
    pub fn new(client: ApiClient, store: Arc<dyn MatchStore>, config: &Config) -> Self {
        Self {
            client,
            store,
            settings: config.scheduler.clone(),
            batch: config.batch.clone(),
        }
    }
}

/// Per-run counts. `skipped` covers records that needed no write or for
/// which upstream had no data yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl JobOutcome {
    fn record(&mut self, job: &str, subject: &str, result: Result<bool, AppError>) {
        match result {
            Ok(true) => self.processed += 1,
            Ok(false) => self.skipped += 1,
            Err(e) if e.is_not_found() => {
                debug!("{}: no upstream data yet for {}", job, subject);
                self.skipped += 1;
            }
            Err(e) => {
                warn!("{}: {} failed: {}", job, subject, e);
                self.failed += 1;
            }
        }
    }
}

/// Runs `work` for every match with at most `concurrency` in flight.
///
/// `work` returns `Ok(true)` when something was persisted and `Ok(false)`
/// when there was nothing to do.
async fn process_matches<F, Fut>(
    job: &str,
    matches: Vec<Match>,
    concurrency: usize,
    work: F,
) -> JobOutcome
where
    F: Fn(Match) -> Fut,
    Fut: Future<Output = Result<bool, AppError>>,
{
    let results: Vec<(MatchId, Result<bool, AppError>)> = stream::iter(matches.into_iter().map(|record| {
        let id = record.id;
        work(record).map(move |result| (id, result))
    }))
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

    let mut outcome = JobOutcome::default();
    for (id, result) in results {
        outcome.record(job, &format!("match {id}"), result);
    }
    outcome
}

/// Fetches and stores the lineups of `record`. True only when lineups of
/// both teams were persisted.
async fn persist_lineups(ctx: &JobContext, record: &Match) -> Result<bool, AppError> {
    let payload = ctx
        .client
        .request(&RequestDescriptor::lineups(record.id))
        .await?;

    // Stored or incomplete, the feed and the next attempt must not reuse this payload
    invalidate(ctx, &[RequestDescriptor::lineups(record.id)]).await;

    let mut home = false;
    let mut away = false;
    for lineup in normalize_lineups(&payload, record.id) {
        if lineup.is_empty() || !record.involves_team(lineup.team_id) {
            continue;
        }
        ctx.store
            .upsert_lineup(record.id, lineup.team_id, &lineup)
            .await?;
        home |= lineup.team_id == record.home_team_id;
        away |= lineup.team_id == record.away_team_id;
    }

    if !(home && away) {
        debug!("Lineups for match {} are incomplete", record.id);
    }
    Ok(home && away)
}

/// Drops cached read payloads so the next read goes upstream.
async fn invalidate(ctx: &JobContext, descriptors: &[RequestDescriptor]) {
    for descriptor in descriptors {
        let key = descriptor.fingerprint();
        match ctx.client.cache().remove(&key).await {
            Ok(true) => debug!("Invalidated cached {}", key),
            Ok(false) => {}
            Err(e) => warn!("Failed to invalidate cached {}: {}", key, e),
        }
    }
}

/// Day listings that contain `record`, keyed by its own season and by the
/// season of its tracked league.
async fn day_listings(ctx: &JobContext, record: &Match) -> Vec<RequestDescriptor> {
    let mut seasons = vec![record.season];
    let filter = LeagueFilter {
        ids: vec![record.league_id],
    };
    match ctx.store.get_leagues(&filter).await {
        Ok(leagues) => seasons.extend(leagues.into_iter().map(|league| Some(league.season))),
        Err(e) => warn!("Could not read league {}: {}", record.league_id, e),
    }
    seasons.sort_unstable();
    seasons.dedup();

    let date = record.kickoff.date_naive();
    seasons
        .into_iter()
        .map(|season| RequestDescriptor::matches_by_date(record.league_id, date, season))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::context;
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing_utils::{AWAY_TEAM_ID, HOME_TEAM_ID, TestDataBuilder};
    use chrono::Utc;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_persist_lineups_requires_both_teams() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lineups/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestDataBuilder::lineups_json()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/lineups/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "homeTeam": {"id": HOME_TEAM_ID, "initialLineup": [[{"name": "Alisson"}]]},
                "awayTeam": {"id": AWAY_TEAM_ID, "initialLineup": []}
            })))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let ctx = context(&server, Arc::clone(&store));

        let full = TestDataBuilder::scheduled_match(1, Utc::now());
        assert!(persist_lineups(&ctx, &full).await.unwrap());
        assert_eq!(store.lineups_for(1).await.len(), 2);

        let partial = TestDataBuilder::scheduled_match(2, Utc::now());
        assert!(!persist_lineups(&ctx, &partial).await.unwrap());
        assert_eq!(store.lineups_for(2).await.len(), 1);
    }

    #[tokio::test]
    async fn test_persisted_lineups_are_not_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lineups/6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestDataBuilder::lineups_json()))
            .expect(2)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let ctx = context(&server, Arc::clone(&store));
        let record = TestDataBuilder::scheduled_match(6, Utc::now());

        assert!(persist_lineups(&ctx, &record).await.unwrap());
        let key = RequestDescriptor::lineups(6).fingerprint();
        assert!(ctx.client.cache().get(&key).await.is_none());

        // The next read reflects upstream, not the payload that was just stored
        assert!(persist_lineups(&ctx, &record).await.unwrap());
    }

    #[tokio::test]
    async fn test_day_listings_cover_record_and_league_seasons() {
        use crate::testing_utils::LEAGUE_ID;

        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::with_leagues([TestDataBuilder::league(
            LEAGUE_ID,
            "Premier League",
        )]));
        let ctx = context(&server, store);

        let mut record = TestDataBuilder::scheduled_match(7, Utc::now());
        record.season = None;
        let keys: Vec<String> = day_listings(&ctx, &record)
            .await
            .iter()
            .map(RequestDescriptor::fingerprint)
            .collect();

        let date = record.kickoff.date_naive();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&RequestDescriptor::matches_by_date(LEAGUE_ID, date, None).fingerprint()));
        assert!(
            keys.contains(&RequestDescriptor::matches_by_date(LEAGUE_ID, date, Some(2024)).fingerprint())
        );
    }

    #[tokio::test]
    async fn test_process_matches_tallies_results() {
        let matches: Vec<Match> = (1..=4)
            .map(|id| TestDataBuilder::scheduled_match(id, Utc::now()))
            .collect();

        let outcome = process_matches("test", matches, 2, |record| async move {
            match record.id {
                1 => Ok(true),
                2 => Ok(false),
                3 => Err(AppError::api_not_found("/x")),
                _ => Err(AppError::persistence("match", "down")),
            }
        })
        .await;

        assert_eq!(
            outcome,
            JobOutcome {
                processed: 1,
                skipped: 2,
                failed: 1
            }
        );
    }
}
