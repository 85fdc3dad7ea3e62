//! Read-through access to the cached upstream resources.
//!
//! Readers ask for semantic resources (a day's matches, a league table,
//! a match's lineups) and get normalized records. Whether a value came from
//! the cache or upstream, and how long it stays cached, is decided by the
//! client.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument};

use crate::config::{BatchSettings, Config, LeagueConfig};
use crate::data_fetcher::api::{ApiClient, BatchReport, RequestDescriptor, run_batches};
use crate::data_fetcher::models::{LeagueId, Lineup, MatchBundle, MatchId, Standing};
use crate::data_fetcher::processors::{normalize_lineups, normalize_matches, normalize_standings};
use crate::error::AppError;

#[derive(Clone)]
pub struct FeedService {
    client: ApiClient,
    leagues: Vec<LeagueConfig>,
    batch: BatchSettings,
}

/// Upstream "no data" reads as an empty result.
fn or_empty<T: Default>(result: Result<T, AppError>) -> Result<T, AppError> {
    match result {
        Err(e) if e.is_not_found() => Ok(T::default()),
        other => other,
    }
}

impl FeedService {
    pub fn new(client: ApiClient, config: &Config) -> Self {
        Self {
            client,
            leagues: config.leagues.clone(),
            batch: config.batch.clone(),
        }
    }

    /// Matches of every configured league on `date`, ordered by kickoff.
    #[instrument(skip(self))]
    pub async fn feed_matches(&self, date: NaiveDate) -> Result<Vec<MatchBundle>, AppError> {
        let mut bundles = Vec::new();
        for league in &self.leagues {
            bundles.extend(or_empty(self.league_matches(league, date).await)?);
        }
        bundles.sort_by(|a, b| {
            a.record
                .kickoff
                .cmp(&b.record.kickoff)
                .then(a.record.id.cmp(&b.record.id))
        });
        debug!("Feed for {} has {} matches", date, bundles.len());
        Ok(bundles)
    }

    async fn league_matches(
        &self,
        league: &LeagueConfig,
        date: NaiveDate,
    ) -> Result<Vec<MatchBundle>, AppError> {
        let descriptor = RequestDescriptor::matches_by_date(league.id, date, Some(league.season));
        let payload = self.client.request(&descriptor).await?;
        Ok(normalize_matches(&payload, Some(league.id), Utc::now()))
    }

    #[instrument(skip(self))]
    pub async fn standings(&self, league_id: LeagueId, season: i32) -> Result<Vec<Standing>, AppError> {
        or_empty(
            self.client
                .request(&RequestDescriptor::standings(league_id, season))
                .await
                .map(|payload| normalize_standings(&payload, league_id)),
        )
    }

    #[instrument(skip(self))]
    pub async fn lineups(&self, match_id: MatchId) -> Result<Vec<Lineup>, AppError> {
        or_empty(
            self.client
                .request(&RequestDescriptor::lineups(match_id))
                .await
                .map(|payload| normalize_lineups(&payload, match_id)),
        )
    }

    /// Populates the cache with `date`'s matches for every configured league,
    /// in batches so the upstream rate limit is respected.
    pub async fn warm_feed(&self, date: NaiveDate) -> BatchReport {
        let calls: Vec<_> = self
            .leagues
            .iter()
            .map(|league| move || self.league_matches(league, date))
            .collect();
        let report = run_batches(calls, self.batch.size, self.batch.delay()).await;
        info!(
            "Warmed feed for {}: {} of {} leagues cached",
            date,
            report.succeeded,
            report.total()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrySettings;
    use crate::data_fetcher::cache::{CacheStore, MemoryCacheStore};
    use crate::testing_utils::{LEAGUE_ID, TestDataBuilder};
    use chrono::Duration;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed_for(server: &MockServer, leagues: Vec<LeagueConfig>) -> (FeedService, Arc<dyn CacheStore>) {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(32));
        let client = ApiClient::with_http_client(
            reqwest::Client::new(),
            server.uri(),
            RetrySettings {
                max_attempts: 1,
                base_delay_ms: 1,
                rate_limit_multiplier: 1,
                max_delay_seconds: 1,
            },
            Arc::clone(&cache),
        );
        let config = Config {
            leagues,
            batch: BatchSettings {
                size: 2,
                delay_ms: 0,
            },
            ..Config::default()
        };
        (FeedService::new(client, &config), cache)
    }

    fn league(id: LeagueId) -> LeagueConfig {
        LeagueConfig {
            id,
            name: format!("League {id}"),
            season: 2024,
        }
    }

    #[tokio::test]
    async fn test_feed_reads_through_cache() {
        let server = MockServer::start().await;
        let kickoff = Utc::now();
        Mock::given(method("GET"))
            .and(path("/matches"))
            .and(query_param("leagueId", LEAGUE_ID.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                TestDataBuilder::match_json(2, kickoff + Duration::hours(2), "Not started", None),
                TestDataBuilder::match_json(1, kickoff, "Not started", None)
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/matches"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (feed, cache) = feed_for(&server, vec![league(LEAGUE_ID), league(140)]);
        let date = kickoff.date_naive();

        let first = feed.feed_matches(date).await.unwrap();
        let ids: Vec<i64> = first.iter().map(|b| b.record.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let second = feed.feed_matches(date).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.stats().await.unwrap().valid, 1);
    }

    #[tokio::test]
    async fn test_standings_and_lineups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/standings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestDataBuilder::standings_json()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/lineups/4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (feed, _) = feed_for(&server, Vec::new());
        let table = feed.standings(LEAGUE_ID, 2024).await.unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].position, 1);

        assert!(feed.lineups(4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_warm_feed_counts_per_league() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/matches"))
            .and(query_param("leagueId", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/matches"))
            .and(query_param("leagueId", "2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/matches"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (feed, _) = feed_for(&server, vec![league(1), league(2), league(3)]);
        let report = feed.warm_feed(Utc::now().date_naive()).await;
        assert_eq!(
            report,
            BatchReport {
                succeeded: 1,
                not_found: 1,
                failed: 1
            }
        );
    }
}
