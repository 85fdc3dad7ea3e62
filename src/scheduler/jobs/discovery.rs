use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{info, instrument, warn};

use super::{JobContext, JobOutcome};
use crate::data_fetcher::api::{RequestDescriptor, run_batches};
use crate::data_fetcher::models::League;
use crate::data_fetcher::processors::normalize_matches;
use crate::error::AppError;
use crate::store::LeagueFilter;

const JOB: &str = "discovery";

/// Fetches every tracked league's matches over the rolling window and
/// upserts teams, then matches. Expired cache entries are pruned afterwards.
#[instrument(skip(ctx))]
pub async fn run(ctx: &JobContext, now: DateTime<Utc>) -> Result<JobOutcome, AppError> {
    let leagues = ctx.store.get_leagues(&LeagueFilter::default()).await?;
    let today = now.date_naive();
    let days = window(
        today,
        ctx.settings.discovery_days_back,
        ctx.settings.discovery_days_ahead,
    );

    let calls: Vec<_> = leagues
        .iter()
        .flat_map(|league| days.iter().map(move |date| (league, *date)))
        .map(|(league, date)| move || discover_day(ctx, league, date, now))
        .collect();
    let report = run_batches(calls, ctx.batch.size, ctx.batch.delay()).await;

    let outcome = JobOutcome {
        processed: report.succeeded,
        skipped: report.not_found,
        failed: report.failed,
    };
    info!(
        "{}: {} leagues over {} days, {} fetched, {} empty, {} failed",
        JOB,
        leagues.len(),
        days.len(),
        outcome.processed,
        outcome.skipped,
        outcome.failed
    );

    match ctx.client.cache().prune_expired().await {
        Ok(0) => {}
        Ok(pruned) => info!("{}: pruned {} expired cache entries", JOB, pruned),
        Err(e) => warn!("{}: cache prune failed: {}", JOB, e),
    }

    Ok(outcome)
}

/// Dates from `back` days before `today` through `ahead` days after it.
fn window(today: NaiveDate, back: i64, ahead: i64) -> Vec<NaiveDate> {
    (-back.max(0)..=ahead.max(0))
        .map(|offset| today + Duration::days(offset))
        .collect()
}

/// One league on one day. A failed record write is logged and does not
/// stop the remaining records.
async fn discover_day(
    ctx: &JobContext,
    league: &League,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<usize, AppError> {
    let descriptor = RequestDescriptor::matches_by_date(league.id, date, Some(league.season));
    let payload = ctx.client.request(&descriptor).await?;

    let mut stored = 0;
    for bundle in normalize_matches(&payload, Some(league.id), now) {
        let write = async {
            ctx.store.upsert_team(&bundle.home_team).await?;
            ctx.store.upsert_team(&bundle.away_team).await?;
            ctx.store.upsert_match(&bundle.record).await
        };
        match write.await {
            Ok(()) => stored += 1,
            Err(e) => warn!("{}: storing match {} failed: {}", JOB, bundle.record.id, e),
        }
    }
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_fetcher::models::MatchStatus;
    use crate::scheduler::jobs::test_support::context;
    use crate::store::{MatchStore, MemoryStore};
    use crate::testing_utils::{HOME_TEAM_ID, LEAGUE_ID, TestDataBuilder};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_window_spans_back_and_ahead() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let days = window(today, 1, 5);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(days[6], NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(window(today, 0, 0), vec![today]);
    }

    #[tokio::test]
    async fn test_discovery_upserts_teams_and_matches() {
        let server = MockServer::start().await;
        let now = Utc::now();
        let today = now.date_naive().format("%Y-%m-%d").to_string();

        Mock::given(method("GET"))
            .and(path("/matches"))
            .and(query_param("date", today.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    TestDataBuilder::match_json(100, now + Duration::hours(3), "Not started", None),
                    TestDataBuilder::match_json(101, now - Duration::hours(1), "First half", Some("1 - 0")),
                    {"homeTeam": {"id": 1}, "awayTeam": {"id": 2}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/matches"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::with_leagues([TestDataBuilder::league(
            LEAGUE_ID,
            "Premier League",
        )]));
        let mut ctx = context(&server, Arc::clone(&store));
        ctx.settings.discovery_days_back = 1;
        ctx.settings.discovery_days_ahead = 1;

        let outcome = run(&ctx, now).await.unwrap();
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.failed, 0);

        assert_eq!(store.match_count().await, 2);
        let live = store.get_match(101).await.unwrap().unwrap();
        assert_eq!(live.status, MatchStatus::Live);
        assert_eq!(live.score.home, Some(1));
        assert_eq!(store.team(HOME_TEAM_ID).await.unwrap().name, "Liverpool");
    }

    #[tokio::test]
    async fn test_discovery_without_leagues_does_nothing() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let ctx = context(&server, store);

        let outcome = run(&ctx, Utc::now()).await.unwrap();
        assert_eq!(outcome, JobOutcome::default());
    }

    #[tokio::test]
    async fn test_failed_record_write_does_not_stop_others() {
        let server = MockServer::start().await;
        let now = Utc::now();
        Mock::given(method("GET"))
            .and(path("/matches"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                TestDataBuilder::match_json(200, now, "Not started", None),
                TestDataBuilder::match_json(201, now, "Not started", None)
            ])))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::with_leagues([TestDataBuilder::league(
            LEAGUE_ID,
            "Premier League",
        )]));
        store.fail_writes_for(200).await;
        let mut ctx = context(&server, Arc::clone(&store));
        ctx.settings.discovery_days_back = 0;
        ctx.settings.discovery_days_ahead = 0;

        let outcome = run(&ctx, now).await.unwrap();
        assert_eq!(outcome.processed, 1);
        assert!(store.get_match(200).await.unwrap().is_none());
        assert!(store.get_match(201).await.unwrap().is_some());
    }
}
