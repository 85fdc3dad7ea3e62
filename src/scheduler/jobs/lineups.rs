use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument};

use super::{JobContext, JobOutcome, persist_lineups, process_matches};
use crate::data_fetcher::models::StageFlags;
use crate::error::AppError;
use crate::store::{MatchFilter, Stage};

const JOB: &str = "lineups";

/// Fetches lineups for scheduled matches kicking off inside the lookahead
/// window and sets `has_lineups` once both teams' lineups are stored.
#[instrument(skip(ctx))]
pub async fn run(ctx: &JobContext, now: DateTime<Utc>) -> Result<JobOutcome, AppError> {
    let filter = MatchFilter::lineup_window(
        now,
        Duration::minutes(ctx.settings.lineup_window_min_minutes),
        Duration::minutes(ctx.settings.lineup_window_max_minutes),
    );
    let candidates = ctx.store.find_matches_needing(Stage::Lineups, &filter).await?;
    let count = candidates.len();

    let outcome = process_matches(JOB, candidates, ctx.settings.stage_concurrency, |record| async move {
        if !persist_lineups(ctx, &record).await? {
            return Ok(false);
        }
        ctx.store
            .mark_stages(record.id, StageFlags::lineups(), None)
            .await?;
        Ok(true)
    })
    .await;

    info!(
        "{}: {} candidates, {} completed, {} pending, {} failed",
        JOB, count, outcome.processed, outcome.skipped, outcome.failed
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::jobs::test_support::context;
    use crate::store::{MatchStore, MemoryStore};
    use crate::testing_utils::TestDataBuilder;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_only_matches_inside_window_are_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lineups/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestDataBuilder::lineups_json()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/lineups/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestDataBuilder::lineups_json()))
            .expect(0)
            .mount(&server)
            .await;

        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_match(&TestDataBuilder::scheduled_match(1, now + Duration::minutes(55)))
            .await
            .unwrap();
        store
            .upsert_match(&TestDataBuilder::scheduled_match(2, now + Duration::minutes(10)))
            .await
            .unwrap();

        let ctx = context(&server, Arc::clone(&store));
        let outcome = run(&ctx, now).await.unwrap();

        assert_eq!(outcome.processed, 1);
        assert!(store.get_match(1).await.unwrap().unwrap().flags.has_lineups);
        assert!(!store.get_match(2).await.unwrap().unwrap().flags.has_lineups);
        assert_eq!(store.lineups_for(1).await.len(), 2);
    }

    #[tokio::test]
    async fn test_not_found_leaves_flag_unset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lineups/3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_match(&TestDataBuilder::scheduled_match(3, now + Duration::minutes(52)))
            .await
            .unwrap();

        let ctx = context(&server, Arc::clone(&store));
        let outcome = run(&ctx, now).await.unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.failed, 0);
        assert!(!store.get_match(3).await.unwrap().unwrap().flags.has_lineups);
    }

    #[tokio::test]
    async fn test_matches_with_lineups_are_not_selected() {
        let server = MockServer::start().await;
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        let mut record = TestDataBuilder::scheduled_match(4, now + Duration::minutes(55));
        record.flags = StageFlags::lineups();
        store.upsert_match(&record).await.unwrap();

        let ctx = context(&server, store);
        let outcome = run(&ctx, now).await.unwrap();
        assert_eq!(outcome, JobOutcome::default());
    }
}
