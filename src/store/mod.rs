//! Persistent store adapter.
//!
//! The relational store itself lives outside this crate; jobs talk to it
//! through [`MatchStore`]. Every write is an upsert keyed by stable ids, so
//! repeating one (two jobs racing on the same match) is harmless.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::data_fetcher::models::{
    Highlight, League, LeagueId, Lineup, Match, MatchEvent, MatchId, MatchStatistics,
    MatchStatus, StageFlags, Team, TeamId,
};
use crate::error::AppError;

pub mod memory;

pub use memory::MemoryStore;

/// Enrichment stage a candidate query selects for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Matches still missing lineups.
    Lineups,
    /// Matches whose score and status need polling.
    Live,
    /// Finished matches with at least one enrichment flag unset.
    PostMatch,
}

impl Stage {
    /// Whether `record`'s flags still call for this stage.
    pub fn needs(self, record: &Match) -> bool {
        match self {
            Stage::Lineups => !record.flags.has_lineups,
            Stage::Live => true,
            Stage::PostMatch => !record.flags.is_complete(),
        }
    }
}

/// Conditions a candidate match must satisfy. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchFilter {
    pub kickoff_from: Option<DateTime<Utc>>,
    pub kickoff_to: Option<DateTime<Utc>>,
    /// Empty means any status.
    pub statuses: Vec<MatchStatus>,
    pub updated_since: Option<DateTime<Utc>>,
    /// Empty means any league.
    pub league_ids: Vec<LeagueId>,
}

impl MatchFilter {
    /// Scheduled matches kicking off between `now + min` and `now + max`, bounds included.
    pub fn lineup_window(now: DateTime<Utc>, min: Duration, max: Duration) -> Self {
        Self {
            kickoff_from: Some(now + min),
            kickoff_to: Some(now + max),
            statuses: vec![MatchStatus::Scheduled],
            ..Self::default()
        }
    }

    /// Matches upstream reports as in progress.
    pub fn live() -> Self {
        Self {
            statuses: vec![MatchStatus::Live],
            ..Self::default()
        }
    }

    /// Matches still marked scheduled although kickoff fell between `from` and `to`.
    pub fn overdue(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            kickoff_from: Some(from),
            kickoff_to: Some(to),
            statuses: vec![MatchStatus::Scheduled],
            ..Self::default()
        }
    }

    /// Finished matches whose record changed at or after `since`.
    pub fn recently_finished(since: DateTime<Utc>) -> Self {
        Self {
            statuses: vec![MatchStatus::Finished],
            updated_since: Some(since),
            ..Self::default()
        }
    }

    pub fn accepts(&self, record: &Match) -> bool {
        self.kickoff_from.is_none_or(|from| record.kickoff >= from)
            && self.kickoff_to.is_none_or(|to| record.kickoff <= to)
            && (self.statuses.is_empty() || self.statuses.contains(&record.status))
            && self.updated_since.is_none_or(|since| record.updated_at >= since)
            && (self.league_ids.is_empty() || self.league_ids.contains(&record.league_id))
    }
}

/// Which leagues to return; empty means all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeagueFilter {
    pub ids: Vec<LeagueId>,
}

impl LeagueFilter {
    pub fn accepts(&self, league: &League) -> bool {
        self.ids.is_empty() || self.ids.contains(&league.id)
    }
}

/// Typed read/upsert operations over the persisted match data.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Matches accepted by `filter` for which `stage` still has work.
    async fn find_matches_needing(
        &self,
        stage: Stage,
        filter: &MatchFilter,
    ) -> Result<Vec<Match>, AppError>;

    async fn get_match(&self, match_id: MatchId) -> Result<Option<Match>, AppError>;

    /// Inserts or updates a match. Stored flags are never cleared: the
    /// result carries the union of stored and incoming flags.
    async fn upsert_match(&self, record: &Match) -> Result<(), AppError>;

    async fn upsert_team(&self, team: &Team) -> Result<(), AppError>;

    async fn upsert_lineup(
        &self,
        match_id: MatchId,
        team_id: TeamId,
        lineup: &Lineup,
    ) -> Result<(), AppError>;

    /// Replaces the event list of a match.
    async fn upsert_events(&self, match_id: MatchId, events: &[MatchEvent]) -> Result<(), AppError>;

    async fn upsert_statistics(
        &self,
        match_id: MatchId,
        statistics: &MatchStatistics,
    ) -> Result<(), AppError>;

    async fn upsert_highlight(&self, highlight: &Highlight) -> Result<(), AppError>;

    /// Sets the given flags (union with stored ones) and optionally the processed timestamp.
    async fn mark_stages(
        &self,
        match_id: MatchId,
        flags: StageFlags,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError>;

    async fn get_leagues(&self, filter: &LeagueFilter) -> Result<Vec<League>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing_utils::TestDataBuilder;

    #[test]
    fn test_lineup_window_bounds() {
        let now = Utc::now();
        let filter = MatchFilter::lineup_window(now, Duration::minutes(50), Duration::minutes(60));

        let inside = TestDataBuilder::scheduled_match(1, now + Duration::minutes(55));
        let lower = TestDataBuilder::scheduled_match(2, now + Duration::minutes(50));
        let upper = TestDataBuilder::scheduled_match(3, now + Duration::minutes(60));
        let soon = TestDataBuilder::scheduled_match(4, now + Duration::minutes(10));
        let later = TestDataBuilder::scheduled_match(5, now + Duration::minutes(61));

        assert!(filter.accepts(&inside));
        assert!(filter.accepts(&lower));
        assert!(filter.accepts(&upper));
        assert!(!filter.accepts(&soon));
        assert!(!filter.accepts(&later));

        let mut live = inside.clone();
        live.status = MatchStatus::Live;
        assert!(!filter.accepts(&live));
    }

    #[test]
    fn test_recently_finished() {
        let now = Utc::now();
        let filter = MatchFilter::recently_finished(now - Duration::hours(6));

        let fresh = TestDataBuilder::finished_match(1, now - Duration::hours(3), now - Duration::hours(1));
        let stale = TestDataBuilder::finished_match(2, now - Duration::days(2), now - Duration::hours(7));
        let scheduled = TestDataBuilder::scheduled_match(3, now);

        assert!(filter.accepts(&fresh));
        assert!(!filter.accepts(&stale));
        assert!(!filter.accepts(&scheduled));
    }

    #[test]
    fn test_default_filter_accepts_everything() {
        let record = TestDataBuilder::live_match(1, Utc::now(), 0, 0);
        assert!(MatchFilter::default().accepts(&record));

        let filter = MatchFilter {
            league_ids: vec![140],
            ..MatchFilter::default()
        };
        assert!(!filter.accepts(&record));
    }

    #[test]
    fn test_stage_needs() {
        let mut record = TestDataBuilder::finished_match(1, Utc::now(), Utc::now());
        assert!(Stage::Lineups.needs(&record));
        assert!(Stage::PostMatch.needs(&record));
        assert!(Stage::Live.needs(&record));

        record.flags = StageFlags {
            has_lineups: true,
            has_events: true,
            has_highlights: true,
            has_statistics: true,
        };
        assert!(!Stage::Lineups.needs(&record));
        assert!(!Stage::PostMatch.needs(&record));
    }

    #[test]
    fn test_league_filter() {
        let league = TestDataBuilder::league(39, "Premier League");
        assert!(LeagueFilter::default().accepts(&league));
        assert!(LeagueFilter { ids: vec![39] }.accepts(&league));
        assert!(!LeagueFilter { ids: vec![140] }.accepts(&league));
    }
}
