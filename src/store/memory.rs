use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::{LeagueFilter, MatchFilter, MatchStore, Stage};
use crate::data_fetcher::models::{
    Highlight, League, Lineup, Match, MatchEvent, MatchId, MatchStatistics, StageFlags, Team,
    TeamId,
};
use crate::error::AppError;

#[derive(Debug, Default)]
struct Tables {
    leagues: BTreeMap<i64, League>,
    teams: HashMap<TeamId, Team>,
    matches: BTreeMap<MatchId, Match>,
    lineups: HashMap<(MatchId, TeamId), Lineup>,
    events: HashMap<MatchId, Vec<MatchEvent>>,
    statistics: HashMap<MatchId, MatchStatistics>,
    highlights: BTreeMap<i64, Highlight>,
}

/// In-process [`MatchStore`] used by the binary when no external store is
/// wired in, and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing: RwLock<HashSet<MatchId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_leagues(leagues: impl IntoIterator<Item = League>) -> Self {
        let tables = Tables {
            leagues: leagues.into_iter().map(|l| (l.id, l)).collect(),
            ..Tables::default()
        };
        Self {
            tables: RwLock::new(tables),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Makes every write touching `match_id` fail with a persistence error.
    pub async fn fail_writes_for(&self, match_id: MatchId) {
        self.failing.write().await.insert(match_id);
    }

    async fn check_writable(&self, match_id: MatchId) -> Result<(), AppError> {
        if self.failing.read().await.contains(&match_id) {
            return Err(AppError::persistence(
                format!("match {match_id}"),
                "write rejected by store",
            ));
        }
        Ok(())
    }

    pub async fn match_count(&self) -> usize {
        self.tables.read().await.matches.len()
    }

    pub async fn team(&self, team_id: TeamId) -> Option<Team> {
        self.tables.read().await.teams.get(&team_id).cloned()
    }

    /// Lineups of a match ordered by team id.
    pub async fn lineups_for(&self, match_id: MatchId) -> Vec<Lineup> {
        let tables = self.tables.read().await;
        let mut lineups: Vec<Lineup> = tables
            .lineups
            .iter()
            .filter(|((m, _), _)| *m == match_id)
            .map(|(_, lineup)| lineup.clone())
            .collect();
        lineups.sort_by_key(|l| l.team_id);
        lineups
    }

    pub async fn events_for(&self, match_id: MatchId) -> Vec<MatchEvent> {
        self.tables
            .read()
            .await
            .events
            .get(&match_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn statistics_for(&self, match_id: MatchId) -> Option<MatchStatistics> {
        self.tables.read().await.statistics.get(&match_id).cloned()
    }

    pub async fn highlights_for(&self, match_id: MatchId) -> Vec<Highlight> {
        self.tables
            .read()
            .await
            .highlights
            .values()
            .filter(|h| h.match_id == match_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn find_matches_needing(
        &self,
        stage: Stage,
        filter: &MatchFilter,
    ) -> Result<Vec<Match>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .matches
            .values()
            .filter(|m| filter.accepts(m) && stage.needs(m))
            .cloned()
            .collect())
    }

    async fn get_match(&self, match_id: MatchId) -> Result<Option<Match>, AppError> {
        Ok(self.tables.read().await.matches.get(&match_id).cloned())
    }

    #[instrument(skip(self, record), fields(match_id = record.id))]
    async fn upsert_match(&self, record: &Match) -> Result<(), AppError> {
        self.check_writable(record.id).await?;
        let mut tables = self.tables.write().await;
        let merged = match tables.matches.get(&record.id) {
            Some(stored) => Match {
                flags: stored.flags.merge(record.flags),
                processed_at: record.processed_at.or(stored.processed_at),
                // Unchanged content keeps the time it last changed
                updated_at: if stored.same_content(record) {
                    stored.updated_at
                } else {
                    record.updated_at
                },
                ..record.clone()
            },
            None => record.clone(),
        };
        debug!("Upserting match {} ({:?})", merged.id, merged.status);
        tables.matches.insert(record.id, merged);
        Ok(())
    }

    async fn upsert_team(&self, team: &Team) -> Result<(), AppError> {
        self.tables.write().await.teams.insert(team.id, team.clone());
        Ok(())
    }

    async fn upsert_lineup(
        &self,
        match_id: MatchId,
        team_id: TeamId,
        lineup: &Lineup,
    ) -> Result<(), AppError> {
        self.check_writable(match_id).await?;
        self.tables
            .write()
            .await
            .lineups
            .insert((match_id, team_id), lineup.clone());
        Ok(())
    }

    async fn upsert_events(&self, match_id: MatchId, events: &[MatchEvent]) -> Result<(), AppError> {
        self.check_writable(match_id).await?;
        self.tables
            .write()
            .await
            .events
            .insert(match_id, events.to_vec());
        Ok(())
    }

    async fn upsert_statistics(
        &self,
        match_id: MatchId,
        statistics: &MatchStatistics,
    ) -> Result<(), AppError> {
        self.check_writable(match_id).await?;
        self.tables
            .write()
            .await
            .statistics
            .insert(match_id, statistics.clone());
        Ok(())
    }

    async fn upsert_highlight(&self, highlight: &Highlight) -> Result<(), AppError> {
        self.check_writable(highlight.match_id).await?;
        self.tables
            .write()
            .await
            .highlights
            .insert(highlight.id, highlight.clone());
        Ok(())
    }

    async fn mark_stages(
        &self,
        match_id: MatchId,
        flags: StageFlags,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        self.check_writable(match_id).await?;
        let mut tables = self.tables.write().await;
        let record = tables.matches.get_mut(&match_id).ok_or_else(|| {
            AppError::persistence(format!("match {match_id}"), "no such match")
        })?;
        record.flags = record.flags.merge(flags);
        if processed_at.is_some() {
            record.processed_at = processed_at;
        }
        Ok(())
    }

    async fn get_leagues(&self, filter: &LeagueFilter) -> Result<Vec<League>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .leagues
            .values()
            .filter(|l| filter.accepts(l))
            .cloned()
            .collect())
    }
}
