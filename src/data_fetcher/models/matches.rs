use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub type MatchId = i64;
pub type TeamId = i64;
pub type LeagueId = i64;

/// Normalized match status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
    Postponed,
    Cancelled,
}

impl MatchStatus {
    /// Maps an upstream state description onto a status.
    ///
    /// Accepts long descriptions ("First half", "Finished after penalties")
    /// as well as the common short codes ("NS", "1H", "HT", "FT", "PST").
    /// Unknown descriptions are treated as scheduled.
    pub fn from_upstream(description: &str) -> Self {
        let normalized = description.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "ns" | "tbd" | "not started" | "scheduled" | "time to be defined" => {
                MatchStatus::Scheduled
            }
            "ft" | "aet" | "pen" | "finished" | "match finished" | "ended" => {
                MatchStatus::Finished
            }
            "pst" | "postponed" => MatchStatus::Postponed,
            "canc" | "cancelled" | "canceled" | "abd" | "abandoned" => MatchStatus::Cancelled,
            "1h" | "2h" | "ht" | "et" | "bt" | "p" | "live" | "in progress" | "half time"
            | "first half" | "second half" | "extra time" | "break time" | "penalties" => {
                MatchStatus::Live
            }
            other if other.starts_with("finished") => MatchStatus::Finished,
            other if other.contains("half") || other.contains("extra time") => MatchStatus::Live,
            _ => MatchStatus::Scheduled,
        }
    }

    pub fn is_live(self) -> bool {
        self == MatchStatus::Live
    }

    pub fn is_finished(self) -> bool {
        self == MatchStatus::Finished
    }
}

/// Current score; `None` until the match has started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self {
            home: Some(home),
            away: Some(away),
        }
    }
}

/// Enrichment stages completed for a match. Flags only ever go from false to true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFlags {
    pub has_lineups: bool,
    pub has_events: bool,
    pub has_highlights: bool,
    pub has_statistics: bool,
}

impl StageFlags {
    /// Union of both flag sets.
    pub fn merge(self, other: StageFlags) -> StageFlags {
        StageFlags {
            has_lineups: self.has_lineups || other.has_lineups,
            has_events: self.has_events || other.has_events,
            has_highlights: self.has_highlights || other.has_highlights,
            has_statistics: self.has_statistics || other.has_statistics,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.has_lineups && self.has_events && self.has_highlights && self.has_statistics
    }

    pub fn lineups() -> Self {
        StageFlags {
            has_lineups: true,
            ..StageFlags::default()
        }
    }
}

/// Lifecycle position of a match, derived from status and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleStage {
    Discovered,
    LineupsPending,
    LineupsReady,
    Live,
    Finished,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: LeagueId,
    pub name: String,
    pub season: i32,
}

/// A match as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub league_id: LeagueId,
    #[serde(default)]
    pub season: Option<i32>,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub kickoff: DateTime<Utc>,
    pub status: MatchStatus,
    #[serde(default)]
    pub score: Score,
    #[serde(default)]
    pub round: Option<String>,
    #[serde(default)]
    pub flags: StageFlags,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// True when the upstream-sourced fields are equal, ignoring flags and timestamps.
    pub fn same_content(&self, other: &Match) -> bool {
        self.id == other.id
            && self.league_id == other.league_id
            && self.season == other.season
            && self.home_team_id == other.home_team_id
            && self.away_team_id == other.away_team_id
            && self.kickoff == other.kickoff
            && self.status == other.status
            && self.score == other.score
            && self.round == other.round
    }

    pub fn involves_team(&self, team_id: TeamId) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }

    /// Derives the lifecycle stage at `now`.
    ///
    /// `lineup_lookahead` is how far before kickoff lineups start being expected.
    pub fn lifecycle_stage(&self, now: DateTime<Utc>, lineup_lookahead: Duration) -> LifecycleStage {
        match self.status {
            MatchStatus::Live => LifecycleStage::Live,
            MatchStatus::Finished if self.flags.is_complete() => LifecycleStage::Complete,
            MatchStatus::Finished => LifecycleStage::Finished,
            _ if self.flags.has_lineups => LifecycleStage::LineupsReady,
            _ if self.kickoff - now <= lineup_lookahead => LifecycleStage::LineupsPending,
            _ => LifecycleStage::Discovered,
        }
    }
}

/// A normalized match together with both embedded teams.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchBundle {
    pub record: Match,
    pub home_team: Team,
    pub away_team: Team,
}
