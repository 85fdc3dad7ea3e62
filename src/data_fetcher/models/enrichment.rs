use super::matches::{LeagueId, MatchId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupPlayer {
    pub name: String,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub position: Option<String>,
}

/// One team's lineup for a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineup {
    pub match_id: MatchId,
    pub team_id: TeamId,
    #[serde(default)]
    pub formation: Option<String>,
    pub starting: Vec<LineupPlayer>,
    #[serde(default)]
    pub substitutes: Vec<LineupPlayer>,
}

impl Lineup {
    pub fn is_empty(&self) -> bool {
        self.starting.is_empty() && self.substitutes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub match_id: MatchId,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub minute: Option<u32>,
    #[serde(default)]
    pub extra_minute: Option<u32>,
    pub kind: String,
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub assist: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStatistics {
    pub team_id: TeamId,
    pub values: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStatistics {
    pub match_id: MatchId,
    pub teams: Vec<TeamStatistics>,
}

impl MatchStatistics {
    pub fn is_empty(&self) -> bool {
        self.teams.iter().all(|t| t.values.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: i64,
    pub match_id: MatchId,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

/// A row of a league table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub league_id: LeagueId,
    pub position: u32,
    pub team_id: TeamId,
    pub team_name: String,
    pub points: i32,
    pub played: u32,
    pub goal_difference: i32,
    #[serde(default)]
    pub group: Option<String>,
}
