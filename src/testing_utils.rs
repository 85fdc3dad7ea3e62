use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::data_fetcher::models::{
    League, LeagueId, Match, MatchId, MatchStatus, Score, StageFlags, Team, TeamId,
};

/// Home team used by the match builders
pub const HOME_TEAM_ID: TeamId = 40;
/// Away team used by the match builders
pub const AWAY_TEAM_ID: TeamId = 50;
/// League used by the match builders
pub const LEAGUE_ID: LeagueId = 39;

/// Test utilities for creating mock data and testing scenarios
pub struct TestDataBuilder;

impl TestDataBuilder {
    /// Creates a scheduled match between the default teams
    pub fn scheduled_match(id: MatchId, kickoff: DateTime<Utc>) -> Match {
        Match {
            id,
            league_id: LEAGUE_ID,
            season: Some(2024),
            home_team_id: HOME_TEAM_ID,
            away_team_id: AWAY_TEAM_ID,
            kickoff,
            status: MatchStatus::Scheduled,
            score: Score::default(),
            round: Some("Regular Season - 1".to_string()),
            flags: StageFlags::default(),
            updated_at: kickoff - chrono::Duration::days(1),
            processed_at: None,
        }
    }

    /// Creates a match in progress
    pub fn live_match(id: MatchId, kickoff: DateTime<Utc>, home: u32, away: u32) -> Match {
        Match {
            status: MatchStatus::Live,
            score: Score::new(home, away),
            updated_at: kickoff,
            ..Self::scheduled_match(id, kickoff)
        }
    }

    /// Creates a finished match last updated at `updated_at`
    pub fn finished_match(id: MatchId, kickoff: DateTime<Utc>, updated_at: DateTime<Utc>) -> Match {
        Match {
            status: MatchStatus::Finished,
            score: Score::new(2, 1),
            updated_at,
            ..Self::scheduled_match(id, kickoff)
        }
    }

    pub fn team(id: TeamId, name: &str) -> Team {
        Team {
            id,
            name: name.to_string(),
            logo: None,
        }
    }

    pub fn league(id: LeagueId, name: &str) -> League {
        League {
            id,
            name: name.to_string(),
            season: 2024,
        }
    }

    /// Upstream match record in the `homeTeam`/`state` shape
    pub fn match_json(id: MatchId, kickoff: DateTime<Utc>, state: &str, score: Option<&str>) -> Value {
        let mut state_value = json!({"description": state});
        if let Some(score) = score {
            state_value["score"] = json!({"current": score});
        }
        json!({
            "id": id,
            "round": "Regular Season - 1",
            "date": kickoff.to_rfc3339(),
            "league": {"id": LEAGUE_ID, "name": "Premier League", "season": 2024},
            "homeTeam": {"id": HOME_TEAM_ID, "name": "Liverpool", "logo": "https://img.example.com/40.png"},
            "awayTeam": {"id": AWAY_TEAM_ID, "name": "Manchester City"},
            "state": state_value
        })
    }

    /// Lineups payload for both default teams
    pub fn lineups_json() -> Value {
        json!({
            "homeTeam": {
                "id": HOME_TEAM_ID,
                "formation": "4-3-3",
                "initialLineup": [
                    [{"name": "Alisson", "number": 1, "position": "Goalkeeper"}],
                    [{"name": "Van Dijk", "number": 4, "position": "Defender"}]
                ],
                "substitutes": [{"name": "Kelleher", "number": 62}]
            },
            "awayTeam": {
                "id": AWAY_TEAM_ID,
                "formation": "4-2-3-1",
                "initialLineup": [[{"name": "Ederson", "number": 31, "position": "Goalkeeper"}]],
                "substitutes": []
            }
        })
    }

    pub fn events_json() -> Value {
        json!([
            {"team": {"id": HOME_TEAM_ID}, "time": "23", "type": "Goal", "player": "Salah", "assistingPlayer": "Alexander-Arnold"},
            {"team": {"id": AWAY_TEAM_ID}, "time": "45+1", "type": "Yellow Card", "player": "Rodri"},
            {"team": {"id": HOME_TEAM_ID}, "time": "78", "type": "Goal", "player": "Nunez"}
        ])
    }

    pub fn statistics_json() -> Value {
        json!([
            {"team": {"id": HOME_TEAM_ID}, "statistics": [
                {"displayName": "Ball possession", "value": "48%"},
                {"displayName": "Shots on target", "value": 6}
            ]},
            {"team": {"id": AWAY_TEAM_ID}, "statistics": [
                {"displayName": "Ball possession", "value": "52%"},
                {"displayName": "Shots on target", "value": 3}
            ]}
        ])
    }

    pub fn highlights_json(match_id: MatchId) -> Value {
        json!([
            {"id": match_id * 10 + 1, "title": "Salah opener", "url": "https://video.example.com/1",
             "embedUrl": "https://embed.example.com/1", "source": "youtube", "type": "VERIFIED",
             "match": {"id": match_id}},
            {"id": match_id * 10 + 2, "title": "Extended highlights", "url": "https://video.example.com/2",
             "match": {"id": match_id}}
        ])
    }

    pub fn standings_json() -> Value {
        json!({
            "groups": [{
                "name": "Premier League",
                "standings": [
                    {"position": 1, "points": 84, "team": {"id": HOME_TEAM_ID, "name": "Liverpool"},
                     "total": {"games": 38, "scoredGoals": 86, "receivedGoals": 41}},
                    {"position": 2, "points": 74, "team": {"id": AWAY_TEAM_ID, "name": "Manchester City"},
                     "total": {"games": 38, "scoredGoals": 72, "receivedGoals": 44}}
                ]
            }]
        })
    }
}
