//! Normalization of the per-match enrichment payloads and league tables.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::fields::{
    as_i64, as_u32, field, i64_field, items, name_of, parse_minute, path, string_field,
};
use crate::data_fetcher::models::{
    Highlight, LeagueId, Lineup, LineupPlayer, MatchEvent, MatchId, MatchStatistics, Standing,
    TeamStatistics,
};

/// Normalizes a lineups payload into one lineup per team.
///
/// Two shapes are understood: an object with `homeTeam`/`awayTeam` entries
/// (players under `initialLineup`, possibly nested per formation row), or an
/// array of per-team entries with `startXI`. Teams without an id are dropped.
pub fn normalize_lineups(payload: &Value, match_id: MatchId) -> Vec<Lineup> {
    let team_entries: Vec<&Value> = match payload {
        Value::Object(_) if field(payload, &["homeTeam", "awayTeam"]).is_some() => {
            ["homeTeam", "awayTeam"]
                .iter()
                .filter_map(|side| field(payload, &[*side]))
                .collect()
        }
        other => items(other),
    };

    let lineups: Vec<Lineup> = team_entries
        .into_iter()
        .filter_map(|entry| lineup_of(entry, match_id))
        .collect();
    debug!("Normalized {} lineups for match {}", lineups.len(), match_id);
    lineups
}

fn lineup_of(entry: &Value, match_id: MatchId) -> Option<Lineup> {
    let team_id = field(entry, &["team"])
        .and_then(|team| i64_field(team, &["id"]))
        .or_else(|| i64_field(entry, &["id", "teamId"]));
    let Some(team_id) = team_id else {
        warn!("Skipping lineup entry without team id for match {}", match_id);
        return None;
    };

    let starting = field(entry, &["initialLineup", "startXI", "starting"])
        .map(players_of)
        .unwrap_or_default();
    let substitutes = field(entry, &["substitutes", "bench"])
        .map(players_of)
        .unwrap_or_default();

    Some(Lineup {
        match_id,
        team_id,
        formation: string_field(entry, &["formation"]),
        starting,
        substitutes,
    })
}

/// Flattens a player list; formation rows arrive as nested arrays.
fn players_of(value: &Value) -> Vec<LineupPlayer> {
    let mut players = Vec::new();
    collect_players(value, &mut players);
    players
}

fn collect_players(value: &Value, out: &mut Vec<LineupPlayer>) {
    match value {
        Value::Array(entries) => {
            for entry in entries {
                collect_players(entry, out);
            }
        }
        Value::Object(_) => {
            let player = field(value, &["player"]).unwrap_or(value);
            if let Some(name) = name_of(player) {
                out.push(LineupPlayer {
                    name,
                    number: field(player, &["number", "shirtNumber"]).and_then(as_u32),
                    position: string_field(player, &["position", "pos"]),
                });
            }
        }
        _ => {}
    }
}

/// Normalizes a match events payload. Entries without a type are dropped.
pub fn normalize_events(payload: &Value, match_id: MatchId) -> Vec<MatchEvent> {
    items(payload)
        .into_iter()
        .filter_map(|raw| {
            let kind = string_field(raw, &["type", "kind"])?;
            let (minute, extra_minute) = match field(raw, &["time", "minute"]) {
                Some(time @ Value::Object(_)) => (
                    field(time, &["elapsed"]).and_then(as_u32),
                    field(time, &["extra"]).and_then(as_u32),
                ),
                Some(other) => parse_minute(other),
                None => (None, None),
            };
            Some(MatchEvent {
                match_id,
                team_id: field(raw, &["team"]).and_then(|t| i64_field(t, &["id"])),
                minute,
                extra_minute,
                kind,
                player: field(raw, &["player"])
                    .and_then(name_of)
                    .or_else(|| string_field(raw, &["playerName"])),
                assist: field(raw, &["assist", "assistingPlayer"])
                    .and_then(name_of)
                    .or_else(|| string_field(raw, &["assistingPlayerName"])),
            })
        })
        .collect()
}

/// Normalizes a statistics payload into per-team name/value maps.
///
/// Values are kept as upstream sends them ("55%", 12, null).
pub fn normalize_statistics(payload: &Value, match_id: MatchId) -> MatchStatistics {
    let teams = items(payload)
        .into_iter()
        .filter_map(|entry| {
            let team_id = field(entry, &["team"]).and_then(|t| i64_field(t, &["id"]))?;
            let mut values = BTreeMap::new();
            for stat in field(entry, &["statistics"])
                .map(items)
                .unwrap_or_default()
            {
                if let Some(name) = string_field(stat, &["displayName", "type", "name"]) {
                    values.insert(name, stat.get("value").cloned().unwrap_or(Value::Null));
                }
            }
            Some(TeamStatistics { team_id, values })
        })
        .collect();

    MatchStatistics { match_id, teams }
}

/// Normalizes a highlights payload. Clips without an id or url are dropped.
pub fn normalize_highlights(payload: &Value, match_id: MatchId) -> Vec<Highlight> {
    items(payload)
        .into_iter()
        .filter_map(|raw| {
            let id = i64_field(raw, &["id"])?;
            let url = string_field(raw, &["url"])?;
            Some(Highlight {
                id,
                match_id: field(raw, &["match"])
                    .and_then(|m| i64_field(m, &["id"]))
                    .unwrap_or(match_id),
                title: string_field(raw, &["title"]).unwrap_or_else(|| format!("Highlight {id}")),
                url,
                embed_url: string_field(raw, &["embedUrl", "embed_url"]),
                source: string_field(raw, &["source", "channel"]),
                kind: string_field(raw, &["type"]),
            })
        })
        .collect()
}

/// Normalizes a standings payload into table rows, ordered by group then position.
///
/// Accepts `groups[].standings[]`, `league.standings[][]` and flat row arrays.
pub fn normalize_standings(payload: &Value, league_id: LeagueId) -> Vec<Standing> {
    let mut rows = Vec::new();
    collect_standings(payload, league_id, None, &mut rows);
    rows.sort_by(|a, b| a.group.cmp(&b.group).then(a.position.cmp(&b.position)));
    rows
}

fn collect_standings(
    value: &Value,
    league_id: LeagueId,
    group: Option<String>,
    out: &mut Vec<Standing>,
) {
    match value {
        Value::Array(entries) => {
            for entry in entries {
                collect_standings(entry, league_id, group.clone(), out);
            }
        }
        Value::Object(_) => {
            if let Some(groups) = field(value, &["groups"]) {
                collect_standings(groups, league_id, group, out);
            } else if let Some(standings) = field(value, &["standings"]) {
                let group = string_field(value, &["name", "group"]).or(group);
                collect_standings(standings, league_id, group, out);
            } else if let Some(league) = field(value, &["league"]).filter(|l| l.get("standings").is_some()) {
                collect_standings(league, league_id, group, out);
            } else if let Some(row) = standing_of(value, league_id, group) {
                out.push(row);
            }
        }
        _ => {}
    }
}

fn standing_of(row: &Value, league_id: LeagueId, group: Option<String>) -> Option<Standing> {
    let team = field(row, &["team"])?;
    let team_id = i64_field(team, &["id"])?;
    let position = field(row, &["position", "rank"]).and_then(as_u32)?;

    let played = path(row, "total.games")
        .or_else(|| path(row, "all.played"))
        .or_else(|| field(row, &["played"]))
        .and_then(as_u32)
        .unwrap_or(0);

    let goal_difference = field(row, &["goalsDiff", "goalDifference"])
        .and_then(as_i64)
        .or_else(|| {
            let scored = path(row, "total.scoredGoals").and_then(as_i64)?;
            let received = path(row, "total.receivedGoals").and_then(as_i64)?;
            Some(scored - received)
        })
        .unwrap_or(0);

    Some(Standing {
        league_id,
        position,
        team_id,
        team_name: name_of(team).unwrap_or_else(|| format!("Team {team_id}")),
        points: field(row, &["points"])
            .and_then(as_i64)
            .and_then(|p| i32::try_from(p).ok())
            .unwrap_or(0),
        played,
        goal_difference: i32::try_from(goal_difference).unwrap_or(0),
        group: string_field(row, &["group"]).or(group),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lineups_home_away_shape_with_formation_rows() {
        let payload = json!({
            "homeTeam": {
                "id": 40,
                "formation": "4-3-3",
                "initialLineup": [
                    [{"name": "Alisson", "number": 1, "position": "Goalkeeper"}],
                    [{"name": "Trent", "number": 66}, {"name": "Van Dijk", "number": 4}]
                ],
                "substitutes": [{"name": "Kelleher", "number": 62}]
            },
            "awayTeam": {
                "id": 50,
                "initialLineup": [[{"name": "Ederson", "number": 31}]],
                "substitutes": []
            }
        });

        let lineups = normalize_lineups(&payload, 1001);
        assert_eq!(lineups.len(), 2);
        assert_eq!(lineups[0].team_id, 40);
        assert_eq!(lineups[0].formation.as_deref(), Some("4-3-3"));
        assert_eq!(lineups[0].starting.len(), 3);
        assert_eq!(lineups[0].starting[1].name, "Trent");
        assert_eq!(lineups[0].substitutes.len(), 1);
        assert_eq!(lineups[1].team_id, 50);
        assert_eq!(lineups[1].starting[0].number, Some(31));
    }

    #[test]
    fn test_lineups_start_xi_shape() {
        let payload = json!([
            {"team": {"id": 1}, "formation": "4-4-2", "startXI": [{"player": {"name": "A", "number": 9, "pos": "F"}}]},
            {"team": {"name": "no id"}, "startXI": []}
        ]);

        let lineups = normalize_lineups(&payload, 5);
        assert_eq!(lineups.len(), 1);
        assert_eq!(lineups[0].starting[0].position.as_deref(), Some("F"));
        assert!(lineups[0].substitutes.is_empty());
    }

    #[test]
    fn test_lineups_empty_payload() {
        assert!(normalize_lineups(&json!([]), 5).is_empty());
        assert!(normalize_lineups(&json!(null), 5).is_empty());
    }

    #[test]
    fn test_events_both_shapes() {
        let payload = json!([
            {"team": {"id": 40}, "time": "45+2", "type": "Goal", "player": "Salah", "assistingPlayer": "Trent"},
            {"team": {"id": 50}, "time": {"elapsed": 67, "extra": null}, "type": "Card", "player": {"name": "Rodri"}},
            {"team": {"id": 50}, "time": "70"}
        ]);

        let events = normalize_events(&payload, 9);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].minute, Some(45));
        assert_eq!(events[0].extra_minute, Some(2));
        assert_eq!(events[0].player.as_deref(), Some("Salah"));
        assert_eq!(events[0].assist.as_deref(), Some("Trent"));
        assert_eq!(events[1].minute, Some(67));
        assert_eq!(events[1].extra_minute, None);
        assert_eq!(events[1].player.as_deref(), Some("Rodri"));
        assert!(events.iter().all(|e| e.match_id == 9));
    }

    #[test]
    fn test_statistics_keep_raw_values() {
        let payload = json!([
            {"team": {"id": 40}, "statistics": [{"displayName": "Possession", "value": "58%"}, {"type": "Shots", "value": 14}]},
            {"team": {"id": 50}, "statistics": []}
        ]);

        let stats = normalize_statistics(&payload, 3);
        assert_eq!(stats.teams.len(), 2);
        assert_eq!(stats.teams[0].values.get("Possession"), Some(&json!("58%")));
        assert_eq!(stats.teams[0].values.get("Shots"), Some(&json!(14)));
        assert!(!stats.is_empty());

        assert!(normalize_statistics(&json!([]), 3).is_empty());
    }

    #[test]
    fn test_highlights_require_id_and_url() {
        let payload = json!([
            {"id": 1, "title": "Goal", "url": "https://v/1", "embedUrl": "https://e/1", "source": "youtube", "type": "VERIFIED"},
            {"id": 2, "title": "No url"},
            {"title": "No id", "url": "https://v/3"}
        ]);

        let highlights = normalize_highlights(&payload, 77);
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].match_id, 77);
        assert_eq!(highlights[0].embed_url.as_deref(), Some("https://e/1"));
        assert_eq!(highlights[0].kind.as_deref(), Some("VERIFIED"));
    }

    #[test]
    fn test_standings_grouped_shape() {
        let payload = json!({
            "groups": [{
                "name": "Premier League",
                "standings": [
                    {"position": 2, "points": 80, "team": {"id": 50, "name": "City"},
                     "total": {"games": 36, "scoredGoals": 90, "receivedGoals": 30}},
                    {"position": 1, "points": 84, "team": {"id": 40, "name": "Liverpool"},
                     "total": {"games": 36, "scoredGoals": 80, "receivedGoals": 35}}
                ]
            }]
        });

        let rows = normalize_standings(&payload, 39);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].team_name, "Liverpool");
        assert_eq!(rows[0].goal_difference, 45);
        assert_eq!(rows[1].played, 36);
        assert_eq!(rows[1].group.as_deref(), Some("Premier League"));
    }

    #[test]
    fn test_standings_nested_array_shape() {
        let payload = json!([{
            "league": {"id": 140, "standings": [[
                {"rank": 1, "team": {"id": 529, "name": "Barcelona"}, "points": 88, "goalsDiff": 60, "group": "La Liga", "all": {"played": 38}}
            ]]}
        }]);

        let rows = normalize_standings(&payload, 140);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].position, 1);
        assert_eq!(rows[0].played, 38);
        assert_eq!(rows[0].goal_difference, 60);
        assert_eq!(rows[0].group.as_deref(), Some("La Liga"));
    }
}
