use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use super::fields::{as_string, as_u32, field, i64_field, items, path, string_field};
use crate::data_fetcher::models::{
    LeagueId, Match, MatchBundle, MatchStatus, Score, StageFlags, Team,
};

/// Normalizes a matches payload into bundles of match + teams.
///
/// Records without an id, teams or a parseable kickoff are skipped with a
/// warning. `fallback_league` is used when a record carries no league.
pub fn normalize_matches(
    payload: &Value,
    fallback_league: Option<LeagueId>,
    observed_at: DateTime<Utc>,
) -> Vec<MatchBundle> {
    let bundles: Vec<MatchBundle> = items(payload)
        .into_iter()
        .filter_map(|raw| normalize_match(raw, fallback_league, observed_at))
        .collect();
    debug!("Normalized {} matches", bundles.len());
    bundles
}

fn normalize_match(
    raw: &Value,
    fallback_league: Option<LeagueId>,
    observed_at: DateTime<Utc>,
) -> Option<MatchBundle> {
    // api-football style wraps the core fields in `fixture`
    let fixture = field(raw, &["fixture"]).unwrap_or(raw);

    let Some(id) = i64_field(fixture, &["id", "matchId", "match_id"]) else {
        warn!("Skipping match record without id");
        return None;
    };

    let home_team = team_of(raw, &["homeTeam", "home_team", "home"])?;
    let away_team = team_of(raw, &["awayTeam", "away_team", "away"])?;

    let Some(kickoff) = field(fixture, &["date", "kickoff", "startTime", "start"])
        .and_then(|v| v.as_str())
        .and_then(parse_kickoff)
    else {
        warn!("Skipping match {} without a parseable kickoff", id);
        return None;
    };

    let league = field(raw, &["league", "competition"]);
    let league_id = league
        .and_then(|l| i64_field(l, &["id", "leagueId"]))
        .or_else(|| i64_field(raw, &["leagueId", "league_id"]))
        .or(fallback_league);
    let Some(league_id) = league_id else {
        warn!("Skipping match {} without league", id);
        return None;
    };
    let season = league
        .and_then(|l| i64_field(l, &["season"]))
        .or_else(|| i64_field(raw, &["season"]))
        .and_then(|s| i32::try_from(s).ok());

    let status = status_of(raw, fixture);
    let score = score_of(raw);
    let round = league
        .and_then(|l| string_field(l, &["round"]))
        .or_else(|| string_field(raw, &["round"]));

    Some(MatchBundle {
        record: Match {
            id,
            league_id,
            season,
            home_team_id: home_team.id,
            away_team_id: away_team.id,
            kickoff,
            status,
            score,
            round,
            flags: StageFlags::default(),
            updated_at: observed_at,
            processed_at: None,
        },
        home_team,
        away_team,
    })
}

fn team_of(raw: &Value, names: &[&str]) -> Option<Team> {
    let team = field(raw, names).or_else(|| {
        field(raw, &["teams"]).and_then(|teams| field(teams, names))
    })?;
    let id = i64_field(team, &["id", "teamId"])?;
    let name = string_field(team, &["name", "teamName", "shortName"])
        .unwrap_or_else(|| format!("Team {id}"));
    Some(Team {
        id,
        name,
        logo: string_field(team, &["logo", "logoUrl", "crest"]),
    })
}

fn status_of(raw: &Value, fixture: &Value) -> MatchStatus {
    let description = path(raw, "state.description")
        .or_else(|| path(fixture, "status.long"))
        .or_else(|| path(fixture, "status.short"))
        .or_else(|| field(fixture, &["status"]))
        .and_then(as_string);
    description
        .map(|d| MatchStatus::from_upstream(&d))
        .unwrap_or(MatchStatus::Scheduled)
}

fn score_of(raw: &Value) -> Score {
    if let Some(current) = path(raw, "state.score.current").or_else(|| field(raw, &["score"])) {
        if let Some(text) = current.as_str() {
            return parse_score_text(text);
        }
        if let Some(score) = score_from_object(current) {
            return score;
        }
    }
    field(raw, &["goals"])
        .and_then(score_from_object)
        .unwrap_or_default()
}

fn score_from_object(value: &Value) -> Option<Score> {
    // `score.fulltime` and friends nest one level deeper
    let value = field(value, &["current", "fulltime"]).unwrap_or(value);
    let home = field(value, &["home", "homeTeam"]).and_then(as_u32);
    let away = field(value, &["away", "awayTeam"]).and_then(as_u32);
    (home.is_some() || away.is_some()).then_some(Score { home, away })
}

/// Parses `"2 - 1"` / `"2-1"` / `"2:1"`.
pub fn parse_score_text(text: &str) -> Score {
    let mut parts = text.split(['-', ':']).map(|p| p.trim().parse::<u32>().ok());
    match (parts.next().flatten(), parts.next().flatten()) {
        (Some(home), Some(away)) => Score::new(home, away),
        _ => Score::default(),
    }
}

/// Parses RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (assumed UTC) and bare dates.
pub fn parse_kickoff(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Looks up the bundle for `match_id` in a normalized payload.
pub fn find_match(bundles: Vec<MatchBundle>, match_id: i64) -> Option<MatchBundle> {
    bundles.into_iter().find(|b| b.record.id == match_id)
}
