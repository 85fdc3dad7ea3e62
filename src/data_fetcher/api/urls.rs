//! Endpoint descriptors for the upstream API

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use url::form_urlencoded;

use crate::data_fetcher::models::{LeagueId, MatchId};

/// Semantic category of a request; drives the cache lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestCategory {
    Matches,
    LiveMatch,
    Standings,
    Highlights,
    StaticLeague,
    StaticTeam,
    Statistics,
    Events,
    Lineups,
    Other,
}

/// One upstream GET request: path, query parameters and category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub path: String,
    pub params: BTreeMap<String, String>,
    pub category: RequestCategory,
}

impl RequestDescriptor {
    pub fn new(path: impl Into<String>, category: RequestCategory) -> Self {
        Self {
            path: path.into(),
            params: BTreeMap::new(),
            category,
        }
    }

    /// Adds a query parameter, replacing an earlier value for the same key.
    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Deterministic key of the request: the path followed by the
    /// form-encoded query parameters in key order. Used both as cache key
    /// and coalescing key.
    ///
    /// # Example
    /// ```
    /// use matchday_sync::data_fetcher::api::{RequestCategory, RequestDescriptor};
    ///
    /// let a = RequestDescriptor::new("/matches", RequestCategory::Matches)
    ///     .with_param("leagueId", 39)
    ///     .with_param("date", "2024-08-17");
    /// let b = RequestDescriptor::new("/matches", RequestCategory::Matches)
    ///     .with_param("date", "2024-08-17")
    ///     .with_param("leagueId", 39);
    /// assert_eq!(a.fingerprint(), "/matches?date=2024-08-17&leagueId=39");
    /// assert_eq!(a.fingerprint(), b.fingerprint());
    /// ```
    pub fn fingerprint(&self) -> String {
        if self.params.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish();
        format!("{}?{}", self.path, query)
    }

    /// Full URL for logging and error reporting.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.fingerprint())
    }

    /// The `date` parameter, when present and well formed.
    pub fn date(&self) -> Option<NaiveDate> {
        self.params
            .get("date")
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }

    /// Matches of a league on one day.
    pub fn matches_by_date(league_id: LeagueId, date: NaiveDate, season: Option<i32>) -> Self {
        let descriptor = Self::new("/matches", RequestCategory::Matches)
            .with_param("leagueId", league_id)
            .with_param("date", date.format("%Y-%m-%d"));
        match season {
            Some(season) => descriptor.with_param("season", season),
            None => descriptor,
        }
    }

    /// Current state of a single match, used by live polling.
    pub fn match_by_id(match_id: MatchId) -> Self {
        Self::new(format!("/matches/{match_id}"), RequestCategory::LiveMatch)
    }

    pub fn lineups(match_id: MatchId) -> Self {
        Self::new(format!("/lineups/{match_id}"), RequestCategory::Lineups)
    }

    pub fn events(match_id: MatchId) -> Self {
        Self::new(format!("/events/{match_id}"), RequestCategory::Events)
    }

    pub fn statistics(match_id: MatchId) -> Self {
        Self::new(format!("/statistics/{match_id}"), RequestCategory::Statistics)
    }

    pub fn highlights(match_id: MatchId) -> Self {
        Self::new("/highlights", RequestCategory::Highlights).with_param("matchId", match_id)
    }

    pub fn standings(league_id: LeagueId, season: i32) -> Self {
        Self::new("/standings", RequestCategory::Standings)
            .with_param("leagueId", league_id)
            .with_param("season", season)
    }

    pub fn leagues(league_id: Option<LeagueId>) -> Self {
        let descriptor = Self::new("/leagues", RequestCategory::StaticLeague);
        match league_id {
            Some(id) => descriptor.with_param("leagueId", id),
            None => descriptor,
        }
    }

    pub fn teams(league_id: LeagueId) -> Self {
        Self::new("/teams", RequestCategory::StaticTeam).with_param("leagueId", league_id)
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 17).unwrap()
    }

    #[test]
    fn test_builders_produce_catalogue_paths() {
        assert_eq!(
            RequestDescriptor::matches_by_date(39, date(), Some(2024)).fingerprint(),
            "/matches?date=2024-08-17&leagueId=39&season=2024"
        );
        assert_eq!(RequestDescriptor::match_by_id(5).fingerprint(), "/matches/5");
        assert_eq!(RequestDescriptor::lineups(5).fingerprint(), "/lineups/5");
        assert_eq!(RequestDescriptor::events(5).fingerprint(), "/events/5");
        assert_eq!(RequestDescriptor::statistics(5).fingerprint(), "/statistics/5");
        assert_eq!(
            RequestDescriptor::highlights(5).fingerprint(),
            "/highlights?matchId=5"
        );
        assert_eq!(
            RequestDescriptor::standings(39, 2024).fingerprint(),
            "/standings?leagueId=39&season=2024"
        );
        assert_eq!(RequestDescriptor::leagues(None).fingerprint(), "/leagues");
        assert_eq!(
            RequestDescriptor::leagues(Some(39)).fingerprint(),
            "/leagues?leagueId=39"
        );
        assert_eq!(RequestDescriptor::teams(39).fingerprint(), "/teams?leagueId=39");
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            RequestDescriptor::matches_by_date(1, date(), None).category,
            RequestCategory::Matches
        );
        assert_eq!(RequestDescriptor::match_by_id(1).category, RequestCategory::LiveMatch);
        assert_eq!(RequestDescriptor::teams(1).category, RequestCategory::StaticTeam);
        assert_eq!(RequestDescriptor::leagues(None).category, RequestCategory::StaticLeague);
    }

    #[test]
    fn test_fingerprint_distinguishes_params() {
        let a = RequestDescriptor::matches_by_date(39, date(), None);
        let b = RequestDescriptor::matches_by_date(140, date(), None);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_escapes_separators() {
        let packed = RequestDescriptor::new("/x", RequestCategory::Other).with_param("a", "1&b=2");
        let split = RequestDescriptor::new("/x", RequestCategory::Other)
            .with_param("a", 1)
            .with_param("b", 2);
        assert_ne!(packed.fingerprint(), split.fingerprint());
        assert_eq!(packed.fingerprint(), "/x?a=1%26b%3D2");
    }

    #[test]
    fn test_with_param_replaces_value() {
        let descriptor = RequestDescriptor::new("/x", RequestCategory::Other)
            .with_param("a", 1)
            .with_param("a", 2);
        assert_eq!(descriptor.fingerprint(), "/x?a=2");
    }

    #[test]
    fn test_url_and_date() {
        let descriptor = RequestDescriptor::matches_by_date(39, date(), None);
        assert_eq!(
            descriptor.url("https://api.example.com/"),
            "https://api.example.com/matches?date=2024-08-17&leagueId=39"
        );
        assert_eq!(descriptor.date(), Some(date()));
        assert_eq!(RequestDescriptor::standings(39, 2024).date(), None);
    }
}
