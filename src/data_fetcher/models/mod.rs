pub mod enrichment;
pub mod matches;

pub use enrichment::{
    Highlight, Lineup, LineupPlayer, MatchEvent, MatchStatistics, Standing, TeamStatistics,
};
pub use matches::{
    League, LeagueId, LifecycleStage, Match, MatchBundle, MatchId, MatchStatus, Score,
    StageFlags, Team, TeamId,
};
