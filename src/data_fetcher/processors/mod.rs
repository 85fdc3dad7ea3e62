//! Turns upstream payloads into the normalized records the store persists.

pub mod enrichment;
pub mod fields;
pub mod matches;

pub use enrichment::{
    normalize_events, normalize_highlights, normalize_lineups, normalize_standings,
    normalize_statistics,
};
pub use fields::extract_payload;
pub use matches::{find_match, normalize_matches, parse_kickoff};
