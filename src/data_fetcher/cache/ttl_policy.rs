//! Freshness window per request category.

use chrono::NaiveDate;

use crate::constants::cache_ttl;
use crate::data_fetcher::api::urls::{RequestCategory, RequestDescriptor};

/// Cache lifetime in seconds for `descriptor`, given the current `today`.
///
/// Pure: the date is passed in rather than read from the clock. Match lists
/// for today churn while games are played; anything dated otherwise (or
/// undated) gets the longer window.
pub fn ttl_for(descriptor: &RequestDescriptor, today: NaiveDate) -> u64 {
    match descriptor.category {
        RequestCategory::Matches => match descriptor.date() {
            Some(date) if date == today => cache_ttl::TODAY_MATCHES_SECONDS,
            _ => cache_ttl::OTHER_DATE_MATCHES_SECONDS,
        },
        RequestCategory::Standings => cache_ttl::STANDINGS_SECONDS,
        RequestCategory::Highlights => cache_ttl::HIGHLIGHTS_SECONDS,
        RequestCategory::StaticLeague | RequestCategory::StaticTeam => cache_ttl::STATIC_SECONDS,
        RequestCategory::Statistics | RequestCategory::Events => cache_ttl::STATISTICS_SECONDS,
        RequestCategory::LiveMatch => cache_ttl::LIVE_MATCH_SECONDS,
        RequestCategory::Lineups => cache_ttl::LINEUPS_SECONDS,
        RequestCategory::Other => cache_ttl::DEFAULT_SECONDS,
    }
}
