//! Dashboard statistics: pure per-collection reducers over live snapshots.
//!
//! Each reducer recomputes only the fields derivable from its own
//! collection's snapshot and merges them into the existing stats value, so a
//! fresh journeys count can coexist with a not-yet-arrived places count.
//! Journey progress is the exception: it reads the retained journeys and
//! places snapshots together and is recomputed when either changes.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::journey::Journey;
use crate::models::memory::Memory;
use crate::models::place::Place;

/// How many journeys the recent-journeys list carries.
pub const RECENT_JOURNEYS: usize = 3;

/// How many journeys the progress list covers.
pub const PROGRESS_JOURNEYS: usize = 6;

/// Aggregated dashboard statistics for the overview page. Derived only —
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub journeys: i64,
    pub journeys_this_year: i64,
    pub places: i64,
    pub countries: i64,
    pub memories: i64,
    pub last_journey_date: Option<DateTime<Utc>>,
    pub days_since_last_journey: Option<i64>,
    pub avg_places_per_journey: Option<f64>,
    pub avg_memories_per_journey: Option<f64>,
}

/// Place count for one of the most recently created journeys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyProgress {
    pub journey_id: Uuid,
    pub title: String,
    pub places: i64,
}

/// Merge a journeys snapshot: counts, recency fields, and both averages
/// (the shared denominator changed).
pub fn apply_journeys_snapshot(
    mut stats: DashboardStats,
    journeys: &[Journey],
    now: DateTime<Utc>,
) -> DashboardStats {
    stats.journeys = journeys.len() as i64;

    // Snapshot is already ordered newest-first; the head is the latest.
    stats.last_journey_date = journeys.first().map(|j| j.created_at);
    stats.days_since_last_journey = stats.last_journey_date.map(|d| (now - d).num_days());

    let year_start = start_of_year(now);
    stats.journeys_this_year = journeys
        .iter()
        .filter(|j| j.created_at >= year_start)
        .count() as i64;

    stats.avg_places_per_journey = average_per_journey(stats.places, stats.journeys);
    stats.avg_memories_per_journey = average_per_journey(stats.memories, stats.journeys);
    stats
}

/// Merge a places snapshot: place count, distinct countries, and the
/// places-per-journey average.
pub fn apply_places_snapshot(mut stats: DashboardStats, places: &[Place]) -> DashboardStats {
    stats.places = places.len() as i64;
    stats.countries = places
        .iter()
        .filter_map(|p| p.country.as_deref())
        .filter(|c| !c.is_empty())
        .collect::<HashSet<_>>()
        .len() as i64;
    stats.avg_places_per_journey = average_per_journey(stats.places, stats.journeys);
    stats
}

/// Merge a memories snapshot: memory count and the memories-per-journey
/// average.
pub fn apply_memories_snapshot(mut stats: DashboardStats, memories: &[Memory]) -> DashboardStats {
    stats.memories = memories.len() as i64;
    stats.avg_memories_per_journey = average_per_journey(stats.memories, stats.journeys);
    stats
}

/// The first `RECENT_JOURNEYS` entries of the newest-first snapshot.
pub fn recent_journeys(journeys: &[Journey]) -> Vec<Journey> {
    journeys.iter().take(RECENT_JOURNEYS).cloned().collect()
}

/// Per-journey place counts for the first `PROGRESS_JOURNEYS` journeys.
///
/// The grouping pass covers every place in the snapshot; counts belonging to
/// journeys outside the window are computed and then discarded. Places whose
/// journey is not in the snapshot at all (dangling parents) never surface.
pub fn journey_progress(journeys: &[Journey], places: &[Place]) -> Vec<JourneyProgress> {
    let mut counts: HashMap<Uuid, i64> = HashMap::new();
    for place in places {
        *counts.entry(place.journey_id).or_insert(0) += 1;
    }

    journeys
        .iter()
        .take(PROGRESS_JOURNEYS)
        .map(|j| JourneyProgress {
            journey_id: j.id,
            title: j.title.clone(),
            places: counts.get(&j.id).copied().unwrap_or(0),
        })
        .collect()
}

/// `count / journeys` rounded to one decimal; absent while no journeys exist.
fn average_per_journey(count: i64, journeys: i64) -> Option<f64> {
    (journeys > 0).then(|| ((count as f64 / journeys as f64) * 10.0).round() / 10.0)
}

fn start_of_year(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}
