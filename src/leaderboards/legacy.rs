//! Legacy scoring variant.
//!
//! The original series scored a race year as the sum of a rider's best
//! three completed season times, with a flat 600-second bonus subtracted
//! when all four seasons were completed. Riders with no completed season
//! still appear, sorted last as DNF.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::seasons::SeasonKey;

/// Flat bonus for completing all four seasons.
pub const FULL_SEASON_BONUS_MS: u64 = 600_000;

/// One row of the legacy leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct LegacyEntry {
    pub athlete_id: i64,
    pub display_name: String,
    /// Recorded season times.
    pub seasons: BTreeMap<SeasonKey, u32>,
    /// Final score; `None` means DNF (no completed season).
    pub final_ms: Option<u64>,
}

/// Score a race year from recorded season times.
///
/// Sums the best `min(3, n)` times; subtracts the full-season bonus iff all
/// four seasons are recorded. `None` when no season is completed.
pub fn legacy_score(season_ms: &[u32]) -> Option<u64> {
    if season_ms.is_empty() {
        return None;
    }

    let mut times: Vec<u64> = season_ms.iter().map(|&t| u64::from(t)).collect();
    times.sort_unstable();

    let total: u64 = times.iter().take(3).sum();

    if season_ms.len() == 4 {
        Some(total.saturating_sub(FULL_SEASON_BONUS_MS))
    } else {
        Some(total)
    }
}
