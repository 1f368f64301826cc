//! Leaderboard aggregation service.
//!
//! Reads current-best attempts (and season bonus efforts) for a race
//! year's four seasons and produces the overall, climbing, descending, and
//! legacy views. Only riders who consented to public display appear.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

use crate::attempts::Attempt;
use crate::config::CourseConfig;
use crate::seasons::SeasonKey;
use crate::storage::{Database, Rider};

use super::legacy::{legacy_score, LegacyEntry};

/// Per-season figures shown in the overall view. The bonus sums come from
/// the same attempt row as the season's main time, never from another
/// season.
#[derive(Debug, Clone, Serialize)]
pub struct SeasonResult {
    pub activity_id: i64,
    pub main_ms: u32,
    pub climb_sum_ms: Option<u32>,
    pub desc_sum_ms: Option<u32>,
}

/// One row of the overall leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct OverallEntry {
    pub athlete_id: i64,
    pub display_name: String,
    /// Seasons with a recorded attempt; absent seasons contribute nothing.
    pub seasons: BTreeMap<SeasonKey, SeasonResult>,
    pub total_ms: u64,
    pub best_season_ms: u32,
}

/// Segment-specific leaderboard discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusDiscipline {
    Climbing,
    Descending,
}

/// One row of a climbing or descending leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct BonusEntry {
    pub athlete_id: i64,
    pub display_name: String,
    /// Summed bonus time per qualifying season.
    pub seasons: BTreeMap<SeasonKey, u32>,
    pub total_ms: u64,
}

/// Leaderboard errors.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Builds leaderboard views for a race year.
pub struct LeaderboardAggregator {
    db: Arc<Database>,
    config: CourseConfig,
}

impl LeaderboardAggregator {
    /// Create a new aggregator.
    pub fn new(db: Arc<Database>, config: CourseConfig) -> Self {
        Self { db, config }
    }

    /// Overall view: per-season main times, their sum, and the best single
    /// season. Missing seasons are excluded, not penalized. Sorted
    /// ascending by total.
    pub fn overall(&self, race_year: i32) -> Result<Vec<OverallEntry>, LeaderboardError> {
        let keys = SeasonKey::race_year_keys(race_year);
        let riders = self.consenting_riders()?;
        let attempts = self.attempts_by_rider(&keys)?;

        let mut entries = Vec::new();
        for (athlete_id, rows) in attempts {
            let Some(rider) = riders.get(&athlete_id) else {
                continue;
            };

            let mut seasons = BTreeMap::new();
            for attempt in rows {
                seasons.insert(
                    attempt.season_key,
                    SeasonResult {
                        activity_id: attempt.activity_id,
                        main_ms: attempt.main_ms,
                        climb_sum_ms: attempt.climb_sum_ms,
                        desc_sum_ms: attempt.desc_sum_ms,
                    },
                );
            }

            let total_ms: u64 = seasons.values().map(|s| u64::from(s.main_ms)).sum();
            let best_season_ms = match seasons.values().map(|s| s.main_ms).min() {
                Some(best) => best,
                None => continue,
            };

            entries.push(OverallEntry {
                athlete_id,
                display_name: rider.display_name.clone(),
                seasons,
                total_ms,
                best_season_ms,
            });
        }

        entries.sort_by_key(|e| e.total_ms);
        Ok(entries)
    }

    /// Climbing view: both climb segments required per season.
    pub fn climbing(&self, race_year: i32) -> Result<Vec<BonusEntry>, LeaderboardError> {
        self.bonus_view(race_year, BonusDiscipline::Climbing)
    }

    /// Descending view: at least one descent segment required per season.
    pub fn descending(&self, race_year: i32) -> Result<Vec<BonusEntry>, LeaderboardError> {
        self.bonus_view(race_year, BonusDiscipline::Descending)
    }

    /// Segment-specific view under the completion gate: a rider's season
    /// counts only when (1) a qualifying main-loop attempt is recorded for
    /// that exact season and (2) the season's efforts cover the bonus
    /// group. Sums may span activities; riders with no qualifying season
    /// are excluded entirely.
    fn bonus_view(
        &self,
        race_year: i32,
        discipline: BonusDiscipline,
    ) -> Result<Vec<BonusEntry>, LeaderboardError> {
        let keys = SeasonKey::race_year_keys(race_year);
        let riders = self.consenting_riders()?;

        // Loop-completion gate: seasons with a current-best attempt.
        let completed: HashSet<(i64, SeasonKey)> = self
            .db
            .list_current_best(&keys)
            .map_err(|e| LeaderboardError::DatabaseError(e.to_string()))?
            .into_iter()
            .map(|a| (a.athlete_id, a.season_key))
            .collect();

        let group: &[i64] = match discipline {
            BonusDiscipline::Climbing => &self.config.climb_segment_ids,
            BonusDiscipline::Descending => &self.config.descent_segment_ids,
        };

        // (rider, season) -> segment -> fastest elapsed.
        let mut observed: BTreeMap<(i64, SeasonKey), BTreeMap<i64, u32>> = BTreeMap::new();
        for effort in self
            .db
            .list_season_efforts(&keys)
            .map_err(|e| LeaderboardError::DatabaseError(e.to_string()))?
        {
            if group.contains(&effort.segment_id) {
                observed
                    .entry((effort.athlete_id, effort.season_key))
                    .or_default()
                    .insert(effort.segment_id, effort.elapsed_ms);
            }
        }

        let mut per_rider: BTreeMap<i64, BTreeMap<SeasonKey, u32>> = BTreeMap::new();
        for ((athlete_id, season_key), efforts) in observed {
            if !completed.contains(&(athlete_id, season_key)) {
                continue;
            }

            let qualifies = match discipline {
                // Both climb segments, summed.
                BonusDiscipline::Climbing => efforts.len() == group.len(),
                // At least one descent segment; present ones are summed.
                BonusDiscipline::Descending => !efforts.is_empty(),
            };
            if !qualifies {
                continue;
            }

            let sum: u32 = efforts.values().sum();
            per_rider
                .entry(athlete_id)
                .or_default()
                .insert(season_key, sum);
        }

        let mut entries = Vec::new();
        for (athlete_id, seasons) in per_rider {
            let Some(rider) = riders.get(&athlete_id) else {
                continue;
            };
            let total_ms: u64 = seasons.values().map(|&s| u64::from(s)).sum();
            entries.push(BonusEntry {
                athlete_id,
                display_name: rider.display_name.clone(),
                seasons,
                total_ms,
            });
        }

        entries.sort_by_key(|e| e.total_ms);
        Ok(entries)
    }

    /// Legacy view: best three of four season times, flat bonus for a full
    /// year, DNF riders last.
    pub fn legacy(&self, race_year: i32) -> Result<Vec<LegacyEntry>, LeaderboardError> {
        let keys = SeasonKey::race_year_keys(race_year);
        let riders = self.consenting_riders()?;
        let attempts = self.attempts_by_rider(&keys)?;

        let mut entries = Vec::new();
        for rider in riders.values() {
            let mut seasons = BTreeMap::new();
            if let Some(rows) = attempts.get(&rider.athlete_id) {
                for attempt in rows {
                    seasons.insert(attempt.season_key, attempt.main_ms);
                }
            }

            let times: Vec<u32> = seasons.values().copied().collect();
            entries.push(LegacyEntry {
                athlete_id: rider.athlete_id,
                display_name: rider.display_name.clone(),
                seasons,
                final_ms: legacy_score(&times),
            });
        }

        // Scored riders ascending; DNF sorts after every scored rider.
        entries.sort_by_key(|e| e.final_ms.unwrap_or(u64::MAX));
        Ok(entries)
    }

    fn consenting_riders(&self) -> Result<BTreeMap<i64, Rider>, LeaderboardError> {
        Ok(self
            .db
            .list_consenting_riders()
            .map_err(|e| LeaderboardError::DatabaseError(e.to_string()))?
            .into_iter()
            .map(|r| (r.athlete_id, r))
            .collect())
    }

    fn attempts_by_rider(
        &self,
        keys: &[SeasonKey],
    ) -> Result<BTreeMap<i64, Vec<Attempt>>, LeaderboardError> {
        let mut grouped: BTreeMap<i64, Vec<Attempt>> = BTreeMap::new();
        for attempt in self
            .db
            .list_current_best(keys)
            .map_err(|e| LeaderboardError::DatabaseError(e.to_string()))?
        {
            grouped.entry(attempt.athlete_id).or_default().push(attempt);
        }
        Ok(grouped)
    }
}

/// Format a millisecond duration as `H:MM:SS` (or `MM:SS` under an hour).
pub fn format_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}
