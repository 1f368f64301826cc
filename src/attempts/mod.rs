//! Attempt resolution module
//!
//! Summarizes activities into attempts, resolves each rider's best
//! qualifying attempt per season, and imports historical efforts.

pub mod history;
pub mod selector;
pub mod summary;

use chrono::{DateTime, Utc};

use crate::seasons::SeasonKey;

// Re-export commonly used types
pub use history::{HistoricalImporter, ImportError, ImportSummary};
pub use selector::{BestAttemptSelector, ResolveError};
pub use summary::{summarize, AttemptSummary};

/// A rider's current-best attempt for one season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub athlete_id: i64,
    pub season_key: SeasonKey,
    /// Activity the attempt was recorded in.
    pub activity_id: i64,
    /// Main-loop elapsed time.
    pub main_ms: u32,
    /// Climb bonus sum; present only when both climb segments were ridden
    /// in the same activity as the main loop.
    pub climb_sum_ms: Option<u32>,
    /// Descent bonus sum; present only when all three descent segments were
    /// ridden in the same activity as the main loop.
    pub desc_sum_ms: Option<u32>,
    pub resolved_at: DateTime<Utc>,
}

/// One historical main-loop effort, kept per (rider, season, activity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub athlete_id: i64,
    pub season_key: SeasonKey,
    pub activity_id: i64,
    pub race_year: i32,
    pub main_ms: u32,
    pub started_at: DateTime<Utc>,
    pub imported_at: DateTime<Utc>,
}

/// Fastest observed bonus-segment time for (rider, season, segment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonEffort {
    pub athlete_id: i64,
    pub season_key: SeasonKey,
    pub segment_id: i64,
    pub activity_id: i64,
    pub elapsed_ms: u32,
}
