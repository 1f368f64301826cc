//! LoopTrial - Season Scoring Engine
//!
//! Tracks a recurring multi-season mountain-bike time trial: riders ride a
//! fixed main loop (plus optional climb and descent sub-segments) recorded on
//! an upstream fitness-tracking service. This crate decides which calendar
//! windows count toward a season, resolves each rider's single qualifying
//! attempt, imports historical efforts, and aggregates gated leaderboards.

pub mod attempts;
pub mod config;
pub mod leaderboards;
pub mod seasons;
pub mod storage;
pub mod upstream;

// Re-export commonly used types
pub use attempts::history::HistoricalImporter;
pub use attempts::selector::BestAttemptSelector;
pub use config::CourseConfig;
pub use leaderboards::LeaderboardAggregator;
pub use seasons::windows::WindowResolver;
pub use seasons::{Season, SeasonKey};
pub use storage::Database;
pub use upstream::client::SourceClient;
