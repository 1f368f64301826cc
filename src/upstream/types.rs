//! Wire types for the upstream fitness-service API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Activity entry in a range listing. Only the id is consumed; the range
/// query already constrained the start time.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivitySummary {
    pub id: i64,
}

/// Full activity detail with segment efforts.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityDetail {
    pub id: i64,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub segment_efforts: Vec<SegmentEffort>,
}

/// One segment effort inside an activity.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentEffort {
    pub segment_id: i64,
    pub elapsed_seconds: u32,
}

/// One historical effort on a segment.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalEffort {
    pub activity_id: i64,
    /// Wall-clock start time as recorded by the device. Occasionally absent
    /// on corrupted uploads; such efforts are skipped by the importer.
    pub start_date_local: Option<DateTime<Utc>>,
    pub elapsed_seconds: u32,
}

impl ActivityDetail {
    /// Elapsed time of the first effort on `segment_id`, in milliseconds.
    pub fn effort_ms(&self, segment_id: i64) -> Option<u32> {
        self.segment_efforts
            .iter()
            .find(|e| e.segment_id == segment_id)
            .map(|e| e.elapsed_seconds * 1000)
    }
}
