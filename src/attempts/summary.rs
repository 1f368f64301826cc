//! Activity summarization.
//!
//! Extracts an attempt from one activity's segment efforts. The defining
//! rule: bonus (climb/descent) sums count only when every segment of the
//! group was ridden within the identical activity as the main loop. Bonus
//! times are never assembled from efforts recorded on different rides, even
//! when those rides fall in the same window.

use chrono::{DateTime, Utc};

use crate::config::CourseConfig;
use crate::upstream::types::{ActivityDetail, SegmentEffort};

/// Attempt extracted from a single activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSummary {
    pub activity_id: i64,
    pub start_date: DateTime<Utc>,
    pub main_ms: u32,
    pub climb_sum_ms: Option<u32>,
    pub desc_sum_ms: Option<u32>,
}

/// Summarize one activity against the course layout.
///
/// Returns `None` when the activity has no main-loop effort; an activity
/// without the main loop never yields a partial result.
pub fn summarize(detail: &ActivityDetail, config: &CourseConfig) -> Option<AttemptSummary> {
    let main_ms = detail.effort_ms(config.main_segment_id)?;

    Some(AttemptSummary {
        activity_id: detail.id,
        start_date: detail.start_date,
        main_ms,
        climb_sum_ms: group_sum_ms(&detail.segment_efforts, &config.climb_segment_ids),
        desc_sum_ms: group_sum_ms(&detail.segment_efforts, &config.descent_segment_ids),
    })
}

/// Sum of the first effort per group segment, in milliseconds. `None`
/// unless every segment of the group is present in this activity.
fn group_sum_ms(efforts: &[SegmentEffort], group: &[i64]) -> Option<u32> {
    let mut sum: u32 = 0;
    for segment_id in group {
        let effort = efforts.iter().find(|e| e.segment_id == *segment_id)?;
        sum += effort.elapsed_seconds * 1000;
    }
    Some(sum)
}
