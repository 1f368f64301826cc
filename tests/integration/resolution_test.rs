//! End-to-end tests for best-attempt resolution against a scripted source.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use looptrial::attempts::selector::ResolveError;
use looptrial::config::CourseConfig;
use looptrial::seasons::windows::{SeasonOverride, SeasonWindow};
use looptrial::seasons::{Season, SeasonKey};
use looptrial::upstream::types::{ActivityDetail, SegmentEffort};
use looptrial::upstream::AthleteToken;
use looptrial::{BestAttemptSelector, Database};

use crate::source_mock::MockSource;

const ATHLETE: i64 = 42;
const MAIN: i64 = 1001;

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn config() -> CourseConfig {
    CourseConfig {
        main_segment_id: MAIN,
        climb_segment_ids: vec![2001, 2002],
        descent_segment_ids: vec![3001, 3002, 3003],
        history_start: ts("2014-09-01T00:00:00Z"),
        allow_forced_activity: false,
        base_url: String::new(),
    }
}

fn activity(id: i64, start: &str, efforts: &[(i64, u32)]) -> ActivityDetail {
    ActivityDetail {
        id,
        start_date: ts(start),
        segment_efforts: efforts
            .iter()
            .map(|&(segment_id, elapsed_seconds)| SegmentEffort {
                segment_id,
                elapsed_seconds,
            })
            .collect(),
    }
}

fn token() -> AthleteToken {
    AthleteToken::new(ATHLETE, "access-token")
}

/// Fall 2025 base window, Sep 1 to Nov 30.
fn seed_fall_window(db: &Database) -> SeasonKey {
    let key = SeasonKey::new(2025, Season::Fall);
    db.insert_season_window(&SeasonWindow::new(
        key,
        ts("2025-09-01T00:00:00Z"),
        ts("2025-11-30T23:59:59Z"),
    ))
    .unwrap();
    key
}

#[tokio::test]
async fn test_picks_fastest_qualifying_candidate() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);

    let source = MockSource::new();
    source.add_activity(activity(100, "2025-09-10T09:00:00Z", &[(MAIN, 100)]));
    source.add_activity(activity(101, "2025-09-17T09:00:00Z", &[(MAIN, 95)]));

    let selector = BestAttemptSelector::new(source, db.clone(), config());
    let attempt = selector.resolve(&token(), key).await.unwrap();

    assert_eq!(attempt.main_ms, 95_000);
    assert_eq!(attempt.activity_id, 101);

    let stored = db.list_current_best(&[key]).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].main_ms, 95_000);
    assert_eq!(stored[0].athlete_id, ATHLETE);
}

#[tokio::test]
async fn test_exact_tie_keeps_first_encountered() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);

    let source = MockSource::new();
    source.add_activity(activity(100, "2025-09-10T09:00:00Z", &[(MAIN, 95)]));
    source.add_activity(activity(101, "2025-09-17T09:00:00Z", &[(MAIN, 95)]));

    let selector = BestAttemptSelector::new(source, db, config());
    let attempt = selector.resolve(&token(), key).await.unwrap();

    assert_eq!(attempt.activity_id, 100);
}

#[tokio::test]
async fn test_same_activity_rule_carries_into_attempt() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);

    let source = MockSource::new();
    // Fastest ride has both climb segments but only two descent segments.
    source.add_activity(activity(
        100,
        "2025-09-10T09:00:00Z",
        &[(MAIN, 95), (2001, 60), (2002, 70), (3001, 30), (3002, 31)],
    ));

    let selector = BestAttemptSelector::new(source, db, config());
    let attempt = selector.resolve(&token(), key).await.unwrap();

    assert_eq!(attempt.climb_sum_ms, Some(130_000));
    assert_eq!(attempt.desc_sum_ms, None);
}

#[tokio::test]
async fn test_overlapping_windows_evaluate_candidates_once() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);
    // Override overlapping the base window entirely.
    db.insert_season_override(&SeasonOverride::new(
        key,
        ts("2025-09-05T00:00:00Z"),
        ts("2025-09-20T00:00:00Z"),
        None,
    ))
    .unwrap();

    let source = MockSource::new();
    source.add_activity(activity(100, "2025-09-10T09:00:00Z", &[(MAIN, 100)]));
    source.add_activity(activity(101, "2025-09-17T09:00:00Z", &[(MAIN, 95)]));

    let selector = BestAttemptSelector::new(source.clone(), db, config());
    selector.resolve(&token(), key).await.unwrap();

    // Both activities fall inside both windows yet each detail is fetched
    // exactly once.
    assert_eq!(source.detail_calls(), 2);
}

#[tokio::test]
async fn test_override_day_is_eligible() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);
    db.insert_season_override(&SeasonOverride::new(
        key,
        ts("2025-12-15T00:00:00Z"),
        ts("2025-12-16T00:00:00Z"),
        Some("makeup".to_string()),
    ))
    .unwrap();

    let source = MockSource::new();
    // Outside the base window, inside the makeup day.
    source.add_activity(activity(200, "2025-12-15T10:00:00Z", &[(MAIN, 90)]));

    let selector = BestAttemptSelector::new(source, db, config());
    let attempt = selector.resolve(&token(), key).await.unwrap();

    assert_eq!(attempt.activity_id, 200);
    assert_eq!(attempt.main_ms, 90_000);
}

#[tokio::test]
async fn test_no_season_window() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = SeasonKey::new(2025, Season::Fall);

    let selector = BestAttemptSelector::new(MockSource::new(), db, config());
    let result = selector.resolve(&token(), key).await;

    assert!(matches!(result, Err(ResolveError::NoSeasonWindow(k)) if k == key));
}

#[tokio::test]
async fn test_no_qualifying_effort() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);

    let source = MockSource::new();
    // In the window, but never rode the main loop.
    source.add_activity(activity(100, "2025-09-10T09:00:00Z", &[(2001, 60), (2002, 70)]));

    let selector = BestAttemptSelector::new(source, db, config());
    let result = selector.resolve(&token(), key).await;

    assert!(matches!(result, Err(ResolveError::NoQualifyingEffort(k)) if k == key));
}

#[tokio::test]
async fn test_window_listing_failure_degrades() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);
    db.insert_season_override(&SeasonOverride::new(
        key,
        ts("2025-12-15T00:00:00Z"),
        ts("2025-12-16T00:00:00Z"),
        None,
    ))
    .unwrap();

    let source = MockSource::new();
    // The base window's listing is down; the override window still serves.
    source.fail_listings_for_window(ts("2025-09-01T00:00:00Z"));
    source.add_activity(activity(100, "2025-09-10T09:00:00Z", &[(MAIN, 80)]));
    source.add_activity(activity(200, "2025-12-15T10:00:00Z", &[(MAIN, 90)]));

    let selector = BestAttemptSelector::new(source, db, config());
    let attempt = selector.resolve(&token(), key).await.unwrap();

    // The unreachable window contributed no candidates, but resolution
    // still succeeded from the other window.
    assert_eq!(attempt.activity_id, 200);
}

#[tokio::test]
async fn test_detail_failure_drops_candidate() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);

    let source = MockSource::new();
    source.add_activity(activity(100, "2025-09-10T09:00:00Z", &[(MAIN, 80)]));
    source.add_activity(activity(101, "2025-09-17T09:00:00Z", &[(MAIN, 95)]));
    // The would-be winner can't be fetched.
    source.fail_detail(100);

    let selector = BestAttemptSelector::new(source, db, config());
    let attempt = selector.resolve(&token(), key).await.unwrap();

    assert_eq!(attempt.activity_id, 101);
}

#[tokio::test]
async fn test_expired_token_aborts() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);

    let source = MockSource::new();
    source.add_activity(activity(100, "2025-09-10T09:00:00Z", &[(MAIN, 80)]));
    source.set_token_expired();

    let selector = BestAttemptSelector::new(source, db, config());
    let result = selector.resolve(&token(), key).await;

    assert!(matches!(result, Err(ResolveError::Credential(_))));
}

#[tokio::test]
async fn test_forced_activity_requires_enablement() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);

    let source = MockSource::new();
    source.add_activity(activity(300, "2025-09-10T09:00:00Z", &[(MAIN, 120)]));

    let selector = BestAttemptSelector::new(source, db, config());
    let result = selector.resolve_forced(&token(), key, 300).await;

    assert!(matches!(result, Err(ResolveError::ForcedDisabled)));
}

#[tokio::test]
async fn test_forced_activity_bypasses_enumeration() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);

    let mut config = config();
    config.allow_forced_activity = true;

    let source = MockSource::new();
    // Faster candidate exists in the window, but the forced activity wins
    // because enumeration is bypassed.
    source.add_activity(activity(100, "2025-09-10T09:00:00Z", &[(MAIN, 80)]));
    source.add_activity(activity(300, "2025-09-12T09:00:00Z", &[(MAIN, 120)]));

    let selector = BestAttemptSelector::new(source, db.clone(), config);
    let attempt = selector.resolve_forced(&token(), key, 300).await.unwrap();

    assert_eq!(attempt.activity_id, 300);
    assert_eq!(db.list_current_best(&[key]).unwrap()[0].activity_id, 300);
}

#[tokio::test]
async fn test_reresolution_overwrites_unconditionally() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);

    let source = MockSource::new();
    source.add_activity(activity(100, "2025-09-10T09:00:00Z", &[(MAIN, 80)]));

    let selector = BestAttemptSelector::new(source.clone(), db.clone(), config());
    selector.resolve(&token(), key).await.unwrap();

    // The fast ride disappears upstream (rider deleted it); the rerun
    // stores the slower remaining ride.
    source.fail_detail(100);
    source.add_activity(activity(101, "2025-09-17T09:00:00Z", &[(MAIN, 95)]));
    selector.resolve(&token(), key).await.unwrap();

    let stored = db.list_current_best(&[key]).unwrap();
    assert_eq!(stored[0].activity_id, 101);
    assert_eq!(stored[0].main_ms, 95_000);
}

#[tokio::test]
async fn test_bonus_efforts_recorded_across_candidates() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let key = seed_fall_window(&db);

    let source = MockSource::new();
    // Climb segments ridden in two different activities; one of them has
    // no main-loop effort at all.
    source.add_activity(activity(100, "2025-09-10T09:00:00Z", &[(MAIN, 95), (2001, 60)]));
    source.add_activity(activity(101, "2025-09-17T09:00:00Z", &[(2002, 70)]));

    let selector = BestAttemptSelector::new(source, db.clone(), config());
    let attempt = selector.resolve(&token(), key).await.unwrap();

    // Same-activity rule: the stored attempt has no climb sum.
    assert_eq!(attempt.climb_sum_ms, None);

    // Both observations are available to the aggregation layer.
    let efforts = db.list_season_efforts(&[key]).unwrap();
    assert_eq!(efforts.len(), 2);
    let total: u32 = efforts.iter().map(|e| e.elapsed_ms).sum();
    assert_eq!(total, 130_000);
}
