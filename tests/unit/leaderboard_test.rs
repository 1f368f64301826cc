//! Unit tests for leaderboard aggregation.

use chrono::Utc;
use std::sync::Arc;

use looptrial::attempts::{Attempt, SeasonEffort};
use looptrial::config::CourseConfig;
use looptrial::seasons::{Season, SeasonKey};
use looptrial::storage::Rider;
use looptrial::{Database, LeaderboardAggregator};

fn config() -> CourseConfig {
    CourseConfig {
        main_segment_id: 1001,
        climb_segment_ids: vec![2001, 2002],
        descent_segment_ids: vec![3001, 3002, 3003],
        history_start: "2014-09-01T00:00:00Z".parse().unwrap(),
        allow_forced_activity: false,
        base_url: String::new(),
    }
}

fn setup() -> (Arc<Database>, LeaderboardAggregator) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let aggregator = LeaderboardAggregator::new(db.clone(), config());
    (db, aggregator)
}

fn add_rider(db: &Database, athlete_id: i64, name: &str, consent: bool) {
    db.insert_rider(&Rider {
        athlete_id,
        display_name: name.to_string(),
        public_consent: consent,
        created_at: Utc::now(),
    })
    .unwrap();
}

fn add_attempt(db: &Database, athlete_id: i64, key: SeasonKey, main_ms: u32) {
    db.upsert_current_best(&Attempt {
        athlete_id,
        season_key: key,
        activity_id: athlete_id * 1000 + key.season as i64,
        main_ms,
        climb_sum_ms: None,
        desc_sum_ms: None,
        resolved_at: Utc::now(),
    })
    .unwrap();
}

fn add_effort(db: &Database, athlete_id: i64, key: SeasonKey, segment_id: i64, elapsed_ms: u32) {
    db.record_season_effort(&SeasonEffort {
        athlete_id,
        season_key: key,
        segment_id,
        activity_id: 9000 + segment_id,
        elapsed_ms,
    })
    .unwrap();
}

// Race year 2025 season keys.
fn fall() -> SeasonKey {
    SeasonKey::new(2024, Season::Fall)
}
fn winter() -> SeasonKey {
    SeasonKey::new(2024, Season::Winter)
}
fn spring() -> SeasonKey {
    SeasonKey::new(2025, Season::Spring)
}
fn summer() -> SeasonKey {
    SeasonKey::new(2025, Season::Summer)
}

#[test]
fn test_overall_totals_and_best_season() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);
    add_attempt(&db, 1, fall(), 6_000_000);
    add_attempt(&db, 1, winter(), 5_000_000);

    let rows = aggregator.overall(2025).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_ms, 11_000_000);
    assert_eq!(rows[0].best_season_ms, 5_000_000);
    assert_eq!(rows[0].seasons.len(), 2);
}

#[test]
fn test_overall_sorted_ascending_by_total() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);
    add_rider(&db, 2, "Grace", true);
    add_attempt(&db, 1, fall(), 6_000_000);
    add_attempt(&db, 2, fall(), 5_500_000);

    let rows = aggregator.overall(2025).unwrap();
    assert_eq!(rows[0].display_name, "Grace");
    assert_eq!(rows[1].display_name, "Ada");
}

#[test]
fn test_overall_excludes_non_consenting_riders() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);
    add_rider(&db, 2, "Grace", false);
    add_attempt(&db, 1, fall(), 6_000_000);
    add_attempt(&db, 2, fall(), 5_500_000);

    let rows = aggregator.overall(2025).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].athlete_id, 1);
}

#[test]
fn test_overall_excludes_other_race_years() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);
    // Fall 2025 belongs to race year 2026.
    add_attempt(&db, 1, SeasonKey::new(2025, Season::Fall), 6_000_000);

    assert!(aggregator.overall(2025).unwrap().is_empty());
    assert_eq!(aggregator.overall(2026).unwrap().len(), 1);
}

#[test]
fn test_overall_reports_bonus_sums_per_season() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);

    db.upsert_current_best(&Attempt {
        athlete_id: 1,
        season_key: fall(),
        activity_id: 100,
        main_ms: 6_000_000,
        climb_sum_ms: Some(130_000),
        desc_sum_ms: None,
        resolved_at: Utc::now(),
    })
    .unwrap();
    db.upsert_current_best(&Attempt {
        athlete_id: 1,
        season_key: spring(),
        activity_id: 101,
        main_ms: 5_800_000,
        climb_sum_ms: None,
        desc_sum_ms: Some(93_000),
        resolved_at: Utc::now(),
    })
    .unwrap();

    let rows = aggregator.overall(2025).unwrap();
    let seasons = &rows[0].seasons;
    assert_eq!(seasons[&fall()].climb_sum_ms, Some(130_000));
    assert_eq!(seasons[&fall()].desc_sum_ms, None);
    assert_eq!(seasons[&spring()].climb_sum_ms, None);
    assert_eq!(seasons[&spring()].desc_sum_ms, Some(93_000));
}

#[test]
fn test_climbing_allows_cross_activity_sums() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);

    // Qualifying main-loop attempt in fall, climb segments ridden in two
    // different activities that same season.
    add_attempt(&db, 1, fall(), 6_000_000);
    add_effort(&db, 1, fall(), 2001, 60_000);
    add_effort(&db, 1, fall(), 2002, 70_000);

    let rows = aggregator.climbing(2025).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].seasons[&fall()], 130_000);
    assert_eq!(rows[0].total_ms, 130_000);
}

#[test]
fn test_climbing_requires_both_segments() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);
    add_attempt(&db, 1, fall(), 6_000_000);
    add_effort(&db, 1, fall(), 2001, 60_000);

    assert!(aggregator.climbing(2025).unwrap().is_empty());
}

#[test]
fn test_climbing_requires_loop_completion_same_season() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);

    // Main loop completed in winter, climbs ridden in fall: the fall
    // season fails the gate and the winter season has no climbs.
    add_attempt(&db, 1, winter(), 6_000_000);
    add_effort(&db, 1, fall(), 2001, 60_000);
    add_effort(&db, 1, fall(), 2002, 70_000);

    assert!(aggregator.climbing(2025).unwrap().is_empty());
}

#[test]
fn test_descending_allows_partial_group() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);
    add_attempt(&db, 1, fall(), 6_000_000);
    // One of three descent segments is enough.
    add_effort(&db, 1, fall(), 3001, 30_000);

    let rows = aggregator.descending(2025).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].seasons[&fall()], 30_000);

    // Riding a second descent segment adds to the sum.
    add_effort(&db, 1, fall(), 3002, 31_000);
    let rows = aggregator.descending(2025).unwrap();
    assert_eq!(rows[0].seasons[&fall()], 61_000);
}

#[test]
fn test_descending_excludes_riders_with_no_qualifying_season() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);
    // Descent efforts but never a completed loop.
    add_effort(&db, 1, fall(), 3001, 30_000);

    assert!(aggregator.descending(2025).unwrap().is_empty());
}

#[test]
fn test_bonus_views_sorted_by_total() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);
    add_rider(&db, 2, "Grace", true);
    for id in [1, 2] {
        add_attempt(&db, id, fall(), 6_000_000);
    }
    add_effort(&db, 1, fall(), 2001, 65_000);
    add_effort(&db, 1, fall(), 2002, 70_000);
    add_effort(&db, 2, fall(), 2001, 60_000);
    add_effort(&db, 2, fall(), 2002, 70_000);

    let rows = aggregator.climbing(2025).unwrap();
    assert_eq!(rows[0].display_name, "Grace");
    assert_eq!(rows[1].display_name, "Ada");
}

#[test]
fn test_legacy_full_year_bonus() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);
    // Four seasons; best three sum to 10800s, minus the 600s bonus.
    add_attempt(&db, 1, fall(), 3_600_000);
    add_attempt(&db, 1, winter(), 3_600_000);
    add_attempt(&db, 1, spring(), 3_600_000);
    add_attempt(&db, 1, summer(), 4_000_000);

    let rows = aggregator.legacy(2025).unwrap();
    assert_eq!(rows[0].final_ms, Some(10_200_000));
}

#[test]
fn test_legacy_three_seasons_no_bonus() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);
    add_attempt(&db, 1, fall(), 3_600_000);
    add_attempt(&db, 1, winter(), 3_600_000);
    add_attempt(&db, 1, spring(), 3_600_000);

    let rows = aggregator.legacy(2025).unwrap();
    assert_eq!(rows[0].final_ms, Some(10_800_000));
}

#[test]
fn test_legacy_dnf_riders_sort_last() {
    let (db, aggregator) = setup();
    add_rider(&db, 1, "Ada", true);
    add_rider(&db, 2, "Grace", true);
    add_rider(&db, 3, "Margaret", true);
    add_attempt(&db, 1, fall(), 3_600_000);
    add_attempt(&db, 3, fall(), 3_500_000);

    let rows = aggregator.legacy(2025).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].display_name, "Margaret");
    assert_eq!(rows[1].display_name, "Ada");
    // Zero completed seasons: shown, but after every scored rider.
    assert_eq!(rows[2].display_name, "Grace");
    assert_eq!(rows[2].final_ms, None);
}
