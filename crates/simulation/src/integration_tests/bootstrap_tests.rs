use crate::test_harness::{TestCity, TEST_MAP_SIZE};
use crate::tile_constants::DIRT;

#[test]
fn test_empty_city_is_all_dirt() {
    let city = TestCity::new();
    let cells = TEST_MAP_SIZE * TEST_MAP_SIZE;
    assert_eq!(city.count_tiles(|t| t == DIRT), cells);
    city.assert_funds(100_000);
    city.assert_city_time(0);
}

#[test]
fn test_weeks_advance_city_time() {
    let mut city = TestCity::new();
    city.tick_weeks(2);
    city.assert_city_time(2);
    assert_eq!(city.clock().fcycle, 32);
}

#[test]
fn test_odd_advance_runs_no_phase() {
    let mut city = TestCity::new();
    city.tick(1);
    assert!(!city.clock().stepped);
    city.tick(1);
    assert_eq!(city.clock().phase(), Some(1));
}

#[test]
fn test_empty_city_stays_empty() {
    let mut city = TestCity::new();
    city.tick_weeks(4);
    let cells = TEST_MAP_SIZE * TEST_MAP_SIZE;
    assert_eq!(city.count_tiles(|t| t == DIRT), cells);
    city.assert_population_between(0, 0);
}

#[test]
fn test_first_budget_arrives_after_a_year() {
    let mut city = TestCity::new();
    assert!(city.city_mut().run_until_budget(48 * 32 + 64));
    city.assert_city_time(48);
    assert_eq!(city.clock().year(), 1901);
}

#[test]
fn test_generated_terrain_is_not_bare() {
    let city = TestCity::with_terrain(7);
    let cells = TEST_MAP_SIZE * TEST_MAP_SIZE;
    assert!(city.count_tiles(|t| t == DIRT) < cells);
}
