use crate::test_harness::TestCity;
use crate::tools::Tool;

#[test]
fn test_starter_town_zones_get_power() {
    let mut city = TestCity::new().with_starter_town();
    city.tick_weeks(3);
    city.assert_powered(12, 5);
    city.assert_powered(15, 5);
    city.assert_powered(18, 5);
    city.assert_powered(21, 5);
    assert!(city.city().power_map().has_power(10, 5));
}

#[test]
fn test_unwired_zone_stays_dark() {
    let mut city = TestCity::new()
        .with_tool(Tool::PowerPlant, 5, 5)
        .with_tool(Tool::Residential, 30, 30);
    city.tick_weeks(3);
    city.assert_unpowered(30, 30);
    assert!(!city.city().power_map().has_power(30, 30));
}

#[test]
fn test_census_counts_starter_town_plant_and_zones() {
    let mut city = TestCity::new().with_starter_town();
    // a week plus ten phases: past the scan bands, before the next reset
    city.tick(32 + 20);
    let census = city.census();
    assert_eq!(census.coal_count, 1);
    assert_eq!(census.res_zone_count, 2);
    assert_eq!(census.com_zone_count, 1);
    assert_eq!(census.ind_zone_count, 1);
}

#[test]
fn test_cutting_the_wire_drops_power() {
    let mut city = TestCity::new().with_starter_town();
    city.tick_weeks(3);
    city.assert_powered(12, 5);

    city = city.with_tool(Tool::Bulldozer, 9, 5);
    city.tick_weeks(3);
    city.assert_unpowered(12, 5);
}
