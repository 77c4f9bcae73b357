use crate::disasters::FLOOD_WEEKS;
use crate::messages::CityMessage;
use crate::sprites::SpriteKind;
use crate::test_harness::TestCity;
use crate::tile_constants::{FIRE, FIRSTRIVEDGE, FLOOD, RADTILE};
use crate::tools::Tool;

#[test]
fn test_meltdown_needs_a_nuclear_plant() {
    let mut city = TestCity::new();
    assert!(!city.city_mut().make_meltdown());
    assert!(city.saw_message(CityMessage::NoNuclearPlants));
}

#[test]
fn test_meltdown_burns_the_plant_and_spreads_fallout() {
    let mut city = TestCity::new().with_tool(Tool::Nuclear, 30, 30);
    assert!(city.city_mut().make_meltdown());
    city.assert_tile_in(30, 30, FIRE, FIRE + 3);
    assert!(city.count_tiles(|t| t == RADTILE) > 0);
    assert!(city.saw_message(CityMessage::MeltdownReport));
}

#[test]
fn test_flood_starts_beside_the_river() {
    // every other row is bank, so each bank tile has dry land beside it
    let mut city = TestCity::new();
    for y in (0..64).step_by(2) {
        city = city.with_tile_rect(0, y, 64, 1, FIRSTRIVEDGE);
    }
    let Some(at) = city.city_mut().make_flood() else {
        panic!("expected a flood next to the bank");
    };
    city.assert_tile(at.x, at.y, FLOOD);
    assert_eq!(city.city().disaster_state().flood_count, FLOOD_WEEKS);
    assert!(city.saw_message(CityMessage::FloodReport));
}

#[test]
fn test_flood_on_dry_land_finds_nothing() {
    let mut city = TestCity::new();
    assert!(city.city_mut().make_flood().is_none());
}

#[test]
fn test_tornado_appears_and_reports() {
    let mut city = TestCity::new();
    city.city_mut().make_tornado();
    assert!(city.city().sprites().has(SpriteKind::Tornado));
    assert!(city.saw_message(CityMessage::TornadoReport));
}

#[test]
fn test_earthquake_on_empty_map_only_reports() {
    let mut city = TestCity::new();
    city.city_mut().make_earthquake();
    assert!(city.saw_message(CityMessage::EarthquakeReport));
    assert_eq!(city.count_tiles(|t| t != 0), 0);
}
