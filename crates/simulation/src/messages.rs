//! Outbound city events: advisor messages, sounds and change notifications.
//!
//! Everything here is a Bevy `Event`. Callers drain the queues through the
//! `City` facade whenever they like; events nobody drains are trimmed to the
//! newest `MAX_PENDING_EVENTS` at the end of every advance.

use bevy::prelude::*;

use crate::grid::GridPos;

/// Undrained events kept per queue.
pub const MAX_PENDING_EVENTS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CityMessage {
    NeedRes,
    NeedCom,
    NeedInd,
    NeedRoads,
    NeedRails,
    NeedPower,
    NeedStadium,
    NeedSeaport,
    NeedAirport,
    HighPollution,
    HighCrime,
    HighTraffic,
    NeedFireStation,
    NeedPolice,
    Blackouts,
    HighTaxes,
    RoadsNeedFunding,
    FireNeedFunding,
    PoliceNeedFunding,
    FireReport,
    MonsterReport,
    TornadoReport,
    EarthquakeReport,
    PlaneCrash,
    Shipwreck,
    TrainCrash,
    CopterCrash,
    HighUnemployment,
    OutOfFunds,
    FirebombingReport,
    NeedParks,
    ExplosionReport,
    InsufficientFunds,
    BulldozeFirst,
    Pop2kReached,
    Pop10kReached,
    Pop50kReached,
    Pop100kReached,
    Pop500kReached,
    BrownoutsReport,
    HeavyTrafficReport,
    FloodReport,
    MeltdownReport,
    RiotingReport,
    NoNuclearPlants,
}

impl CityMessage {
    /// Disaster and population-milestone messages deserve the player's
    /// immediate attention rather than a line in the message log.
    pub fn is_important(self) -> bool {
        matches!(
            self,
            CityMessage::FireReport
                | CityMessage::MonsterReport
                | CityMessage::TornadoReport
                | CityMessage::EarthquakeReport
                | CityMessage::PlaneCrash
                | CityMessage::Shipwreck
                | CityMessage::TrainCrash
                | CityMessage::CopterCrash
                | CityMessage::FirebombingReport
                | CityMessage::ExplosionReport
                | CityMessage::FloodReport
                | CityMessage::MeltdownReport
                | CityMessage::RiotingReport
                | CityMessage::Pop2kReached
                | CityMessage::Pop10kReached
                | CityMessage::Pop50kReached
                | CityMessage::Pop100kReached
                | CityMessage::Pop500kReached
        )
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CityMessageEvent {
    pub message: CityMessage,
    pub location: Option<GridPos>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    ExplosionLow,
    ExplosionHigh,
    ExplosionBoth,
    UhUh,
    Sorry,
    Build,
    Bulldoze,
    HonkHonkLow,
    HonkHonkMed,
    HonkHonkHigh,
    Siren,
    HeavyTraffic,
    Monster,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CitySoundEvent {
    pub sound: Sound,
    pub location: GridPos,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CityNotification {
    CensusChanged,
    DemandChanged,
    EvaluationChanged,
    FundsChanged,
    OptionsChanged,
    /// Some tiles changed during the last advance.
    MapChanged,
    /// A single tile changed outside the simulation (tool commit).
    TileChanged(GridPos),
    SpriteMoved,
    EarthquakeStarted,
}

pub struct MessagesPlugin;

impl Plugin for MessagesPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<CityMessageEvent>()
            .add_event::<CitySoundEvent>()
            .add_event::<CityNotification>();
    }
}

/// Drop the oldest undrained events past `MAX_PENDING_EVENTS`. Nothing in
/// the headless app runs Bevy's own event update, so this is the only thing
/// bounding a queue the caller never drains.
pub fn trim_pending<E: Event>(mut events: ResMut<Events<E>>) {
    let excess = events.len().saturating_sub(MAX_PENDING_EVENTS);
    if excess == 0 {
        return;
    }
    let kept: Vec<E> = events.drain().skip(excess).collect();
    events.send_batch(kept);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disasters_are_important() {
        assert!(CityMessage::EarthquakeReport.is_important());
        assert!(CityMessage::Pop10kReached.is_important());
        assert!(!CityMessage::NeedRoads.is_important());
        assert!(!CityMessage::BrownoutsReport.is_important());
    }

    #[test]
    fn test_events_round_trip_through_world() {
        let mut app = App::new();
        app.add_plugins(MessagesPlugin);
        app.world_mut().send_event(CityMessageEvent {
            message: CityMessage::NeedPower,
            location: None,
        });
        let drained: Vec<_> = app
            .world_mut()
            .resource_mut::<Events<CityMessageEvent>>()
            .drain()
            .collect();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].message, CityMessage::NeedPower);
    }

    #[test]
    fn test_trim_keeps_newest_events() {
        let mut app = App::new();
        app.add_plugins(MessagesPlugin);
        app.add_systems(Update, trim_pending::<CitySoundEvent>);
        for x in 0..(MAX_PENDING_EVENTS as i32 + 40) {
            app.world_mut().send_event(CitySoundEvent {
                sound: Sound::Build,
                location: GridPos::new(x, 0),
            });
        }
        app.world_mut().run_schedule(Update);

        let kept: Vec<_> = app
            .world_mut()
            .resource_mut::<Events<CitySoundEvent>>()
            .drain()
            .collect();
        assert_eq!(kept.len(), MAX_PENDING_EVENTS);
        assert_eq!(kept[0].location, GridPos::new(40, 0));
        assert_eq!(
            kept.last().map(|e| e.location),
            Some(GridPos::new(MAX_PENDING_EVENTS as i32 + 39, 0))
        );
    }

    #[test]
    fn test_trim_leaves_short_queue_alone() {
        let mut app = App::new();
        app.add_plugins(MessagesPlugin);
        app.add_systems(Update, trim_pending::<CityMessageEvent>);
        app.world_mut().send_event(CityMessageEvent {
            message: CityMessage::NeedRoads,
            location: None,
        });
        app.world_mut().run_schedule(Update);
        assert_eq!(app.world().resource::<Events<CityMessageEvent>>().len(), 1);
    }
}
