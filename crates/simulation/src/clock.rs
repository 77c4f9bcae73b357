//! Simulation counters and the phase run condition.
//!
//! One `advance()` bumps `acycle`. Every second advance also bumps `fcycle`
//! and runs the phase `fcycle % 16`; sprites and tile animation move on every
//! advance regardless.

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::config::TAX_FREQ;

/// Number of phases in one simulated week.
pub const PHASES: u16 = 16;

/// Advances per full sixteen-phase week.
pub const ADVANCES_PER_WEEK: u32 = PHASES as u32 * 2;

#[derive(Resource, Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct SimClock {
    /// Animation cycle, mod 960.
    pub acycle: u16,
    /// Simulation step, mod 1024.
    pub fcycle: u16,
    /// Same cadence as `city_time`, mod 1024.
    pub scycle: u16,
    /// Weeks since founding. 48 make a year.
    pub city_time: i32,
    /// Set by `tick_clock` when this advance runs a phase.
    pub stepped: bool,
}

impl SimClock {
    /// Phase run by the current advance, if any.
    pub fn phase(&self) -> Option<u16> {
        self.stepped.then_some(self.fcycle % PHASES)
    }

    /// True between the yearly tax collection (phase 9) and the phase after it.
    pub fn is_budget_time(&self) -> bool {
        self.city_time != 0
            && self.city_time % TAX_FREQ == 0
            && (self.fcycle + 1) % PHASES == 10
            && (self.acycle + 1) % 2 == 0
    }

    pub fn year(&self) -> i32 {
        self.city_time / TAX_FREQ + 1900
    }

    /// Month index 0..12.
    pub fn month(&self) -> i32 {
        (self.city_time % TAX_FREQ) / 4
    }

    /// Advance the animation counter and decide whether a phase runs.
    pub fn tick(&mut self) {
        self.acycle = (self.acycle + 1) % 960;
        self.stepped = self.acycle % 2 == 0;
        if self.stepped {
            self.fcycle = (self.fcycle + 1) % 1024;
        }
    }

    /// Start of a new week (phase 0).
    pub fn new_week(&mut self) {
        self.scycle = (self.scycle + 1) % 1024;
        self.city_time += 1;
    }
}

impl crate::Saveable for SimClock {
    const SAVE_KEY: &'static str = "sim_clock";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

/// Run condition: the current advance runs phase `n`.
pub fn in_phase(n: u16) -> impl FnMut(Res<SimClock>) -> bool + Clone {
    move |clock: Res<SimClock>| clock.phase() == Some(n)
}

/// Run condition: the current advance runs a phase at all.
pub fn stepped(clock: Res<SimClock>) -> bool {
    clock.stepped
}

pub(crate) fn tick_clock(mut clock: ResMut<SimClock>) {
    clock.tick();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_every_other_tick() {
        let mut clock = SimClock::default();
        clock.tick();
        assert_eq!(clock.acycle, 1);
        assert_eq!(clock.phase(), None);
        clock.tick();
        assert_eq!(clock.acycle, 2);
        assert_eq!(clock.fcycle, 1);
        assert_eq!(clock.phase(), Some(1));
    }

    #[test]
    fn test_counters_wrap() {
        let mut clock = SimClock {
            acycle: 959,
            fcycle: 1023,
            ..Default::default()
        };
        clock.tick();
        assert_eq!(clock.acycle, 0);
        assert_eq!(clock.fcycle, 0);
        assert_eq!(clock.phase(), Some(0));
    }

    #[test]
    fn test_budget_time_alignment() {
        let clock = SimClock {
            acycle: 17,
            fcycle: 9,
            city_time: 48,
            ..Default::default()
        };
        assert!(clock.is_budget_time());

        let early = SimClock {
            acycle: 16,
            ..clock.clone()
        };
        assert!(!early.is_budget_time());

        let wrong_week = SimClock {
            city_time: 47,
            ..clock.clone()
        };
        assert!(!wrong_week.is_budget_time());

        let founding = SimClock {
            city_time: 0,
            ..clock
        };
        assert!(!founding.is_budget_time());
    }

    #[test]
    fn test_new_week() {
        let mut clock = SimClock {
            scycle: 1023,
            city_time: 95,
            ..Default::default()
        };
        clock.new_week();
        assert_eq!(clock.scycle, 0);
        assert_eq!(clock.city_time, 96);
        assert_eq!(clock.year(), 1902);
        assert_eq!(clock.month(), 0);
    }
}
