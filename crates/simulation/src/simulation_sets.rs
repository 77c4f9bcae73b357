//! Deterministic ordering of one `advance()` via `SystemSet` phases.
//!
//! Every system in `FixedUpdate` belongs to one of these sets, and the sets
//! run as a chain:
//!
//! ```text
//! PreSim  →  Simulation  →  PostSim
//! ```
//!
//! * **PreSim** – queued tool strokes are committed, then the clock ticks and
//!   decides whether this advance runs a phase.
//! * **Simulation** – the sixteen phases of the week. Each system carries an
//!   `in_phase(n)` run condition, so at most one phase's systems run per
//!   advance.
//! * **PostSim** – sprites move, tiles animate and the map-changed
//!   notification goes out. These run on every advance.

use bevy::prelude::*;

/// Ordered phases for systems running in the `FixedUpdate` schedule.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Tool commits and the clock tick.
    PreSim,
    /// The phase selected by `fcycle % 16`.
    Simulation,
    /// Sprite movement, tile animation and change notification.
    PostSim,
}
