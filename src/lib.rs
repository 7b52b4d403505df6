//! Meteor Flash - top-down arcade asteroid game core
//!
//! Core modules:
//! - `sim`: Frame simulation (spawning, motion, collisions, timers)
//! - `renderer`: Offscreen render pipeline and graphics backend seam
//! - `game`: Controller driving one frame per host callback
//! - `tuning`: Data-driven game balance
//! - `clock`: Monotonic time sources

pub mod clock;
pub mod error;
pub mod game;
pub mod renderer;
pub mod sim;
pub mod tuning;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::{AssetError, RenderError, TuningError};
pub use game::GameController;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Maximum concurrent asteroids
    pub const ASTEROID_CAP: usize = 12;
    /// Maximum concurrent pickups
    pub const PICKUP_CAP: usize = 1;

    /// Per-tick spawn probabilities
    pub const ASTEROID_SPAWN_CHANCE: f32 = 0.2;
    pub const PICKUP_SPAWN_CHANCE: f32 = 0.1;

    /// Entities spawn just above the top edge
    pub const SPAWN_Y: f32 = 1.2;
    /// Anything below this is pruned
    pub const DESPAWN_Y: f32 = -0.2;
    /// Spawns with x inside this margin of either edge get remapped
    pub const SPAWN_EDGE_MARGIN: f32 = 0.2;
    /// Width of the band that edge spawns are remapped into
    pub const SPAWN_REMAP_WIDTH: f32 = 0.5;

    /// Speed draws below this are "fast" asteroids
    pub const FAST_SPEED_CHANCE: f32 = 0.05;
    pub const FAST_SPEED_DIVISOR: f32 = 10.0;
    pub const SLOW_SPEED_DIVISOR: f32 = 50.0;

    /// Freeze/accelerate duration
    pub const EFFECT_DURATION_MS: u64 = 3000;
    /// Explosion lifetime
    pub const EXPLOSION_LIFETIME_MS: u64 = 1000;
    /// Asteroid speed multiplier while accelerate is active
    pub const ACCELERATE_MULTIPLIER: f32 = 2.0;

    /// Edge overlay fade per tick
    pub const OVERLAY_DECAY: f32 = 0.02;
    /// Screen fraction covered by the overlay falloff
    pub const OVERLAY_EDGE_BAND: f32 = 0.05;
}
