//! Frame simulation module
//!
//! All gameplay logic lives here. Nothing in it talks to a graphics backend
//! or reads the clock:
//! - Time comes in as one monotonic sample per tick
//! - Randomness comes through a seedable `RandomSource`
//! - Pools keep insertion order and hand out stable snapshots

pub mod collision;
pub mod coords;
pub mod pool;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{CollisionOutcome, hits_player, resolve_collisions};
pub use coords::{Category, CoordinateData};
pub use pool::{Pool, Snapshot};
pub use spawn::{PcgRandom, RandomSource, ScriptedRandom};
pub use state::{
    ActiveEffect, Asteroid, Explosion, FrameView, GameState, Invincibility, Pickup, PickupKind,
    Player, PlayerPosition, PlayerVariant, ScoreText, SessionFlags,
};
pub use tick::{TickContext, TickReport, tick};
