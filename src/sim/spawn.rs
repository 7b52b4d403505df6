//! Spawn policy for asteroids and pickups
//!
//! All randomness goes through [`RandomSource`] so spawning can be seeded or
//! scripted.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::state::{Asteroid, GameState, Pickup, PickupKind};
use crate::tuning::Tuning;

/// Uniform random numbers in [0, 1)
pub trait RandomSource: Send {
    fn next_unit(&mut self) -> f32;
}

/// Seeded PCG generator
#[derive(Debug, Clone)]
pub struct PcgRandom {
    rng: Pcg32,
}

impl PcgRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl RandomSource for PcgRandom {
    fn next_unit(&mut self) -> f32 {
        self.rng.random::<f32>()
    }
}

/// Replays a fixed sequence of draws, cycling when it runs out
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f32>,
    index: usize,
}

impl ScriptedRandom {
    pub fn new(values: Vec<f32>) -> Self {
        debug_assert!(!values.is_empty(), "scripted random needs at least one value");
        Self { values, index: 0 }
    }

    /// A source whose every draw is `value`
    pub fn constant(value: f32) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f32 {
        let Some(&value) = self.values.get(self.index % self.values.len().max(1)) else {
            return 0.0;
        };
        self.index = self.index.wrapping_add(1);
        value
    }
}

/// Horizontal spawn position, pulled away from the outer margins.
///
/// Draws inside either margin are folded into `[margin, margin + remap_width)`
/// using the same draw.
pub fn spawn_x(rng: &mut dyn RandomSource, tuning: &Tuning) -> f32 {
    let x = rng.next_unit();
    let margin = tuning.spawn_edge_margin;
    if x < margin || x > 1.0 - margin {
        margin + x * tuning.spawn_remap_width
    } else {
        x
    }
}

/// Fall speed, mostly slow with an occasional fast one
pub fn spawn_speed(rng: &mut dyn RandomSource, tuning: &Tuning) -> f32 {
    let r = rng.next_unit();
    if r < tuning.fast_speed_chance {
        r / tuning.fast_speed_divisor
    } else {
        r / tuning.slow_speed_divisor
    }
}

/// Maybe spawn one asteroid. Returns true if one was added.
pub fn spawn_asteroid(state: &mut GameState, rng: &mut dyn RandomSource, tuning: &Tuning) -> bool {
    if !state.asteroids.has_room() {
        return false;
    }
    if rng.next_unit() >= tuning.asteroid_spawn_chance {
        return false;
    }

    let x = spawn_x(rng, tuning);
    let speed = spawn_speed(rng, tuning);
    let added = state.asteroids.push(Asteroid {
        pos: Vec2::new(x, tuning.spawn_y),
        speed,
    });
    if added {
        log::debug!("Spawned asteroid at x={x:.3} speed={speed:.4}");
    }
    added
}

/// Maybe spawn one pickup. Kind follows the spawn side: right half accelerates.
pub fn spawn_pickup(state: &mut GameState, rng: &mut dyn RandomSource, tuning: &Tuning) -> bool {
    if !state.pickups.has_room() {
        return false;
    }
    if rng.next_unit() >= tuning.pickup_spawn_chance {
        return false;
    }

    let x = spawn_x(rng, tuning);
    let kind = if x > 0.5 {
        PickupKind::Accelerate
    } else {
        PickupKind::Freeze
    };
    let speed = spawn_speed(rng, tuning);
    let added = state.pickups.push(Pickup {
        pos: Vec2::new(x, tuning.spawn_y),
        speed,
        kind,
    });
    if added {
        log::debug!("Spawned {kind:?} pickup at x={x:.3}");
    }
    added
}
