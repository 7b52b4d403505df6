//! Per-frame simulation tick
//!
//! One tick runs, in order: spawn asteroids, move/prune asteroids, spawn
//! pickups, move/prune pickups, asteroid collisions, pickup collisions, then
//! timers (explosions, invincibility) and overlay decay. Collisions therefore
//! see this tick's positions, and fresh spawns (at the top edge) are not tested
//! until they have moved.

use std::time::Duration;

use super::collision::{CollisionOutcome, resolve_collisions};
use super::coords::CoordinateData;
use super::spawn::{RandomSource, spawn_asteroid, spawn_pickup};
use super::state::{GameState, PickupKind};
use crate::tuning::Tuning;

/// Everything a tick needs from outside the state
pub struct TickContext<'a> {
    /// Unit sizes for this frame
    pub coords: &'a CoordinateData,
    pub tuning: &'a Tuning,
    /// Monotonic time sampled once for the whole tick
    pub now: Duration,
}

/// What happened during a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub asteroid_spawned: bool,
    pub pickup_spawned: bool,
    pub asteroids_pruned: usize,
    pub pickups_pruned: usize,
    pub collisions: CollisionOutcome,
    pub explosions_expired: usize,
}

/// Drop the freeze/accelerate effect once its duration has elapsed
pub fn expire_effects(state: &mut GameState, now: Duration, tuning: &Tuning) {
    let duration = Duration::from_millis(tuning.effect_duration_ms);
    if let Some(effect) = state.flags.active_effect {
        if effect.is_expired(now, duration) {
            log::debug!("{:?} effect ended", effect.kind);
            state.flags.active_effect = None;
        }
    }
}

/// Per-tick asteroid displacement under the current effect
pub fn asteroid_step(speed: f32, effect: Option<PickupKind>, tuning: &Tuning) -> f32 {
    match effect {
        Some(PickupKind::Freeze) => 0.0,
        Some(PickupKind::Accelerate) => speed * tuning.accelerate_multiplier,
        None => speed,
    }
}

/// Move asteroids down and prune the ones below the despawn line
pub fn move_asteroids(state: &mut GameState, now: Duration, tuning: &Tuning) -> usize {
    expire_effects(state, now, tuning);
    let effect = state.flags.active_effect.map(|e| e.kind);

    if effect != Some(PickupKind::Freeze) {
        for asteroid in state.asteroids.iter_mut() {
            asteroid.pos.y -= asteroid_step(asteroid.speed, effect, tuning);
        }
    }

    // `>=` also drops NaN positions
    let despawn_y = tuning.despawn_y;
    state.asteroids.retain(|a| a.pos.y >= despawn_y)
}

/// Move pickups at their own speed (effects never apply) and prune
pub fn move_pickups(state: &mut GameState, tuning: &Tuning) -> usize {
    for pickup in state.pickups.iter_mut() {
        pickup.pos.y -= pickup.speed;
    }

    let despawn_y = tuning.despawn_y;
    state.pickups.retain(|p| p.pos.y >= despawn_y)
}

/// Remove explosions older than their lifetime
pub fn expire_explosions(state: &mut GameState, now: Duration, tuning: &Tuning) -> usize {
    let lifetime = Duration::from_millis(tuning.explosion_lifetime_ms);
    state.explosions.retain(|e| !e.is_expired(now, lifetime))
}

/// Fade the edge overlay toward zero
pub fn decay_overlay(state: &mut GameState, tuning: &Tuning) {
    let flags = &mut state.flags;
    flags.collision_red_intensity = (flags.collision_red_intensity - tuning.overlay_decay).max(0.0);
}

/// Advance the simulation by one frame
pub fn tick(state: &mut GameState, rng: &mut dyn RandomSource, ctx: &TickContext<'_>) -> TickReport {
    let TickContext { coords, tuning, now } = *ctx;
    let mut report = TickReport::default();

    state.ticks += 1;
    // Input may change mid-frame; use one sample for the whole tick
    let player = state.player.position();

    report.asteroid_spawned = spawn_asteroid(state, rng, tuning);
    report.asteroids_pruned = move_asteroids(state, now, tuning);

    report.pickup_spawned = spawn_pickup(state, rng, tuning);
    report.pickups_pruned = move_pickups(state, tuning);

    report.collisions = resolve_collisions(state, coords, player, now);

    report.explosions_expired = expire_explosions(state, now, tuning);
    if state.player.expire_invincibility(now) {
        log::info!("Invincibility ended");
    }
    decay_overlay(state, tuning);

    report
}
