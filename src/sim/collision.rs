//! Player collision detection and response
//!
//! The hit test is an axis-aligned box that deliberately mixes extents: the
//! horizontal tolerance comes from the player's width (a third of it), the
//! vertical tolerance from the other object's height (half of it). Collision
//! boxes and drawn sprites share the same [`CoordinateData`].

use std::time::Duration;

use glam::Vec2;

use super::coords::{Category, CoordinateData};
use super::state::{ActiveEffect, Explosion, GameState};

/// Asymmetric AABB test between the player and an object
#[inline]
pub fn hits_player(object: Vec2, object_size: Vec2, player: Vec2, player_size: Vec2) -> bool {
    (object.x - player.x).abs() < player_size.x / 3.0
        && (object.y - player.y).abs() < object_size.y / 2.0
}

/// Collisions resolved in one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionOutcome {
    pub asteroids_hit: usize,
    pub pickups_collected: usize,
}

/// Resolve player-vs-asteroid hits: explosion, score, red flash
pub fn resolve_asteroid_collisions(
    state: &mut GameState,
    coords: &CoordinateData,
    player: Vec2,
    now: Duration,
) -> usize {
    if state.player.is_invincible() {
        return 0;
    }

    let player_size = coords.size(Category::Player);
    let asteroid_size = coords.size(Category::Asteroid);
    let hit = state
        .asteroids
        .drain_where(|a| hits_player(a.pos, asteroid_size, player, player_size));

    for asteroid in &hit {
        state.explosions.push(Explosion {
            pos: asteroid.pos,
            created_at: now,
        });
        state.flags.score += 1;
        state.flags.collision_red_intensity = 1.0;
        state.flags.collision_was_pickup = false;
        log::debug!(
            "Asteroid hit at ({:.3}, {:.3}), score {}",
            asteroid.pos.x,
            asteroid.pos.y,
            state.flags.score
        );
    }

    hit.len()
}

/// Resolve player-vs-pickup hits: start the effect, select the blue tint
pub fn resolve_pickup_collisions(
    state: &mut GameState,
    coords: &CoordinateData,
    player: Vec2,
    now: Duration,
) -> usize {
    if state.player.is_invincible() {
        return 0;
    }

    let player_size = coords.size(Category::Player);
    let pickup_size = coords.size(Category::Pickup);
    let collected = state
        .pickups
        .drain_where(|p| hits_player(p.pos, pickup_size, player, player_size));

    for pickup in &collected {
        state.flags.active_effect = Some(ActiveEffect {
            kind: pickup.kind,
            collected_at: now,
        });
        state.flags.collision_was_pickup = true;
        log::debug!("Collected {:?} pickup", pickup.kind);
    }

    collected.len()
}

/// Asteroids first, then pickups
pub fn resolve_collisions(
    state: &mut GameState,
    coords: &CoordinateData,
    player: Vec2,
    now: Duration,
) -> CollisionOutcome {
    CollisionOutcome {
        asteroids_hit: resolve_asteroid_collisions(state, coords, player, now),
        pickups_collected: resolve_pickup_collisions(state, coords, player, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Asteroid, Invincibility, Pickup, PickupKind};
    use crate::tuning::Tuning;

    fn setup() -> (GameState, CoordinateData) {
        let tuning = Tuning::default();
        let coords = CoordinateData::compute(&tuning.sprite_sizes, 1000, 2000).unwrap();
        (GameState::new(&tuning), coords)
    }

    #[test]
    fn test_hit_test_is_asymmetric() {
        let player = Vec2::new(0.5, 0.5);
        let player_size = Vec2::new(0.3, 0.01);
        let object_size = Vec2::new(0.01, 0.2);

        // Horizontal tolerance is player width / 3 = 0.1
        assert!(hits_player(Vec2::new(0.59, 0.5), object_size, player, player_size));
        assert!(!hits_player(Vec2::new(0.61, 0.5), object_size, player, player_size));

        // Vertical tolerance is object height / 2 = 0.1, not the player's height
        assert!(hits_player(Vec2::new(0.5, 0.59), object_size, player, player_size));
        assert!(!hits_player(Vec2::new(0.5, 0.61), object_size, player, player_size));
    }

    #[test]
    fn test_asteroid_hit_scores_and_flashes() {
        let (mut state, coords) = setup();
        state.flags.collision_was_pickup = true;
        state.flags.collision_red_intensity = 0.3;
        state.asteroids.push(Asteroid {
            pos: Vec2::new(0.5, 0.11),
            speed: 0.01,
        });
        state.asteroids.push(Asteroid {
            pos: Vec2::new(0.5, 0.9),
            speed: 0.01,
        });

        let now = Duration::from_millis(1234);
        let hits = resolve_asteroid_collisions(&mut state, &coords, Vec2::new(0.5, 0.1), now);

        assert_eq!(hits, 1);
        assert_eq!(state.flags.score, 1);
        assert_eq!(state.flags.collision_red_intensity, 1.0);
        assert!(!state.flags.collision_was_pickup);
        assert_eq!(state.asteroids.len(), 1);
        let explosion = *state.explosions.iter().next().unwrap();
        assert_eq!(explosion.pos, Vec2::new(0.5, 0.11));
        assert_eq!(explosion.created_at, now);
    }

    #[test]
    fn test_invincible_player_ignores_everything() {
        let (mut state, coords) = setup();
        state.player.set_invincibility(Invincibility::Held);
        state.asteroids.push(Asteroid {
            pos: Vec2::new(0.5, 0.1),
            speed: 0.01,
        });
        state.pickups.push(Pickup {
            pos: Vec2::new(0.5, 0.1),
            speed: 0.01,
            kind: PickupKind::Freeze,
        });

        let outcome = resolve_collisions(&mut state, &coords, Vec2::new(0.5, 0.1), Duration::ZERO);

        assert_eq!(outcome, CollisionOutcome::default());
        assert_eq!(state.asteroids.len(), 1);
        assert_eq!(state.pickups.len(), 1);
        assert_eq!(state.flags.score, 0);
        assert!(state.explosions.is_empty());
    }

    #[test]
    fn test_pickup_collection_starts_effect() {
        let (mut state, coords) = setup();
        state.flags.active_effect = Some(ActiveEffect {
            kind: PickupKind::Freeze,
            collected_at: Duration::ZERO,
        });
        state.pickups.push(Pickup {
            pos: Vec2::new(0.52, 0.12),
            speed: 0.002,
            kind: PickupKind::Accelerate,
        });

        let now = Duration::from_millis(800);
        let collected = resolve_pickup_collisions(&mut state, &coords, Vec2::new(0.5, 0.1), now);

        assert_eq!(collected, 1);
        assert!(state.pickups.is_empty());
        assert!(state.flags.collision_was_pickup);
        assert!(state.flags.accelerate_active());
        assert!(!state.flags.freeze_active());
        assert_eq!(state.flags.active_effect.unwrap().collected_at, now);
        // Pickups do not score or flash red
        assert_eq!(state.flags.score, 0);
        assert_eq!(state.flags.collision_red_intensity, 0.0);
    }
}
