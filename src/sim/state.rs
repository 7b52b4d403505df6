//! Game state and core simulation types

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::coords::CoordinateData;
use super::pool::{Pool, Snapshot};
use crate::renderer::TextureHandle;
use crate::tuning::Tuning;

/// A falling asteroid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Asteroid {
    pub pos: Vec2,
    /// Units per tick, fixed at spawn
    pub speed: f32,
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    /// Asteroids fall at double speed
    Accelerate,
    /// Asteroids stop falling
    Freeze,
}

/// A collectible pickup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    pub pos: Vec2,
    pub speed: f32,
    pub kind: PickupKind,
}

/// Explosion left behind by an asteroid hit. Never moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Explosion {
    pub pos: Vec2,
    /// Monotonic time of the hit
    pub created_at: Duration,
}

impl Explosion {
    pub fn is_expired(&self, now: Duration, lifetime: Duration) -> bool {
        now.saturating_sub(self.created_at) >= lifetime
    }
}

/// On-screen score. The texture is a derived resource, re-rendered when
/// `rendered_score` falls behind the session score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreText {
    pub pos: Vec2,
    pub texture: TextureHandle,
    pub rendered_score: Option<u64>,
}

impl ScoreText {
    pub fn needs_refresh(&self, score: u64) -> bool {
        self.rendered_score != Some(score)
    }
}

/// Player position written by the input side, read once per tick.
///
/// Stored as raw `f32` bits so input can arrive on another thread without a lock.
#[derive(Debug, Default)]
pub struct PlayerPosition {
    x: AtomicU32,
    y: AtomicU32,
}

impl PlayerPosition {
    pub fn new(x: f32, y: f32) -> Self {
        let pos = Self::default();
        pos.set(x, y);
        pos
    }

    /// Store a position as-is (no clamping)
    #[inline]
    pub fn set(&self, x: f32, y: f32) {
        self.x.store(x.to_bits(), Ordering::Relaxed);
        self.y.store(y.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> Vec2 {
        Vec2::new(
            f32::from_bits(self.x.load(Ordering::Relaxed)),
            f32::from_bits(self.y.load(Ordering::Relaxed)),
        )
    }
}

/// Which player texture is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerVariant {
    Normal,
    Invincible,
}

/// Invincibility state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invincibility {
    Off,
    /// On until switched off
    Held,
    /// On until the given monotonic time
    Until(Duration),
}

/// The player ship
#[derive(Debug)]
pub struct Player {
    position: Arc<PlayerPosition>,
    invincibility: Invincibility,
    /// Texture currently shown
    pub variant: PlayerVariant,
    /// Set when `variant` no longer matches the invincibility state
    pub texture_swap_pending: bool,
}

impl Player {
    pub fn new(start: Vec2) -> Self {
        Self {
            position: Arc::new(PlayerPosition::new(start.x, start.y)),
            invincibility: Invincibility::Off,
            variant: PlayerVariant::Normal,
            texture_swap_pending: false,
        }
    }

    /// Shared handle for the input side
    pub fn position_handle(&self) -> Arc<PlayerPosition> {
        Arc::clone(&self.position)
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position.get()
    }

    #[inline]
    pub fn is_invincible(&self) -> bool {
        self.invincibility != Invincibility::Off
    }

    pub fn invincibility(&self) -> Invincibility {
        self.invincibility
    }

    /// Change invincibility, flagging a texture swap when visibility changes
    pub fn set_invincibility(&mut self, invincibility: Invincibility) {
        let was = self.is_invincible();
        self.invincibility = invincibility;
        if was != self.is_invincible() {
            self.texture_swap_pending = true;
        }
    }

    /// End a timed invincibility whose deadline has passed
    pub fn expire_invincibility(&mut self, now: Duration) -> bool {
        if let Invincibility::Until(deadline) = self.invincibility {
            if now >= deadline {
                self.set_invincibility(Invincibility::Off);
                return true;
            }
        }
        false
    }

    /// Variant matching the current invincibility state
    pub fn wanted_variant(&self) -> PlayerVariant {
        if self.is_invincible() {
            PlayerVariant::Invincible
        } else {
            PlayerVariant::Normal
        }
    }
}

/// A freeze or accelerate effect and when its pickup was collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveEffect {
    pub kind: PickupKind,
    pub collected_at: Duration,
}

impl ActiveEffect {
    pub fn is_expired(&self, now: Duration, duration: Duration) -> bool {
        now.saturating_sub(self.collected_at) >= duration
    }
}

/// Mutable per-session values
#[derive(Debug, Clone, Default)]
pub struct SessionFlags {
    /// Overlay alpha; reset to 1.0 on an asteroid hit, decays toward 0
    pub collision_red_intensity: f32,
    /// Last collision was a pickup (blue overlay instead of red)
    pub collision_was_pickup: bool,
    /// Most recently collected pickup effect, if still running
    pub active_effect: Option<ActiveEffect>,
    /// Asteroids hit this session
    pub score: u64,
}

impl SessionFlags {
    #[inline]
    pub fn freeze_active(&self) -> bool {
        matches!(self.active_effect, Some(e) if e.kind == PickupKind::Freeze)
    }

    #[inline]
    pub fn accelerate_active(&self) -> bool {
        matches!(self.active_effect, Some(e) if e.kind == PickupKind::Accelerate)
    }
}

/// Everything the simulation owns
#[derive(Debug)]
pub struct GameState {
    pub player: Player,
    pub asteroids: Pool<Asteroid>,
    pub pickups: Pool<Pickup>,
    pub explosions: Pool<Explosion>,
    pub score_text: ScoreText,
    pub flags: SessionFlags,
    /// Ticks simulated so far
    pub ticks: u64,
}

impl GameState {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            player: Player::new(Vec2::from(tuning.player_start)),
            asteroids: Pool::with_cap(tuning.asteroid_cap),
            pickups: Pool::with_cap(tuning.pickup_cap),
            explosions: Pool::unbounded(),
            score_text: ScoreText {
                pos: Vec2::from(tuning.score_text_pos),
                texture: TextureHandle::INVALID,
                rendered_score: None,
            },
            flags: SessionFlags::default(),
            ticks: 0,
        }
    }

    /// Read-only view handed to the render pipeline
    pub fn frame_view(&self, coords: CoordinateData) -> FrameView {
        FrameView {
            coords,
            player: self.player.position(),
            player_variant: self.player.variant,
            asteroids: self.asteroids.snapshot(),
            pickups: self.pickups.snapshot(),
            explosions: self.explosions.snapshot(),
            score_text: self.score_text,
            red_intensity: self.flags.collision_red_intensity,
            was_pickup: self.flags.collision_was_pickup,
        }
    }
}

/// Stable, self-contained picture of one frame
#[derive(Debug, Clone)]
pub struct FrameView {
    pub coords: CoordinateData,
    pub player: Vec2,
    pub player_variant: PlayerVariant,
    pub asteroids: Snapshot<Asteroid>,
    pub pickups: Snapshot<Pickup>,
    pub explosions: Snapshot<Explosion>,
    pub score_text: ScoreText,
    pub red_intensity: f32,
    pub was_pickup: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_position_round_trip() {
        let player = Player::new(Vec2::new(0.5, 0.1));
        let input = player.position_handle();

        input.set(0.123_456, 1.75);
        assert_eq!(player.position(), Vec2::new(0.123_456, 1.75));

        // Out-of-range values pass through untouched
        input.set(-3.0, 42.0);
        assert_eq!(player.position(), Vec2::new(-3.0, 42.0));
    }

    #[test]
    fn test_invincibility_flags_texture_swap() {
        let mut player = Player::new(Vec2::ZERO);
        assert!(!player.texture_swap_pending);

        player.set_invincibility(Invincibility::Held);
        assert!(player.is_invincible());
        assert!(player.texture_swap_pending);
        assert_eq!(player.wanted_variant(), PlayerVariant::Invincible);

        player.texture_swap_pending = false;
        player.set_invincibility(Invincibility::Until(Duration::from_secs(5)));
        assert!(!player.texture_swap_pending, "still invincible, same texture");
    }

    #[test]
    fn test_timed_invincibility_expires() {
        let mut player = Player::new(Vec2::ZERO);
        player.set_invincibility(Invincibility::Until(Duration::from_millis(500)));

        assert!(!player.expire_invincibility(Duration::from_millis(499)));
        assert!(player.is_invincible());
        assert!(player.expire_invincibility(Duration::from_millis(500)));
        assert!(!player.is_invincible());
    }

    #[test]
    fn test_effect_flags_are_exclusive() {
        let mut flags = SessionFlags::default();
        assert!(!flags.freeze_active() && !flags.accelerate_active());

        flags.active_effect = Some(ActiveEffect {
            kind: PickupKind::Freeze,
            collected_at: Duration::ZERO,
        });
        assert!(flags.freeze_active() && !flags.accelerate_active());

        flags.active_effect = Some(ActiveEffect {
            kind: PickupKind::Accelerate,
            collected_at: Duration::ZERO,
        });
        assert!(!flags.freeze_active() && flags.accelerate_active());
    }

    #[test]
    fn test_explosion_expiry_boundary() {
        let explosion = Explosion {
            pos: Vec2::ZERO,
            created_at: Duration::from_millis(200),
        };
        let lifetime = Duration::from_millis(1000);
        assert!(!explosion.is_expired(Duration::from_millis(1199), lifetime));
        assert!(explosion.is_expired(Duration::from_millis(1200), lifetime));
    }
}
