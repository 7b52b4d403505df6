//! Data-driven game balance
//!
//! Every gameplay constant can be overridden from a JSON file. Missing fields
//! fall back to the defaults in [`crate::consts`].

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::TuningError;

/// A width/height pair in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: f32,
    pub height: f32,
}

impl PixelSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Fixed on-screen sprite sizes, in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteSizes {
    pub text: PixelSize,
    pub asteroid: PixelSize,
    pub player: PixelSize,
    pub explosion: PixelSize,
    pub pickup: PixelSize,
}

impl Default for SpriteSizes {
    fn default() -> Self {
        Self {
            text: PixelSize::new(300.0, 100.0),
            asteroid: PixelSize::new(150.0, 150.0),
            player: PixelSize::new(200.0, 200.0),
            explosion: PixelSize::new(200.0, 200.0),
            pickup: PixelSize::new(120.0, 120.0),
        }
    }
}

/// Game balance values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Population ===
    pub asteroid_cap: usize,
    pub pickup_cap: usize,
    pub asteroid_spawn_chance: f32,
    pub pickup_spawn_chance: f32,

    // === Placement ===
    pub spawn_y: f32,
    pub despawn_y: f32,
    pub spawn_edge_margin: f32,
    pub spawn_remap_width: f32,

    // === Speed distribution ===
    pub fast_speed_chance: f32,
    pub fast_speed_divisor: f32,
    pub slow_speed_divisor: f32,

    // === Timers ===
    pub effect_duration_ms: u64,
    pub explosion_lifetime_ms: u64,
    pub accelerate_multiplier: f32,

    // === Overlay ===
    pub overlay_decay: f32,

    // === Layout ===
    pub sprite_sizes: SpriteSizes,
    /// Score text centre in unit space
    pub score_text_pos: [f32; 2],
    /// Player start position in unit space
    pub player_start: [f32; 2],
    /// Offscreen clear colour (RGBA)
    pub clear_color: [f32; 4],
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            asteroid_cap: ASTEROID_CAP,
            pickup_cap: PICKUP_CAP,
            asteroid_spawn_chance: ASTEROID_SPAWN_CHANCE,
            pickup_spawn_chance: PICKUP_SPAWN_CHANCE,

            spawn_y: SPAWN_Y,
            despawn_y: DESPAWN_Y,
            spawn_edge_margin: SPAWN_EDGE_MARGIN,
            spawn_remap_width: SPAWN_REMAP_WIDTH,

            fast_speed_chance: FAST_SPEED_CHANCE,
            fast_speed_divisor: FAST_SPEED_DIVISOR,
            slow_speed_divisor: SLOW_SPEED_DIVISOR,

            effect_duration_ms: EFFECT_DURATION_MS,
            explosion_lifetime_ms: EXPLOSION_LIFETIME_MS,
            accelerate_multiplier: ACCELERATE_MULTIPLIER,

            overlay_decay: OVERLAY_DECAY,

            sprite_sizes: SpriteSizes::default(),
            score_text_pos: [0.5, 0.9],
            player_start: [0.5, 0.1],
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl Tuning {
    /// Parse and validate a JSON tuning document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        log::info!("Loaded tuning ({} asteroids max)", tuning.asteroid_cap);
        Ok(tuning)
    }

    /// Serialize to pretty JSON (for writing a starter tuning file)
    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would break the simulation invariants
    pub fn validate(&self) -> Result<(), TuningError> {
        fn probability(field: &'static str, value: f32) -> Result<(), TuningError> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(TuningError::Invalid {
                    field,
                    reason: format!("{value} is not a probability"),
                })
            }
        }

        fn positive(field: &'static str, value: f32) -> Result<(), TuningError> {
            if value > 0.0 {
                Ok(())
            } else {
                Err(TuningError::Invalid {
                    field,
                    reason: format!("{value} must be positive"),
                })
            }
        }

        probability("asteroid_spawn_chance", self.asteroid_spawn_chance)?;
        probability("pickup_spawn_chance", self.pickup_spawn_chance)?;
        probability("fast_speed_chance", self.fast_speed_chance)?;
        positive("fast_speed_divisor", self.fast_speed_divisor)?;
        positive("slow_speed_divisor", self.slow_speed_divisor)?;
        positive("accelerate_multiplier", self.accelerate_multiplier)?;
        positive("overlay_decay", self.overlay_decay)?;

        if self.despawn_y >= self.spawn_y {
            return Err(TuningError::Invalid {
                field: "despawn_y",
                reason: format!(
                    "despawn line {} must be below spawn line {}",
                    self.despawn_y, self.spawn_y
                ),
            });
        }
        if self.spawn_edge_margin + self.spawn_remap_width > 1.0 {
            return Err(TuningError::Invalid {
                field: "spawn_remap_width",
                reason: "remapped spawns would leave the screen".to_string(),
            });
        }

        let sizes = &self.sprite_sizes;
        for (field, size) in [
            ("sprite_sizes.text", sizes.text),
            ("sprite_sizes.asteroid", sizes.asteroid),
            ("sprite_sizes.player", sizes.player),
            ("sprite_sizes.explosion", sizes.explosion),
            ("sprite_sizes.pickup", sizes.pickup),
        ] {
            positive(field, size.width.min(size.height))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "asteroid_cap": 4, "sprite_sizes": { "player": { "width": 90, "height": 60 } } }"#)
            .expect("valid tuning");
        assert_eq!(tuning.asteroid_cap, 4);
        assert_eq!(tuning.pickup_cap, PICKUP_CAP);
        assert_eq!(tuning.sprite_sizes.player, PixelSize::new(90.0, 60.0));
        assert_eq!(tuning.sprite_sizes.asteroid, SpriteSizes::default().asteroid);
    }

    #[test]
    fn test_rejects_bad_probability() {
        let err = Tuning::from_json(r#"{ "pickup_spawn_chance": 1.5 }"#).unwrap_err();
        assert!(matches!(
            err,
            TuningError::Invalid {
                field: "pickup_spawn_chance",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            Tuning::from_json("{ not json"),
            Err(TuningError::Parse(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let tuning = Tuning::default();
        let json = tuning.to_json().expect("serializable");
        assert_eq!(Tuning::from_json(&json).expect("parses"), tuning);
    }
}
