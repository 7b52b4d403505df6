//! Coordinate normalization
//!
//! Sprites have fixed sizes in device pixels. Gameplay and rendering both work
//! in unit space (0-1 across the surface), so every category's size has to be
//! divided by the current surface dimensions. The result is a single `Copy`
//! value that is swapped in whole on resize; collision and the model-matrix
//! builder read the same value within a frame.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tuning::{PixelSize, SpriteSizes};

/// Sprite categories with their own fixed pixel size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Text,
    Asteroid,
    Player,
    Explosion,
    Pickup,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Text,
        Category::Asteroid,
        Category::Player,
        Category::Explosion,
        Category::Pickup,
    ];
}

/// Per-category unit sizes for one surface resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateData {
    pub text: Vec2,
    pub asteroid: Vec2,
    pub player: Vec2,
    pub explosion: Vec2,
    pub pickup: Vec2,
    /// Surface size in pixels these values were computed for
    pub surface_width: u32,
    pub surface_height: u32,
}

impl CoordinateData {
    /// Compute unit sizes for a surface. Returns `None` for a degenerate surface.
    pub fn compute(sizes: &SpriteSizes, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let (w, h) = (width as f32, height as f32);
        let unit = |size: PixelSize| Vec2::new(size.width / w, size.height / h);

        Some(Self {
            text: unit(sizes.text),
            asteroid: unit(sizes.asteroid),
            player: unit(sizes.player),
            explosion: unit(sizes.explosion),
            pickup: unit(sizes.pickup),
            surface_width: width,
            surface_height: height,
        })
    }

    /// Unit size (width, height) of a category
    #[inline]
    pub fn size(&self, category: Category) -> Vec2 {
        match category {
            Category::Text => self.text,
            Category::Asteroid => self.asteroid,
            Category::Player => self.player,
            Category::Explosion => self.explosion,
            Category::Pickup => self.pickup,
        }
    }

    /// True if this data was computed for the given surface size
    #[inline]
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.surface_width == width && self.surface_height == height
    }

    /// Surface size in pixels
    #[inline]
    pub fn surface(&self) -> (u32, u32) {
        (self.surface_width, self.surface_height)
    }
}
