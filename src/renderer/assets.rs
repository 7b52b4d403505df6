//! Texture assets and where they come from

use std::collections::HashMap;

use super::backend::Image;
use crate::error::AssetError;
use crate::sim::PlayerVariant;

/// Named image assets loaded as textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureAsset {
    Background,
    PlayerNormal,
    PlayerInvincible,
    Asteroid,
    Pickup,
    Explosion,
}

impl TextureAsset {
    pub const ALL: [TextureAsset; 6] = [
        TextureAsset::Background,
        TextureAsset::PlayerNormal,
        TextureAsset::PlayerInvincible,
        TextureAsset::Asteroid,
        TextureAsset::Pickup,
        TextureAsset::Explosion,
    ];

    /// File name in the host's asset storage
    pub fn file_name(self) -> &'static str {
        match self {
            TextureAsset::Background => "background.png",
            TextureAsset::PlayerNormal => "player.png",
            TextureAsset::PlayerInvincible => "player_invincible.png",
            TextureAsset::Asteroid => "asteroid.png",
            TextureAsset::Pickup => "pickup.png",
            TextureAsset::Explosion => "explosion.png",
        }
    }

    pub fn for_player(variant: PlayerVariant) -> Self {
        match variant {
            PlayerVariant::Normal => TextureAsset::PlayerNormal,
            PlayerVariant::Invincible => TextureAsset::PlayerInvincible,
        }
    }
}

/// Decodes assets into RGBA images. Implemented by the host.
pub trait AssetSource: Send {
    fn load(&mut self, asset: TextureAsset) -> Result<Image, AssetError>;
}

/// Assets held in memory, keyed by asset
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    images: HashMap<TextureAsset, Image>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flat placeholder colours for every asset
    pub fn placeholders() -> Self {
        let mut assets = Self::new();
        for asset in TextureAsset::ALL {
            let rgba = match asset {
                TextureAsset::Background => [8, 8, 20, 255],
                TextureAsset::PlayerNormal => [60, 200, 110, 255],
                TextureAsset::PlayerInvincible => [240, 220, 80, 255],
                TextureAsset::Asteroid => [140, 120, 100, 255],
                TextureAsset::Pickup => [90, 160, 255, 255],
                TextureAsset::Explosion => [255, 120, 40, 255],
            };
            assets.insert(asset, Image::solid(4, 4, rgba));
        }
        assets
    }

    pub fn insert(&mut self, asset: TextureAsset, image: Image) {
        self.images.insert(asset, image);
    }

    pub fn remove(&mut self, asset: TextureAsset) -> Option<Image> {
        self.images.remove(&asset)
    }
}

impl AssetSource for MemoryAssets {
    fn load(&mut self, asset: TextureAsset) -> Result<Image, AssetError> {
        let image = self
            .images
            .get(&asset)
            .cloned()
            .ok_or(AssetError::NotFound(asset))?;
        if !image.is_consistent() {
            return Err(AssetError::Decode {
                asset,
                reason: format!(
                    "{}x{} image with {} bytes",
                    image.width,
                    image.height,
                    image.pixels.len()
                ),
            });
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_cover_every_asset() {
        let mut assets = MemoryAssets::placeholders();
        for asset in TextureAsset::ALL {
            assert!(assets.load(asset).is_ok(), "{}", asset.file_name());
        }
    }

    #[test]
    fn test_missing_and_corrupt_assets() {
        let mut assets = MemoryAssets::placeholders();
        assets.remove(TextureAsset::Pickup);
        assert!(matches!(
            assets.load(TextureAsset::Pickup),
            Err(AssetError::NotFound(TextureAsset::Pickup))
        ));

        assets.insert(
            TextureAsset::Asteroid,
            Image {
                width: 2,
                height: 2,
                pixels: vec![0; 3],
            },
        );
        assert!(matches!(
            assets.load(TextureAsset::Asteroid),
            Err(AssetError::Decode { .. })
        ));
    }
}
