//! Offscreen render pipeline
//!
//! Each frame renders into a texture-backed target sized to the surface:
//! background, player, asteroids, pickups, explosions, score text, then the
//! edge overlay when a collision flash is active. Compositing the target onto
//! the screen is left to the host.

use glam::{Mat4, Vec2, Vec3};

use super::assets::{AssetSource, TextureAsset};
use super::backend::{
    GraphicsBackend, OffscreenTarget, ProgramHandle, ProgramKind, QuadGeometry, TextureHandle,
    Tint, Uniform,
};
use super::text;
use crate::error::RenderError;
use crate::sim::{Category, FrameView, PlayerVariant};

/// Texels per font pixel for the score texture
const SCORE_TEXT_SCALE: u32 = 8;

/// Projection for the offscreen pass.
///
/// Unit space with the vertical axis flipped (bottom = 1, top = 0): the
/// offscreen texture is sampled upside-down relative to drawing straight to
/// the screen, so the flip cancels out at composite time.
pub fn offscreen_projection() -> Mat4 {
    Mat4::orthographic_rh_gl(0.0, 1.0, 1.0, 0.0, -1.0, 1.0)
}

/// `projection × translate(pos) × scale(size)` applied to the unit quad
#[inline]
pub fn model_matrix(projection: &Mat4, pos: Vec2, size: Vec2) -> Mat4 {
    *projection
        * Mat4::from_translation(Vec3::new(pos.x, pos.y, 0.0))
        * Mat4::from_scale(Vec3::new(size.x, size.y, 1.0))
}

/// Whether the offscreen target is currently the draw destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Bound,
}

#[derive(Debug, Clone, Copy)]
struct Programs {
    textured: ProgramHandle,
    overlay: ProgramHandle,
}

#[derive(Debug, Clone, Copy)]
struct TextureSet {
    background: TextureHandle,
    player: TextureHandle,
    asteroid: TextureHandle,
    pickup: TextureHandle,
    explosion: TextureHandle,
}

impl Default for TextureSet {
    fn default() -> Self {
        Self {
            background: TextureHandle::INVALID,
            player: TextureHandle::INVALID,
            asteroid: TextureHandle::INVALID,
            pickup: TextureHandle::INVALID,
            explosion: TextureHandle::INVALID,
        }
    }
}

/// Owns every GPU resource the game uses
pub struct RenderPipeline<B: GraphicsBackend> {
    backend: B,
    assets: Option<Box<dyn AssetSource>>,
    programs: Option<Programs>,
    textures: TextureSet,
    target: Option<OffscreenTarget>,
    pass: PassState,
    clear_color: [f32; 4],
}

impl<B: GraphicsBackend> RenderPipeline<B> {
    pub fn new(backend: B, clear_color: [f32; 4]) -> Self {
        Self {
            backend,
            assets: None,
            programs: None,
            textures: TextureSet::default(),
            target: None,
            pass: PassState::Idle,
            clear_color,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn is_initialized(&self) -> bool {
        self.programs.is_some()
    }

    /// Current offscreen target, if one has been allocated
    pub fn target(&self) -> Option<&OffscreenTarget> {
        self.target.as_ref()
    }

    pub fn pass_state(&self) -> PassState {
        self.pass
    }

    /// Compile programs and load every texture.
    ///
    /// Program failures are fatal. Texture failures are logged and leave an
    /// invalid handle behind.
    pub fn initialize(
        &mut self,
        assets: Box<dyn AssetSource>,
        player_variant: PlayerVariant,
    ) -> Result<(), RenderError> {
        if self.programs.is_some() {
            // Surface recreated: start from a clean slate
            self.release();
        }

        let textured = self.compile(ProgramKind::TexturedQuad)?;
        let overlay = self.compile(ProgramKind::EdgeOverlay)?;
        self.programs = Some(Programs { textured, overlay });

        self.assets = Some(assets);
        self.textures = TextureSet {
            background: self.load_texture(TextureAsset::Background),
            player: self.load_texture(TextureAsset::for_player(player_variant)),
            asteroid: self.load_texture(TextureAsset::Asteroid),
            pickup: self.load_texture(TextureAsset::Pickup),
            explosion: self.load_texture(TextureAsset::Explosion),
        };

        log::info!("Render pipeline initialized");
        Ok(())
    }

    fn compile(&mut self, kind: ProgramKind) -> Result<ProgramHandle, RenderError> {
        self.backend
            .compile_program(kind, kind.source())
            .inspect_err(|e| log::error!("Shader program {kind:?} failed: {e}"))
    }

    /// Load and upload one asset; failures yield `TextureHandle::INVALID`
    fn load_texture(&mut self, asset: TextureAsset) -> TextureHandle {
        let Some(assets) = self.assets.as_mut() else {
            log::error!("No asset source to load {}", asset.file_name());
            return TextureHandle::INVALID;
        };

        let image = match assets.load(asset) {
            Ok(image) => image,
            Err(e) => {
                log::error!("Failed to load {}: {e}", asset.file_name());
                return TextureHandle::INVALID;
            }
        };

        match self.backend.upload_texture(&image) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("Failed to upload {}: {e}", asset.file_name());
                TextureHandle::INVALID
            }
        }
    }

    /// Reload the player texture for a new variant, freeing the old one
    pub fn refresh_player_texture(&mut self, variant: PlayerVariant) -> Result<(), RenderError> {
        if !self.is_initialized() {
            return Err(RenderError::NotInitialized);
        }

        let replacement = self.load_texture(TextureAsset::for_player(variant));
        let previous = std::mem::replace(&mut self.textures.player, replacement);
        if previous.is_valid() {
            self.backend.delete_texture(previous);
        }
        log::debug!("Player texture swapped to {variant:?}");
        Ok(())
    }

    /// Render `score` into a new texture, freeing `previous` afterwards
    pub fn render_score_texture(
        &mut self,
        score: u64,
        previous: TextureHandle,
    ) -> Result<TextureHandle, RenderError> {
        if !self.is_initialized() {
            return Err(RenderError::NotInitialized);
        }

        let image = text::render_score(score, SCORE_TEXT_SCALE);
        let handle = match self.backend.upload_texture(&image) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("Failed to upload score text: {e}");
                TextureHandle::INVALID
            }
        };
        if previous.is_valid() {
            self.backend.delete_texture(previous);
        }
        Ok(handle)
    }

    /// Make sure the offscreen target matches the surface.
    ///
    /// The old target is released before the new one is allocated. Returns
    /// true if a target was (re)built.
    pub fn ensure_target(&mut self, width: u32, height: u32) -> Result<bool, RenderError> {
        if let Some(target) = self.target {
            if target.width == width && target.height == height {
                return Ok(false);
            }
            self.backend.release_offscreen_target(target);
            self.target = None;
        }

        let target = self.backend.create_offscreen_target(width, height)?;
        log::info!("Offscreen target allocated: {}x{}", width, height);
        self.target = Some(target);
        Ok(true)
    }

    /// Draw one frame into the offscreen target
    pub fn render_frame(&mut self, view: &FrameView) -> Result<(), RenderError> {
        let programs = self.programs.ok_or(RenderError::NotInitialized)?;

        let (width, height) = view.coords.surface();
        self.ensure_target(width, height)?;
        let target = self.target.ok_or(RenderError::NotInitialized)?;

        self.backend.bind_offscreen_target(&target);
        self.pass = PassState::Bound;
        self.backend.set_viewport(target.width, target.height);
        self.backend.clear(self.clear_color);

        self.backend.use_program(programs.textured);
        self.draw_scene(view);

        if view.red_intensity > 0.0 {
            self.draw_edge_overlay(programs, view);
        }

        self.backend.unbind_offscreen_target();
        self.pass = PassState::Idle;
        Ok(())
    }

    fn draw_scene(&mut self, view: &FrameView) {
        let projection = offscreen_projection();
        let coords = &view.coords;

        // Background spans the whole target
        self.backend.set_uniform(Uniform::Mvp(Mat4::IDENTITY));
        self.backend.bind_texture(self.textures.background);
        self.backend.draw_quad(QuadGeometry::FullScreen);

        let player_size = coords.size(Category::Player);
        self.draw_sprite(&projection, view.player, player_size, self.textures.player);

        let asteroid_size = coords.size(Category::Asteroid);
        for asteroid in view.asteroids.iter() {
            self.draw_sprite(&projection, asteroid.pos, asteroid_size, self.textures.asteroid);
        }

        let pickup_size = coords.size(Category::Pickup);
        for pickup in view.pickups.iter() {
            self.draw_sprite(&projection, pickup.pos, pickup_size, self.textures.pickup);
        }

        let explosion_size = coords.size(Category::Explosion);
        for explosion in view.explosions.iter() {
            self.draw_sprite(&projection, explosion.pos, explosion_size, self.textures.explosion);
        }

        let text = &view.score_text;
        self.draw_sprite(&projection, text.pos, coords.size(Category::Text), text.texture);
    }

    fn draw_sprite(&mut self, projection: &Mat4, pos: Vec2, size: Vec2, texture: TextureHandle) {
        self.backend
            .set_uniform(Uniform::Mvp(model_matrix(projection, pos, size)));
        self.backend.bind_texture(texture);
        self.backend.draw_quad(QuadGeometry::Unit);
    }

    fn draw_edge_overlay(&mut self, programs: Programs, view: &FrameView) {
        let tint = if view.was_pickup { Tint::Blue } else { Tint::Red };

        self.backend.use_program(programs.overlay);
        self.backend.set_uniform(Uniform::Mvp(Mat4::IDENTITY));
        self.backend.set_uniform(Uniform::TintType(tint));
        self.backend
            .set_uniform(Uniform::RedIntensity(view.red_intensity));
        self.backend.set_blending(true);
        self.backend.draw_quad(QuadGeometry::FullScreen);
        self.backend.set_blending(false);
        self.backend.use_program(programs.textured);
    }

    /// Free the offscreen target and every loaded texture
    pub fn release(&mut self) {
        if let Some(target) = self.target.take() {
            self.backend.release_offscreen_target(target);
        }
        let textures = std::mem::take(&mut self.textures);
        for handle in [
            textures.background,
            textures.player,
            textures.asteroid,
            textures.pickup,
            textures.explosion,
        ] {
            if handle.is_valid() {
                self.backend.delete_texture(handle);
            }
        }
        self.programs = None;
        self.pass = PassState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::assets::MemoryAssets;
    use crate::renderer::headless::{BackendCall, HeadlessBackend};
    use crate::sim::{Asteroid, CoordinateData, Explosion, GameState, Pickup, PickupKind};
    use crate::tuning::Tuning;
    use std::time::Duration;

    fn pipeline() -> RenderPipeline<HeadlessBackend> {
        let mut pipeline = RenderPipeline::new(HeadlessBackend::new(), [0.0, 0.0, 0.0, 1.0]);
        pipeline
            .initialize(Box::new(MemoryAssets::placeholders()), PlayerVariant::Normal)
            .expect("headless init");
        pipeline.backend_mut().take_calls();
        pipeline
    }

    fn view(state: &GameState, width: u32, height: u32) -> FrameView {
        let coords =
            CoordinateData::compute(&Tuning::default().sprite_sizes, width, height).unwrap();
        state.frame_view(coords)
    }

    fn draws(calls: &[BackendCall]) -> Vec<QuadGeometry> {
        calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Draw(g) => Some(*g),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_projection_flips_vertical_axis() {
        let p = offscreen_projection();
        let bottom = p.transform_point3(Vec3::new(0.0, 0.0, 0.0));
        let top = p.transform_point3(Vec3::new(1.0, 1.0, 0.0));
        assert!((bottom.x + 1.0).abs() < 1e-6 && (bottom.y - 1.0).abs() < 1e-6);
        assert!((top.x - 1.0).abs() < 1e-6 && (top.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_model_matrix_places_unit_quad() {
        let m = model_matrix(&Mat4::IDENTITY, Vec2::new(0.25, 0.5), Vec2::new(0.1, 0.2));
        let corner = m.transform_point3(Vec3::new(0.5, 0.5, 0.0));
        assert!((corner.x - 0.3).abs() < 1e-6);
        assert!((corner.y - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_frame_draw_order() {
        let tuning = Tuning::default();
        let mut state = GameState::new(&tuning);
        state.asteroids.push(Asteroid {
            pos: Vec2::new(0.3, 0.7),
            speed: 0.01,
        });
        state.asteroids.push(Asteroid {
            pos: Vec2::new(0.6, 0.4),
            speed: 0.01,
        });
        state.pickups.push(Pickup {
            pos: Vec2::new(0.5, 0.5),
            speed: 0.01,
            kind: PickupKind::Freeze,
        });
        state.explosions.push(Explosion {
            pos: Vec2::new(0.5, 0.1),
            created_at: Duration::ZERO,
        });

        let mut pipeline = pipeline();
        pipeline.render_frame(&view(&state, 1000, 2000)).unwrap();
        let calls = pipeline.backend_mut().take_calls();

        // Target is created, bound and cleared before any draw
        assert!(matches!(calls[0], BackendCall::CreateTarget(_)));
        assert!(matches!(calls[1], BackendCall::BindTarget(_)));
        assert_eq!(calls[2], BackendCall::Viewport(1000, 2000));
        assert!(matches!(calls[3], BackendCall::Clear(_)));
        assert_eq!(calls.last(), Some(&BackendCall::UnbindTarget));

        // background, player, 2 asteroids, pickup, explosion, text; no overlay
        let draws = draws(&calls);
        assert_eq!(draws.len(), 7);
        assert_eq!(draws[0], QuadGeometry::FullScreen);
        assert!(draws[1..].iter().all(|g| *g == QuadGeometry::Unit));
        assert!(!calls.contains(&BackendCall::Blending(true)));
        assert_eq!(pipeline.pass_state(), PassState::Idle);
    }

    #[test]
    fn test_overlay_pass_tint_and_intensity() {
        let tuning = Tuning::default();
        let mut state = GameState::new(&tuning);
        state.flags.collision_red_intensity = 0.5;
        state.flags.collision_was_pickup = true;

        let mut pipeline = pipeline();
        pipeline.render_frame(&view(&state, 800, 600)).unwrap();
        let calls = pipeline.backend_mut().take_calls();

        let blend_on = calls
            .iter()
            .position(|c| *c == BackendCall::Blending(true))
            .expect("overlay enables blending");
        assert!(calls[..blend_on].contains(&BackendCall::Uniform(Uniform::TintType(Tint::Blue))));
        assert!(calls[..blend_on].contains(&BackendCall::Uniform(Uniform::RedIntensity(0.5))));
        assert_eq!(calls[blend_on + 1], BackendCall::Draw(QuadGeometry::FullScreen));
        assert_eq!(calls[blend_on + 2], BackendCall::Blending(false));
        assert!(matches!(calls[blend_on + 3], BackendCall::UseProgram(_)));
        assert_eq!(calls[blend_on + 4], BackendCall::UnbindTarget);
    }

    #[test]
    fn test_resize_reallocates_before_drawing() {
        let state = GameState::new(&Tuning::default());
        let mut pipeline = pipeline();

        pipeline.render_frame(&view(&state, 1000, 2000)).unwrap();
        pipeline.backend_mut().take_calls();
        pipeline.render_frame(&view(&state, 1000, 2000)).unwrap();
        let calls = pipeline.backend_mut().take_calls();
        assert!(!calls.iter().any(|c| matches!(c, BackendCall::CreateTarget(_))));

        pipeline.render_frame(&view(&state, 1080, 2160)).unwrap();
        let calls = pipeline.backend_mut().take_calls();
        assert!(matches!(calls[0], BackendCall::ReleaseTarget(t) if t.width == 1000));
        assert!(matches!(calls[1], BackendCall::CreateTarget(t) if (t.width, t.height) == (1080, 2160)));
        assert_eq!(pipeline.backend().live_targets(), 1);
        let first_draw = calls
            .iter()
            .position(|c| matches!(c, BackendCall::Draw(_)))
            .unwrap();
        assert!(first_draw > 1);
    }

    #[test]
    fn test_shader_failure_is_fatal() {
        let mut backend = HeadlessBackend::new();
        backend.fail_program(ProgramKind::EdgeOverlay);
        let mut pipeline = RenderPipeline::new(backend, [0.0; 4]);

        let result =
            pipeline.initialize(Box::new(MemoryAssets::placeholders()), PlayerVariant::Normal);
        assert!(matches!(
            result,
            Err(RenderError::ShaderCompile {
                program: ProgramKind::EdgeOverlay,
                ..
            })
        ));
        assert!(!pipeline.is_initialized());

        let state = GameState::new(&Tuning::default());
        assert!(matches!(
            pipeline.render_frame(&view(&state, 10, 10)),
            Err(RenderError::NotInitialized)
        ));
    }

    #[test]
    fn test_missing_texture_leaves_invalid_handle() {
        let mut assets = MemoryAssets::placeholders();
        assets.remove(TextureAsset::Asteroid);
        let mut pipeline = RenderPipeline::new(HeadlessBackend::new(), [0.0; 4]);
        pipeline
            .initialize(Box::new(assets), PlayerVariant::Normal)
            .expect("texture failures are not fatal");

        let mut state = GameState::new(&Tuning::default());
        state.asteroids.push(Asteroid {
            pos: Vec2::new(0.5, 0.5),
            speed: 0.0,
        });
        pipeline.backend_mut().take_calls();
        pipeline.render_frame(&view(&state, 100, 100)).unwrap();
        let calls = pipeline.backend_mut().take_calls();
        // Asteroid plus the not-yet-rendered score text
        let invalid_binds = calls
            .iter()
            .filter(|c| **c == BackendCall::BindTexture(TextureHandle::INVALID))
            .count();
        assert_eq!(invalid_binds, 2);
    }

    #[test]
    fn test_player_texture_swap_frees_previous() {
        let mut pipeline = pipeline();
        let before = pipeline.backend().live_textures();

        pipeline
            .refresh_player_texture(PlayerVariant::Invincible)
            .unwrap();
        let calls = pipeline.backend_mut().take_calls();

        assert!(matches!(calls[0], BackendCall::UploadTexture { .. }));
        assert!(matches!(calls[1], BackendCall::DeleteTexture(_)));
        assert_eq!(pipeline.backend().live_textures(), before);
    }

    #[test]
    fn test_release_frees_everything() {
        let state = GameState::new(&Tuning::default());
        let mut pipeline = pipeline();
        pipeline.render_frame(&view(&state, 64, 64)).unwrap();

        pipeline.release();
        assert_eq!(pipeline.backend().live_targets(), 0);
        assert_eq!(pipeline.backend().live_textures(), 0);
        assert!(!pipeline.is_initialized());
    }
}
