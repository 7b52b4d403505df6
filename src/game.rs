//! Game controller
//!
//! Owns the simulation state and the render pipeline, and turns host
//! callbacks into frames. One `on_draw_frame` call runs, in order: one clock
//! sample, any pending resize, derived texture refreshes, the simulation tick,
//! then the offscreen render.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;

use crate::clock::Clock;
use crate::error::RenderError;
use crate::renderer::{AssetSource, GraphicsBackend, RenderPipeline, TextureHandle};
use crate::sim::{
    CoordinateData, GameState, Invincibility, PcgRandom, PlayerPosition, RandomSource,
    TickContext, TickReport, tick,
};
use crate::tuning::Tuning;

pub struct GameController<B: GraphicsBackend, C: Clock> {
    tuning: Tuning,
    state: GameState,
    pipeline: RenderPipeline<B>,
    rng: Box<dyn RandomSource>,
    clock: C,
    coords: Option<CoordinateData>,
    /// Surface size reported by the host, applied at the next frame start
    pending_surface: Option<(u32, u32)>,
}

impl<B: GraphicsBackend, C: Clock> GameController<B, C> {
    pub fn new(backend: B, clock: C, tuning: Tuning, rng: Box<dyn RandomSource>) -> Self {
        let pipeline = RenderPipeline::new(backend, tuning.clear_color);
        Self {
            state: GameState::new(&tuning),
            tuning,
            pipeline,
            rng,
            clock,
            coords: None,
            pending_surface: None,
        }
    }

    /// Controller with a seeded PCG generator
    pub fn with_seed(backend: B, clock: C, tuning: Tuning, seed: u64) -> Self {
        Self::new(backend, clock, tuning, Box::new(PcgRandom::new(seed)))
    }

    // ------------------------------------------------------------------
    // Host callbacks
    // ------------------------------------------------------------------

    /// Compile programs and load textures. A shader failure is fatal.
    pub fn on_surface_created(&mut self, assets: Box<dyn AssetSource>) -> Result<(), RenderError> {
        // Textures from an earlier surface belong to the old context
        let previous =
            std::mem::replace(&mut self.state.score_text.texture, TextureHandle::INVALID);
        if previous.is_valid() {
            self.pipeline.backend_mut().delete_texture(previous);
        }
        self.state.score_text.rendered_score = None;

        let variant = self.state.player.wanted_variant();
        self.pipeline.initialize(assets, variant).inspect_err(|e| {
            log::error!("Surface setup failed: {e}");
        })?;
        self.state.player.variant = variant;
        self.state.player.texture_swap_pending = false;

        log::info!("Surface created");
        Ok(())
    }

    /// Record new surface dimensions; they take effect at the next frame
    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("Ignoring {}x{} surface", width, height);
            return;
        }
        log::info!("Surface changed to {}x{}", width, height);
        self.pending_surface = Some((width, height));
    }

    /// Advance and render one frame
    pub fn on_draw_frame(&mut self) -> Result<TickReport, RenderError> {
        if !self.pipeline.is_initialized() {
            return Err(RenderError::NotInitialized);
        }

        let now = self.clock.now();
        self.apply_pending_surface();
        let Some(coords) = self.coords else {
            log::debug!("Frame skipped: surface size not known yet");
            return Ok(TickReport::default());
        };

        self.refresh_derived_textures()?;
        let report = self.step(now, &coords);

        let view = self.state.frame_view(coords);
        self.pipeline.render_frame(&view)?;
        Ok(report)
    }

    /// Run the simulation without rendering.
    ///
    /// Returns `None` until the surface size is known.
    pub fn update_tick(&mut self) -> Option<TickReport> {
        let now = self.clock.now();
        self.apply_pending_surface();
        let coords = self.coords?;
        Some(self.step(now, &coords))
    }

    /// Free every GPU resource owned by the game
    pub fn release(&mut self) {
        let score_texture = self.state.score_text.texture;
        if score_texture.is_valid() {
            self.pipeline.backend_mut().delete_texture(score_texture);
        }
        self.state.score_text.texture = TextureHandle::INVALID;
        self.state.score_text.rendered_score = None;
        self.pipeline.release();
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Store the player position as given (no clamping)
    pub fn set_player_position(&self, x: f32, y: f32) {
        self.state.player.position_handle().set(x, y);
    }

    pub fn player_position(&self) -> Vec2 {
        self.state.player.position()
    }

    /// Handle for writing the position from an input thread
    pub fn player_input(&self) -> Arc<PlayerPosition> {
        self.state.player.position_handle()
    }

    /// Turn invincibility on or off until changed again
    pub fn set_invincible(&mut self, invincible: bool) {
        let invincibility = if invincible {
            Invincibility::Held
        } else {
            Invincibility::Off
        };
        self.state.player.set_invincibility(invincibility);
        log::info!("Invincibility {}", if invincible { "on" } else { "off" });
    }

    /// Invincible for `duration` from now
    pub fn grant_invincibility(&mut self, duration: Duration) {
        let until = self.clock.now() + duration;
        self.state
            .player
            .set_invincibility(Invincibility::Until(until));
        log::info!("Invincible for {}ms", duration.as_millis());
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Unit sizes for the current surface
    pub fn coords(&self) -> Option<&CoordinateData> {
        self.coords.as_ref()
    }

    pub fn pipeline(&self) -> &RenderPipeline<B> {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut RenderPipeline<B> {
        &mut self.pipeline
    }

    pub fn score(&self) -> u64 {
        self.state.flags.score
    }

    // ------------------------------------------------------------------
    // Frame steps
    // ------------------------------------------------------------------

    fn apply_pending_surface(&mut self) {
        let Some((width, height)) = self.pending_surface.take() else {
            return;
        };
        if self.coords.is_some_and(|c| c.matches(width, height)) {
            return;
        }
        self.coords = CoordinateData::compute(&self.tuning.sprite_sizes, width, height);
        log::debug!("Coordinate data rebuilt for {}x{}", width, height);
    }

    /// Player texture and score text follow the state they depict
    fn refresh_derived_textures(&mut self) -> Result<(), RenderError> {
        let player = &mut self.state.player;
        if player.texture_swap_pending {
            let variant = player.wanted_variant();
            self.pipeline.refresh_player_texture(variant)?;
            player.variant = variant;
            player.texture_swap_pending = false;
        }

        let score = self.state.flags.score;
        if self.state.score_text.needs_refresh(score) {
            let previous = self.state.score_text.texture;
            self.state.score_text.texture = self.pipeline.render_score_texture(score, previous)?;
            self.state.score_text.rendered_score = Some(score);
        }
        Ok(())
    }

    fn step(&mut self, now: Duration, coords: &CoordinateData) -> TickReport {
        let ctx = TickContext {
            coords,
            tuning: &self.tuning,
            now,
        };
        tick(&mut self.state, self.rng.as_mut(), &ctx)
    }
}
