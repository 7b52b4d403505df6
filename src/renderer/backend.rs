//! Graphics backend seam
//!
//! The pipeline talks to the driver through this small immediate-mode
//! interface so that game and render logic can run without a GPU.

use glam::Mat4;

use super::shaders::ShaderSource;
use crate::error::RenderError;

/// The two shader programs the game uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Textured unit quad with an `mvp` matrix
    TexturedQuad,
    /// Full-screen edge flash with `redIntensity` and `tintType`
    EdgeOverlay,
}

/// Handle to a compiled, linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Handle to an uploaded texture. `INVALID` marks a failed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    pub const INVALID: TextureHandle = TextureHandle(0);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// A texture-backed render destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffscreenTarget {
    pub id: u32,
    /// Colour attachment, sampled by the host when compositing
    pub texture: TextureHandle,
    pub width: u32,
    pub height: u32,
}

/// Quad geometry drawn as a 4-vertex triangle strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadGeometry {
    /// Centred square of side 1, scaled by the model matrix
    Unit,
    /// Covers clip space [-1, 1] on both axes
    FullScreen,
}

/// Overlay tint selected by the `tintType` uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tint {
    Red = 0,
    Blue = 1,
}

/// Uniform values understood by the programs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Mvp(Mat4),
    RedIntensity(f32),
    TintType(Tint),
}

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA, top row first
    pub pixels: Vec<u8>,
}

impl Image {
    /// Image filled with one colour
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// True if the pixel buffer matches the dimensions
    pub fn is_consistent(&self) -> bool {
        self.width > 0 && self.height > 0 && self.pixels.len() == (self.width * self.height * 4) as usize
    }
}

/// Driver operations needed by the render pipeline
pub trait GraphicsBackend {
    /// Compile and link a program. Failure is fatal to initialization.
    fn compile_program(
        &mut self,
        kind: ProgramKind,
        source: &ShaderSource,
    ) -> Result<ProgramHandle, RenderError>;

    fn upload_texture(&mut self, image: &Image) -> Result<TextureHandle, RenderError>;

    fn delete_texture(&mut self, texture: TextureHandle);

    fn create_offscreen_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<OffscreenTarget, RenderError>;

    /// Free the target and its colour texture
    fn release_offscreen_target(&mut self, target: OffscreenTarget);

    /// Make the target the draw destination
    fn bind_offscreen_target(&mut self, target: &OffscreenTarget);

    /// Finish the offscreen pass and restore the default destination
    fn unbind_offscreen_target(&mut self);

    fn set_viewport(&mut self, width: u32, height: u32);

    fn clear(&mut self, rgba: [f32; 4]);

    fn use_program(&mut self, program: ProgramHandle);

    fn set_uniform(&mut self, uniform: Uniform);

    fn bind_texture(&mut self, texture: TextureHandle);

    fn set_blending(&mut self, enabled: bool);

    /// Issue a triangle-strip draw of a quad
    fn draw_quad(&mut self, geometry: QuadGeometry);
}
