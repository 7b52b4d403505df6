//! Recording backend for running without a GPU
//!
//! Every call is appended to a log that tests and the native demo inspect.
//! Handles are allocated from one counter starting at 1, so 0 stays invalid.

use std::collections::HashSet;

use super::backend::{
    GraphicsBackend, Image, OffscreenTarget, ProgramHandle, ProgramKind, QuadGeometry,
    TextureHandle, Uniform,
};
use super::shaders::ShaderSource;
use crate::error::RenderError;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CompileProgram(ProgramKind),
    UploadTexture {
        handle: TextureHandle,
        width: u32,
        height: u32,
    },
    DeleteTexture(TextureHandle),
    CreateTarget(OffscreenTarget),
    ReleaseTarget(OffscreenTarget),
    BindTarget(u32),
    UnbindTarget,
    Viewport(u32, u32),
    Clear([f32; 4]),
    UseProgram(ProgramHandle),
    Uniform(Uniform),
    BindTexture(TextureHandle),
    Blending(bool),
    Draw(QuadGeometry),
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    calls: Vec<BackendCall>,
    next_id: u32,
    textures: HashSet<TextureHandle>,
    targets: HashSet<u32>,
    bound_target: Option<u32>,
    failing_program: Option<ProgramKind>,
    frames: u64,
    draws: u64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make compiling `kind` fail, as a driver would on a bad shader
    pub fn fail_program(&mut self, kind: ProgramKind) {
        self.failing_program = Some(kind);
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Drain the call log
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    /// Uploaded textures not yet deleted
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    /// Completed offscreen passes
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Quads drawn since creation
    pub fn draws(&self) -> u64 {
        self.draws
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn compile_program(
        &mut self,
        kind: ProgramKind,
        source: &ShaderSource,
    ) -> Result<ProgramHandle, RenderError> {
        self.calls.push(BackendCall::CompileProgram(kind));

        if self.failing_program == Some(kind) {
            return Err(RenderError::ShaderCompile {
                program: kind,
                log: format!("{}: forced failure", source.label),
            });
        }
        if let Some(name) = source.undeclared_name() {
            return Err(RenderError::ProgramLink {
                program: kind,
                log: format!("{}: {name} is not declared", source.label),
            });
        }
        Ok(ProgramHandle(self.allocate()))
    }

    fn upload_texture(&mut self, image: &Image) -> Result<TextureHandle, RenderError> {
        if !image.is_consistent() {
            return Err(RenderError::TextureUpload(format!(
                "{}x{} image with {} bytes",
                image.width,
                image.height,
                image.pixels.len()
            )));
        }
        let handle = TextureHandle(self.allocate());
        self.textures.insert(handle);
        self.calls.push(BackendCall::UploadTexture {
            handle,
            width: image.width,
            height: image.height,
        });
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if !self.textures.remove(&texture) {
            log::warn!("Deleting unknown texture {texture:?}");
        }
        self.calls.push(BackendCall::DeleteTexture(texture));
    }

    fn create_offscreen_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<OffscreenTarget, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::OffscreenTarget {
                width,
                height,
                reason: "zero-sized target".to_string(),
            });
        }
        let id = self.allocate();
        let target = OffscreenTarget {
            id,
            texture: TextureHandle(self.allocate()),
            width,
            height,
        };
        self.targets.insert(id);
        self.calls.push(BackendCall::CreateTarget(target));
        Ok(target)
    }

    fn release_offscreen_target(&mut self, target: OffscreenTarget) {
        self.targets.remove(&target.id);
        if self.bound_target == Some(target.id) {
            self.bound_target = None;
        }
        self.calls.push(BackendCall::ReleaseTarget(target));
    }

    fn bind_offscreen_target(&mut self, target: &OffscreenTarget) {
        debug_assert!(self.targets.contains(&target.id), "binding released target");
        self.bound_target = Some(target.id);
        self.calls.push(BackendCall::BindTarget(target.id));
    }

    fn unbind_offscreen_target(&mut self) {
        if self.bound_target.take().is_some() {
            self.frames += 1;
        }
        self.calls.push(BackendCall::UnbindTarget);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(BackendCall::Viewport(width, height));
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        self.calls.push(BackendCall::Clear(rgba));
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.calls.push(BackendCall::UseProgram(program));
    }

    fn set_uniform(&mut self, uniform: Uniform) {
        self.calls.push(BackendCall::Uniform(uniform));
    }

    fn bind_texture(&mut self, texture: TextureHandle) {
        self.calls.push(BackendCall::BindTexture(texture));
    }

    fn set_blending(&mut self, enabled: bool) {
        self.calls.push(BackendCall::Blending(enabled));
    }

    fn draw_quad(&mut self, geometry: QuadGeometry) {
        self.draws += 1;
        self.calls.push(BackendCall::Draw(geometry));
    }
}
