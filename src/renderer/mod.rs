//! Rendering module
//!
//! The pipeline draws each frame into an offscreen texture through the
//! `GraphicsBackend` seam. `HeadlessBackend` records calls without a GPU;
//! `WgpuBackend` (feature `gpu`) drives WebGPU.

pub mod assets;
pub mod backend;
pub mod headless;
pub mod pipeline;
pub mod shaders;
pub mod text;
#[cfg(feature = "gpu")]
pub mod vertex;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use assets::{AssetSource, MemoryAssets, TextureAsset};
pub use backend::{
    GraphicsBackend, Image, OffscreenTarget, ProgramHandle, ProgramKind, QuadGeometry,
    TextureHandle, Tint, Uniform,
};
pub use headless::{BackendCall, HeadlessBackend};
pub use pipeline::{PassState, RenderPipeline};
pub use shaders::ShaderSource;
#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuBackend;
