//! Error types surfaced to the host

use thiserror::Error;

use crate::renderer::{ProgramKind, TextureAsset};

/// Failures from the render pipeline or its backend
#[derive(Debug, Error)]
pub enum RenderError {
    /// Shader source rejected by the driver. Fatal: there is no fallback program.
    #[error("failed to compile {program:?} shader: {log}")]
    ShaderCompile { program: ProgramKind, log: String },

    #[error("failed to link {program:?} program: {log}")]
    ProgramLink { program: ProgramKind, log: String },

    #[error("could not allocate {width}x{height} offscreen target: {reason}")]
    OffscreenTarget {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("texture upload failed: {0}")]
    TextureUpload(String),

    #[error("render pipeline used before the surface was created")]
    NotInitialized,
}

/// Failures while fetching decoded images from asset storage
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset {0:?} not found")]
    NotFound(TextureAsset),

    #[error("asset {asset:?} could not be decoded: {reason}")]
    Decode { asset: TextureAsset, reason: String },
}

/// Failures while loading a tuning file
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("tuning parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
