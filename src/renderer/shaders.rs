//! Shader sources for the two programs

use super::backend::ProgramKind;

/// WGSL module plus the names a backend needs to bind it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: &'static str,
    pub wgsl: &'static str,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
    /// Fields of the uniform block, as named in the WGSL
    pub uniforms: &'static [&'static str],
}

pub const TEXTURED_QUAD: ShaderSource = ShaderSource {
    label: "textured_quad",
    wgsl: include_str!("shaders/textured_quad.wgsl"),
    vertex_entry: "vs_main",
    fragment_entry: "fs_main",
    uniforms: &["mvp"],
};

pub const EDGE_OVERLAY: ShaderSource = ShaderSource {
    label: "edge_overlay",
    wgsl: include_str!("shaders/edge_overlay.wgsl"),
    vertex_entry: "vs_main",
    fragment_entry: "fs_main",
    uniforms: &["mvp", "red_intensity", "tint_type"],
};

impl ShaderSource {
    /// First entry point or uniform field the module does not declare
    pub fn undeclared_name(&self) -> Option<&'static str> {
        [self.vertex_entry, self.fragment_entry]
            .into_iter()
            .find(|entry| !self.wgsl.contains(&format!("fn {entry}")))
            .or_else(|| {
                self.uniforms
                    .iter()
                    .copied()
                    .find(|name| !self.wgsl.contains(&format!("{name}:")))
            })
    }
}

impl ProgramKind {
    pub fn source(self) -> &'static ShaderSource {
        match self {
            ProgramKind::TexturedQuad => &TEXTURED_QUAD,
            ProgramKind::EdgeOverlay => &EDGE_OVERLAY,
        }
    }
}
