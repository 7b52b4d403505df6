//! Quad vertices for the wgpu backend

use bytemuck::{Pod, Zeroable};

/// 2D vertex with texture coordinates
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Centred square of side 1, as a triangle strip
pub const UNIT_QUAD: [Vertex; 4] = [
    Vertex::new(-0.5, -0.5, 0.0, 1.0),
    Vertex::new(0.5, -0.5, 1.0, 1.0),
    Vertex::new(-0.5, 0.5, 0.0, 0.0),
    Vertex::new(0.5, 0.5, 1.0, 0.0),
];

/// Clip-space covering quad, as a triangle strip
pub const FULL_SCREEN_QUAD: [Vertex; 4] = [
    Vertex::new(-1.0, -1.0, 0.0, 1.0),
    Vertex::new(1.0, -1.0, 1.0, 1.0),
    Vertex::new(-1.0, 1.0, 0.0, 0.0),
    Vertex::new(1.0, 1.0, 1.0, 0.0),
];
