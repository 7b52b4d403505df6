//! WebGPU implementation of the graphics backend
//!
//! Calls between `bind_offscreen_target` and `unbind_offscreen_target` are
//! recorded, then replayed as one render pass into the target texture. Each
//! draw gets its own slot in a dynamic-offset uniform buffer.

use std::collections::HashMap;
use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::backend::{
    GraphicsBackend, Image, OffscreenTarget, ProgramHandle, ProgramKind, QuadGeometry,
    TextureHandle, Uniform,
};
use super::shaders::ShaderSource;
use super::vertex::{FULL_SCREEN_QUAD, UNIT_QUAD, Vertex};
use crate::error::RenderError;

/// Draws per offscreen pass
const MAX_DRAWS: usize = 256;

/// Offscreen colour format
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const SPRITE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Must match `Uniforms` in both shaders
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GpuUniforms {
    mvp: [[f32; 4]; 4],    // offset 0
    red_intensity: f32,    // offset 64
    tint_type: i32,        // offset 68
    _pad: [f32; 2],        // pad to 80 bytes
}

impl Default for GpuUniforms {
    fn default() -> Self {
        Self {
            mvp: glam::Mat4::IDENTITY.to_cols_array_2d(),
            red_intensity: 0.0,
            tint_type: 0,
            _pad: [0.0; 2],
        }
    }
}

struct ProgramPipelines {
    kind: ProgramKind,
    opaque: wgpu::RenderPipeline,
    blended: wgpu::RenderPipeline,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct GpuTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

#[derive(Clone, Copy)]
struct DrawCommand {
    program: ProgramHandle,
    blending: bool,
    texture: TextureHandle,
    geometry: QuadGeometry,
    uniforms: GpuUniforms,
}

struct PassRecording {
    target: u32,
    viewport: Option<(u32, u32)>,
    clear: Option<[f32; 4]>,
    draws: Vec<DrawCommand>,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    sampler: wgpu::Sampler,
    unit_quad: wgpu::Buffer,
    full_screen_quad: wgpu::Buffer,

    programs: HashMap<ProgramHandle, ProgramPipelines>,
    textures: HashMap<TextureHandle, GpuTexture>,
    targets: HashMap<u32, GpuTarget>,
    next_id: u32,

    pass: Option<PassRecording>,
    program: Option<ProgramHandle>,
    texture: TextureHandle,
    blending: bool,
    uniforms: GpuUniforms,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let uniform_size = std::mem::size_of::<GpuUniforms>() as u64;
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = uniform_size.div_ceil(alignment) * alignment;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(uniform_size),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw_uniforms"),
            size: uniform_stride * MAX_DRAWS as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: NonZeroU64::new(uniform_size),
                }),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sprite_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let unit_quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("unit_quad"),
            contents: bytemuck::cast_slice(&UNIT_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let full_screen_quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("full_screen_quad"),
            contents: bytemuck::cast_slice(&FULL_SCREEN_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        log::info!("wgpu backend ready, uniform stride {uniform_stride}");

        Self {
            device,
            queue,
            uniform_layout,
            texture_layout,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            sampler,
            unit_quad,
            full_screen_quad,
            programs: HashMap::new(),
            textures: HashMap::new(),
            targets: HashMap::new(),
            next_id: 0,
            pass: None,
            program: None,
            texture: TextureHandle::INVALID,
            blending: false,
            uniforms: GpuUniforms::default(),
        }
    }

    /// Colour view of an offscreen target, for the host's composite pass
    pub fn target_view(&self, target: &OffscreenTarget) -> Option<&wgpu::TextureView> {
        self.targets.get(&target.id).map(|t| &t.view)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn build_pipeline(
        &self,
        source: &ShaderSource,
        module: &wgpu::ShaderModule,
        layout: &wgpu::PipelineLayout,
        blend: Option<wgpu::BlendState>,
    ) -> wgpu::RenderPipeline {
        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(source.label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some(source.vertex_entry),
                    buffers: &[Vertex::desc()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(source.fragment_entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
    }

    /// Replay a recorded pass into its target
    fn flush(&self, pass: PassRecording) {
        let Some(target) = self.targets.get(&pass.target) else {
            log::warn!("Dropping pass for released target {}", pass.target);
            return;
        };

        let mut staging = vec![0u8; self.uniform_stride as usize * pass.draws.len()];
        for (i, draw) in pass.draws.iter().enumerate() {
            let offset = i * self.uniform_stride as usize;
            let bytes = bytemuck::bytes_of(&draw.uniforms);
            staging[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        if !staging.is_empty() {
            self.queue.write_buffer(&self.uniform_buffer, 0, &staging);
        }

        let load = match pass.clear {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("offscreen_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("offscreen_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Some((width, height)) = pass.viewport {
                render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
            }

            for (i, draw) in pass.draws.iter().enumerate() {
                let Some(program) = self.programs.get(&draw.program) else {
                    continue;
                };
                let pipeline = if draw.blending {
                    &program.blended
                } else {
                    &program.opaque
                };

                render_pass.set_pipeline(pipeline);
                let offset = (i as u64 * self.uniform_stride) as u32;
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);

                if program.kind == ProgramKind::TexturedQuad {
                    // Unloaded textures draw nothing
                    let Some(texture) = self.textures.get(&draw.texture) else {
                        continue;
                    };
                    render_pass.set_bind_group(1, &texture.bind_group, &[]);
                }

                let quad = match draw.geometry {
                    QuadGeometry::Unit => &self.unit_quad,
                    QuadGeometry::FullScreen => &self.full_screen_quad,
                };
                render_pass.set_vertex_buffer(0, quad.slice(..));
                render_pass.draw(0..4, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl GraphicsBackend for WgpuBackend {
    fn compile_program(
        &mut self,
        kind: ProgramKind,
        source: &ShaderSource,
    ) -> Result<ProgramHandle, RenderError> {
        if let Some(name) = source.undeclared_name() {
            return Err(RenderError::ShaderCompile {
                program: kind,
                log: format!("{}: {name} is not declared", source.label),
            });
        }

        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(source.label),
                source: wgpu::ShaderSource::Wgsl(source.wgsl.into()),
            });

        let layout = match kind {
            ProgramKind::TexturedQuad => {
                self.device
                    .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("textured_quad_layout"),
                        bind_group_layouts: &[&self.uniform_layout, &self.texture_layout],
                        immediate_size: 0,
                    })
            }
            ProgramKind::EdgeOverlay => {
                self.device
                    .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("edge_overlay_layout"),
                        bind_group_layouts: &[&self.uniform_layout],
                        immediate_size: 0,
                    })
            }
        };

        let opaque = self.build_pipeline(source, &module, &layout, None);
        let blended = self.build_pipeline(
            source,
            &module,
            &layout,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        );

        let handle = ProgramHandle(self.allocate());
        self.programs.insert(
            handle,
            ProgramPipelines {
                kind,
                opaque,
                blended,
            },
        );
        log::info!("Compiled {} program", source.label);
        Ok(handle)
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

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sprite_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SPRITE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite_bind_group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let handle = TextureHandle(self.allocate());
        self.textures.insert(
            handle,
            GpuTexture {
                _texture: texture,
                bind_group,
            },
        );
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_none() {
            log::warn!("Deleting unknown texture {texture:?}");
        }
    }

    fn create_offscreen_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<OffscreenTarget, RenderError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::OffscreenTarget {
                width,
                height,
                reason: format!("dimensions must be within 1..={max}"),
            });
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = self.allocate();
        let target = OffscreenTarget {
            id,
            texture: TextureHandle(self.allocate()),
            width,
            height,
        };
        self.targets.insert(id, GpuTarget { texture, view });
        Ok(target)
    }

    fn release_offscreen_target(&mut self, target: OffscreenTarget) {
        if let Some(gpu) = self.targets.remove(&target.id) {
            gpu.texture.destroy();
        }
    }

    fn bind_offscreen_target(&mut self, target: &OffscreenTarget) {
        if self.pass.is_some() {
            log::warn!("Offscreen target bound twice; discarding earlier pass");
        }
        self.pass = Some(PassRecording {
            target: target.id,
            viewport: None,
            clear: None,
            draws: Vec::new(),
        });
    }

    fn unbind_offscreen_target(&mut self) {
        if let Some(pass) = self.pass.take() {
            self.flush(pass);
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        if let Some(pass) = self.pass.as_mut() {
            pass.viewport = Some((width, height));
        }
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        if let Some(pass) = self.pass.as_mut() {
            pass.clear = Some(rgba);
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.program = Some(program);
    }

    fn set_uniform(&mut self, uniform: Uniform) {
        match uniform {
            Uniform::Mvp(m) => self.uniforms.mvp = m.to_cols_array_2d(),
            Uniform::RedIntensity(v) => self.uniforms.red_intensity = v,
            Uniform::TintType(tint) => self.uniforms.tint_type = tint as i32,
        }
    }

    fn bind_texture(&mut self, texture: TextureHandle) {
        self.texture = texture;
    }

    fn set_blending(&mut self, enabled: bool) {
        self.blending = enabled;
    }

    fn draw_quad(&mut self, geometry: QuadGeometry) {
        let Some(program) = self.program else {
            log::warn!("draw_quad with no program in use");
            return;
        };
        let Some(pass) = self.pass.as_mut() else {
            log::warn!("draw_quad outside an offscreen pass");
            return;
        };
        if pass.draws.len() >= MAX_DRAWS {
            log::warn!("Offscreen pass exceeded {MAX_DRAWS} draws");
            return;
        }
        pass.draws.push(DrawCommand {
            program,
            blending: self.blending,
            texture: self.texture,
            geometry,
            uniforms: self.uniforms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<GpuUniforms>(), 80);
        assert_eq!(std::mem::offset_of!(GpuUniforms, red_intensity), 64);
        assert_eq!(std::mem::offset_of!(GpuUniforms, tint_type), 68);
    }

    #[test]
    fn test_quads_are_triangle_strips() {
        assert_eq!(UNIT_QUAD.len(), 4);
        assert_eq!(UNIT_QUAD[0].position, [-0.5, -0.5]);
        assert_eq!(FULL_SCREEN_QUAD[3].position, [1.0, 1.0]);
    }
}
