//! The main lighting pass.
//!
//! Bind groups:
//! - group 0: [`FrameUniform`] at binding 0, the light array at binding 1
//! - group 1: per-object uniforms, one dynamic offset per draw
//! - group 2: shadow depth texture and comparison sampler
//!
//! The caller owns the render pass (color target and depth buffer) and passes
//! it to [`ForwardPass::render`].

use glam::{Mat4, Vec3};

use crate::gpu::{DEPTH_FORMAT, GpuContext};
use crate::light::{LightArrayUniform, LightList};
use crate::mesh::{FRONT_FACE, Vertex};
use crate::objects::{DrawCall, ObjectBuffer};
use crate::shadow::LightSpace;

/// Shader value of [`FrameUniform::shadow_caster`] when no light casts.
pub const NO_SHADOW_CASTER: u32 = u32::MAX;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub light_view: [[f32; 4]; 4],
    pub light_projection: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub ambient: [f32; 4],
    pub light_count: u32,
    pub shadow_caster: u32,
    pub shadow_enabled: u32,
    pub shadow_texel: f32,
}

/// Camera state for one frame, already refreshed by the caller.
#[derive(Clone, Copy, Debug)]
pub struct CameraState {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
}

impl FrameUniform {
    /// Packs camera, lights and shadow state.
    ///
    /// `shadow` is `None` when shadows are off; the caster index is then still
    /// reported but the shader skips the lookup.
    pub fn new(camera: CameraState, lights: &LightList, shadow: Option<(LightSpace, f32)>) -> Self {
        let (light_space, texel) = shadow.unwrap_or((
            LightSpace {
                view: Mat4::IDENTITY,
                projection: Mat4::IDENTITY,
            },
            0.0,
        ));
        let caster = lights
            .shadow_caster()
            .filter(|_| lights.shadow_caster_light().is_some())
            .map_or(NO_SHADOW_CASTER, |i| i as u32);
        Self {
            view: camera.view.to_cols_array_2d(),
            projection: camera.projection.to_cols_array_2d(),
            light_view: light_space.view.to_cols_array_2d(),
            light_projection: light_space.projection.to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).into(),
            ambient: lights.ambient().extend(1.0).into(),
            light_count: lights.len() as u32,
            shadow_caster: caster,
            shadow_enabled: shadow.is_some() as u32,
            shadow_texel: texel,
        }
    }
}

pub struct ForwardPass {
    pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
}

impl ForwardPass {
    pub fn new(
        gpu: &GpuContext,
        objects: &ObjectBuffer,
        shadow_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lit Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/lit.wgsl").into()),
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Array"),
            size: std::mem::size_of::<LightArrayUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[uniform_entry(0), uniform_entry(1)],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lit Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, objects.layout(), shadow_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Lit Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: FRONT_FACE,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            frame_buffer,
            lights_buffer,
            frame_bind_group,
        }
    }

    /// Uploads this frame's camera, light and shadow uniforms.
    pub fn write_frame(&self, gpu: &GpuContext, frame: &FrameUniform, lights: &LightArrayUniform) {
        gpu.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(frame));
        gpu.queue
            .write_buffer(&self.lights_buffer, 0, bytemuck::bytes_of(lights));
    }

    /// Draws every object with lighting into `render_pass`.
    pub fn render(
        &self,
        render_pass: &mut wgpu::RenderPass,
        objects: &ObjectBuffer,
        shadow: &wgpu::BindGroup,
        draws: &[DrawCall],
    ) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
        render_pass.set_bind_group(2, shadow, &[]);
        for draw in draws {
            render_pass.set_bind_group(1, objects.bind_group(), &[draw.object_offset]);
            draw.mesh.draw(render_pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::Light;

    fn camera() -> CameraState {
        CameraState {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            position: Vec3::new(1.0, 2.0, 3.0),
        }
    }

    #[test]
    fn uniform_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<FrameUniform>(), 304);
    }

    #[test]
    fn reports_caster_and_shadow_state() {
        let mut lights = LightList::new(Vec3::splat(0.1));
        lights
            .add(Light::point(Vec3::Y, Vec3::ONE, 1.0, 5.0))
            .unwrap();
        lights
            .add(Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0))
            .unwrap();

        let off = FrameUniform::new(camera(), &lights, None);
        assert_eq!(off.light_count, 2);
        assert_eq!(off.shadow_caster, 1);
        assert_eq!(off.shadow_enabled, 0);

        let space = LightSpace {
            view: Mat4::from_translation(Vec3::X),
            projection: Mat4::IDENTITY,
        };
        let on = FrameUniform::new(camera(), &lights, Some((space, 1.0 / 2048.0)));
        assert_eq!(on.shadow_enabled, 1);
        assert_eq!(on.light_view[3], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(on.camera_position, [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn no_directional_light_means_no_caster() {
        let mut lights = LightList::default();
        lights
            .add(Light::point(Vec3::Y, Vec3::ONE, 1.0, 5.0))
            .unwrap();
        let frame = FrameUniform::new(camera(), &lights, None);
        assert_eq!(frame.shadow_caster, NO_SHADOW_CASTER);
    }
}
