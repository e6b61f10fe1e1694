//! Directional shadow mapping.
//!
//! [`ShadowPass`] owns a square depth texture, a depth-only pipeline with
//! hardware depth bias, and a comparison sampler. Each frame it:
//!
//! 1. clears the depth texture to 1.0 and renders every drawable into it from
//!    the shadow caster's point of view, in its own render pass with a
//!    shadow-sized viewport;
//! 2. hands the depth texture and comparison sampler to the lighting pass
//!    ([`ShadowPass::sampling_bind_group`]);
//! 3. is released again ([`ShadowPass::end_sampling`]) before the next frame
//!    may write to it.
//!
//! The order is enforced by [`ShadowPhase`]. Light-space matrices are cached
//! and only rebuilt when the light direction or frustum changes.
//!
//! # Example
//!
//! ```no_run
//! use penumbra::{GpuContext, ObjectBuffer, ShadowConfig, ShadowPass, Vec3};
//!
//! # fn demo(gpu: &GpuContext, objects: &ObjectBuffer) -> Result<(), penumbra::ShadowError> {
//! let mut shadows = ShadowPass::new(gpu, ShadowConfig::new().resolution(1024), objects)?;
//! shadows.create_shadow_map_resources(gpu)?;
//! shadows.set_light_direction(Vec3::new(1.0, -1.0, 0.0))?;
//! # Ok(())
//! # }
//! ```

pub mod light_space;
pub mod phase;

use glam::Vec3;

pub use light_space::{LightFrustum, LightSpace};
pub use phase::ShadowPhase;

use crate::cache::Cached;
use crate::error::{ConfigError, GraphicsResourceError, ShadowError, ShadowStateError};
use crate::gpu::{DEPTH_FORMAT, GpuContext};
use crate::mesh::{FRONT_FACE, Vertex};
use crate::objects::{DrawCall, ObjectBuffer};

/// Shadow map size, light frustum and depth bias.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowConfig {
    /// Width and height of the depth texture; a power of two.
    pub resolution: u32,
    /// World-space width and height of the orthographic light frustum.
    pub projection_size: f32,
    /// How far back along the light direction the shadow camera sits.
    pub light_distance: f32,
    pub near: f32,
    pub far: f32,
    /// Constant depth bias, in depth-buffer units.
    pub depth_bias: i32,
    pub slope_scale: f32,
    pub bias_clamp: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            resolution: 2048,
            projection_size: 20.0,
            light_distance: 20.0,
            near: 1.0,
            far: 100.0,
            depth_bias: 2,
            slope_scale: 2.0,
            bias_clamp: 0.0,
        }
    }
}

impl ShadowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn projection_size(mut self, size: f32) -> Self {
        self.projection_size = size;
        self
    }

    pub fn light_distance(mut self, distance: f32) -> Self {
        self.light_distance = distance;
        self
    }

    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn depth_bias(mut self, constant: i32, slope_scale: f32, clamp: f32) -> Self {
        self.depth_bias = constant;
        self.slope_scale = slope_scale;
        self.bias_clamp = clamp;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.resolution.is_power_of_two() {
            return Err(ConfigError::InvalidShadowResolution(self.resolution));
        }
        if !(self.projection_size.is_finite() && self.projection_size > 0.0) {
            return Err(ConfigError::InvalidShadowProjection(self.projection_size));
        }
        if !(self.light_distance.is_finite() && self.light_distance > 0.0) {
            return Err(ConfigError::InvalidShadowProjection(self.light_distance));
        }
        if !(self.near > 0.0 && self.near < self.far && self.far.is_finite()) {
            return Err(ConfigError::InvalidClipPlanes {
                near: self.near,
                far: self.far,
            });
        }
        Ok(())
    }

    pub fn frustum(&self) -> LightFrustum {
        LightFrustum {
            distance: self.light_distance,
            size: self.projection_size,
            near: self.near,
            far: self.far,
        }
    }

    fn bias(&self) -> wgpu::DepthBiasState {
        wgpu::DepthBiasState {
            constant: self.depth_bias,
            slope_scale: self.slope_scale,
            clamp: self.bias_clamp,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ShadowUniform {
    view_projection: [[f32; 4]; 4],
}

struct ShadowMap {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

pub struct ShadowPass {
    config: ShadowConfig,
    direction: Vec3,
    light_space: Cached<LightSpace>,
    phase: ShadowPhase,
    map: Option<ShadowMap>,
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    sampling_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    fallback: wgpu::BindGroup,
}

impl ShadowPass {
    /// Validates `config` and builds the pipeline and sampler.
    ///
    /// The depth texture itself is created by
    /// [`create_shadow_map_resources`](Self::create_shadow_map_resources).
    pub fn new(
        gpu: &GpuContext,
        config: ShadowConfig,
        objects: &ObjectBuffer,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shadow Depth Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/shadow_depth.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Uniforms"),
            size: std::mem::size_of::<ShadowUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, objects.layout()],
            push_constant_ranges: &[],
        });

        let pipeline = create_pipeline(gpu, &shader, &pipeline_layout, config.bias());

        let sampling_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Sampling Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        // Outside the map everything is lit: border white where the device
        // allows it, and the lighting shader also skips out-of-range lookups.
        let border = gpu.supports_border_clamp();
        let address_mode = if border {
            wgpu::AddressMode::ClampToBorder
        } else {
            wgpu::AddressMode::ClampToEdge
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            border_color: border.then_some(wgpu::SamplerBorderColor::OpaqueWhite),
            ..Default::default()
        });

        let fallback_texture = create_depth_map(gpu, 1, "Shadow Fallback Texture");
        let fallback_view = fallback_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let fallback = create_sampling_bind_group(gpu, &sampling_layout, &fallback_view, &sampler);

        let frustum = config.frustum();
        let direction = Vec3::NEG_Y;
        Ok(Self {
            light_space: Cached::new(LightSpace::from_unit_direction(direction, frustum)),
            direction,
            config,
            phase: ShadowPhase::Uninitialized,
            map: None,
            shader,
            pipeline_layout,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            sampling_layout,
            sampler,
            fallback,
        })
    }

    /// Creates the depth texture, its view and its sampling bind group.
    ///
    /// Does nothing if they already exist at the configured resolution.
    pub fn create_shadow_map_resources(&mut self, gpu: &GpuContext) -> Result<(), ShadowError> {
        if let Some(map) = &self.map {
            if map.texture.width() == self.config.resolution {
                return Ok(());
            }
        }
        if self.phase.is_sampling() {
            return Err(ShadowStateError::InvalidTransition {
                from: self.phase,
                to: ShadowPhase::Configured,
            }
            .into());
        }

        let resolution = self.config.resolution;
        let max = gpu.max_texture_dimension();
        if resolution > max {
            return Err(GraphicsResourceError::TextureTooLarge {
                requested: resolution,
                max,
            }
            .into());
        }

        let texture = create_depth_map(gpu, resolution, "Shadow Map");
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = create_sampling_bind_group(gpu, &self.sampling_layout, &view, &self.sampler);
        self.map = Some(ShadowMap {
            texture,
            view,
            bind_group,
        });
        self.phase.advance(ShadowPhase::Configured)?;
        log::info!("Created {resolution}x{resolution} shadow map");
        Ok(())
    }

    /// Applies a new configuration, recreating whatever it affects.
    ///
    /// Rejected while the map is bound for sampling. On a resource error the
    /// pass is left without a map, and
    /// [`render_shadow_map`](Self::render_shadow_map) refuses to run until
    /// resources are created successfully.
    pub fn reconfigure(&mut self, gpu: &GpuContext, config: ShadowConfig) -> Result<(), ShadowError> {
        config.validate()?;
        if self.phase.is_sampling() {
            return Err(ShadowStateError::InvalidTransition {
                from: self.phase,
                to: ShadowPhase::Configured,
            }
            .into());
        }

        if config.bias() != self.config.bias() {
            self.pipeline = create_pipeline(gpu, &self.shader, &self.pipeline_layout, config.bias());
        }
        if config.frustum() != self.config.frustum() {
            self.light_space.invalidate();
        }
        if config.resolution != self.config.resolution {
            self.map = None;
            self.phase = ShadowPhase::Uninitialized;
        }
        self.config = config;

        if self.map.is_some() {
            self.phase.advance(ShadowPhase::Configured)?;
            Ok(())
        } else {
            self.create_shadow_map_resources(gpu)
        }
    }

    /// Points the shadow camera along `direction`.
    pub fn set_light_direction(&mut self, direction: Vec3) -> Result<(), ConfigError> {
        let dir = direction
            .try_normalize()
            .ok_or(ConfigError::ZeroLightDirection)?;
        if dir != self.direction {
            self.direction = dir;
            self.light_space.invalidate();
        }
        Ok(())
    }

    pub fn light_direction(&self) -> Vec3 {
        self.direction
    }

    /// Light view and projection, rebuilt only after a change.
    pub fn light_space(&mut self) -> LightSpace {
        let (direction, frustum) = (self.direction, self.config.frustum());
        self.light_space
            .get_or_update(|| LightSpace::from_unit_direction(direction, frustum))
    }

    /// Records the depth-only pass for every draw.
    ///
    /// The pass is self-contained: its viewport, pipeline and bind groups end
    /// with it, so the caller's main pass starts from a clean state.
    pub fn render_shadow_map(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        objects: &ObjectBuffer,
        draws: &[DrawCall],
    ) -> Result<(), ShadowStateError> {
        let uniform = ShadowUniform {
            view_projection: self.light_space().view_projection().to_cols_array_2d(),
        };
        let Some(map) = self.map.as_ref() else {
            return Err(ShadowStateError::InvalidTransition {
                from: self.phase,
                to: ShadowPhase::Cleared,
            });
        };
        self.phase.advance(ShadowPhase::Cleared)?;
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let size = map.texture.width() as f32;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_viewport(0.0, 0.0, size, size, 0.0, 1.0);
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            for draw in draws {
                pass.set_bind_group(1, objects.bind_group(), &[draw.object_offset]);
                draw.mesh.draw(&mut pass);
            }
        }

        self.phase.advance(ShadowPhase::Rendered)
    }

    /// Hands the rendered map over to the lighting pass.
    pub fn begin_sampling(&mut self) -> Result<(), ShadowStateError> {
        self.phase.advance(ShadowPhase::Sampling)
    }

    /// Group 2 of the lighting pipeline: depth texture at binding 0,
    /// comparison sampler at binding 1.
    ///
    /// Outside [`ShadowPhase::Sampling`] this is a 1×1 placeholder map, so the
    /// real map can never be bound while it is a render target.
    pub fn sampling_bind_group(&self) -> &wgpu::BindGroup {
        match &self.map {
            Some(map) if self.phase.is_sampling() => &map.bind_group,
            _ => &self.fallback,
        }
    }

    /// Releases the map from the lighting pass so it may be written again.
    pub fn end_sampling(&mut self) -> Result<(), ShadowStateError> {
        self.phase.advance(ShadowPhase::Unbound)
    }

    pub fn sampling_layout(&self) -> &wgpu::BindGroupLayout {
        &self.sampling_layout
    }

    pub fn phase(&self) -> ShadowPhase {
        self.phase
    }

    pub fn config(&self) -> &ShadowConfig {
        &self.config
    }

    pub fn has_resources(&self) -> bool {
        self.map.is_some()
    }

    /// Size of one shadow-map texel in UV units, for PCF offsets.
    pub fn texel_size(&self) -> f32 {
        1.0 / self.config.resolution as f32
    }
}

fn create_pipeline(
    gpu: &GpuContext,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    bias: wgpu::DepthBiasState,
) -> wgpu::RenderPipeline {
    gpu.device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shadow Pipeline"),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs"),
                buffers: &[Vertex::POSITION_LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: FRONT_FACE,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias,
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
}

fn create_depth_map(gpu: &GpuContext, resolution: u32, label: &str) -> wgpu::Texture {
    gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: resolution,
            height: resolution,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    })
}

fn create_sampling_bind_group(
    gpu: &GpuContext,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Shadow Sampling Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ShadowConfig::default();
        assert_eq!(config.resolution, 2048);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn resolution_must_be_power_of_two() {
        for bad in [0, 1000, 3] {
            assert_eq!(
                ShadowConfig::new().resolution(bad).validate(),
                Err(ConfigError::InvalidShadowResolution(bad))
            );
        }
        assert!(ShadowConfig::new().resolution(512).validate().is_ok());
    }

    #[test]
    fn frustum_must_be_non_degenerate() {
        assert_eq!(
            ShadowConfig::new().projection_size(0.0).validate(),
            Err(ConfigError::InvalidShadowProjection(0.0))
        );
        assert!(matches!(
            ShadowConfig::new().clip_planes(5.0, 5.0).validate(),
            Err(ConfigError::InvalidClipPlanes { .. })
        ));
        assert!(ShadowConfig::new().light_distance(-1.0).validate().is_err());
    }

    #[test]
    fn bias_reaches_pipeline_state() {
        let bias = ShadowConfig::new().depth_bias(4, 1.5, 0.01).bias();
        assert_eq!(bias.constant, 4);
        assert_eq!(bias.slope_scale, 1.5);
        assert_eq!(bias.clamp, 0.01);
    }
}
