//! Frame orchestration.
//!
//! One frame, in order:
//! 1. refresh the active camera's view matrix,
//! 2. gather drawables and upload their object uniforms,
//! 3. shadow pass (when enabled and a directional caster exists),
//! 4. lit pass, into the post-process target or straight to the swapchain,
//! 5. release the shadow map from sampling,
//! 6. post-process pass, then present.

use crate::error::{ConfigError, GraphicsResourceError, ShadowError};
use crate::forward_pass::{CameraState, ForwardPass, FrameUniform};
use crate::gpu::{GpuContext, create_depth_texture};
use crate::objects::{DrawCall, ObjectBuffer, ObjectUniform};
use crate::post_process::{PostProcessPass, PostProcessSettings};
use crate::render_target::PostProcessTarget;
use crate::scene::{Drawable, Scene};
use crate::shadow::{ShadowConfig, ShadowPass};

pub struct Renderer {
    objects: ObjectBuffer,
    forward: ForwardPass,
    shadow: ShadowPass,
    shadows_enabled: bool,
    post: PostProcessPass,
    post_target: PostProcessTarget,
    post_bind_group: wgpu::BindGroup,
    post_enabled: bool,
    depth_view: wgpu::TextureView,
    uniforms: Vec<ObjectUniform>,
}

impl Renderer {
    /// Builds every pass.
    ///
    /// A shadow configuration that fails validation is an error; a shadow map
    /// the device cannot allocate only disables shadows.
    pub fn new(
        gpu: &GpuContext,
        shadow_config: ShadowConfig,
        post_enabled: bool,
    ) -> Result<Self, ConfigError> {
        let objects = ObjectBuffer::new(gpu);
        let mut shadow = ShadowPass::new(gpu, shadow_config, &objects)?;
        let shadows_enabled = match shadow.create_shadow_map_resources(gpu) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Running without shadows: {err}");
                false
            }
        };
        let forward = ForwardPass::new(gpu, &objects, shadow.sampling_layout());
        let post = PostProcessPass::new(gpu);
        let post_target = PostProcessTarget::new(gpu, "Post Process Target");
        let post_bind_group = post.create_bind_group(gpu, post_target.view());

        Ok(Self {
            objects,
            forward,
            shadow,
            shadows_enabled,
            post,
            post_target,
            post_bind_group,
            post_enabled,
            depth_view: create_depth_texture(gpu),
            uniforms: Vec::new(),
        })
    }

    /// Resizes the surface and everything sized to it, including every
    /// camera's projection. Zero sizes (minimized window) are ignored.
    pub fn resize(
        &mut self,
        gpu: &mut GpuContext,
        scene: &mut Scene,
        width: u32,
        height: u32,
    ) -> Result<(), ConfigError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        gpu.resize(width, height);
        self.depth_view = create_depth_texture(gpu);
        if self.post_target.ensure_size(gpu) {
            self.post_bind_group = self.post.create_bind_group(gpu, self.post_target.view());
        }
        scene.resize(gpu.aspect())
    }

    /// Turns shadows on or off and returns the resulting state.
    ///
    /// Turning them on retries resource creation if it failed before.
    pub fn set_shadows_enabled(&mut self, gpu: &GpuContext, enabled: bool) -> bool {
        if enabled && !self.shadow.has_resources() {
            if let Err(err) = self.shadow.create_shadow_map_resources(gpu) {
                log::warn!("Cannot enable shadows: {err}");
                self.shadows_enabled = false;
                return false;
            }
        }
        if self.shadows_enabled != enabled {
            log::info!("Shadows {}", if enabled { "on" } else { "off" });
        }
        self.shadows_enabled = enabled;
        enabled
    }

    pub fn shadows_enabled(&self) -> bool {
        self.shadows_enabled
    }

    /// Applies a new shadow configuration. Shadows are disabled if the new
    /// map cannot be allocated.
    pub fn reconfigure_shadows(
        &mut self,
        gpu: &GpuContext,
        config: ShadowConfig,
    ) -> Result<(), ShadowError> {
        let result = self.shadow.reconfigure(gpu, config);
        if let Err(ShadowError::Resource(err)) = &result {
            log::warn!("Shadows disabled: {err}");
            self.shadows_enabled = false;
        }
        result
    }

    pub fn shadow_pass(&self) -> &ShadowPass {
        &self.shadow
    }

    pub fn set_post_processing(&mut self, enabled: bool) {
        self.post_enabled = enabled;
    }

    pub fn post_processing(&self) -> bool {
        self.post_enabled
    }

    pub fn post_settings_mut(&mut self) -> &mut PostProcessSettings {
        &mut self.post.settings
    }

    /// Renders and presents one frame of `scene`.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        scene: &mut Scene,
    ) -> Result<(), GraphicsResourceError> {
        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring");
                gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("Surface timed out, skipping frame");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let camera = scene.active_camera_mut();
        let camera_state = CameraState {
            view: camera.update_view_matrix(),
            projection: camera.projection_matrix(),
            position: camera.position(),
        };

        let caster_direction = scene.lights().shadow_caster_light().map(|l| l.direction);
        if let Some(direction) = caster_direction {
            if let Err(err) = self.shadow.set_light_direction(direction) {
                log::warn!("Keeping previous shadow direction: {err}");
            }
        }
        let cast_shadows =
            self.shadows_enabled && self.shadow.has_resources() && caster_direction.is_some();
        let shadow_state =
            cast_shadows.then(|| (self.shadow.light_space(), self.shadow.texel_size()));

        let mut frame_uniform = FrameUniform::new(camera_state, scene.lights(), shadow_state);
        let light_uniform = scene.lights().to_uniform();
        let background = scene.background();

        let mut drawables: Vec<Drawable> = Vec::new();
        scene.for_each_drawable(|d| drawables.push(d));
        self.uniforms.clear();
        self.uniforms.extend(
            drawables
                .iter()
                .map(|d| ObjectUniform::new(d.matrices, d.material)),
        );
        self.objects.write(gpu, &self.uniforms);
        let draws: Vec<DrawCall> = drawables
            .iter()
            .enumerate()
            .map(|(i, d)| DrawCall {
                mesh: d.mesh,
                object_offset: self.objects.offset(i),
            })
            .collect();

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let mut sampling = false;
        if cast_shadows {
            let result = self
                .shadow
                .render_shadow_map(gpu, &mut encoder, &self.objects, &draws)
                .and_then(|()| self.shadow.begin_sampling());
            match result {
                Ok(()) => sampling = true,
                Err(err) => log::error!("Shadow pass skipped: {err}"),
            }
        }
        if !sampling {
            frame_uniform.shadow_enabled = 0;
        }
        self.forward.write_frame(gpu, &frame_uniform, &light_uniform);

        {
            let target = if self.post_enabled {
                self.post_target.view()
            } else {
                &surface_view
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: background.x as f64,
                            g: background.y as f64,
                            b: background.z as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.forward.render(
                &mut pass,
                &self.objects,
                self.shadow.sampling_bind_group(),
                &draws,
            );
        }

        if sampling {
            if let Err(err) = self.shadow.end_sampling() {
                log::error!("{err}");
            }
        }

        if self.post_enabled {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Post Process Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.post.render(gpu, &mut pass, &self.post_bind_group);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
