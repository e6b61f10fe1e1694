//! The off-screen color target the lit scene is rendered into before
//! post-processing.

use crate::gpu::GpuContext;

/// A surface-sized color texture that can be rendered to and then sampled.
///
/// Created with the surface format and recreated by
/// [`ensure_size`](Self::ensure_size) whenever the surface changes size.
pub struct PostProcessTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    label: String,
}

impl PostProcessTarget {
    pub fn new(gpu: &GpuContext, label: &str) -> Self {
        let (width, height) = target_size(gpu.width(), gpu.height());
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gpu.config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            label: label.to_owned(),
        }
    }

    /// Recreates the texture if the surface size changed. Returns true if it did.
    ///
    /// Views and bind groups taken from the old texture must be rebuilt.
    pub fn ensure_size(&mut self, gpu: &GpuContext) -> bool {
        if self.size() == target_size(gpu.width(), gpu.height()) {
            return false;
        }
        log::debug!(
            "Recreating '{}' at {}x{}",
            self.label,
            gpu.width(),
            gpu.height()
        );
        *self = Self::new(gpu, &self.label);
        true
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }
}

/// Textures cannot be empty, so a minimized surface still gets one pixel.
fn target_size(width: u32, height: u32) -> (u32, u32) {
    (width.max(1), height.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_surface_gets_one_pixel() {
        assert_eq!(target_size(0, 0), (1, 1));
        assert_eq!(target_size(1280, 0), (1280, 1));
        assert_eq!(target_size(800, 600), (800, 600));
    }
}
