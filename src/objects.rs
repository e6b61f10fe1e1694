//! Per-object uniforms shared by the shadow and lighting passes.
//!
//! All objects of a frame are packed into one uniform buffer, each at a
//! multiple of the device's dynamic-offset alignment, and written with a single
//! queue write before any pass is recorded. Each draw then binds group 1 with
//! its own offset.

use crate::gpu::GpuContext;
use crate::material::Material;
use crate::mesh::Mesh;
use crate::transform::WorldMatrices;

const INITIAL_CAPACITY: usize = 64;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub world: [[f32; 4]; 4],
    pub world_inverse_transpose: [[f32; 4]; 4],
    pub color_tint: [f32; 4],
    pub roughness: f32,
    pub shading: u32,
    pub _padding: [u32; 2],
}

impl ObjectUniform {
    pub fn new(matrices: WorldMatrices, material: &Material) -> Self {
        Self {
            world: matrices.world.to_cols_array_2d(),
            world_inverse_transpose: matrices.world_inverse_transpose.to_cols_array_2d(),
            color_tint: material.color_tint.extend(1.0).into(),
            roughness: material.roughness,
            shading: material.shading.shader_index(),
            _padding: [0; 2],
        }
    }
}

/// One mesh draw referencing its slot in the [`ObjectBuffer`].
#[derive(Clone, Copy)]
pub struct DrawCall<'a> {
    pub mesh: &'a Mesh,
    pub object_offset: u32,
}

/// Rounds `size` up to the next multiple of `alignment`.
fn aligned_stride(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

pub struct ObjectBuffer {
    buffer: wgpu::Buffer,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
    staging: Vec<u8>,
}

impl ObjectBuffer {
    pub fn new(gpu: &GpuContext) -> Self {
        let layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Object Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<ObjectUniform>() as u64,
                        ),
                    },
                    count: None,
                }],
            });

        let alignment = gpu.device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = aligned_stride(std::mem::size_of::<ObjectUniform>() as u64, alignment);
        let (buffer, bind_group) = Self::allocate(gpu, &layout, stride, INITIAL_CAPACITY);

        Self {
            buffer,
            layout,
            bind_group,
            stride,
            capacity: INITIAL_CAPACITY,
            staging: Vec::new(),
        }
    }

    fn allocate(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ObjectUniform>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Uploads this frame's objects, growing the buffer if needed.
    ///
    /// Object `i` is then bound with [`offset(i)`](Self::offset).
    pub fn write(&mut self, gpu: &GpuContext, objects: &[ObjectUniform]) {
        if objects.is_empty() {
            return;
        }
        if objects.len() > self.capacity {
            let capacity = objects.len().next_power_of_two();
            log::debug!("Growing object buffer to {capacity} slots");
            let (buffer, bind_group) = Self::allocate(gpu, &self.layout, self.stride, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }

        let stride = self.stride as usize;
        self.staging.clear();
        self.staging.resize(stride * objects.len(), 0);
        for (slot, object) in self.staging.chunks_exact_mut(stride).zip(objects) {
            let bytes = bytemuck::bytes_of(object);
            slot[..bytes.len()].copy_from_slice(bytes);
        }
        gpu.queue.write_buffer(&self.buffer, 0, &self.staging);
    }

    /// Dynamic offset of object `index`.
    pub fn offset(&self, index: usize) -> u32 {
        (index as u64 * self.stride) as u32
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Material, Shading};
    use crate::transform::Transform;
    use glam::Vec3;

    #[test]
    fn uniform_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 160);
    }

    #[test]
    fn stride_respects_alignment() {
        assert_eq!(aligned_stride(160, 256), 256);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(300, 256), 512);
        assert_eq!(aligned_stride(160, 32), 160);
    }

    #[test]
    fn packs_material_and_matrices() {
        let mut transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let material = Material::debug("uv", Shading::Uvs);
        let object = ObjectUniform::new(transform.world_matrices(), &material);

        assert_eq!(object.world[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(object.shading, 2);
        assert_eq!(object.color_tint, [1.0, 1.0, 1.0, 1.0]);
    }
}
