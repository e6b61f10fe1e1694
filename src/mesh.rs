//! Mesh geometry for the lighting and shadow passes.
//!
//! - [`Vertex`]: position, normal, tangent and UV
//! - [`MeshData`]: CPU-side vertex and index lists, produced by the built-in
//!   primitive generators
//! - [`Mesh`]: GPU-resident, immutable, named geometry that can draw itself
//!
//! # Winding
//!
//! For every triangle `(a, b, c)` the cross product `(b - a) × (c - a)` points
//! out of the surface. In the left-handed clip space used by the renderer those
//! triangles appear clockwise when facing the viewer, so pipelines use
//! [`wgpu::FrontFace::Cw`] with back-face culling.
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | tangent   | Float32x3 | 24     | 2               |
//! | uv        | Float32x2 | 36     | 3               |
//!
//! [`Vertex::LAYOUT`] exposes all four attributes; [`Vertex::POSITION_LAYOUT`]
//! reads only the position from the same buffer, for depth-only passes.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::gpu::GpuContext;

/// Front-face convention shared by every pipeline that draws meshes.
pub const FRONT_FACE: wgpu::FrontFace = wgpu::FrontFace::Cw;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Points along increasing `u`, perpendicular to the normal.
    pub tangent: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Full layout, used by the lighting pass.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 36,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    /// Position-only layout over the same buffer, used by the shadow pass.
    pub const POSITION_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    };

    pub fn new(position: Vec3, normal: Vec3, tangent: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.into(),
            normal: normal.into(),
            tangent: tangent.into(),
            uv,
        }
    }
}

/// Geometry on the CPU, before upload.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Unit cube centred at the origin, four vertices per face.
    pub fn cube() -> Self {
        let mut data = Self::default();
        let faces = [
            (Vec3::Z, Vec3::NEG_X),
            (Vec3::NEG_Z, Vec3::X),
            (Vec3::X, Vec3::Z),
            (Vec3::NEG_X, Vec3::NEG_Z),
            (Vec3::Y, Vec3::X),
            (Vec3::NEG_Y, Vec3::X),
        ];
        for (normal, tangent) in faces {
            let bitangent = normal.cross(tangent);
            let center = normal * 0.5;
            let (t, b) = (tangent * 0.5, bitangent * 0.5);
            let base = data.vertices.len() as u32;
            data.vertices.extend([
                Vertex::new(center - t - b, normal, tangent, [0.0, 1.0]),
                Vertex::new(center + t - b, normal, tangent, [1.0, 1.0]),
                Vertex::new(center + t + b, normal, tangent, [1.0, 0.0]),
                Vertex::new(center - t + b, normal, tangent, [0.0, 0.0]),
            ]);
            data.indices
                .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        data
    }

    /// UV sphere of radius 0.5.
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let (segments, rings) = (segments.max(3), rings.max(2));
        Self::parametric(segments, rings, false, |u, v| {
            let theta = u * TAU;
            let phi = v * PI;
            let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            let tangent = Vec3::new(-theta.sin(), 0.0, theta.cos());
            (normal * 0.5, normal, tangent)
        })
    }

    /// Square on the XZ plane facing `+Y`.
    pub fn plane(size: f32) -> Self {
        let h = size * 0.5;
        let (n, t) = (Vec3::Y, Vec3::X);
        Self {
            vertices: vec![
                Vertex::new(Vec3::new(-h, 0.0, -h), n, t, [0.0, 1.0]),
                Vertex::new(Vec3::new(h, 0.0, -h), n, t, [1.0, 1.0]),
                Vertex::new(Vec3::new(h, 0.0, h), n, t, [1.0, 0.0]),
                Vertex::new(Vec3::new(-h, 0.0, h), n, t, [0.0, 0.0]),
            ],
            indices: vec![0, 2, 1, 0, 3, 2],
        }
    }

    /// Unit square on the XY plane facing `-Z`.
    pub fn quad() -> Self {
        let (n, t) = (Vec3::NEG_Z, Vec3::X);
        Self {
            vertices: vec![
                Vertex::new(Vec3::new(-0.5, -0.5, 0.0), n, t, [0.0, 1.0]),
                Vertex::new(Vec3::new(0.5, -0.5, 0.0), n, t, [1.0, 1.0]),
                Vertex::new(Vec3::new(0.5, 0.5, 0.0), n, t, [1.0, 0.0]),
                Vertex::new(Vec3::new(-0.5, 0.5, 0.0), n, t, [0.0, 0.0]),
            ],
            indices: vec![0, 2, 1, 0, 3, 2],
        }
    }

    /// [`quad`](Self::quad) plus a back face facing `+Z`, so the square is
    /// visible from both sides under back-face culling.
    pub fn quad_double_sided() -> Self {
        let mut data = Self::quad();
        let base = data.vertices.len() as u32;
        let back: Vec<Vertex> = data
            .vertices
            .iter()
            .map(|v| {
                Vertex::new(
                    Vec3::from(v.position),
                    Vec3::Z,
                    Vec3::NEG_X,
                    [1.0 - v.uv[0], v.uv[1]],
                )
            })
            .collect();
        let front = data.indices.clone();
        data.vertices.extend(back);
        data.indices.extend(
            front
                .chunks_exact(3)
                .flat_map(|tri| [base + tri[0], base + tri[2], base + tri[1]]),
        );
        data
    }

    /// Capped cylinder of radius 0.5 and height 1, centred at the origin.
    pub fn cylinder(segments: u32) -> Self {
        let segments = segments.max(3);
        let mut data = Self::parametric(segments, 1, false, |u, v| {
            let theta = u * TAU;
            let radial = Vec3::new(theta.cos(), 0.0, theta.sin());
            let position = radial * 0.5 + Vec3::Y * (0.5 - v);
            (position, radial, Vec3::new(-theta.sin(), 0.0, theta.cos()))
        });

        for (y, normal) in [(0.5, Vec3::Y), (-0.5, Vec3::NEG_Y)] {
            let center = data.vertices.len() as u32;
            data.vertices
                .push(Vertex::new(Vec3::Y * y, normal, Vec3::X, [0.5, 0.5]));
            for seg in 0..=segments {
                let theta = seg as f32 / segments as f32 * TAU;
                let (s, c) = theta.sin_cos();
                data.vertices.push(Vertex::new(
                    Vec3::new(c * 0.5, y, s * 0.5),
                    normal,
                    Vec3::X,
                    [0.5 + c * 0.5, 0.5 + s * 0.5],
                ));
            }
            for seg in 0..segments {
                let (a, b) = (center + 1 + seg, center + 2 + seg);
                if normal.y > 0.0 {
                    data.indices.extend([center, b, a]);
                } else {
                    data.indices.extend([center, a, b]);
                }
            }
        }
        data
    }

    /// Torus lying in the XZ plane, fitting inside the unit cube.
    pub fn torus(segments: u32, sides: u32) -> Self {
        const MAJOR: f32 = 0.35;
        const MINOR: f32 = 0.15;
        let (segments, sides) = (segments.max(3), sides.max(3));
        Self::parametric(segments, sides, true, |u, v| {
            let theta = u * TAU;
            let phi = v * TAU;
            let (st, ct) = theta.sin_cos();
            let (sp, cp) = phi.sin_cos();
            let normal = Vec3::new(cp * ct, sp, cp * st);
            let ring = Vec3::new(ct, 0.0, st) * MAJOR;
            (ring + normal * MINOR, normal, Vec3::new(-st, 0.0, ct))
        })
    }

    /// Open tube wound twice around the `Y` axis, fitting inside the unit cube.
    ///
    /// `segments` runs along the tube, `sides` around it.
    pub fn helix(segments: u32, sides: u32) -> Self {
        const TURNS: f32 = 2.0;
        const RADIUS: f32 = 0.35;
        const TUBE: f32 = 0.1;
        const HEIGHT: f32 = 0.8;
        let (segments, sides) = (segments.max(3), sides.max(3));
        Self::parametric(segments, sides, true, |u, v| {
            let theta = u * TURNS * TAU;
            let (st, ct) = theta.sin_cos();
            let center = Vec3::new(ct * RADIUS, (u - 0.5) * HEIGHT, st * RADIUS);
            let along = Vec3::new(-st * RADIUS * TURNS * TAU, HEIGHT, ct * RADIUS * TURNS * TAU)
                .normalize();
            let radial = Vec3::new(ct, 0.0, st);
            let binormal = along.cross(radial);
            let (sp, cp) = (v * TAU).sin_cos();
            let normal = radial * cp + binormal * sp;
            (center + normal * TUBE, normal, along)
        })
    }

    /// Builds a `(columns + 1) × (rows + 1)` vertex grid from a surface
    /// function of `(u, v)` in `[0, 1]²`.
    ///
    /// Without `flip`, `∂P/∂u × ∂P/∂v` must point outward.
    fn parametric(
        columns: u32,
        rows: u32,
        flip: bool,
        surface: impl Fn(f32, f32) -> (Vec3, Vec3, Vec3),
    ) -> Self {
        let mut data = Self::default();
        for row in 0..=rows {
            let v = row as f32 / rows as f32;
            for col in 0..=columns {
                let u = col as f32 / columns as f32;
                let (position, normal, tangent) = surface(u, v);
                data.vertices
                    .push(Vertex::new(position, normal, tangent, [u, v]));
            }
        }

        let stride = columns + 1;
        for row in 0..rows {
            for col in 0..columns {
                let a = row * stride + col;
                let b = a + 1;
                let c = a + stride;
                let d = c + 1;
                if flip {
                    data.indices.extend([a, c, b, b, c, d]);
                } else {
                    data.indices.extend([a, b, c, b, d, c]);
                }
            }
        }
        data
    }
}

/// GPU-resident geometry with vertex and index buffers.
///
/// Immutable after creation; shared by every entity that references it.
#[derive(Debug)]
pub struct Mesh {
    name: String,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_count: u32,
    index_count: u32,
}

impl Mesh {
    /// Uploads vertices and `u32` indices, three per triangle.
    pub fn new(gpu: &GpuContext, name: &str, vertices: &[Vertex], indices: &[u32]) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} Vertex Buffer")),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} Index Buffer")),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        log::debug!(
            "Uploaded mesh '{name}': {} vertices, {} triangles",
            vertices.len(),
            indices.len() / 3
        );

        Self {
            name: name.to_owned(),
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
        }
    }

    pub fn from_data(gpu: &GpuContext, name: &str, data: &MeshData) -> Self {
        Self::new(gpu, name, &data.vertices, &data.indices)
    }

    pub fn cube(gpu: &GpuContext) -> Self {
        Self::from_data(gpu, "Cube", &MeshData::cube())
    }

    pub fn sphere(gpu: &GpuContext, segments: u32, rings: u32) -> Self {
        Self::from_data(gpu, "Sphere", &MeshData::sphere(segments, rings))
    }

    pub fn plane(gpu: &GpuContext, size: f32) -> Self {
        Self::from_data(gpu, "Plane", &MeshData::plane(size))
    }

    pub fn quad(gpu: &GpuContext) -> Self {
        Self::from_data(gpu, "Quad", &MeshData::quad())
    }

    pub fn quad_double_sided(gpu: &GpuContext) -> Self {
        Self::from_data(gpu, "Quad Double Sided", &MeshData::quad_double_sided())
    }

    pub fn helix(gpu: &GpuContext, segments: u32, sides: u32) -> Self {
        Self::from_data(gpu, "Helix", &MeshData::helix(segments, sides))
    }

    pub fn cylinder(gpu: &GpuContext, segments: u32) -> Self {
        Self::from_data(gpu, "Cylinder", &MeshData::cylinder(segments))
    }

    pub fn torus(gpu: &GpuContext, segments: u32, sides: u32) -> Self {
        Self::from_data(gpu, "Torus", &MeshData::torus(segments, sides))
    }

    /// Binds the buffers and issues one indexed draw.
    ///
    /// Works with either vertex layout, since both share the stride.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_primitives() -> Vec<(&'static str, MeshData)> {
        vec![
            ("cube", MeshData::cube()),
            ("sphere", MeshData::sphere(24, 12)),
            ("plane", MeshData::plane(4.0)),
            ("quad", MeshData::quad()),
            ("quad_double_sided", MeshData::quad_double_sided()),
            ("helix", MeshData::helix(64, 12)),
            ("cylinder", MeshData::cylinder(16)),
            ("torus", MeshData::torus(24, 12)),
        ]
    }

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 44);
        assert_eq!(
            Vertex::LAYOUT.array_stride,
            Vertex::POSITION_LAYOUT.array_stride
        );
    }

    #[test]
    fn indices_are_in_range_and_whole_triangles() {
        for (name, data) in all_primitives() {
            assert_eq!(data.indices.len() % 3, 0, "{name}");
            let count = data.vertices.len() as u32;
            assert!(data.indices.iter().all(|&i| i < count), "{name}");
        }
    }

    #[test]
    fn winding_faces_outward() {
        for (name, data) in all_primitives() {
            for tri in data.indices.chunks_exact(3) {
                let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| data.vertices[i as usize]);
                let (pa, pb, pc) = (
                    Vec3::from(a.position),
                    Vec3::from(b.position),
                    Vec3::from(c.position),
                );
                let face = (pb - pa).cross(pc - pa);
                if face.length_squared() < 1e-10 {
                    // Pole triangles of the sphere collapse to a point.
                    continue;
                }
                let normal = Vec3::from(a.normal) + Vec3::from(b.normal) + Vec3::from(c.normal);
                assert!(face.dot(normal) > 0.0, "{name}: inward triangle {tri:?}");
            }
        }
    }

    #[test]
    fn normals_are_unit_and_tangents_perpendicular() {
        for (name, data) in all_primitives() {
            for v in &data.vertices {
                let n = Vec3::from(v.normal);
                let t = Vec3::from(v.tangent);
                assert!((n.length() - 1.0).abs() < 1e-4, "{name}");
                assert!(n.dot(t).abs() < 1e-4, "{name}");
            }
        }
    }

    #[test]
    fn cube_has_flat_faces() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        for v in &cube.vertices {
            let p = Vec3::from(v.position);
            assert!((p.dot(Vec3::from(v.normal)) - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn double_sided_quad_faces_both_ways() {
        let quad = MeshData::quad_double_sided();
        assert_eq!(quad.vertices.len(), 8);
        assert_eq!(quad.indices.len(), 12);

        let facing = |tri: &[u32]| {
            let [a, b, c] =
                [tri[0], tri[1], tri[2]].map(|i| Vec3::from(quad.vertices[i as usize].position));
            (b - a).cross(c - a).normalize()
        };
        let (front, back) = quad.indices.split_at(6);
        for tri in front.chunks_exact(3) {
            assert!(facing(tri).abs_diff_eq(Vec3::NEG_Z, 1e-6));
        }
        for tri in back.chunks_exact(3) {
            assert!(facing(tri).abs_diff_eq(Vec3::Z, 1e-6));
        }
    }

    #[test]
    fn helix_fits_unit_cube_and_climbs() {
        let helix = MeshData::helix(64, 12);
        for v in &helix.vertices {
            let p = Vec3::from(v.position);
            assert!(p.abs().max_element() <= 0.5 + 1e-5, "{p}");
        }
        let first = Vec3::from(helix.vertices[0].tangent);
        assert!(first.y > 0.0);
    }
}
