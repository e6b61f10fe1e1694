//! Entities, the resources they reference, lights and cameras.
//!
//! Entities live in a [`hecs::World`] and carry a [`Transform`] plus a
//! [`Renderable`] holding [`MeshId`] and [`MaterialId`] handles. The meshes and
//! materials themselves are owned by the scene's tables, so many entities can
//! share one mesh.
//!
//! # Example
//!
//! ```no_run
//! use penumbra::*;
//!
//! # fn demo(gpu: &GpuContext) -> Result<(), ConfigError> {
//! let camera = Camera::new(CameraConfig::new(Vec3::new(0.0, 2.0, -8.0), gpu.aspect()))?;
//! let mut scene = Scene::new(camera);
//!
//! let cube = scene.add_mesh(Mesh::cube(gpu));
//! let red = scene.add_material(Material::new("Red", Vec3::new(1.0, 0.1, 0.1), 0.4));
//! scene.spawn(Transform::from_position(Vec3::new(0.0, 0.5, 0.0)), cube, red);
//!
//! scene.lights_mut().add(Light::directional(Vec3::new(1.0, -1.0, 0.0), Vec3::ONE, 1.0))?;
//! # Ok(())
//! # }
//! ```

use glam::Vec3;

use crate::camera::Camera;
use crate::error::ConfigError;
use crate::light::LightList;
use crate::material::Material;
use crate::mesh::Mesh;
use crate::transform::{Transform, WorldMatrices};

/// Handle to a mesh in a [`Scene`]'s mesh table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(usize);

/// Handle to a material in a [`Scene`]'s material table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(usize);

/// Component that makes an entity drawable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Renderable {
    pub mesh: MeshId,
    pub material: MaterialId,
}

/// Component: constant angular velocity, `(pitch, yaw, roll)` radians per second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spin(pub Vec3);

/// Everything needed to draw one entity this frame.
pub struct Drawable<'a> {
    pub entity: hecs::Entity,
    pub mesh: &'a Mesh,
    pub material: &'a Material,
    pub matrices: WorldMatrices,
}

pub struct Scene {
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    world: hecs::World,
    lights: LightList,
    cameras: Vec<Camera>,
    active_camera: usize,
    background: Vec3,
}

impl Scene {
    /// Creates an empty scene viewed through `camera`.
    ///
    /// A scene always has at least one camera, so the active camera is never
    /// missing.
    pub fn new(camera: Camera) -> Self {
        Self {
            meshes: Vec::new(),
            materials: Vec::new(),
            world: hecs::World::new(),
            lights: LightList::default(),
            cameras: vec![camera],
            active_camera: 0,
            background: Vec3::new(0.4, 0.6, 0.75),
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &Mesh)> {
        self.meshes.iter().enumerate().map(|(i, m)| (MeshId(i), m))
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId(i), m))
    }

    /// Spawns a drawable entity.
    pub fn spawn(&mut self, transform: Transform, mesh: MeshId, material: MaterialId) -> hecs::Entity {
        self.world.spawn((transform, Renderable { mesh, material }))
    }

    /// Spawns a drawable entity that turns by `spin` (pitch, yaw, roll)
    /// radians per second under [`Scene::spin`].
    pub fn spawn_spinning(
        &mut self,
        transform: Transform,
        mesh: MeshId,
        material: MaterialId,
        spin: Vec3,
    ) -> hecs::Entity {
        self.world
            .spawn((transform, Renderable { mesh, material }, Spin(spin)))
    }

    /// The entity arena, for attaching extra components such as [`Spin`].
    pub fn entities(&self) -> &hecs::World {
        &self.world
    }

    pub fn entities_mut(&mut self) -> &mut hecs::World {
        &mut self.world
    }

    pub fn transform_mut(&mut self, entity: hecs::Entity) -> Option<hecs::RefMut<'_, Transform>> {
        self.world.get::<&mut Transform>(entity).ok()
    }

    pub fn lights(&self) -> &LightList {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut LightList {
        &mut self.lights
    }

    /// Adds a camera and returns its index.
    pub fn add_camera(&mut self, camera: Camera) -> usize {
        self.cameras.push(camera);
        self.cameras.len() - 1
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn active_camera_index(&self) -> usize {
        self.active_camera
    }

    pub fn active_camera(&self) -> &Camera {
        &self.cameras[self.active_camera]
    }

    pub fn active_camera_mut(&mut self) -> &mut Camera {
        &mut self.cameras[self.active_camera]
    }

    pub fn set_active_camera(&mut self, index: usize) -> Result<(), ConfigError> {
        if index >= self.cameras.len() {
            return Err(ConfigError::NoSuchCamera(index));
        }
        if index != self.active_camera {
            log::info!("Switched to camera {index}");
        }
        self.active_camera = index;
        Ok(())
    }

    /// Rebuilds every camera's projection for a new surface aspect ratio.
    pub fn resize(&mut self, aspect_ratio: f32) -> Result<(), ConfigError> {
        for camera in &mut self.cameras {
            camera.update_projection_matrix(aspect_ratio)?;
        }
        Ok(())
    }

    pub fn background(&self) -> Vec3 {
        self.background
    }

    pub fn set_background(&mut self, color: impl Into<Vec3>) {
        self.background = color.into();
    }

    /// Calls `f` for every entity whose mesh and material handles resolve.
    ///
    /// World matrices are refreshed on the way, so each entity's matrices are
    /// computed at most once per mutation. Returns the number of drawables.
    pub fn for_each_drawable<'a>(&'a mut self, mut f: impl FnMut(Drawable<'a>)) -> usize {
        let meshes = &self.meshes;
        let materials = &self.materials;
        let mut count = 0;
        for (entity, (transform, renderable)) in
            self.world.query_mut::<(&mut Transform, &Renderable)>()
        {
            let (Some(mesh), Some(material)) = (
                meshes.get(renderable.mesh.0),
                materials.get(renderable.material.0),
            ) else {
                log::trace!("Skipping {entity:?}: dangling mesh or material handle");
                continue;
            };
            f(Drawable {
                entity,
                mesh,
                material,
                matrices: transform.world_matrices(),
            });
            count += 1;
        }
        count
    }

    /// Advances every entity that has a [`Spin`] component.
    pub fn spin(&mut self, dt: f32) {
        for (_, (transform, spin)) in self.world.query_mut::<(&mut Transform, &Spin)>() {
            transform.rotate(spin.0 * dt);
        }
    }

    pub fn entity_count(&self) -> u32 {
        self.world.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraConfig, Projection};

    fn scene() -> Scene {
        let camera = Camera::new(CameraConfig::new(Vec3::ZERO, 1.0)).unwrap();
        Scene::new(camera)
    }

    #[test]
    fn active_camera_selection_is_validated() {
        let mut scene = scene();
        let ortho = Camera::new(
            CameraConfig::new(Vec3::new(3.0, 1.0, -3.0), 1.0).projection(Projection::Orthographic),
        )
        .unwrap();
        let index = scene.add_camera(ortho);

        scene.set_active_camera(index).unwrap();
        assert!(!scene.active_camera().is_perspective());

        assert_eq!(scene.set_active_camera(5), Err(ConfigError::NoSuchCamera(5)));
        assert_eq!(scene.active_camera_index(), index);
    }

    #[test]
    fn resize_updates_every_camera() {
        let mut scene = scene();
        scene.add_camera(Camera::new(CameraConfig::new(Vec3::ZERO, 1.0)).unwrap());
        scene.resize(16.0 / 9.0).unwrap();
        assert!(scene
            .cameras()
            .iter()
            .all(|c| (c.aspect_ratio() - 16.0 / 9.0).abs() < 1e-6));
        assert!(scene.resize(0.0).is_err());
    }

    #[test]
    fn spin_rotates_only_spinning_entities() {
        let mut scene = scene();
        let material = scene.add_material(Material::new("m", Vec3::ONE, 0.5));
        let spinning =
            scene.spawn_spinning(Transform::new(), MeshId(0), material, Vec3::new(0.0, 1.0, 0.0));
        let still = scene.spawn(Transform::new(), MeshId(0), material);
        let attached = scene.spawn(Transform::new(), MeshId(0), material);
        scene
            .entities_mut()
            .insert_one(attached, Spin(Vec3::new(0.0, 0.0, 2.0)))
            .unwrap();

        scene.spin(0.5);

        let rotation = scene.transform_mut(spinning).unwrap().rotation();
        assert!(rotation.abs_diff_eq(Vec3::new(0.0, 0.5, 0.0), 1e-6));
        assert_eq!(scene.transform_mut(still).unwrap().rotation(), Vec3::ZERO);
        let rotation = scene.transform_mut(attached).unwrap().rotation();
        assert!(rotation.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-6));
    }

    #[test]
    fn dangling_handles_are_not_drawn() {
        let mut scene = scene();
        let material = scene.add_material(Material::new("m", Vec3::ONE, 0.5));
        scene.spawn(Transform::new(), MeshId(3), material);
        assert_eq!(scene.entity_count(), 1);
        assert_eq!(scene.for_each_drawable(|_| panic!("nothing to draw")), 0);
    }
}
