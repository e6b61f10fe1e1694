//! # Penumbra
//!
//! **A small forward renderer with directional shadow mapping, built on wgpu.**
//!
//! Scenes are plain data: meshes and materials in arenas, entities in a
//! [`hecs`] world, a list of lights and a set of cameras. Each frame renders a
//! depth-only pass from the shadow-casting light, then a lit pass that samples
//! the shadow map with percentage-closer filtering, then an optional
//! post-processing pass.
//!
//! ## Quick Start
//!
//! ```no_run
//! use penumbra::*;
//!
//! fn main() -> Result<(), AppError> {
//!     run(AppConfig::new(), |ctx| {
//!         let camera = Camera::new(CameraConfig::new(Vec3::new(0.0, 3.0, -10.0), ctx.aspect()))?;
//!         let mut scene = Scene::new(camera);
//!         scene
//!             .lights_mut()
//!             .add(Light::directional(Vec3::new(1.0, -1.0, 0.0), Vec3::ONE, 1.0))?;
//!
//!         let sphere = scene.add_mesh(Mesh::sphere(ctx.gpu, 32, 16));
//!         let floor = scene.add_mesh(Mesh::plane(ctx.gpu, 20.0));
//!         let white = scene.add_material(Material::new("White", Vec3::ONE, 0.5));
//!         scene.spawn(Transform::from_position(Vec3::Y), sphere, white);
//!         scene.spawn(Transform::new(), floor, white);
//!
//!         Ok((scene, |_: &mut Frame| {}))
//!     })
//! }
//! ```
//!
//! ## Conventions
//!
//! - Left-handed coordinates: `+X` right, `+Y` up, `+Z` forward.
//! - Depth runs from 0 at the near plane to 1 at the far plane.
//! - Rotations are Euler angles stored as `(pitch, yaw, roll)` in radians.

mod app;
mod cache;
mod camera;
mod camera_controller;
mod error;
mod forward_pass;
mod gpu;
mod input;
mod light;
mod material;
mod mesh;
mod objects;
mod post_process;
mod render_target;
mod renderer;
pub mod scene;
pub mod shadow;
mod transform;

pub use app::{AppConfig, Frame, SetupContext, run};
pub use cache::Cached;
pub use camera::{Camera, CameraConfig, Projection};
pub use camera_controller::FlyController;
pub use error::{AppError, ConfigError, GraphicsResourceError, ShadowError, ShadowStateError};
pub use forward_pass::{CameraState, ForwardPass, FrameUniform, NO_SHADOW_CASTER};
pub use gpu::{DEPTH_FORMAT, GpuContext, create_depth_texture};
pub use input::Input;
pub use light::{Light, LightArrayUniform, LightKind, LightList, LightUniform, MAX_LIGHTS};
pub use material::{Material, Shading};
pub use mesh::{FRONT_FACE, Mesh, MeshData, Vertex};
pub use objects::{DrawCall, ObjectBuffer, ObjectUniform};
pub use post_process::{PostProcessPass, PostProcessSettings};
pub use render_target::PostProcessTarget;
pub use renderer::Renderer;
pub use scene::{Drawable, MaterialId, MeshId, Renderable, Scene, Spin};
pub use shadow::{LightFrustum, LightSpace, ShadowConfig, ShadowPass, ShadowPhase};
pub use transform::{Transform, WorldMatrices};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

pub use hecs::{Entity, World};
