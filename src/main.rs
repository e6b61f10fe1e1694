use std::f32::consts::PI;

use penumbra::{
    AppConfig, AppError, Camera, CameraConfig, ConfigError, Frame, Light, Material, Mesh,
    Projection, Scene, SetupContext, Shading, ShadowConfig, Transform, Vec3, run,
};

const SPACING: f32 = 3.0;
const COLUMNS: usize = 7;
const ROWS: usize = 3;
const FLOOR_SIZE: f32 = 30.0;
const FLOOR_HEIGHT: f32 = -1.5;
const SHADOW_CASTER: Vec3 = Vec3::new(1.0, -1.0, 0.0);

fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("penumbra=info,wgpu_core=warn,wgpu_hal=warn"),
    )
    .init();

    log::info!("Keys: 1-3 camera, P projection, L shadows, F post-processing, Esc quit");
    run(
        AppConfig::new().title("Penumbra").shadows(demo_shadows()),
        build_scene,
    )
}

/// Light frustum wide enough to cover the whole floor and every row of
/// objects under the diagonal caster.
fn demo_shadows() -> ShadowConfig {
    ShadowConfig::new().projection_size(34.0).light_distance(30.0)
}

fn grid_position(column: usize, row: usize) -> Vec3 {
    let half = (COLUMNS - 1) as f32 * SPACING * 0.5;
    Vec3::new(column as f32 * SPACING - half, row as f32 * SPACING, 0.0)
}

fn build_scene(ctx: &SetupContext) -> Result<(Scene, fn(&mut Frame)), ConfigError> {
    let aspect = ctx.aspect();

    let main_camera = Camera::new(
        CameraConfig::new(Vec3::new(-0.5, 6.25, -15.5), aspect).rotation(Vec3::new(0.366, 0.0, 0.0)),
    )?;
    let mut scene = Scene::new(main_camera);

    let mut overview = Camera::new(
        CameraConfig::new(Vec3::new(3.0, 1.0, -3.0), aspect)
            .field_of_view(PI / 4.0)
            .projection(Projection::Orthographic)
            .orthographic_width(17.5)
            .move_speed(0.5),
    )?;
    overview.transform_mut().rotate(Vec3::new(0.25, -1.0, 0.0));
    scene.add_camera(overview);
    scene.add_camera(Camera::new(
        CameraConfig::new(Vec3::new(0.0, 0.0, -3.0), aspect).field_of_view(PI - 0.1),
    )?);

    scene.set_background(Vec3::new(0.4, 0.6, 0.75));
    let lights = scene.lights_mut();
    lights.set_ambient(Vec3::splat(0.2));
    lights.add(Light::directional(
        SHADOW_CASTER,
        Vec3::new(0.2, 0.2, 1.0),
        1.0,
    ))?;
    lights.add(Light::directional(
        Vec3::new(-0.5, -0.25, 1.0),
        Vec3::new(1.0, 0.85, 0.7),
        0.6,
    ))?;
    lights.add(Light::point(
        Vec3::new(0.0, 3.0, -2.0),
        Vec3::new(1.0, 0.3, 0.3),
        1.5,
        10.0,
    ))?;

    let gpu = ctx.gpu;
    let meshes: [_; COLUMNS] = [
        scene.add_mesh(Mesh::cube(gpu)),
        scene.add_mesh(Mesh::cylinder(gpu, 32)),
        scene.add_mesh(Mesh::helix(gpu, 96, 12)),
        scene.add_mesh(Mesh::sphere(gpu, 32, 16)),
        scene.add_mesh(Mesh::torus(gpu, 32, 16)),
        scene.add_mesh(Mesh::quad(gpu)),
        scene.add_mesh(Mesh::quad_double_sided(gpu)),
    ];
    let floor = scene.add_mesh(Mesh::plane(gpu, FLOOR_SIZE));

    let rows: [_; ROWS] = [
        scene.add_material(Material::new("Teal Tint", Vec3::new(0.0, 0.7, 0.7), 0.5)),
        scene.add_material(Material::debug("Normals", Shading::Normals)),
        scene.add_material(Material::debug("UVs", Shading::Uvs)),
    ];
    let floor_material = scene.add_material(Material::new("Floor", Vec3::splat(0.8), 0.9));

    for (row, &material) in rows.iter().enumerate() {
        for (column, &mesh) in meshes.iter().enumerate() {
            scene.spawn_spinning(
                Transform::from_position(grid_position(column, row)),
                mesh,
                material,
                Vec3::new(0.0, 0.5 + 0.1 * column as f32, 0.0),
            );
        }
    }
    scene.spawn(
        Transform::from_position(Vec3::new(0.0, FLOOR_HEIGHT, 0.0)),
        floor,
        floor_material,
    );

    Ok((scene, animate as fn(&mut Frame)))
}

fn animate(frame: &mut Frame) {
    frame.scene.spin(frame.dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use penumbra::LightSpace;

    #[test]
    fn shadow_frustum_covers_demo_scene() {
        let space = LightSpace::new(SHADOW_CASTER, demo_shadows().frustum()).unwrap();
        let h = FLOOR_SIZE * 0.5;
        for (x, z) in [(-h, -h), (-h, h), (h, -h), (h, h), (0.0, 0.0)] {
            let corner = Vec3::new(x, FLOOR_HEIGHT, z);
            assert!(space.contains(corner), "floor corner {corner} not shadowed");
        }
        for row in 0..ROWS {
            for column in 0..COLUMNS {
                let center = grid_position(column, row);
                for offset in [Vec3::splat(-0.5), Vec3::splat(0.5)] {
                    let p = center + offset;
                    assert!(space.contains(p), "object bound {p} not shadowed");
                }
            }
        }
    }

    #[test]
    fn default_frustum_misses_floor_corner() {
        let space = LightSpace::new(SHADOW_CASTER, ShadowConfig::new().frustum()).unwrap();
        let h = FLOOR_SIZE * 0.5;
        assert!(!space.contains(Vec3::new(h, FLOOR_HEIGHT, h)));
    }
}
