//! Surface appearance shared between entities.

use glam::Vec3;

/// Which fragment path the lighting pass takes for a material.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Shading {
    /// Diffuse and specular lighting with shadows.
    #[default]
    Lit,
    /// World-space normals mapped to color.
    Normals,
    /// Texture coordinates mapped to red and green.
    Uvs,
}

impl Shading {
    /// Value of the shader's `shading` switch.
    pub fn shader_index(self) -> u32 {
        match self {
            Shading::Lit => 0,
            Shading::Normals => 1,
            Shading::Uvs => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    /// Linear RGB multiplier applied to lit output.
    pub color_tint: Vec3,
    /// 0 is mirror-like, 1 has no specular highlight.
    pub roughness: f32,
    pub shading: Shading,
}

impl Material {
    pub fn new(name: impl Into<String>, color_tint: impl Into<Vec3>, roughness: f32) -> Self {
        Self {
            name: name.into(),
            color_tint: color_tint.into(),
            roughness: roughness.clamp(0.0, 1.0),
            shading: Shading::Lit,
        }
    }

    /// A debug material that ignores lighting.
    pub fn debug(name: impl Into<String>, shading: Shading) -> Self {
        Self {
            shading,
            ..Self::new(name, Vec3::ONE, 1.0)
        }
    }

    pub fn set_roughness(&mut self, roughness: f32) {
        self.roughness = roughness.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roughness_is_clamped() {
        let mut m = Material::new("shiny", Vec3::ONE, 1.5);
        assert_eq!(m.roughness, 1.0);
        m.set_roughness(-0.2);
        assert_eq!(m.roughness, 0.0);
    }

    #[test]
    fn debug_material_keeps_shading_mode() {
        let m = Material::debug("normals", Shading::Normals);
        assert_eq!(m.shading.shader_index(), 1);
        assert_eq!(m.color_tint, Vec3::ONE);
    }
}
