//! Scene lights and their GPU representation.
//!
//! A [`LightList`] holds at most [`MAX_LIGHTS`] lights, the ambient color and
//! the index of the one directional light that casts the shadow map. The
//! caster is selected explicitly and validated; it defaults to the first
//! directional light added.

use glam::Vec3;

use crate::error::ConfigError;

/// Size of the light array in the lighting shader.
pub const MAX_LIGHTS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

impl LightKind {
    fn shader_index(self) -> f32 {
        match self {
            LightKind::Directional => 0.0,
            LightKind::Point => 1.0,
            LightKind::Spot => 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    /// Direction the light travels. Ignored by point lights.
    pub direction: Vec3,
    /// Ignored by directional lights.
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Distance at which point and spot lights fade to zero.
    pub range: f32,
    /// Cone half-angles in radians; full intensity inside `spot_inner`.
    pub spot_inner: f32,
    pub spot_outer: f32,
}

impl Light {
    pub fn directional(direction: impl Into<Vec3>, color: impl Into<Vec3>, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            direction: direction.into(),
            position: Vec3::ZERO,
            color: color.into(),
            intensity,
            range: 0.0,
            spot_inner: 0.0,
            spot_outer: 0.0,
        }
    }

    pub fn point(
        position: impl Into<Vec3>,
        color: impl Into<Vec3>,
        intensity: f32,
        range: f32,
    ) -> Self {
        Self {
            kind: LightKind::Point,
            position: position.into(),
            range,
            ..Self::directional(Vec3::NEG_Y, color, intensity)
        }
    }

    pub fn spot(
        position: impl Into<Vec3>,
        direction: impl Into<Vec3>,
        color: impl Into<Vec3>,
        intensity: f32,
        range: f32,
        inner: f32,
        outer: f32,
    ) -> Self {
        Self {
            kind: LightKind::Spot,
            position: position.into(),
            range,
            spot_inner: inner.min(outer),
            spot_outer: outer.max(inner),
            ..Self::directional(direction, color, intensity)
        }
    }

    pub fn is_directional(&self) -> bool {
        self.kind == LightKind::Directional
    }

    pub fn to_uniform(&self) -> LightUniform {
        let direction = self.direction.normalize_or_zero();
        LightUniform {
            position: self.position.extend(self.kind.shader_index()).into(),
            direction: direction.extend(self.range).into(),
            color: self.color.extend(self.intensity).into(),
            spot: [self.spot_inner.cos(), self.spot_outer.cos(), 0.0, 0.0],
        }
    }
}

/// One entry of the shader's light array.
///
/// - `position.w`: kind (0 directional, 1 point, 2 spot)
/// - `direction.w`: range
/// - `color.w`: intensity
/// - `spot.xy`: cosines of the inner and outer cone angles
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub color: [f32; 4],
    pub spot: [f32; 4],
}

/// The fixed-size light array bound to the lighting pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightArrayUniform {
    pub lights: [LightUniform; MAX_LIGHTS],
}

#[derive(Clone, Debug)]
pub struct LightList {
    lights: Vec<Light>,
    ambient: Vec3,
    shadow_caster: Option<usize>,
}

impl Default for LightList {
    fn default() -> Self {
        Self::new(Vec3::splat(0.2))
    }
}

impl LightList {
    pub fn new(ambient: impl Into<Vec3>) -> Self {
        Self {
            lights: Vec::new(),
            ambient: ambient.into(),
            shadow_caster: None,
        }
    }

    /// Adds a light and returns its index.
    ///
    /// The first directional light becomes the shadow caster unless one was
    /// already chosen.
    pub fn add(&mut self, light: Light) -> Result<usize, ConfigError> {
        if self.lights.len() >= MAX_LIGHTS {
            return Err(ConfigError::TooManyLights(MAX_LIGHTS));
        }
        if light.is_directional() && light.direction.length_squared() == 0.0 {
            return Err(ConfigError::ZeroLightDirection);
        }
        let index = self.lights.len();
        self.lights.push(light);
        if self.shadow_caster.is_none() && light.is_directional() {
            self.shadow_caster = Some(index);
        }
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    /// Mutable access for editing color, intensity and placement.
    ///
    /// Changing the kind of the shadow caster is caught by
    /// [`shadow_caster_light`](Self::shadow_caster_light), which only returns
    /// directional lights.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.lights.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    pub fn set_ambient(&mut self, ambient: impl Into<Vec3>) {
        self.ambient = ambient.into();
    }

    /// Chooses which light casts the shadow map.
    pub fn set_shadow_caster(&mut self, index: usize) -> Result<(), ConfigError> {
        let light = self.lights.get(index).ok_or(ConfigError::NoSuchLight(index))?;
        if !light.is_directional() {
            return Err(ConfigError::NotDirectional(index));
        }
        self.shadow_caster = Some(index);
        Ok(())
    }

    pub fn shadow_caster(&self) -> Option<usize> {
        self.shadow_caster
    }

    /// The shadow caster, if it is (still) a directional light.
    pub fn shadow_caster_light(&self) -> Option<&Light> {
        self.shadow_caster
            .and_then(|i| self.lights.get(i))
            .filter(|light| light.is_directional())
    }

    /// Packs every light into the shader's fixed-size array.
    pub fn to_uniform(&self) -> LightArrayUniform {
        let mut array = LightArrayUniform {
            lights: [LightUniform::default(); MAX_LIGHTS],
        };
        for (slot, light) in array.lights.iter_mut().zip(&self.lights) {
            *slot = light.to_uniform();
        }
        array
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sun() -> Light {
        Light::directional(Vec3::new(1.0, -1.0, 0.0), Vec3::new(0.2, 0.2, 1.0), 1.0)
    }

    fn lamp() -> Light {
        Light::point(Vec3::new(0.0, 3.0, 0.0), Vec3::ONE, 1.0, 10.0)
    }

    #[test]
    fn first_directional_light_casts_shadow() {
        let mut lights = LightList::default();
        lights.add(lamp()).unwrap();
        assert_eq!(lights.shadow_caster(), None);
        lights.add(sun()).unwrap();
        lights.add(sun()).unwrap();
        assert_eq!(lights.shadow_caster(), Some(1));
    }

    #[test]
    fn shadow_caster_selection_is_validated() {
        let mut lights = LightList::default();
        lights.add(lamp()).unwrap();
        lights.add(sun()).unwrap();
        lights.add(sun()).unwrap();

        assert_eq!(lights.set_shadow_caster(0), Err(ConfigError::NotDirectional(0)));
        assert_eq!(lights.set_shadow_caster(9), Err(ConfigError::NoSuchLight(9)));
        assert_eq!(lights.shadow_caster(), Some(1));

        lights.set_shadow_caster(2).unwrap();
        assert_eq!(lights.shadow_caster(), Some(2));
    }

    #[test]
    fn caster_changed_to_point_light_is_ignored() {
        let mut lights = LightList::default();
        lights.add(sun()).unwrap();
        lights.get_mut(0).unwrap().kind = LightKind::Point;
        assert!(lights.shadow_caster_light().is_none());
    }

    #[test]
    fn list_is_capped() {
        let mut lights = LightList::default();
        for _ in 0..MAX_LIGHTS {
            lights.add(lamp()).unwrap();
        }
        assert_eq!(lights.add(lamp()), Err(ConfigError::TooManyLights(MAX_LIGHTS)));
    }

    #[test]
    fn zero_direction_is_rejected() {
        let mut lights = LightList::default();
        let bad = Light::directional(Vec3::ZERO, Vec3::ONE, 1.0);
        assert_eq!(lights.add(bad), Err(ConfigError::ZeroLightDirection));
    }

    #[test]
    fn uniform_packing() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 64);
        assert_eq!(std::mem::size_of::<LightArrayUniform>(), 64 * MAX_LIGHTS);

        let mut lights = LightList::default();
        lights.add(sun()).unwrap();
        let packed = lights.to_uniform();
        let d = packed.lights[0].direction;
        assert!((d[0] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert_eq!(packed.lights[0].position[3], 0.0);
        assert_eq!(packed.lights[0].color, [0.2, 0.2, 1.0, 1.0]);
        assert_eq!(packed.lights[1], LightUniform::default());
    }
}
