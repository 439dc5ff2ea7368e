// Scene module for Orrery 3D
//
// Domain data lives here as plain records. The renderer only ever sees a
// `TextureHandle` and reads transforms back out each frame.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{OrbitDescriptor, OrreryConfig, StarfieldConfig, SunConfig};
use crate::math::Transform;

/// Index of a body in the scene arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub usize);

/// Renderer-owned texture, referenced by handle only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Material {
    /// Flat 0xRRGGBB colour.
    Color(u32),
    Texture(TextureHandle),
}

/// A planet on a circular orbit around the origin.
#[derive(Debug, Clone)]
pub struct OrbitBody {
    pub name: String,
    pub orbit_radius: f32,
    pub angular_speed: f32,
    pub visual_size: f32,
    pub color: u32,
    pub texture: String,
    pub material: Material,
    /// 1.0, or the focus magnification while focused.
    pub display_scale: f32,
    pub position: Vec3,
    /// Cumulative self-rotation about +Y, in radians.
    pub rotation: f32,
}

impl OrbitBody {
    pub fn from_descriptor(desc: &OrbitDescriptor) -> Self {
        Self {
            name: desc.name.clone(),
            orbit_radius: desc.orbit,
            angular_speed: desc.speed,
            visual_size: desc.size,
            color: desc.color,
            texture: desc.texture_file(),
            material: Material::Color(desc.color),
            display_scale: 1.0,
            position: Vec3::new(desc.orbit, 0.0, 0.0),
            rotation: 0.0,
        }
    }

    /// Radius as currently drawn and picked.
    pub fn display_radius(&self) -> f32 {
        self.visual_size * self.display_scale
    }

    pub fn transform(&self) -> Transform {
        Transform::sphere(self.position, self.rotation, self.display_radius())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sun {
    pub radius: f32,
    pub color: u32,
    pub glow_scale: f32,
}

impl Sun {
    pub fn transform(&self) -> Transform {
        Transform::sphere(Vec3::ZERO, 0.0, self.radius)
    }

    /// Halo shell around the sun.
    pub fn glow_transform(&self) -> Transform {
        Transform::sphere(Vec3::ZERO, 0.0, self.radius * self.glow_scale)
    }
}

impl From<&SunConfig> for Sun {
    fn from(config: &SunConfig) -> Self {
        Self {
            radius: config.radius,
            color: config.color,
            glow_scale: config.glow_scale,
        }
    }
}

/// Light aimed at the focused body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spotlight {
    pub position: Vec3,
    pub target: BodyId,
}

/// Background points on a spherical shell.
#[derive(Debug, Clone, Default)]
pub struct Starfield {
    pub points: Vec<Vec3>,
    /// Pixel diameter at a view depth of 300 units.
    pub point_size: f32,
}

impl Starfield {
    /// Uniform in direction, radius uniform in `[min_radius, max_radius]`.
    pub fn generate(config: &StarfieldConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let points = (0..config.count)
            .map(|_| {
                let theta = rng.gen::<f32>() * std::f32::consts::TAU;
                let phi = (rng.gen::<f32>() * 2.0 - 1.0).acos();
                let radius =
                    config.min_radius + rng.gen::<f32>() * (config.max_radius - config.min_radius);
                Vec3::new(
                    radius * phi.sin() * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                    radius * phi.cos(),
                )
            })
            .collect();
        Self {
            points,
            point_size: config.point_size,
        }
    }
}

/// Represents the entire 3D scene.
#[derive(Debug, Clone)]
pub struct Scene {
    pub sun: Sun,
    pub starfield: Starfield,
    pub spotlight: Option<Spotlight>,
    bodies: Vec<OrbitBody>,
}

impl Scene {
    /// Creates a scene with no planets.
    pub fn new(sun: Sun, starfield: Starfield) -> Self {
        Self {
            sun,
            starfield,
            spotlight: None,
            bodies: Vec::new(),
        }
    }

    /// Builds the sun, planets and starfield described by `config`.
    pub fn from_config(config: &OrreryConfig) -> Self {
        let mut scene = Self::new(
            Sun::from(&config.sun),
            Starfield::generate(&config.starfield),
        );
        for desc in &config.bodies {
            scene.add_body(OrbitBody::from_descriptor(desc));
        }
        scene
    }

    /// Adds a body to the arena.
    pub fn add_body(&mut self, body: OrbitBody) -> BodyId {
        self.bodies.push(body);
        BodyId(self.bodies.len() - 1)
    }

    pub fn bodies(&self) -> &[OrbitBody] {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut [OrbitBody] {
        &mut self.bodies
    }

    pub fn ids(&self) -> impl Iterator<Item = BodyId> {
        (0..self.bodies.len()).map(BodyId)
    }

    pub fn body(&self, id: BodyId) -> Option<&OrbitBody> {
        self.bodies.get(id.0)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut OrbitBody> {
        self.bodies.get_mut(id.0)
    }

    /// Looks a body up by name, case-insensitively.
    pub fn find(&self, name: &str) -> Option<BodyId> {
        self.bodies
            .iter()
            .position(|b| b.name.eq_ignore_ascii_case(name))
            .map(BodyId)
    }

    /// Enlarges `id`, shrinks everything else back and aims the spotlight.
    pub fn highlight(&mut self, id: BodyId, magnification: f32) {
        for (i, body) in self.bodies.iter_mut().enumerate() {
            body.display_scale = if i == id.0 { magnification } else { 1.0 };
        }
        self.spotlight = self.body(id).map(|b| Spotlight {
            position: b.position + Vec3::splat(10.0),
            target: id,
        });
    }

    /// Undoes `highlight` and returns every texture that was in use.
    pub fn clear_highlight(&mut self) -> Vec<TextureHandle> {
        self.spotlight = None;
        let mut released = Vec::new();
        for body in &mut self.bodies {
            body.display_scale = 1.0;
            if let Material::Texture(handle) = body.material {
                released.push(handle);
            }
            body.material = Material::Color(body.color);
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        let mut config = OrreryConfig::default();
        config.starfield.count = 64;
        Scene::from_config(&config)
    }

    #[test]
    fn builds_one_body_per_descriptor() {
        let scene = scene();
        assert_eq!(scene.bodies().len(), 8);
        assert_eq!(scene.body(BodyId(0)).unwrap().name, "Mercury");
        assert_eq!(scene.starfield.points.len(), 64);
    }

    #[test]
    fn find_is_case_insensitive() {
        let scene = scene();
        assert_eq!(scene.find("jupiter"), Some(BodyId(4)));
        assert_eq!(scene.find("Pluto"), None);
    }

    #[test]
    fn bodies_start_with_fallback_colour() {
        let scene = scene();
        for body in scene.bodies() {
            assert_eq!(body.material, Material::Color(body.color));
            assert_eq!(body.display_scale, 1.0);
        }
    }

    #[test]
    fn starfield_stays_in_shell_and_is_reproducible() {
        let config = StarfieldConfig {
            count: 500,
            ..StarfieldConfig::default()
        };
        let a = Starfield::generate(&config);
        let b = Starfield::generate(&config);
        assert_eq!(a.points, b.points);
        for p in &a.points {
            let r = p.length();
            assert!(r >= config.min_radius - 1e-2 && r <= config.max_radius + 1e-2);
        }
    }

    #[test]
    fn sun_glow_wraps_the_sun() {
        let scene = scene();
        assert_eq!(scene.sun.glow_transform().scale, Vec3::splat(5.0 * 1.3));
        assert_eq!(scene.sun.transform().scale, Vec3::splat(5.0));
    }

    #[test]
    fn highlight_magnifies_only_target() {
        let mut scene = scene();
        scene.highlight(BodyId(2), 2.0);
        scene.highlight(BodyId(5), 2.0);
        assert_eq!(scene.body(BodyId(2)).unwrap().display_scale, 1.0);
        assert_eq!(scene.body(BodyId(5)).unwrap().display_scale, 2.0);
        let spot = scene.spotlight.unwrap();
        assert_eq!(spot.target, BodyId(5));
        let body = scene.body(BodyId(5)).unwrap();
        assert_eq!(spot.position, body.position + Vec3::splat(10.0));
    }

    #[test]
    fn clear_highlight_restores_colours_and_returns_textures() {
        let mut scene = scene();
        scene.highlight(BodyId(1), 2.0);
        scene.body_mut(BodyId(1)).unwrap().material = Material::Texture(TextureHandle(7));
        let released = scene.clear_highlight();
        assert_eq!(released, vec![TextureHandle(7)]);
        let venus = scene.body(BodyId(1)).unwrap();
        assert_eq!(venus.material, Material::Color(venus.color));
        assert_eq!(venus.display_scale, 1.0);
        assert!(scene.spotlight.is_none());
    }
}
