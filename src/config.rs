//! Orbit descriptor table and tunables.
//!
//! The table is plain configuration: a TOML file passed with `--config`, or
//! the built-in default below when no file is given. Missing sections fall
//! back to their defaults.

use std::collections::HashSet;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One body's orbit and visual parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitDescriptor {
    pub name: String,
    /// Sphere radius in scene units.
    pub size: f32,
    /// Distance from the origin.
    pub orbit: f32,
    /// Radians per time unit.
    pub speed: f32,
    /// Fallback colour as 0xRRGGBB.
    pub color: u32,
    /// Texture file, relative to the texture directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
}

impl OrbitDescriptor {
    fn new(name: &str, color: u32, size: f32, orbit: f32, speed: f32) -> Self {
        Self {
            name: name.to_string(),
            size,
            orbit,
            speed,
            color,
            texture: None,
        }
    }

    /// Texture file to request when this body gets focused.
    pub fn texture_file(&self) -> String {
        self.texture
            .clone()
            .unwrap_or_else(|| format!("{}.jpg", self.name.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SunConfig {
    pub radius: f32,
    pub color: u32,
    /// Radius of the additive halo shell, in multiples of `radius`.
    pub glow_scale: f32,
}

impl Default for SunConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            color: 0xffff00,
            glow_scale: 1.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Overview pose, also the target of a reset transition.
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 2000.0,
            position: [0.0, 150.0, 300.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub damping_factor: f32,
    /// Radians of orbit per dragged pixel.
    pub rotate_speed: f32,
    /// Fractional distance change per scroll line.
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Pointer travel in pixels below which a press/release is a click.
    pub click_slop: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.05,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            min_distance: 2.0,
            max_distance: 900.0,
            click_slop: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Progress added per frame.
    pub step: f32,
    /// Camera distance from a focused body, in multiples of its size.
    pub offset_factor: f32,
    /// Display scale applied to the focused body.
    pub magnification: f32,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            step: 0.02,
            offset_factor: 5.0,
            magnification: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarfieldConfig {
    pub count: usize,
    pub min_radius: f32,
    pub max_radius: f32,
    pub seed: u64,
    /// Star diameter in pixels at a view depth of 300 units.
    pub point_size: f32,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            count: 10_000,
            min_radius: 500.0,
            max_radius: 1000.0,
            seed: 0x5eed,
            point_size: 3.0,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrreryConfig {
    /// Multiplier from wall-clock seconds to orbit time units.
    pub time_scale: f32,
    /// Self-rotation added to every body each frame, in radians.
    pub spin_per_frame: f32,
    pub sun: SunConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub focus: FocusConfig,
    pub starfield: StarfieldConfig,
    #[serde(rename = "body")]
    pub bodies: Vec<OrbitDescriptor>,
}

impl Default for OrreryConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            spin_per_frame: 0.01,
            sun: SunConfig::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            focus: FocusConfig::default(),
            starfield: StarfieldConfig::default(),
            bodies: default_bodies(),
        }
    }
}

/// The eight planets, scaled for viewing rather than accuracy.
pub fn default_bodies() -> Vec<OrbitDescriptor> {
    vec![
        OrbitDescriptor::new("Mercury", 0x8c8c8c, 0.383, 30.0, 0.02),
        OrbitDescriptor::new("Venus", 0xe6e6e6, 0.949, 45.0, 0.015),
        OrbitDescriptor::new("Earth", 0x6b93d6, 0.999, 60.0, 0.01),
        OrbitDescriptor::new("Mars", 0xc1440e, 0.532, 75.0, 0.008),
        OrbitDescriptor::new("Jupiter", 0xd8ca9d, 1.21, 100.0, 0.005),
        OrbitDescriptor::new("Saturn", 0xead6b8, 1.45, 125.0, 0.004),
        OrbitDescriptor::new("Uranus", 0xd1e7e7, 1.0, 150.0, 0.003),
        OrbitDescriptor::new("Neptune", 0x5b5ddf, 1.88, 175.0, 0.002),
    ]
}

impl OrreryConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: OrreryConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(
            "loaded {} orbit descriptors from {}",
            config.bodies.len(),
            path.display()
        );
        Ok(config)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Applies a command-line `time_scale` and re-checks the result.
    pub fn with_time_scale(mut self, time_scale: Option<f32>) -> Result<Self, ConfigError> {
        if let Some(time_scale) = time_scale {
            self.time_scale = time_scale;
            self.validate()?;
        }
        Ok(self)
    }

    /// Reject tables the animator and camera cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.time_scale.is_finite() {
            return Err(invalid("time_scale must be finite"));
        }
        if !self.spin_per_frame.is_finite() {
            return Err(invalid("spin_per_frame must be finite"));
        }
        if self.bodies.is_empty() {
            return Err(invalid("at least one body is required"));
        }

        let mut seen = HashSet::new();
        for body in &self.bodies {
            if !seen.insert(body.name.as_str()) {
                return Err(invalid(format!("duplicate body name {:?}", body.name)));
            }
            if !body.orbit.is_finite() || body.orbit < 0.0 {
                return Err(invalid(format!(
                    "{}: orbit radius must be finite and non-negative",
                    body.name
                )));
            }
            if !body.speed.is_finite() {
                return Err(invalid(format!("{}: speed must be finite", body.name)));
            }
            if !(body.size.is_finite() && body.size > 0.0) {
                return Err(invalid(format!("{}: size must be positive", body.name)));
            }
        }

        if !(self.focus.step > 0.0 && self.focus.step <= 1.0) {
            return Err(invalid("focus.step must be in (0, 1]"));
        }
        if !(self.focus.magnification.is_finite() && self.focus.magnification > 0.0) {
            return Err(invalid("focus.magnification must be positive"));
        }
        if !(self.focus.offset_factor.is_finite() && self.focus.offset_factor > 0.0) {
            return Err(invalid("focus.offset_factor must be positive"));
        }
        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            return Err(invalid("camera clip planes must satisfy 0 < near < far"));
        }
        if !(self.sun.glow_scale.is_finite() && self.sun.glow_scale >= 1.0) {
            return Err(invalid("sun.glow_scale must be at least 1"));
        }
        if !(self.starfield.point_size.is_finite() && self.starfield.point_size > 0.0) {
            return Err(invalid("starfield.point_size must be positive"));
        }
        if self.starfield.min_radius > self.starfield.max_radius {
            return Err(invalid("starfield.min_radius exceeds max_radius"));
        }
        if self.controls.min_distance > self.controls.max_distance {
            return Err(invalid("controls.min_distance exceeds max_distance"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = OrreryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bodies.len(), 8);
        assert_eq!(config.bodies[2].name, "Earth");
    }

    #[test]
    fn default_survives_toml_round_trip() {
        let config = OrreryConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = OrreryConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_file_keeps_section_defaults() {
        let text = r#"
            time_scale = 2.5

            [[body]]
            name = "Earth"
            size = 1.0
            orbit = 60.0
            speed = 0.01
            color = 0x6b93d6
            texture = "earth_daymap.jpg"
        "#;
        let config = OrreryConfig::from_toml_str(text).unwrap();
        assert_eq!(config.time_scale, 2.5);
        assert_eq!(config.bodies.len(), 1);
        assert_eq!(config.bodies[0].color, 0x6b93d6);
        assert_eq!(config.bodies[0].texture_file(), "earth_daymap.jpg");
        assert_eq!(config.camera, CameraConfig::default());
        assert_eq!(config.focus.step, 0.02);
    }

    #[test]
    fn texture_file_defaults_to_lowercase_name() {
        let body = &default_bodies()[6];
        assert_eq!(body.texture_file(), "uranus.jpg");
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut config = OrreryConfig::default();
        config.bodies.push(config.bodies[0].clone());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_empty_table() {
        let mut config = OrreryConfig::default();
        config.bodies.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_bad_focus_step() {
        let mut config = OrreryConfig::default();
        config.focus.step = 0.0;
        assert!(config.validate().is_err());
        config.focus.step = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_size() {
        let mut config = OrreryConfig::default();
        config.bodies[0].size = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_orbit() {
        let mut config = OrreryConfig::default();
        config.bodies[3].orbit = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_finite_tunables() {
        let text = "time_scale = nan\nspin_per_frame = 0.01\n";
        assert!(matches!(
            OrreryConfig::from_toml_str(text),
            Err(ConfigError::Invalid(_))
        ));

        let mut config = OrreryConfig::default();
        config.spin_per_frame = f32::INFINITY;
        assert!(config.validate().is_err());

        let mut config = OrreryConfig::default();
        config.time_scale = f32::NEG_INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_focus_framing() {
        let text = "[focus]\nmagnification = -3.0\n";
        assert!(OrreryConfig::from_toml_str(text).is_err());

        let text = "[focus]\noffset_factor = 0.0\n";
        assert!(OrreryConfig::from_toml_str(text).is_err());

        let mut config = OrreryConfig::default();
        config.focus.magnification = f32::NAN;
        assert!(config.validate().is_err());
        config.focus.magnification = 1.0;
        config.focus.offset_factor = f32::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_glow_and_star_size() {
        let mut config = OrreryConfig::default();
        config.sun.glow_scale = 0.5;
        assert!(config.validate().is_err());

        let mut config = OrreryConfig::default();
        config.starfield.point_size = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn time_scale_override_is_validated() {
        let config = OrreryConfig::default().with_time_scale(Some(4.0)).unwrap();
        assert_eq!(config.time_scale, 4.0);

        let config = OrreryConfig::default().with_time_scale(None).unwrap();
        assert_eq!(config.time_scale, 1.0);

        let result = OrreryConfig::default().with_time_scale(Some(f32::NAN));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn negative_time_scale_runs_backwards_and_is_allowed() {
        let mut config = OrreryConfig::default();
        config.time_scale = -2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reports_parse_errors() {
        let result = OrreryConfig::from_toml_str("time_scale = \"fast\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            OrreryConfig::default().to_toml_string().unwrap()
        )
        .unwrap();
        let config = OrreryConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.bodies.len(), 8);
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = OrreryConfig::load_from_path(Path::new("/nonexistent/orrery.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
