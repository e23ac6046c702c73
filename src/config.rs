//! Generator configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. Built-in defaults (the three-sphere orbit scene)
//! 2. `<dir>/default.toml`
//! 3. `<dir>/user.toml`
//! 4. Environment variables (`GRAVITY_LAW_SECTION__KEY`)

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::asset_pipeline::ExportOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SphereConfig {
    pub name: String,
    /// Uniform scale of the unit sphere.
    pub size: f32,
    pub position: [f32; 3],
    /// Linear RGBA.
    pub color: [f32; 4],
}

/// Rigs `sphere` to a pivot empty named `pivot` that turns `speed` times per loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitConfig {
    pub sphere: String,
    pub pivot: String,
    pub speed: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityLawConfig {
    pub output: PathBuf,
    /// Last frame of the looped animation; the first is always 1.
    pub end_frame: i32,
    pub fps: u32,
    pub subsurf_level: u32,
    pub spheres: Vec<SphereConfig>,
    pub orbits: Vec<OrbitConfig>,
    pub export: ExportOptions,
}

impl Default for GravityLawConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("src/main/assets/models/gravity_law.glb"),
            end_frame: 250,
            fps: 24,
            subsurf_level: 2,
            spheres: vec![
                SphereConfig {
                    name: "Большая сфера".to_string(),
                    size: 1.0,
                    position: [0.0, 0.0, 0.0],
                    color: [0.604, 0.835, 0.965, 1.0],
                },
                SphereConfig {
                    name: "Средняя сфера".to_string(),
                    size: 0.5,
                    position: [0.0, 3.0, 0.0],
                    color: [0.518, 0.333, 0.180, 1.0],
                },
                SphereConfig {
                    name: "Малая сфера".to_string(),
                    size: 0.25,
                    position: [0.0, 5.0, 0.0],
                    color: [0.215, 0.437, 0.600, 1.0],
                },
            ],
            orbits: vec![
                OrbitConfig {
                    sphere: "Средняя сфера".to_string(),
                    pivot: "Центр вращения средней сферы".to_string(),
                    speed: 1.0,
                },
                OrbitConfig {
                    sphere: "Малая сфера".to_string(),
                    pivot: "Центр вращения малой сферы".to_string(),
                    speed: 2.0,
                },
            ],
            export: ExportOptions::default(),
        }
    }
}

impl GravityLawConfig {
    /// Load configuration from a specific config directory. Missing files are skipped.
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> anyhow::Result<Self> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::from(Serialized::defaults(GravityLawConfig::default()));

        if default_path.exists() {
            log::debug!("Loading {}", default_path.display());
            figment = figment.merge(Toml::file(&default_path));
        }

        if user_path.exists() {
            log::debug!("Loading {}", user_path.display());
            figment = figment.merge(Toml::file(&user_path));
        }

        // GRAVITY_LAW_EXPORT__Y_UP=false -> export.y_up = false
        figment = figment.merge(Env::prefixed("GRAVITY_LAW_").split("__"));

        let config: GravityLawConfig = figment
            .extract()
            .with_context(|| format!("Invalid configuration in {}", config_dir.display()))?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.end_frame <= 1 {
            bail!("end_frame must be after frame 1, got {}", self.end_frame);
        }
        if self.fps == 0 {
            bail!("fps must be positive");
        }

        let mut sphere_names = HashSet::new();
        for sphere in &self.spheres {
            if !sphere_names.insert(sphere.name.as_str()) {
                bail!("Duplicate sphere name '{}'", sphere.name);
            }
        }

        let mut rigged = HashSet::new();
        let mut pivots = HashSet::new();
        for orbit in &self.orbits {
            if !sphere_names.contains(orbit.sphere.as_str()) {
                bail!("Orbit references unknown sphere '{}'", orbit.sphere);
            }
            if !rigged.insert(orbit.sphere.as_str()) {
                bail!("Sphere '{}' is rigged to more than one pivot", orbit.sphere);
            }
            if !pivots.insert(orbit.pivot.as_str()) || sphere_names.contains(orbit.pivot.as_str()) {
                bail!("Pivot name '{}' is not unique", orbit.pivot);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn default_config_describes_three_spheres() {
        let config = GravityLawConfig::default();

        assert_eq!(config.spheres.len(), 3);
        assert_eq!(config.orbits.len(), 2);
        assert_eq!(config.end_frame, 250);
        // The largest sphere stays fixed.
        assert!(config.orbits.iter().all(|orbit| orbit.sphere != config.spheres[0].name));
        config.validate().unwrap();
    }

    #[test]
    fn missing_directory_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GravityLawConfig::load_from(dir.path().join("nothing")).unwrap();

        assert_eq!(config, GravityLawConfig::default());
    }

    #[test]
    fn user_file_overrides_default_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            "end_frame = 120\noutput = \"out/default.glb\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("user.toml"),
            "output = \"out/user.glb\"\n[export]\napply_modifiers = true\n",
        )
        .unwrap();

        let config = GravityLawConfig::load_from(dir.path()).unwrap();

        assert_eq!(config.end_frame, 120);
        assert_eq!(config.output, PathBuf::from("out/user.glb"));
        assert!(config.export.apply_modifiers);
        assert!(config.export.y_up);
        assert_eq!(config.spheres.len(), 3);
    }

    #[test]
    fn invalid_orbits_are_rejected() {
        let mut config = GravityLawConfig::default();
        config.orbits[1].sphere = "Comet".to_string();
        assert!(config.validate().is_err());

        let mut config = GravityLawConfig::default();
        config.orbits[1].sphere = config.orbits[0].sphere.clone();
        assert!(config.validate().is_err());

        let mut config = GravityLawConfig::default();
        config.end_frame = 1;
        assert!(config.validate().is_err());
    }
}
