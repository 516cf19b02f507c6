//! Persistent renderer settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scheduler::frame_config::{MAX_BOUNCE_LIMIT, MAX_WORKGROUPS_PER_DIM};
use crate::util::{Error, Result};

/// Largest accepted filter iteration count.
pub const MAX_FILTER_ITERATIONS: u32 = 8;

/// GPU adapter preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerMode {
    #[default]
    LowPower,
    HighPerformance,
}

/// Renderer settings that persist between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Output
    pub width: u32,
    pub aspect: f32,
    pub fullscreen: bool,

    // Sampling
    pub samples_per_frame: u32,
    pub max_bounces: u32,

    // Denoiser
    pub filter: bool,
    pub reprojection: bool,
    pub converge: bool,
    pub filter_iterations: u32,

    // Engine
    pub loop_scenes: bool,
    /// Scene loop length in seconds for the built-in engine; `None` never
    /// finishes a loop.
    pub loop_seconds: Option<f64>,
    pub edit_mode: bool,
    pub cam_look_velocity: f32,
    pub cam_move_velocity: f32,

    // Paths
    pub shader_dir: PathBuf,
    pub export_path: PathBuf,

    // Adapter
    pub power_preference: PowerMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 1280,
            aspect: 16.0 / 9.0,
            fullscreen: false,
            samples_per_frame: 1,
            max_bounces: 5,
            filter: true,
            reprojection: true,
            converge: false,
            filter_iterations: 4,
            loop_scenes: false,
            loop_seconds: None,
            edit_mode: false,
            cam_look_velocity: 0.005,
            cam_move_velocity: 0.1,
            shader_dir: PathBuf::from("shaders"),
            export_path: PathBuf::from("scenes-export.bin"),
            power_preference: PowerMode::LowPower,
        }
    }
}

impl Settings {
    /// Default settings file location: `<config dir>/wavefront/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("wavefront");
            p.push("settings.json");
            p
        })
    }

    /// Render height derived from width and aspect, rounded up.
    pub fn height(&self) -> u32 {
        if self.aspect <= 0.0 || !self.aspect.is_finite() {
            return 0;
        }
        (self.width as f64 / self.aspect as f64).ceil() as u32
    }

    /// Check ranges the scheduler and the config packing rely on.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_BOUNCE_LIMIT).contains(&self.max_bounces) {
            return Err(Error::settings(format!(
                "max_bounces must be in 1..={MAX_BOUNCE_LIMIT}, got {}",
                self.max_bounces
            )));
        }
        let height = self.height();
        for (name, v) in [("width", self.width), ("height", height)] {
            if !(1..=MAX_WORKGROUPS_PER_DIM).contains(&v) {
                return Err(Error::settings(format!(
                    "{name} must be in 1..={MAX_WORKGROUPS_PER_DIM}, got {v}"
                )));
            }
        }
        if self.samples_per_frame == 0 {
            return Err(Error::settings("samples_per_frame must be at least 1"));
        }
        if !(1..=MAX_FILTER_ITERATIONS).contains(&self.filter_iterations) {
            return Err(Error::settings(format!(
                "filter_iterations must be in 1..={MAX_FILTER_ITERATIONS}, got {}",
                self.filter_iterations
            )));
        }
        if let Some(s) = self.loop_seconds {
            if !(s.is_finite() && s > 0.0) {
                return Err(Error::settings(format!("loop_seconds must be positive, got {s}")));
            }
        }
        if self.filter && !self.reprojection {
            return Err(Error::settings("filter requires reprojection"));
        }
        Ok(())
    }

    /// Load settings from an explicit file. Missing fields take defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default location, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("ignoring settings at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save settings to an explicit file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        match Self::default_path() {
            Some(path) => self.save_to(&path),
            None => Err(Error::other("no config directory on this platform")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let s = Settings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.height(), 720);
    }

    #[test]
    fn test_height_rounds_up() {
        let s = Settings { width: 1000, aspect: 3.0, ..Default::default() };
        assert_eq!(s.height(), 334);
    }

    #[test]
    fn test_validate_ranges() {
        let bad = Settings { max_bounces: 0, ..Default::default() };
        assert!(matches!(bad.validate(), Err(Error::InvalidSettings(_))));

        let bad = Settings { max_bounces: 16, ..Default::default() };
        assert!(bad.validate().is_err());

        let ok = Settings { max_bounces: 15, ..Default::default() };
        assert!(ok.validate().is_ok());

        let bad = Settings { samples_per_frame: 0, ..Default::default() };
        assert!(bad.validate().is_err());

        let bad = Settings { filter_iterations: 9, ..Default::default() };
        assert!(bad.validate().is_err());

        let bad = Settings { width: 70_000, ..Default::default() };
        assert!(bad.validate().is_err());

        let bad = Settings { filter: true, reprojection: false, ..Default::default() };
        assert!(bad.validate().is_err());

        let bad = Settings { loop_seconds: Some(0.0), ..Default::default() };
        assert!(bad.validate().is_err());
        let ok = Settings { loop_seconds: Some(12.5), ..Default::default() };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: Settings = serde_json::from_str(r#"{"max_bounces": 3, "power_preference": "high-performance"}"#)
            .unwrap();
        assert_eq!(s.max_bounces, 3);
        assert_eq!(s.width, 1280);
        assert_eq!(s.power_preference, PowerMode::HighPerformance);
    }
}
