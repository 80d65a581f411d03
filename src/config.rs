use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::settings::{Quality, Settings};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GlasscamConfig {
    pub camera: CameraConfig,
    pub storage: StorageConfig,
    pub location: LocationConfig,
    pub defaults: DefaultsConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Preview resolution (width, height)
    #[serde(default = "default_preview_resolution")]
    pub preview_resolution: (u32, u32),

    /// Preview frames per second
    #[serde(default = "default_preview_fps")]
    pub preview_fps: u32,

    /// Zoom levels added or removed by a single zoom in/out gesture
    #[serde(default = "default_zoom_step")]
    pub zoom_step: u32,

    /// How long to wait for the camera to deliver a photo
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,

    /// Photo resolution used with high quality
    #[serde(default = "default_high_photo_resolution")]
    pub high_photo_resolution: (u32, u32),

    /// Photo resolution used with low quality
    #[serde(default = "default_low_photo_resolution")]
    pub low_photo_resolution: (u32, u32),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Folder holding media until it is saved or discarded
    #[serde(default = "default_tmp_folder")]
    pub tmp_folder: String,

    /// Folder receiving saved media
    #[serde(default = "default_storage_folder")]
    pub storage_folder: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LocationConfig {
    /// Upper bound for a best-effort location query
    #[serde(default = "default_location_timeout_ms")]
    pub timeout_ms: u64,
}

/// Initial values of the runtime settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DefaultsConfig {
    #[serde(default = "default_quality")]
    pub quality: Quality,
    #[serde(default)]
    pub geotag_enabled: bool,
    #[serde(default)]
    pub smooth_zoom_enabled: bool,
    #[serde(default)]
    pub max_zoom_mode: bool,
    #[serde(default)]
    pub auto_save: bool,
    #[serde(default = "default_overlay_visible")]
    pub overlay_visible: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl CameraConfig {
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

impl LocationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl DefaultsConfig {
    pub fn to_settings(&self) -> Settings {
        Settings {
            quality: self.quality,
            geotag_enabled: self.geotag_enabled,
            smooth_zoom_enabled: self.smooth_zoom_enabled,
            max_zoom_mode: self.max_zoom_mode,
            auto_save: self.auto_save,
            overlay_visible: self.overlay_visible,
        }
    }
}

impl GlasscamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("glasscam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "camera.preview_resolution",
                vec![default_preview_resolution().0, default_preview_resolution().1],
            )?
            .set_default("camera.preview_fps", default_preview_fps())?
            .set_default("camera.zoom_step", default_zoom_step())?
            .set_default("camera.capture_timeout_ms", default_capture_timeout_ms())?
            .set_default(
                "camera.high_photo_resolution",
                vec![
                    default_high_photo_resolution().0,
                    default_high_photo_resolution().1,
                ],
            )?
            .set_default(
                "camera.low_photo_resolution",
                vec![
                    default_low_photo_resolution().0,
                    default_low_photo_resolution().1,
                ],
            )?
            .set_default("storage.tmp_folder", default_tmp_folder())?
            .set_default("storage.storage_folder", default_storage_folder())?
            .set_default("location.timeout_ms", default_location_timeout_ms())?
            .set_default("defaults.quality", "High")?
            .set_default("defaults.geotag_enabled", false)?
            .set_default("defaults.smooth_zoom_enabled", false)?
            .set_default("defaults.max_zoom_mode", false)?
            .set_default("defaults.auto_save", false)?
            .set_default("defaults.overlay_visible", default_overlay_visible())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            .add_source(
                Environment::with_prefix("GLASSCAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: GlasscamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.preview_resolution.0 == 0 || self.camera.preview_resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Preview resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.preview_fps == 0 {
            return Err(ConfigError::Message(
                "Preview fps must be greater than 0".to_string(),
            ));
        }

        if self.camera.zoom_step == 0 {
            return Err(ConfigError::Message(
                "Zoom step must be greater than 0".to_string(),
            ));
        }

        if self.camera.capture_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Capture timeout must be greater than 0".to_string(),
            ));
        }

        for (name, (w, h)) in [
            ("High", self.camera.high_photo_resolution),
            ("Low", self.camera.low_photo_resolution),
        ] {
            if w == 0 || h == 0 {
                return Err(ConfigError::Message(format!(
                    "{} photo resolution must be greater than 0",
                    name
                )));
            }
        }

        if self.storage.tmp_folder.is_empty() || self.storage.storage_folder.is_empty() {
            return Err(ConfigError::Message(
                "Storage folders must not be empty".to_string(),
            ));
        }

        if self.location.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Location timeout must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for GlasscamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                preview_resolution: default_preview_resolution(),
                preview_fps: default_preview_fps(),
                zoom_step: default_zoom_step(),
                capture_timeout_ms: default_capture_timeout_ms(),
                high_photo_resolution: default_high_photo_resolution(),
                low_photo_resolution: default_low_photo_resolution(),
            },
            storage: StorageConfig {
                tmp_folder: default_tmp_folder(),
                storage_folder: default_storage_folder(),
            },
            location: LocationConfig {
                timeout_ms: default_location_timeout_ms(),
            },
            defaults: DefaultsConfig {
                quality: default_quality(),
                geotag_enabled: false,
                smooth_zoom_enabled: false,
                max_zoom_mode: false,
                auto_save: false,
                overlay_visible: default_overlay_visible(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_preview_resolution() -> (u32, u32) {
    (640, 360)
}
fn default_preview_fps() -> u32 {
    30
}
fn default_zoom_step() -> u32 {
    10
}
fn default_capture_timeout_ms() -> u64 {
    5000
}
fn default_high_photo_resolution() -> (u32, u32) {
    (2592, 1944)
}
fn default_low_photo_resolution() -> (u32, u32) {
    (1280, 960)
}

fn default_tmp_folder() -> String {
    "./tmp".to_string()
}
fn default_storage_folder() -> String {
    "./media".to_string()
}

fn default_location_timeout_ms() -> u64 {
    2000
}

fn default_quality() -> Quality {
    Quality::High
}
fn default_overlay_visible() -> bool {
    true
}

fn default_event_bus_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = GlasscamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.camera.preview_resolution, (640, 360));
        assert_eq!(config.camera.zoom_step, 10);
        assert_eq!(config.camera.capture_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_validation() {
        let mut config = GlasscamConfig::default();
        config.camera.capture_timeout_ms = 0;
        assert!(config.validate().is_err());

        config.camera.capture_timeout_ms = 100;
        config.camera.low_photo_resolution = (0, 960);
        assert!(config.validate().is_err());

        config.camera.low_photo_resolution = (1280, 960);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let config = GlasscamConfig::load_from_file(&path).unwrap();
        assert_eq!(config.camera.preview_fps, 30);
        assert_eq!(config.defaults.quality, Quality::High);
        assert!(config.defaults.overlay_visible);
    }

    #[test]
    fn test_load_from_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glasscam.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[camera]\nzoom_step = 5\ncapture_timeout_ms = 250\n\n[defaults]\nquality = \"Low\"\nsmooth_zoom_enabled = true"
        )
        .unwrap();

        let config = GlasscamConfig::load_from_file(&path).unwrap();
        assert_eq!(config.camera.zoom_step, 5);
        assert_eq!(config.camera.capture_timeout_ms, 250);
        assert_eq!(config.defaults.quality, Quality::Low);
        assert!(config.defaults.smooth_zoom_enabled);
        assert!(!config.defaults.auto_save);
    }

    #[test]
    fn test_defaults_to_settings() {
        let mut config = GlasscamConfig::default();
        config.defaults.max_zoom_mode = true;

        let settings = config.defaults.to_settings();
        assert!(settings.max_zoom_mode);
        assert_eq!(settings.quality, Quality::High);
        assert!(settings.overlay_visible);
    }
}
