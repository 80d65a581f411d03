use super::controller::CaptureSession;
use crate::config::GlasscamConfig;
use crate::device::CameraModule;
use crate::error::{GlasscamError, Result};
use crate::events::EventBus;
use crate::location::{LocationProvider, NoLocation};
use crate::media::MediaStore;
use crate::settings::SettingsStore;
use std::sync::Arc;

/// Builder for a capture session
pub struct CaptureSessionBuilder {
    config: Option<GlasscamConfig>,
    camera: Option<Arc<dyn CameraModule>>,
    location: Option<Arc<dyn LocationProvider>>,
    settings: Option<SettingsStore>,
    event_bus: Option<EventBus>,
}

impl CaptureSessionBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            camera: None,
            location: None,
            settings: None,
            event_bus: None,
        }
    }

    pub fn config(mut self, config: GlasscamConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn camera(mut self, camera: Arc<dyn CameraModule>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn location(mut self, location: Arc<dyn LocationProvider>) -> Self {
        self.location = Some(location);
        self
    }

    /// Share settings with another component; defaults come from the config otherwise
    pub fn settings(mut self, settings: SettingsStore) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn build(self) -> Result<CaptureSession> {
        let config = self
            .config
            .ok_or_else(|| GlasscamError::system("Configuration must be specified"))?;
        let camera = self
            .camera
            .ok_or_else(|| GlasscamError::system("Camera module must be specified"))?;

        config.validate()?;

        let settings = self
            .settings
            .unwrap_or_else(|| SettingsStore::new(config.defaults.to_settings()));
        let events = self
            .event_bus
            .unwrap_or_else(|| EventBus::new(config.system.event_bus_capacity));
        let location = self
            .location
            .unwrap_or_else(|| Arc::new(NoLocation) as Arc<dyn LocationProvider>);

        Ok(CaptureSession::new(
            camera,
            config.camera.clone(),
            settings,
            MediaStore::new(&config.storage),
            location,
            config.location.timeout(),
            events,
        ))
    }
}

impl Default for CaptureSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
