use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Capture quality applied to the next photo or video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    High,
    Low,
}

impl Quality {
    pub fn toggled(self) -> Self {
        match self {
            Quality::High => Quality::Low,
            Quality::Low => Quality::High,
        }
    }
}

/// User toggles read by the session at the start of every operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub quality: Quality,
    pub geotag_enabled: bool,
    pub smooth_zoom_enabled: bool,
    pub max_zoom_mode: bool,
    pub auto_save: bool,
    pub overlay_visible: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: Quality::High,
            geotag_enabled: false,
            smooth_zoom_enabled: false,
            max_zoom_mode: false,
            auto_save: false,
            overlay_visible: true,
        }
    }
}

/// Shared runtime settings store
///
/// Cloning yields another handle onto the same settings, so a toggle made
/// by the UI is visible to the session on its next operation.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings
    pub fn snapshot(&self) -> Settings {
        self.inner.read().clone()
    }

    pub fn quality(&self) -> Quality {
        self.inner.read().quality
    }

    pub fn set_quality(&self, quality: Quality) {
        self.inner.write().quality = quality;
        debug!("Quality set to {:?}", quality);
    }

    pub fn toggle_quality(&self) -> Quality {
        let mut settings = self.inner.write();
        settings.quality = settings.quality.toggled();
        debug!("Quality toggled to {:?}", settings.quality);
        settings.quality
    }

    pub fn toggle_geotagging(&self) -> bool {
        self.toggle(|s| &mut s.geotag_enabled, "geotagging")
    }

    pub fn toggle_smooth_zoom(&self) -> bool {
        self.toggle(|s| &mut s.smooth_zoom_enabled, "smooth zoom")
    }

    pub fn toggle_max_zoom_mode(&self) -> bool {
        self.toggle(|s| &mut s.max_zoom_mode, "max zoom mode")
    }

    pub fn toggle_auto_save(&self) -> bool {
        self.toggle(|s| &mut s.auto_save, "auto save")
    }

    pub fn toggle_overlay(&self) -> bool {
        self.toggle(|s| &mut s.overlay_visible, "overlay")
    }

    fn toggle(&self, field: impl FnOnce(&mut Settings) -> &mut bool, name: &str) -> bool {
        let mut settings = self.inner.write();
        let flag = field(&mut *settings);
        *flag = !*flag;
        debug!("Toggled {} to {}", name, *flag);
        *flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggles_return_new_value() {
        let store = SettingsStore::default();

        assert!(store.toggle_smooth_zoom());
        assert!(!store.toggle_smooth_zoom());
        assert!(store.toggle_max_zoom_mode());
        assert!(store.toggle_geotagging());
        assert!(store.toggle_auto_save());
        assert!(!store.toggle_overlay());

        let snapshot = store.snapshot();
        assert!(!snapshot.smooth_zoom_enabled);
        assert!(snapshot.max_zoom_mode);
        assert!(snapshot.geotag_enabled);
        assert!(snapshot.auto_save);
        assert!(!snapshot.overlay_visible);
    }

    #[test]
    fn test_clones_share_state() {
        let store = SettingsStore::default();
        let ui_handle = store.clone();

        assert_eq!(ui_handle.toggle_quality(), Quality::Low);
        assert_eq!(store.quality(), Quality::Low);

        store.set_quality(Quality::High);
        assert_eq!(ui_handle.snapshot().quality, Quality::High);
    }
}
