use crate::device::{CameraHandle, ZoomCallback};
use crate::events::{EventBus, SessionEvent};
use tracing::{debug, warn};

/// A zoom request, resolved against the device bounds when applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomTarget {
    Level(i64),
    Max,
}

impl ZoomTarget {
    /// Clamp into `[0, max_zoom]`
    pub fn resolve(self, max_zoom: u32) -> u32 {
        match self {
            ZoomTarget::Max => max_zoom,
            ZoomTarget::Level(level) => level.clamp(0, max_zoom as i64) as u32,
        }
    }
}

/// Tracks the externally visible zoom level and requests waiting for a device
#[derive(Debug, Default)]
pub struct ZoomController {
    current: u32,
    pending: Option<ZoomTarget>,
}

impl ZoomController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn pending(&self) -> Option<ZoomTarget> {
        self.pending
    }

    /// Level relative zoom gestures start from
    pub fn reference_level(&self) -> i64 {
        match self.pending {
            Some(ZoomTarget::Level(level)) => level,
            _ => self.current as i64,
        }
    }

    /// Remember a request until a device is available; the latest request wins
    pub fn defer(&mut self, target: ZoomTarget) {
        debug!("Camera not yet initialized, deferring zoom {:?}", target);
        self.pending = Some(target);
    }

    pub fn take_pending(&mut self) -> Option<ZoomTarget> {
        self.pending.take()
    }

    /// Adopt the level reported by a freshly opened device
    pub fn sync_with_device(&mut self, handle: &dyn CameraHandle) {
        self.current = handle.zoom().min(handle.max_zoom());
    }

    /// Device went away; nothing is applied until the next preview
    pub fn reset(&mut self) {
        self.current = 0;
    }

    /// Apply `target` to a live device.
    ///
    /// Instant zoom updates the level right away and publishes a single final
    /// notification. Smooth zoom hands `on_step` to the hardware ramp and the
    /// level only changes through `record_step`. A rejected smooth zoom leaves
    /// the zoom where it was.
    pub fn apply(
        &mut self,
        handle: &mut dyn CameraHandle,
        target: ZoomTarget,
        smooth: bool,
        on_step: ZoomCallback,
        events: &EventBus,
    ) {
        let max_zoom = handle.max_zoom();
        let level = target.resolve(max_zoom);
        debug!(
            "Zooming from {} to {} (max {}, smooth: {})",
            self.current, level, max_zoom, smooth
        );

        if smooth {
            if let Err(e) = handle.start_smooth_zoom(level, on_step) {
                warn!("Can't smooth zoom, zoom stays at {}: {}", self.current, e);
            }
            return;
        }

        match handle.set_zoom(level) {
            Ok(()) => {
                self.current = level;
                events.publish(SessionEvent::ZoomChanged {
                    level,
                    is_final: true,
                });
            }
            Err(e) => warn!("Camera rejected zoom {}: {}", level, e),
        }
    }

    /// Record one step of a smooth zoom ramp
    pub fn record_step(&mut self, level: u32, max_zoom: u32) -> u32 {
        self.current = level.min(max_zoom);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{CameraModule, SimulatedCamera, SimulatedCameraConfig};

    #[test]
    fn test_resolve_clamps() {
        assert_eq!(ZoomTarget::Level(150).resolve(100), 100);
        assert_eq!(ZoomTarget::Level(-20).resolve(100), 0);
        assert_eq!(ZoomTarget::Level(42).resolve(100), 42);
        assert_eq!(ZoomTarget::Max.resolve(60), 60);
    }

    #[test]
    fn test_latest_deferred_request_wins() {
        let mut zoom = ZoomController::new();
        zoom.defer(ZoomTarget::Level(10));
        zoom.defer(ZoomTarget::Level(30));

        assert_eq!(zoom.reference_level(), 30);
        assert_eq!(zoom.take_pending(), Some(ZoomTarget::Level(30)));
        assert_eq!(zoom.take_pending(), None);
    }

    #[tokio::test]
    async fn test_instant_zoom_publishes_once() {
        let camera = SimulatedCamera::new(SimulatedCameraConfig {
            max_zoom: 100,
            ..Default::default()
        });
        let mut handle = camera.open().unwrap();
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let mut zoom = ZoomController::new();

        zoom.apply(
            handle.as_mut(),
            ZoomTarget::Level(150),
            false,
            Box::new(|_, _| {}),
            &events,
        );

        assert_eq!(zoom.current(), 100);
        assert_eq!(camera.stats().zoom, 100);
        match rx.try_recv().unwrap() {
            SessionEvent::ZoomChanged { level, is_final } => {
                assert_eq!(level, 100);
                assert!(is_final);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_rejected_smooth_zoom_keeps_level() {
        let camera = SimulatedCamera::new(SimulatedCameraConfig {
            reject_smooth_zoom: true,
            ..Default::default()
        });
        let mut handle = camera.open().unwrap();
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let mut zoom = ZoomController::new();

        zoom.apply(
            handle.as_mut(),
            ZoomTarget::Max,
            true,
            Box::new(|_, _| {}),
            &events,
        );

        assert_eq!(zoom.current(), 0);
        assert!(rx.try_recv().is_err());
    }
}
