use super::interface::{
    CameraHandle, CameraModule, PhotoCallback, PhotoParams, PreviewParams, RecordingRequest,
    Surface, ZoomCallback,
};
use crate::error::DeviceError;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// What the simulated camera does when asked for a photo
#[derive(Debug, Clone)]
pub enum PhotoBehavior {
    /// Deliver the bytes from a background thread after `delay`
    Deliver { delay: Duration, bytes: Vec<u8> },
    /// Keep the callback until `fire_pending_photo` is called
    Hold,
}

impl Default for PhotoBehavior {
    fn default() -> Self {
        PhotoBehavior::Deliver {
            delay: Duration::from_millis(20),
            bytes: mock_jpeg(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedCameraConfig {
    pub max_zoom: u32,
    pub fail_open: bool,
    pub reject_smooth_zoom: bool,
    pub fail_recorder: bool,
    pub photo: PhotoBehavior,
    /// Zoom levels covered by one smooth zoom callback
    pub ramp_step: u32,
    pub ramp_interval: Duration,
}

impl Default for SimulatedCameraConfig {
    fn default() -> Self {
        Self {
            max_zoom: 60,
            fail_open: false,
            reject_smooth_zoom: false,
            fail_recorder: false,
            photo: PhotoBehavior::default(),
            ramp_step: 10,
            ramp_interval: Duration::from_millis(5),
        }
    }
}

/// Counters observed by tests and the CLI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedStats {
    pub opens: u32,
    pub releases: u32,
    pub previews_started: u32,
    pub photos_requested: u32,
    pub recordings_started: u32,
    pub preview_active: bool,
    pub recording: bool,
    pub is_open: bool,
    pub zoom: u32,
}

struct SimState {
    config: SimulatedCameraConfig,
    stats: SimulatedStats,
    recording_path: Option<PathBuf>,
    pending_photo: Option<PhotoCallback>,
    last_photo_params: Option<PhotoParams>,
    last_recording: Option<RecordingRequest>,
    generation: u64,
}

/// In-process camera used by the CLI and tests
#[derive(Clone)]
pub struct SimulatedCamera {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedCamera {
    pub fn new(config: SimulatedCameraConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                config,
                stats: SimulatedStats::default(),
                recording_path: None,
                pending_photo: None,
                last_photo_params: None,
                last_recording: None,
                generation: 0,
            })),
        }
    }

    pub fn stats(&self) -> SimulatedStats {
        self.state.lock().stats.clone()
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().config.fail_open = fail;
    }

    pub fn set_photo_behavior(&self, behavior: PhotoBehavior) {
        self.state.lock().config.photo = behavior;
    }

    pub fn set_fail_recorder(&self, fail: bool) {
        self.state.lock().config.fail_recorder = fail;
    }

    pub fn set_reject_smooth_zoom(&self, reject: bool) {
        self.state.lock().config.reject_smooth_zoom = reject;
    }

    pub fn last_photo_params(&self) -> Option<PhotoParams> {
        self.state.lock().last_photo_params.clone()
    }

    pub fn last_recording(&self) -> Option<RecordingRequest> {
        self.state.lock().last_recording.clone()
    }

    /// Fire a photo callback held back by `PhotoBehavior::Hold`
    pub fn fire_pending_photo(&self, bytes: Vec<u8>) -> bool {
        let callback = self.state.lock().pending_photo.take();
        match callback {
            Some(callback) => {
                callback(bytes);
                true
            }
            None => false,
        }
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new(SimulatedCameraConfig::default())
    }
}

impl CameraModule for SimulatedCamera {
    fn name(&self) -> &str {
        "simulated"
    }

    fn open(&self) -> Result<Box<dyn CameraHandle>, DeviceError> {
        let mut state = self.state.lock();
        if state.config.fail_open {
            return Err(DeviceError::OpenFailed {
                details: "simulated camera is unavailable".to_string(),
            });
        }
        if state.stats.is_open {
            return Err(DeviceError::OpenFailed {
                details: "simulated camera is already in use".to_string(),
            });
        }

        state.generation += 1;
        state.stats.opens += 1;
        state.stats.is_open = true;
        state.stats.zoom = 0;
        info!("Simulated camera opened (generation {})", state.generation);

        Ok(Box::new(SimulatedHandle {
            state: Arc::clone(&self.state),
            generation: state.generation,
            released: false,
        }))
    }
}

struct SimulatedHandle {
    state: Arc<Mutex<SimState>>,
    generation: u64,
    released: bool,
}

impl CameraHandle for SimulatedHandle {
    fn max_zoom(&self) -> u32 {
        self.state.lock().config.max_zoom
    }

    fn zoom(&self) -> u32 {
        self.state.lock().stats.zoom
    }

    fn set_zoom(&mut self, level: u32) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if level > state.config.max_zoom {
            return Err(DeviceError::ParameterRejected {
                details: format!("zoom {} above max {}", level, state.config.max_zoom),
            });
        }
        state.stats.zoom = level;
        Ok(())
    }

    fn start_smooth_zoom(
        &mut self,
        target: u32,
        mut on_change: ZoomCallback,
    ) -> Result<(), DeviceError> {
        let (start, step, interval) = {
            let state = self.state.lock();
            if state.config.reject_smooth_zoom {
                return Err(DeviceError::SmoothZoomRejected {
                    details: "smooth zoom not supported".to_string(),
                });
            }
            if target > state.config.max_zoom {
                return Err(DeviceError::ParameterRejected {
                    details: format!("zoom {} above max {}", target, state.config.max_zoom),
                });
            }
            (
                state.stats.zoom,
                state.config.ramp_step.max(1),
                state.config.ramp_interval,
            )
        };

        let shared = Arc::clone(&self.state);
        let generation = self.generation;
        std::thread::spawn(move || {
            let mut level = start;
            loop {
                std::thread::sleep(interval);
                level = if target > level {
                    (level + step).min(target)
                } else {
                    level.saturating_sub(step).max(target)
                };

                {
                    let mut state = shared.lock();
                    if state.generation != generation || !state.stats.is_open {
                        trace!("Smooth zoom ramp aborted, camera released");
                        return;
                    }
                    state.stats.zoom = level;
                }

                let stopped = level == target;
                on_change(level, stopped);
                if stopped {
                    return;
                }
            }
        });

        Ok(())
    }

    fn configure_preview(&mut self, params: &PreviewParams) -> Result<(), DeviceError> {
        if params.resolution.0 == 0 || params.resolution.1 == 0 || params.fps == 0 {
            return Err(DeviceError::ParameterRejected {
                details: format!("invalid preview parameters {:?}", params),
            });
        }
        Ok(())
    }

    fn start_preview(&mut self, surface: &Surface) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        state.stats.previews_started += 1;
        state.stats.preview_active = true;
        debug!("Simulated preview started on surface {}", surface.id);
        Ok(())
    }

    fn stop_preview(&mut self) {
        self.state.lock().stats.preview_active = false;
    }

    fn capture_photo(
        &mut self,
        params: &PhotoParams,
        on_ready: PhotoCallback,
    ) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if !state.stats.preview_active {
            return Err(DeviceError::CaptureRejected {
                details: "preview is not running".to_string(),
            });
        }

        state.stats.photos_requested += 1;
        // the hardware stops the preview while taking a picture
        state.stats.preview_active = false;
        state.last_photo_params = Some(params.clone());

        match state.config.photo.clone() {
            PhotoBehavior::Deliver { delay, bytes } => {
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    on_ready(bytes);
                });
            }
            PhotoBehavior::Hold => {
                state.pending_photo = Some(on_ready);
            }
        }

        Ok(())
    }

    fn start_recording(
        &mut self,
        surface: &Surface,
        request: &RecordingRequest,
    ) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if state.config.fail_recorder {
            // the recorder creates its output file before prepare fails
            let _ = std::fs::write(request.output_path(), b"");
            return Err(DeviceError::RecorderPrepare {
                details: "simulated recorder failed to prepare".to_string(),
            });
        }

        state.stats.preview_active = false;
        state.stats.recording = true;
        state.stats.recordings_started += 1;
        state.recording_path = Some(request.output_path().to_path_buf());
        state.last_recording = Some(request.clone());
        debug!(
            "Simulated recording to {} on surface {}",
            request.output_path.display(),
            surface.id
        );
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<PathBuf, DeviceError> {
        let mut state = self.state.lock();
        let path = state
            .recording_path
            .take()
            .ok_or_else(|| DeviceError::RecorderStop {
                details: "recorder is not running".to_string(),
            })?;
        state.stats.recording = false;

        std::fs::write(&path, mock_mp4()).map_err(|e| DeviceError::RecorderStop {
            details: format!("failed to write {}: {}", path.display(), e),
        })?;

        Ok(path)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut state = self.state.lock();
        if state.generation == self.generation {
            state.stats.is_open = false;
            state.stats.preview_active = false;
            state.stats.recording = false;
            state.recording_path = None;
        }
        state.stats.releases += 1;
        info!("Simulated camera released");
    }
}

impl Drop for SimulatedHandle {
    fn drop(&mut self) {
        self.release();
    }
}

fn mock_jpeg() -> Vec<u8> {
    let mut data = vec![
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x01, 0x00,
        0x48, 0x00, 0x48, 0x00, 0x00,
    ];
    data.extend(vec![0x80; 1024]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

fn mock_mp4() -> Vec<u8> {
    let mut data = vec![0x00, 0x00, 0x00, 0x18];
    data.extend_from_slice(b"ftypmp42");
    data.extend(vec![0x00; 12]);
    data
}
