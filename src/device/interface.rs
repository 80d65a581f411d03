use crate::error::DeviceError;
use crate::location::LocationFix;
use crate::settings::Quality;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fired by the device for every step of a smooth zoom ramp with
/// `(level, is_stopped)`. Runs on the device's callback thread.
pub type ZoomCallback = Box<dyn FnMut(u32, bool) + Send>;

/// Fired at most once with the encoded photo bytes. Never fired on hard failure.
pub type PhotoCallback = Box<dyn FnOnce(Vec<u8>) + Send>;

/// Opaque preview target handed over by the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

impl Surface {
    pub fn new(id: u64, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewParams {
    pub resolution: (u32, u32),
    pub fps: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoParams {
    pub resolution: (u32, u32),
    pub jpeg_quality: u8,
    /// Geotag written into the photo metadata
    pub location: Option<LocationFix>,
}

impl PhotoParams {
    pub fn for_quality(quality: Quality, high: (u32, u32), low: (u32, u32)) -> Self {
        match quality {
            Quality::High => Self {
                resolution: high,
                jpeg_quality: 95,
                location: None,
            },
            Quality::Low => Self {
                resolution: low,
                jpeg_quality: 80,
                location: None,
            },
        }
    }
}

/// Video encoding profile chosen from the capture quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingProfile {
    pub resolution: (u32, u32),
    pub fps: u32,
}

impl RecordingProfile {
    pub fn for_quality(quality: Quality) -> Self {
        match quality {
            Quality::High => Self {
                resolution: (1280, 720),
                fps: 30,
            },
            Quality::Low => Self {
                resolution: (640, 480),
                fps: 30,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordingRequest {
    pub profile: RecordingProfile,
    pub output_path: PathBuf,
    pub location: Option<LocationFix>,
}

impl RecordingRequest {
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

/// Entry point into the platform camera stack
pub trait CameraModule: Send + Sync {
    fn name(&self) -> &str;

    /// Open the camera, taking exclusive ownership of it
    fn open(&self) -> Result<Box<dyn CameraHandle>, DeviceError>;
}

/// An open camera device
///
/// Callbacks handed to `start_smooth_zoom` and `capture_photo` must be fired
/// from the device's own callback context, never from inside the call that
/// registered them.
pub trait CameraHandle: Send {
    fn max_zoom(&self) -> u32;
    fn zoom(&self) -> u32;
    fn set_zoom(&mut self, level: u32) -> Result<(), DeviceError>;
    fn start_smooth_zoom(&mut self, target: u32, on_change: ZoomCallback)
        -> Result<(), DeviceError>;

    fn configure_preview(&mut self, params: &PreviewParams) -> Result<(), DeviceError>;
    fn start_preview(&mut self, surface: &Surface) -> Result<(), DeviceError>;
    fn stop_preview(&mut self);

    fn capture_photo(&mut self, params: &PhotoParams, on_ready: PhotoCallback)
        -> Result<(), DeviceError>;

    /// Hand the device over to the recorder and start recording
    fn start_recording(
        &mut self,
        surface: &Surface,
        request: &RecordingRequest,
    ) -> Result<(), DeviceError>;
    /// Stop the recorder and take the device back, returning the written file
    fn stop_recording(&mut self) -> Result<PathBuf, DeviceError>;

    /// Release the device. Idempotent and infallible.
    fn release(&mut self);
}
