mod interface;
mod simulated;
#[cfg(test)]
mod tests;

pub use interface::{
    CameraHandle, CameraModule, PhotoCallback, PhotoParams, PreviewParams, RecordingProfile,
    RecordingRequest, Surface, ZoomCallback,
};
pub use simulated::{PhotoBehavior, SimulatedCamera, SimulatedCameraConfig, SimulatedStats};
