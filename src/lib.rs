pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod keyboard_input;
pub mod location;
pub mod media;
pub mod session;
pub mod settings;

pub use config::GlasscamConfig;
pub use device::{
    CameraHandle, CameraModule, PhotoBehavior, PhotoParams, RecordingProfile, SimulatedCamera,
    SimulatedCameraConfig, Surface,
};
pub use error::{DeviceError, GlasscamError, MediaError, Result, SessionError};
pub use events::{CaptureMode, CaptureOutcome, EventBus, SessionEvent, StatusSignal};
pub use keyboard_input::{CommandDispatcher, KeyCommand, KeyboardInputHandler};
pub use location::{
    BestEffortLocator, LocationFix, LocationProvider, LocationSource, NoLocation,
    StaticLocationSource,
};
pub use media::{MediaKind, MediaStore};
pub use session::{CaptureSession, CaptureSessionBuilder, CapturedMedia, SessionState, ZoomTarget};
pub use settings::{Quality, Settings, SettingsStore};
