mod builder;
mod capture;
mod controller;
mod state;
mod zoom;

pub use builder::CaptureSessionBuilder;
pub use controller::{CaptureSession, CapturedMedia};
pub use state::{admit, Admission, Command, SessionState};
pub use zoom::{ZoomController, ZoomTarget};
