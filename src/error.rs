use crate::events::StatusSignal;
use crate::session::SessionState;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlasscamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("System error: {message}")]
    System { message: String },
}

impl GlasscamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// Failures reported by the camera hardware abstraction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Failed to open camera device: {details}")]
    OpenFailed { details: String },

    #[error("Failed to start preview: {details}")]
    PreviewFailed { details: String },

    #[error("Camera rejected parameters: {details}")]
    ParameterRejected { details: String },

    #[error("Smooth zoom rejected by hardware: {details}")]
    SmoothZoomRejected { details: String },

    #[error("Photo capture rejected: {details}")]
    CaptureRejected { details: String },

    #[error("Recorder failed to prepare: {details}")]
    RecorderPrepare { details: String },

    #[error("Recorder failed to stop: {details}")]
    RecorderStop { details: String },
}

/// Errors surfaced by the capture session command surface
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Camera device unavailable: {source}")]
    DeviceUnavailable {
        #[source]
        source: DeviceError,
    },

    #[error("Command '{command}' is not supported while {state}")]
    UnsupportedInCurrentMode {
        command: &'static str,
        state: SessionState,
    },

    #[error("Photo was not delivered within {timeout_ms}ms")]
    CaptureTimeout { timeout_ms: u64 },

    #[error("Failed to write captured media to {path}: {source}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Video recorder failed: {source}")]
    RecorderPrepare {
        #[source]
        source: DeviceError,
    },

    #[error("Session was detached while the operation was in flight")]
    SessionDetached,
}

impl SessionError {
    pub fn unsupported(command: &'static str, state: SessionState) -> Self {
        Self::UnsupportedInCurrentMode { command, state }
    }

    /// Status feedback the UI layer shows for this failure
    pub fn status_signal(&self) -> StatusSignal {
        match self {
            SessionError::UnsupportedInCurrentMode { .. } => StatusSignal::Unsupported,
            SessionError::SessionDetached => StatusSignal::Canceled,
            SessionError::DeviceUnavailable { .. }
            | SessionError::CaptureTimeout { .. }
            | SessionError::IoWrite { .. }
            | SessionError::RecorderPrepare { .. } => StatusSignal::Error,
        }
    }

    /// Short machine-friendly name used in capture notifications
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::DeviceUnavailable { .. } => "device_unavailable",
            SessionError::UnsupportedInCurrentMode { .. } => "unsupported_in_current_mode",
            SessionError::CaptureTimeout { .. } => "capture_timeout",
            SessionError::IoWrite { .. } => "io_write",
            SessionError::RecorderPrepare { .. } => "recorder_prepare",
            SessionError::SessionDetached => "session_detached",
        }
    }
}

/// Errors from moving media between the temporary and storage folders
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Media path has no file name: {path}")]
    InvalidPath { path: String },
}

pub type Result<T> = std::result::Result<T, GlasscamError>;
