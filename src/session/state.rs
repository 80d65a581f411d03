use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Previewing,
    CapturingPhoto,
    RecordingVideo,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Previewing => "previewing",
            SessionState::CapturingPhoto => "capturing a photo",
            SessionState::RecordingVideo => "recording video",
        };
        f.write_str(name)
    }
}

/// Commands that are subject to the state machine.
/// Detaching the surface is always allowed and is not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AttachSurface,
    TakePhoto,
    StartVideo,
    StopVideo,
    Zoom,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::AttachSurface => "attach_surface",
            Command::TakePhoto => "take_photo",
            Command::StartVideo => "start_video",
            Command::StopVideo => "stop_video",
            Command::Zoom => "zoom",
        }
    }
}

/// How an admitted command is carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Issue it to the device now
    Run,
    /// No device yet; remember it for the next preview start
    Defer,
}

/// Decide whether `command` is legal in `state`
pub fn admit(command: Command, state: SessionState) -> Result<Admission, SessionError> {
    use SessionState::*;

    match (command, state) {
        (Command::AttachSurface, Idle) => Ok(Admission::Run),
        (Command::TakePhoto, Previewing) => Ok(Admission::Run),
        (Command::StartVideo, Previewing) => Ok(Admission::Run),
        (Command::StopVideo, RecordingVideo) => Ok(Admission::Run),
        (Command::Zoom, Previewing) => Ok(Admission::Run),
        (Command::Zoom, Idle) => Ok(Admission::Defer),
        (command, state) => Err(SessionError::unsupported(command.name(), state)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_commands_need_preview() {
        for state in [
            SessionState::Idle,
            SessionState::CapturingPhoto,
            SessionState::RecordingVideo,
        ] {
            assert!(admit(Command::TakePhoto, state).is_err());
            assert!(admit(Command::StartVideo, state).is_err());
        }
        assert_eq!(
            admit(Command::TakePhoto, SessionState::Previewing).unwrap(),
            Admission::Run
        );
    }

    #[test]
    fn test_zoom_deferred_without_device() {
        assert_eq!(
            admit(Command::Zoom, SessionState::Idle).unwrap(),
            Admission::Defer
        );
        assert!(admit(Command::Zoom, SessionState::RecordingVideo).is_err());
        assert!(admit(Command::Zoom, SessionState::CapturingPhoto).is_err());
    }

    #[test]
    fn test_rejection_names_command_and_state() {
        match admit(Command::StopVideo, SessionState::Previewing) {
            Err(SessionError::UnsupportedInCurrentMode { command, state }) => {
                assert_eq!(command, "stop_video");
                assert_eq!(state, SessionState::Previewing);
            }
            other => panic!("Unexpected admission: {:?}", other),
        }
        assert!(admit(Command::AttachSurface, SessionState::Previewing).is_err());
    }
}
