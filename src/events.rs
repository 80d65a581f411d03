use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::media::MediaKind;
use crate::session::SessionState;

/// Capture mode shown to the wearer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureMode {
    Photo,
    Video,
}

/// Sound/icon feedback the UI shows after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusSignal {
    Ok,
    Canceled,
    Error,
    Unsupported,
    GotPicture,
    GotVideo,
    StartVideo,
    StopVideo,
}

/// Result of a finished capture as seen by the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureOutcome {
    Captured { path: PathBuf },
    Failed { kind: String, message: String },
}

/// Notifications emitted by a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Zoom level was applied; `is_final` is false for intermediate smooth-zoom steps
    ZoomChanged { level: u32, is_final: bool },
    /// A photo or video finished, successfully or not
    CaptureCompleted {
        kind: MediaKind,
        outcome: CaptureOutcome,
    },
    /// Switched between photo and video mode
    ModeChanged { mode: CaptureMode },
    /// Session state machine transition
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// Media moved into permanent storage
    MediaSaved { path: PathBuf, timestamp: SystemTime },
    /// Temporary media was deleted
    MediaDiscarded { path: PathBuf },
    /// Feedback signal for the wearer
    Status { signal: StatusSignal },
}

impl SessionEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SessionEvent::ZoomChanged { level, is_final } => {
                if *is_final {
                    format!("Zoom at {}", level)
                } else {
                    format!("Zooming through {}", level)
                }
            }
            SessionEvent::CaptureCompleted { kind, outcome } => match outcome {
                CaptureOutcome::Captured { path } => {
                    format!("{:?} captured: {}", kind, path.display())
                }
                CaptureOutcome::Failed { kind: err, message } => {
                    format!("{:?} capture failed ({}): {}", kind, err, message)
                }
            },
            SessionEvent::ModeChanged { mode } => format!("Mode changed to {:?}", mode),
            SessionEvent::StateChanged { from, to } => format!("State {} -> {}", from, to),
            SessionEvent::MediaSaved { path, .. } => format!("Saved {}", path.display()),
            SessionEvent::MediaDiscarded { path } => format!("Discarded {}", path.display()),
            SessionEvent::Status { signal } => format!("Status {:?}", signal),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::ZoomChanged { .. } => "zoom_changed",
            SessionEvent::CaptureCompleted { .. } => "capture_completed",
            SessionEvent::ModeChanged { .. } => "mode_changed",
            SessionEvent::StateChanged { .. } => "state_changed",
            SessionEvent::MediaSaved { .. } => "media_saved",
            SessionEvent::MediaDiscarded { .. } => "media_discarded",
            SessionEvent::Status { .. } => "status",
        }
    }
}

/// Event bus carrying session notifications to the UI layer
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of subscribers that received it. Having no
    /// subscribers is normal (the UI may not be listening yet).
    pub fn publish(&self, event: SessionEvent) -> usize {
        match &event {
            SessionEvent::CaptureCompleted {
                outcome: CaptureOutcome::Failed { kind, message },
                ..
            } => {
                warn!("Capture failed ({}): {}", kind, message);
            }
            SessionEvent::StateChanged { .. } | SessionEvent::MediaSaved { .. } => {
                info!("{}", event.description());
            }
            _ => debug!("Event: {}", event.description()),
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let delivered = bus.publish(SessionEvent::ZoomChanged {
            level: 40,
            is_final: true,
        });
        assert_eq!(delivered, 1);

        match rx.recv().await.unwrap() {
            SessionEvent::ZoomChanged { level, is_final } => {
                assert_eq!(level, 40);
                assert!(is_final);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(
            bus.publish(SessionEvent::Status {
                signal: StatusSignal::Ok
            }),
            0
        );
    }

    #[test]
    fn test_event_types() {
        let event = SessionEvent::ModeChanged {
            mode: CaptureMode::Video,
        };
        assert_eq!(event.event_type(), "mode_changed");
        assert_eq!(event.description(), "Mode changed to Video");
    }
}
