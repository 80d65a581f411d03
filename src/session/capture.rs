use crate::device::PhotoCallback;
use crate::error::SessionError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Receiving end of one in-flight photo capture
pub(crate) struct PhotoTicket {
    epoch: u64,
    receiver: oneshot::Receiver<Vec<u8>>,
    detached: CancellationToken,
}

/// Turns the device's one-shot photo callback into an awaitable result
#[derive(Debug, Clone)]
pub(crate) struct CaptureSynchronizer {
    timeout: Duration,
    current_epoch: Arc<AtomicU64>,
}

impl CaptureSynchronizer {
    pub fn new(timeout: Duration, current_epoch: Arc<AtomicU64>) -> Self {
        Self {
            timeout,
            current_epoch,
        }
    }

    /// Build the device callback and the ticket to wait on for a capture
    /// issued during `epoch`. `detached` fires when the surface goes away.
    pub fn arm(&self, epoch: u64, detached: CancellationToken) -> (PhotoCallback, PhotoTicket) {
        let (sender, receiver) = oneshot::channel();
        let current_epoch = Arc::clone(&self.current_epoch);

        let callback: PhotoCallback = Box::new(move |bytes: Vec<u8>| {
            if current_epoch.load(Ordering::SeqCst) != epoch {
                trace!("Discarding photo from superseded session epoch {}", epoch);
                return;
            }
            if sender.send(bytes).is_err() {
                trace!("Photo arrived after the caller stopped waiting");
            }
        });

        (
            callback,
            PhotoTicket {
                epoch,
                receiver,
                detached,
            },
        )
    }

    /// Wait for the photo bytes, bounded by the capture timeout
    pub async fn wait(&self, ticket: PhotoTicket) -> Result<Vec<u8>, SessionError> {
        let PhotoTicket {
            epoch,
            receiver,
            detached,
        } = ticket;

        tokio::select! {
            _ = detached.cancelled() => {
                debug!("Surface detached while waiting for photo (epoch {})", epoch);
                Err(SessionError::SessionDetached)
            }
            received = tokio::time::timeout(self.timeout, receiver) => match received {
                Ok(Ok(bytes)) => {
                    debug!("Received {} photo bytes", bytes.len());
                    Ok(bytes)
                }
                // callback dropped without firing: the photo can never arrive
                Ok(Err(_)) if self.is_stale(epoch) => Err(SessionError::SessionDetached),
                Ok(Err(_)) => {
                    warn!("Camera dropped the photo callback without delivering");
                    Err(self.timeout_error())
                }
                Err(_) if self.is_stale(epoch) => Err(SessionError::SessionDetached),
                Err(_) => {
                    warn!("No photo delivered within {:?}", self.timeout);
                    Err(self.timeout_error())
                }
            },
        }
    }

    fn is_stale(&self, epoch: u64) -> bool {
        self.current_epoch.load(Ordering::SeqCst) != epoch
    }

    fn timeout_error(&self) -> SessionError {
        SessionError::CaptureTimeout {
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}
