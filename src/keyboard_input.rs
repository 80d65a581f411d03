use crate::device::Surface;
use crate::error::Result;
use crate::session::{CaptureSession, SessionState};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Commands reachable from the terminal, standing in for the glass touchpad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Attach,
    Detach,
    TakePhoto,
    ToggleVideo,
    ZoomIn,
    ZoomOut,
    ResetZoom,
    ToggleMaxZoom,
    ToggleSmoothZoom,
    ToggleGeotag,
    ToggleQuality,
    ToggleOverlay,
    ToggleAutoSave,
    SaveMedia,
    DiscardMedia,
    Quit,
}

impl KeyCommand {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        let command = match code {
            KeyCode::Char('a') => KeyCommand::Attach,
            KeyCode::Char('d') => KeyCommand::Detach,
            KeyCode::Char(' ') => KeyCommand::TakePhoto,
            KeyCode::Char('v') => KeyCommand::ToggleVideo,
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => KeyCommand::ZoomIn,
            KeyCode::Char('-') | KeyCode::Down => KeyCommand::ZoomOut,
            KeyCode::Char('0') => KeyCommand::ResetZoom,
            KeyCode::Char('m') => KeyCommand::ToggleMaxZoom,
            KeyCode::Char('s') => KeyCommand::ToggleSmoothZoom,
            KeyCode::Char('g') => KeyCommand::ToggleGeotag,
            KeyCode::Char('h') => KeyCommand::ToggleQuality,
            KeyCode::Char('o') => KeyCommand::ToggleOverlay,
            KeyCode::Char('w') => KeyCommand::ToggleAutoSave,
            KeyCode::Char('y') => KeyCommand::SaveMedia,
            KeyCode::Char('n') => KeyCommand::DiscardMedia,
            KeyCode::Char('q') | KeyCode::Esc => KeyCommand::Quit,
            _ => return None,
        };
        Some(command)
    }
}

/// Runs key commands against a capture session
pub struct CommandDispatcher {
    session: CaptureSession,
    preview_size: (u32, u32),
    next_surface_id: AtomicU64,
    /// Latest capture still waiting for a keep/discard decision
    unsaved: Mutex<Option<PathBuf>>,
}

impl CommandDispatcher {
    pub fn new(session: CaptureSession, preview_size: (u32, u32)) -> Self {
        Self {
            session,
            preview_size,
            next_surface_id: AtomicU64::new(1),
            unsaved: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn unsaved(&self) -> Option<PathBuf> {
        self.unsaved.lock().clone()
    }

    pub async fn execute(&self, command: KeyCommand) -> Result<()> {
        debug!("Executing {:?}", command);
        match command {
            KeyCommand::Attach => {
                let id = self.next_surface_id.fetch_add(1, Ordering::SeqCst);
                let (width, height) = self.preview_size;
                self.session
                    .attach_surface(Surface::new(id, width, height))?;
            }
            KeyCommand::Detach => self.session.detach_surface(),
            KeyCommand::TakePhoto => {
                let media = self.session.take_photo().await?;
                self.remember(media.saved, media.path);
            }
            KeyCommand::ToggleVideo => {
                if self.session.state() == SessionState::RecordingVideo {
                    let media = self.session.stop_video().await?;
                    self.remember(media.saved, media.path);
                } else {
                    self.session.start_video().await?;
                }
            }
            KeyCommand::ZoomIn => self.session.zoom_in()?,
            KeyCommand::ZoomOut => self.session.zoom_out()?,
            KeyCommand::ResetZoom => self.session.reset_zoom()?,
            KeyCommand::ToggleMaxZoom => {
                let enabled = self.session.toggle_max_zoom_mode()?;
                info!("Max zoom mode {}", on_off(enabled));
            }
            KeyCommand::ToggleSmoothZoom => {
                let enabled = self.session.toggle_smooth_zoom_mode();
                info!("Smooth zoom {}", on_off(enabled));
            }
            KeyCommand::ToggleGeotag => {
                let enabled = self.session.settings().toggle_geotagging();
                info!("Geotagging {}", on_off(enabled));
            }
            KeyCommand::ToggleQuality => {
                let quality = self.session.settings().toggle_quality();
                info!("Quality set to {:?}", quality);
            }
            KeyCommand::ToggleOverlay => {
                let visible = self.session.settings().toggle_overlay();
                info!("Overlay {}", on_off(visible));
            }
            KeyCommand::ToggleAutoSave => {
                let enabled = self.session.settings().toggle_auto_save();
                info!("Auto save {}", on_off(enabled));
            }
            KeyCommand::SaveMedia => {
                let pending = self.unsaved.lock().take();
                match pending {
                    Some(path) => {
                        self.session.save_media(&path).await?;
                    }
                    None => warn!("No captured media waiting to be saved"),
                }
            }
            KeyCommand::DiscardMedia => {
                let pending = self.unsaved.lock().take();
                match pending {
                    Some(path) => self.session.discard_media(&path).await?,
                    None => warn!("No captured media waiting to be discarded"),
                }
            }
            KeyCommand::Quit => {}
        }
        Ok(())
    }

    fn remember(&self, saved: bool, path: PathBuf) {
        if !saved {
            info!("Captured {} - press y to keep, n to discard", path.display());
            *self.unsaved.lock() = Some(path);
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// Keyboard input handler driving the capture session from a terminal
pub struct KeyboardInputHandler {
    dispatcher: Arc<CommandDispatcher>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    /// Create a new keyboard input handler
    pub fn new(dispatcher: Arc<CommandDispatcher>) -> Self {
        Self {
            dispatcher,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Cancelled when the user quits or `stop` is called
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler - press a to attach, q to quit");

        let dispatcher = Arc::clone(&self.dispatcher);
        let cancellation_token = self.cancellation_token.clone();
        let runtime_handle = Handle::current();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                cancellation_token.cancel();
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        match KeyCommand::from_key(key_event.code) {
                            Some(KeyCommand::Quit) => {
                                info!("Quit key pressed - requesting shutdown");
                                cancellation_token.cancel();
                                break;
                            }
                            Some(command) => {
                                let dispatcher = Arc::clone(&dispatcher);
                                runtime_handle.spawn(async move {
                                    if let Err(e) = dispatcher.execute(command).await {
                                        debug!("{:?} failed: {}", command, e);
                                    }
                                });
                            }
                            None => debug!("Key pressed: {:?}", key_event.code),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to disable raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}
