use super::capture::CaptureSynchronizer;
use super::state::{admit, Admission, Command, SessionState};
use super::zoom::{ZoomController, ZoomTarget};
use crate::config::CameraConfig;
use crate::device::{
    CameraHandle, CameraModule, PhotoParams, PreviewParams, RecordingProfile, RecordingRequest,
    Surface, ZoomCallback,
};
use crate::error::{MediaError, SessionError};
use crate::events::{CaptureMode, CaptureOutcome, EventBus, SessionEvent, StatusSignal};
use crate::location::{LocationFix, LocationProvider};
use crate::media::{MediaKind, MediaStore};
use crate::settings::{Settings, SettingsStore};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Media produced by a finished photo or video capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedMedia {
    pub kind: MediaKind,
    pub path: PathBuf,
    /// Already moved into the storage folder by auto-save
    pub saved: bool,
}

struct SessionCore {
    state: SessionState,
    device: Option<Box<dyn CameraHandle>>,
    surface: Option<Surface>,
    zoom: ZoomController,
    /// Cancelled when the current surface is detached
    attachment: CancellationToken,
}

impl Drop for SessionCore {
    fn drop(&mut self) {
        self.attachment.cancel();
        if let Some(mut device) = self.device.take() {
            device.release();
        }
    }
}

pub(super) struct SessionShared {
    core: Mutex<SessionCore>,
    epoch: Arc<AtomicU64>,
    camera: Arc<dyn CameraModule>,
    camera_config: CameraConfig,
    settings: SettingsStore,
    media: MediaStore,
    location: Arc<dyn LocationProvider>,
    location_timeout: Duration,
    synchronizer: CaptureSynchronizer,
    events: EventBus,
}

impl SessionShared {
    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn transition(&self, core: &mut SessionCore, to: SessionState) {
        let from = core.state;
        if from == to {
            return;
        }
        core.state = to;
        info!("Session state {} -> {}", from, to);
        self.events.publish(SessionEvent::StateChanged { from, to });
    }

    /// One step of a smooth zoom ramp, delivered on the device callback thread
    fn on_zoom_step(&self, epoch: u64, level: u32, stopped: bool) {
        if self.current_epoch() != epoch {
            trace!("Discarding zoom callback from superseded epoch {}", epoch);
            return;
        }

        let mut guard = self.core.lock();
        let core = &mut *guard;
        // detach bumps the epoch under this lock, so this check is authoritative
        if self.current_epoch() != epoch {
            trace!("Discarding zoom callback from superseded epoch {}", epoch);
            return;
        }
        let Some(device) = core.device.as_ref() else {
            return;
        };

        let level = core.zoom.record_step(level, device.max_zoom());
        self.events.publish(SessionEvent::ZoomChanged {
            level,
            is_final: stopped,
        });
    }
}

/// Owns the camera for one UI surface and funnels every command through
/// the session state machine.
///
/// Cloning yields another handle onto the same session, so a worker task can
/// wait for a photo while the UI thread keeps issuing commands.
#[derive(Clone)]
pub struct CaptureSession {
    shared: Arc<SessionShared>,
}

impl CaptureSession {
    pub(super) fn new(
        camera: Arc<dyn CameraModule>,
        camera_config: CameraConfig,
        settings: SettingsStore,
        media: MediaStore,
        location: Arc<dyn LocationProvider>,
        location_timeout: Duration,
        events: EventBus,
    ) -> Self {
        let epoch = Arc::new(AtomicU64::new(0));
        let synchronizer =
            CaptureSynchronizer::new(camera_config.capture_timeout(), Arc::clone(&epoch));

        Self {
            shared: Arc::new(SessionShared {
                core: Mutex::new(SessionCore {
                    state: SessionState::Idle,
                    device: None,
                    surface: None,
                    zoom: ZoomController::new(),
                    attachment: CancellationToken::new(),
                }),
                epoch,
                camera,
                camera_config,
                settings,
                media,
                location,
                location_timeout,
                synchronizer,
                events,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.core.lock().state
    }

    pub fn current_zoom(&self) -> u32 {
        self.shared.core.lock().zoom.current()
    }

    pub fn pending_zoom(&self) -> Option<ZoomTarget> {
        self.shared.core.lock().zoom.pending()
    }

    pub fn is_device_open(&self) -> bool {
        self.shared.core.lock().device.is_some()
    }

    pub fn epoch(&self) -> u64 {
        self.shared.current_epoch()
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.shared.settings
    }

    pub fn media(&self) -> &MediaStore {
        &self.shared.media
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Open the camera on `surface`, start the preview and apply the zoom policy
    pub fn attach_surface(&self, surface: Surface) -> Result<(), SessionError> {
        let settings = self.shared.settings.snapshot();
        let mut guard = self.shared.core.lock();
        let core = &mut *guard;

        if let Err(e) = admit(Command::AttachSurface, core.state) {
            return self.reject(e);
        }

        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "Attaching surface {} ({}x{}), epoch {}",
            surface.id, surface.width, surface.height, epoch
        );

        let mut device = match self.shared.camera.open() {
            Ok(device) => device,
            Err(e) => {
                error!("Failed to open camera '{}': {}", self.shared.camera.name(), e);
                return self.reject(SessionError::DeviceUnavailable { source: e });
            }
        };

        let preview = PreviewParams {
            resolution: self.shared.camera_config.preview_resolution,
            fps: self.shared.camera_config.preview_fps,
        };
        if let Err(e) = device
            .configure_preview(&preview)
            .and_then(|_| device.start_preview(&surface))
        {
            error!("Failed to start preview: {}", e);
            device.release();
            return self.reject(SessionError::DeviceUnavailable { source: e });
        }

        core.zoom.sync_with_device(device.as_ref());
        core.device = Some(device);
        core.surface = Some(surface);
        core.attachment = CancellationToken::new();
        self.shared.transition(core, SessionState::Previewing);

        let target = core.zoom.take_pending().or_else(|| {
            if settings.max_zoom_mode {
                Some(ZoomTarget::Max)
            } else {
                None
            }
        });
        if let Some(target) = target {
            debug!("Replaying zoom {:?} after preview start", target);
            self.apply_zoom(core, target, settings.smooth_zoom_enabled, epoch);
        }

        self.shared.events.publish(SessionEvent::ModeChanged {
            mode: CaptureMode::Photo,
        });
        Ok(())
    }

    /// Release the camera unconditionally and return to `Idle`. Never waits
    /// for in-flight captures; their late results are dropped.
    pub fn detach_surface(&self) {
        let mut guard = self.shared.core.lock();
        let core = &mut *guard;

        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        core.attachment.cancel();

        if let Some(mut device) = core.device.take() {
            if core.state == SessionState::RecordingVideo {
                warn!("Surface detached while recording, recording is abandoned");
            }
            device.release();
        }
        core.surface = None;
        core.zoom.reset();
        self.shared.transition(core, SessionState::Idle);
        info!("Surface detached, epoch {}", epoch);
    }

    /// Zoom to `level`, clamped to the device range
    pub fn request_zoom(&self, level: i64) -> Result<(), SessionError> {
        self.zoom_to(ZoomTarget::Level(level))
    }

    pub fn request_max_zoom(&self) -> Result<(), SessionError> {
        self.zoom_to(ZoomTarget::Max)
    }

    pub fn reset_zoom(&self) -> Result<(), SessionError> {
        self.zoom_to(ZoomTarget::Level(0))
    }

    pub fn zoom_in(&self) -> Result<(), SessionError> {
        let step = self.shared.camera_config.zoom_step as i64;
        self.zoom_by(step)
    }

    pub fn zoom_out(&self) -> Result<(), SessionError> {
        let step = self.shared.camera_config.zoom_step as i64;
        self.zoom_by(-step)
    }

    /// Flip max-zoom mode and zoom to max or back to 0 accordingly
    pub fn toggle_max_zoom_mode(&self) -> Result<bool, SessionError> {
        let enabled = self.shared.settings.toggle_max_zoom_mode();
        if enabled {
            self.request_max_zoom()?;
        } else {
            self.reset_zoom()?;
        }
        Ok(enabled)
    }

    /// Flip smooth zoom; takes effect on the next zoom request
    pub fn toggle_smooth_zoom_mode(&self) -> bool {
        self.shared.settings.toggle_smooth_zoom()
    }

    fn zoom_to(&self, target: ZoomTarget) -> Result<(), SessionError> {
        self.zoom_with(|_| target)
    }

    /// Step relative to the level the previous request is heading for
    fn zoom_by(&self, step: i64) -> Result<(), SessionError> {
        self.zoom_with(|zoom| ZoomTarget::Level(zoom.reference_level() + step))
    }

    /// Resolve and apply a zoom request within one critical section, so
    /// concurrent relative requests never start from the same level
    fn zoom_with(
        &self,
        target: impl FnOnce(&ZoomController) -> ZoomTarget,
    ) -> Result<(), SessionError> {
        let smooth = self.shared.settings.snapshot().smooth_zoom_enabled;
        let mut guard = self.shared.core.lock();
        let core = &mut *guard;
        let target = target(&core.zoom);

        match admit(Command::Zoom, core.state) {
            Ok(Admission::Run) => {
                let epoch = self.shared.current_epoch();
                self.apply_zoom(core, target, smooth, epoch);
                Ok(())
            }
            Ok(Admission::Defer) => {
                core.zoom.defer(target);
                Ok(())
            }
            Err(e) => self.reject(e),
        }
    }

    fn apply_zoom(&self, core: &mut SessionCore, target: ZoomTarget, smooth: bool, epoch: u64) {
        let Some(device) = core.device.as_mut() else {
            core.zoom.defer(target);
            return;
        };

        let shared: Weak<SessionShared> = Arc::downgrade(&self.shared);
        let on_step: ZoomCallback = Box::new(move |level, stopped| {
            if let Some(shared) = shared.upgrade() {
                shared.on_zoom_step(epoch, level, stopped);
            }
        });

        core.zoom
            .apply(device.as_mut(), target, smooth, on_step, &self.shared.events);
    }

    /// Take a photo and wait for the camera to deliver it.
    ///
    /// The wait is bounded by the capture timeout. Whatever the outcome the
    /// session is back in `Previewing` afterwards, unless the surface was
    /// detached meanwhile.
    pub async fn take_photo(&self) -> Result<CapturedMedia, SessionError> {
        let settings = self.shared.settings.snapshot();
        self.precheck(Command::TakePhoto)?;

        let location = self.locate(&settings).await;
        let temp_path = self.allocate(MediaKind::Photo).await?;

        let (epoch, ticket) = {
            let mut guard = self.shared.core.lock();
            let core = &mut *guard;

            if let Err(e) = admit(Command::TakePhoto, core.state) {
                return self.reject(e);
            }
            let epoch = self.shared.current_epoch();

            let mut params = PhotoParams::for_quality(
                settings.quality,
                self.shared.camera_config.high_photo_resolution,
                self.shared.camera_config.low_photo_resolution,
            );
            params.location = location;

            let (callback, ticket) = self
                .shared
                .synchronizer
                .arm(epoch, core.attachment.child_token());

            let Some(device) = core.device.as_mut() else {
                return self.reject(SessionError::unsupported(
                    Command::TakePhoto.name(),
                    core.state,
                ));
            };
            if let Err(e) = device.capture_photo(&params, callback) {
                error!("Camera rejected photo capture: {}", e);
                self.resume_preview(core);
                return self.reject(SessionError::DeviceUnavailable { source: e });
            }

            info!(
                "Taking photo {}x{} (geotag: {})",
                params.resolution.0,
                params.resolution.1,
                params.location.is_some()
            );
            self.shared.transition(core, SessionState::CapturingPhoto);
            (epoch, ticket)
        };

        let result = match self.shared.synchronizer.wait(ticket).await {
            Ok(bytes) => match self.shared.media.persist(&bytes, &temp_path).await {
                Ok(()) => Ok(temp_path.clone()),
                Err(e) => Err(SessionError::IoWrite {
                    path: temp_path.clone(),
                    source: e,
                }),
            },
            Err(e) => Err(e),
        };

        let detached = {
            let mut guard = self.shared.core.lock();
            let core = &mut *guard;
            if self.shared.current_epoch() != epoch {
                true
            } else {
                self.resume_preview(core);
                self.shared.transition(core, SessionState::Previewing);
                false
            }
        };

        if detached {
            debug!("Photo finished after detach, dropping result");
            if result.is_ok() {
                self.remove_leftover(&temp_path).await;
            }
            return Err(SessionError::SessionDetached);
        }

        self.finish_capture(MediaKind::Photo, result, &settings)
            .await
    }

    /// Run `take_photo` on a worker task so the calling thread never waits.
    /// The outcome is also published as `CaptureCompleted`.
    pub fn spawn_take_photo(&self) -> JoinHandle<Result<CapturedMedia, SessionError>> {
        let session = self.clone();
        tokio::spawn(async move { session.take_photo().await })
    }

    /// Hand the camera to the recorder and start recording
    pub async fn start_video(&self) -> Result<(), SessionError> {
        let settings = self.shared.settings.snapshot();
        self.precheck(Command::StartVideo)?;

        let location = self.locate(&settings).await;
        let request = RecordingRequest {
            profile: RecordingProfile::for_quality(settings.quality),
            output_path: self.allocate(MediaKind::Video).await?,
            location,
        };

        let started = {
            let mut guard = self.shared.core.lock();
            let core = &mut *guard;
            self.begin_recording(core, &request)
        };

        if let Err(e) = started {
            self.remove_leftover(&request.output_path).await;
            return self.reject(e);
        }

        info!(
            "Recording {}x{} to {}",
            request.profile.resolution.0,
            request.profile.resolution.1,
            request.output_path.display()
        );
        self.shared.events.publish(SessionEvent::ModeChanged {
            mode: CaptureMode::Video,
        });
        self.signal(StatusSignal::StartVideo);
        Ok(())
    }

    fn begin_recording(
        &self,
        core: &mut SessionCore,
        request: &RecordingRequest,
    ) -> Result<(), SessionError> {
        admit(Command::StartVideo, core.state)?;

        let (Some(device), Some(surface)) = (core.device.as_mut(), core.surface.as_ref()) else {
            return Err(SessionError::unsupported(
                Command::StartVideo.name(),
                core.state,
            ));
        };

        if let Err(e) = device.start_recording(surface, request) {
            error!("Failed to start recording: {}", e);
            self.resume_preview(core);
            return Err(SessionError::RecorderPrepare { source: e });
        }

        self.shared.transition(core, SessionState::RecordingVideo);
        Ok(())
    }

    /// Stop the recorder, restart the preview and hand back the video
    pub async fn stop_video(&self) -> Result<CapturedMedia, SessionError> {
        let settings = self.shared.settings.snapshot();

        let result = {
            let mut guard = self.shared.core.lock();
            let core = &mut *guard;

            if let Err(e) = admit(Command::StopVideo, core.state) {
                return self.reject(e);
            }
            let Some(device) = core.device.as_mut() else {
                return self.reject(SessionError::unsupported(
                    Command::StopVideo.name(),
                    core.state,
                ));
            };

            let result = device
                .stop_recording()
                .map_err(|e| SessionError::RecorderPrepare { source: e });
            self.resume_preview(core);
            self.shared.transition(core, SessionState::Previewing);
            self.shared.events.publish(SessionEvent::ModeChanged {
                mode: CaptureMode::Photo,
            });
            result
        };

        self.signal(StatusSignal::StopVideo);
        self.finish_capture(MediaKind::Video, result, &settings)
            .await
    }

    /// Move captured media into the storage folder
    pub async fn save_media(&self, temp: &Path) -> Result<PathBuf, MediaError> {
        match self.shared.media.save(temp).await {
            Ok(path) => {
                self.shared.events.publish(SessionEvent::MediaSaved {
                    path: path.clone(),
                    timestamp: SystemTime::now(),
                });
                self.signal(StatusSignal::Ok);
                Ok(path)
            }
            Err(e) => {
                error!("Failed to save media: {}", e);
                self.signal(StatusSignal::Error);
                Err(e)
            }
        }
    }

    /// Delete captured media that the wearer did not keep
    pub async fn discard_media(&self, temp: &Path) -> Result<(), MediaError> {
        self.shared.media.discard(temp).await?;
        self.shared.events.publish(SessionEvent::MediaDiscarded {
            path: temp.to_path_buf(),
        });
        self.signal(StatusSignal::Canceled);
        Ok(())
    }

    async fn finish_capture(
        &self,
        kind: MediaKind,
        result: Result<PathBuf, SessionError>,
        settings: &Settings,
    ) -> Result<CapturedMedia, SessionError> {
        let path = match result {
            Ok(path) => path,
            Err(e) => {
                self.shared.events.publish(SessionEvent::CaptureCompleted {
                    kind,
                    outcome: CaptureOutcome::Failed {
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    },
                });
                return self.reject(e);
            }
        };

        self.shared.events.publish(SessionEvent::CaptureCompleted {
            kind,
            outcome: CaptureOutcome::Captured { path: path.clone() },
        });

        if settings.auto_save {
            if let Ok(saved) = self.save_media(&path).await {
                return Ok(CapturedMedia {
                    kind,
                    path: saved,
                    saved: true,
                });
            }
        } else {
            self.signal(match kind {
                MediaKind::Photo => StatusSignal::GotPicture,
                MediaKind::Video => StatusSignal::GotVideo,
            });
        }

        Ok(CapturedMedia {
            kind,
            path,
            saved: false,
        })
    }

    async fn allocate(&self, kind: MediaKind) -> Result<PathBuf, SessionError> {
        match self.shared.media.allocate_temp_path(kind).await {
            Ok(path) => Ok(path),
            Err(e) => self.reject(SessionError::IoWrite {
                path: self.shared.media.tmp_folder().to_path_buf(),
                source: e,
            }),
        }
    }

    /// Delete a temp file whose capture was abandoned
    async fn remove_leftover(&self, path: &Path) {
        if let Err(e) = self.shared.media.discard(path).await {
            warn!("Failed to remove leftover media: {}", e);
        }
    }

    fn precheck(&self, command: Command) -> Result<(), SessionError> {
        let state = self.state();
        match admit(command, state) {
            Ok(_) => Ok(()),
            Err(e) => self.reject(e),
        }
    }

    async fn locate(&self, settings: &Settings) -> Option<LocationFix> {
        if !settings.geotag_enabled {
            return None;
        }

        match tokio::time::timeout(
            self.shared.location_timeout,
            self.shared.location.best_effort_fix(),
        )
        .await
        {
            Ok(Some(fix)) => {
                debug!("Geotagging with fix from '{}'", fix.provider);
                Some(fix)
            }
            Ok(None) => {
                warn!("Can't get location, media will not be geotagged");
                None
            }
            Err(_) => {
                warn!(
                    "Location lookup exceeded {:?}, media will not be geotagged",
                    self.shared.location_timeout
                );
                None
            }
        }
    }

    fn resume_preview(&self, core: &mut SessionCore) {
        if let (Some(device), Some(surface)) = (core.device.as_mut(), core.surface.as_ref()) {
            if let Err(e) = device.start_preview(surface) {
                error!("Failed to restart preview: {}", e);
            }
        }
    }

    fn signal(&self, signal: StatusSignal) {
        self.shared.events.publish(SessionEvent::Status { signal });
    }

    fn reject<T>(&self, err: SessionError) -> Result<T, SessionError> {
        match &err {
            SessionError::UnsupportedInCurrentMode { .. } => debug!("{}", err),
            _ => warn!("{}", err),
        }
        self.signal(err.status_signal());
        Err(err)
    }
}
