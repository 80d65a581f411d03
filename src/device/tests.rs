use super::*;
use crate::error::DeviceError;
use crate::settings::Quality;
use std::sync::mpsc;
use std::time::Duration;

fn surface() -> Surface {
    Surface::new(1, 640, 360)
}

#[test]
fn test_open_and_release_is_idempotent() {
    let camera = SimulatedCamera::default();

    let mut handle = camera.open().unwrap();
    assert!(camera.stats().is_open);

    handle.release();
    handle.release();
    drop(handle);

    let stats = camera.stats();
    assert_eq!(stats.opens, 1);
    assert_eq!(stats.releases, 1);
    assert!(!stats.is_open);
}

#[test]
fn test_open_fails_when_unavailable() {
    let camera = SimulatedCamera::new(SimulatedCameraConfig {
        fail_open: true,
        ..Default::default()
    });

    match camera.open() {
        Err(DeviceError::OpenFailed { .. }) => {}
        Err(e) => panic!("Unexpected error: {}", e),
        Ok(_) => panic!("Expected open failure"),
    }
}

#[test]
fn test_second_open_is_rejected() {
    let camera = SimulatedCamera::default();
    let _first = camera.open().unwrap();
    assert!(camera.open().is_err());
}

#[test]
fn test_smooth_zoom_reports_every_step() {
    let camera = SimulatedCamera::new(SimulatedCameraConfig {
        max_zoom: 30,
        ramp_step: 10,
        ramp_interval: Duration::from_millis(1),
        ..Default::default()
    });
    let mut handle = camera.open().unwrap();

    let (tx, rx) = mpsc::channel();
    handle
        .start_smooth_zoom(
            30,
            Box::new(move |level, stopped| {
                let _ = tx.send((level, stopped));
            }),
        )
        .unwrap();

    let steps: Vec<(u32, bool)> = rx.iter().take(3).collect();
    assert_eq!(steps, vec![(10, false), (20, false), (30, true)]);
    assert_eq!(handle.zoom(), 30);
}

#[test]
fn test_capture_requires_preview() {
    let camera = SimulatedCamera::default();
    let mut handle = camera.open().unwrap();
    let params = PhotoParams::for_quality(Quality::High, (2592, 1944), (1280, 960));

    assert!(handle.capture_photo(&params, Box::new(|_| {})).is_err());

    handle.start_preview(&surface()).unwrap();
    let (tx, rx) = mpsc::channel();
    handle
        .capture_photo(
            &params,
            Box::new(move |bytes| {
                let _ = tx.send(bytes);
            }),
        )
        .unwrap();

    let bytes = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    assert!(!camera.stats().preview_active);
}

#[test]
fn test_recording_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let camera = SimulatedCamera::default();
    let mut handle = camera.open().unwrap();
    handle.start_preview(&surface()).unwrap();

    let request = RecordingRequest {
        profile: RecordingProfile::for_quality(Quality::Low),
        output_path: dir.path().join("clip.mp4"),
        location: None,
    };
    handle.start_recording(&surface(), &request).unwrap();
    assert!(camera.stats().recording);

    let path = handle.stop_recording().unwrap();
    assert_eq!(path, request.output_path);
    assert!(path.exists());
    assert!(handle.stop_recording().is_err());
}

#[test]
fn test_quality_profiles() {
    let high = PhotoParams::for_quality(Quality::High, (2592, 1944), (1280, 960));
    let low = PhotoParams::for_quality(Quality::Low, (2592, 1944), (1280, 960));
    assert_eq!(high.resolution, (2592, 1944));
    assert_eq!(low.resolution, (1280, 960));
    assert!(high.jpeg_quality > low.jpeg_quality);

    assert_eq!(RecordingProfile::for_quality(Quality::High).resolution, (1280, 720));
    assert_eq!(RecordingProfile::for_quality(Quality::Low).resolution, (640, 480));
}
