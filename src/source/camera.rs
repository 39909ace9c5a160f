use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender, bounded};
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraIndex, CameraInfo, FrameFormat, RequestedFormat, RequestedFormatType,
    },
};

use super::{CameraProvider, LiveCapture, rgba_converter};
use crate::{error::DetectError, types::Frame};

// Prefer pixel formats that are widely supported on macOS (the built-in cameras
// often reject YUYV even though Nokhwa reports it).
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

const FRONT_FACING_HINTS: &[&str] = &["front", "user", "facetime", "integrated", "built-in"];

const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(2);
const READ_RETRY_BASE: Duration = Duration::from_millis(10);
const READ_RETRY_MAX: Duration = Duration::from_millis(500);

/// Back off after consecutive frame read failures, doubling up to a cap.
fn read_retry_delay(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(6);
    (READ_RETRY_BASE * (1u32 << shift)).min(READ_RETRY_MAX)
}

fn requested_formats() -> [RequestedFormat<'static>; 3] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

#[derive(Clone, Debug)]
pub struct CameraDevice {
    pub index: CameraIndex,
    pub label: String,
}

pub fn available_cameras() -> Result<Vec<CameraDevice>> {
    let cameras = query(ApiBackend::Auto)?;
    Ok(cameras
        .into_iter()
        .map(|info: CameraInfo| CameraDevice {
            index: info.index().clone(),
            label: info.human_name(),
        })
        .collect())
}

/// Pick a user-facing camera when the name gives it away, otherwise the first.
pub fn preferred_camera(devices: &[CameraDevice]) -> Option<&CameraDevice> {
    devices
        .iter()
        .find(|device| {
            let label = device.label.to_ascii_lowercase();
            FRONT_FACING_HINTS.iter().any(|hint| label.contains(hint))
        })
        .or_else(|| devices.first())
}

fn build_camera(index: CameraIndex) -> Result<Camera> {
    let mut last_err = None;

    for requested in requested_formats() {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
}

#[derive(Debug)]
struct CameraStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CameraStream {
    fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn start_camera_stream(index: CameraIndex, frame_tx: Sender<Frame>) -> Result<CameraStream> {
    // Fail fast before spawning the capture thread.
    drop(build_camera(index.clone())?);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        let mut camera = match build_camera(index) {
            Ok(cam) => cam,
            Err(err) => {
                log::error!("failed to open camera: {err:?}");
                return;
            }
        };

        let mut failures: u32 = 0;
        while !stop_flag.load(Ordering::Relaxed) {
            let frame_start = Instant::now();
            let buffer = match camera.frame() {
                Ok(buffer) => {
                    failures = 0;
                    buffer
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    // Log 1st, 2nd, 4th, 8th... failure so an unplugged device does not flood.
                    if failures.is_power_of_two() {
                        log::warn!(
                            "camera frame read failed {failures}x (after {:?}): {err:?}",
                            frame_start.elapsed()
                        );
                    }
                    thread::sleep(read_retry_delay(failures));
                    continue;
                }
            };

            match rgba_converter::convert_camera_frame(&buffer) {
                // Drop when nobody is sampling; the next snapshot drains stale frames anyway.
                Ok(frame) => {
                    let _ = frame_tx.try_send(frame);
                }
                Err(err) => log::warn!("failed to decode camera frame {err:?}"),
            }
        }

        if let Err(err) = camera.stop_stream() {
            log::warn!("failed to stop camera stream: {err:?}");
        }
    });

    Ok(CameraStream {
        stop,
        handle: Some(handle),
    })
}

#[derive(Default)]
pub struct NokhwaCameraProvider;

impl CameraProvider for NokhwaCameraProvider {
    fn open(&mut self) -> Result<Box<dyn LiveCapture>, DetectError> {
        let devices = available_cameras()
            .map_err(|err| DetectError::DeviceUnavailable(format!("{err:#}")))?;
        let device = preferred_camera(&devices)
            .ok_or_else(|| DetectError::DeviceUnavailable("no camera found".to_string()))?;

        log::info!("opening camera {}", device.label);
        let capture = NokhwaCapture::start(device)
            .map_err(|err| DetectError::DeviceUnavailable(format!("{err:#}")))?;
        Ok(Box::new(capture))
    }
}

struct NokhwaCapture {
    label: String,
    stream: Mutex<Option<CameraStream>>,
    frame_rx: Receiver<Frame>,
}

impl NokhwaCapture {
    fn start(device: &CameraDevice) -> Result<Self> {
        let (frame_tx, frame_rx) = bounded(2);
        let stream = start_camera_stream(device.index.clone(), frame_tx)
            .with_context(|| format!("failed to start camera {}", device.label))?;
        Ok(Self {
            label: device.label.clone(),
            stream: Mutex::new(Some(stream)),
            frame_rx,
        })
    }
}

impl LiveCapture for NokhwaCapture {
    fn snapshot(&self) -> Result<Frame> {
        while self.frame_rx.try_recv().is_ok() {}
        self.frame_rx
            .recv_timeout(SNAPSHOT_TIMEOUT)
            .with_context(|| format!("no frame from {} within {SNAPSHOT_TIMEOUT:?}", self.label))
    }

    fn release(&self) {
        let stream = match self.stream.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(stream) = stream {
            stream.stop();
            log::info!("camera {} released", self.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(idx: u32, label: &str) -> CameraDevice {
        CameraDevice {
            index: CameraIndex::Index(idx),
            label: label.to_string(),
        }
    }

    #[test]
    fn front_facing_name_is_preferred() {
        let devices = [device(0, "USB Capture"), device(1, "FaceTime HD Camera")];
        assert_eq!(preferred_camera(&devices).unwrap().label, "FaceTime HD Camera");
    }

    #[test]
    fn read_failures_back_off_to_a_cap() {
        assert_eq!(read_retry_delay(1), Duration::from_millis(10));
        assert_eq!(read_retry_delay(2), Duration::from_millis(20));
        assert_eq!(read_retry_delay(5), Duration::from_millis(160));
        assert_eq!(read_retry_delay(7), Duration::from_millis(500));
        assert_eq!(read_retry_delay(u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn falls_back_to_first_device() {
        let devices = [device(0, "USB Capture"), device(1, "Rear Camera")];
        assert_eq!(preferred_camera(&devices).unwrap().label, "USB Capture");
        assert!(preferred_camera(&[]).is_none());
    }
}
