use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver};
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use thiserror::Error;

/// Failures raised while acquiring the capture device.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera permission denied: {0}")]
    Permission(String),
    #[error("camera device unavailable: {0}")]
    Device(String),
    #[error("a camera feed is already active")]
    AlreadyActive,
}

/// One decoded RGBA frame from the capture stream.
pub(crate) struct CameraFrame {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) pixels: Vec<u8>,
}

/// Live capture stream feeding a texture unit.
///
/// The device is opened and read on a worker thread; decoded frames arrive
/// over a small bounded channel and the render tick keeps only the newest
/// one. Dropping the feed stops the stream and joins the worker, which
/// releases the device back to the operating system.
pub(crate) struct CameraFeed {
    frames: Receiver<CameraFrame>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CameraFeed {
    /// Opens the default capture device.
    ///
    /// Blocks until the device either starts streaming or fails; there is no
    /// timeout on a pending user permission prompt.
    pub(crate) fn open() -> Result<Self, CameraError> {
        let (ready_tx, ready_rx) = bounded::<Result<(), CameraError>>(1);
        let (frame_tx, frame_rx) = bounded::<CameraFrame>(2);
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = stop.clone();

        let worker = std::thread::Builder::new()
            .name("camera-feed".into())
            .spawn(move || {
                let requested =
                    RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
                let mut camera = match Camera::new(CameraIndex::Index(0), requested) {
                    Ok(camera) => camera,
                    Err(err) => {
                        let _ = ready_tx.send(Err(classify_nokhwa_error(&err.to_string())));
                        return;
                    }
                };
                if let Err(err) = camera.open_stream() {
                    let _ = ready_tx.send(Err(classify_nokhwa_error(&err.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                while !worker_stop.load(Ordering::Relaxed) {
                    let buffer = match camera.frame() {
                        Ok(buffer) => buffer,
                        Err(err) => {
                            tracing::warn!(error = %err, "camera frame read failed; stopping feed");
                            break;
                        }
                    };
                    match buffer.decode_image::<RgbAFormat>() {
                        Ok(image) => {
                            let frame = CameraFrame {
                                width: image.width(),
                                height: image.height(),
                                pixels: image.into_raw(),
                            };
                            // Drop the frame when the consumer is behind; the
                            // next one supersedes it anyway.
                            let _ = frame_tx.try_send(frame);
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "camera frame decode failed; skipping");
                        }
                    }
                }
                if let Err(err) = camera.stop_stream() {
                    tracing::debug!(error = %err, "camera stream stop reported an error");
                }
            })
            .map_err(|err| CameraError::Device(format!("failed to spawn capture thread: {err}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                frames: frame_rx,
                stop,
                worker: Some(worker),
            }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(CameraError::Device("capture thread exited early".into())),
        }
    }

    /// Drains the channel and returns only the newest frame, if any arrived.
    pub(crate) fn latest_frame(&self) -> Option<CameraFrame> {
        let mut latest = None;
        while let Ok(frame) = self.frames.try_recv() {
            latest = Some(frame);
        }
        latest
    }
}

impl Drop for CameraFeed {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("camera capture thread panicked during shutdown");
            }
        }
    }
}

/// Sorts a backend error into the permission/device taxonomy.
///
/// nokhwa reports both through the same error type, so the split is textual.
fn classify_nokhwa_error(message: &str) -> CameraError {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("access") {
        CameraError::Permission(message.to_string())
    } else {
        CameraError::Device(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_failures_classify_separately() {
        assert!(matches!(
            classify_nokhwa_error("Permission denied by user"),
            CameraError::Permission(_)
        ));
        assert!(matches!(
            classify_nokhwa_error("no capture device at index 0"),
            CameraError::Device(_)
        ));
    }
}
