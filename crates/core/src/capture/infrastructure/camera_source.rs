use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::frame::Frame;

/// Live frames from a local camera.
pub struct CameraSource {
    camera: Option<Camera>,
    frame_index: usize,
}

// Safety: the camera handle is owned by one pipeline thread at a time and
// never accessed concurrently.
unsafe impl Send for CameraSource {}

impl CameraSource {
    pub fn open(device: u32) -> Result<Self, CaptureError> {
        nokhwa::nokhwa_initialize(|granted| {
            log::debug!("camera access granted: {granted}");
        });

        let format =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(device), format)
            .map_err(|e| CaptureError::Device(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        let resolution = camera.resolution();
        log::info!(
            "camera {device} streaming at {}x{}",
            resolution.width(),
            resolution.height()
        );

        Ok(Self {
            camera: Some(camera),
            frame_index: 0,
        })
    }
}

impl FrameSource for CameraSource {
    fn current_frame(&mut self) -> Result<Frame, CaptureError> {
        let camera = self.camera.as_mut().ok_or(CaptureError::Closed)?;
        let buffer = camera
            .frame()
            .map_err(|e| CaptureError::Device(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::Decode(e.to_string()))?;

        let (width, height) = decoded.dimensions();
        let frame = Frame::new(decoded.into_raw(), width, height, 3, self.frame_index);
        self.frame_index += 1;
        Ok(frame)
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::warn!("failed to stop camera stream: {e}");
            }
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.close();
    }
}
