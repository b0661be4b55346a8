//! Webcam capture via nokhwa.

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
};
use tracing::info;

use crate::foundation::core::{Canvas, FrameRgba};
use crate::foundation::error::{BoothError, BoothResult};
use crate::render::stage::FrameSource;

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;
pub const DEFAULT_FPS: u32 = 30;

/// Live camera frame source. The driver may pick a resolution near the
/// requested one; `resolution()` reports what the stream actually delivers.
pub struct CameraSource {
    cam: Camera,
    canvas: Canvas,
    streaming: bool,
}

impl CameraSource {
    pub fn open(index: u32, width: u32, height: u32, fps: u32) -> BoothResult<Self> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(Resolution::new(width, height), FrameFormat::YUYV, fps),
        ));
        let mut cam = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| BoothError::camera(format!("failed to open camera {index}: {e}")))?;
        cam.open_stream()
            .map_err(|e| BoothError::camera(format!("failed to start camera stream: {e}")))?;

        let actual = cam.resolution();
        let canvas = Canvas::new(actual.width(), actual.height())?;
        info!(
            name = %cam.info().human_name(),
            width = canvas.width,
            height = canvas.height,
            "camera stream opened"
        );
        Ok(Self {
            cam,
            canvas,
            streaming: true,
        })
    }

    pub fn name(&self) -> String {
        self.cam.info().human_name()
    }
}

impl FrameSource for CameraSource {
    fn resolution(&self) -> Canvas {
        self.canvas
    }

    fn next_frame(&mut self) -> BoothResult<FrameRgba> {
        let raw = self
            .cam
            .frame()
            .map_err(|e| BoothError::camera(format!("failed to fetch camera frame: {e}")))?;
        let rgb = raw
            .decode_image::<RgbFormat>()
            .map_err(|e| BoothError::camera(format!("failed to decode camera frame: {e}")))?;

        let (w, h) = rgb.dimensions();
        if w != self.canvas.width || h != self.canvas.height {
            return Err(BoothError::camera(format!(
                "camera delivered {w}x{h}, expected {}x{}",
                self.canvas.width, self.canvas.height
            )));
        }
        FrameRgba::from_rgb8(w, h, rgb.as_raw())
    }

    fn stop(&mut self) {
        if self.streaming {
            self.cam.stop_stream().ok();
            self.streaming = false;
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}
