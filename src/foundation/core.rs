use crate::foundation::error::{BoothError, BoothResult};

pub use kurbo::{Point, Rect, Vec2};

/// Output surface dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> BoothResult<Self> {
        if width == 0 || height == 0 {
            return Err(BoothError::validation("canvas width/height must be non-zero"));
        }
        Ok(Self { width, height })
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// One video frame: straight-alpha RGBA8, row-major, `width * height * 4` bytes.
///
/// Camera frames arrive opaque; effects composite over them in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgba {
    pub fn filled(canvas: Canvas, color: Rgba8) -> Self {
        let mut data = vec![0u8; canvas.pixel_count() * 4];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
        }
    }

    /// Build from a packed RGB8 buffer (the camera's native decode format).
    pub fn from_rgb8(width: u32, height: u32, rgb: &[u8]) -> BoothResult<Self> {
        let expected = width as usize * height as usize * 3;
        if rgb.len() != expected {
            return Err(BoothError::validation(format!(
                "rgb buffer size mismatch: got {}, expected {expected}",
                rgb.len()
            )));
        }
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for px in rgb.chunks_exact(3) {
            data.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Rgba8 {
            r: self.data[i],
            g: self.data[i + 1],
            b: self.data[i + 2],
            a: self.data[i + 3],
        }
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, c: Rgba8) {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data[i] = c.r;
        self.data[i + 1] = c.g;
        self.data[i + 2] = c.b;
        self.data[i + 3] = c.a;
    }
}

/// Coordinate space a set of landmark points lives in.
///
/// Detectors run on the raw camera frame and return [`CameraSpace`] points;
/// the stage converts them into [`CanvasSpace`] for the (possibly mirrored)
/// presentation. Tagging geometry with its space makes a missing or doubled
/// flip a type error instead of a half-off-screen overlay.
pub trait CoordSpace: sealed::Sealed + Copy + 'static {
    const NAME: &'static str;
}

/// Space of the frame as presented on the canvas (post-mirror when enabled).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CanvasSpace;

/// Space of the raw, un-mirrored camera frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CameraSpace;

impl CoordSpace for CanvasSpace {
    const NAME: &'static str = "canvas";
}

impl CoordSpace for CameraSpace {
    const NAME: &'static str = "camera";
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::CanvasSpace {}
    impl Sealed for super::CameraSpace {}
}
