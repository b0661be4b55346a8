//! Deterministic test-pattern source for headless runs and tests.

use crate::foundation::core::{Canvas, FrameRgba, Rgba8};
use crate::foundation::error::BoothResult;
use crate::render::stage::FrameSource;

/// Produces a slowly drifting gradient; never blocks, never fails.
pub struct SyntheticSource {
    canvas: Canvas,
    frame_idx: u64,
}

impl SyntheticSource {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            frame_idx: 0,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn resolution(&self) -> Canvas {
        self.canvas
    }

    fn next_frame(&mut self) -> BoothResult<FrameRgba> {
        let phase = self.frame_idx as f64 * 0.05;
        self.frame_idx += 1;

        let mut frame = FrameRgba::filled(self.canvas, Rgba8::rgb(0, 0, 0));
        for y in 0..self.canvas.height {
            for x in 0..self.canvas.width {
                let fx = f64::from(x) / f64::from(self.canvas.width);
                let fy = f64::from(y) / f64::from(self.canvas.height);
                let r = (0.5 + 0.5 * (std::f64::consts::TAU * fx + phase).sin()) * 90.0;
                let g = (0.5 + 0.5 * (std::f64::consts::TAU * fy + phase * 0.7).cos()) * 70.0;
                let b = 60.0 + 40.0 * fy;
                frame.put_pixel(x, y, Rgba8::rgb(r as u8, g as u8, b as u8));
            }
        }
        Ok(frame)
    }

    fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_match_the_requested_resolution() {
        let mut src = SyntheticSource::new(Canvas::new(32, 24).unwrap());
        let frame = src.next_frame().unwrap();
        assert_eq!((frame.width, frame.height), (32, 24));
        assert_eq!(frame.data.len(), 32 * 24 * 4);
    }

    #[test]
    fn pattern_animates_between_frames() {
        let mut src = SyntheticSource::new(Canvas::new(32, 24).unwrap());
        let a = src.next_frame().unwrap();
        let b = src.next_frame().unwrap();
        assert_ne!(a, b);
    }
}
