use std::f64::consts::TAU;

use kurbo::Point;

use crate::detect::landmarks::{FaceLandmarks, HandLandmarks, Handedness, topology};
use crate::foundation::core::{CameraSpace, Canvas, FrameRgba};
use crate::foundation::error::BoothResult;

/// A face landmark model. Implementations own their inference state and are
/// driven from a dedicated worker, so `detect` may block.
///
/// Detectors always see the raw camera frame, so keypoints come back tagged
/// [`CameraSpace`]; the stage converts them into the presented space.
pub trait FaceDetector: Send {
    fn name(&self) -> &'static str;

    /// Zero or more detected faces. An empty vec is a normal "no face"
    /// result, not an error.
    fn detect(&mut self, frame: &FrameRgba) -> BoothResult<Vec<FaceLandmarks<CameraSpace>>>;
}

/// A hand landmark model; same contract as [`FaceDetector`].
pub trait HandDetector: Send {
    fn name(&self) -> &'static str;

    fn detect(&mut self, frame: &FrameRgba) -> BoothResult<Vec<HandLandmarks<CameraSpace>>>;
}

/// Build a full synthetic face keypoint set centered in `canvas`.
///
/// `phase` drifts the face slowly so overlays visibly track; `blinking`
/// collapses the eyelid separation below any sane blink threshold.
pub fn synthetic_face_points(canvas: Canvas, phase: f64, blinking: bool) -> Vec<Point> {
    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    let cx = w / 2.0 + (phase * 0.37).sin() * w * 0.03;
    let cy = h / 2.0 + (phase * 0.23).cos() * h * 0.02;
    let rx = w * 0.15;
    let ry = h * 0.22;

    let mut pts = Vec::with_capacity(topology::FACE_POINTS);

    // Outline ring.
    for i in 0..topology::OUTLINE_LEN {
        let a = TAU * i as f64 / topology::OUTLINE_LEN as f64;
        pts.push(Point::new(cx + rx * a.cos(), cy + ry * a.sin()));
    }

    let eye_dy = -ry * 0.25;
    let eye_dx = rx * 0.45;
    let left_eye = Point::new(cx - eye_dx, cy + eye_dy);
    let right_eye = Point::new(cx + eye_dx, cy + eye_dy);
    let half_open = if blinking { 1.0 } else { 4.0 };

    pts.push(left_eye);
    pts.push(right_eye);
    pts.push(Point::new(left_eye.x, left_eye.y - half_open));
    pts.push(Point::new(left_eye.x, left_eye.y + half_open));
    pts.push(Point::new(right_eye.x, right_eye.y - half_open));
    pts.push(Point::new(right_eye.x, right_eye.y + half_open));

    // Forehead.
    pts.push(Point::new(cx, cy - ry * 0.85));

    // Lip rings.
    let lip_center = Point::new(cx, cy + ry * 0.5);
    for i in 0..(topology::LIP_OUTER_END - topology::LIP_OUTER_START) {
        let a = TAU * i as f64 / 12.0;
        pts.push(Point::new(
            lip_center.x + rx * 0.5 * a.cos(),
            lip_center.y + ry * 0.18 * a.sin(),
        ));
    }
    for i in 0..(topology::LIP_INNER_END - topology::LIP_INNER_START) {
        let a = TAU * i as f64 / 8.0;
        pts.push(Point::new(
            lip_center.x + rx * 0.3 * a.cos(),
            lip_center.y + ry * 0.1 * a.sin(),
        ));
    }

    debug_assert_eq!(pts.len(), topology::FACE_POINTS);
    pts
}

/// Deterministic stand-in face model for demos and tests: a drifting face
/// that blinks on a fixed cadence. No model file, no inference runtime.
#[derive(Debug)]
pub struct SyntheticFaceDetector {
    calls: u64,
    blink_every: u64,
}

impl SyntheticFaceDetector {
    pub fn new() -> Self {
        Self {
            calls: 0,
            blink_every: 40,
        }
    }

    pub fn with_blink_every(blink_every: u64) -> Self {
        Self {
            calls: 0,
            blink_every: blink_every.max(2),
        }
    }
}

impl Default for SyntheticFaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceDetector for SyntheticFaceDetector {
    fn name(&self) -> &'static str {
        "synthetic-face"
    }

    fn detect(&mut self, frame: &FrameRgba) -> BoothResult<Vec<FaceLandmarks<CameraSpace>>> {
        self.calls += 1;
        let blinking = self.calls % self.blink_every < 2;
        let pts = synthetic_face_points(frame.canvas(), self.calls as f64 * 0.3, blinking);
        Ok(vec![FaceLandmarks::new(pts)])
    }
}

/// Deterministic stand-in hand model: a right hand that raises on a fixed
/// cadence (ten detections up, twenty down).
#[derive(Debug)]
pub struct SyntheticHandDetector {
    calls: u64,
}

impl SyntheticHandDetector {
    pub fn new() -> Self {
        Self { calls: 0 }
    }
}

impl Default for SyntheticHandDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl HandDetector for SyntheticHandDetector {
    fn name(&self) -> &'static str {
        "synthetic-hand"
    }

    fn detect(&mut self, frame: &FrameRgba) -> BoothResult<Vec<HandLandmarks<CameraSpace>>> {
        self.calls += 1;
        let raised = self.calls % 30 >= 20;
        let canvas = frame.canvas();
        let cx = f64::from(canvas.width) * 0.75;
        let wrist_y = f64::from(canvas.height) * 0.7;

        let mut pts = Vec::with_capacity(topology::HAND_POINTS);
        pts.push(Point::new(cx, wrist_y));
        for i in 1..topology::HAND_POINTS {
            if raised {
                // Fingers extended upward: keypoints sit well above the wrist.
                let spread = (i % 5) as f64 * 8.0 - 16.0;
                let lift = 40.0 + (i / 5) as f64 * 25.0;
                pts.push(Point::new(cx + spread, wrist_y - lift));
            } else {
                // Resting hand: keypoints fan out level with the wrist.
                let spread = i as f64 * 5.0 - 50.0;
                pts.push(Point::new(cx + spread, wrist_y + (i % 3) as f64 * 2.0));
            }
        }

        Ok(vec![HandLandmarks::new(pts, Handedness::Right, 0.95)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgba8;

    fn frame() -> FrameRgba {
        FrameRgba::filled(Canvas::new(640, 480).unwrap(), Rgba8::rgb(0, 0, 0))
    }

    #[test]
    fn synthetic_face_has_full_topology() {
        let pts = synthetic_face_points(Canvas::new(640, 480).unwrap(), 0.0, false);
        assert_eq!(pts.len(), topology::FACE_POINTS);
        let face = FaceLandmarks::<crate::foundation::core::CanvasSpace>::new(pts);
        assert!(face.left_eye().is_some());
        assert!(face.lip_inner().is_some());
        assert!(face.eye_opening().unwrap() > 4.0);
    }

    #[test]
    fn synthetic_face_blink_collapses_eyelids() {
        let pts = synthetic_face_points(Canvas::new(640, 480).unwrap(), 0.0, true);
        let face = FaceLandmarks::<crate::foundation::core::CanvasSpace>::new(pts);
        assert!(face.eye_opening().unwrap() <= 2.0);
    }

    #[test]
    fn synthetic_hand_cycles_raise() {
        let mut det = SyntheticHandDetector::new();
        let f = frame();
        let mut raised_seen = false;
        let mut lowered_seen = false;
        for _ in 0..30 {
            let hands = det.detect(&f).unwrap();
            let hand = &hands[0];
            let wrist = hand.wrist().unwrap();
            let centroid = hand.centroid().unwrap();
            if wrist.y - centroid.y > 40.0 {
                raised_seen = true;
            } else {
                lowered_seen = true;
            }
        }
        assert!(raised_seen && lowered_seen);
    }
}
