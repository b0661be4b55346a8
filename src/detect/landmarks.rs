use std::marker::PhantomData;

use kurbo::{Point, Rect};

use crate::foundation::core::{CameraSpace, CanvasSpace, CoordSpace};

/// Fixed keypoint topology published by the detector contract.
///
/// Frame-to-frame correspondence is positional only: the same index always
/// names the same anatomical landmark, and there is no identity across frames.
pub mod topology {
    /// Face outline ring: indices `0..OUTLINE_LEN`, in drawing order.
    pub const OUTLINE_LEN: usize = 36;
    /// Left eye center.
    pub const LEFT_EYE: usize = 36;
    /// Right eye center.
    pub const RIGHT_EYE: usize = 37;
    /// Upper left eyelid.
    pub const LEFT_EYE_TOP: usize = 38;
    /// Lower left eyelid.
    pub const LEFT_EYE_BOTTOM: usize = 39;
    /// Upper right eyelid.
    pub const RIGHT_EYE_TOP: usize = 40;
    /// Lower right eyelid.
    pub const RIGHT_EYE_BOTTOM: usize = 41;
    /// Center of the forehead.
    pub const FOREHEAD: usize = 42;
    /// Outer lip ring: `LIP_OUTER_START..LIP_OUTER_END`, in drawing order.
    pub const LIP_OUTER_START: usize = 43;
    pub const LIP_OUTER_END: usize = 55;
    /// Inner lip ring: `LIP_INNER_START..LIP_INNER_END`, in drawing order.
    pub const LIP_INNER_START: usize = 55;
    pub const LIP_INNER_END: usize = 63;
    /// Total face keypoints.
    pub const FACE_POINTS: usize = 63;

    /// Hand wrist keypoint.
    pub const WRIST: usize = 0;
    /// Total hand keypoints.
    pub const HAND_POINTS: usize = 21;
}

/// Which hand a detection belongs to, as labelled by the detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// One detected face: an ordered keypoint sequence in pixel coordinates of
/// the space `S`. Never mutated in place; a fresh value replaces it.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks<S: CoordSpace = CanvasSpace> {
    points: Vec<Point>,
    _space: PhantomData<S>,
}

impl<S: CoordSpace> FaceLandmarks<S> {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            _space: PhantomData,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Keypoint by topology index. `None` when the detector returned a short
    /// sequence or a non-finite coordinate; callers skip the element.
    pub fn point(&self, idx: usize) -> Option<Point> {
        let p = *self.points.get(idx)?;
        (p.x.is_finite() && p.y.is_finite()).then_some(p)
    }

    pub fn left_eye(&self) -> Option<Point> {
        self.point(topology::LEFT_EYE)
    }

    pub fn right_eye(&self) -> Option<Point> {
        self.point(topology::RIGHT_EYE)
    }

    pub fn forehead(&self) -> Option<Point> {
        self.point(topology::FOREHEAD)
    }

    /// The full outline ring, or `None` when the sequence is too short.
    pub fn outline(&self) -> Option<&[Point]> {
        self.points.get(..topology::OUTLINE_LEN)
    }

    pub fn lip_outer(&self) -> Option<&[Point]> {
        self.points
            .get(topology::LIP_OUTER_START..topology::LIP_OUTER_END)
    }

    pub fn lip_inner(&self) -> Option<&[Point]> {
        self.points
            .get(topology::LIP_INNER_START..topology::LIP_INNER_END)
    }

    /// Mean vertical eyelid separation in pixels, over whichever eyes have
    /// both lid keypoints. `None` when neither eye is complete.
    pub fn eye_opening(&self) -> Option<f64> {
        let left = match (
            self.point(topology::LEFT_EYE_TOP),
            self.point(topology::LEFT_EYE_BOTTOM),
        ) {
            (Some(t), Some(b)) => Some((b.y - t.y).abs()),
            _ => None,
        };
        let right = match (
            self.point(topology::RIGHT_EYE_TOP),
            self.point(topology::RIGHT_EYE_BOTTOM),
        ) {
            (Some(t), Some(b)) => Some((b.y - t.y).abs()),
            _ => None,
        };
        match (left, right) {
            (Some(l), Some(r)) => Some((l + r) / 2.0),
            (Some(v), None) | (None, Some(v)) => Some(v),
            (None, None) => None,
        }
    }

    /// Axis-aligned min/max box over all finite keypoints.
    pub fn bounding_box(&self) -> Option<Rect> {
        bounding_box(&self.points)
    }
}

impl FaceLandmarks<CameraSpace> {
    /// Flip into canvas space for a horizontally mirrored presentation of a
    /// `width`-pixel-wide frame.
    pub fn mirrored(self, width: u32) -> FaceLandmarks<CanvasSpace> {
        FaceLandmarks::new(mirror_points(self.points, width))
    }

    /// Relabel into canvas space for an unmirrored presentation, where the
    /// two spaces coincide.
    pub fn onto_canvas(self) -> FaceLandmarks<CanvasSpace> {
        FaceLandmarks::new(self.points)
    }
}

/// One detected hand: ordered keypoints plus the detector's handedness label
/// and its confidence.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks<S: CoordSpace = CanvasSpace> {
    points: Vec<Point>,
    pub handedness: Handedness,
    pub score: f32,
    _space: PhantomData<S>,
}

impl<S: CoordSpace> HandLandmarks<S> {
    pub fn new(points: Vec<Point>, handedness: Handedness, score: f32) -> Self {
        Self {
            points,
            handedness,
            score,
            _space: PhantomData,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point(&self, idx: usize) -> Option<Point> {
        let p = *self.points.get(idx)?;
        (p.x.is_finite() && p.y.is_finite()).then_some(p)
    }

    pub fn wrist(&self) -> Option<Point> {
        self.point(topology::WRIST)
    }

    /// Average of all finite keypoints; the vertical baseline for the
    /// hand-raise signal.
    pub fn centroid(&self) -> Option<Point> {
        let finite: Vec<Point> = self
            .points
            .iter()
            .copied()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .collect();
        if finite.is_empty() {
            return None;
        }
        let n = finite.len() as f64;
        let sum = finite
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point::new(sum.0 / n, sum.1 / n))
    }

    pub fn bounding_box(&self) -> Option<Rect> {
        bounding_box(&self.points)
    }
}

impl HandLandmarks<CameraSpace> {
    pub fn mirrored(self, width: u32) -> HandLandmarks<CanvasSpace> {
        HandLandmarks::new(
            mirror_points(self.points, width),
            self.handedness,
            self.score,
        )
    }

    pub fn onto_canvas(self) -> HandLandmarks<CanvasSpace> {
        HandLandmarks::new(self.points, self.handedness, self.score)
    }
}

fn mirror_points(mut points: Vec<Point>, width: u32) -> Vec<Point> {
    let w = f64::from(width);
    for p in &mut points {
        p.x = (w - 1.0) - p.x;
    }
    points
}

fn bounding_box(points: &[Point]) -> Option<Rect> {
    let mut finite = points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite());
    let first = finite.next()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in finite {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect::new(min_x, min_y, max_x, max_y))
}
