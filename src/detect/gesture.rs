use std::time::Duration;

use tracing::debug;

use crate::detect::landmarks::{FaceLandmarks, HandLandmarks, Handedness};

/// Eyelid separation below this many pixels reads as a closed eye.
pub const DEFAULT_EYE_CLOSED_PX: f64 = 5.0;
/// The wrist must sit this far below the keypoint centroid (fingers up) to
/// count as a raised hand.
pub const DEFAULT_RAISE_OFFSET_PX: f64 = 40.0;
/// Minimum spacing between accepted blink edges. A real-world blink spans
/// several frames; without this every blink double-fires.
pub const BLINK_DEBOUNCE: Duration = Duration::from_millis(300);

/// Rising-edge detector over a boolean signal.
#[derive(Clone, Copy, Debug, Default)]
pub struct EdgeDetector {
    prev: bool,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current sample; returns true only on a false -> true
    /// transition.
    pub fn update(&mut self, current: bool) -> bool {
        let rising = current && !self.prev;
        self.prev = current;
        rising
    }

    pub fn state(&self) -> bool {
        self.prev
    }

    pub fn reset(&mut self) {
        self.prev = false;
    }
}

/// One gesture sample: the level signal plus its debounced rising edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GestureSignal {
    pub active: bool,
    pub edge: bool,
}

/// Blink signal from eyelid separation, with a rising-edge debounce.
#[derive(Debug)]
pub struct BlinkDetector {
    closed_threshold_px: f64,
    debounce: Duration,
    edge: EdgeDetector,
    last_accepted: Option<Duration>,
}

impl BlinkDetector {
    pub fn new(closed_threshold_px: f64, debounce: Duration) -> Self {
        Self {
            closed_threshold_px,
            debounce,
            edge: EdgeDetector::new(),
            last_accepted: None,
        }
    }

    /// Sample once per frame. `now` is monotonic time since loop start;
    /// injected so the debounce is testable without wall-clock sleeps.
    /// A missing face (or missing eyelid keypoints) reads as not blinking.
    pub fn update(&mut self, face: Option<&FaceLandmarks>, now: Duration) -> GestureSignal {
        let blinking = face
            .and_then(|f| f.eye_opening())
            .is_some_and(|sep| sep < self.closed_threshold_px);

        let rising = self.edge.update(blinking);
        let accepted = rising
            && self
                .last_accepted
                .is_none_or(|t| now.saturating_sub(t) >= self.debounce);
        if accepted {
            debug!("blink edge accepted at {:.0}ms", now.as_millis());
            self.last_accepted = Some(now);
        }

        GestureSignal {
            active: blinking,
            edge: accepted,
        }
    }

    pub fn reset(&mut self) {
        self.edge.reset();
        self.last_accepted = None;
    }
}

impl Default for BlinkDetector {
    fn default() -> Self {
        Self::new(DEFAULT_EYE_CLOSED_PX, BLINK_DEBOUNCE)
    }
}

/// Right-hand raise signal: the wrist dropping below the keypoint centroid
/// by a fixed offset means the fingers point up. Left-hand detections are
/// ignored entirely.
#[derive(Debug)]
pub struct HandRaiseDetector {
    raise_offset_px: f64,
    edge: EdgeDetector,
}

impl HandRaiseDetector {
    pub fn new(raise_offset_px: f64) -> Self {
        Self {
            raise_offset_px,
            edge: EdgeDetector::new(),
        }
    }

    pub fn update(&mut self, hand: Option<&HandLandmarks>) -> GestureSignal {
        let raised = hand.is_some_and(|h| {
            h.handedness == Handedness::Right
                && match (h.wrist(), h.centroid()) {
                    (Some(wrist), Some(centroid)) => wrist.y - centroid.y > self.raise_offset_px,
                    _ => false,
                }
        });

        let edge = self.edge.update(raised);
        if edge {
            debug!("hand-raise edge");
        }
        GestureSignal {
            active: raised,
            edge,
        }
    }

    pub fn reset(&mut self) {
        self.edge.reset();
    }
}

impl Default for HandRaiseDetector {
    fn default() -> Self {
        Self::new(DEFAULT_RAISE_OFFSET_PX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::landmarks::topology;
    use crate::foundation::core::CanvasSpace;
    use kurbo::Point;

    fn face_with_opening(sep: f64) -> FaceLandmarks<CanvasSpace> {
        let mut pts = vec![Point::new(0.0, 0.0); topology::FACE_POINTS];
        pts[topology::LEFT_EYE_TOP] = Point::new(100.0, 150.0 - sep / 2.0);
        pts[topology::LEFT_EYE_BOTTOM] = Point::new(100.0, 150.0 + sep / 2.0);
        pts[topology::RIGHT_EYE_TOP] = Point::new(200.0, 150.0 - sep / 2.0);
        pts[topology::RIGHT_EYE_BOTTOM] = Point::new(200.0, 150.0 + sep / 2.0);
        FaceLandmarks::new(pts)
    }

    fn hand(handedness: Handedness, wrist_below_centroid: f64) -> HandLandmarks<CanvasSpace> {
        // Wrist at y=200, all other points clustered so the centroid lands
        // `wrist_below_centroid` pixels above the wrist.
        let other_y = 200.0 - wrist_below_centroid * 21.0 / 20.0;
        let mut pts = vec![Point::new(100.0, other_y); topology::HAND_POINTS];
        pts[topology::WRIST] = Point::new(100.0, 200.0);
        HandLandmarks::new(pts, handedness, 0.9)
    }

    #[test]
    fn edge_fires_once_per_hold() {
        let mut edge = EdgeDetector::new();
        let samples = [false, true, true, true, false, true];
        let edges: Vec<bool> = samples.iter().map(|&s| edge.update(s)).collect();
        assert_eq!(edges, vec![false, true, false, false, false, true]);
    }

    #[test]
    fn blink_edges_inside_debounce_are_dropped() {
        let mut blink = BlinkDetector::new(5.0, Duration::from_millis(300));
        let open = face_with_opening(8.0);
        let closed = face_with_opening(2.0);

        let s = blink.update(Some(&closed), Duration::from_millis(0));
        assert!(s.edge, "first blink accepted");

        blink.update(Some(&open), Duration::from_millis(50));
        let s = blink.update(Some(&closed), Duration::from_millis(100));
        assert!(!s.edge, "second blink 100ms later is debounced");
        assert!(s.active, "level signal still reports blinking");

        blink.update(Some(&open), Duration::from_millis(200));
        let s = blink.update(Some(&closed), Duration::from_millis(400));
        assert!(s.edge, "blink 400ms after the first is accepted");
    }

    #[test]
    fn blink_needs_a_reopen_between_edges() {
        let mut blink = BlinkDetector::new(5.0, Duration::from_millis(0));
        let closed = face_with_opening(2.0);
        assert!(blink.update(Some(&closed), Duration::from_millis(0)).edge);
        assert!(!blink.update(Some(&closed), Duration::from_millis(500)).edge);
    }

    #[test]
    fn missing_face_reads_as_not_blinking() {
        let mut blink = BlinkDetector::default();
        let s = blink.update(None, Duration::from_millis(0));
        assert!(!s.active && !s.edge);
    }

    #[test]
    fn raise_requires_right_hand() {
        let mut raise = HandRaiseDetector::new(40.0);
        let left = hand(Handedness::Left, 100.0);
        let right = hand(Handedness::Right, 100.0);

        assert_eq!(raise.update(Some(&left)), GestureSignal::default());
        let s = raise.update(Some(&right));
        assert!(s.active && s.edge);
    }

    #[test]
    fn raise_held_for_many_frames_is_one_edge() {
        let mut raise = HandRaiseDetector::new(40.0);
        let right = hand(Handedness::Right, 100.0);
        let mut edges = 0;
        for _ in 0..10 {
            if raise.update(Some(&right)).edge {
                edges += 1;
            }
        }
        assert_eq!(edges, 1);
    }

    #[test]
    fn small_offset_is_not_a_raise() {
        let mut raise = HandRaiseDetector::new(40.0);
        let slight = hand(Handedness::Right, 20.0);
        assert!(!raise.update(Some(&slight)).active);
    }
}
