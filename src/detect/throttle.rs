use tracing::{debug, warn};

use crate::detect::worker::DetectionTransport;
use crate::foundation::core::FrameRgba;
use crate::foundation::error::{BoothError, BoothResult};

/// Detection cadence for the face model: one request every N frames.
pub const FACE_INTERVAL: u64 = 3;
/// Detection cadence for the hand model.
pub const HAND_INTERVAL: u64 = 5;

/// Frames an outstanding request may age before we log a hung-model warning.
const HUNG_AFTER_FRAMES: u64 = 300;

/// Whether a new detection request is due on this frame.
pub fn due(frame_idx: u64, interval: u64, in_flight: bool) -> bool {
    interval > 0 && frame_idx % interval == 0 && !in_flight
}

/// Gates how often one detector runs and caches its last successful result.
///
/// Per frame: drain the completion mailbox, then issue a new request iff the
/// frame counter hits the interval and nothing is outstanding. An empty or
/// failed result clears the `detected` flag but keeps the last known
/// landmarks — overlays reuse stale geometry until a fresh detection lands,
/// trading positional staleness for visual continuity.
pub struct ThrottledDetector<T> {
    transport: Box<dyn DetectionTransport<T>>,
    interval: u64,
    in_flight: bool,
    issued_at: u64,
    last_known: Option<T>,
    detected: bool,
    responded: bool,
    hung_warned: bool,
}

impl<T> ThrottledDetector<T> {
    pub fn new(transport: Box<dyn DetectionTransport<T>>, interval: u64) -> BoothResult<Self> {
        if interval == 0 {
            return Err(BoothError::validation("detection interval must be >= 1"));
        }
        Ok(Self {
            transport,
            interval,
            in_flight: false,
            issued_at: 0,
            last_known: None,
            detected: false,
            responded: false,
            hung_warned: false,
        })
    }

    /// Run the per-frame throttling step: absorb any completion, then maybe
    /// dispatch a new request for this frame.
    pub fn begin_frame(&mut self, frame_idx: u64, frame: &FrameRgba) {
        if let Some(result) = self.transport.poll() {
            self.in_flight = false;
            self.responded = true;
            match result {
                Ok(mut entities) => {
                    if entities.is_empty() {
                        self.detected = false;
                    } else {
                        self.last_known = Some(entities.swap_remove(0));
                        self.detected = true;
                    }
                }
                Err(e) => {
                    debug!("detection call failed: {e}");
                    self.detected = false;
                }
            }
        }

        if due(frame_idx, self.interval, self.in_flight) {
            match self.transport.submit(frame.clone()) {
                Ok(()) => {
                    self.in_flight = true;
                    self.issued_at = frame_idx;
                }
                Err(e) => warn!("failed to dispatch detection request: {e}"),
            }
        } else if self.in_flight
            && frame_idx.saturating_sub(self.issued_at) > HUNG_AFTER_FRAMES
            && !self.hung_warned
        {
            // A request that never completes parks this detector for good;
            // surface it once instead of silently losing the signal.
            warn!(
                "detection request outstanding for {} frames; detector appears hung",
                frame_idx - self.issued_at
            );
            self.hung_warned = true;
        }
    }

    /// Last successful result, fresh or stale.
    pub fn current(&self) -> Option<&T> {
        self.last_known.as_ref()
    }

    /// True once the model has completed at least one call, found or not.
    /// Until then the worker is still warming up.
    pub fn model_loaded(&self) -> bool {
        self.responded
    }

    pub fn detected(&self) -> bool {
        self.detected
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{Canvas, Rgba8};

    fn frame() -> FrameRgba {
        FrameRgba::filled(Canvas::new(8, 8).unwrap(), Rgba8::rgb(0, 0, 0))
    }

    /// Scripted transport: completes each request with the next scripted
    /// result on the following poll, mimicking one frame of model latency.
    struct Scripted {
        script: Vec<BoothResult<Vec<u32>>>,
        next: usize,
        pending: bool,
    }

    impl Scripted {
        fn new(script: Vec<BoothResult<Vec<u32>>>) -> Self {
            Self {
                script,
                next: 0,
                pending: false,
            }
        }
    }

    impl DetectionTransport<u32> for Scripted {
        fn submit(&mut self, _frame: FrameRgba) -> BoothResult<()> {
            assert!(!self.pending, "submit while a request is outstanding");
            self.pending = true;
            Ok(())
        }

        fn poll(&mut self) -> Option<BoothResult<Vec<u32>>> {
            if !self.pending {
                return None;
            }
            self.pending = false;
            let idx = self.next.min(self.script.len().saturating_sub(1));
            self.next += 1;
            Some(match &self.script[idx] {
                Ok(v) => Ok(v.clone()),
                Err(_) => Err(BoothError::detection("scripted failure")),
            })
        }
    }

    #[test]
    fn due_matches_interval_and_in_flight() {
        for f in 0..30u64 {
            assert_eq!(due(f, 3, false), f % 3 == 0, "frame {f}");
            assert!(!due(f, 3, true));
            assert_eq!(due(f, 5, false), f % 5 == 0, "frame {f}");
        }
        assert!(!due(0, 0, false));
    }

    #[test]
    fn stale_result_survives_empty_and_failed_calls() {
        let script = vec![
            Ok(vec![1u32]),
            Err(BoothError::detection("x")),
            Ok(vec![]),
            Ok(vec![2u32]),
        ];
        let mut det = ThrottledDetector::new(Box::new(Scripted::new(script)), 1).unwrap();
        let f = frame();

        det.begin_frame(0, &f); // issue #1
        det.begin_frame(1, &f); // absorb Ok([1]), issue #2
        assert_eq!(det.current(), Some(&1));
        assert!(det.detected());

        det.begin_frame(2, &f); // absorb Err, issue #3
        assert_eq!(det.current(), Some(&1), "stale value kept after failure");
        assert!(!det.detected());

        det.begin_frame(3, &f); // absorb Ok([]), issue #4
        assert_eq!(det.current(), Some(&1), "stale value kept after empty");
        assert!(!det.detected());

        det.begin_frame(4, &f); // absorb Ok([2])
        assert_eq!(det.current(), Some(&2));
        assert!(det.detected());
    }

    #[test]
    fn cadence_skips_frames_between_intervals() {
        struct NeverDone;
        impl DetectionTransport<u32> for NeverDone {
            fn submit(&mut self, _frame: FrameRgba) -> BoothResult<()> {
                Ok(())
            }
            fn poll(&mut self) -> Option<BoothResult<Vec<u32>>> {
                None
            }
        }

        let mut det = ThrottledDetector::new(Box::new(NeverDone), 3).unwrap();
        let f = frame();
        for idx in 0..12 {
            det.begin_frame(idx, &f);
        }
        // Frame 0 issues; the request never completes, so frames 3/6/9 are
        // all suppressed by the in-flight guard.
        assert!(det.in_flight());
        assert!(det.current().is_none());
    }

    #[test]
    fn model_loaded_flips_on_first_completion_even_when_empty() {
        let script: Vec<BoothResult<Vec<u32>>> = vec![Ok(vec![])];
        let mut det = ThrottledDetector::new(Box::new(Scripted::new(script)), 1).unwrap();
        let f = frame();
        assert!(!det.model_loaded());
        det.begin_frame(0, &f); // issue
        assert!(!det.model_loaded(), "still loading while the call runs");
        det.begin_frame(1, &f); // absorb Ok([])
        assert!(det.model_loaded());
        assert!(!det.detected());
    }

    #[test]
    fn completed_request_reopens_the_slot() {
        let script = vec![Ok(vec![9u32])];
        let mut det = ThrottledDetector::new(Box::new(Scripted::new(script)), 3).unwrap();
        let f = frame();
        det.begin_frame(0, &f);
        assert!(det.in_flight());
        det.begin_frame(1, &f);
        assert!(!det.in_flight());
        det.begin_frame(2, &f);
        assert!(!det.in_flight());
        det.begin_frame(3, &f);
        assert!(det.in_flight(), "next interval frame re-issues");
    }
}
