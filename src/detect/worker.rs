use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;

use tracing::debug;

use crate::detect::detector::{FaceDetector, HandDetector};
use crate::detect::landmarks::{FaceLandmarks, HandLandmarks};
use crate::foundation::core::{CameraSpace, FrameRgba};
use crate::foundation::error::{BoothError, BoothResult};

/// Transport between the frame loop and one detector.
///
/// The loop never waits on a result: it submits at most one request at a
/// time and drains the completion mailbox at the start of a later frame.
/// Callers are responsible for the single-outstanding-request discipline
/// (see [`crate::detect::throttle::ThrottledDetector`]).
pub trait DetectionTransport<T>: Send {
    /// Hand a frame to the detector without blocking on the result.
    fn submit(&mut self, frame: FrameRgba) -> BoothResult<()>;

    /// Drain the completion mailbox; `None` while the request is still
    /// running (or none is outstanding).
    fn poll(&mut self) -> Option<BoothResult<Vec<T>>>;
}

/// Runs a detector on a dedicated worker thread, one request at a time.
pub struct ThreadedTransport<T> {
    tx: Option<Sender<FrameRgba>>,
    rx: Receiver<BoothResult<Vec<T>>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> ThreadedTransport<T> {
    pub fn spawn<F>(name: &str, mut detect: F) -> BoothResult<Self>
    where
        F: FnMut(&FrameRgba) -> BoothResult<Vec<T>> + Send + 'static,
    {
        let (req_tx, req_rx) = mpsc::channel::<FrameRgba>();
        let (res_tx, res_rx) = mpsc::channel::<BoothResult<Vec<T>>>();

        let worker = std::thread::Builder::new()
            .name(format!("detect-{name}"))
            .spawn(move || {
                while let Ok(frame) = req_rx.recv() {
                    let result = detect(&frame);
                    if res_tx.send(result).is_err() {
                        break;
                    }
                }
                debug!("detector worker shutting down");
            })
            .map_err(|e| BoothError::detection(format!("failed to spawn worker thread: {e}")))?;

        Ok(Self {
            tx: Some(req_tx),
            rx: res_rx,
            worker: Some(worker),
        })
    }

}

impl ThreadedTransport<FaceLandmarks<CameraSpace>> {
    /// Wrap a face model in its own worker thread.
    pub fn for_face(mut detector: Box<dyn FaceDetector>) -> BoothResult<Self> {
        let name = detector.name();
        Self::spawn(name, move |frame| detector.detect(frame))
    }
}

impl ThreadedTransport<HandLandmarks<CameraSpace>> {
    /// Wrap a hand model in its own worker thread.
    pub fn for_hand(mut detector: Box<dyn HandDetector>) -> BoothResult<Self> {
        let name = detector.name();
        Self::spawn(name, move |frame| detector.detect(frame))
    }
}

impl<T: Send> DetectionTransport<T> for ThreadedTransport<T> {
    fn submit(&mut self, frame: FrameRgba) -> BoothResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| BoothError::detection("detector worker already shut down"))?;
        tx.send(frame)
            .map_err(|_| BoothError::detection("detector worker exited unexpectedly"))
    }

    fn poll(&mut self) -> Option<BoothResult<Vec<T>>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(BoothError::detection(
                "detector worker exited unexpectedly",
            ))),
        }
    }
}

impl<T> Drop for ThreadedTransport<T> {
    fn drop(&mut self) {
        // Closing the request channel lets the worker drain and exit.
        drop(self.tx.take());
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{Canvas, Rgba8};
    use std::time::{Duration, Instant};

    fn frame() -> FrameRgba {
        FrameRgba::filled(Canvas::new(8, 8).unwrap(), Rgba8::rgb(0, 0, 0))
    }

    fn poll_until<T: Send>(
        transport: &mut ThreadedTransport<T>,
        timeout: Duration,
    ) -> Option<BoothResult<Vec<T>>> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(r) = transport.poll() {
                return Some(r);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        None
    }

    #[test]
    fn result_arrives_through_mailbox() {
        let mut t: ThreadedTransport<u32> =
            ThreadedTransport::spawn("test", |_f| Ok(vec![7u32])).unwrap();
        assert!(t.poll().is_none());
        t.submit(frame()).unwrap();
        let got = poll_until(&mut t, Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(got, vec![7]);
    }

    #[test]
    fn detector_error_is_delivered_not_panicked() {
        let mut t: ThreadedTransport<u32> =
            ThreadedTransport::spawn("test", |_f| Err(BoothError::detection("model rejected")))
                .unwrap();
        t.submit(frame()).unwrap();
        let got = poll_until(&mut t, Duration::from_secs(5)).unwrap();
        assert!(got.is_err());
        // The worker survives a failed call.
        t.submit(frame()).unwrap();
        assert!(poll_until(&mut t, Duration::from_secs(5)).is_some());
    }
}
