//! Per-frame pipeline: draw, detect, gesture, particles, effect, capture.
//!
//! [`RenderStage::tick`] runs the fixed step order once per displayed frame.
//! Detection runs on worker threads behind [`ThrottledDetector`]; everything
//! else is mutated only from the caller's loop, so no locking is needed.

use std::time::Duration;

use tracing::warn;

use crate::capture::photo::PhotoGallery;
use crate::capture::recording::{RecordingController, RecordingEvent};
use crate::detect::gesture::{BlinkDetector, HandRaiseDetector};
use crate::detect::landmarks::{FaceLandmarks, HandLandmarks};
use crate::detect::throttle::ThrottledDetector;
use crate::foundation::core::{CameraSpace, Canvas, FrameRgba};
use crate::foundation::error::{BoothError, BoothResult};
use crate::fx::particles::ParticleSim;
use crate::render::effects::{self, Effect};
use crate::render::raster;

/// Produces frames for the stage; implementations are cameras or synthetic
/// test patterns.
pub trait FrameSource {
    fn resolution(&self) -> Canvas;
    /// Blocks until the next frame is available.
    fn next_frame(&mut self) -> BoothResult<FrameRgba>;
    /// Release the underlying capture hardware. Idempotent.
    fn stop(&mut self);
}

/// Live, user-adjustable knobs read at the top of every tick.
#[derive(Debug, Clone, Copy)]
pub struct Controls {
    pub effect: Effect,
    pub mirror: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            effect: Effect::None,
            mirror: true,
        }
    }
}

/// Snapshot of observable stage state, refreshed each tick.
#[derive(Debug, Clone, Copy)]
pub struct StageStatus {
    pub frame_idx: u64,
    pub fps: f64,
    pub effect: Effect,
    pub mirror: bool,
    /// True once both detector workers have completed at least one call.
    pub model_loaded: bool,
    pub face_detected: bool,
    pub hand_detected: bool,
    pub recording: bool,
    pub photo_count: usize,
    pub particle_count: usize,
}

/// Frames-per-second over a rolling one second window.
#[derive(Debug, Default)]
pub struct FpsCounter {
    window_start: Option<Duration>,
    frames: u32,
    fps: f64,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, now: Duration) {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            self.frames = 1;
            return;
        };
        self.frames += 1;
        let elapsed = now.saturating_sub(start);
        if elapsed >= Duration::from_secs(1) {
            self.fps = f64::from(self.frames) / elapsed.as_secs_f64();
            self.window_start = Some(now);
            // The frame that closed this window is also the first of the next.
            self.frames = 1;
        }
    }

    /// Last completed window's rate; 0.0 until one full window has passed.
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

pub struct RenderStage {
    source: Box<dyn FrameSource>,
    canvas: Canvas,
    face: ThrottledDetector<FaceLandmarks<CameraSpace>>,
    hand: ThrottledDetector<HandLandmarks<CameraSpace>>,
    blink: BlinkDetector,
    raise: HandRaiseDetector,
    particles: ParticleSim,
    gallery: PhotoGallery,
    recorder: RecordingController,
    controls: Controls,
    fps: FpsCounter,
    frame_idx: u64,
    stopped: bool,
}

impl RenderStage {
    pub fn new(
        source: Box<dyn FrameSource>,
        face: ThrottledDetector<FaceLandmarks<CameraSpace>>,
        hand: ThrottledDetector<HandLandmarks<CameraSpace>>,
        blink: BlinkDetector,
        raise: HandRaiseDetector,
        particles: ParticleSim,
        recorder: RecordingController,
        controls: Controls,
    ) -> Self {
        let canvas = source.resolution();
        Self {
            source,
            canvas,
            face,
            hand,
            blink,
            raise,
            particles,
            gallery: PhotoGallery::new(),
            recorder,
            controls,
            fps: FpsCounter::new(),
            frame_idx: 0,
            stopped: false,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn controls_mut(&mut self) -> &mut Controls {
        &mut self.controls
    }

    pub fn gallery(&self) -> &PhotoGallery {
        &self.gallery
    }

    pub fn gallery_mut(&mut self) -> &mut PhotoGallery {
        &mut self.gallery
    }

    pub fn status(&self) -> StageStatus {
        StageStatus {
            frame_idx: self.frame_idx,
            fps: self.fps.fps(),
            effect: self.controls.effect,
            mirror: self.controls.mirror,
            model_loaded: self.face.model_loaded() && self.hand.model_loaded(),
            face_detected: self.face.detected(),
            hand_detected: self.hand.detected(),
            recording: self.recorder.is_active(),
            photo_count: self.gallery.len(),
            particle_count: self.particles.len(),
        }
    }

    /// Run one full pipeline step and return the composed frame.
    ///
    /// `now` is elapsed time since the stage's clock origin; it drives the
    /// blink debounce, the FPS window, and output filenames.
    pub fn tick(&mut self, now: Duration) -> BoothResult<FrameRgba> {
        if self.stopped {
            return Err(BoothError::render("stage is stopped"));
        }

        // 1. Base frame, exactly as the camera produced it.
        let mut frame = self.source.next_frame()?;

        // 2. Throttled detection dispatch and completion absorption. The
        //    workers always see the raw camera frame, so their landmarks are
        //    camera-space.
        self.face.begin_frame(self.frame_idx, &frame);
        self.hand.begin_frame(self.frame_idx, &frame);

        // 3. Presentation mirror, then the one flip decision that brings
        //    landmarks into the presented space. The space tags make a
        //    skipped or doubled flip a type error.
        let mirror = self.controls.mirror;
        if mirror {
            raster::mirror_horizontal(&mut frame);
        }
        let width = self.canvas.width;
        let face = self
            .face
            .current()
            .cloned()
            .map(|l| if mirror { l.mirrored(width) } else { l.onto_canvas() });
        let hand = self
            .hand
            .current()
            .cloned()
            .map(|l| if mirror { l.mirrored(width) } else { l.onto_canvas() });

        // 4. Gestures sample the fresh-or-stale landmark set every frame;
        //    held state stays stable between detector completions, so an
        //    edge fires only when the geometry actually changes.
        let blink = self.blink.update(face.as_ref(), now);
        let raise = self.raise.update(hand.as_ref());

        // 5. Exactly one physics step per tick.
        self.particles.step();

        // 6. Effect overlay, on fresh-or-stale landmarks.
        if self.controls.effect != Effect::None {
            effects::render_effect(
                &mut frame,
                self.controls.effect,
                face.as_ref(),
                hand.as_ref(),
                &mut self.particles,
                blink.edge,
            );
        }
        self.particles.render(&mut frame);

        // Hand-raise edge toggles recording; a sink failure must not take
        // down the loop.
        if raise.edge {
            if let Err(e) = self.recorder.toggle(now.as_millis() as u64) {
                warn!(error = %e, "gesture recording toggle failed");
            }
        }
        if self.recorder.is_active() {
            if let Err(e) = self.recorder.push_frame(&frame) {
                warn!(error = %e, "dropped recording session");
            }
        }

        // 7. Bookkeeping.
        self.fps.tick(now);
        self.frame_idx += 1;
        Ok(frame)
    }

    /// Encode `frame` (the last composed tick output) into the gallery.
    pub fn capture_photo(&mut self, frame: &FrameRgba, now: Duration) -> BoothResult<()> {
        self.gallery.capture(frame, now.as_millis() as u64)?;
        Ok(())
    }

    /// Manual recording toggle, same semantics as the gesture path.
    pub fn toggle_recording(&mut self, now: Duration) -> BoothResult<RecordingEvent> {
        self.recorder.toggle(now.as_millis() as u64)
    }

    pub fn recording(&self) -> bool {
        self.recorder.is_active()
    }

    /// Finalize any recording and release the camera. Idempotent.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        if self.recorder.is_active() {
            if let Err(e) = self.recorder.stop() {
                warn!(error = %e, "failed to finalize recording on stop");
            }
        }
        self.source.stop();
        self.stopped = true;
    }
}

impl Drop for RenderStage {
    fn drop(&mut self) {
        self.stop();
    }
}
