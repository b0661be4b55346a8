//! WebM recording through the system `ffmpeg` binary.
//!
//! The stage pushes every rendered frame into the active [`MediaSink`];
//! recording start/stop is a toggle driven either by a key press or by the
//! hand-raise gesture edge.

use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use anyhow::Context as _;
use tracing::{info, warn};

use crate::foundation::core::{Canvas, FrameRgba};
use crate::foundation::error::{BoothError, BoothResult};

#[cfg(target_os = "linux")]
const AUDIO_INPUT_FORMAT: &str = "pulse";
#[cfg(target_os = "macos")]
const AUDIO_INPUT_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
const AUDIO_INPUT_FORMAT: &str = "dshow";

#[derive(Clone, Debug)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
    /// OS audio capture device handed to ffmpeg, or video-only when absent.
    pub audio_device: Option<String>,
    pub overwrite: bool,
}

impl SinkConfig {
    pub fn validate(&self) -> BoothResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BoothError::validation("sink width/height must be non-zero"));
        }
        if self.fps == 0 {
            return Err(BoothError::validation("sink fps must be non-zero"));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            // vp9 output targets yuv420p, which needs even dimensions.
            return Err(BoothError::validation(
                "sink width/height must be even (required for yuv420p webm output)",
            ));
        }
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> BoothResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Sink contract for one recording session: `begin`, then frames in
/// capture order, then exactly one `finish`.
pub trait MediaSink: Send {
    fn begin(&mut self, cfg: &SinkConfig) -> BoothResult<()>;
    fn push_frame(&mut self, frame: &FrameRgba) -> BoothResult<()>;
    fn finish(&mut self) -> BoothResult<()>;
}

/// Pipes rawvideo RGBA into a system `ffmpeg` encoding libvpx-vp9 WebM.
pub struct FfmpegWebmSink {
    cfg: Option<SinkConfig>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl FfmpegWebmSink {
    pub fn new() -> Self {
        Self {
            cfg: None,
            child: None,
            stdin: None,
        }
    }
}

impl Default for FfmpegWebmSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSink for FfmpegWebmSink {
    fn begin(&mut self, cfg: &SinkConfig) -> BoothResult<()> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(BoothError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(BoothError::capture(
                "ffmpeg is required for WebM recording, but was not found on PATH",
            ));
        }

        // System binary over ffmpeg bindings, to avoid native dev
        // header/lib requirements.
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if cfg.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
        ]);

        if let Some(device) = &cfg.audio_device {
            cmd.args(["-f", AUDIO_INPUT_FORMAT, "-i", device]);
            cmd.args(["-c:a", "libopus", "-shortest"]);
        } else {
            cmd.arg("-an");
        }

        cmd.args(["-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p", "-b:v", "1M"])
            .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            BoothError::capture(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BoothError::capture("failed to open ffmpeg stdin (unexpected)"))?;

        self.cfg = Some(cfg.clone());
        self.child = Some(child);
        self.stdin = Some(stdin);
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRgba) -> BoothResult<()> {
        let Some(cfg) = &self.cfg else {
            return Err(BoothError::capture("sink used before begin"));
        };
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(BoothError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(BoothError::capture("sink is already finalized"));
        };

        use std::io::Write as _;
        stdin
            .write_all(&frame.data)
            .map_err(|e| BoothError::capture(format!("failed to write frame to ffmpeg stdin: {e}")))
    }

    fn finish(&mut self) -> BoothResult<()> {
        drop(self.stdin.take());
        let Some(child) = self.child.take() else {
            return Err(BoothError::capture("sink finished before begin"));
        };

        let output = child
            .wait_with_output()
            .map_err(|e| BoothError::capture(format!("failed to wait for ffmpeg to finish: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BoothError::capture(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// In-memory sink for tests and headless runs.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<FrameRgba>,
    finished: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub fn frames(&self) -> &[FrameRgba] {
        &self.frames
    }

    pub fn finished(&self) -> bool {
        self.finished
    }
}

impl MediaSink for InMemorySink {
    fn begin(&mut self, cfg: &SinkConfig) -> BoothResult<()> {
        cfg.validate()?;
        self.cfg = Some(cfg.clone());
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRgba) -> BoothResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> BoothResult<()> {
        self.finished = true;
        Ok(())
    }
}

pub type SinkFactory = Box<dyn FnMut() -> Box<dyn MediaSink> + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingEvent {
    Started { path: PathBuf },
    Stopped { path: PathBuf, frames: u64 },
}

struct ActiveSession {
    sink: Box<dyn MediaSink>,
    path: PathBuf,
    frames: u64,
}

/// Owns the recording toggle state and the active sink, if any.
pub struct RecordingController {
    canvas: Canvas,
    fps: u32,
    out_dir: PathBuf,
    audio_device: Option<String>,
    factory: SinkFactory,
    session: Option<ActiveSession>,
}

impl RecordingController {
    pub fn new(
        canvas: Canvas,
        fps: u32,
        out_dir: impl Into<PathBuf>,
        audio_device: Option<String>,
        factory: SinkFactory,
    ) -> Self {
        Self {
            canvas,
            fps,
            out_dir: out_dir.into(),
            audio_device,
            factory,
            session: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Flip recording state. `timestamp_ms` names the output file on start.
    pub fn toggle(&mut self, timestamp_ms: u64) -> BoothResult<RecordingEvent> {
        if self.is_active() {
            self.stop()
        } else {
            self.start(timestamp_ms)
        }
    }

    /// Start a session. A no-op returning the running session's path when
    /// one is already active.
    pub fn start(&mut self, timestamp_ms: u64) -> BoothResult<RecordingEvent> {
        if let Some(session) = &self.session {
            warn!("recording already active, ignoring start");
            return Ok(RecordingEvent::Started {
                path: session.path.clone(),
            });
        }

        let path = self
            .out_dir
            .join(format!("webcam-recording-{timestamp_ms}.webm"));
        let cfg = SinkConfig {
            width: self.canvas.width,
            height: self.canvas.height,
            fps: self.fps,
            out_path: path.clone(),
            audio_device: self.audio_device.clone(),
            overwrite: true,
        };

        let mut sink = (self.factory)();
        sink.begin(&cfg)?;
        info!(path = %path.display(), fps = self.fps, "recording started");
        self.session = Some(ActiveSession {
            sink,
            path: path.clone(),
            frames: 0,
        });
        Ok(RecordingEvent::Started { path })
    }

    /// Finalize the active session.
    pub fn stop(&mut self) -> BoothResult<RecordingEvent> {
        let Some(mut session) = self.session.take() else {
            return Err(BoothError::capture("no active recording to stop"));
        };
        session.sink.finish()?;
        info!(path = %session.path.display(), frames = session.frames, "recording stopped");
        Ok(RecordingEvent::Stopped {
            path: session.path,
            frames: session.frames,
        })
    }

    /// Push one rendered frame into the active session, if any. A sink
    /// failure aborts the session so later frames are not lost to a dead
    /// encoder.
    pub fn push_frame(&mut self, frame: &FrameRgba) -> BoothResult<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if let Err(e) = session.sink.push_frame(frame) {
            warn!(error = %e, "recording sink failed, aborting session");
            self.session = None;
            return Err(e);
        }
        session.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgba8;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn controller() -> RecordingController {
        RecordingController::new(
            Canvas::new(64, 48).unwrap(),
            30,
            "/tmp/mirrorbooth-test",
            None,
            Box::new(|| Box::new(InMemorySink::new())),
        )
    }

    fn frame() -> FrameRgba {
        FrameRgba::filled(Canvas::new(64, 48).unwrap(), Rgba8::rgb(1, 2, 3))
    }

    #[test]
    fn config_validation_catches_bad_values() {
        let base = SinkConfig {
            width: 64,
            height: 48,
            fps: 30,
            out_path: PathBuf::from("/tmp/out.webm"),
            audio_device: None,
            overwrite: true,
        };
        assert!(base.validate().is_ok());
        assert!(SinkConfig { width: 0, ..base.clone() }.validate().is_err());
        assert!(SinkConfig { height: 31, ..base.clone() }.validate().is_err());
        assert!(SinkConfig { fps: 0, ..base }.validate().is_err());
    }

    #[test]
    fn toggle_flips_active_state() {
        let mut rec = controller();
        assert!(!rec.is_active());
        let started = rec.toggle(1000).unwrap();
        assert!(matches!(started, RecordingEvent::Started { .. }));
        assert!(rec.is_active());
        let stopped = rec.toggle(2000).unwrap();
        assert!(matches!(stopped, RecordingEvent::Stopped { .. }));
        assert!(!rec.is_active());
    }

    #[test]
    fn start_while_active_is_guarded() {
        let spawned = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&spawned);
        let mut rec = RecordingController::new(
            Canvas::new(64, 48).unwrap(),
            30,
            "/tmp/mirrorbooth-test",
            None,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Box::new(InMemorySink::new())
            }),
        );
        rec.start(1).unwrap();
        rec.start(2).unwrap();
        assert_eq!(spawned.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_without_session_is_an_error() {
        let mut rec = controller();
        assert!(rec.stop().is_err());
    }

    #[test]
    fn filename_follows_the_pattern() {
        let mut rec = controller();
        let RecordingEvent::Started { path } = rec.start(98765).unwrap() else {
            panic!("expected start event");
        };
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "webcam-recording-98765.webm"
        );
    }

    #[test]
    fn frames_are_counted_only_while_active() {
        let mut rec = controller();
        rec.push_frame(&frame()).unwrap();
        rec.start(0).unwrap();
        rec.push_frame(&frame()).unwrap();
        rec.push_frame(&frame()).unwrap();
        let RecordingEvent::Stopped { frames, .. } = rec.stop().unwrap() else {
            panic!("expected stop event");
        };
        assert_eq!(frames, 2);
        rec.push_frame(&frame()).unwrap();
        assert!(!rec.is_active());
    }

    #[test]
    fn in_memory_sink_tracks_lifecycle() {
        let mut sink = InMemorySink::new();
        let cfg = SinkConfig {
            width: 64,
            height: 48,
            fps: 30,
            out_path: PathBuf::from("/tmp/out.webm"),
            audio_device: None,
            overwrite: true,
        };
        sink.begin(&cfg).unwrap();
        sink.push_frame(&frame()).unwrap();
        sink.finish().unwrap();
        assert!(sink.finished());
        assert_eq!(sink.frames().len(), 1);
    }
}
