use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use tracing::{info, warn};

use mirrorbooth::capture::recording::{FfmpegWebmSink, RecordingController};
use mirrorbooth::detect::detector::{SyntheticFaceDetector, SyntheticHandDetector};
use mirrorbooth::detect::gesture::{BlinkDetector, HandRaiseDetector};
use mirrorbooth::detect::throttle::{FACE_INTERVAL, HAND_INTERVAL, ThrottledDetector};
use mirrorbooth::detect::worker::ThreadedTransport;
use mirrorbooth::fx::particles::ParticleSim;
use mirrorbooth::render::raster;
use mirrorbooth::render::stage::FrameSource;
use mirrorbooth::source::camera::CameraSource;
use mirrorbooth::source::synthetic::SyntheticSource;
use mirrorbooth::{AppConfig, Controls, Effect, FrameRgba, RenderStage, Rgba8};

#[derive(Parser, Debug)]
#[command(name = "mirrorbooth", version)]
struct Cli {
    /// Config JSON path; defaults are used when the file does not exist.
    #[arg(long, default_value = "mirrorbooth.json")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the live booth window (requires a webcam).
    Run(RunArgs),
    /// Render frames headless from the synthetic source and write one PNG.
    Snapshot(SnapshotArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Camera index override.
    #[arg(long)]
    camera: Option<u32>,

    /// Starting effect override (e.g. "glowUp").
    #[arg(long)]
    effect: Option<String>,

    /// Disable the mirror transform.
    #[arg(long)]
    no_mirror: bool,

    /// Use the synthetic test pattern instead of a camera.
    #[arg(long)]
    synthetic: bool,

    /// Output directory override for photos and recordings.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// OS audio capture device for recordings.
    #[arg(long)]
    audio_device: Option<String>,
}

#[derive(Parser, Debug)]
struct SnapshotArgs {
    /// Number of frames to run before capturing.
    #[arg(long, default_value_t = 90)]
    frames: u64,

    /// Effect to render.
    #[arg(long, default_value = "glowUp")]
    effect: String,

    /// Output PNG path.
    #[arg(long, default_value = "snapshot.png")]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = AppConfig::load_or_default(&cli.config)?;
    match cli.cmd {
        Command::Run(args) => cmd_run(cfg, args),
        Command::Snapshot(args) => cmd_snapshot(cfg, args),
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn build_stage(cfg: &AppConfig, source: Box<dyn FrameSource>) -> anyhow::Result<RenderStage> {
    let canvas = source.resolution();

    let face_transport = ThreadedTransport::for_face(Box::new(SyntheticFaceDetector::new()))?;
    let hand_transport = ThreadedTransport::for_hand(Box::new(SyntheticHandDetector::new()))?;
    let face = ThrottledDetector::new(Box::new(face_transport), FACE_INTERVAL)?;
    let hand = ThrottledDetector::new(Box::new(hand_transport), HAND_INTERVAL)?;

    let blink = BlinkDetector::new(
        cfg.gesture.eye_closed_px,
        Duration::from_millis(cfg.gesture.blink_debounce_ms),
    );
    let raise = HandRaiseDetector::new(cfg.gesture.raise_offset_px);

    let recorder = RecordingController::new(
        canvas,
        cfg.camera.fps,
        cfg.output.dir.clone(),
        cfg.output.audio_device.clone(),
        Box::new(|| Box::new(FfmpegWebmSink::new())),
    );

    let controls = Controls {
        effect: cfg.effect()?,
        mirror: cfg.stage.mirror,
    };
    let particles = ParticleSim::new(unix_millis() as u32);

    Ok(RenderStage::new(
        source, face, hand, blink, raise, particles, recorder, controls,
    ))
}

fn cmd_run(mut cfg: AppConfig, args: RunArgs) -> anyhow::Result<()> {
    if let Some(index) = args.camera {
        cfg.camera.index = index;
    }
    if let Some(effect) = args.effect {
        cfg.stage.effect = effect;
    }
    if args.no_mirror {
        cfg.stage.mirror = false;
    }
    if let Some(dir) = args.out_dir {
        cfg.output.dir = dir;
    }
    if let Some(device) = args.audio_device {
        cfg.output.audio_device = Some(device);
    }
    cfg.validate()?;

    let source: Box<dyn FrameSource> = if args.synthetic {
        Box::new(SyntheticSource::new(cfg.canvas()?))
    } else {
        Box::new(CameraSource::open(
            cfg.camera.index,
            cfg.camera.width,
            cfg.camera.height,
            cfg.camera.fps,
        )?)
    };

    let mut stage = build_stage(&cfg, source)?;
    let canvas = stage.canvas();

    let mut window = Window::new(
        "mirrorbooth",
        canvas.width as usize,
        canvas.height as usize,
        WindowOptions::default(),
    )
    .map_err(|e| anyhow::anyhow!("failed to open display window: {e}"))?;
    window.set_target_fps(cfg.camera.fps as usize);

    info!("keys: E effect, M mirror, P photo, R record, Esc quit");

    let start = Instant::now();
    let mut display = vec![0u32; canvas.pixel_count()];
    // Wall-clock offset so output filenames carry real timestamps.
    let epoch = Duration::from_millis(unix_millis());

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let now = epoch + start.elapsed();
        let mut frame = stage.tick(now)?;

        if window.is_key_pressed(Key::E, KeyRepeat::No) {
            let next = stage.controls().effect.next();
            stage.controls_mut().effect = next;
            info!(effect = %next, "effect selected");
        }
        if window.is_key_pressed(Key::M, KeyRepeat::No) {
            stage.controls_mut().mirror = !stage.controls().mirror;
        }
        if window.is_key_pressed(Key::P, KeyRepeat::No) {
            stage.capture_photo(&frame, now)?;
        }
        if window.is_key_pressed(Key::R, KeyRepeat::No) {
            if let Err(e) = stage.toggle_recording(now) {
                warn!(error = %e, "recording toggle failed");
            }
        }

        draw_hud(&mut frame, &stage);
        pack_0rgb(&frame, &mut display);
        window
            .update_with_buffer(&display, canvas.width as usize, canvas.height as usize)
            .map_err(|e| anyhow::anyhow!("failed to present frame: {e}"))?;
    }

    stage.stop();
    if !stage.gallery().is_empty() {
        let written = stage.gallery().save_all(&cfg.output.dir)?;
        info!(count = written.len(), dir = %cfg.output.dir.display(), "saved photos");
    }
    Ok(())
}

fn cmd_snapshot(cfg: AppConfig, args: SnapshotArgs) -> anyhow::Result<()> {
    let effect = Effect::parse(&args.effect)?;
    let canvas = cfg.canvas()?;
    let mut stage = build_stage(&cfg, Box::new(SyntheticSource::new(canvas)))?;
    stage.controls_mut().effect = effect;

    let tick = Duration::from_millis(33);
    let mut now = Duration::ZERO;
    let mut last: Option<FrameRgba> = None;
    for _ in 0..args.frames.max(1) {
        last = Some(stage.tick(now)?);
        // Detection workers deliver between ticks; a frame-rate sleep keeps
        // the cadence close to the live loop.
        std::thread::sleep(Duration::from_millis(2));
        now += tick;
    }
    stage.stop();

    let frame = last.context("no frames rendered")?;
    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn draw_hud(frame: &mut FrameRgba, stage: &RenderStage) {
    let status = stage.status();
    let mut line = format!(
        "FX {} | FPS {:.0} | PHOTOS {}",
        status.effect.as_str().to_ascii_uppercase(),
        status.fps,
        status.photo_count
    );
    if !status.model_loaded {
        line.push_str(" | LOADING");
    }
    if status.face_detected {
        line.push_str(" | FACE");
    }
    if status.hand_detected {
        line.push_str(" | HAND");
    }
    raster::draw_text_5x7(frame, 6, 6, &line, Rgba8::rgb(240, 240, 240));
    if status.recording {
        raster::fill_circle(
            frame,
            kurbo::Point::new(10.0, 24.0),
            4.0,
            Rgba8::rgb(255, 40, 40),
            1.0,
        );
        raster::draw_text_5x7(frame, 18, 21, "REC", Rgba8::rgb(255, 80, 80));
    }
}

fn pack_0rgb(frame: &FrameRgba, out: &mut Vec<u32>) {
    out.clear();
    out.extend(frame.data.chunks_exact(4).map(|px| {
        (u32::from(px[0]) << 16) | (u32::from(px[1]) << 8) | u32::from(px[2])
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirrorbooth::Canvas;

    #[test]
    fn pack_0rgb_lays_out_channels() {
        let frame = FrameRgba::filled(Canvas::new(2, 1).unwrap(), Rgba8::rgb(0x12, 0x34, 0x56));
        let mut out = Vec::new();
        pack_0rgb(&frame, &mut out);
        assert_eq!(out, vec![0x0012_3456, 0x0012_3456]);
    }
}
