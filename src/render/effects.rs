//! Face and hand overlay effects.
//!
//! Dispatch is an exhaustive match over [`Effect`]; every branch reads the
//! current landmark set and writes only to the frame (the glow effects also
//! feed the particle simulator). Missing keypoints skip the element that
//! needed them; the drawing primitives clip rather than fail, so a bad
//! geometry frame can never take down the render loop.

use kurbo::{Point, Vec2};
use tracing::warn;

use crate::detect::landmarks::{FaceLandmarks, HandLandmarks};
use crate::foundation::core::{FrameRgba, Rgba8};
use crate::foundation::error::{BoothError, BoothResult};
use crate::fx::particles::{EMBER_PALETTE, ParticleSim, SPARKLE_PALETTE};
use crate::render::raster;

const PIXELATE_BLOCK: u32 = 12;

const GREEN: Rgba8 = Rgba8::rgb(60, 230, 100);
const CYAN: Rgba8 = Rgba8::rgb(0, 220, 255);
const LIP_RED: Rgba8 = Rgba8::rgb(200, 20, 60);

/// The selectable overlay. `None` is passthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    #[default]
    None,
    Landmarks,
    BoundingBox,
    Sunglasses,
    FaceOutline,
    Pixelate,
    GlowUp,
    GlowRed,
    Lipstick,
}

impl Effect {
    pub const ALL: [Effect; 9] = [
        Effect::None,
        Effect::Landmarks,
        Effect::BoundingBox,
        Effect::Sunglasses,
        Effect::FaceOutline,
        Effect::Pixelate,
        Effect::GlowUp,
        Effect::GlowRed,
        Effect::Lipstick,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Effect::None => "none",
            Effect::Landmarks => "landmarks",
            Effect::BoundingBox => "boundingBox",
            Effect::Sunglasses => "sunglasses",
            Effect::FaceOutline => "faceOutline",
            Effect::Pixelate => "pixelate",
            Effect::GlowUp => "glowUp",
            Effect::GlowRed => "glowRed",
            Effect::Lipstick => "lipstick",
        }
    }

    /// Next effect in display order, wrapping after the last.
    pub fn next(self) -> Effect {
        let i = Effect::ALL.iter().position(|e| *e == self).unwrap_or(0);
        Effect::ALL[(i + 1) % Effect::ALL.len()]
    }

    pub fn parse(name: &str) -> BoothResult<Effect> {
        Effect::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == name)
            .ok_or_else(|| {
                BoothError::validation(format!(
                    "unknown effect '{name}' (expected one of: none, landmarks, boundingBox, \
                     sunglasses, faceOutline, pixelate, glowUp, glowRed, lipstick)"
                ))
            })
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Draw the selected effect over `frame`. `blink_edge` is the debounced
/// rising edge from the blink detector; only the glow effects consume it.
pub fn render_effect(
    frame: &mut FrameRgba,
    effect: Effect,
    face: Option<&FaceLandmarks>,
    hand: Option<&HandLandmarks>,
    particles: &mut ParticleSim,
    blink_edge: bool,
) {
    match effect {
        Effect::None => {}
        Effect::Landmarks => draw_landmarks(frame, face, hand),
        Effect::BoundingBox => draw_bounding_box(frame, face),
        Effect::Sunglasses => draw_sunglasses(frame, face),
        Effect::FaceOutline => draw_face_outline(frame, face),
        Effect::Pixelate => draw_pixelate(frame, face),
        Effect::GlowUp => draw_glow(frame, face, particles, blink_edge, GlowPalette::Sparkle),
        Effect::GlowRed => draw_glow(frame, face, particles, blink_edge, GlowPalette::Ember),
        Effect::Lipstick => draw_lipstick(frame, face),
    }
}

fn draw_landmarks(frame: &mut FrameRgba, face: Option<&FaceLandmarks>, hand: Option<&HandLandmarks>) {
    let mut draw = |p: Point| {
        raster::glow_disc(frame, p, 6.0, GREEN, 0.35);
        raster::fill_circle(frame, p, 3.0, GREEN, 1.0);
    };
    if let Some(face) = face {
        for p in face.points() {
            draw(*p);
        }
    }
    if let Some(hand) = hand {
        for p in hand.points() {
            draw(*p);
        }
    }
}

fn draw_bounding_box(frame: &mut FrameRgba, face: Option<&FaceLandmarks>) {
    let Some(rect) = face.and_then(FaceLandmarks::bounding_box) else {
        return;
    };
    raster::stroke_rect(frame, rect, GREEN, 2);
    raster::draw_text_5x7(
        frame,
        rect.x0.round() as i64,
        rect.y0.round() as i64 - 11,
        "FACE",
        GREEN,
    );
}

fn draw_sunglasses(frame: &mut FrameRgba, face: Option<&FaceLandmarks>) {
    let Some(face) = face else { return };
    let (Some(left), Some(right)) = (face.left_eye(), face.right_eye()) else {
        return;
    };
    let d = (right - left).hypot();
    if d <= f64::EPSILON {
        return;
    }
    let rx = d * 0.35;
    let ry = d * 0.28;
    let lens = Rgba8::rgba(15, 15, 20, 235);
    for center in [left, right] {
        raster::fill_ellipse(frame, center, rx, ry, lens, 0.9);
        raster::stroke_ellipse(frame, center, rx, ry, Rgba8::rgb(0, 0, 0), 1.0);
    }
    // Bridge between the inner lens edges.
    let dir = (right - left) / d;
    raster::draw_line(
        frame,
        left + dir * rx,
        right - dir * rx,
        Rgba8::rgb(0, 0, 0),
        1.0,
    );
}

fn draw_face_outline(frame: &mut FrameRgba, face: Option<&FaceLandmarks>) {
    let Some(face) = face else { return };
    let Some(outline) = face.outline() else {
        warn!(points = face.points().len(), "face outline incomplete, skipping");
        return;
    };
    for p in outline {
        raster::glow_disc(frame, *p, 7.0, CYAN, 0.5);
    }
    raster::stroke_polyline(frame, outline, true, CYAN, 1.0);
}

fn draw_pixelate(frame: &mut FrameRgba, face: Option<&FaceLandmarks>) {
    let Some(rect) = face.and_then(FaceLandmarks::bounding_box) else {
        return;
    };
    raster::pixelate_region(frame, rect, PIXELATE_BLOCK);
}

enum GlowPalette {
    Sparkle,
    Ember,
}

fn draw_glow(
    frame: &mut FrameRgba,
    face: Option<&FaceLandmarks>,
    particles: &mut ParticleSim,
    blink_edge: bool,
    palette: GlowPalette,
) {
    let Some(face) = face else { return };
    let Some(rect) = face.bounding_box() else { return };

    let (wash, burst): (&[(f64, Rgba8)], &[Rgba8]) = match palette {
        GlowPalette::Sparkle => (
            &[
                (0.0, Rgba8::rgba(255, 255, 255, 90)),
                (0.55, Rgba8::rgba(255, 215, 180, 60)),
                (1.0, Rgba8::rgba(255, 150, 210, 0)),
            ],
            &SPARKLE_PALETTE,
        ),
        GlowPalette::Ember => (
            &[
                (0.0, Rgba8::rgba(255, 70, 40, 95)),
                (0.55, Rgba8::rgba(255, 130, 30, 60)),
                (1.0, Rgba8::rgba(180, 20, 20, 0)),
            ],
            &EMBER_PALETTE,
        ),
    };

    let center = rect.center();
    let radius = rect.width().max(rect.height()) * 0.75;
    raster::radial_wash(frame, center, radius, wash);

    // Crown of three stars above the head.
    if let Some(forehead) = face.forehead() {
        let accent = burst[0];
        for (dx, dy, r) in [(-28.0, -34.0, 7.0), (0.0, -50.0, 10.0), (28.0, -34.0, 7.0)] {
            raster::glow_disc(frame, forehead + Vec2::new(dx, dy), r, accent, 0.9);
        }
    }

    if blink_edge {
        for eye in [face.left_eye(), face.right_eye()].into_iter().flatten() {
            particles.spawn_burst(eye, burst);
        }
    }
}

fn draw_lipstick(frame: &mut FrameRgba, face: Option<&FaceLandmarks>) {
    let Some(face) = face else { return };
    let Some(outer) = face.lip_outer() else {
        return;
    };
    raster::fill_polygon(frame, outer, LIP_RED, 0.85);
    raster::stroke_polyline(frame, outer, true, Rgba8::rgb(150, 10, 40), 0.8);
    if let Some(inner) = face.lip_inner() {
        raster::stroke_polyline(frame, inner, true, Rgba8::rgb(120, 5, 30), 0.5);
    }
}
