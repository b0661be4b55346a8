//! Software drawing primitives over [`FrameRgba`].
//!
//! Everything here is bounds-guarded and total: out-of-frame coordinates and
//! degenerate shapes are silently clipped or skipped, never an error. That
//! keeps every effect safe to run on whatever geometry a detector returns.

use kurbo::{Point, Rect};

use crate::foundation::core::{FrameRgba, Rgba8};
use crate::foundation::math::mul_div255_u8;

/// Straight-alpha "over" of `color` scaled by `opacity` onto one pixel.
/// The destination is treated as opaque (camera frames are).
pub fn blend_pixel(frame: &mut FrameRgba, x: i64, y: i64, color: Rgba8, opacity: f64) {
    if !frame.in_bounds(x, y) {
        return;
    }
    let af = (f64::from(color.a) / 255.0 * opacity.clamp(0.0, 1.0) * 255.0).round();
    let af = af.clamp(0.0, 255.0) as u16;
    if af == 0 {
        return;
    }
    let inv = 255 - af;

    let i = (y as usize * frame.width as usize + x as usize) * 4;
    let d = &mut frame.data[i..i + 4];
    d[0] = mul_div255_u8(u16::from(color.r), af).saturating_add(mul_div255_u8(u16::from(d[0]), inv));
    d[1] = mul_div255_u8(u16::from(color.g), af).saturating_add(mul_div255_u8(u16::from(d[1]), inv));
    d[2] = mul_div255_u8(u16::from(color.b), af).saturating_add(mul_div255_u8(u16::from(d[2]), inv));
    d[3] = d[3].max(af as u8);
}

/// Saturating additive blend, used for glows.
pub fn add_pixel(frame: &mut FrameRgba, x: i64, y: i64, r: u8, g: u8, b: u8) {
    if !frame.in_bounds(x, y) {
        return;
    }
    let i = (y as usize * frame.width as usize + x as usize) * 4;
    let d = &mut frame.data[i..i + 4];
    d[0] = d[0].saturating_add(r);
    d[1] = d[1].saturating_add(g);
    d[2] = d[2].saturating_add(b);
}

/// Soft additive glow disc with gaussian falloff; `strength` in [0, 1]
/// scales brightness at the center.
pub fn glow_disc(frame: &mut FrameRgba, center: Point, radius: f64, color: Rgba8, strength: f64) {
    if radius <= 0.0 || strength <= 0.0 {
        return;
    }
    let r = radius.ceil() as i64;
    let r2 = radius * radius;
    let sigma = radius * 0.5;
    let denom = 2.0 * sigma * sigma;
    let (cx, cy) = (center.x.round() as i64, center.y.round() as i64);

    for y in (cy - r)..=(cy + r) {
        for x in (cx - r)..=(cx + r) {
            let dx = (x - cx) as f64;
            let dy = (y - cy) as f64;
            let d2 = dx * dx + dy * dy;
            if d2 > r2 {
                continue;
            }
            let w = (-d2 / denom).exp() * strength;
            add_pixel(
                frame,
                x,
                y,
                (f64::from(color.r) * w).round().clamp(0.0, 255.0) as u8,
                (f64::from(color.g) * w).round().clamp(0.0, 255.0) as u8,
                (f64::from(color.b) * w).round().clamp(0.0, 255.0) as u8,
            );
        }
    }
}

pub fn fill_circle(frame: &mut FrameRgba, center: Point, radius: f64, color: Rgba8, opacity: f64) {
    if radius <= 0.0 {
        return;
    }
    let r = radius.ceil() as i64;
    let r2 = radius * radius;
    let (cx, cy) = (center.x.round() as i64, center.y.round() as i64);
    for y in (cy - r)..=(cy + r) {
        for x in (cx - r)..=(cx + r) {
            let dx = (x - cx) as f64;
            let dy = (y - cy) as f64;
            if dx * dx + dy * dy <= r2 {
                blend_pixel(frame, x, y, color, opacity);
            }
        }
    }
}

/// 1px Bresenham line.
pub fn draw_line(frame: &mut FrameRgba, a: Point, b: Point, color: Rgba8, opacity: f64) {
    if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
        return;
    }
    let (mut x0, mut y0) = (a.x.round() as i64, a.y.round() as i64);
    let (x1, y1) = (b.x.round() as i64, b.y.round() as i64);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        blend_pixel(frame, x0, y0, color, opacity);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

pub fn stroke_polyline(
    frame: &mut FrameRgba,
    pts: &[Point],
    closed: bool,
    color: Rgba8,
    opacity: f64,
) {
    if pts.len() < 2 {
        return;
    }
    for pair in pts.windows(2) {
        draw_line(frame, pair[0], pair[1], color, opacity);
    }
    if closed {
        draw_line(frame, pts[pts.len() - 1], pts[0], color, opacity);
    }
}

pub fn stroke_rect(frame: &mut FrameRgba, rect: Rect, color: Rgba8, thickness: u32) {
    let rect = rect.abs();
    for t in 0..i64::from(thickness.max(1)) {
        let x0 = rect.x0.round() as i64 - t;
        let y0 = rect.y0.round() as i64 - t;
        let x1 = rect.x1.round() as i64 + t;
        let y1 = rect.y1.round() as i64 + t;
        for x in x0..=x1 {
            blend_pixel(frame, x, y0, color, 1.0);
            blend_pixel(frame, x, y1, color, 1.0);
        }
        for y in y0..=y1 {
            blend_pixel(frame, x0, y, color, 1.0);
            blend_pixel(frame, x1, y, color, 1.0);
        }
    }
}

/// Even-odd scanline polygon fill.
pub fn fill_polygon(frame: &mut FrameRgba, pts: &[Point], color: Rgba8, opacity: f64) {
    if pts.len() < 3 {
        return;
    }
    let min_y = pts.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = pts.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    if !min_y.is_finite() || !max_y.is_finite() {
        return;
    }
    let y_start = (min_y.floor() as i64).max(0);
    let y_end = (max_y.ceil() as i64).min(i64::from(frame.height) - 1);

    let mut xs: Vec<f64> = Vec::with_capacity(8);
    for y in y_start..=y_end {
        let yc = y as f64 + 0.5;
        xs.clear();
        for i in 0..pts.len() {
            let p0 = pts[i];
            let p1 = pts[(i + 1) % pts.len()];
            if (p0.y <= yc && p1.y > yc) || (p1.y <= yc && p0.y > yc) {
                xs.push(p0.x + (yc - p0.y) * (p1.x - p0.x) / (p1.y - p0.y));
            }
        }
        xs.sort_by(|a, b| a.total_cmp(b));
        for span in xs.chunks_exact(2) {
            let x0 = span[0].round() as i64;
            let x1 = span[1].round() as i64;
            for x in x0..=x1 {
                blend_pixel(frame, x, y, color, opacity);
            }
        }
    }
}

pub fn fill_ellipse(
    frame: &mut FrameRgba,
    center: Point,
    rx: f64,
    ry: f64,
    color: Rgba8,
    opacity: f64,
) {
    if rx <= 0.0 || ry <= 0.0 {
        return;
    }
    let (cx, cy) = (center.x, center.y);
    let y0 = (cy - ry).floor() as i64;
    let y1 = (cy + ry).ceil() as i64;
    let x0 = (cx - rx).floor() as i64;
    let x1 = (cx + rx).ceil() as i64;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let nx = (x as f64 - cx) / rx;
            let ny = (y as f64 - cy) / ry;
            if nx * nx + ny * ny <= 1.0 {
                blend_pixel(frame, x, y, color, opacity);
            }
        }
    }
}

pub fn stroke_ellipse(
    frame: &mut FrameRgba,
    center: Point,
    rx: f64,
    ry: f64,
    color: Rgba8,
    opacity: f64,
) {
    if rx <= 0.0 || ry <= 0.0 {
        return;
    }
    let circumference = std::f64::consts::TAU * rx.max(ry);
    let steps = (circumference.ceil() as usize).max(16);
    let mut prev = Point::new(center.x + rx, center.y);
    for i in 1..=steps {
        let a = std::f64::consts::TAU * i as f64 / steps as f64;
        let p = Point::new(center.x + rx * a.cos(), center.y + ry * a.sin());
        draw_line(frame, prev, p, color, opacity);
        prev = p;
    }
}

/// Translucent radial wash: color stops at normalized distances from the
/// center, linearly interpolated, blended over the frame out to `radius`.
pub fn radial_wash(frame: &mut FrameRgba, center: Point, radius: f64, stops: &[(f64, Rgba8)]) {
    if radius <= 0.0 || stops.is_empty() {
        return;
    }
    let r = radius.ceil() as i64;
    let (cx, cy) = (center.x.round() as i64, center.y.round() as i64);
    for y in (cy - r)..=(cy + r) {
        for x in (cx - r)..=(cx + r) {
            let dx = (x - cx) as f64;
            let dy = (y - cy) as f64;
            let t = (dx * dx + dy * dy).sqrt() / radius;
            if t > 1.0 {
                continue;
            }
            let c = sample_stops(stops, t);
            blend_pixel(frame, x, y, c, f64::from(c.a) / 255.0);
        }
    }
}

fn sample_stops(stops: &[(f64, Rgba8)], t: f64) -> Rgba8 {
    let first = stops[0];
    if t <= first.0 {
        return first.1;
    }
    for pair in stops.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 1.0 };
            return lerp_color(c0, c1, f);
        }
    }
    stops[stops.len() - 1].1
}

fn lerp_color(a: Rgba8, b: Rgba8, t: f64) -> Rgba8 {
    let l = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * t).round() as u8;
    Rgba8 {
        r: l(a.r, b.r),
        g: l(a.g, b.g),
        b: l(a.b, b.b),
        a: l(a.a, b.a),
    }
}

/// Mosaic a region in place: each `block`-pixel square takes the color of
/// its top-left source pixel (a sample, not a box average). Degenerate
/// regions are a no-op.
pub fn pixelate_region(frame: &mut FrameRgba, region: Rect, block: u32) {
    if block == 0 {
        return;
    }
    let region = region.abs();
    let x0 = (region.x0.floor().max(0.0)) as u32;
    let y0 = (region.y0.floor().max(0.0)) as u32;
    let x1 = (region.x1.ceil().min(f64::from(frame.width))) as u32;
    let y1 = (region.y1.ceil().min(f64::from(frame.height))) as u32;
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    let mut by = y0;
    while by < y1 {
        let mut bx = x0;
        while bx < x1 {
            let sample = frame.pixel(bx, by);
            for y in by..(by + block).min(y1) {
                for x in bx..(bx + block).min(x1) {
                    frame.put_pixel(x, y, sample);
                }
            }
            bx += block;
        }
        by += block;
    }
}

/// Reverse every row in place (horizontal mirror).
pub fn mirror_horizontal(frame: &mut FrameRgba) {
    let w = frame.width as usize;
    for row in frame.data.chunks_exact_mut(w * 4) {
        let mut lo = 0usize;
        let mut hi = w - 1;
        while lo < hi {
            for b in 0..4 {
                row.swap(lo * 4 + b, hi * 4 + b);
            }
            lo += 1;
            hi -= 1;
        }
    }
}

// ---- tiny 5x7 bitmap font for the HUD ----

/// 5x7 glyph rows; the low 5 bits are pixels, bit 4 leftmost.
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g {
        ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
            Some([$a, $b, $c, $d, $e, $f, $g])
        };
    }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110),
        '1' => g!(0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110),
        '2' => g!(0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111),
        '3' => g!(0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110),
        '4' => g!(0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010),
        '5' => g!(0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110),
        '6' => g!(0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110),
        '7' => g!(0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000),
        '8' => g!(0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110),
        '9' => g!(0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100),
        'A' => g!(0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001),
        'B' => g!(0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110),
        'C' => g!(0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110),
        'D' => g!(0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100),
        'E' => g!(0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111),
        'F' => g!(0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000),
        'G' => g!(0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111),
        'H' => g!(0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001),
        'I' => g!(0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110),
        'J' => g!(0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100),
        'K' => g!(0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001),
        'L' => g!(0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111),
        'M' => g!(0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001),
        'N' => g!(0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001),
        'O' => g!(0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110),
        'P' => g!(0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000),
        'Q' => g!(0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101),
        'R' => g!(0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001),
        'S' => g!(0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110),
        'T' => g!(0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100),
        'U' => g!(0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110),
        'V' => g!(0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100),
        'W' => g!(0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010),
        'X' => g!(0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001),
        'Y' => g!(0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100),
        'Z' => g!(0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111),
        ' ' => g!(0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000),
        '|' => g!(0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100),
        ':' => g!(0b00000, 0b00100, 0b00000, 0b00000, 0b00100, 0b00000, 0b00000),
        '.' => g!(0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00100, 0b00000),
        '-' => g!(0b00000, 0b00000, 0b00000, 0b01110, 0b00000, 0b00000, 0b00000),
        '/' => g!(0b00001, 0b00010, 0b00010, 0b00100, 0b01000, 0b01000, 0b10000),
        _ => None,
    }
}

fn draw_char_5x7(frame: &mut FrameRgba, x: i64, y: i64, ch: char, color: Rgba8) {
    let Some(rows) = glyph5x7(ch) else {
        return;
    };
    // Shadow pass for contrast over live video.
    for (ry, rowbits) in rows.iter().enumerate() {
        for rx in 0..5i64 {
            if (rowbits & (1 << (4 - rx))) != 0 {
                blend_pixel(frame, x + rx + 1, y + ry as i64 + 1, Rgba8::rgb(0, 0, 0), 1.0);
            }
        }
    }
    for (ry, rowbits) in rows.iter().enumerate() {
        for rx in 0..5i64 {
            if (rowbits & (1 << (4 - rx))) != 0 {
                blend_pixel(frame, x + rx, y + ry as i64, color, 1.0);
            }
        }
    }
}

/// Compact HUD text; glyphs are 5x7 with 1px spacing.
pub fn draw_text_5x7(frame: &mut FrameRgba, x: i64, y: i64, text: &str, color: Rgba8) {
    let mut cx = x;
    for ch in text.chars() {
        draw_char_5x7(frame, cx, y, ch, color);
        cx += 6;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Canvas;

    fn gradient_frame(w: u32, h: u32) -> FrameRgba {
        let mut f = FrameRgba::filled(Canvas::new(w, h).unwrap(), Rgba8::rgb(0, 0, 0));
        for y in 0..h {
            for x in 0..w {
                f.put_pixel(x, y, Rgba8::rgb((x % 256) as u8, (y % 256) as u8, 7));
            }
        }
        f
    }

    #[test]
    fn blend_zero_opacity_is_noop() {
        let mut f = gradient_frame(8, 8);
        let before = f.clone();
        blend_pixel(&mut f, 3, 3, Rgba8::rgb(255, 255, 255), 0.0);
        assert_eq!(f, before);
    }

    #[test]
    fn blend_full_opacity_replaces() {
        let mut f = gradient_frame(8, 8);
        blend_pixel(&mut f, 2, 2, Rgba8::rgb(10, 20, 30), 1.0);
        assert_eq!(f.pixel(2, 2), Rgba8::rgb(10, 20, 30));
    }

    #[test]
    fn out_of_bounds_drawing_is_clipped() {
        let mut f = gradient_frame(8, 8);
        let before = f.clone();
        blend_pixel(&mut f, -1, 4, Rgba8::rgb(255, 0, 0), 1.0);
        blend_pixel(&mut f, 4, 99, Rgba8::rgb(255, 0, 0), 1.0);
        fill_circle(&mut f, Point::new(-50.0, -50.0), 5.0, Rgba8::rgb(255, 0, 0), 1.0);
        assert_eq!(f, before);
    }

    #[test]
    fn mirror_flips_rows() {
        let mut f = gradient_frame(4, 2);
        let left = f.pixel(0, 1);
        let right = f.pixel(3, 1);
        mirror_horizontal(&mut f);
        assert_eq!(f.pixel(0, 1), right);
        assert_eq!(f.pixel(3, 1), left);
    }

    #[test]
    fn mirror_twice_roundtrips() {
        let mut f = gradient_frame(7, 3);
        let before = f.clone();
        mirror_horizontal(&mut f);
        mirror_horizontal(&mut f);
        assert_eq!(f, before);
    }

    #[test]
    fn pixelate_48x24_makes_eight_flat_blocks() {
        let mut f = gradient_frame(64, 32);
        pixelate_region(&mut f, Rect::new(0.0, 0.0, 48.0, 24.0), 12);
        let mut uniform_blocks = 0;
        for by in 0..2u32 {
            for bx in 0..4u32 {
                let sample = f.pixel(bx * 12, by * 12);
                for y in (by * 12)..(by * 12 + 12) {
                    for x in (bx * 12)..(bx * 12 + 12) {
                        assert_eq!(f.pixel(x, y), sample, "block ({bx},{by}) not flat");
                    }
                }
                uniform_blocks += 1;
            }
        }
        assert_eq!(uniform_blocks, 8);
        // Outside the region the gradient is untouched.
        assert_eq!(f.pixel(50, 2), Rgba8::rgb(50, 2, 7));
    }

    #[test]
    fn pixelate_block_takes_top_left_sample() {
        let mut f = gradient_frame(24, 24);
        let sample = f.pixel(12, 0);
        pixelate_region(&mut f, Rect::new(0.0, 0.0, 24.0, 12.0), 12);
        assert_eq!(f.pixel(23, 11), sample);
    }

    #[test]
    fn pixelate_degenerate_region_is_noop() {
        let mut f = gradient_frame(16, 16);
        let before = f.clone();
        pixelate_region(&mut f, Rect::new(5.0, 5.0, 5.0, 5.0), 12);
        pixelate_region(&mut f, Rect::new(-20.0, -20.0, -1.0, -1.0), 12);
        pixelate_region(&mut f, Rect::new(0.0, 0.0, 10.0, 10.0), 0);
        assert_eq!(f, before);
    }

    #[test]
    fn polygon_fill_covers_square_interior() {
        let mut f = FrameRgba::filled(Canvas::new(16, 16).unwrap(), Rgba8::rgb(0, 0, 0));
        let square = [
            Point::new(4.0, 4.0),
            Point::new(12.0, 4.0),
            Point::new(12.0, 12.0),
            Point::new(4.0, 12.0),
        ];
        fill_polygon(&mut f, &square, Rgba8::rgb(255, 0, 0), 1.0);
        assert_eq!(f.pixel(8, 8), Rgba8::rgb(255, 0, 0));
        assert_eq!(f.pixel(1, 1), Rgba8::rgb(0, 0, 0));
    }

    #[test]
    fn degenerate_polygon_is_noop() {
        let mut f = gradient_frame(8, 8);
        let before = f.clone();
        fill_polygon(
            &mut f,
            &[Point::new(1.0, 1.0), Point::new(2.0, 2.0)],
            Rgba8::rgb(255, 0, 0),
            1.0,
        );
        assert_eq!(f, before);
    }

    #[test]
    fn text_draws_something_inside_frame() {
        let mut f = FrameRgba::filled(Canvas::new(64, 16).unwrap(), Rgba8::rgb(0, 0, 0));
        draw_text_5x7(&mut f, 2, 2, "FPS: 30.0", Rgba8::rgb(255, 255, 255));
        let lit = f
            .data
            .chunks_exact(4)
            .filter(|px| px[0] == 255 && px[1] == 255 && px[2] == 255)
            .count();
        assert!(lit > 0);
    }
}
