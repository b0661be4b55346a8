//! Blink-burst particle simulator.
//!
//! Particles are spawned in bursts at eye positions, integrate under gravity
//! once per stage tick, fade linearly, and draw as glowing five-pointed
//! stars whose opacity tracks remaining life.

use kurbo::{Point, Vec2};
use tracing::debug;

use crate::foundation::core::{FrameRgba, Rgba8};
use crate::foundation::math::XorShift32;
use crate::render::raster;

/// Particles spawned per burst (one burst per eye on a blink).
pub const BURST_COUNT: usize = 20;

/// Hard cap on live particles; bursts past the cap are truncated.
pub const MAX_PARTICLES: usize = 4096;

/// Downward acceleration in pixels per tick squared.
const GRAVITY: f64 = 0.18;

/// Life drained per tick; a full-life particle survives 50 ticks.
const LIFE_DECAY: f64 = 0.02;

const SPEED_MIN: f64 = 1.0;
const SPEED_MAX: f64 = 4.0;
const SIZE_MIN: f64 = 2.0;
const SIZE_MAX: f64 = 5.0;

/// White, gold, pink.
pub const SPARKLE_PALETTE: [Rgba8; 3] = [
    Rgba8::rgb(255, 255, 255),
    Rgba8::rgb(255, 214, 90),
    Rgba8::rgb(255, 130, 200),
];

/// Red, orange.
pub const EMBER_PALETTE: [Rgba8; 2] = [Rgba8::rgb(255, 40, 40), Rgba8::rgb(255, 140, 30)];

#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub pos: Point,
    pub vel: Vec2,
    pub size: f64,
    pub color: Rgba8,
    /// 1.0 at spawn, dead at 0.0.
    pub life: f64,
}

#[derive(Debug)]
pub struct ParticleSim {
    particles: Vec<Particle>,
    rng: XorShift32,
}

impl ParticleSim {
    pub fn new(seed: u32) -> Self {
        Self {
            particles: Vec::new(),
            rng: XorShift32::from_seed(seed),
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Spawn [`BURST_COUNT`] particles at `origin` with uniform random
    /// direction, speed, size, and a color picked from `palette`.
    pub fn spawn_burst(&mut self, origin: Point, palette: &[Rgba8]) {
        if palette.is_empty() {
            return;
        }
        let room = MAX_PARTICLES.saturating_sub(self.particles.len());
        let count = BURST_COUNT.min(room);
        if count < BURST_COUNT {
            debug!(live = self.particles.len(), "particle cap reached, truncating burst");
        }
        for _ in 0..count {
            let angle = self.rng.range(0.0, std::f64::consts::TAU);
            let speed = self.rng.range(SPEED_MIN, SPEED_MAX);
            self.particles.push(Particle {
                pos: origin,
                vel: Vec2::new(angle.cos() * speed, angle.sin() * speed),
                size: self.rng.range(SIZE_MIN, SIZE_MAX),
                color: palette[self.rng.index(palette.len())],
                life: 1.0,
            });
        }
    }

    /// One Euler tick: move, fall, fade, prune.
    pub fn step(&mut self) {
        for p in &mut self.particles {
            p.pos += p.vel;
            p.vel.y += GRAVITY;
            p.life -= LIFE_DECAY;
        }
        self.particles.retain(|p| p.life > 0.0);
    }

    pub fn render(&self, frame: &mut FrameRgba) {
        for p in &self.particles {
            let opacity = p.life.clamp(0.0, 1.0);
            raster::glow_disc(frame, p.pos, p.size * 2.5, p.color, opacity * 0.5);
            let star = star_points(p.pos, p.size);
            raster::fill_polygon(frame, &star, p.color, opacity);
        }
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

/// Five-pointed star: ten vertices alternating outer and inner radius,
/// one tip pointing up.
fn star_points(center: Point, size: f64) -> [Point; 10] {
    let inner = size * 0.45;
    let mut pts = [Point::ZERO; 10];
    for (i, slot) in pts.iter_mut().enumerate() {
        let r = if i % 2 == 0 { size } else { inner };
        let a = std::f64::consts::TAU * i as f64 / 10.0 - std::f64::consts::FRAC_PI_2;
        *slot = Point::new(center.x + r * a.cos(), center.y + r * a.sin());
    }
    pts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Canvas;

    #[test]
    fn burst_spawns_exact_count_at_full_life() {
        let mut sim = ParticleSim::new(7);
        sim.spawn_burst(Point::new(100.0, 100.0), &SPARKLE_PALETTE);
        assert_eq!(sim.len(), BURST_COUNT);
        assert!(sim.particles().iter().all(|p| p.life == 1.0));
    }

    #[test]
    fn two_bursts_make_forty() {
        let mut sim = ParticleSim::new(7);
        sim.spawn_burst(Point::new(80.0, 90.0), &SPARKLE_PALETTE);
        sim.spawn_burst(Point::new(120.0, 90.0), &SPARKLE_PALETTE);
        assert_eq!(sim.len(), 2 * BURST_COUNT);
    }

    #[test]
    fn speeds_and_sizes_stay_in_range() {
        let mut sim = ParticleSim::new(42);
        for _ in 0..10 {
            sim.spawn_burst(Point::new(0.0, 0.0), &EMBER_PALETTE);
        }
        for p in sim.particles() {
            let speed = p.vel.hypot();
            assert!((SPEED_MIN..=SPEED_MAX).contains(&speed), "speed {speed}");
            assert!((SIZE_MIN..=SIZE_MAX).contains(&p.size), "size {}", p.size);
        }
    }

    #[test]
    fn step_applies_gravity_and_decay() {
        let mut sim = ParticleSim::new(3);
        sim.spawn_burst(Point::new(50.0, 50.0), &SPARKLE_PALETTE);
        let vy_before: Vec<f64> = sim.particles().iter().map(|p| p.vel.y).collect();
        sim.step();
        for (p, vy) in sim.particles().iter().zip(vy_before) {
            assert!((p.vel.y - (vy + GRAVITY)).abs() < 1e-12);
            assert!((p.life - (1.0 - LIFE_DECAY)).abs() < 1e-12);
        }
    }

    #[test]
    fn particles_expire() {
        let mut sim = ParticleSim::new(3);
        sim.spawn_burst(Point::new(50.0, 50.0), &SPARKLE_PALETTE);
        for _ in 0..60 {
            sim.step();
        }
        assert!(sim.is_empty());
    }

    #[test]
    fn life_stays_in_unit_interval_while_alive() {
        let mut sim = ParticleSim::new(9);
        sim.spawn_burst(Point::new(10.0, 10.0), &SPARKLE_PALETTE);
        for _ in 0..55 {
            sim.step();
            for p in sim.particles() {
                assert!(p.life > 0.0 && p.life <= 1.0);
            }
        }
    }

    #[test]
    fn cap_truncates_burst() {
        let mut sim = ParticleSim::new(1);
        for _ in 0..(MAX_PARTICLES / BURST_COUNT) {
            sim.spawn_burst(Point::new(0.0, 0.0), &SPARKLE_PALETTE);
        }
        assert_eq!(sim.len(), MAX_PARTICLES);
        sim.spawn_burst(Point::new(0.0, 0.0), &SPARKLE_PALETTE);
        assert_eq!(sim.len(), MAX_PARTICLES);
    }

    #[test]
    fn offscreen_particles_render_without_panic() {
        let mut sim = ParticleSim::new(5);
        sim.spawn_burst(Point::new(-300.0, -300.0), &SPARKLE_PALETTE);
        let mut frame = FrameRgba::filled(Canvas::new(32, 32).unwrap(), Rgba8::rgb(0, 0, 0));
        sim.render(&mut frame);
    }
}
