/// Deterministic xorshift32 generator for visual noise (particle velocities,
/// sizes, palette picks). Not suitable for anything security-sensitive.
#[derive(Clone, Copy, Debug)]
pub(crate) struct XorShift32(u32);

impl XorShift32 {
    pub(crate) fn from_seed(seed: u32) -> Self {
        // A zero state would be a fixed point; force at least one bit.
        Self(seed | 1)
    }

    pub(crate) fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Uniform in [0, 1).
    pub(crate) fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32() >> 8) / f64::from(1u32 << 24)
    }

    /// Uniform in [min, max).
    pub(crate) fn range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }

    /// Uniform index in [0, len). `len` must be > 0.
    pub(crate) fn index(&mut self, len: usize) -> usize {
        (self.next_f64() * len as f64) as usize % len
    }
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}
