//! Mapping between the bounded contrast/brightness values shown to the user
//! and the multiplicative factors applied to the rendered raster.

pub const DEFAULT: f64 = 50.0;
pub const MIN: f64 = 0.0;
pub const MAX: f64 = 100.0;
/// Screen pixels of pointer travel per unit of contrast or brightness.
pub const SENSITIVITY: f64 = 10.0;

// Keeps the upper half of the range away from its pole at MAX.
const MAX_NORMALIZED: f64 = 0.999_999;

pub fn clamp(v: f64) -> f64 {
    v.clamp(MIN, MAX)
}

fn normalize(v: f64, min: f64, max: f64) -> f64 {
    (v - min) / (max - min)
}

/// The lower half of the range maps linearly onto `0..1`, the upper half
/// onto `1..infinity`.
pub fn to_factor(v: f64) -> f64 {
    if v < DEFAULT {
        return normalize(v, MIN, DEFAULT);
    }
    1.0 / (1.0 - normalize(v, DEFAULT, MAX).min(MAX_NORMALIZED))
}

/// `contrast(c) brightness(b)` display filter, evaluated in that order with
/// every intermediate clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayFilter {
    pub contrast: f64,
    pub brightness: f64,
}

impl Default for DisplayFilter {
    fn default() -> Self {
        Self {
            contrast: 1.0,
            brightness: 1.0,
        }
    }
}

impl DisplayFilter {
    pub fn from_values(contrast: f64, brightness: f64) -> Self {
        Self {
            contrast: to_factor(contrast),
            brightness: to_factor(brightness),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.contrast == 1.0 && self.brightness == 1.0
    }

    pub fn apply(&self, value: u8) -> u8 {
        let v = value as f64 / 255.0;
        let v = ((v - 0.5) * self.contrast + 0.5).clamp(0.0, 1.0);
        let v = (v * self.brightness).clamp(0.0, 1.0);
        (v * 255.0).round() as u8
    }

    /// Lookup table of [`DisplayFilter::apply`] for every 8-bit value.
    pub fn lut(&self) -> [u8; 256] {
        let mut lut = [0; 256];
        for (value, out) in lut.iter_mut().enumerate() {
            *out = self.apply(value as u8);
        }
        lut
    }
}
