//! Color Mapper - H to a hue ramp
//!
//! Hue runs from 0.7 (blue/violet, still) down to 0.0 (red, active) as H goes
//! from 0 to 20, at full saturation and half lightness.

use crate::hamiltonian::MAX_ENERGY;

/// Hue at H = 0.
pub const COLD_HUE: f32 = 0.7;

pub const SATURATION: f32 = 1.0;
pub const LIGHTNESS: f32 = 0.5;

/// RGB triple straight from the HSL conversion, each channel in [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Hue for an energy value. Strictly decreasing in H.
#[inline]
pub fn energy_hue(h: f32) -> f32 {
    COLD_HUE - (h / MAX_ENERGY) * COLD_HUE
}

/// Display color for an energy value.
#[inline]
pub fn energy_color(h: f32) -> Rgb {
    hsl_to_rgb(energy_hue(h), SATURATION, LIGHTNESS)
}

/// Standard HSL to RGB. Hue wraps into [0, 1); s and l are clamped.
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Rgb {
    let h = hue.rem_euclid(1.0);
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    if s == 0.0 {
        return Rgb { r: l, g: l, b: l };
    }

    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    Rgb {
        r: hue_to_channel(p, q, h + 1.0 / 3.0),
        g: hue_to_channel(p, q, h),
        b: hue_to_channel(p, q, h - 1.0 / 3.0),
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = if t < 0.0 {
        t + 1.0
    } else if t > 1.0 {
        t - 1.0
    } else {
        t
    };

    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}
