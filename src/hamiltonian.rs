//! Field Computer - per-cell kinetic, potential, and total energy
//!
//! V = (b / 255)·10, T = (|b − b_prev| / 255)·10, H = T + V.
//!
//! Each cell depends only on its own current and previous brightness, so
//! V and T land in [0, 10] and H in [0, 20] for brightness in [0, 255].
//! H is a per-frame diagnostic; nothing is integrated or conserved.

use crate::sampler::SampledBrightness;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scale applied to normalized brightness for both T and V.
pub const FIELD_SCALE: f32 = 10.0;

/// Upper bound of H.
pub const MAX_ENERGY: f32 = 2.0 * FIELD_SCALE;

const MAX_BRIGHTNESS: f32 = 255.0;

/// Energy terms of one grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldCell {
    /// Kinetic term (frame-to-frame change).
    pub t: f32,
    /// Potential term (current brightness).
    pub v: f32,
    /// Total, T + V.
    pub h: f32,
}

impl FieldCell {
    /// Compute a cell. `previous = None` means no valid delta, so T = 0.
    #[inline]
    pub fn compute(current: f32, previous: Option<f32>) -> Self {
        let v = (current / MAX_BRIGHTNESS) * FIELD_SCALE;
        let t = previous
            .map(|prev| ((current - prev).abs() / MAX_BRIGHTNESS) * FIELD_SCALE)
            .unwrap_or(0.0);
        Self { t, v, h: t + v }
    }
}

/// Compute the whole field in row-major scan order, handing each cell to
/// `emit` as it is produced.
///
/// `previous` is ignored unless it has the same shape as `current`.
pub fn compute_field(
    current: &SampledBrightness,
    previous: Option<&SampledBrightness>,
    mut emit: impl FnMut(FieldCell),
) {
    match previous.filter(|p| p.matches(current.resolution())) {
        Some(prev) => {
            for (&b, &p) in current.values().iter().zip(prev.values()) {
                emit(FieldCell::compute(b, Some(p)));
            }
        }
        None => {
            for &b in current.values() {
                emit(FieldCell::compute(b, None));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{sample, PixelFrame};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_terms_stay_in_range() {
        for current in (0..=255).step_by(5) {
            for previous in (0..=255).step_by(5) {
                let cell = FieldCell::compute(current as f32, Some(previous as f32));
                assert!((0.0..=FIELD_SCALE).contains(&cell.v));
                assert!((0.0..=FIELD_SCALE).contains(&cell.t));
                assert!((0.0..=MAX_ENERGY).contains(&cell.h));
                assert_abs_diff_eq!(cell.h, cell.t + cell.v);
            }
        }
    }

    #[test]
    fn test_absent_previous_zeroes_kinetic() {
        let cell = FieldCell::compute(255.0, None);
        assert_eq!(cell.t, 0.0);
        assert_abs_diff_eq!(cell.v, 10.0);
        assert_abs_diff_eq!(cell.h, 10.0);
    }

    #[test]
    fn test_brightness_is_not_requantized() {
        let cell = FieldCell::compute(127.5, Some(0.0));
        assert_abs_diff_eq!(cell.v, 5.0, epsilon = 1e-5);
        assert_abs_diff_eq!(cell.t, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_shape_mismatch_treated_as_absent() {
        let big = vec![255u8; 4 * 4 * 4];
        let frame = PixelFrame::new(&big, 4).unwrap();
        let current = sample(&frame, 2);
        let stale = sample(&frame, 4);

        let mut out = Vec::new();
        compute_field(&current, Some(&stale), |cell| out.push(cell));

        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|c| c.t == 0.0 && c.v == 10.0));
    }
}
