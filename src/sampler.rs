//! Sampler - maps a square RGBA source onto the N×N grid
//!
//! Fixed-stride nearest-pixel selection. With `stride = S / N`, cell (i, j)
//! reads source pixel (x = j·stride, y = i·stride). When N does not divide S
//! the trailing `S mod stride` columns and rows are never read. When N > S the
//! stride is zero and every cell aliases pixel (0, 0).

use crate::error::{EngineError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bytes per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Borrowed view of one S×S RGBA frame.
#[derive(Clone, Copy, Debug)]
pub struct PixelFrame<'a> {
    pixels: &'a [u8],
    size: usize,
}

impl<'a> PixelFrame<'a> {
    /// Wrap a raw buffer. Fails unless it holds exactly `size²` RGBA pixels.
    pub fn new(pixels: &'a [u8], size: usize) -> Result<Self> {
        let expected = size * size * CHANNELS;
        if pixels.len() != expected {
            return Err(EngineError::FrameSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { pixels, size })
    }

    /// Edge length in pixels.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Mean of R, G, B at (x, y). Alpha is ignored.
    #[inline]
    pub fn brightness(&self, x: usize, y: usize) -> f32 {
        let base = (y * self.size + x) * CHANNELS;
        let rgb = &self.pixels[base..base + 3];
        (rgb[0] as f32 + rgb[1] as f32 + rgb[2] as f32) / 3.0
    }
}

/// N×N brightness samples in [0, 255], row-major.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SampledBrightness {
    values: Vec<f32>,
    resolution: usize,
}

impl SampledBrightness {
    /// Zero-filled samples for an N×N grid.
    pub fn new(resolution: usize) -> Self {
        Self {
            values: vec![0.0; resolution * resolution],
            resolution,
        }
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.resolution + j]
    }

    /// Whether these samples cover an N×N grid.
    #[inline]
    pub fn matches(&self, resolution: usize) -> bool {
        self.resolution == resolution
    }
}

/// Sample `frame` onto an N×N grid, reusing `out`'s allocation.
pub fn sample_into(frame: &PixelFrame<'_>, resolution: usize, out: &mut SampledBrightness) {
    let stride = frame.size() / resolution.max(1);

    out.resolution = resolution;
    out.values.clear();
    out.values.reserve(resolution * resolution);

    for i in 0..resolution {
        let y = i * stride;
        for j in 0..resolution {
            out.values.push(frame.brightness(j * stride, y));
        }
    }
}

/// Sample `frame` onto a fresh N×N grid.
pub fn sample(frame: &PixelFrame<'_>, resolution: usize) -> SampledBrightness {
    let mut out = SampledBrightness::default();
    sample_into(frame, resolution, &mut out);
    out
}

/// Mirror an S×S RGBA buffer left-to-right in place.
///
/// Capture collaborators submit mirrored frames so the field reads like a
/// mirror image of the viewer.
pub fn mirror_horizontal(pixels: &mut [u8], size: usize) -> Result<()> {
    let expected = size * size * CHANNELS;
    if pixels.len() != expected {
        return Err(EngineError::FrameSizeMismatch {
            expected,
            actual: pixels.len(),
        });
    }
    if size == 0 {
        return Ok(());
    }

    for row in pixels.chunks_exact_mut(size * CHANNELS) {
        for x in 0..size / 2 {
            let mirror = size - 1 - x;
            for c in 0..CHANNELS {
                row.swap(x * CHANNELS + c, mirror * CHANNELS + c);
            }
        }
    }
    Ok(())
}
