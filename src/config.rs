//! Engine configuration

use crate::error::{EngineError, Result};
use std::ops::RangeInclusive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default capture/canvas edge length in pixels.
pub const DEFAULT_SOURCE_SIZE: usize = 256;

/// Default grid resolution (cells per axis).
pub const DEFAULT_RESOLUTION: usize = 256;

/// Resolution range offered by the reference slider.
///
/// The engine accepts any N >= 1; this is only a UI hint.
pub const UI_RESOLUTION_RANGE: RangeInclusive<usize> = 32..=256;

/// Slider step for [`UI_RESOLUTION_RANGE`].
pub const UI_RESOLUTION_STEP: usize = 16;

/// Cut-points partitioning cells into low/med/high energy buckets.
///
/// A cell is `low` if H < `low`, `high` if H >= `high`, `med` otherwise.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BucketThresholds {
    pub low: f32,
    pub high: f32,
}

impl BucketThresholds {
    /// Tight cut-points (3 / 8). The default.
    pub const TIGHT: Self = Self {
        low: 3.0,
        high: 8.0,
    };

    /// Wide cut-points (5 / 12).
    pub const WIDE: Self = Self {
        low: 5.0,
        high: 12.0,
    };

    /// Create thresholds, validating ordering.
    pub fn new(low: f32, high: f32) -> Result<Self> {
        let thresholds = Self { low, high };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Validate the cut-points.
    pub fn validate(&self) -> Result<()> {
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(EngineError::InvalidConfiguration(
                "bucket thresholds must be finite",
            ));
        }
        if self.low > self.high {
            return Err(EngineError::InvalidConfiguration(
                "low bucket threshold must be <= high threshold",
            ));
        }
        Ok(())
    }
}

impl Default for BucketThresholds {
    fn default() -> Self {
        Self::TIGHT
    }
}

/// Thresholds on frame averages that select the reported system state.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateThresholds {
    /// avgT above this reports high motion.
    pub motion: f32,
    /// avgV above this reports high energy concentration.
    pub energy: f32,
}

impl StateThresholds {
    /// Motion 0.8, energy 8.0. The default.
    pub const STRICT: Self = Self {
        motion: 0.8,
        energy: 8.0,
    };

    /// Motion 0.8, energy 5.0.
    pub const RELAXED: Self = Self {
        motion: 0.8,
        energy: 5.0,
    };

    pub fn validate(&self) -> Result<()> {
        if !self.motion.is_finite() || !self.energy.is_finite() {
            return Err(EngineError::InvalidConfiguration(
                "state thresholds must be finite",
            ));
        }
        Ok(())
    }
}

impl Default for StateThresholds {
    fn default() -> Self {
        Self::STRICT
    }
}

/// Configuration for a Hamiltonian field engine.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Edge length S of the square RGBA source buffer. Fixed for the
    /// engine's lifetime.
    pub source_size: usize,

    /// Grid resolution N (cells per axis).
    pub resolution: usize,

    /// Aggregator bucket cut-points.
    pub buckets: BucketThresholds,

    /// Report state-label thresholds.
    pub states: StateThresholds,
}

impl EngineConfig {
    /// Create a configuration with default thresholds.
    pub fn new(source_size: usize, resolution: usize) -> Self {
        Self {
            source_size,
            resolution,
            buckets: BucketThresholds::default(),
            states: StateThresholds::default(),
        }
    }

    pub fn with_buckets(mut self, buckets: BucketThresholds) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn with_states(mut self, states: StateThresholds) -> Self {
        self.states = states;
        self
    }

    /// Byte length of one RGBA source frame.
    pub fn frame_bytes(&self) -> usize {
        self.source_size * self.source_size * 4
    }

    /// Number of grid cells (N²).
    pub fn cell_count(&self) -> usize {
        self.resolution * self.resolution
    }

    /// Source pixels skipped between sampled cells.
    ///
    /// Zero when the grid is finer than the source.
    pub fn stride(&self) -> usize {
        self.source_size / self.resolution.max(1)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.source_size == 0 {
            return Err(EngineError::InvalidConfiguration(
                "source_size must be > 0",
            ));
        }
        if self.resolution == 0 {
            return Err(EngineError::InvalidConfiguration("resolution must be > 0"));
        }
        self.buckets.validate()?;
        self.states.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_SIZE, DEFAULT_RESOLUTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stride(), 1);
        assert_eq!(config.frame_bytes(), 256 * 256 * 4);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(EngineConfig::new(0, 16).validate().is_err());
        assert!(EngineConfig::new(16, 0).validate().is_err());
    }

    #[test]
    fn test_inverted_buckets_rejected() {
        assert!(BucketThresholds::new(8.0, 3.0).is_err());
        assert!(BucketThresholds::new(f32::NAN, 3.0).is_err());
        assert!(BucketThresholds::new(4.0, 4.0).is_ok());
    }

    #[test]
    fn test_stride_truncates() {
        assert_eq!(EngineConfig::new(256, 48).stride(), 5);
        assert_eq!(EngineConfig::new(4, 8).stride(), 0);
    }
}
