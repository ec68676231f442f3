//! Aggregator - single-pass frame statistics
//!
//! Consumes field cells in row-major scan order and accumulates sums, the
//! maximum H with its grid offset, and low/med/high bucket counts.

use crate::config::BucketThresholds;
use crate::hamiltonian::FieldCell;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Grid-space coordinate centered at the origin.
///
/// x = j − N/2, y = −(i − N/2): rows grow downward in the source but upward
/// in grid space. For odd N the exact vertex lands on a half step and is
/// rounded half up, so the offset names the nearest point of its vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridOffset {
    pub x: i32,
    pub y: i32,
}

impl GridOffset {
    /// Offset of cell (i, j) on an N×N grid.
    pub fn of(i: usize, j: usize, resolution: usize) -> Self {
        let half = resolution as f64 / 2.0;
        Self {
            x: round_half_up(j as f64 - half),
            y: round_half_up(half - i as f64),
        }
    }

    /// Offset of the cell at row-major `index`.
    pub fn of_index(index: usize, resolution: usize) -> Self {
        let n = resolution.max(1);
        Self::of(index / n, index % n, n)
    }
}

#[inline]
fn round_half_up(v: f64) -> i32 {
    (v + 0.5).floor() as i32
}

/// Energy bucket a cell falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Bucket {
    Low,
    Med,
    High,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Low, Bucket::Med, Bucket::High];

    /// Classify H against the cut-points.
    #[inline]
    pub fn classify(h: f32, thresholds: &BucketThresholds) -> Self {
        if h < thresholds.low {
            Bucket::Low
        } else if h >= thresholds.high {
            Bucket::High
        } else {
            Bucket::Med
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Low => "Low",
            Bucket::Med => "Med",
            Bucket::High => "High",
        }
    }
}

/// Per-bucket cell counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnergyBuckets {
    pub low: usize,
    pub med: usize,
    pub high: usize,
}

impl EnergyBuckets {
    #[inline]
    pub fn get(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Low => self.low,
            Bucket::Med => self.med,
            Bucket::High => self.high,
        }
    }

    #[inline]
    fn bump(&mut self, bucket: Bucket) {
        match bucket {
            Bucket::Low => self.low += 1,
            Bucket::Med => self.med += 1,
            Bucket::High => self.high += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.med + self.high
    }

    /// Share of cells in `bucket`, as a percentage of the total.
    pub fn percent(&self, bucket: Bucket) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.get(bucket) as f64 / total as f64 * 100.0
    }
}

/// Statistics for one processed frame.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameAggregate {
    /// Cells aggregated (N²).
    pub cell_count: usize,
    pub avg_h: f32,
    pub avg_t: f32,
    pub avg_v: f32,
    pub max_h: f32,
    /// Offset of the first cell reaching `max_h`.
    pub max_at: GridOffset,
    pub buckets: EnergyBuckets,
}

/// Running accumulator over one frame's cells.
#[derive(Clone, Debug)]
pub struct Aggregator {
    resolution: usize,
    thresholds: BucketThresholds,
    index: usize,
    sum_h: f64,
    sum_t: f64,
    sum_v: f64,
    max: Option<(f32, usize)>,
    buckets: EnergyBuckets,
}

impl Aggregator {
    pub fn new(resolution: usize, thresholds: BucketThresholds) -> Self {
        Self {
            resolution,
            thresholds,
            index: 0,
            sum_h: 0.0,
            sum_t: 0.0,
            sum_v: 0.0,
            max: None,
            buckets: EnergyBuckets::default(),
        }
    }

    /// Feed the next cell in scan order.
    #[inline]
    pub fn push(&mut self, cell: &FieldCell) {
        self.sum_h += cell.h as f64;
        self.sum_t += cell.t as f64;
        self.sum_v += cell.v as f64;

        // Strictly greater keeps the first occurrence on ties.
        match self.max {
            Some((max_h, _)) if cell.h <= max_h => {}
            _ => self.max = Some((cell.h, self.index)),
        }

        self.buckets
            .bump(Bucket::classify(cell.h, &self.thresholds));
        self.index += 1;
    }

    /// Close the frame and produce its aggregate.
    pub fn finish(self) -> FrameAggregate {
        let count = self.index;
        let mean = |sum: f64| {
            if count == 0 {
                0.0
            } else {
                (sum / count as f64) as f32
            }
        };
        let (max_h, max_index) = self.max.unwrap_or((0.0, 0));

        FrameAggregate {
            cell_count: count,
            avg_h: mean(self.sum_h),
            avg_t: mean(self.sum_t),
            avg_v: mean(self.sum_v),
            max_h,
            max_at: GridOffset::of_index(max_index, self.resolution),
            buckets: self.buckets,
        }
    }
}

/// Aggregate a complete field in one pass.
pub fn aggregate(
    cells: &[FieldCell],
    resolution: usize,
    thresholds: BucketThresholds,
) -> FrameAggregate {
    let mut agg = Aggregator::new(resolution, thresholds);
    for cell in cells {
        agg.push(cell);
    }
    agg.finish()
}
