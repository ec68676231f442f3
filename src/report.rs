//! Stats Snapshot Formatter - fixed-layout status text for one frame

use crate::aggregate::{Bucket, FrameAggregate};
use crate::config::StateThresholds;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Width of each distribution bar, in characters.
pub const BAR_LENGTH: usize = 12;

const BAR_GLYPH: char = '█';
const RULE: &str = "---------------------------------";

/// Headline state derived from frame averages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SystemState {
    #[default]
    Stable,
    HighMotion,
    HighEnergy,
}

impl SystemState {
    /// Motion wins over energy.
    pub fn classify(avg_t: f32, avg_v: f32, thresholds: &StateThresholds) -> Self {
        if avg_t > thresholds.motion {
            SystemState::HighMotion
        } else if avg_v > thresholds.energy {
            SystemState::HighEnergy
        } else {
            SystemState::Stable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SystemState::Stable => "System Stable",
            SystemState::HighMotion => "High Motion Detected!",
            SystemState::HighEnergy => "High Energy Concentration",
        }
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bar of `BAR_LENGTH` scale for a percentage, rounded to whole segments.
pub fn bar(percent: f64) -> String {
    let segments = ((percent / 100.0) * BAR_LENGTH as f64).round();
    let segments = (segments.max(0.0) as usize).min(BAR_LENGTH);
    std::iter::repeat(BAR_GLYPH).take(segments).collect()
}

/// Round to `digits` decimals with ties going up, so `{:.N}` never sees a
/// tie (the formatter would send it to even).
fn round_half_up(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale + 0.5).floor() / scale
}

/// One frame's status report.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsReport<'a> {
    pub frame: u64,
    pub state: SystemState,
    pub aggregate: &'a FrameAggregate,
}

impl<'a> StatsReport<'a> {
    pub fn new(frame: u64, aggregate: &'a FrameAggregate, thresholds: &StateThresholds) -> Self {
        Self {
            frame,
            state: SystemState::classify(aggregate.avg_t, aggregate.avg_v, thresholds),
            aggregate,
        }
    }
}

impl fmt::Display for StatsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let agg = self.aggregate;
        writeln!(f, "SYSTEM STATE: {}", self.state)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Frame: {}", self.frame)?;
        writeln!(
            f,
            "Avg H: {:.3} | Max H: {:.3}",
            round_half_up(agg.avg_h as f64, 3),
            round_half_up(agg.max_h as f64, 3)
        )?;
        writeln!(f, "Peak H at: (x:{}, y:{})", agg.max_at.x, agg.max_at.y)?;
        writeln!(f, "{}", RULE)?;
        write!(f, "Energy Distribution:")?;

        for bucket in Bucket::ALL {
            let percent = agg.buckets.percent(bucket);
            let label = format!("{}:", bucket.label());
            write!(
                f,
                "\n{:<6}[{:<width$}] {:.1}%",
                label,
                bar(percent),
                round_half_up(percent, 1),
                width = BAR_LENGTH
            )?;
        }
        Ok(())
    }
}
