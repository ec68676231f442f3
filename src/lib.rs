//! Hamiltonian Field - per-frame energy fields from a live video stream
//!
//! Every display tick a camera frame becomes a scalar field over an N×N grid.
//!
//! # Core Types
//!
//! - **HamiltonianEngine**: The per-tick pass and everything it retains
//! - **FieldCell**: Kinetic (T), potential (V), and total (H) energy of a cell
//! - **FrameAggregate**: Averages, peak, and bucket counts for one frame
//!
//! # Pipeline
//!
//! 1. **Sampler** - fixed-stride nearest-pixel selection from the S×S source
//! 2. **Field Computer** - V from brightness, T from change since last tick
//! 3. **Aggregator** - sums, first-occurrence maximum, low/med/high buckets
//! 4. **Color Mapper** - hue ramp from violet (still) to red (active)
//! 5. **Render Buffers** - depth = H·1.5 and RGB per cell for the renderer
//! 6. **Report** - fixed-layout status text for the status panel
//!
//! Field and aggregate are produced in the same scan. The previous tick's
//! samples are kept for the kinetic term and dropped on a resolution change,
//! so the first tick after construction, reset, or resize has T = 0.
//!
//! H is a derived diagnostic. Nothing is integrated and nothing is conserved.
//!
//! # Example
//!
//! ```rust
//! use hamiltonian_field::{EngineConfig, EngineEvent, FnObserver, HamiltonianEngine};
//! use std::sync::Arc;
//!
//! // 1. A 4×4 source sampled onto a 2×2 grid
//! let mut engine = HamiltonianEngine::new(EngineConfig::new(4, 2)).unwrap();
//!
//! // 2. The renderer listens for topology changes
//! engine.subscribe(Arc::new(FnObserver(|event: &EngineEvent| {
//!     if let EngineEvent::TopologyChanged { resolution, .. } = event {
//!         println!("rebuild point cloud at {}x{}", resolution, resolution);
//!     }
//! })));
//!
//! // 3. A white frame: no previous frame, so H = V = 10 everywhere
//! let white = vec![255u8; 4 * 4 * 4];
//! let aggregate = engine.submit_frame(&white).unwrap();
//! assert!((aggregate.avg_h - 10.0).abs() < 1e-5);
//! assert_eq!(aggregate.buckets.high, 4);
//!
//! // 4. The renderer reads depth and color, the panel reads the report
//! assert_eq!(engine.depth().len(), 4);
//! assert_eq!(engine.colors().len(), 12);
//! assert!(engine.latest_report().starts_with("SYSTEM STATE:"));
//!
//! // 5. A black frame: all of the energy is now kinetic
//! let black = vec![0u8; 4 * 4 * 4];
//! let aggregate = engine.submit_frame(&black).unwrap();
//! assert!((aggregate.avg_t - 10.0).abs() < 1e-5);
//! ```

mod aggregate;
mod color;
mod config;
mod engine;
mod error;
mod hamiltonian;
mod observer;
mod render;
mod report;
mod sampler;

pub use aggregate::{aggregate, Aggregator, Bucket, EnergyBuckets, FrameAggregate, GridOffset};
pub use color::{energy_color, energy_hue, hsl_to_rgb, Rgb};
pub use config::{
    BucketThresholds, EngineConfig, StateThresholds, DEFAULT_RESOLUTION, DEFAULT_SOURCE_SIZE,
    UI_RESOLUTION_RANGE, UI_RESOLUTION_STEP,
};
pub use engine::HamiltonianEngine;
pub use error::{EngineError, Result};
pub use hamiltonian::{compute_field, FieldCell, FIELD_SCALE, MAX_ENERGY};
pub use observer::{ChannelObserver, EngineEvent, EngineObserver, FnObserver};
pub use render::{Grid, RenderBuffers, DEPTH_SCALE};
pub use report::{StatsReport, SystemState, BAR_LENGTH};
pub use sampler::{mirror_horizontal, sample, sample_into, PixelFrame, SampledBrightness};
