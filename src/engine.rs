//! Hamiltonian Engine - the per-tick pass and its retained state
//!
//! One call to [`HamiltonianEngine::submit_frame`] runs the whole pass to
//! completion: sample, compute the field while aggregating, color, write the
//! render buffers, format the report. The sampled brightness is then swapped
//! into the `previous` slot for the next tick.

use crate::aggregate::{Aggregator, FrameAggregate};
use crate::config::{BucketThresholds, EngineConfig, StateThresholds};
use crate::error::{EngineError, Result};
use crate::hamiltonian::{compute_field, FieldCell};
use crate::observer::{EngineEvent, EngineObserver};
use crate::render::{Grid, RenderBuffers};
use crate::report::{StatsReport, SystemState};
use crate::sampler::{sample_into, PixelFrame, SampledBrightness};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// The field engine.
///
/// Owns the grid, both brightness generations, the field, and the render
/// buffers for the active resolution. Borrows each pixel frame only for the
/// duration of one pass.
pub struct HamiltonianEngine {
    /// Configuration (resolution and thresholds track reconfiguration).
    config: EngineConfig,

    /// Active topology.
    grid: Grid,

    /// Samples being filled by the current pass.
    current: SampledBrightness,

    /// Samples from the last completed pass. `None` after construction,
    /// reset, or a resolution change.
    previous: Option<SampledBrightness>,

    /// Field of the last completed pass.
    cells: Vec<FieldCell>,

    /// Output arrays for the renderer.
    buffers: RenderBuffers,

    /// Set when topology changed and the renderer has not re-read it.
    geometry_dirty: bool,

    /// Completed passes since construction or reset.
    frame_count: u64,

    /// Aggregate of the last completed pass.
    latest: Option<FrameAggregate>,

    /// Report of the last completed pass.
    report: String,

    /// State label of the last completed pass.
    state: SystemState,

    /// Subscribers.
    observers: Vec<Arc<dyn EngineObserver>>,
}

impl HamiltonianEngine {
    /// Create an engine. Fails if the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let grid = Grid::new(config.resolution);
        info!(
            source_size = config.source_size,
            resolution = config.resolution,
            "hamiltonian engine created"
        );
        warn_if_aliasing(&config);

        Ok(Self {
            current: SampledBrightness::new(grid.resolution()),
            previous: None,
            cells: Vec::with_capacity(grid.cell_count()),
            buffers: RenderBuffers::new(grid),
            geometry_dirty: true,
            frame_count: 0,
            latest: None,
            report: String::new(),
            state: SystemState::default(),
            observers: Vec::new(),
            grid,
            config,
        })
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Run one full pass over an S×S RGBA frame.
    ///
    /// Fails with a frame size mismatch unless `pixels` holds exactly
    /// S·S·4 bytes; nothing is truncated or padded and engine state is
    /// left untouched.
    pub fn submit_frame(&mut self, pixels: &[u8]) -> Result<&FrameAggregate> {
        let frame = match PixelFrame::new(pixels, self.config.source_size) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "rejected frame");
                return Err(err);
            }
        };

        let resolution = self.grid.resolution();
        sample_into(&frame, resolution, &mut self.current);

        let mut aggregator = Aggregator::new(resolution, self.config.buckets);
        self.cells.clear();
        let cells = &mut self.cells;
        compute_field(&self.current, self.previous.as_ref(), |cell| {
            aggregator.push(&cell);
            cells.push(cell);
        });
        let aggregate = aggregator.finish();

        self.buffers.write(&self.cells);

        let frame_index = self.frame_count;
        self.frame_count += 1;

        let report = StatsReport::new(frame_index, &aggregate, &self.config.states);
        let previous_state = std::mem::replace(&mut self.state, report.state);
        self.report = report.to_string();

        // Double buffer: this pass's samples become `previous`, the old
        // `previous` allocation is recycled for the next pass.
        let spent = self.previous.take().unwrap_or_default();
        self.previous = Some(std::mem::replace(&mut self.current, spent));

        trace!(
            frame = frame_index,
            avg_h = aggregate.avg_h,
            max_h = aggregate.max_h,
            "frame processed"
        );

        if previous_state != self.state {
            debug!(from = %previous_state, to = %self.state, "system state changed");
            self.publish(EngineEvent::StateChanged {
                from: previous_state,
                to: self.state,
            });
        }
        if !self.observers.is_empty() {
            self.publish(EngineEvent::FrameProcessed {
                frame: frame_index,
                aggregate: aggregate.clone(),
            });
        }

        Ok(&*self.latest.insert(aggregate))
    }

    // =========================================================================
    // RECONFIGURATION
    // =========================================================================

    /// Change the grid resolution.
    ///
    /// Replaces the grid and render buffers, drops the previous samples so
    /// the next pass has T = 0, and raises the geometry-dirty flag. Setting
    /// the current resolution again is a no-op.
    pub fn set_resolution(&mut self, resolution: usize) -> Result<()> {
        if resolution == 0 {
            return Err(EngineError::InvalidConfiguration("resolution must be > 0"));
        }
        if resolution == self.grid.resolution() {
            return Ok(());
        }

        let old = self.grid.resolution();
        let grid = Grid::new(resolution);

        self.config.resolution = resolution;
        self.grid = grid;
        self.buffers = RenderBuffers::new(grid);
        self.cells = Vec::with_capacity(grid.cell_count());
        self.current = SampledBrightness::new(resolution);
        self.previous = None;
        self.geometry_dirty = true;

        info!(
            from = old,
            to = resolution,
            cells = grid.cell_count(),
            "grid resolution changed"
        );
        warn_if_aliasing(&self.config);

        self.publish(EngineEvent::TopologyChanged {
            resolution,
            cell_count: grid.cell_count(),
        });
        Ok(())
    }

    /// Set the aggregator's low/high bucket cut-points.
    pub fn set_bucket_thresholds(&mut self, low: f32, high: f32) -> Result<()> {
        self.config.buckets = BucketThresholds::new(low, high)?;
        debug!(low, high, "bucket thresholds changed");
        Ok(())
    }

    /// Set the report's motion/energy state thresholds.
    pub fn set_state_thresholds(&mut self, states: StateThresholds) -> Result<()> {
        states.validate()?;
        self.config.states = states;
        debug!(motion = states.motion, energy = states.energy, "state thresholds changed");
        Ok(())
    }

    /// Forget history: previous samples, frame counter, last aggregate and
    /// report. Topology and thresholds are kept.
    pub fn reset(&mut self) {
        self.previous = None;
        self.frame_count = 0;
        self.latest = None;
        self.report.clear();
        self.state = SystemState::default();
        debug!("engine reset");
    }

    // =========================================================================
    // OBSERVERS
    // =========================================================================

    /// Subscribe an observer to engine events.
    pub fn subscribe(&mut self, observer: Arc<dyn EngineObserver>) {
        self.observers.push(observer);
    }

    fn publish(&self, event: EngineEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }

    // =========================================================================
    // RENDERER OUTPUT
    // =========================================================================

    /// Whether the renderer must re-read grid topology.
    pub fn geometry_dirty(&self) -> bool {
        self.geometry_dirty
    }

    /// Renderer has re-read topology; clear the dirty flag.
    pub fn acknowledge_geometry(&mut self) {
        self.geometry_dirty = false;
    }

    pub fn render_buffers(&self) -> &RenderBuffers {
        &self.buffers
    }

    /// H·1.5 per cell, row-major.
    pub fn depth(&self) -> &[f32] {
        self.buffers.depth()
    }

    /// RGB triples per cell, row-major.
    pub fn colors(&self) -> &[f32] {
        self.buffers.colors()
    }

    /// (x, y, depth) per cell, row-major.
    pub fn positions(&self) -> &[f32] {
        self.buffers.positions()
    }

    // =========================================================================
    // METRICS
    // =========================================================================

    /// Formatted status report of the last pass (empty before the first).
    pub fn latest_report(&self) -> &str {
        &self.report
    }

    pub fn latest_aggregate(&self) -> Option<&FrameAggregate> {
        self.latest.as_ref()
    }

    /// Field of the last pass, row-major.
    pub fn cells(&self) -> &[FieldCell] {
        &self.cells
    }

    /// Brightness samples of the last pass.
    pub fn brightness(&self) -> Option<&SampledBrightness> {
        self.previous.as_ref()
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn resolution(&self) -> usize {
        self.grid.resolution()
    }

    pub fn source_size(&self) -> usize {
        self.config.source_size
    }

    /// Completed passes since construction or reset.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl fmt::Debug for HamiltonianEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HamiltonianEngine")
            .field("config", &self.config)
            .field("frame_count", &self.frame_count)
            .field("has_previous", &self.previous.is_some())
            .field("geometry_dirty", &self.geometry_dirty)
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}

fn warn_if_aliasing(config: &EngineConfig) {
    if config.resolution > config.source_size {
        warn!(
            source_size = config.source_size,
            resolution = config.resolution,
            "resolution exceeds source size; cells alias the origin pixel"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::GridOffset;
    use crate::observer::{ChannelObserver, FnObserver};
    use approx::assert_abs_diff_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    fn uniform(size: usize, value: u8) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size * size * 4);
        for _ in 0..size * size {
            buf.extend_from_slice(&[value, value, value, 255]);
        }
        buf
    }

    fn set_pixel(buf: &mut [u8], size: usize, x: usize, y: usize, value: u8) {
        let base = (y * size + x) * 4;
        buf[base..base + 3].copy_from_slice(&[value; 3]);
    }

    fn engine(source_size: usize, resolution: usize) -> HamiltonianEngine {
        HamiltonianEngine::new(EngineConfig::new(source_size, resolution)).unwrap()
    }

    #[test]
    fn test_new_engine() {
        let engine = engine(256, 128);
        assert_eq!(engine.resolution(), 128);
        assert_eq!(engine.depth().len(), 128 * 128);
        assert_eq!(engine.frame_count(), 0);
        assert!(engine.geometry_dirty());
        assert!(engine.latest_aggregate().is_none());
        assert_eq!(engine.latest_report(), "");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = HamiltonianEngine::new(EngineConfig::new(4, 0)).unwrap_err();
        assert!(err.is_invalid_configuration());
    }

    #[test]
    fn test_bright_then_dark_scenario() {
        let mut engine = engine(4, 2);

        let first = engine.submit_frame(&uniform(4, 255)).unwrap().clone();
        for cell in engine.cells() {
            assert_eq!(cell.t, 0.0);
            assert_abs_diff_eq!(cell.v, 10.0);
            assert_abs_diff_eq!(cell.h, 10.0);
        }

        let second = engine.submit_frame(&uniform(4, 0)).unwrap().clone();
        for cell in engine.cells() {
            assert_eq!(cell.v, 0.0);
            assert_abs_diff_eq!(cell.t, 10.0);
            assert_abs_diff_eq!(cell.h, 10.0);
        }

        assert_abs_diff_eq!(first.avg_h, 10.0);
        assert_abs_diff_eq!(second.avg_h, 10.0);
        assert_eq!(first.max_at, GridOffset { x: -1, y: 1 });
        assert_eq!(first.max_at, second.max_at);
        assert_eq!(engine.depth(), &[15.0; 4]);
    }

    #[test]
    fn test_first_tick_has_no_motion() {
        let mut buf = uniform(8, 0);
        set_pixel(&mut buf, 8, 3, 5, 200);
        let mut engine = engine(8, 8);

        let agg = engine.submit_frame(&buf).unwrap();
        assert_eq!(agg.avg_t, 0.0);
        assert!(engine.cells().iter().all(|c| c.t == 0.0));
    }

    #[test]
    fn test_same_frame_twice_is_still() {
        let mut buf = uniform(16, 40);
        set_pixel(&mut buf, 16, 7, 2, 250);
        let mut engine = engine(16, 8);

        engine.submit_frame(&buf).unwrap();
        let agg = engine.submit_frame(&buf).unwrap();

        assert_eq!(agg.avg_t, 0.0);
        assert!(engine.cells().iter().all(|c| c.t == 0.0));
    }

    #[test]
    fn test_resolution_change_rebuilds() {
        let mut engine = engine(256, 128);
        engine.submit_frame(&uniform(256, 0)).unwrap();
        engine.acknowledge_geometry();
        assert!(!engine.geometry_dirty());

        engine.set_resolution(64).unwrap();
        assert!(engine.geometry_dirty());
        assert_eq!(engine.depth().len(), 4096);
        assert_eq!(engine.colors().len(), 4096 * 3);
        assert_eq!(engine.config().resolution, 64);
        engine.acknowledge_geometry();

        // Brightness changed, but there is no valid previous for one tick.
        let agg = engine.submit_frame(&uniform(256, 255)).unwrap();
        assert_eq!(agg.cell_count, 4096);
        assert_eq!(agg.avg_t, 0.0);

        let agg = engine.submit_frame(&uniform(256, 0)).unwrap();
        assert_abs_diff_eq!(agg.avg_t, 10.0);
        assert!(!engine.geometry_dirty());
    }

    #[test]
    fn test_same_resolution_is_noop() {
        let mut engine = engine(16, 8);
        engine.submit_frame(&uniform(16, 10)).unwrap();
        engine.acknowledge_geometry();

        engine.set_resolution(8).unwrap();
        assert!(!engine.geometry_dirty());
        assert!(engine.brightness().is_some());
        assert!(engine.set_resolution(0).is_err());
    }

    #[test]
    fn test_single_outlier_lands_high() {
        let size = 8;
        let mut buf = uniform(size, 0);
        set_pixel(&mut buf, size, 5, 2, 255);
        let mut engine = engine(size, size);

        // Outlier still against its own previous frame: H = V = 10.
        engine.submit_frame(&buf).unwrap();
        let agg = engine.submit_frame(&buf).unwrap();
        assert_eq!(agg.buckets.high, 1);
        assert_eq!(agg.buckets.low, size * size - 1);
        assert_abs_diff_eq!(agg.max_h, 10.0);
        assert_eq!(agg.max_at, GridOffset::of(2, 5, size));
        assert_eq!(agg.max_at, GridOffset { x: 1, y: 2 });

        // Outlier appearing over a dark previous frame: H = T + V = 20.
        engine.reset();
        engine.submit_frame(&uniform(size, 0)).unwrap();
        let agg = engine.submit_frame(&buf).unwrap();
        assert_eq!(agg.buckets.high, 1);
        assert_abs_diff_eq!(agg.max_h, 20.0);
        assert_eq!(agg.max_at, GridOffset { x: 1, y: 2 });
    }

    #[test]
    fn test_tie_break_prefers_scan_order() {
        let size = 4;
        let mut buf = uniform(size, 0);
        set_pixel(&mut buf, size, 3, 2, 180);
        set_pixel(&mut buf, size, 1, 1, 180);
        set_pixel(&mut buf, size, 2, 3, 180);
        let mut engine = engine(size, size);

        let agg = engine.submit_frame(&buf).unwrap();
        // Row 1 comes before rows 2 and 3.
        assert_eq!(agg.max_at, GridOffset::of(1, 1, size));
    }

    #[test]
    fn test_bucket_counts_cover_grid() {
        let size = 32;
        let mut buf = Vec::with_capacity(size * size * 4);
        for k in 0..size * size {
            let v = (k * 7 % 256) as u8;
            buf.extend_from_slice(&[v, v / 2, 255 - v, 255]);
        }
        let mut engine = engine(size, 16);

        engine.submit_frame(&uniform(size, 90)).unwrap();
        let agg = engine.submit_frame(&buf).unwrap();
        assert_eq!(agg.buckets.total(), 16 * 16);

        engine.set_bucket_thresholds(5.0, 12.0).unwrap();
        let agg = engine.submit_frame(&buf).unwrap();
        assert_eq!(agg.buckets.total(), 16 * 16);
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let mut engine = engine(4, 2);
        // H = 10 everywhere on the first tick.
        engine.set_bucket_thresholds(11.0, 15.0).unwrap();
        let agg = engine.submit_frame(&uniform(4, 255)).unwrap();
        assert_eq!(agg.buckets.low, 4);

        assert!(engine.set_bucket_thresholds(9.0, 1.0).is_err());
        assert_eq!(engine.config().buckets, BucketThresholds::new(11.0, 15.0).unwrap());
    }

    #[test]
    fn test_frame_size_mismatch_leaves_state() {
        let mut engine = engine(4, 2);
        engine.submit_frame(&uniform(4, 100)).unwrap();

        let err = engine.submit_frame(&uniform(5, 100)).unwrap_err();
        assert_eq!(
            err,
            EngineError::FrameSizeMismatch {
                expected: 64,
                actual: 100
            }
        );
        assert!(err.is_invalid_configuration());
        assert_eq!(engine.frame_count(), 1);
    }

    #[test]
    fn test_report_tracks_frames_and_state() {
        let mut engine = engine(4, 2);
        engine.submit_frame(&uniform(4, 255)).unwrap();
        assert!(engine.latest_report().starts_with("SYSTEM STATE: High Energy Concentration"));
        assert!(engine.latest_report().contains("Frame: 0\n"));
        assert_eq!(engine.state(), SystemState::HighEnergy);

        engine.submit_frame(&uniform(4, 0)).unwrap();
        assert!(engine.latest_report().starts_with("SYSTEM STATE: High Motion Detected!"));
        assert!(engine.latest_report().contains("Frame: 1\n"));
        assert!(engine.latest_report().contains("High: [████████████] 100.0%"));

        engine.submit_frame(&uniform(4, 0)).unwrap();
        assert_eq!(engine.state(), SystemState::Stable);
    }

    #[test]
    fn test_reset_drops_history() {
        let mut engine = engine(4, 2);
        engine.submit_frame(&uniform(4, 255)).unwrap();
        engine.reset();

        assert_eq!(engine.frame_count(), 0);
        assert!(engine.latest_aggregate().is_none());
        assert!(engine.brightness().is_none());

        let agg = engine.submit_frame(&uniform(4, 0)).unwrap();
        assert_eq!(agg.avg_t, 0.0);
    }

    #[test]
    fn test_colors_follow_energy() {
        let mut engine = engine(4, 2);
        engine.submit_frame(&uniform(4, 0)).unwrap();
        let cold = crate::color::energy_color(0.0).to_array();
        assert_eq!(&engine.colors()[0..3], &cold);
        assert_eq!(engine.positions()[2], 0.0);
    }

    #[test]
    fn test_observers_receive_events() {
        let (tx, rx) = mpsc::channel();
        let frames = Arc::new(AtomicUsize::new(0));
        let counter = frames.clone();

        let mut engine = engine(4, 2);
        engine.subscribe(Arc::new(ChannelObserver::new(tx)));
        engine.subscribe(Arc::new(FnObserver(move |event: &EngineEvent| {
            if matches!(event, EngineEvent::FrameProcessed { .. }) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })));

        engine.submit_frame(&uniform(4, 10)).unwrap();
        engine.set_resolution(4).unwrap();
        engine.submit_frame(&uniform(4, 10)).unwrap();

        let events: Vec<EngineEvent> = rx.try_iter().collect();
        assert!(matches!(events[0], EngineEvent::FrameProcessed { frame: 0, .. }));
        assert_eq!(
            events[1],
            EngineEvent::TopologyChanged {
                resolution: 4,
                cell_count: 16
            }
        );
        assert!(matches!(events[2], EngineEvent::FrameProcessed { frame: 1, .. }));
        assert_eq!(frames.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_odd_resolution_peak_matches_vertex() {
        let size = 5;
        let mut buf = uniform(size, 0);
        set_pixel(&mut buf, size, 0, 0, 255);
        let mut engine = engine(size, size);

        let max_at = engine.submit_frame(&buf).unwrap().max_at;
        let (x, y) = engine.grid().vertex(0, 0);

        assert_eq!((x, y), (-2.5, 2.5));
        assert_eq!(max_at, GridOffset { x: -2, y: 3 });
        assert!(engine.latest_report().contains("Peak H at: (x:-2, y:3)"));
    }

    #[test]
    fn test_state_thresholds_and_transitions() {
        let (tx, rx) = mpsc::channel();
        let mut engine = engine(4, 2);
        engine.subscribe(Arc::new(ChannelObserver::new(tx)));

        // avgV ~6.5 sits between the relaxed and strict energy thresholds.
        let mid = uniform(4, 166);
        let dark = uniform(4, 0);

        engine.submit_frame(&mid).unwrap();
        engine.submit_frame(&mid).unwrap();
        assert_eq!(engine.state(), SystemState::Stable);

        engine.submit_frame(&dark).unwrap();
        assert_eq!(engine.state(), SystemState::HighMotion);
        engine.submit_frame(&dark).unwrap();
        engine.submit_frame(&dark).unwrap();
        assert_eq!(engine.state(), SystemState::Stable);

        assert!(engine
            .set_state_thresholds(StateThresholds {
                motion: f32::NAN,
                energy: 5.0
            })
            .is_err());
        engine.set_state_thresholds(StateThresholds::RELAXED).unwrap();
        assert_eq!(engine.config().states, StateThresholds::RELAXED);

        engine.reset();
        engine.submit_frame(&mid).unwrap();
        assert_eq!(engine.state(), SystemState::HighEnergy);
        assert!(engine
            .latest_report()
            .starts_with("SYSTEM STATE: High Energy Concentration"));

        let transitions: Vec<(SystemState, SystemState)> = rx
            .try_iter()
            .filter_map(|event| match event {
                EngineEvent::StateChanged { from, to } => Some((from, to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            transitions,
            vec![
                (SystemState::Stable, SystemState::HighMotion),
                (SystemState::HighMotion, SystemState::Stable),
                (SystemState::Stable, SystemState::HighEnergy),
            ]
        );
    }
}
