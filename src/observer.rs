//! Observer pattern for the engine - pub/sub toward renderer and status panel
//!
//! Events are published after a pass or reconfiguration has fully completed,
//! never from inside the per-cell loop. Observers see a consistent engine.

use crate::aggregate::FrameAggregate;
use crate::report::SystemState;

/// Event emitted by the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// Grid topology was replaced; renderer must re-read positions.
    TopologyChanged {
        resolution: usize,
        cell_count: usize,
    },
    /// A frame pass completed.
    FrameProcessed {
        frame: u64,
        aggregate: FrameAggregate,
    },
    /// The headline system state changed between consecutive frames.
    StateChanged {
        from: SystemState,
        to: SystemState,
    },
}

/// Observer that receives engine events
pub trait EngineObserver: Send + Sync {
    /// Called when an engine event occurs
    fn on_event(&self, event: &EngineEvent);
}

/// Function-based observer for simple cases
pub struct FnObserver<F: Fn(&EngineEvent) + Send + Sync>(pub F);

impl<F: Fn(&EngineEvent) + Send + Sync> EngineObserver for FnObserver<F> {
    fn on_event(&self, event: &EngineEvent) {
        (self.0)(event);
    }
}

/// Channel-based observer - forwards events to a channel
pub struct ChannelObserver {
    sender: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelObserver {
    pub fn new(sender: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { sender }
    }
}

impl EngineObserver for ChannelObserver {
    fn on_event(&self, event: &EngineEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.sender.send(event.clone());
    }
}
