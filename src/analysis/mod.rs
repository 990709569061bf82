//! Static board analyses shared read-only by every horizon attempt

pub mod deadlock;
pub mod pull;
pub mod tunnel;

pub use deadlock::DeadlockSet;
pub use pull::PullableSet;
pub use tunnel::{Orientation, Tunnel, TunnelSet};

use crate::board::BoardModel;
use crate::config::PlanMode;
use tracing::info;

/// Everything derived from a board before encoding starts
#[derive(Debug, Clone)]
pub struct BoardAnalysis {
    pub deadlocks: DeadlockSet,
    pub tunnels: TunnelSet,
    /// Only computed in pull mode
    pub pullable: Option<PullableSet>,
}

impl BoardAnalysis {
    pub fn new(board: &BoardModel, mode: PlanMode) -> Self {
        let deadlocks = DeadlockSet::analyze(board);
        let tunnels = TunnelSet::detect(board);
        let pullable = match mode {
            PlanMode::Pull => Some(PullableSet::analyze(board, &deadlocks)),
            PlanMode::Push => None,
        };

        info!(
            walkable = board.walkable().len(),
            deadlocks = deadlocks.len(),
            tunnels = tunnels.len(),
            pullable = pullable.as_ref().map_or(0, PullableSet::len),
            "board analysis complete"
        );

        Self {
            deadlocks,
            tunnels,
            pullable,
        }
    }
}
