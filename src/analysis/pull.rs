//! Cells a box can be pulled to from the targets

use super::DeadlockSet;
use crate::board::{BoardModel, Cell, Direction};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// Per-target pull regions and their union
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullableSet {
    regions: BTreeMap<Cell, BTreeSet<Cell>>,
    union: BTreeSet<Cell>,
}

impl PullableSet {
    pub fn analyze(board: &BoardModel, deadlocks: &DeadlockSet) -> Self {
        let mut regions = BTreeMap::new();
        let mut union = BTreeSet::new();

        for &target in board.targets() {
            let region = pull_region(board, deadlocks, target);
            union.extend(region.iter().copied());
            regions.insert(target, region);
        }

        debug!(pullable = union.len(), "pull region analysis finished");
        Self { regions, union }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.union.contains(&cell)
    }

    /// Union over every target, row-major
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.union.iter().copied()
    }

    pub fn region_for(&self, target: Cell) -> Option<&BTreeSet<Cell>> {
        self.regions.get(&target)
    }

    pub fn len(&self) -> usize {
        self.union.len()
    }

    pub fn is_empty(&self) -> bool {
        self.union.is_empty()
    }
}

/// Breadth-first search from `target` over single pulls.
///
/// A box on `from` is pulled one step in `direction` when the destination is
/// open and not a deadlock, and the cell beyond it is open for the puller to
/// retreat into.
fn pull_region(board: &BoardModel, deadlocks: &DeadlockSet, target: Cell) -> BTreeSet<Cell> {
    let mut region = BTreeSet::from([target]);
    let mut queue = VecDeque::from([target]);

    while let Some(from) = queue.pop_front() {
        for direction in Direction::ALL {
            let Some(next) = board.open_step(from, direction) else {
                continue;
            };
            if deadlocks.contains(next) || board.open_step(next, direction).is_none() {
                continue;
            }
            if region.insert(next) {
                queue.push_back(next);
            }
        }
    }

    region
}
