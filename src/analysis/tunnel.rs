//! Detection of straight single-width corridors with two open ends

use crate::board::{BoardModel, Cell, Direction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Corridors shorter than this are left to the ordinary movement clauses
pub const MIN_TUNNEL_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Direction from the first to the last corridor cell
    pub fn forward(self) -> Direction {
        match self {
            Orientation::Horizontal => Direction::Right,
            Orientation::Vertical => Direction::Down,
        }
    }

    /// The two sides that must be closed for a cell to be part of a corridor
    fn sides(self) -> [Direction; 2] {
        match self {
            Orientation::Horizontal => [Direction::Up, Direction::Down],
            Orientation::Vertical => [Direction::Left, Direction::Right],
        }
    }
}

/// A corridor described by its first and last cell.
///
/// `start` precedes `end` in row-major order; every cell between them on the
/// same row (column) belongs to the corridor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tunnel {
    pub start: Cell,
    pub end: Cell,
}

impl Tunnel {
    pub fn orientation(&self) -> Orientation {
        if self.start.row == self.end.row {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    /// Number of corridor cells, both ends included
    pub fn cell_count(&self) -> usize {
        self.start.distance(self.end) + 1
    }

    /// Corridor cells from `start` to `end`
    pub fn cells(&self) -> Vec<Cell> {
        let forward = self.orientation().forward();
        let mut cells = Vec::with_capacity(self.cell_count());
        let mut cell = self.start;
        cells.push(cell);
        while cell != self.end {
            match cell.step(forward) {
                Some(next) => cell = next,
                None => break,
            }
            cells.push(cell);
        }
        cells
    }

    /// Cells visited when crossing the corridor in `direction`, including the
    /// open cell before the entrance and the open cell after the exit.
    ///
    /// Returns `None` if `direction` is not along the corridor axis.
    pub fn crossing(&self, direction: Direction) -> Option<Vec<Cell>> {
        let forward = self.orientation().forward();
        let mut cells = self.cells();
        if direction == forward.opposite() {
            cells.reverse();
        } else if direction != forward {
            return None;
        }

        let first = *cells.first()?;
        let last = *cells.last()?;
        let before = first.step(direction.opposite())?;
        let after = last.step(direction)?;

        let mut path = Vec::with_capacity(cells.len() + 2);
        path.push(before);
        path.extend(cells);
        path.push(after);
        Some(path)
    }
}

/// Deduplicated set of corridors on a board
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelSet {
    tunnels: BTreeSet<Tunnel>,
}

fn is_corridor(board: &BoardModel, cell: Cell, orientation: Orientation) -> bool {
    board.is_walkable(cell)
        && orientation
            .sides()
            .into_iter()
            .all(|side| board.open_step(cell, side).is_none())
}

impl TunnelSet {
    /// Scan interior cells for corridors.
    ///
    /// A run starts at a corridor cell whose predecessor along the axis is
    /// open floor that is not itself a corridor cell; it is walked forward
    /// with a loop until the next cell stops being a corridor cell. Both
    /// ends are checked once the walk is complete: the run is recorded only
    /// when the cells beyond each end are walkable. Dead ends on either side
    /// exclude the corridor.
    pub fn detect(board: &BoardModel) -> Self {
        let mut tunnels = BTreeSet::new();

        for &cell in board.walkable() {
            let interior = cell.row > 0
                && cell.col > 0
                && cell.row + 1 < board.rows
                && cell.col + 1 < board.cols;
            if !interior {
                continue;
            }

            for orientation in [Orientation::Horizontal, Orientation::Vertical] {
                if !is_corridor(board, cell, orientation) {
                    continue;
                }
                let forward = orientation.forward();

                // only the first cell of a run starts a walk
                let before = board.open_step(cell, forward.opposite());
                if before.is_some_and(|prev| is_corridor(board, prev, orientation)) {
                    continue;
                }

                let mut end = cell;
                let mut after = board.open_step(end, forward);
                while let Some(next) = after.filter(|&next| is_corridor(board, next, orientation)) {
                    end = next;
                    after = board.open_step(end, forward);
                }

                let tunnel = Tunnel { start: cell, end };
                if before.is_some() && after.is_some() && tunnel.cell_count() >= MIN_TUNNEL_LEN {
                    tunnels.insert(tunnel);
                }
            }
        }

        debug!(tunnels = tunnels.len(), "tunnel detection finished");
        Self { tunnels }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tunnel> {
        self.tunnels.iter()
    }

    pub fn len(&self) -> usize {
        self.tunnels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tunnels.is_empty()
    }

    /// Whether `cell` lies inside any corridor
    pub fn covers(&self, cell: Cell) -> bool {
        self.tunnels.iter().any(|tunnel| tunnel.cells().contains(&cell))
    }
}
