//! Static deadlock detection: floor cells from which no box can ever be
//! pushed onto a target

use crate::board::{BoardModel, Cell, Direction};
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Unknown,
    Live,
    Dead,
}

/// Floor cells proven unable to host a box that can still reach a target.
///
/// A target cell is never a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlockSet {
    cols: usize,
    mask: Vec<bool>,
    cells: Vec<Cell>,
}

/// Cells a box resting on `from` can be pushed into with one push.
///
/// The box moves from `from` to a walkable neighbour only if the cell on the
/// opposite side of `from` is walkable too, so the player has room to push.
pub fn push_successors(board: &BoardModel, from: Cell) -> impl Iterator<Item = Cell> + '_ {
    Direction::ALL.into_iter().filter_map(move |direction| {
        board.open_step(from, direction.opposite())?;
        board.open_step(from, direction)
    })
}

impl DeadlockSet {
    /// Flood fill over push adjacency from every unresolved floor cell in
    /// row-major order.
    ///
    /// Push adjacency is directed, so each start cell gets its own visited
    /// stamp. When a flood from `start` never meets a target, every cell it
    /// touched is dead too (their reach is a subset of the start's). A flood
    /// that reaches a cell already known live stops early.
    pub fn analyze(board: &BoardModel) -> Self {
        let n = board.rows * board.cols;
        let mut status = vec![Status::Unknown; n];
        let mut stamp = vec![0u32; n];
        let mut generation = 0u32;
        let mut queue = VecDeque::new();
        let mut group = Vec::new();

        for &start in board.walkable() {
            if board.is_target(start) || status[board.index(start)] != Status::Unknown {
                continue;
            }

            generation += 1;
            queue.clear();
            group.clear();
            stamp[board.index(start)] = generation;
            queue.push_back(start);

            let mut live = false;
            while let Some(cell) = queue.pop_front() {
                let idx = board.index(cell);
                if board.is_target(cell) || status[idx] == Status::Live {
                    live = true;
                    break;
                }
                group.push(cell);
                if status[idx] == Status::Dead {
                    continue;
                }
                for next in push_successors(board, cell) {
                    let next_idx = board.index(next);
                    if stamp[next_idx] != generation {
                        stamp[next_idx] = generation;
                        queue.push_back(next);
                    }
                }
            }

            if live {
                status[board.index(start)] = Status::Live;
            } else {
                for &cell in &group {
                    status[board.index(cell)] = Status::Dead;
                }
            }
        }

        let mut mask = vec![false; n];
        let mut cells = Vec::new();
        for &cell in board.walkable() {
            if status[board.index(cell)] == Status::Dead {
                mask[board.index(cell)] = true;
                cells.push(cell);
            }
        }

        debug!(deadlocks = cells.len(), "deadlock analysis finished");
        Self {
            cols: board.cols,
            mask,
            cells,
        }
    }

    /// A set with no members, used when pruning is switched off
    pub fn none(board: &BoardModel) -> Self {
        Self {
            cols: board.cols,
            mask: vec![false; board.rows * board.cols],
            cells: Vec::new(),
        }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.col < self.cols
            && self
                .mask
                .get(cell.row * self.cols + cell.col)
                .copied()
                .unwrap_or(false)
    }

    /// Members in row-major order
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
