//! Immutable grid facts of a Sokoban puzzle

use super::{Cell, Direction};
use crate::error::MapLoadError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What occupies a grid square, independent of movable entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Wall,
    Floor,
    /// Beyond the end of a short line; neither wall nor walkable
    Void,
}

/// Walls, targets, walkable floor and entity start positions of one puzzle.
///
/// Built once per puzzle and never mutated afterwards, so it can be shared
/// read-only by every horizon attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardModel {
    pub rows: usize,
    pub cols: usize,
    tiles: Vec<Tile>,
    target_mask: Vec<bool>,
    targets: Vec<Cell>,
    walkable: Vec<Cell>,
    players: Vec<Cell>,
    boxes: Vec<Cell>,
}

impl BoardModel {
    /// Assemble a board from explicit coordinate lists.
    ///
    /// Every cell not listed in `walls` or `floor` is void. Player, box and
    /// target cells are floor; listing one of them as a wall is rejected.
    pub fn from_parts(
        rows: usize,
        cols: usize,
        walls: &[Cell],
        floor: &[Cell],
        targets: &[Cell],
        players: &[Cell],
        boxes: &[Cell],
    ) -> Result<Self, MapLoadError> {
        let mut tiles = vec![Tile::Void; rows * cols];
        let check = |cell: Cell| -> Result<usize, MapLoadError> {
            if cell.row < rows && cell.col < cols {
                Ok(cell.row * cols + cell.col)
            } else {
                Err(MapLoadError::OutOfBounds { cell, rows, cols })
            }
        };

        for &cell in walls {
            tiles[check(cell)?] = Tile::Wall;
        }
        for &cell in floor.iter().chain(targets).chain(players).chain(boxes) {
            let idx = check(cell)?;
            if tiles[idx] == Tile::Wall {
                return Err(MapLoadError::WallOverlap { cell });
            }
            tiles[idx] = Tile::Floor;
        }

        let mut target_mask = vec![false; rows * cols];
        for &cell in targets {
            target_mask[check(cell)?] = true;
        }

        let mut board = Self {
            rows,
            cols,
            tiles,
            target_mask,
            targets: Vec::new(),
            walkable: Vec::new(),
            players: players.to_vec(),
            boxes: boxes.to_vec(),
        };
        board.targets = board.scan(|b, cell| b.is_target(cell));
        board.walkable = board.scan(|b, cell| b.is_walkable(cell));
        Ok(board)
    }

    /// Row-major list of cells satisfying `pred`
    fn scan(&self, pred: impl Fn(&Self, Cell) -> bool) -> Vec<Cell> {
        let mut cells = Vec::new();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = Cell::new(row, col);
                if pred(self, cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    #[inline]
    pub fn index(&self, cell: Cell) -> usize {
        cell.row * self.cols + cell.col
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    pub fn tile(&self, cell: Cell) -> Tile {
        if self.contains(cell) {
            self.tiles[self.index(cell)]
        } else {
            Tile::Void
        }
    }

    pub fn is_wall(&self, cell: Cell) -> bool {
        self.tile(cell) == Tile::Wall
    }

    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.tile(cell) == Tile::Floor
    }

    pub fn is_target(&self, cell: Cell) -> bool {
        self.contains(cell) && self.target_mask[self.index(cell)]
    }

    /// Neighbour of `cell` in `direction` if it lies on the board
    pub fn step(&self, cell: Cell, direction: Direction) -> Option<Cell> {
        cell.step(direction).filter(|&next| self.contains(next))
    }

    /// Walkable neighbour of `cell` in `direction`
    pub fn open_step(&self, cell: Cell, direction: Direction) -> Option<Cell> {
        self.step(cell, direction).filter(|&next| self.is_walkable(next))
    }

    /// Walkable orthogonal neighbours of `cell`
    pub fn open_neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| self.open_step(cell, direction))
    }

    pub fn walls(&self) -> Vec<Cell> {
        self.scan(|b, cell| b.is_wall(cell))
    }

    pub fn targets(&self) -> &[Cell] {
        &self.targets
    }

    /// All walkable cells in row-major order
    pub fn walkable(&self) -> &[Cell] {
        &self.walkable
    }

    pub fn players(&self) -> &[Cell] {
        &self.players
    }

    pub fn boxes(&self) -> &[Cell] {
        &self.boxes
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }
}

impl fmt::Display for BoardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = Cell::new(row, col);
                let player = self.players.contains(&cell);
                let boxed = self.boxes.contains(&cell);
                let target = self.is_target(cell);
                let symbol = match (self.tile(cell), player, boxed, target) {
                    (Tile::Wall, _, _, _) => '#',
                    (_, true, _, true) => '+',
                    (_, true, _, false) => '@',
                    (_, _, true, true) => '*',
                    (_, _, true, false) => '$',
                    (_, _, _, true) => '.',
                    _ => ' ',
                };
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts() {
        let walls = [Cell::new(0, 0), Cell::new(0, 1), Cell::new(0, 2)];
        let floor = [Cell::new(1, 0), Cell::new(1, 2)];
        let board = BoardModel::from_parts(
            2,
            3,
            &walls,
            &floor,
            &[Cell::new(1, 2)],
            &[Cell::new(1, 0)],
            &[Cell::new(1, 1)],
        )
        .unwrap();

        assert_eq!(board.walkable(), &[Cell::new(1, 0), Cell::new(1, 1), Cell::new(1, 2)]);
        assert_eq!(board.walls().len(), 3);
        assert!(board.is_target(Cell::new(1, 2)));
        assert_eq!(board.player_count(), 1);
        assert_eq!(board.box_count(), 1);
    }

    #[test]
    fn test_from_parts_rejects_invalid_cells() {
        let out = BoardModel::from_parts(2, 2, &[], &[Cell::new(2, 0)], &[], &[], &[]);
        assert!(matches!(out, Err(MapLoadError::OutOfBounds { .. })));

        let overlap = BoardModel::from_parts(2, 2, &[Cell::new(0, 0)], &[], &[], &[Cell::new(0, 0)], &[]);
        assert!(matches!(overlap, Err(MapLoadError::WallOverlap { .. })));
    }

    #[test]
    fn test_open_neighbors_skip_walls_and_void() {
        let board = BoardModel::from_parts(
            3,
            3,
            &[Cell::new(0, 1)],
            &[Cell::new(1, 0), Cell::new(1, 1), Cell::new(2, 1)],
            &[],
            &[],
            &[],
        )
        .unwrap();

        let mut neighbors: Vec<_> = board.open_neighbors(Cell::new(1, 1)).collect();
        neighbors.sort();
        assert_eq!(neighbors, vec![Cell::new(1, 0), Cell::new(2, 1)]);
        assert_eq!(board.tile(Cell::new(1, 2)), Tile::Void);
        assert_eq!(board.tile(Cell::new(5, 5)), Tile::Void);
    }
}
