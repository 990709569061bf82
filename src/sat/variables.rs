//! Literal management for the SAT encoding

use crate::board::{Cell, Direction};
use crate::error::EncodingError;
use std::collections::HashMap;
use std::fmt;

/// Movable entity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Player,
    Box,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Player => write!(f, "player"),
            EntityKind::Box => write!(f, "box"),
        }
    }
}

/// What a variable asserts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    /// Player `entity` stands on the cell at `t`
    Player,
    /// Box `entity` rests on the cell at `t`
    Box,
    /// Player `entity` moved box `box_index` onto the cell at `t` travelling
    /// in `direction`. Only allocated when a movement clause would expand
    /// past the configured limit.
    Transfer { box_index: usize, direction: Direction },
}

/// Structured identity of one variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LiteralKey {
    pub cell: Cell,
    pub entity: usize,
    pub t: usize,
    pub kind: LiteralKind,
}

impl LiteralKey {
    pub fn player(cell: Cell, entity: usize, t: usize) -> Self {
        Self {
            cell,
            entity,
            t,
            kind: LiteralKind::Player,
        }
    }

    pub fn box_at(cell: Cell, entity: usize, t: usize) -> Self {
        Self {
            cell,
            entity,
            t,
            kind: LiteralKind::Box,
        }
    }
}

/// Allocates one positive variable id per distinct [`LiteralKey`].
///
/// Ids start at 1 and are handed out in first-reference order; a negative
/// id is the negation of the same variable. One manager lives for exactly
/// one horizon attempt.
#[derive(Debug)]
pub struct LiteralManager {
    variable_map: HashMap<LiteralKey, i32>,
    /// `keys[id - 1]` is the key of variable `id`
    keys: Vec<LiteralKey>,
    rows: usize,
    cols: usize,
    horizon: usize,
    players: usize,
    boxes: usize,
}

impl LiteralManager {
    pub fn new(rows: usize, cols: usize, horizon: usize, players: usize, boxes: usize) -> Self {
        Self {
            variable_map: HashMap::new(),
            keys: Vec::new(),
            rows,
            cols,
            horizon,
            players,
            boxes,
        }
    }

    /// Get or create the variable for `key`
    pub fn literal(&mut self, key: LiteralKey) -> Result<i32, EncodingError> {
        if let Some(&id) = self.variable_map.get(&key) {
            return Ok(id);
        }

        self.validate(&key)?;

        let id = i32::try_from(self.keys.len() + 1).map_err(|_| EncodingError::VariableOverflow {
            allocated: self.keys.len(),
        })?;
        self.keys.push(key);
        self.variable_map.insert(key, id);
        Ok(id)
    }

    /// Existing variable for `key`, without allocating
    pub fn lookup(&self, key: &LiteralKey) -> Option<i32> {
        self.variable_map.get(key).copied()
    }

    pub fn player(&mut self, cell: Cell, player: usize, t: usize) -> Result<i32, EncodingError> {
        self.literal(LiteralKey::player(cell, player, t))
    }

    pub fn box_at(&mut self, cell: Cell, box_index: usize, t: usize) -> Result<i32, EncodingError> {
        self.literal(LiteralKey::box_at(cell, box_index, t))
    }

    pub fn transfer(
        &mut self,
        cell: Cell,
        player: usize,
        box_index: usize,
        direction: Direction,
        t: usize,
    ) -> Result<i32, EncodingError> {
        self.literal(LiteralKey {
            cell,
            entity: player,
            t,
            kind: LiteralKind::Transfer {
                box_index,
                direction,
            },
        })
    }

    /// Key of a literal of either sign
    pub fn key_of(&self, literal: i32) -> Option<&LiteralKey> {
        let index = usize::try_from(literal.unsigned_abs()).ok()?.checked_sub(1)?;
        self.keys.get(index)
    }

    /// Get the total number of variables created
    pub fn variable_count(&self) -> usize {
        self.keys.len()
    }

    fn validate(&self, key: &LiteralKey) -> Result<(), EncodingError> {
        let out_of_bounds = || EncodingError::LiteralOutOfBounds { key: *key };

        if key.cell.row >= self.rows || key.cell.col >= self.cols || key.t > self.horizon {
            return Err(out_of_bounds());
        }

        let entity_bound = match key.kind {
            LiteralKind::Player => self.players,
            LiteralKind::Box => self.boxes,
            LiteralKind::Transfer { box_index, .. } => {
                if box_index >= self.boxes || key.t == 0 {
                    return Err(out_of_bounds());
                }
                self.players
            }
        };
        if key.entity >= entity_bound {
            return Err(out_of_bounds());
        }

        Ok(())
    }

    /// Get statistics about variable usage
    pub fn statistics(&self) -> LiteralStatistics {
        let mut stats = LiteralStatistics {
            total_variables: self.variable_count(),
            ..Default::default()
        };

        for key in &self.keys {
            match key.kind {
                LiteralKind::Player => stats.player_variables += 1,
                LiteralKind::Box => stats.box_variables += 1,
                LiteralKind::Transfer { .. } => stats.transfer_variables += 1,
            }
        }

        stats
    }
}

/// Statistics about variable usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiteralStatistics {
    pub total_variables: usize,
    pub player_variables: usize,
    pub box_variables: usize,
    pub transfer_variables: usize,
}

impl fmt::Display for LiteralStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Variable Statistics:")?;
        writeln!(f, "  Total variables: {}", self.total_variables)?;
        writeln!(f, "  Player variables: {}", self.player_variables)?;
        writeln!(f, "  Box variables: {}", self.box_variables)?;
        writeln!(f, "  Transfer variables: {}", self.transfer_variables)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memoization() {
        let mut lm = LiteralManager::new(3, 3, 2, 1, 1);

        let a = lm.player(Cell::new(1, 1), 0, 0).unwrap();
        let b = lm.box_at(Cell::new(1, 1), 0, 0).unwrap();
        let c = lm.player(Cell::new(1, 1), 0, 1).unwrap();

        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(c, 3);
        assert_eq!(lm.player(Cell::new(1, 1), 0, 0).unwrap(), a);
        assert_eq!(lm.box_at(Cell::new(1, 1), 0, 0).unwrap(), b);
        assert_eq!(lm.variable_count(), 3);
    }

    #[test]
    fn test_distinct_keys_never_collide() {
        let mut lm = LiteralManager::new(2, 3, 1, 2, 2);
        let mut ids = Vec::new();
        for row in 0..2 {
            for col in 0..3 {
                for t in 0..=1 {
                    for entity in 0..2 {
                        ids.push(lm.player(Cell::new(row, col), entity, t).unwrap());
                        ids.push(lm.box_at(Cell::new(row, col), entity, t).unwrap());
                    }
                }
            }
        }

        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(lm.variable_count(), ids.len());
    }

    #[test]
    fn test_bounds() {
        let mut lm = LiteralManager::new(2, 2, 3, 1, 1);

        assert!(lm.player(Cell::new(1, 1), 0, 3).is_ok());
        assert!(lm.player(Cell::new(2, 0), 0, 0).is_err());
        assert!(lm.player(Cell::new(0, 2), 0, 0).is_err());
        assert!(lm.player(Cell::new(0, 0), 0, 4).is_err());
        assert!(lm.player(Cell::new(0, 0), 1, 0).is_err());
        assert!(lm.box_at(Cell::new(0, 0), 1, 0).is_err());
        assert!(lm.transfer(Cell::new(0, 0), 0, 1, Direction::Up, 1).is_err());
        assert!(lm.transfer(Cell::new(0, 0), 0, 0, Direction::Up, 0).is_err());

        let err = lm.player(Cell::new(5, 5), 0, 0).unwrap_err();
        assert!(matches!(err, EncodingError::LiteralOutOfBounds { .. }));
        // rejected keys allocate nothing
        assert_eq!(lm.variable_count(), 1);
    }

    #[test]
    fn test_key_of_either_sign() {
        let mut lm = LiteralManager::new(3, 3, 2, 1, 1);
        let id = lm.transfer(Cell::new(1, 2), 0, 0, Direction::Right, 1).unwrap();

        let key = lm.key_of(-id).unwrap();
        assert_eq!(key.cell, Cell::new(1, 2));
        assert_eq!(
            key.kind,
            LiteralKind::Transfer {
                box_index: 0,
                direction: Direction::Right
            }
        );
        assert_eq!(lm.key_of(id), lm.key_of(-id));
        assert!(lm.key_of(0).is_none());
        assert!(lm.key_of(id + 1).is_none());
        assert_eq!(lm.lookup(key), Some(id));
    }

    #[test]
    fn test_statistics() {
        let mut lm = LiteralManager::new(2, 2, 2, 1, 1);

        lm.player(Cell::new(0, 0), 0, 0).unwrap();
        lm.box_at(Cell::new(1, 1), 0, 1).unwrap();
        lm.transfer(Cell::new(1, 1), 0, 0, Direction::Down, 1).unwrap();

        let stats = lm.statistics();
        assert_eq!(stats.total_variables, 3);
        assert_eq!(stats.player_variables, 1);
        assert_eq!(stats.box_variables, 1);
        assert_eq!(stats.transfer_variables, 1);
    }
}
