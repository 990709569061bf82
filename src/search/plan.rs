//! Decoded plans: where every entity stands at every time step

use crate::board::{BoardModel, Cell};
use crate::config::{OutputFormat, PlanMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Entity positions at one time step, indexed by player and box number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub t: usize,
    pub players: Vec<Cell>,
    pub boxes: Vec<Cell>,
}

impl Frame {
    /// The configuration a board starts in
    pub fn initial(board: &BoardModel) -> Self {
        Self {
            t: 0,
            players: board.players().to_vec(),
            boxes: board.boxes().to_vec(),
        }
    }

    pub fn has_box(&self, cell: Cell) -> bool {
        self.boxes.contains(&cell)
    }

    pub fn has_player(&self, cell: Cell) -> bool {
        self.players.contains(&cell)
    }
}

/// A satisfying assignment read back as a sequence of frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub mode: PlanMode,
    pub horizon: usize,
    pub frames: Vec<Frame>,
    /// Wall-clock time of the search that produced this plan
    #[serde(skip)]
    pub solve_time: Duration,
}

impl Plan {
    pub fn new(mode: PlanMode, frames: Vec<Frame>) -> Self {
        Self {
            mode,
            horizon: frames.len().saturating_sub(1),
            frames,
            solve_time: Duration::ZERO,
        }
    }

    pub fn frame(&self, t: usize) -> Option<&Frame> {
        self.frames.get(t)
    }

    pub fn initial(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// The same trajectory played backwards.
    ///
    /// A pull plan read in reverse is a push plan and the other way round.
    pub fn reversed(&self) -> Plan {
        let frames = self
            .frames
            .iter()
            .rev()
            .enumerate()
            .map(|(t, frame)| Frame {
                t,
                players: frame.players.clone(),
                boxes: frame.boxes.clone(),
            })
            .collect();

        let mode = match self.mode {
            PlanMode::Push => PlanMode::Pull,
            PlanMode::Pull => PlanMode::Push,
        };

        Plan {
            solve_time: self.solve_time,
            ..Plan::new(mode, frames)
        }
    }

    /// Number of steps in which some entity moved
    pub fn active_steps(&self) -> usize {
        self.frames
            .windows(2)
            .filter(|pair| pair[0].players != pair[1].players || pair[0].boxes != pair[1].boxes)
            .count()
    }

    /// Moves of one player in LURD notation.
    ///
    /// Lowercase letters are plain moves, uppercase letters moves that carry
    /// a box along (pushes in push mode, pulls in pull mode). Idle steps
    /// produce nothing.
    pub fn moves(&self, player: usize) -> String {
        let mut lurd = String::new();

        for pair in self.frames.windows(2) {
            let (before, after) = (&pair[0], &pair[1]);
            let (Some(&from), Some(&to)) = (before.players.get(player), after.players.get(player)) else {
                continue;
            };
            let Some(direction) = from.direction_to(to) else {
                continue;
            };

            // the box cell before the step and where it ends up
            let carried = match self.mode {
                PlanMode::Push => Some(to).zip(to.step(direction)),
                PlanMode::Pull => from.step(direction.opposite()).zip(Some(from)),
            };
            let moves_box = carried.is_some_and(|(box_from, box_to)| {
                before
                    .boxes
                    .iter()
                    .zip(&after.boxes)
                    .any(|(&b0, &b1)| b0 == box_from && b1 == box_to)
            });

            lurd.push(direction.lurd(moves_box));
        }

        lurd
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Create from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Save to file as JSON or as one LURD line per player
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: OutputFormat) -> anyhow::Result<()> {
        let content = match format {
            OutputFormat::Json => self.to_json()?,
            OutputFormat::Text => {
                let players = self.frames.first().map_or(0, |frame| frame.players.len());
                let mut text = String::new();
                for player in 0..players {
                    text.push_str(&self.moves(player));
                    text.push('\n');
                }
                text
            }
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn frame(t: usize, player: (usize, usize), boxed: (usize, usize)) -> Frame {
        Frame {
            t,
            players: vec![player.into()],
            boxes: vec![boxed.into()],
        }
    }

    fn push_plan() -> Plan {
        Plan::new(
            PlanMode::Push,
            vec![
                frame(0, (2, 1), (2, 2)),
                frame(1, (2, 2), (2, 3)),
                frame(2, (2, 2), (2, 3)),
                frame(3, (1, 2), (2, 3)),
            ],
        )
    }

    #[test]
    fn test_moves_lurd() {
        let plan = push_plan();
        assert_eq!(plan.horizon, 3);
        assert_eq!(plan.moves(0), "Ru");
        assert_eq!(plan.active_steps(), 2);
        assert_eq!(plan.moves(1), "");
    }

    #[test]
    fn test_reversed_is_pull_plan() {
        let plan = push_plan();
        let reversed = plan.reversed();

        assert_eq!(reversed.mode, PlanMode::Pull);
        assert_eq!(reversed.horizon, 3);
        assert_eq!(reversed.frame(0).unwrap().players, vec![Cell::new(1, 2)]);
        assert_eq!(reversed.frame(3).unwrap().t, 3);
        // walking back down then pulling the box left
        assert_eq!(reversed.moves(0), "dL");
        assert_eq!(reversed.reversed().frames, plan.frames);
    }

    #[test]
    fn test_json_round_trip() {
        let plan = push_plan();
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("plan.json");

        plan.save_to_file(&path, OutputFormat::Json).unwrap();
        let loaded = Plan::load_from_file(&path).unwrap();
        assert_eq!(loaded, plan);
    }

    #[test]
    fn test_text_output() {
        let plan = push_plan();
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("plan.txt");

        plan.save_to_file(&path, OutputFormat::Text).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Ru\n");
    }
}
