//! Independent re-check of decoded plans against the game rules

use super::plan::{Frame, Plan};
use crate::analysis::{DeadlockSet, PullableSet};
use crate::board::{BoardModel, Cell};
use crate::config::PlanMode;
use itertools::Itertools;
use std::time::Instant;

/// Checks plans step by step without looking at the formula that produced them
pub struct PlanValidator<'a> {
    board: &'a BoardModel,
}

/// Result of plan validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub violations: Vec<RuleViolation>,
    pub steps_checked: usize,
    pub validation_time_ms: u64,
}

/// One broken rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    pub t: usize,
    pub description: String,
}

impl<'a> PlanValidator<'a> {
    pub fn new(board: &'a BoardModel) -> Self {
        Self { board }
    }

    /// Full check: the plan starts from the board's configuration, every step
    /// is legal and the goal of the plan's mode holds at the end
    pub fn validate(&self, plan: &Plan) -> ValidationResult {
        let start_time = Instant::now();
        let mut violations = Vec::new();

        match plan.initial() {
            Some(first) if *first == Frame::initial(self.board) => {}
            Some(_) => violations.push(RuleViolation {
                t: 0,
                description: "first frame differs from the board's start".to_string(),
            }),
            None => violations.push(RuleViolation {
                t: 0,
                description: "plan has no frames".to_string(),
            }),
        }

        self.check_trajectory(plan, &mut violations);
        Self::finish(plan, violations, start_time)
    }

    /// Check steps and goal only, for plans that start elsewhere, such as a
    /// reversed pull plan
    pub fn validate_trajectory(&self, plan: &Plan) -> ValidationResult {
        let start_time = Instant::now();
        let mut violations = Vec::new();
        self.check_trajectory(plan, &mut violations);
        Self::finish(plan, violations, start_time)
    }

    fn finish(plan: &Plan, violations: Vec<RuleViolation>, start_time: Instant) -> ValidationResult {
        ValidationResult {
            is_valid: violations.is_empty(),
            violations,
            steps_checked: plan.frames.len().saturating_sub(1),
            validation_time_ms: start_time.elapsed().as_millis() as u64,
        }
    }

    fn check_trajectory(&self, plan: &Plan, violations: &mut Vec<RuleViolation>) {
        if plan.frames.len() != plan.horizon + 1 {
            violations.push(RuleViolation {
                t: 0,
                description: format!("{} frames for horizon {}", plan.frames.len(), plan.horizon),
            });
        }

        for frame in &plan.frames {
            self.check_frame(frame, violations);
        }
        for (before, after) in plan.frames.iter().tuple_windows() {
            self.check_step(plan.mode, before, after, violations);
        }
        if let Some(last) = plan.last() {
            self.check_goal(plan, last, violations);
        }
    }

    /// Placement rules inside one frame
    fn check_frame(&self, frame: &Frame, violations: &mut Vec<RuleViolation>) {
        let mut report = |description: String| {
            violations.push(RuleViolation {
                t: frame.t,
                description,
            })
        };

        if frame.players.len() != self.board.player_count() || frame.boxes.len() != self.board.box_count() {
            report("entity count differs from the board".to_string());
        }

        for &cell in frame.players.iter().chain(&frame.boxes) {
            if !self.board.is_walkable(cell) {
                report(format!("entity on non-walkable cell {}", cell));
            }
        }
        for (a, b) in frame.players.iter().tuple_combinations() {
            if a == b {
                report(format!("two players share {}", a));
            }
        }
        for (a, b) in frame.boxes.iter().tuple_combinations() {
            if a == b {
                report(format!("two boxes share {}", a));
            }
        }
        for player in &frame.players {
            if frame.has_box(*player) {
                report(format!("player stands on a box at {}", player));
            }
        }
    }

    /// Movement rules between two consecutive frames
    fn check_step(&self, mode: PlanMode, before: &Frame, after: &Frame, violations: &mut Vec<RuleViolation>) {
        let mut report = |description: String| {
            violations.push(RuleViolation {
                t: after.t,
                description,
            })
        };

        for (player, (&from, &to)) in before.players.iter().zip(&after.players).enumerate() {
            if from != to && from.direction_to(to).is_none() {
                report(format!("player {} jumps from {} to {}", player, from, to));
            }
        }

        for ((p, q), (r, s)) in before
            .players
            .iter()
            .zip(&after.players)
            .tuple_combinations()
        {
            if p != q && p == s && q == r {
                report(format!("players swap {} and {}", p, q));
            }
        }

        for (box_index, (&from, &to)) in before.boxes.iter().zip(&after.boxes).enumerate() {
            if from == to {
                continue;
            }
            let Some(direction) = from.direction_to(to) else {
                report(format!("box {} jumps from {} to {}", box_index, from, to));
                continue;
            };

            // where a mover must stand before and after the step
            let (player_from, player_to) = match mode {
                PlanMode::Push => (from.step(direction.opposite()), Some(from)),
                PlanMode::Pull => (Some(to), to.step(direction)),
            };
            let moved = before
                .players
                .iter()
                .zip(&after.players)
                .any(|(&p0, &p1)| Some(p0) == player_from && Some(p1) == player_to);
            if !moved {
                report(format!("box {} moves from {} to {} on its own", box_index, from, to));
            }
        }
    }

    fn check_goal(&self, plan: &Plan, last: &Frame, violations: &mut Vec<RuleViolation>) {
        match plan.mode {
            PlanMode::Push => {
                for &target in self.board.targets() {
                    if !last.has_box(target) {
                        violations.push(RuleViolation {
                            t: last.t,
                            description: format!("target {} left empty", target),
                        });
                    }
                }
            }
            PlanMode::Pull => {
                let Some(first) = plan.initial() else {
                    return;
                };
                let started_on_target: Vec<(usize, Cell)> = first
                    .boxes
                    .iter()
                    .copied()
                    .enumerate()
                    .filter(|&(_, cell)| self.board.is_target(cell))
                    .collect();
                let moved_off = started_on_target
                    .iter()
                    .any(|&(box_index, start)| last.boxes.get(box_index) != Some(&start));
                if !started_on_target.is_empty() && !moved_off {
                    violations.push(RuleViolation {
                        t: last.t,
                        description: "every box is still on its starting target".to_string(),
                    });
                }

                let deadlocks = DeadlockSet::analyze(self.board);
                let pullable = PullableSet::analyze(self.board, &deadlocks);
                for &cell in &last.boxes {
                    if !pullable.contains(cell) {
                        violations.push(RuleViolation {
                            t: last.t,
                            description: format!("box ends outside the pullable region at {}", cell),
                        });
                    }
                }
            }
        }
    }
}
