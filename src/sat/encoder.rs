//! SAT encoder for Sokoban horizon attempts

use super::constraints::{ConstraintEncoder, ConstraintFamily, EncoderOptions, Formula};
use super::oracle::{SatOracle, SolveOutcome};
use super::variables::{EntityKind, LiteralKey, LiteralManager, LiteralStatistics};
use crate::analysis::BoardAnalysis;
use crate::board::{BoardModel, Cell};
use crate::config::{PlanMode, Settings};
use crate::error::EncodingError;
use crate::search::{Frame, Plan};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// A built formula together with the literal table needed to read a model
#[derive(Debug)]
pub struct Encoding {
    pub horizon: usize,
    pub literals: LiteralManager,
    pub formula: Formula,
}

impl Encoding {
    pub fn statistics(&self) -> EncodingStatistics {
        EncodingStatistics {
            horizon: self.horizon,
            total_variables: self.literals.variable_count(),
            total_clauses: self.formula.len(),
            families: self.formula.family_counts().clone(),
            literals: self.literals.statistics(),
        }
    }
}

/// Outcome of encoding and solving one horizon
#[derive(Debug, Clone)]
pub struct Attempt {
    pub horizon: usize,
    pub outcome: SolveOutcome,
    pub plan: Option<Plan>,
    pub statistics: EncodingStatistics,
}

/// Owns a board and its analyses and builds one formula per horizon
pub struct SatEncoder {
    board: BoardModel,
    analysis: BoardAnalysis,
    options: EncoderOptions,
}

impl SatEncoder {
    pub fn new(board: BoardModel, options: EncoderOptions) -> Self {
        let analysis = BoardAnalysis::new(&board, options.mode);
        Self {
            board,
            analysis,
            options,
        }
    }

    pub fn from_settings(board: BoardModel, settings: &Settings) -> Self {
        Self::new(board, EncoderOptions::from_settings(settings))
    }

    pub fn board(&self) -> &BoardModel {
        &self.board
    }

    pub fn analysis(&self) -> &BoardAnalysis {
        &self.analysis
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Build the full formula for `horizon`
    pub fn encode(&self, horizon: usize) -> Result<Encoding, EncodingError> {
        let mut encoder = ConstraintEncoder::new(&self.board, &self.analysis, self.options.clone(), horizon);
        let formula = encoder.generate_all_constraints()?;
        let literals = encoder.into_literals();

        debug!(
            horizon,
            clauses = formula.len(),
            variables = literals.variable_count(),
            "formula built"
        );

        Ok(Encoding {
            horizon,
            literals,
            formula,
        })
    }

    /// Hand every clause to the oracle
    pub fn submit<O: SatOracle>(oracle: &mut O, formula: &Formula) -> Result<(), EncodingError> {
        for (index, clause) in formula.clauses().iter().enumerate() {
            if !oracle.add_clause(&clause.literals) {
                return Err(EncodingError::ClauseRejected { index });
            }
        }
        Ok(())
    }

    /// Encode, submit and solve one horizon; decode the model on SAT
    pub fn attempt<O: SatOracle>(&self, horizon: usize, oracle: &mut O) -> Result<Attempt, EncodingError> {
        let encoding = self.encode(horizon)?;
        Self::submit(oracle, &encoding.formula)?;

        let outcome = oracle.solve();
        let plan = match outcome {
            SolveOutcome::Sat => Some(self.decode(&*oracle, &encoding)?),
            SolveOutcome::Unsat | SolveOutcome::Unknown => None,
        };

        Ok(Attempt {
            horizon,
            outcome,
            plan,
            statistics: encoding.statistics(),
        })
    }

    /// Read entity positions for every time step out of a model
    pub fn decode<O: SatOracle>(&self, oracle: &O, encoding: &Encoding) -> Result<Plan, EncodingError> {
        let mut frames = Vec::with_capacity(encoding.horizon + 1);

        for t in 0..=encoding.horizon {
            let players = (0..self.board.player_count())
                .map(|player| self.locate(oracle, &encoding.literals, EntityKind::Player, player, t))
                .collect::<Result<Vec<_>, _>>()?;
            let boxes = (0..self.board.box_count())
                .map(|box_index| self.locate(oracle, &encoding.literals, EntityKind::Box, box_index, t))
                .collect::<Result<Vec<_>, _>>()?;
            frames.push(Frame { t, players, boxes });
        }

        Ok(Plan::new(self.options.mode, frames))
    }

    /// The single cell holding `entity` at `t`
    fn locate<O: SatOracle>(
        &self,
        oracle: &O,
        literals: &LiteralManager,
        kind: EntityKind,
        entity: usize,
        t: usize,
    ) -> Result<Cell, EncodingError> {
        let mut found: Option<Cell> = None;

        for &cell in self.board.walkable() {
            let key = match kind {
                EntityKind::Player => LiteralKey::player(cell, entity, t),
                EntityKind::Box => LiteralKey::box_at(cell, entity, t),
            };
            let Some(id) = literals.lookup(&key) else {
                continue;
            };
            if oracle.value(id) != Some(true) {
                continue;
            }
            if let Some(first) = found {
                return Err(EncodingError::AmbiguousModel {
                    kind,
                    entity,
                    t,
                    first,
                    second: cell,
                });
            }
            found = Some(cell);
        }

        found.ok_or(EncodingError::IncompleteModel { kind, entity, t })
    }

    /// A reason the board has no solution at any horizon, found without
    /// encoding anything
    pub fn structural_obstacle(&self) -> Option<String> {
        let boxes = self.board.box_count();
        let targets = self.board.targets().len();

        match self.options.mode {
            PlanMode::Push if boxes < targets => {
                Some(format!("{} boxes cannot cover {} targets", boxes, targets))
            }
            PlanMode::Pull if boxes > 0 && targets == 0 => Some("no targets to pull boxes from".to_string()),
            PlanMode::Push => self
                .board
                .boxes()
                .iter()
                .find(|&&start| boxes <= targets && self.analysis.deadlocks.contains(start))
                .map(|start| format!("box at {} starts on a dead cell", start)),
            PlanMode::Pull => None,
        }
    }

    /// Heuristic size estimate for one horizon
    pub fn estimate_complexity(&self, horizon: usize) -> ComplexityEstimate {
        let walkable = self.board.walkable().len();
        let players = self.board.player_count();
        let boxes = self.board.box_count();
        let box_cells = ConstraintEncoder::new(&self.board, &self.analysis, self.options.clone(), horizon)
            .box_cells()
            .len();
        let steps = horizon + 1;

        let estimated_variables = (walkable * players + box_cells * boxes) * steps;
        // placement pairs dominate
        let estimated_clauses = steps
            * (players * walkable * walkable.saturating_sub(1) / 2
                + boxes * box_cells * box_cells.saturating_sub(1) / 2
                + 2 * walkable * players
                + box_cells * boxes * (players + 1));

        let complexity_level = if estimated_variables < 1_000 {
            ComplexityLevel::Low
        } else if estimated_variables < 10_000 {
            ComplexityLevel::Medium
        } else if estimated_variables < 100_000 {
            ComplexityLevel::High
        } else {
            ComplexityLevel::VeryHigh
        };

        ComplexityEstimate {
            complexity_level,
            estimated_variables,
            estimated_clauses,
            walkable_cells: walkable,
            box_cells,
            horizon,
        }
    }
}

/// Statistics about the SAT encoding
#[derive(Debug, Clone)]
pub struct EncodingStatistics {
    pub horizon: usize,
    pub total_variables: usize,
    pub total_clauses: usize,
    pub families: BTreeMap<ConstraintFamily, usize>,
    pub literals: LiteralStatistics,
}

/// Complexity estimate for the problem
#[derive(Debug, Clone)]
pub struct ComplexityEstimate {
    pub complexity_level: ComplexityLevel,
    pub estimated_variables: usize,
    pub estimated_clauses: usize,
    pub walkable_cells: usize,
    pub box_cells: usize,
    pub horizon: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl fmt::Display for EncodingStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SAT Encoding Statistics:")?;
        writeln!(f, "  Horizon: {}", self.horizon)?;
        writeln!(f, "  Total variables: {}", self.total_variables)?;
        writeln!(f, "  Total clauses: {}", self.total_clauses)?;
        for (family, count) in &self.families {
            writeln!(f, "    {}: {}", family, count)?;
        }
        Ok(())
    }
}

impl fmt::Display for ComplexityEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Problem Complexity Estimate:")?;
        writeln!(f, "  Complexity level: {:?}", self.complexity_level)?;
        writeln!(f, "  Horizon: {}", self.horizon)?;
        writeln!(f, "  Estimated variables: {}", self.estimated_variables)?;
        writeln!(f, "  Estimated clauses: {}", self.estimated_clauses)?;
        writeln!(f, "  Walkable cells: {}", self.walkable_cells)?;
        writeln!(f, "  Box cells: {}", self.box_cells)?;

        let recommendation = match self.complexity_level {
            ComplexityLevel::Low => "Should solve quickly",
            ComplexityLevel::Medium => "May take some time to solve",
            ComplexityLevel::High => "Likely to be challenging, consider a smaller horizon",
            ComplexityLevel::VeryHigh => "Very challenging, consider a smaller horizon or a smaller map",
        };
        writeln!(f, "  Recommendation: {}", recommendation)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::parse_board;
    use crate::sat::CadicalOracle;
    use crate::search::PlanValidator;

    const STRAIGHT: &str = "#######\n#     #\n#@$ . #\n#     #\n#######\n";
    const CORRIDOR: &str = "##########\n#   ##   #\n#@$    . #\n#   ##   #\n##########\n";
    const TWO_PLAYERS: &str = "#######\n#@    #\n#  $. #\n#@    #\n#######\n";
    const PULL: &str = "#######\n#     #\n# @*  #\n#     #\n#######\n";
    const SEALED: &str = "####\n#*@#\n####\n";
    const TWO_BOXES: &str = "########\n#      #\n# $ .  #\n#@$ .  #\n#      #\n########\n";
    const TWO_BOX_CORRIDOR: &str =
        "###########\n#    ##   #\n#@$     . #\n#  $.##   #\n#    ##   #\n###########\n";

    fn encoder(text: &str, options: EncoderOptions) -> SatEncoder {
        SatEncoder::new(parse_board(text).unwrap(), options)
    }

    fn solve(encoder: &SatEncoder, horizon: usize) -> Attempt {
        let mut oracle = CadicalOracle::new();
        encoder.attempt(horizon, &mut oracle).unwrap()
    }

    /// Option sets that must agree on every outcome
    fn variants() -> Vec<EncoderOptions> {
        vec![
            EncoderOptions::default(),
            EncoderOptions {
                tunnel_macro: false,
                ..Default::default()
            },
            EncoderOptions {
                deadlock_pruning: false,
                ..Default::default()
            },
            EncoderOptions {
                expansion_limit: 1,
                ..Default::default()
            },
        ]
    }

    /// UNSAT below `expected`, SAT at it, for every option set
    fn assert_first_sat_horizon(text: &str, expected: usize) {
        for options in variants() {
            let encoder = encoder(text, options.clone());
            for horizon in 0..=expected {
                let attempt = solve(&encoder, horizon);
                assert_eq!(
                    attempt.outcome == SolveOutcome::Sat,
                    horizon == expected,
                    "horizon {} with {:?}",
                    horizon,
                    options
                );
                assert!(attempt.statistics.families[&ConstraintFamily::BoxCollision] > 0);

                if let Some(plan) = attempt.plan {
                    let result = PlanValidator::new(encoder.board()).validate(&plan);
                    assert!(result.is_valid, "{:?} with {:?}", result.violations, options);
                    assert_eq!(plan.horizon, expected);
                }
            }
        }
    }

    fn pull_options() -> EncoderOptions {
        EncoderOptions {
            mode: PlanMode::Pull,
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_horizon_round_trip() {
        let encoder = encoder(STRAIGHT, EncoderOptions::default());

        for horizon in 0..2 {
            assert_eq!(solve(&encoder, horizon).outcome, SolveOutcome::Unsat, "horizon {}", horizon);
        }

        let attempt = solve(&encoder, 2);
        assert_eq!(attempt.outcome, SolveOutcome::Sat);
        let plan = attempt.plan.unwrap();
        assert_eq!(plan.frames.len(), 3);
        assert_eq!(plan.frame(2).unwrap().boxes, vec![Cell::new(2, 4)]);
        assert_eq!(plan.moves(0), "RR");
        assert!(PlanValidator::new(encoder.board()).validate(&plan).is_valid);
    }

    #[test]
    fn test_sat_is_monotone_in_horizon() {
        let encoder = encoder(STRAIGHT, EncoderOptions::default());
        for horizon in 2..5 {
            let attempt = solve(&encoder, horizon);
            assert_eq!(attempt.outcome, SolveOutcome::Sat);
            let plan = attempt.plan.unwrap();
            assert!(PlanValidator::new(encoder.board()).validate(&plan).is_valid);
        }
    }

    #[test]
    fn test_tunnel_macro_is_transparent() {
        let with_macro = encoder(CORRIDOR, EncoderOptions::default());
        let without_macro = encoder(
            CORRIDOR,
            EncoderOptions {
                tunnel_macro: false,
                ..Default::default()
            },
        );
        assert_eq!(with_macro.analysis().tunnels.len(), 1);

        for horizon in [4, 5, 6] {
            let a = solve(&with_macro, horizon);
            let b = solve(&without_macro, horizon);
            assert_eq!(a.outcome, b.outcome, "horizon {}", horizon);
            assert_eq!(a.outcome == SolveOutcome::Sat, horizon >= 5);
            assert!(a.statistics.families.contains_key(&ConstraintFamily::TunnelMacro));
            assert!(!b.statistics.families.contains_key(&ConstraintFamily::TunnelMacro));

            if let Some(plan) = a.plan {
                assert!(PlanValidator::new(with_macro.board()).validate(&plan).is_valid);
            }
        }
    }

    #[test]
    fn test_deadlock_pruning_is_transparent() {
        let pruned = encoder(STRAIGHT, EncoderOptions::default());
        let unpruned = encoder(
            STRAIGHT,
            EncoderOptions {
                deadlock_pruning: false,
                ..Default::default()
            },
        );
        for horizon in [1, 2, 3] {
            assert_eq!(solve(&pruned, horizon).outcome, solve(&unpruned, horizon).outcome);
        }
    }

    #[test]
    fn test_two_boxes_agree_across_options() {
        // lower box first, walk round, then the upper box
        assert_first_sat_horizon(TWO_BOXES, 7);
    }

    #[test]
    fn test_two_boxes_through_corridor() {
        let encoder = encoder(TWO_BOX_CORRIDOR, EncoderOptions::default());
        assert!(!encoder.analysis().tunnels.is_empty());
        let attempt = solve(&encoder, 10);
        assert!(attempt.statistics.families[&ConstraintFamily::TunnelMacro] > 0);
        assert_eq!(attempt.outcome, SolveOutcome::Sat);

        // one push on the long box, the short box, then the corridor run
        assert_first_sat_horizon(TWO_BOX_CORRIDOR, 10);
    }

    #[test]
    fn test_pull_inverse_scenario() {
        let encoder = encoder(PULL, pull_options());

        assert_eq!(solve(&encoder, 0).outcome, SolveOutcome::Unsat);

        let attempt = solve(&encoder, 1);
        assert_eq!(attempt.outcome, SolveOutcome::Sat);
        let plan = attempt.plan.unwrap();
        let last = plan.last().unwrap();
        assert_ne!(last.boxes[0], Cell::new(2, 3));
        assert!(encoder.analysis().pullable.as_ref().unwrap().contains(last.boxes[0]));
        assert!(PlanValidator::new(encoder.board()).validate(&plan).is_valid);

        // played backwards it pushes the box home
        let forward = plan.reversed();
        assert_eq!(forward.mode, PlanMode::Push);
        assert!(PlanValidator::new(encoder.board()).validate_trajectory(&forward).is_valid);
    }

    #[test]
    fn test_pull_without_room_is_unsat() {
        let encoder = encoder(SEALED, pull_options());
        for horizon in 0..5 {
            assert_eq!(solve(&encoder, horizon).outcome, SolveOutcome::Unsat);
        }
    }

    #[test]
    fn test_multi_agent_with_transfer_literals() {
        let options = EncoderOptions {
            expansion_limit: 1,
            ..Default::default()
        };
        let aux = encoder(TWO_PLAYERS, options);
        let full = encoder(TWO_PLAYERS, EncoderOptions::default());

        for horizon in [2, 3] {
            let a = solve(&aux, horizon);
            let b = solve(&full, horizon);
            assert_eq!(a.outcome, b.outcome);
            assert_eq!(a.outcome == SolveOutcome::Sat, horizon == 3);
            assert!(a.statistics.literals.transfer_variables > 0);

            if let Some(plan) = a.plan {
                let result = PlanValidator::new(aux.board()).validate(&plan);
                assert!(result.is_valid, "{:?}", result.violations);
            }
        }
    }

    #[test]
    fn test_shared_start_is_unsat() {
        // two players listed on the same cell collide at t=0
        let walls: Vec<Cell> = (0..5)
            .flat_map(|col| [Cell::new(0, col), Cell::new(2, col)])
            .chain([Cell::new(1, 0), Cell::new(1, 4)])
            .collect();
        let floor = [Cell::new(1, 1), Cell::new(1, 2), Cell::new(1, 3)];
        let start = Cell::new(1, 1);
        let board = BoardModel::from_parts(3, 5, &walls, &floor, &[], &[start, start], &[]).unwrap();
        let encoder = SatEncoder::new(board, EncoderOptions::default());

        for horizon in 0..3 {
            let attempt = solve(&encoder, horizon);
            assert_eq!(attempt.outcome, SolveOutcome::Unsat);
            assert!(attempt.statistics.families[&ConstraintFamily::PlayerCollision] > 0);
        }
    }

    #[test]
    fn test_structural_obstacles() {
        let short = encoder("######\n#@$..#\n######\n", EncoderOptions::default());
        assert!(short.structural_obstacle().is_some());

        let dead_start = encoder("#####\n#$  #\n#@ .#\n#####\n", EncoderOptions::default());
        assert!(dead_start.structural_obstacle().unwrap().contains("dead cell"));

        let no_targets = encoder("#####\n#@$ #\n#####\n", pull_options());
        assert!(no_targets.structural_obstacle().is_some());

        assert!(encoder(STRAIGHT, EncoderOptions::default()).structural_obstacle().is_none());
    }

    #[test]
    fn test_complexity_estimation() {
        let encoder = encoder(STRAIGHT, EncoderOptions::default());
        let estimate = encoder.estimate_complexity(10);

        assert_eq!(estimate.walkable_cells, 15);
        assert!(estimate.box_cells < estimate.walkable_cells);
        assert_eq!(estimate.horizon, 10);
        assert_eq!(estimate.complexity_level, ComplexityLevel::Low);
    }

    #[test]
    fn test_rejected_clause_is_reported() {
        struct Refusing;
        impl SatOracle for Refusing {
            fn add_clause(&mut self, _literals: &[i32]) -> bool {
                false
            }
            fn solve(&mut self) -> SolveOutcome {
                SolveOutcome::Unknown
            }
            fn value(&self, _variable: i32) -> Option<bool> {
                None
            }
        }

        let encoder = encoder(STRAIGHT, EncoderOptions::default());
        let err = encoder.attempt(1, &mut Refusing).unwrap_err();
        assert!(matches!(err, EncodingError::ClauseRejected { index: 0 }));
    }

    #[test]
    fn test_decode_reports_incomplete_model() {
        struct AllFalse;
        impl SatOracle for AllFalse {
            fn add_clause(&mut self, _literals: &[i32]) -> bool {
                true
            }
            fn solve(&mut self) -> SolveOutcome {
                SolveOutcome::Sat
            }
            fn value(&self, _variable: i32) -> Option<bool> {
                Some(false)
            }
        }

        let encoder = encoder(STRAIGHT, EncoderOptions::default());
        let err = encoder.attempt(1, &mut AllFalse).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::IncompleteModel {
                kind: EntityKind::Player,
                entity: 0,
                t: 0
            }
        ));
    }
}
