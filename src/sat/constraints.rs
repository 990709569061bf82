//! Constraint generation for the Sokoban SAT encoding

use super::LiteralManager;
use crate::analysis::{BoardAnalysis, PullableSet};
use crate::board::{BoardModel, Cell, Direction};
use crate::config::{PlanMode, Settings};
use crate::error::EncodingError;
use itertools::Itertools;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use tracing::{debug, warn};

/// Represents a SAT clause (disjunction of literals)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub literals: Vec<i32>, // Positive for variable, negative for negation
}

impl Clause {
    pub fn new(literals: Vec<i32>) -> Self {
        Self { literals }
    }

    pub fn unit(literal: i32) -> Self {
        Self {
            literals: vec![literal],
        }
    }

    pub fn binary(lit1: i32, lit2: i32) -> Self {
        Self {
            literals: vec![lit1, lit2],
        }
    }

    /// Check if clause is empty (unsatisfiable)
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn is_unit(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }
}

/// Named groups of clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintFamily {
    InitState,
    SolvedState,
    PlayerMovement,
    BoxPushMovement,
    PlayerPullConstraints,
    SinglePlacement,
    BoxCollision,
    BoxPlayerCollision,
    PlayerCollision,
    PlayerHeadOn,
    Existence,
    TunnelMacro,
    PullStageTarget,
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintFamily::InitState => "init-state",
            ConstraintFamily::SolvedState => "solved-state",
            ConstraintFamily::PlayerMovement => "player-movement",
            ConstraintFamily::BoxPushMovement => "box-push-movement",
            ConstraintFamily::PlayerPullConstraints => "player-pull",
            ConstraintFamily::SinglePlacement => "single-placement",
            ConstraintFamily::BoxCollision => "box-collision",
            ConstraintFamily::BoxPlayerCollision => "box-player-collision",
            ConstraintFamily::PlayerCollision => "player-collision",
            ConstraintFamily::PlayerHeadOn => "player-head-on",
            ConstraintFamily::Existence => "existence",
            ConstraintFamily::TunnelMacro => "tunnel-macro",
            ConstraintFamily::PullStageTarget => "pull-stage-target",
        };
        write!(f, "{}", name)
    }
}

/// Ordered clause list for one horizon, tagged per family
#[derive(Debug, Clone, Default)]
pub struct Formula {
    clauses: Vec<Clause>,
    family_counts: BTreeMap<ConstraintFamily, usize>,
}

impl Formula {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause; an empty clause is refused
    pub fn push(&mut self, family: ConstraintFamily, clause: Clause) -> Result<(), EncodingError> {
        if clause.is_empty() {
            return Err(EncodingError::EmptyClause { family });
        }
        self.clauses.push(clause);
        *self.family_counts.entry(family).or_insert(0) += 1;
        Ok(())
    }

    pub fn extend(
        &mut self,
        family: ConstraintFamily,
        clauses: impl IntoIterator<Item = Clause>,
    ) -> Result<(), EncodingError> {
        for clause in clauses {
            self.push(family, clause)?;
        }
        Ok(())
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn count(&self, family: ConstraintFamily) -> usize {
        self.family_counts.get(&family).copied().unwrap_or(0)
    }

    pub fn family_counts(&self) -> &BTreeMap<ConstraintFamily, usize> {
        &self.family_counts
    }

    /// Write the formula in DIMACS CNF
    pub fn write_dimacs<W: Write>(&self, mut out: W, variables: usize) -> Result<(), EncodingError> {
        for (family, count) in &self.family_counts {
            writeln!(out, "c {} {}", family, count)?;
        }
        writeln!(out, "p cnf {} {}", variables, self.clauses.len())?;
        for clause in &self.clauses {
            for literal in &clause.literals {
                write!(out, "{} ", literal)?;
            }
            writeln!(out, "0")?;
        }
        Ok(())
    }
}

/// Knobs that change which clauses are emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderOptions {
    pub mode: PlanMode,
    pub tunnel_macro: bool,
    pub deadlock_pruning: bool,
    pub expansion_limit: usize,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            mode: PlanMode::Push,
            tunnel_macro: true,
            deadlock_pruning: true,
            expansion_limit: 729,
        }
    }
}

impl EncoderOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            mode: settings.search.mode,
            tunnel_macro: settings.encoding.tunnel_macro,
            deadlock_pruning: settings.encoding.deadlock_pruning,
            expansion_limit: settings.encoding.expansion_limit,
        }
    }
}

/// One way box `j` can have arrived on a cell: the three facts that must
/// hold together, plus the player and travel direction they describe.
struct Candidate {
    player: usize,
    direction: Direction,
    facts: [i32; 3],
}

/// Emits every clause family for one horizon.
///
/// Box literals are only created on box cells: walkable cells that are not
/// deadlocks when pruning is active, every walkable cell otherwise. The
/// only exception is a box start, which always gets its positive unit.
pub struct ConstraintEncoder<'a> {
    board: &'a BoardModel,
    analysis: &'a BoardAnalysis,
    options: EncoderOptions,
    horizon: usize,
    literals: LiteralManager,
    box_cells: Vec<Cell>,
    box_mask: Vec<bool>,
}

impl<'a> ConstraintEncoder<'a> {
    pub fn new(
        board: &'a BoardModel,
        analysis: &'a BoardAnalysis,
        options: EncoderOptions,
        horizon: usize,
    ) -> Self {
        let literals = LiteralManager::new(
            board.rows,
            board.cols,
            horizon,
            board.player_count(),
            board.box_count(),
        );

        // surplus boxes may legitimately park on dead cells
        let prune = options.deadlock_pruning && board.box_count() <= board.targets().len();
        let box_cells: Vec<Cell> = board
            .walkable()
            .iter()
            .copied()
            .filter(|&cell| !prune || !analysis.deadlocks.contains(cell))
            .collect();
        let mut box_mask = vec![false; board.rows * board.cols];
        for &cell in &box_cells {
            box_mask[board.index(cell)] = true;
        }

        Self {
            board,
            analysis,
            options,
            horizon,
            literals,
            box_cells,
            box_mask,
        }
    }

    /// Cells a box literal may refer to
    pub fn box_cells(&self) -> &[Cell] {
        &self.box_cells
    }

    pub fn is_box_cell(&self, cell: Cell) -> bool {
        self.board.contains(cell) && self.box_mask[self.board.index(cell)]
    }

    pub fn literals(&self) -> &LiteralManager {
        &self.literals
    }

    pub fn into_literals(self) -> LiteralManager {
        self.literals
    }

    fn player(&mut self, cell: Cell, player: usize, t: usize) -> Result<i32, EncodingError> {
        self.literals.player(cell, player, t)
    }

    fn box_at(&mut self, cell: Cell, box_index: usize, t: usize) -> Result<i32, EncodingError> {
        self.literals.box_at(cell, box_index, t)
    }

    /// Generate every family that applies to the board and mode
    pub fn generate_all_constraints(&mut self) -> Result<Formula, EncodingError> {
        let mut formula = Formula::new();
        let push_mode = self.options.mode == PlanMode::Push;
        let multi_agent = self.board.player_count() > 1;

        let mut emit = |family: ConstraintFamily, clauses: Vec<Clause>| {
            debug!(family = %family, clauses = clauses.len(), "generated constraints");
            formula.extend(family, clauses)
        };

        emit(ConstraintFamily::InitState, self.generate_init_constraints()?)?;
        if push_mode {
            emit(ConstraintFamily::SolvedState, self.generate_solved_constraints()?)?;
        }
        emit(ConstraintFamily::PlayerMovement, self.generate_player_movement_constraints()?)?;
        if push_mode {
            emit(ConstraintFamily::BoxPushMovement, self.generate_box_transfer_constraints()?)?;
        } else {
            emit(ConstraintFamily::PlayerPullConstraints, self.generate_box_transfer_constraints()?)?;
        }
        emit(ConstraintFamily::SinglePlacement, self.generate_single_placement_constraints()?)?;
        emit(ConstraintFamily::BoxCollision, self.generate_box_collision_constraints()?)?;
        emit(ConstraintFamily::BoxPlayerCollision, self.generate_box_player_collision_constraints()?)?;
        if multi_agent {
            emit(ConstraintFamily::PlayerCollision, self.generate_player_collision_constraints()?)?;
            emit(ConstraintFamily::PlayerHeadOn, self.generate_head_on_constraints()?)?;
        }
        emit(ConstraintFamily::Existence, self.generate_existence_constraints()?)?;
        if self.options.tunnel_macro && push_mode && !multi_agent {
            emit(ConstraintFamily::TunnelMacro, self.generate_tunnel_constraints()?)?;
        }
        if !push_mode {
            emit(ConstraintFamily::PullStageTarget, self.generate_pull_stage_constraints()?)?;
        }

        Ok(formula)
    }

    /// Fix every entity to its start cell at t=0 and exclude it from every
    /// other cell it could occupy
    fn generate_init_constraints(&mut self) -> Result<Vec<Clause>, EncodingError> {
        let mut clauses = Vec::new();
        let board = self.board;

        for (player, &start) in board.players().iter().enumerate() {
            clauses.push(Clause::unit(self.player(start, player, 0)?));
            for &cell in board.walkable() {
                if cell != start {
                    clauses.push(Clause::unit(-self.player(cell, player, 0)?));
                }
            }
        }

        let box_cells = self.box_cells.clone();
        for (box_index, &start) in board.boxes().iter().enumerate() {
            clauses.push(Clause::unit(self.box_at(start, box_index, 0)?));
            for &cell in &box_cells {
                if cell != start {
                    clauses.push(Clause::unit(-self.box_at(cell, box_index, 0)?));
                }
            }
        }

        Ok(clauses)
    }

    /// Every target hosts some box at t=H
    fn generate_solved_constraints(&mut self) -> Result<Vec<Clause>, EncodingError> {
        let mut clauses = Vec::new();
        let board = self.board;
        let horizon = self.horizon;
        for &target in board.targets() {
            let literals = (0..board.box_count())
                .map(|box_index| self.box_at(target, box_index, horizon))
                .collect::<Result<Vec<_>, _>>()?;
            clauses.push(Clause::new(literals));
        }
        Ok(clauses)
    }

    /// Frame axioms: a player on `c` at `t` was on `c` or a neighbour at
    /// `t-1`, and will be on `c` or a neighbour at `t+1`
    fn generate_player_movement_constraints(&mut self) -> Result<Vec<Clause>, EncodingError> {
        let mut clauses = Vec::new();
        let board = self.board;

        for player in 0..board.player_count() {
            for &cell in board.walkable() {
                let neighbors: Vec<Cell> = board.open_neighbors(cell).collect();

                for t in 0..self.horizon {
                    let mut literals = vec![-self.player(cell, player, t)?, self.player(cell, player, t + 1)?];
                    for &next in &neighbors {
                        literals.push(self.player(next, player, t + 1)?);
                    }
                    clauses.push(Clause::new(literals));
                }

                for t in 1..=self.horizon {
                    let mut literals = vec![-self.player(cell, player, t)?, self.player(cell, player, t - 1)?];
                    for &prev in &neighbors {
                        literals.push(self.player(prev, player, t - 1)?);
                    }
                    clauses.push(Clause::new(literals));
                }
            }
        }

        Ok(clauses)
    }

    /// Ways box `box_index` could have been moved onto `cell` between `t-1`
    /// and `t`, one per player and travel direction.
    ///
    /// Push: the box came from `cell - d` with the player behind it on
    /// `cell - 2d`, and the player now stands on `cell - d`.
    /// Pull: the box came from `cell - d` with the player on `cell`, and the
    /// player has retreated to `cell + d`.
    fn transfer_candidates(
        &mut self,
        cell: Cell,
        box_index: usize,
        t: usize,
    ) -> Result<Vec<Candidate>, EncodingError> {
        let mut candidates = Vec::new();
        let board = self.board;

        for direction in Direction::ALL {
            let Some(from) = board.step(cell, direction.opposite()) else {
                continue;
            };
            if !self.is_box_cell(from) {
                continue;
            }

            let (before, after) = match self.options.mode {
                PlanMode::Push => match board.open_step(from, direction.opposite()) {
                    Some(behind) => (behind, from),
                    None => continue,
                },
                PlanMode::Pull => match board.open_step(cell, direction) {
                    Some(ahead) => (cell, ahead),
                    None => continue,
                },
            };

            for player in 0..board.player_count() {
                let facts = [
                    self.box_at(from, box_index, t - 1)?,
                    self.player(before, player, t - 1)?,
                    self.player(after, player, t)?,
                ];
                candidates.push(Candidate {
                    player,
                    direction,
                    facts,
                });
            }
        }

        Ok(candidates)
    }

    /// A box on `c` at `t` was already there at `t-1` or was moved there by
    /// one of the candidates.
    ///
    /// The disjunction of conjunctions is expanded by Cartesian product when
    /// it yields at most `expansion_limit` clauses; beyond that, one transfer
    /// variable per candidate implies its three facts instead.
    fn generate_box_transfer_constraints(&mut self) -> Result<Vec<Clause>, EncodingError> {
        let mut clauses = Vec::new();
        let box_cells = self.box_cells.clone();

        for &cell in &box_cells {
            for box_index in 0..self.board.box_count() {
                for t in 1..=self.horizon {
                    let frame = vec![-self.box_at(cell, box_index, t)?, self.box_at(cell, box_index, t - 1)?];
                    let candidates = self.transfer_candidates(cell, box_index, t)?;

                    if candidates.is_empty() {
                        clauses.push(Clause::new(frame));
                        continue;
                    }

                    let expansion = u32::try_from(candidates.len())
                        .ok()
                        .and_then(|k| 3usize.checked_pow(k));
                    match expansion {
                        Some(size) if size <= self.options.expansion_limit => {
                            for choice in candidates
                                .iter()
                                .map(|candidate| candidate.facts.iter().copied())
                                .multi_cartesian_product()
                            {
                                let mut literals = frame.clone();
                                literals.extend(choice);
                                clauses.push(Clause::new(literals));
                            }
                        }
                        _ => {
                            let mut literals = frame;
                            for candidate in &candidates {
                                let selector = self.literals.transfer(
                                    cell,
                                    candidate.player,
                                    box_index,
                                    candidate.direction,
                                    t,
                                )?;
                                for &fact in &candidate.facts {
                                    clauses.push(Clause::binary(-selector, fact));
                                }
                                literals.push(selector);
                            }
                            clauses.push(Clause::new(literals));
                        }
                    }
                }
            }
        }

        Ok(clauses)
    }

    /// Each player and each box occupies at most one cell per time step
    fn generate_single_placement_constraints(&mut self) -> Result<Vec<Clause>, EncodingError> {
        let mut clauses = Vec::new();
        let board = self.board;
        let walkable = board.walkable();
        let box_cells = self.box_cells.clone();

        for player in 0..board.player_count() {
            for t in 0..=self.horizon {
                for (a, b) in walkable.iter().tuple_combinations() {
                    clauses.push(Clause::binary(
                        -self.player(*a, player, t)?,
                        -self.player(*b, player, t)?,
                    ));
                }
            }
        }

        for box_index in 0..board.box_count() {
            for t in 0..=self.horizon {
                for (a, b) in box_cells.iter().tuple_combinations() {
                    clauses.push(Clause::binary(
                        -self.box_at(*a, box_index, t)?,
                        -self.box_at(*b, box_index, t)?,
                    ));
                }
            }
        }

        Ok(clauses)
    }

    /// No two boxes share a cell
    fn generate_box_collision_constraints(&mut self) -> Result<Vec<Clause>, EncodingError> {
        let mut clauses = Vec::new();
        let box_cells = self.box_cells.clone();

        for (first, second) in (0..self.board.box_count()).tuple_combinations() {
            for &cell in &box_cells {
                for t in 0..=self.horizon {
                    clauses.push(Clause::binary(
                        -self.box_at(cell, first, t)?,
                        -self.box_at(cell, second, t)?,
                    ));
                }
            }
        }

        Ok(clauses)
    }

    /// No player stands on a box
    fn generate_box_player_collision_constraints(&mut self) -> Result<Vec<Clause>, EncodingError> {
        let mut clauses = Vec::new();
        let box_cells = self.box_cells.clone();

        for player in 0..self.board.player_count() {
            for box_index in 0..self.board.box_count() {
                for &cell in &box_cells {
                    for t in 0..=self.horizon {
                        clauses.push(Clause::binary(
                            -self.box_at(cell, box_index, t)?,
                            -self.player(cell, player, t)?,
                        ));
                    }
                }
            }
        }

        Ok(clauses)
    }

    fn generate_player_collision_constraints(&mut self) -> Result<Vec<Clause>, EncodingError> {
        let mut clauses = Vec::new();
        let board = self.board;

        for (first, second) in (0..board.player_count()).tuple_combinations() {
            for &cell in board.walkable() {
                for t in 0..=self.horizon {
                    clauses.push(Clause::binary(
                        -self.player(cell, first, t)?,
                        -self.player(cell, second, t)?,
                    ));
                }
            }
        }

        Ok(clauses)
    }

    /// Two players never swap adjacent cells in one step
    fn generate_head_on_constraints(&mut self) -> Result<Vec<Clause>, EncodingError> {
        let mut clauses = Vec::new();
        let board = self.board;

        for (first, second) in (0..board.player_count()).tuple_combinations() {
            for &cell in board.walkable() {
                for direction in [Direction::Right, Direction::Down] {
                    let Some(next) = board.open_step(cell, direction) else {
                        continue;
                    };
                    for t in 0..self.horizon {
                        for (p, q) in [(first, second), (second, first)] {
                            clauses.push(Clause::new(vec![
                                -self.player(cell, p, t)?,
                                -self.player(next, p, t + 1)?,
                                -self.player(next, q, t)?,
                                -self.player(cell, q, t + 1)?,
                            ]));
                        }
                    }
                }
            }
        }

        Ok(clauses)
    }

    /// Every box occupies some box cell at every step after the start
    fn generate_existence_constraints(&mut self) -> Result<Vec<Clause>, EncodingError> {
        let mut clauses = Vec::new();
        let box_cells = self.box_cells.clone();

        for t in 1..=self.horizon {
            for box_index in 0..self.board.box_count() {
                let literals = box_cells
                    .iter()
                    .map(|&cell| self.box_at(cell, box_index, t))
                    .collect::<Result<Vec<_>, _>>()?;
                clauses.push(Clause::new(literals));
            }
        }

        Ok(clauses)
    }

    /// A player that steps into a corridor keeps walking through it, unless
    /// a box sits on the next cell.
    ///
    /// Only sound with a single player in push mode; the caller checks both.
    fn generate_tunnel_constraints(&mut self) -> Result<Vec<Clause>, EncodingError> {
        let mut clauses = Vec::new();
        let tunnels: Vec<_> = self.analysis.tunnels.iter().copied().collect();
        let forward_steps = self.horizon.saturating_sub(1);

        for tunnel in tunnels {
            let forward = tunnel.orientation().forward();
            for direction in [forward, forward.opposite()] {
                let Some(path) = tunnel.crossing(direction) else {
                    continue;
                };

                for (&prev, &curr, &next) in path.iter().tuple_windows() {
                    let escape_cell = self.is_box_cell(next);
                    for t in 1..=forward_steps {
                        let mut literals = vec![
                            -self.player(prev, 0, t - 1)?,
                            -self.player(curr, 0, t)?,
                            self.player(next, 0, t + 1)?,
                        ];
                        if escape_cell {
                            for box_index in 0..self.board.box_count() {
                                literals.push(self.box_at(next, box_index, t)?);
                            }
                        }
                        clauses.push(Clause::new(literals));
                    }
                }
            }
        }

        Ok(clauses)
    }

    /// Pull-mode goal: at least one box leaves the target it started on, and
    /// every box ends inside the pullable region
    fn generate_pull_stage_constraints(&mut self) -> Result<Vec<Clause>, EncodingError> {
        let mut clauses = Vec::new();
        let board = self.board;
        let horizon = self.horizon;

        let soft_goal = board
            .boxes()
            .iter()
            .enumerate()
            .filter(|(_, &start)| board.is_target(start))
            .map(|(box_index, &start)| self.box_at(start, box_index, horizon).map(|lit| -lit))
            .collect::<Result<Vec<_>, _>>()?;
        if soft_goal.is_empty() {
            warn!("no box starts on a target; skipping the leave-target goal");
        } else {
            clauses.push(Clause::new(soft_goal));
        }

        let analysis = self.analysis;
        let pullable = match &analysis.pullable {
            Some(pullable) => Cow::Borrowed(pullable),
            None => Cow::Owned(PullableSet::analyze(board, &analysis.deadlocks)),
        };
        let region: Vec<Cell> = pullable.cells().filter(|&cell| self.is_box_cell(cell)).collect();

        for box_index in 0..board.box_count() {
            let literals = region
                .iter()
                .map(|&cell| self.box_at(cell, box_index, horizon))
                .collect::<Result<Vec<_>, _>>()?;
            clauses.push(Clause::new(literals));
        }

        Ok(clauses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::parse_board;
    use crate::sat::variables::LiteralKind;

    const STRAIGHT: &str = "#######\n#     #\n#@$ . #\n#     #\n#######\n";
    const TWO_PLAYERS: &str = "#######\n#@    #\n#  $. #\n#@    #\n#######\n";

    fn build(text: &str, options: EncoderOptions, horizon: usize) -> (Formula, LiteralManager) {
        let board = parse_board(text).unwrap();
        let analysis = BoardAnalysis::new(&board, options.mode);
        let mut encoder = ConstraintEncoder::new(&board, &analysis, options, horizon);
        let formula = encoder.generate_all_constraints().unwrap();
        (formula, encoder.into_literals())
    }

    #[test]
    fn test_clause_creation() {
        let clause = Clause::new(vec![1, -2, 3]);
        assert_eq!(clause.literals, vec![1, -2, 3]);
        assert!(!clause.is_empty());
        assert!(!clause.is_unit());

        let unit_clause = Clause::unit(5);
        assert!(unit_clause.is_unit());
        assert_eq!(unit_clause.literals, vec![5]);
    }

    #[test]
    fn test_formula_rejects_empty_clause() {
        let mut formula = Formula::new();
        formula.push(ConstraintFamily::InitState, Clause::unit(1)).unwrap();
        let err = formula
            .push(ConstraintFamily::Existence, Clause::new(vec![]))
            .unwrap_err();

        assert!(matches!(
            err,
            EncodingError::EmptyClause {
                family: ConstraintFamily::Existence
            }
        ));
        assert_eq!(formula.len(), 1);
        assert_eq!(formula.count(ConstraintFamily::InitState), 1);
    }

    #[test]
    fn test_clauses_well_formed() {
        for (text, mode) in [
            (STRAIGHT, PlanMode::Push),
            (TWO_PLAYERS, PlanMode::Push),
            ("########\n#      #\n# $ .  #\n#@$ .  #\n#      #\n########\n", PlanMode::Push),
            ("#######\n#     #\n# @*  #\n#     #\n#######\n", PlanMode::Pull),
        ] {
            let board = parse_board(text).unwrap();
            // a limit of 1 forces transfer literals wherever a player can push
            for expansion_limit in [1, EncoderOptions::default().expansion_limit] {
                let options = EncoderOptions {
                    mode,
                    expansion_limit,
                    ..Default::default()
                };
                let horizon = 3;
                let (formula, literals) = build(text, options, horizon);
                assert!(!formula.is_empty());

                for clause in formula.clauses() {
                    assert!(!clause.is_empty());
                    for &literal in &clause.literals {
                        let key = literals.key_of(literal).unwrap();
                        assert!(key.t <= horizon);
                        assert!(board.contains(key.cell), "{:?}", key);
                        match key.kind {
                            LiteralKind::Player => assert!(key.entity < board.player_count(), "{:?}", key),
                            LiteralKind::Box => assert!(key.entity < board.box_count(), "{:?}", key),
                            LiteralKind::Transfer { box_index, .. } => {
                                assert!(key.entity < board.player_count(), "{:?}", key);
                                assert!(box_index < board.box_count(), "{:?}", key);
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_init_state_units() {
        let (formula, literals) = build(STRAIGHT, EncoderOptions::default(), 1);
        let board = parse_board(STRAIGHT).unwrap();

        let player_start = literals
            .lookup(&crate::sat::variables::LiteralKey::player(Cell::new(2, 1), 0, 0))
            .unwrap();
        let box_start = literals
            .lookup(&crate::sat::variables::LiteralKey::box_at(Cell::new(2, 2), 0, 0))
            .unwrap();
        assert!(formula.clauses().contains(&Clause::unit(player_start)));
        assert!(formula.clauses().contains(&Clause::unit(box_start)));

        // one positive unit per entity, one negative per other candidate cell
        let analysis = BoardAnalysis::new(&board, PlanMode::Push);
        let box_cells = board
            .walkable()
            .iter()
            .filter(|&&cell| !analysis.deadlocks.contains(cell))
            .count();
        assert_eq!(
            formula.count(ConstraintFamily::InitState),
            board.walkable().len() + box_cells
        );
    }

    #[test]
    fn test_family_selection() {
        let (single, _) = build(STRAIGHT, EncoderOptions::default(), 2);
        assert_eq!(single.count(ConstraintFamily::PlayerCollision), 0);
        assert_eq!(single.count(ConstraintFamily::PlayerHeadOn), 0);
        assert_eq!(single.count(ConstraintFamily::PullStageTarget), 0);
        assert!(single.count(ConstraintFamily::BoxPushMovement) > 0);
        assert_eq!(single.count(ConstraintFamily::SolvedState), 1);

        let (multi, _) = build(TWO_PLAYERS, EncoderOptions::default(), 2);
        assert!(multi.count(ConstraintFamily::PlayerCollision) > 0);
        assert_eq!(multi.count(ConstraintFamily::TunnelMacro), 0);

        let pull = EncoderOptions {
            mode: PlanMode::Pull,
            ..Default::default()
        };
        let (pulled, _) = build("#######\n#     #\n# @*  #\n#     #\n#######\n", pull, 2);
        assert_eq!(pulled.count(ConstraintFamily::SolvedState), 0);
        assert_eq!(pulled.count(ConstraintFamily::BoxPushMovement), 0);
        assert!(pulled.count(ConstraintFamily::PlayerPullConstraints) > 0);
        assert_eq!(pulled.count(ConstraintFamily::PullStageTarget), 2);
    }

    #[test]
    fn test_head_on_clause_count() {
        let board = parse_board(TWO_PLAYERS).unwrap();
        let horizon = 2;
        let (formula, _) = build(TWO_PLAYERS, EncoderOptions::default(), horizon);

        let adjacent_pairs: usize = board
            .walkable()
            .iter()
            .map(|&cell| {
                [Direction::Right, Direction::Down]
                    .into_iter()
                    .filter(|&d| board.open_step(cell, d).is_some())
                    .count()
            })
            .sum();
        assert_eq!(
            formula.count(ConstraintFamily::PlayerHeadOn),
            adjacent_pairs * horizon * 2
        );
    }

    #[test]
    fn test_auxiliary_expansion() {
        let limited = EncoderOptions {
            expansion_limit: 1,
            ..Default::default()
        };
        let (aux, aux_literals) = build(TWO_PLAYERS, limited, 3);
        let (full, full_literals) = build(TWO_PLAYERS, EncoderOptions::default(), 3);

        assert!(aux_literals.statistics().transfer_variables > 0);
        assert_eq!(full_literals.statistics().transfer_variables, 0);
        assert!(aux.count(ConstraintFamily::BoxPushMovement) < full.count(ConstraintFamily::BoxPushMovement));

        for clause in aux.clauses() {
            for &literal in &clause.literals {
                let key = aux_literals.key_of(literal).unwrap();
                if let LiteralKind::Transfer { box_index, .. } = key.kind {
                    assert_eq!(box_index, 0);
                    assert!(key.t >= 1);
                }
            }
        }
    }

    #[test]
    fn test_deadlock_pruning_drops_box_literals() {
        let (pruned, pruned_literals) = build(STRAIGHT, EncoderOptions::default(), 2);
        let unpruned_options = EncoderOptions {
            deadlock_pruning: false,
            ..Default::default()
        };
        let (unpruned, unpruned_literals) = build(STRAIGHT, unpruned_options, 2);

        assert!(pruned_literals.statistics().box_variables < unpruned_literals.statistics().box_variables);
        assert!(pruned.len() < unpruned.len());
        // corner (1, 1) is dead and never carries a box literal
        assert!(pruned_literals
            .lookup(&crate::sat::variables::LiteralKey::box_at(Cell::new(1, 1), 0, 1))
            .is_none());
    }

    #[test]
    fn test_tunnel_macro_clauses() {
        let corridor = "##########\n#   ##   #\n#@$    . #\n#   ##   #\n##########\n";
        let horizon = 4;
        let (with_macro, _) = build(corridor, EncoderOptions::default(), horizon);
        let options = EncoderOptions {
            tunnel_macro: false,
            ..Default::default()
        };
        let (without, _) = build(corridor, options, horizon);

        // two directions, path of 4 cells gives 2 inner windows each
        assert_eq!(
            with_macro.count(ConstraintFamily::TunnelMacro),
            2 * 2 * (horizon - 1)
        );
        assert_eq!(without.count(ConstraintFamily::TunnelMacro), 0);
    }

    #[test]
    fn test_missing_boxes_yield_empty_clause() {
        let board = parse_board("#####\n#@ .#\n#####\n").unwrap();
        let analysis = BoardAnalysis::new(&board, PlanMode::Push);
        let mut encoder = ConstraintEncoder::new(&board, &analysis, EncoderOptions::default(), 1);

        let err = encoder.generate_all_constraints().unwrap_err();
        assert!(matches!(
            err,
            EncodingError::EmptyClause {
                family: ConstraintFamily::SolvedState
            }
        ));
    }

    #[test]
    fn test_write_dimacs() {
        let (formula, literals) = build(STRAIGHT, EncoderOptions::default(), 1);
        let mut out = Vec::new();
        formula.write_dimacs(&mut out, literals.variable_count()).unwrap();
        let text = String::from_utf8(out).unwrap();

        let header = format!("p cnf {} {}", literals.variable_count(), formula.len());
        assert!(text.lines().any(|line| line == header));
        let clause_lines = text
            .lines()
            .filter(|line| !line.starts_with('c') && !line.starts_with('p'))
            .count();
        assert_eq!(clause_lines, formula.len());
        assert!(text.lines().filter(|line| !line.starts_with('c') && !line.starts_with('p')).all(|line| line.ends_with(" 0")));
    }
}
