//! SAT solver integration using CaDiCaL

use super::oracle::{SatOracle, SolveOutcome};
use cadical::Solver;

/// SAT solver wrapper for CaDiCaL
pub struct CadicalOracle {
    solver: Solver,
    variable_count: usize,
    result: Option<SolveOutcome>,
}

impl Default for CadicalOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl CadicalOracle {
    pub fn new() -> Self {
        Self {
            solver: Solver::new(),
            variable_count: 0,
            result: None,
        }
    }

    /// Highest variable seen in any accepted clause
    pub fn variable_count(&self) -> usize {
        self.variable_count
    }
}

impl SatOracle for CadicalOracle {
    fn add_clause(&mut self, literals: &[i32]) -> bool {
        if literals.is_empty() || literals.contains(&0) {
            return false;
        }

        for &literal in literals {
            let var = literal.unsigned_abs() as usize;
            if var > self.variable_count {
                self.variable_count = var;
            }
        }

        self.solver.add_clause(literals.iter().copied());
        true
    }

    fn solve(&mut self) -> SolveOutcome {
        let outcome = match self.solver.solve() {
            Some(true) => SolveOutcome::Sat,
            Some(false) => SolveOutcome::Unsat,
            None => SolveOutcome::Unknown,
        };
        self.result = Some(outcome);
        outcome
    }

    fn value(&self, variable: i32) -> Option<bool> {
        // CaDiCaL only answers for variables it has seen
        let known = variable != 0 && (variable.unsigned_abs() as usize) <= self.variable_count;
        if self.result != Some(SolveOutcome::Sat) || !known {
            return None;
        }
        self.solver.value(variable)
    }
}
