//! The narrow interface the encoder needs from a SAT solver

/// Result of one `solve` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    Sat,
    Unsat,
    /// The solver gave up without an answer
    Unknown,
}

/// Anything that accepts clauses over integer variables and decides them.
///
/// Variables are positive integers starting at 1; a negative literal is the
/// negation of the same variable.
pub trait SatOracle {
    /// Add one clause; `false` means the oracle refused it
    fn add_clause(&mut self, literals: &[i32]) -> bool;

    fn solve(&mut self) -> SolveOutcome;

    /// Truth value of `variable` in the last model, if it has one
    fn value(&self, variable: i32) -> Option<bool>;
}
