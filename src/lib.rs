//! Sokoban SAT Planner
//!
//! This library encodes bounded-horizon Sokoban planning (push and pull
//! formulations, several players) as CNF and searches for the smallest
//! satisfiable horizon with a SAT solver.

pub mod analysis;
pub mod board;
pub mod config;
pub mod error;
pub mod sat;
pub mod search;
pub mod utils;

pub use board::{BoardModel, Cell, Direction};
pub use config::Settings;
pub use error::{EncodingError, MapLoadError};
pub use search::{Plan, PlanValidator, SearchDriver, SearchOutcome};

use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::warn;

/// Main entry point: load the configured map and run the horizon search.
///
/// A decoded plan is re-checked against the game rules before it is returned.
pub fn solve_map(settings: &Settings) -> Result<SearchOutcome> {
    let board = board::load_board(&settings.input.map_file)?;
    let driver = SearchDriver::from_settings(board, settings);
    let outcome = driver.solve().context("Horizon search failed")?;

    if let Some(plan) = outcome.plan() {
        let result = PlanValidator::new(driver.encoder().board()).validate(plan);
        if !result.is_valid {
            let violations = result
                .violations
                .iter()
                .map(|violation| format!("t={}: {}", violation.t, violation.description))
                .join("; ");
            warn!(%violations, "decoded plan breaks the rules");
            anyhow::bail!("Decoded plan failed validation: {}", violations);
        }
    }

    Ok(outcome)
}
