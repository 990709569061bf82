//! Console formatting and result files

pub mod display;

pub use display::{Color, ColorOutput, PlanFormatter, ResultsTable};
