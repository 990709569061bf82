//! Configuration management for the Sokoban SAT planner

pub mod settings;

pub use settings::{
    CliOverrides, EncodingConfig, InputConfig, OutputConfig, OutputFormat, PlanMode,
    SearchConfig, SearchStrategy, Settings,
};
