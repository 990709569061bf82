//! SAT encoding of bounded-horizon Sokoban planning

pub mod variables;
pub mod constraints;
pub mod encoder;
pub mod oracle;
pub mod solver;

pub use variables::{EntityKind, LiteralKey, LiteralKind, LiteralManager};
pub use constraints::{Clause, ConstraintEncoder, ConstraintFamily, EncoderOptions, Formula};
pub use encoder::{Attempt, ComplexityEstimate, ComplexityLevel, Encoding, EncodingStatistics, SatEncoder};
pub use oracle::{SatOracle, SolveOutcome};
pub use solver::CadicalOracle;
