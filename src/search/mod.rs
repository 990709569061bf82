//! Horizon search, decoded plans and their validation

pub mod driver;
pub mod plan;
pub mod validator;

pub use driver::{SearchDriver, SearchOutcome};
pub use plan::{Frame, Plan};
pub use validator::{PlanValidator, RuleViolation, ValidationResult};
