pub mod exit_manager;
pub mod portfolio;
pub mod sizer;

pub use exit_manager::{evaluate_exit, ExitDecision};
pub use portfolio::{admit_candidate, AdmissionDecision, ExposureBreakdown, HedgeAdvisory};
pub use sizer::{size_position, validate_risk, SizingInput, SizingOutcome};
