mod blend;
mod engine;
mod error;
mod plan;
mod types;
mod validation;

pub use blend::{Weighted, blend};
pub use engine::{compare, project, project_trace, simulate};
pub use error::{EngineError, Result};
pub use plan::{Milestone, PlanInputs, PlanReport, ScenarioReport, run_plan};
pub use types::{
    AccumulationTrace, AccumulationYear, AllocationEntry, AssetEntry, ContributionSchedule,
    ProjectionPoint, ProjectionResult, ScenarioOutcome, SustainabilityVerdict, WithdrawalPolicy,
};
pub use validation::{ValidationConfig, validate, validate_assets, validate_with};
