pub mod policy;
pub mod reports;
pub mod seeds;
pub mod simulation;
pub mod tester;

pub use policy::CaptureStrategy;
pub use seeds::resolve_seed_inputs;
pub use simulation::{
    RollPlan, SimSession, SimulationPlan, SimulationSummary, Simulator, StorePlan,
};
pub use tester::*;
