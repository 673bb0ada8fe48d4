pub mod types;
pub mod error;
pub mod combinations;
pub mod tables;
pub mod frozen_state;
pub mod scorer;
pub mod retention;
pub mod engine;
pub mod builder;
pub mod driver;

pub use types::{Agent, AgentCombinationTable, CombinationId, PendingPlan, Score, StateCombination, Week};
pub use error::ConfigError;
pub use combinations::combinations;
pub use tables::build_combination_tables;
pub use frozen_state::FrozenState;
pub use scorer::{Scorer, StateCombinationScore};
pub use retention::select_best;
pub use engine::{Planner, PlannerStats, RankedPlan};
pub use builder::PlannerBuilder;
pub use driver::{run_search, SearchConfig, SearchOutcome};
