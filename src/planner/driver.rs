use serde::{Serialize, Deserialize};
use tracing::info;
use super::engine::{Planner, PlannerStats};

/// How a search is driven: trimming cadence, progress reporting and limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Plans kept per set when trimming
    pub target_count: usize,
    /// Trim every this many iterations
    pub limit_every: u64,
    /// Log progress every this many iterations
    pub report_every: u64,
    /// Stop after this many iterations even if work remains
    pub max_iterations: Option<u64>,
    /// Seed for the shuffle before trimming
    pub seed: Option<u64>,
    /// Number of ranked plans to surface
    pub top: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            target_count: 1000,
            limit_every: 100_000,
            report_every: 1_000_000,
            max_iterations: None,
            seed: None,
            top: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub iterations: u64,
    /// False when the iteration cap stopped the search early
    pub exhausted: bool,
    pub stats: PlannerStats,
}

/// Steps `planner` until it runs out of work or hits `config.max_iterations`.
pub fn run_search(planner: &mut Planner, config: &SearchConfig) -> SearchOutcome {
    let limit_every = config.limit_every.max(1);
    let report_every = config.report_every.max(1);
    let mut iterations = 0u64;
    let mut exhausted = false;

    loop {
        if config.max_iterations.is_some_and(|max| iterations >= max) {
            break;
        }
        if !planner.step() {
            exhausted = true;
            break;
        }
        iterations += 1;

        if iterations % limit_every == 0 {
            planner.limit_plans(config.target_count);
        }
        if iterations % report_every == 0 {
            planner.log_stats();
        }
    }

    planner.limit_plans(config.target_count);
    let stats = planner.stats();
    info!(
        iterations,
        exhausted,
        valid = stats.valid_plans,
        conflicting = stats.conflicting_plans,
        invalid = stats.invalid_plans,
        "search finished"
    );

    SearchOutcome {
        iterations,
        exhausted,
        stats,
    }
}
