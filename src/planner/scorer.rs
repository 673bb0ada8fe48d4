use super::frozen_state::FrozenState;
use super::types::{AgentCombinationTable, CombinationId, Score, StateCombination};

const CONFLICT_COUNT_MULTIPLIER: Score = 10_000;
const DEVIATION_MULTIPLIER: Score = 200;
const DEVIATION_AVG_MULTIPLIER: f64 = 100.0;

/// Cached penalty of a single combination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateCombinationScore {
    pub conflict_score: Score,
}

impl StateCombinationScore {
    pub fn of(combination: &StateCombination) -> Self {
        if !combination.has_conflict {
            return Self { conflict_score: 0 };
        }
        Self {
            conflict_score: CONFLICT_COUNT_MULTIPLIER * combination.conflict_count(),
        }
    }
}

/// Penalty calculator for (partial) plans. Lower is better.
///
/// Combination penalties are computed once per agent and combination so that
/// scoring a plan only walks its state chain.
#[derive(Debug, Clone)]
pub struct Scorer {
    combination_scores_per_agent: Vec<Vec<StateCombinationScore>>,
}

impl Scorer {
    pub fn new(tables: &[AgentCombinationTable]) -> Self {
        let combination_scores_per_agent = tables
            .iter()
            .map(|table| table.combinations().iter().map(StateCombinationScore::of).collect())
            .collect();
        Self { combination_scores_per_agent }
    }

    pub fn combination_score(&self, agent_index: usize, combination_id: CombinationId) -> StateCombinationScore {
        self.combination_scores_per_agent
            .get(agent_index)
            .and_then(|scores| scores.get(combination_id as usize))
            .copied()
            .unwrap_or(StateCombinationScore { conflict_score: 0 })
    }

    pub fn score(&self, plan: &FrozenState) -> Score {
        self.conflict_score(plan) + self.deviation_score(plan)
    }

    /// Sum of the adjacency penalties of every assigned agent.
    pub fn conflict_score(&self, plan: &FrozenState) -> Score {
        plan.chain()
            .map(|state| {
                let agent_index = state.agents_assigned() - 1;
                self.combination_score(agent_index, state.last_combination_id()).conflict_score
            })
            .sum()
    }

    /// Penalizes uneven coverage: the spread between the busiest and the
    /// emptiest week, and the largest distance of either from the average.
    pub fn deviation_score(&self, plan: &FrozenState) -> Score {
        deviation_score(plan.selections_per_week())
    }
}

pub fn deviation_score(selections_per_week: &[u8]) -> Score {
    if selections_per_week.is_empty() {
        return 0;
    }

    let mut min = u8::MAX;
    let mut max = 0u8;
    let mut sum = 0u32;
    for &selected in selections_per_week {
        sum += selected as u32;
        min = min.min(selected);
        max = max.max(selected);
    }

    let deviation_score = (max - min) as Score * DEVIATION_MULTIPLIER;

    let avg = sum as f64 / selections_per_week.len() as f64;
    let max_deviation = (max as f64 - avg).max(avg - min as f64);
    let deviation_avg_score = (max_deviation * DEVIATION_AVG_MULTIPLIER) as Score;

    deviation_score + deviation_avg_score
}
