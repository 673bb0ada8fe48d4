use std::sync::Arc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};
use tracing::{debug, info};
use super::error::ConfigError;
use super::frozen_state::FrozenState;
use super::retention::select_best;
use super::scorer::Scorer;
use super::tables::MAX_COMBINATIONS_PER_AGENT;
use super::types::{AgentCombinationTable, CombinationId, PendingPlan, Score, StateCombination, Week};

/// Coverage counters are bytes, so a plan holds at most this many agents.
pub const MAX_AGENTS: usize = u8::MAX as usize;

/// Counters describing the progress of a search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerStats {
    pub iterations: u64,
    pub total_plans: u64,
    pub invalid_plans: u64,
    pub valid_plans: usize,
    pub conflicting_plans: usize,
    pub pending_valid: usize,
    pub pending_conflicting: usize,
}

/// A finished plan together with its score
#[derive(Debug, Clone)]
pub struct RankedPlan {
    pub score: Score,
    pub plan: Arc<FrozenState>,
}

/// Depth-first branch-and-bound search over every agent's combination table.
///
/// Call [`Planner::step`] until it returns `false`, interleaving
/// [`Planner::limit_plans`] to keep the finished plan sets bounded.
pub struct Planner {
    weeks_count: Week,
    weeks_per_agent: Week,
    min_agents_per_week: u8,
    agent_names: Vec<String>,
    tables: Vec<AgentCombinationTable>,
    first_conflict_indexes: Vec<CombinationId>,
    scorer: Scorer,
    rng: StdRng,

    pending_valid_plans: Vec<PendingPlan>,
    pending_conflicting_plans: Vec<PendingPlan>,

    valid_plans: Vec<Arc<FrozenState>>,
    conflicting_plans: Vec<Arc<FrozenState>>,

    iterations: u64,
    total_plans: u64,
    invalid_plans: u64,
}

impl Planner {
    pub fn new(
        weeks_count: Week,
        weeks_per_agent: Week,
        min_agents_per_week: u8,
        agent_names: Vec<String>,
        tables: Vec<AgentCombinationTable>,
        first_conflict_indexes: Vec<CombinationId>,
    ) -> Result<Self, ConfigError> {
        if weeks_count == 0 {
            return Err(ConfigError::InvalidWeeksCount { weeks_count: 0 });
        }
        if weeks_per_agent == 0 || weeks_per_agent > weeks_count {
            return Err(ConfigError::InvalidWeeksPerAgent { weeks_per_agent, weeks_count });
        }
        if agent_names.is_empty() {
            return Err(ConfigError::NoAgents);
        }
        if agent_names.len() > MAX_AGENTS {
            return Err(ConfigError::TooManyAgents { count: agent_names.len(), max: MAX_AGENTS });
        }
        if tables.len() != agent_names.len() {
            return Err(ConfigError::LengthMismatch {
                field: "tables",
                expected: agent_names.len(),
                actual: tables.len(),
            });
        }
        if first_conflict_indexes.len() != agent_names.len() {
            return Err(ConfigError::LengthMismatch {
                field: "first_conflict_indexes",
                expected: agent_names.len(),
                actual: first_conflict_indexes.len(),
            });
        }

        for ((name, table), &first_conflict_index) in agent_names.iter().zip(&tables).zip(&first_conflict_indexes) {
            if table.is_empty() {
                return Err(ConfigError::NoCombinations { agent: name.clone() });
            }
            if table.len() > MAX_COMBINATIONS_PER_AGENT {
                return Err(ConfigError::TooManyCombinations {
                    agent: name.clone(),
                    count: table.len(),
                    max: MAX_COMBINATIONS_PER_AGENT,
                });
            }
            let expected = weeks_count as usize + 1;
            if let Some((combination, c)) = table
                .combinations()
                .iter()
                .enumerate()
                .find(|(_, c)| c.week_selections.len() != expected)
            {
                return Err(ConfigError::InvalidSelectionLength {
                    agent: name.clone(),
                    combination,
                    expected,
                    actual: c.week_selections.len(),
                });
            }
            if !table.is_partitioned_at(first_conflict_index as usize) {
                return Err(ConfigError::InconsistentConflictIndex {
                    agent: name.clone(),
                    index: first_conflict_index as usize,
                });
            }
        }

        let scorer = Scorer::new(&tables);
        let mut planner = Self {
            weeks_count,
            weeks_per_agent,
            min_agents_per_week,
            agent_names,
            tables,
            first_conflict_indexes,
            scorer,
            rng: StdRng::from_entropy(),
            pending_valid_plans: Vec::new(),
            pending_conflicting_plans: Vec::new(),
            valid_plans: Vec::new(),
            conflicting_plans: Vec::new(),
            iterations: 0,
            total_plans: 0,
            invalid_plans: 0,
        };
        planner.seed_first_agent();
        Ok(planner)
    }

    /// Fixes the generator used to shuffle plans before trimming them.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn seed_first_agent(&mut self) {
        let root = FrozenState::root(self.weeks_count as usize);
        for (index, combination) in self.tables[0].combinations().iter().enumerate() {
            let plan = PendingPlan {
                frozen_state: Arc::clone(&root),
                selected_combination: index as CombinationId,
            };
            if combination.has_conflict {
                self.pending_conflicting_plans.push(plan);
            } else {
                self.pending_valid_plans.push(plan);
            }
            self.total_plans += 1;
        }
    }

    /// Advances the search by one plan.
    ///
    /// Returns `false` once there is nothing left to expand.
    pub fn step(&mut self) -> bool {
        let Some(plan) = self.next_plan() else {
            return false;
        };
        self.iterations += 1;

        let agent_index = plan.frozen_state.agents_assigned();
        let combination = &self.tables[agent_index].combinations()[plan.selected_combination as usize];
        let state = plan.frozen_state.append(plan.selected_combination, combination);

        let last_agent = self.agent_names.len() - 1;
        if agent_index == last_agent {
            self.finish(state);
            return true;
        }

        let next_agent = agent_index + 1;
        let first_conflict_index = self.first_conflict_indexes[next_agent];
        for combination_id in 0..first_conflict_index {
            self.pending_valid_plans.push(PendingPlan {
                frozen_state: Arc::clone(&state),
                selected_combination: combination_id,
            });
            self.total_plans += 1;
        }

        // Once a conflict-free plan exists, conflicting branches cannot win
        if !self.valid_plans.is_empty() {
            return true;
        }

        // Complete plans go to the front queue so that finished plans show up early
        let total_combinations = self.tables[next_agent].len() as CombinationId;
        let queue = if next_agent == last_agent {
            &mut self.pending_valid_plans
        } else {
            &mut self.pending_conflicting_plans
        };
        for combination_id in first_conflict_index..total_combinations {
            queue.push(PendingPlan {
                frozen_state: Arc::clone(&state),
                selected_combination: combination_id,
            });
        }
        self.total_plans += (total_combinations - first_conflict_index) as u64;

        true
    }

    fn finish(&mut self, state: Arc<FrozenState>) {
        if !state.covers(self.min_agents_per_week) {
            self.invalid_plans += 1;
            return;
        }

        if !state.has_conflict() {
            if self.valid_plans.is_empty() {
                debug!(iteration = self.iterations, "found first conflict-free plan");
            }
            self.valid_plans.push(state);
        } else if self.valid_plans.is_empty() {
            self.conflicting_plans.push(state);
        }
    }

    fn next_plan(&mut self) -> Option<PendingPlan> {
        self.pending_valid_plans
            .pop()
            .or_else(|| self.pending_conflicting_plans.pop())
    }

    /// Trims the finished plan sets down to `target_count` plans each.
    ///
    /// As soon as a conflict-free plan exists, every conflicting plan (finished or pending) is dropped.
    pub fn limit_plans(&mut self, target_count: usize) {
        if self.valid_plans.len() > target_count {
            self.valid_plans.shuffle(&mut self.rng);
            let scorer = &self.scorer;
            let plans = std::mem::take(&mut self.valid_plans);
            self.valid_plans = select_best(plans, target_count, |plan| scorer.deviation_score(plan));
        }

        if !self.valid_plans.is_empty() {
            self.conflicting_plans = Vec::new();
            self.pending_conflicting_plans = Vec::new();
        }

        if self.conflicting_plans.len() > target_count {
            self.conflicting_plans.shuffle(&mut self.rng);
            let scorer = &self.scorer;
            let plans = std::mem::take(&mut self.conflicting_plans);
            self.conflicting_plans = select_best(plans, target_count, |plan| scorer.score(plan));
        }
    }

    /// Conflict-free plans if any were found, otherwise the conflicting ones.
    pub fn resulting_plans(&self) -> Vec<Arc<FrozenState>> {
        if !self.valid_plans.is_empty() {
            self.valid_plans.clone()
        } else {
            self.conflicting_plans.clone()
        }
    }

    /// [`Planner::resulting_plans`] scored and sorted best first, at most `limit` of them.
    pub fn ranked_plans(&self, limit: usize) -> Vec<RankedPlan> {
        let mut ranked: Vec<RankedPlan> = self
            .resulting_plans()
            .into_iter()
            .map(|plan| RankedPlan {
                score: self.scorer.score(&plan),
                plan,
            })
            .collect();
        ranked.sort_by_key(|ranked| ranked.score);
        ranked.truncate(limit);
        ranked
    }

    pub fn has_valid_plans(&self) -> bool {
        !self.valid_plans.is_empty()
    }

    pub fn stats(&self) -> PlannerStats {
        PlannerStats {
            iterations: self.iterations,
            total_plans: self.total_plans,
            invalid_plans: self.invalid_plans,
            valid_plans: self.valid_plans.len(),
            conflicting_plans: self.conflicting_plans.len(),
            pending_valid: self.pending_valid_plans.len(),
            pending_conflicting: self.pending_conflicting_plans.len(),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            iterations = stats.iterations,
            total = stats.total_plans,
            invalid = stats.invalid_plans,
            conflicting = stats.conflicting_plans,
            valid = stats.valid_plans,
            pending_valid = stats.pending_valid,
            pending_conflicting = stats.pending_conflicting,
            "planner progress"
        );
    }

    /// Names of agents that cannot avoid a conflict whatever they pick.
    pub fn unavoidable_conflicts(&self) -> Vec<&str> {
        self.agent_names
            .iter()
            .zip(&self.tables)
            .filter(|(_, table)| table.has_conflicts_only())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn has_unavoidable_conflicts(&self) -> bool {
        self.tables.iter().any(|table| table.has_conflicts_only())
    }

    pub fn combination(&self, agent_index: usize, combination_id: CombinationId) -> Option<&StateCombination> {
        self.tables.get(agent_index)?.get(combination_id)
    }

    /// Combination chosen by each assigned agent of `plan`, agent 0 first.
    pub fn plan_combinations(&self, plan: &FrozenState) -> Vec<&StateCombination> {
        plan.combination_ids()
            .into_iter()
            .enumerate()
            .filter_map(|(agent_index, id)| self.combination(agent_index, id))
            .collect()
    }

    pub fn weeks_count(&self) -> Week {
        self.weeks_count
    }

    pub fn weeks_per_agent(&self) -> Week {
        self.weeks_per_agent
    }

    pub fn min_agents_per_week(&self) -> u8 {
        self.min_agents_per_week
    }

    pub fn agent_names(&self) -> &[String] {
        &self.agent_names
    }

    pub fn tables(&self) -> &[AgentCombinationTable] {
        &self.tables
    }

    pub fn first_conflict_indexes(&self) -> &[CombinationId] {
        &self.first_conflict_indexes
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::tables::build_combination_tables;
    use crate::planner::types::Agent;

    fn planner(
        weeks_count: Week,
        weeks_per_agent: Week,
        min_agents_per_week: u8,
        exclusions: &[&[Week]],
        previous: &[usize],
    ) -> Planner {
        let agents: Vec<Agent> = exclusions
            .iter()
            .enumerate()
            .map(|(id, excluded)| Agent::new(id, format!("agent{}", id), excluded.iter().copied()))
            .collect();
        let (tables, first_conflict_indexes) =
            build_combination_tables(&agents, weeks_count, weeks_per_agent, previous).unwrap();
        let names = agents.into_iter().map(|a| a.name).collect();
        Planner::new(weeks_count, weeks_per_agent, min_agents_per_week, names, tables, first_conflict_indexes)
            .unwrap()
            .with_seed(7)
    }

    fn run(planner: &mut Planner) {
        while planner.step() {}
    }

    #[test]
    fn test_conflicts_of_last_agent_stay_in_valid_queue() {
        // agent2 led the previous week, so week 1 conflicts for it
        let mut planner = planner(3, 1, 1, &[&[], &[], &[]], &[2]);
        assert_eq!(planner.tables()[2].len(), 3);
        assert_eq!(planner.first_conflict_indexes()[2], 2);

        // Expand agent 0, then agent 1 whose children belong to the last agent
        assert!(planner.step());
        let before = planner.stats();
        assert!(planner.step());
        let after = planner.stats();

        assert_eq!(after.pending_conflicting, before.pending_conflicting);
        assert_eq!(after.pending_valid, before.pending_valid - 1 + 3);
        assert_eq!(after.total_plans, before.total_plans + 3);
    }

    #[test]
    fn test_conflicts_of_middle_agent_are_deferred() {
        let mut planner = planner(3, 1, 1, &[&[], &[], &[]], &[1]);
        let before = planner.stats();
        assert!(planner.step());
        let after = planner.stats();

        assert_eq!(after.pending_conflicting, before.pending_conflicting + 1);
        assert_eq!(after.pending_valid, before.pending_valid - 1 + 2);
    }

    #[test]
    fn test_three_agents_cover_three_weeks() {
        let mut planner = planner(3, 1, 1, &[&[], &[], &[]], &[]);
        run(&mut planner);
        let plans = planner.resulting_plans();
        // Every permutation of the three weeks
        assert_eq!(plans.len(), 6);
        for plan in &plans {
            assert_eq!(plan.selections_per_week(), &[1, 1, 1]);
            assert!(!plan.has_conflict());
        }
        assert_eq!(planner.stats().invalid_plans, 27 - 6);
    }

    #[test]
    fn test_two_agents_cannot_cover_three_weeks() {
        let mut planner = planner(3, 1, 1, &[&[], &[]], &[]);
        run(&mut planner);
        assert!(planner.resulting_plans().is_empty());
        assert_eq!(planner.stats().invalid_plans, 9);
        assert_eq!(planner.stats().iterations, 3 + 9);
    }

    #[test]
    fn test_two_agents_with_zero_coverage_requirement() {
        let mut planner = planner(3, 1, 0, &[&[], &[]], &[]);
        run(&mut planner);
        assert_eq!(planner.resulting_plans().len(), 9);
        assert!(planner.has_valid_plans());
    }

    #[test]
    fn test_conflicting_plans_kept_only_without_valid_ones() {
        // Both agents worked the previous week, so week 1 conflicts for each
        let mut planner = planner(2, 1, 1, &[&[2], &[2]], &[0, 1]);
        assert!(planner.has_unavoidable_conflicts());
        assert_eq!(planner.unavoidable_conflicts(), vec!["agent0", "agent1"]);
        run(&mut planner);
        let plans = planner.resulting_plans();
        assert!(!planner.has_valid_plans());
        // Week 2 is excluded for both, so coverage of week 2 fails
        assert!(plans.is_empty());
        assert_eq!(planner.stats().invalid_plans, 1);
    }

    #[test]
    fn test_conflicting_plan_returned_when_unavoidable() {
        let mut planner = planner(2, 1, 1, &[&[2], &[1]], &[0]);
        run(&mut planner);
        let plans = planner.resulting_plans();
        assert_eq!(plans.len(), 1);
        assert!(plans[0].has_conflict());
        assert_eq!(planner.scorer().conflict_score(&plans[0]), 10_000);
    }

    #[test]
    fn test_conflicting_branches_stop_after_valid_plan() {
        let mut planner = planner(4, 2, 1, &[&[], &[], &[], &[]], &[1, 2]);
        while !planner.has_valid_plans() {
            assert!(planner.step());
        }
        let pending_conflicting = planner.stats().pending_conflicting;
        let conflicting_before = planner.stats().conflicting_plans;
        while planner.step() {
            let stats = planner.stats();
            assert!(stats.pending_conflicting <= pending_conflicting);
            assert_eq!(stats.conflicting_plans, conflicting_before);
        }
        planner.limit_plans(1000);
        assert_eq!(planner.stats().pending_conflicting, 0);
        assert_eq!(planner.stats().conflicting_plans, 0);
        assert!(planner.resulting_plans().iter().all(|plan| !plan.has_conflict()));
    }

    #[test]
    fn test_limit_clears_conflicting_queue_mid_search() {
        let mut planner = planner(4, 2, 1, &[&[], &[], &[], &[]], &[1, 2]);
        while !planner.has_valid_plans() {
            assert!(planner.step());
        }
        planner.limit_plans(1000);
        let stats = planner.stats();
        assert_eq!(stats.pending_conflicting, 0);
        assert_eq!(stats.conflicting_plans, 0);
        assert!(stats.valid_plans >= 1);
    }

    #[test]
    fn test_limit_plans_caps_valid_set() {
        let mut planner = planner(4, 1, 0, &[&[], &[], &[], &[]], &[]);
        run(&mut planner);
        assert_eq!(planner.resulting_plans().len(), 256);
        planner.limit_plans(10);
        let plans = planner.resulting_plans();
        assert!(plans.len() <= 10);
        assert!(!plans.is_empty());
    }

    #[test]
    fn test_same_seed_same_results() {
        let ids = |seed: u64| {
            let mut planner = planner(4, 1, 0, &[&[], &[], &[], &[]], &[]).with_seed(seed);
            run(&mut planner);
            planner.limit_plans(20);
            planner
                .resulting_plans()
                .iter()
                .map(|plan| plan.combination_ids())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(11), ids(11));
    }

    #[test]
    fn test_ranked_plans_sorted_by_score() {
        let mut planner = planner(4, 1, 0, &[&[], &[], &[], &[]], &[]);
        run(&mut planner);
        let ranked = planner.ranked_plans(5);
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].score, 0);
        assert!(ranked.windows(2).all(|pair| pair[0].score <= pair[1].score));
    }

    #[test]
    fn test_plan_combinations_follow_agent_order() {
        let mut planner = planner(3, 1, 1, &[&[2, 3], &[1, 3], &[1, 2]], &[]);
        run(&mut planner);
        let plans = planner.resulting_plans();
        assert_eq!(plans.len(), 1);
        let weeks: Vec<Vec<Week>> = planner
            .plan_combinations(&plans[0])
            .iter()
            .map(|c| c.selected_weeks())
            .collect();
        assert_eq!(weeks, vec![vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_shape_mismatches_are_rejected() {
        let agents = vec![Agent::new(0, "Anne", []), Agent::new(1, "Bob", [])];
        let (tables, first_conflict_indexes) = build_combination_tables(&agents, 3, 1, &[]).unwrap();

        let err = Planner::new(3, 1, 1, vec!["Anne".into()], tables.clone(), first_conflict_indexes.clone())
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::LengthMismatch { field: "tables", expected: 1, actual: 2 });

        let err = Planner::new(4, 1, 1, vec!["Anne".into(), "Bob".into()], tables.clone(), first_conflict_indexes.clone())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::InvalidSelectionLength { expected: 5, actual: 4, .. }));

        let err = Planner::new(3, 1, 1, vec!["Anne".into(), "Bob".into()], tables.clone(), vec![0, 3])
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::InconsistentConflictIndex { agent: "Anne".to_string(), index: 0 });

        let err = Planner::new(3, 1, 1, vec!["Anne".into(), "Bob".into()], tables, vec![3])
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::LengthMismatch { field: "first_conflict_indexes", .. }));

        let err = Planner::new(3, 1, 1, Vec::new(), Vec::new(), Vec::new()).err().unwrap();
        assert_eq!(err, ConfigError::NoAgents);
    }
}
