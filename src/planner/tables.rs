use tracing::debug;
use super::combinations::combinations;
use super::error::ConfigError;
use super::types::{Agent, AgentCombinationTable, CombinationId, StateCombination, Week};

/// Largest number of combinations a single agent may have.
///
/// Both every id and the first conflict index have to fit in a `CombinationId`.
pub const MAX_COMBINATIONS_PER_AGENT: usize = CombinationId::MAX as usize;

/// Weeks in `1..=weeks_count` the agent has not excluded
pub fn eligible_weeks(agent: &Agent, weeks_count: Week) -> Vec<Week> {
    (1..=weeks_count).filter(|&week| !agent.is_excluded(week)).collect()
}

/// Selection vector before any planned week is chosen; only the previous-period slot may be set.
pub fn initial_state(weeks_count: Week, in_previous_week: bool) -> Vec<bool> {
    let mut state = vec![false; weeks_count as usize + 1];
    state[0] = in_previous_week;
    state
}

/// Marks `weeks` on top of `initial_state` and detects adjacency conflicts.
pub fn apply_combination(initial_state: &[bool], weeks: &[Week]) -> StateCombination {
    let mut state = initial_state.to_vec();
    for &week in weeks {
        state[week as usize] = true;
    }
    StateCombination::from_selections(state)
}

/// Binomial coefficient `C(n, k)`, `None` on overflow.
pub fn combination_count(n: usize, k: usize) -> Option<usize> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut count = 1usize;
    for i in 0..k {
        // Exact at every step: count is C(n, i) before the update
        count = count.checked_mul(n - i)? / (i + 1);
    }
    Some(count)
}

/// Builds the combination table of one agent.
pub fn build_agent_table(
    agent: &Agent,
    weeks_count: Week,
    weeks_per_agent: Week,
    in_previous_week: bool,
) -> Result<AgentCombinationTable, ConfigError> {
    if let Some(&week) = agent.excluded_weeks.iter().find(|&&w| w == 0 || w > weeks_count) {
        return Err(ConfigError::InvalidExcludedWeek {
            agent: agent.name.clone(),
            week,
            weeks_count,
        });
    }

    // Count before enumerating, large tables are rejected without building them
    let eligible = eligible_weeks(agent, weeks_count);
    let count = combination_count(eligible.len(), weeks_per_agent as usize);
    if count == Some(0) {
        return Err(ConfigError::NoCombinations { agent: agent.name.clone() });
    }
    match count {
        Some(count) if count <= MAX_COMBINATIONS_PER_AGENT => {}
        _ => {
            return Err(ConfigError::TooManyCombinations {
                agent: agent.name.clone(),
                count: count.unwrap_or(usize::MAX),
                max: MAX_COMBINATIONS_PER_AGENT,
            });
        }
    }

    let initial = initial_state(weeks_count, in_previous_week);
    let stated: Vec<StateCombination> = combinations(&eligible, weeks_per_agent as usize)
        .iter()
        .map(|weeks| apply_combination(&initial, weeks))
        .collect();
    if stated.is_empty() {
        return Err(ConfigError::NoCombinations { agent: agent.name.clone() });
    }

    let table = AgentCombinationTable::from_combinations(stated);
    debug!(
        agent = %agent.name,
        combinations = table.len(),
        conflict_free = table.first_conflict_index(),
        "built combination table"
    );
    Ok(table)
}

/// Builds the combination table of every agent.
///
/// Returns the tables together with the first conflict index of each one.
pub fn build_combination_tables(
    agents: &[Agent],
    weeks_count: Week,
    weeks_per_agent: Week,
    previous_period_agent_ids: &[usize],
) -> Result<(Vec<AgentCombinationTable>, Vec<CombinationId>), ConfigError> {
    if weeks_count == 0 {
        return Err(ConfigError::InvalidWeeksCount { weeks_count: 0 });
    }
    if weeks_per_agent == 0 || weeks_per_agent > weeks_count {
        return Err(ConfigError::InvalidWeeksPerAgent { weeks_per_agent, weeks_count });
    }
    if let Some(&id) = previous_period_agent_ids.iter().find(|&&id| id >= agents.len()) {
        return Err(ConfigError::UnknownAgentId { id, count: agents.len() });
    }

    let mut tables = Vec::with_capacity(agents.len());
    let mut first_conflict_indexes = Vec::with_capacity(agents.len());
    for (agent_index, agent) in agents.iter().enumerate() {
        let in_previous_week = previous_period_agent_ids.contains(&agent_index);
        let table = build_agent_table(agent, weeks_count, weeks_per_agent, in_previous_week)?;
        first_conflict_indexes.push(table.first_conflict_index() as CombinationId);
        tables.push(table);
    }

    Ok((tables, first_conflict_indexes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_previous_week_conflict() {
        let agent = Agent::new(0, "David", []);
        let table = build_agent_table(&agent, 3, 1, true).unwrap();
        // Week 1 touches the previous week
        assert_eq!(table.len(), 3);
        assert_eq!(table.first_conflict_index(), 2);
        assert_eq!(table.conflicting()[0].selected_weeks(), vec![1]);
        assert!(table.conflicting()[0].is_selected(0));
    }

    #[test]
    fn test_exclusions_removed() {
        let agent = Agent::new(0, "Harry", [3, 4, 5]);
        let table = build_agent_table(&agent, 5, 2, false).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.combinations()[0].selected_weeks(), vec![1, 2]);
        assert!(table.has_conflicts_only());
    }

    #[test]
    fn test_fully_excluded_agent_is_fatal() {
        let agents = vec![Agent::new(0, "Bob", []), Agent::new(1, "Eve", [1, 2, 3])];
        let err = build_combination_tables(&agents, 3, 1, &[]).unwrap_err();
        assert_eq!(err, ConfigError::NoCombinations { agent: "Eve".to_string() });
    }

    #[test]
    fn test_combination_count() {
        assert_eq!(combination_count(5, 2), Some(10));
        assert_eq!(combination_count(5, 0), Some(1));
        assert_eq!(combination_count(3, 4), Some(0));
        assert_eq!(combination_count(40, 8), Some(76_904_685));
        assert_eq!(combination_count(255, 127), None);
    }

    #[test]
    fn test_oversized_table_rejected_before_enumeration() {
        let agents = vec![Agent::new(0, "Anne", [])];
        let started = std::time::Instant::now();
        let err = build_combination_tables(&agents, 40, 8, &[]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::TooManyCombinations {
                agent: "Anne".to_string(),
                count: 76_904_685,
                max: MAX_COMBINATIONS_PER_AGENT,
            }
        );
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        let err = build_combination_tables(&agents, 255, 127, &[]).unwrap_err();
        assert!(matches!(err, ConfigError::TooManyCombinations { count: usize::MAX, .. }));
    }

    #[test]
    fn test_largest_allowed_table() {
        // C(18, 7) = 31 824 fits, C(19, 8) = 75 582 does not
        let agents = vec![Agent::new(0, "Bob", [])];
        let (tables, _) = build_combination_tables(&agents, 18, 7, &[]).unwrap();
        assert_eq!(tables[0].len(), 31_824);
        assert!(matches!(
            build_combination_tables(&agents, 19, 8, &[]),
            Err(ConfigError::TooManyCombinations { count: 75_582, .. })
        ));
    }

    #[test]
    fn test_too_few_eligible_weeks_is_fatal() {
        let agents = vec![Agent::new(0, "Carol", [1, 2])];
        let err = build_combination_tables(&agents, 3, 2, &[]).unwrap_err();
        assert!(matches!(err, ConfigError::NoCombinations { .. }));
    }

    #[test]
    fn test_out_of_range_exclusion() {
        let agents = vec![Agent::new(0, "Frank", [6])];
        let err = build_combination_tables(&agents, 5, 2, &[]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidExcludedWeek { agent: "Frank".to_string(), week: 6, weeks_count: 5 }
        );
    }

    #[test]
    fn test_unknown_previous_agent_id() {
        let agents = vec![Agent::new(0, "Anne", [])];
        let err = build_combination_tables(&agents, 3, 1, &[4]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownAgentId { id: 4, count: 1 });
    }

    #[test]
    fn test_invalid_weeks_per_agent() {
        let agents = vec![Agent::new(0, "Anne", [])];
        assert!(matches!(
            build_combination_tables(&agents, 3, 0, &[]),
            Err(ConfigError::InvalidWeeksPerAgent { .. })
        ));
        assert!(matches!(
            build_combination_tables(&agents, 3, 4, &[]),
            Err(ConfigError::InvalidWeeksPerAgent { .. })
        ));
    }

    fn arb_setup() -> impl Strategy<Value = (Week, Week, Vec<Vec<Week>>, Vec<bool>)> {
        (3u8..=8).prop_flat_map(|weeks_count| {
            (
                Just(weeks_count),
                1u8..=2,
                prop::collection::vec(prop::collection::vec(1..=weeks_count, 0..2), 1..5),
                prop::collection::vec(any::<bool>(), 5),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_tables_respect_shape((weeks_count, weeks_per_agent, exclusions, previous) in arb_setup()) {
            let agents: Vec<Agent> = exclusions
                .iter()
                .enumerate()
                .map(|(id, excluded)| Agent::new(id, format!("agent{}", id), excluded.clone()))
                .collect();
            let previous_ids: Vec<usize> = (0..agents.len()).filter(|&id| previous[id]).collect();

            let (tables, first_conflict_indexes) =
                build_combination_tables(&agents, weeks_count, weeks_per_agent, &previous_ids).unwrap();
            prop_assert_eq!(tables.len(), agents.len());

            for ((agent, table), &first_conflict) in agents.iter().zip(&tables).zip(&first_conflict_indexes) {
                prop_assert!(table.is_partitioned_at(first_conflict as usize));
                for combination in table.combinations() {
                    prop_assert_eq!(combination.week_selections.len(), weeks_count as usize + 1);
                    prop_assert_eq!(combination.selected_weeks_count(), weeks_per_agent as usize);
                    prop_assert_eq!(combination.week_selections[0], previous_ids.contains(&agent.id));
                    for week in combination.selected_weeks() {
                        prop_assert!(!agent.is_excluded(week));
                    }
                }
            }
        }
    }
}
