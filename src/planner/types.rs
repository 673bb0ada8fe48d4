use std::fmt;
use std::sync::Arc;
use serde::{Serialize, Deserialize};
use super::frozen_state::FrozenState;

/// Week numbers are 1-based; week 0 is the last week of the previous period.
pub type Week = u8;

/// Position of a combination inside one agent's combination table.
pub type CombinationId = u16;

/// Scores are penalties: lower is better.
pub type Score = u32;

/// An agent that has to be assigned a fixed number of weeks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub name: String,
    pub excluded_weeks: Vec<Week>,
}

impl Agent {
    pub fn new(id: usize, name: impl Into<String>, excluded_weeks: impl IntoIterator<Item = Week>) -> Self {
        let mut excluded_weeks: Vec<Week> = excluded_weeks.into_iter().collect();
        excluded_weeks.sort_unstable();
        excluded_weeks.dedup();
        Self {
            id,
            name: name.into(),
            excluded_weeks,
        }
    }

    pub fn is_excluded(&self, week: Week) -> bool {
        self.excluded_weeks.binary_search(&week).is_ok()
    }
}

/// One legal selection of weeks for an agent.
///
/// `week_selections` has `weeks_count + 1` entries: index 0 is the carried-over
/// previous week, indexes `1..=weeks_count` are the planned weeks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateCombination {
    pub week_selections: Box<[bool]>,
    pub has_conflict: bool,
}

impl StateCombination {
    pub fn from_selections(week_selections: impl Into<Box<[bool]>>) -> Self {
        let week_selections = week_selections.into();
        let has_conflict = count_adjacent_pairs(&week_selections) > 0;
        Self {
            week_selections,
            has_conflict,
        }
    }

    pub fn is_selected(&self, week: usize) -> bool {
        self.week_selections.get(week).copied().unwrap_or(false)
    }

    /// Number of selected weeks, not counting the previous-period slot.
    pub fn selected_weeks_count(&self) -> usize {
        self.week_selections.iter().skip(1).filter(|&&s| s).count()
    }

    /// Selected weeks in ascending order, not counting the previous-period slot.
    pub fn selected_weeks(&self) -> Vec<Week> {
        self.week_selections
            .iter()
            .enumerate()
            .skip(1)
            .filter(|&(_, &selected)| selected)
            .map(|(week, _)| week as Week)
            .collect()
    }

    /// Number of consecutive selected pairs, the previous-period slot included.
    pub fn conflict_count(&self) -> u32 {
        count_adjacent_pairs(&self.week_selections)
    }
}

impl fmt::Display for StateCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &selected in self.week_selections.iter() {
            f.write_str(if selected { "X" } else { "_" })?;
        }
        if self.has_conflict {
            f.write_str(" CONF")?;
        }
        Ok(())
    }
}

fn count_adjacent_pairs(selections: &[bool]) -> u32 {
    selections
        .windows(2)
        .filter(|pair| pair[0] && pair[1])
        .count() as u32
}

/// All legal combinations of one agent, conflict-free entries first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCombinationTable {
    combinations: Vec<StateCombination>,
    first_conflict_index: usize,
}

impl AgentCombinationTable {
    /// Partitions the combinations so that every conflict-free entry precedes every conflicting one.
    pub fn from_combinations(combinations: Vec<StateCombination>) -> Self {
        let (mut ordered, conflicting): (Vec<_>, Vec<_>) =
            combinations.into_iter().partition(|c| !c.has_conflict);
        let first_conflict_index = ordered.len();
        ordered.extend(conflicting);
        Self {
            combinations: ordered,
            first_conflict_index,
        }
    }

    pub fn combinations(&self) -> &[StateCombination] {
        &self.combinations
    }

    pub fn get(&self, id: CombinationId) -> Option<&StateCombination> {
        self.combinations.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    /// Count of conflict-free combinations, which is also the index of the first conflicting one.
    pub fn first_conflict_index(&self) -> usize {
        self.first_conflict_index
    }

    pub fn conflict_free(&self) -> &[StateCombination] {
        &self.combinations[..self.first_conflict_index]
    }

    pub fn conflicting(&self) -> &[StateCombination] {
        &self.combinations[self.first_conflict_index..]
    }

    /// True when no combination lets this agent avoid a conflict.
    pub fn has_conflicts_only(&self) -> bool {
        self.first_conflict_index == 0
    }

    /// Checks that `index` splits the table into a conflict-free prefix and a conflicting suffix.
    pub fn is_partitioned_at(&self, index: usize) -> bool {
        index <= self.combinations.len()
            && self.combinations[..index].iter().all(|c| !c.has_conflict)
            && self.combinations[index..].iter().all(|c| c.has_conflict)
    }
}

/// "Apply this combination, for the next unassigned agent, to this prefix."
#[derive(Debug, Clone)]
pub struct PendingPlan {
    pub frozen_state: Arc<FrozenState>,
    pub selected_combination: CombinationId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detection_includes_previous_week() {
        let boundary = StateCombination::from_selections(vec![true, true, false, false]);
        assert!(boundary.has_conflict);
        assert_eq!(boundary.conflict_count(), 1);

        let spaced = StateCombination::from_selections(vec![false, true, false, true]);
        assert!(!spaced.has_conflict);
        assert_eq!(spaced.selected_weeks(), vec![1, 3]);
    }

    #[test]
    fn test_display_marks_conflicts() {
        let combination = StateCombination::from_selections(vec![true, true, false]);
        assert_eq!(combination.to_string(), "XX_ CONF");
        let combination = StateCombination::from_selections(vec![false, true, false]);
        assert_eq!(combination.to_string(), "_X_");
    }

    #[test]
    fn test_table_partition() {
        let table = AgentCombinationTable::from_combinations(vec![
            StateCombination::from_selections(vec![false, true, true]),
            StateCombination::from_selections(vec![false, true, false]),
            StateCombination::from_selections(vec![true, true, false]),
            StateCombination::from_selections(vec![false, false, true]),
        ]);
        assert_eq!(table.first_conflict_index(), 2);
        assert!(table.is_partitioned_at(2));
        assert!(!table.is_partitioned_at(1));
        assert!(table.conflict_free().iter().all(|c| !c.has_conflict));
        assert!(table.conflicting().iter().all(|c| c.has_conflict));
        assert!(!table.has_conflicts_only());
    }

    #[test]
    fn test_agent_exclusions_are_sorted() {
        let agent = Agent::new(0, "Anne", [3, 1, 3]);
        assert_eq!(agent.excluded_weeks, vec![1, 3]);
        assert!(agent.is_excluded(3));
        assert!(!agent.is_excluded(2));
    }
}
