use std::sync::Arc;
use super::types::{CombinationId, StateCombination, Week};

/// The settled part of a plan: the first `agents_assigned` agents have chosen their combination.
///
/// States are never mutated once created. Appending allocates a new node that
/// points at its parent, so any number of candidate plans can share a prefix.
#[derive(Debug)]
pub struct FrozenState {
    parent: Option<Arc<FrozenState>>,
    last_combination_id: CombinationId,
    agents_assigned: u8,
    has_conflict: bool,
    /// Index `w - 1` holds the number of agents assigned to week `w`.
    selections_per_week: Box<[u8]>,
}

impl FrozenState {
    /// Empty state with no agent assigned yet.
    pub fn root(weeks_count: usize) -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            last_combination_id: 0,
            agents_assigned: 0,
            has_conflict: false,
            selections_per_week: vec![0; weeks_count].into_boxed_slice(),
        })
    }

    /// Assigns `combination` to the next agent, returning the extended state.
    ///
    /// The combination must cover the same weeks as this state (plus the previous-period slot).
    pub fn append(self: &Arc<Self>, combination_id: CombinationId, combination: &StateCombination) -> Arc<Self> {
        debug_assert_eq!(combination.week_selections.len(), self.selections_per_week.len() + 1);

        let mut selections_per_week = self.selections_per_week.clone();
        for (count, &selected) in selections_per_week
            .iter_mut()
            .zip(combination.week_selections.iter().skip(1))
        {
            if selected {
                *count += 1;
            }
        }

        Arc::new(Self {
            parent: Some(Arc::clone(self)),
            last_combination_id: combination_id,
            agents_assigned: self.agents_assigned + 1,
            has_conflict: self.has_conflict || combination.has_conflict,
            selections_per_week,
        })
    }

    pub fn parent(&self) -> Option<&Arc<FrozenState>> {
        self.parent.as_ref()
    }

    pub fn last_combination_id(&self) -> CombinationId {
        self.last_combination_id
    }

    pub fn agents_assigned(&self) -> usize {
        self.agents_assigned as usize
    }

    pub fn has_conflict(&self) -> bool {
        self.has_conflict
    }

    pub fn selections_per_week(&self) -> &[u8] {
        &self.selections_per_week
    }

    /// Number of agents assigned to `week` (1-based). Week 0 and out-of-range weeks have none.
    pub fn selections_for_week(&self, week: Week) -> u8 {
        match week {
            0 => 0,
            w => self.selections_per_week.get(w as usize - 1).copied().unwrap_or(0),
        }
    }

    /// True when every week has at least `min_agents_per_week` agents.
    pub fn covers(&self, min_agents_per_week: u8) -> bool {
        self.selections_per_week.iter().all(|&count| count >= min_agents_per_week)
    }

    /// Walks from this state up to (but excluding) the root.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Combination id chosen by each assigned agent, agent 0 first.
    pub fn combination_ids(&self) -> Vec<CombinationId> {
        let mut ids: Vec<CombinationId> = self.chain().map(|state| state.last_combination_id).collect();
        ids.reverse();
        ids
    }
}

/// Iterator over a state and its ancestors that have an agent assigned.
pub struct Chain<'a> {
    next: Option<&'a FrozenState>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a FrozenState;

    fn next(&mut self) -> Option<Self::Item> {
        let state = self.next.filter(|state| state.agents_assigned > 0)?;
        self.next = state.parent.as_deref();
        Some(state)
    }
}
