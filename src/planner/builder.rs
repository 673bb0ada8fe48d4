use tracing::warn;
use super::engine::Planner;
use super::error::ConfigError;
use super::tables::build_combination_tables;
use super::types::{Agent, Week};

/// Collects agents and the previous-period roster, then builds a [`Planner`].
#[derive(Debug, Clone)]
pub struct PlannerBuilder {
    weeks_count: Week,
    weeks_per_agent: Week,
    min_agents_per_week: u8,
    agents: Vec<Agent>,
    previous_week_agent_ids: Vec<usize>,
}

impl PlannerBuilder {
    pub fn new(weeks_count: Week, weeks_per_agent: Week, min_agents_per_week: u8) -> Self {
        Self {
            weeks_count,
            weeks_per_agent,
            min_agents_per_week,
            agents: Vec::new(),
            previous_week_agent_ids: Vec::new(),
        }
    }

    pub fn add_agent(mut self, name: impl Into<String>, excluded_weeks: impl IntoIterator<Item = Week>) -> Self {
        let id = self.agents.len();
        self.agents.push(Agent::new(id, name, excluded_weeks));
        self
    }

    /// Marks the named agents as active in the last week of the previous period.
    pub fn set_previous_week<S: AsRef<str>>(mut self, agent_names: &[S]) -> Result<Self, ConfigError> {
        for agent_name in agent_names {
            let agent_name = agent_name.as_ref();
            let agent_id = self
                .agents
                .iter()
                .position(|a| a.name == agent_name)
                .ok_or_else(|| ConfigError::UnknownAgent { name: agent_name.to_string() })?;
            if !self.previous_week_agent_ids.contains(&agent_id) {
                self.previous_week_agent_ids.push(agent_id);
            }
        }
        Ok(self)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn previous_week_agent_ids(&self) -> &[usize] {
        &self.previous_week_agent_ids
    }

    pub fn build(&self) -> Result<Planner, ConfigError> {
        let (tables, first_conflict_indexes) = build_combination_tables(
            &self.agents,
            self.weeks_count,
            self.weeks_per_agent,
            &self.previous_week_agent_ids,
        )?;

        let agent_names = self.agents.iter().map(|a| a.name.clone()).collect();
        let planner = Planner::new(
            self.weeks_count,
            self.weeks_per_agent,
            self.min_agents_per_week,
            agent_names,
            tables,
            first_conflict_indexes,
        )?;

        let capacity = self.agents.len() * self.weeks_per_agent as usize;
        let required = self.weeks_count as usize * self.min_agents_per_week as usize;
        if capacity < required {
            warn!(capacity, required, "not enough agent weeks to reach the minimum coverage, every plan will be invalid");
        }

        Ok(planner)
    }
}
