use chrono::Utc;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::display::{format_plan_table, PlanView};
use crate::parser::RosterEntry;
use crate::planner::{run_search, ConfigError, PlannerBuilder, SearchConfig, SearchOutcome, Week};

/// Everything needed to plan a period besides the roster itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanSettings {
    pub weeks_count: Week,
    pub weeks_per_agent: Week,
    pub min_agents_per_week: u8,
    pub search: SearchConfig,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            weeks_count: 5,
            weeks_per_agent: 2,
            min_agents_per_week: 1,
            search: SearchConfig::default(),
        }
    }
}

/// Result of a planning run, ready to print or serve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReport {
    pub generated_at: String,
    pub settings: PlanSettings,
    pub agents: Vec<String>,
    pub outcome: SearchOutcome,
    pub unavoidable_conflicts: Vec<String>,
    pub plans: Vec<PlanView>,
    pub tables: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid planner configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Turns roster entries into a configured builder, in roster order.
pub fn builder_from_roster(settings: &PlanSettings, entries: &[RosterEntry]) -> Result<PlannerBuilder, ConfigError> {
    let builder = entries.iter().fold(
        PlannerBuilder::new(settings.weeks_count, settings.weeks_per_agent, settings.min_agents_per_week),
        |builder, entry| builder.add_agent(entry.name.clone(), entry.excluded_weeks.iter().copied()),
    );
    let previous: Vec<&str> = entries
        .iter()
        .filter(|entry| entry.previous_week)
        .map(|entry| entry.name.as_str())
        .collect();
    builder.set_previous_week(previous.as_slice())
}

/// Plans the roster end to end and collects the best plans.
pub fn plan_roster(entries: &[RosterEntry], settings: &PlanSettings) -> Result<PlanReport, ReportError> {
    let builder = builder_from_roster(settings, entries)?;
    let mut planner = builder.build()?;
    if let Some(seed) = settings.search.seed {
        planner = planner.with_seed(seed);
    }

    let unavoidable_conflicts: Vec<String> = planner
        .unavoidable_conflicts()
        .into_iter()
        .map(str::to_string)
        .collect();
    if unavoidable_conflicts.is_empty() {
        info!("no unavoidable conflicts detected");
    } else {
        warn!(agents = %unavoidable_conflicts.join(", "), "unavoidable conflicts detected");
    }

    let outcome = run_search(&mut planner, &settings.search);

    let ranked = planner.ranked_plans(settings.search.top);
    let mut plans = Vec::with_capacity(ranked.len());
    let mut tables = Vec::with_capacity(ranked.len());
    for (index, ranked_plan) in ranked.iter().enumerate() {
        let combinations = planner.plan_combinations(&ranked_plan.plan);
        plans.push(PlanView::new(index + 1, &planner, &ranked_plan.plan));
        tables.push(format_plan_table(builder.agents(), &combinations));
    }

    Ok(PlanReport {
        generated_at: Utc::now().to_rfc3339(),
        settings: settings.clone(),
        agents: planner.agent_names().to_vec(),
        outcome,
        unavoidable_conflicts,
        plans,
        tables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, excluded_weeks: Vec<Week>, previous_week: bool) -> RosterEntry {
        RosterEntry { name: name.to_string(), excluded_weeks, previous_week }
    }

    #[test]
    fn test_plan_small_roster() {
        let entries = vec![
            entry("Anne", vec![1], false),
            entry("Bob", vec![], true),
            entry("Carol", vec![3], false),
        ];
        let settings = PlanSettings {
            weeks_count: 3,
            weeks_per_agent: 1,
            min_agents_per_week: 1,
            search: SearchConfig { seed: Some(3), top: 2, ..SearchConfig::default() },
        };
        let report = plan_roster(&entries, &settings).unwrap();
        assert!(report.outcome.exhausted);
        assert_eq!(report.agents, vec!["Anne", "Bob", "Carol"]);
        assert!(!report.plans.is_empty());
        assert!(report.plans.len() <= 2);
        assert_eq!(report.plans.len(), report.tables.len());
        assert_eq!(report.plans[0].rank, 1);
        assert!(report.plans.iter().all(|plan| plan.conflict_score == 0));
        assert!(report.unavoidable_conflicts.is_empty());
    }

    #[test]
    fn test_unknown_configuration_surfaces() {
        let entries = vec![entry("Eve", vec![1, 2, 3], false)];
        let settings = PlanSettings { weeks_count: 3, weeks_per_agent: 1, ..PlanSettings::default() };
        let err = plan_roster(&entries, &settings).unwrap_err();
        assert!(matches!(err, ReportError::Config(ConfigError::NoCombinations { .. })));
    }

    #[test]
    fn test_settings_from_json() {
        let settings: PlanSettings =
            serde_json::from_str(r#"{"weeks_count": 6, "search": {"top": 1}}"#).unwrap();
        assert_eq!(settings.weeks_count, 6);
        assert_eq!(settings.weeks_per_agent, 2);
        assert_eq!(settings.search.top, 1);
    }
}
