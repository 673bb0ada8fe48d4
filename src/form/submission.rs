use serde::{Deserialize, Serialize};
use crate::parser::RosterEntry;
use crate::planner::Week;
use crate::report::PlanSettings;

/// Availability form sent by a single agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSubmissionRequest {
    pub name: String,
    #[serde(default)]
    pub excluded_weeks: Vec<Week>,
    #[serde(default)]
    pub previous_week: bool,
}

impl AgentSubmissionRequest {
    pub fn into_entry(self) -> RosterEntry {
        let mut excluded_weeks = self.excluded_weeks;
        excluded_weeks.sort_unstable();
        excluded_weeks.dedup();
        RosterEntry {
            name: self.name.trim().to_string(),
            excluded_weeks,
            previous_week: self.previous_week,
        }
    }
}

/// Validates a submission against the current planning settings
pub fn validate_submission(req: &AgentSubmissionRequest, settings: &PlanSettings) -> Result<(), String> {
    // Validate agent name
    let name = req.name.trim();
    if name.is_empty() {
        return Err("Agent name is required".to_string());
    }
    // The roster is a CSV file and names are matched exactly
    if name.contains(['\n', '\r']) {
        return Err("Agent name must be a single line".to_string());
    }

    // Validate excluded weeks
    for &week in &req.excluded_weeks {
        if week < 1 || week > settings.weeks_count {
            return Err(format!("Invalid excluded week: {} (weeks are 1-{})", week, settings.weeks_count));
        }
    }

    // The agent must still be able to lead enough weeks
    let mut excluded = req.excluded_weeks.clone();
    excluded.sort_unstable();
    excluded.dedup();
    let eligible = settings.weeks_count as usize - excluded.len();
    if eligible < settings.weeks_per_agent as usize {
        return Err(format!(
            "Too many excluded weeks: {} weeks left but {} are needed",
            eligible, settings.weeks_per_agent
        ));
    }

    Ok(())
}
