use std::fs::File;
use std::io::Write;
use serde::{Serialize, Deserialize};
use crate::planner::{Agent, FrozenState, Planner, Score, StateCombination, Week};
use crate::report::PlanReport;

const SELECTED: &str = "✅";
const EXCLUDED: &str = "❌";
const FREE: &str = "❔";

/// Weeks chosen for one agent in a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAssignment {
    pub agent: String,
    pub weeks: Vec<Week>,
    pub has_conflict: bool,
}

/// Serializable summary of a finished plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanView {
    pub rank: usize,
    pub score: Score,
    pub conflict_score: Score,
    pub deviation_score: Score,
    pub has_conflict: bool,
    pub assignments: Vec<AgentAssignment>,
    pub selections_per_week: Vec<u8>,
}

impl PlanView {
    pub fn new(rank: usize, planner: &Planner, plan: &FrozenState) -> Self {
        let scorer = planner.scorer();
        let assignments = planner
            .agent_names()
            .iter()
            .zip(planner.plan_combinations(plan))
            .map(|(agent, combination)| AgentAssignment {
                agent: agent.clone(),
                weeks: combination.selected_weeks(),
                has_conflict: combination.has_conflict,
            })
            .collect();

        Self {
            rank,
            score: scorer.score(plan),
            conflict_score: scorer.conflict_score(plan),
            deviation_score: scorer.deviation_score(plan),
            has_conflict: plan.has_conflict(),
            assignments,
            selections_per_week: plan.selections_per_week().to_vec(),
        }
    }
}

/// Short column label for an agent: the first two characters of the name
pub fn format_agent_label(name: &str) -> String {
    let label: String = name.chars().take(2).collect();
    format!("{:<2}", label)
}

/// Renders a plan as a week-by-agent grid
///
/// Row 0 is the last week of the previous period and is separated from the
/// planned weeks by a divider:
///
/// ```text
///   | An | Bo
/// 0 | ❔ | ✅
/// --|----|----
/// 1 | ❌ | ❔
/// 2 | ✅ | ❔
/// 3 | ❔ | ✅
/// ```
pub fn format_plan_table(agents: &[Agent], combinations: &[&StateCombination]) -> String {
    let weeks_count = combinations
        .first()
        .map(|c| c.week_selections.len().saturating_sub(1))
        .unwrap_or(0);
    let width = (weeks_count.to_string().len()).max(1);

    let mut table = String::new();

    // Header
    table.push_str(&" ".repeat(width));
    for agent in agents.iter().take(combinations.len()) {
        table.push_str(" | ");
        table.push_str(&format_agent_label(&agent.name));
    }
    table.push('\n');

    let push_week = |table: &mut String, week: usize| {
        table.push_str(&format!("{:<width$}", week, width = width));
        for (agent, combination) in agents.iter().zip(combinations) {
            let icon = if combination.is_selected(week) {
                SELECTED
            } else if week > 0 && agent.is_excluded(week as Week) {
                EXCLUDED
            } else {
                FREE
            };
            table.push_str(" | ");
            table.push_str(icon);
        }
        table.push('\n');
    };

    push_week(&mut table, 0);

    // Divider
    table.push_str(&"-".repeat(width + 1));
    for _ in 0..combinations.len().min(agents.len()) {
        table.push_str("|----");
    }
    table.push('\n');

    for week in 1..=weeks_count {
        push_week(&mut table, week);
    }

    table
}

/// Prints a planning report in a readable format
pub fn print_report(report: &PlanReport) {
    println!("\n=== Lead Calendar ({} weeks, {} per agent, at least {} per week) ===",
        report.settings.weeks_count, report.settings.weeks_per_agent, report.settings.min_agents_per_week);
    println!("Generated at: {}", report.generated_at);

    let stats = &report.outcome.stats;
    println!("TOT: {} INV: {} CONF: {} VAL: {}",
        stats.total_plans, stats.invalid_plans, stats.conflicting_plans, stats.valid_plans);
    if !report.outcome.exhausted {
        println!("Search stopped after {} iterations; results are partial.", report.outcome.iterations);
    }

    if !report.unavoidable_conflicts.is_empty() {
        println!("⚠️  Unavoidable conflicts for: {}", report.unavoidable_conflicts.join(", "));
    }

    if report.plans.is_empty() {
        println!("\nNo plan satisfies the minimum coverage.");
        return;
    }

    for (plan, table) in report.plans.iter().zip(&report.tables) {
        println!("\n--- Plan #{} (score {}: conflicts {}, deviation {}) ---",
            plan.rank, plan.score, plan.conflict_score, plan.deviation_score);
        print!("{}", table);
    }
}

/// Writes the report tables to a file, one plan after another
pub fn write_report_to_file(report: &PlanReport, filename: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(filename)?;

    writeln!(file, "** Lead Calendar ({}) **", report.generated_at)?;
    writeln!(file, "Agents: {}", report.agents.join(", "))?;

    for (plan, table) in report.plans.iter().zip(&report.tables) {
        writeln!(file)?;
        writeln!(file, "# Plan {} - score {}", plan.rank, plan.score)?;
        write!(file, "{}", table)?;
    }

    Ok(())
}
