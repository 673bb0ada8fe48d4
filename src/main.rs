use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lead_calendar::display::{print_report, write_report_to_file};
use lead_calendar::parser::{load_roster, RosterEntry};
use lead_calendar::planner::{SearchConfig, Week};
use lead_calendar::report::{plan_roster, PlanReport, PlanSettings};
use lead_calendar::web::{self, AppState};

#[derive(Parser)]
#[command(name = "lead-calendar")]
#[command(about = "Plans which agents lead which weeks of a period")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a roster CSV file.
    Plan {
        /// Roster CSV with name, excluded weeks and previous week columns
        #[arg(short, long, default_value = "roster.csv")]
        roster: PathBuf,
        #[command(flatten)]
        plan: PlanArgs,
    },

    /// Plan a built-in sample roster of eight agents.
    Demo {
        #[command(flatten)]
        plan: PlanArgs,
    },

    /// Serve the availability form and admin API.
    Web {
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Roster CSV the form appends to
        #[arg(short, long, default_value = "roster.csv")]
        roster: PathBuf,
        #[arg(long, env = "ADMIN_PASSWORD", default_value = "admin123")]
        admin_password: String,
        #[command(flatten)]
        plan: PlanArgs,
    },
}

#[derive(Args)]
struct PlanArgs {
    /// Weeks in the planned period
    #[arg(long, default_value = "5")]
    weeks: Week,
    /// Weeks each agent leads
    #[arg(long, default_value = "2")]
    weeks_per_agent: Week,
    /// Agents required on every week
    #[arg(long, default_value = "1")]
    min_agents_per_week: u8,
    /// Plans kept per set when trimming
    #[arg(long, default_value = "1000")]
    target_count: usize,
    /// Trim the plan sets every this many iterations
    #[arg(long, default_value = "100000")]
    limit_every: u64,
    /// Stop after this many iterations
    #[arg(long)]
    max_iterations: Option<u64>,
    /// Random seed for the trimming shuffle
    #[arg(long)]
    seed: Option<u64>,
    /// Number of plans to show
    #[arg(long, default_value = "3")]
    top: usize,
    /// Write the plan tables to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the report as JSON instead of tables
    #[arg(long)]
    json: bool,
}

impl PlanArgs {
    fn settings(&self) -> PlanSettings {
        PlanSettings {
            weeks_count: self.weeks,
            weeks_per_agent: self.weeks_per_agent,
            min_agents_per_week: self.min_agents_per_week,
            search: SearchConfig {
                target_count: self.target_count,
                limit_every: self.limit_every,
                max_iterations: self.max_iterations,
                seed: self.seed,
                top: self.top,
                ..SearchConfig::default()
            },
        }
    }
}

fn demo_roster() -> Vec<RosterEntry> {
    let agent = |name: &str, excluded_weeks: &[Week], previous_week: bool| RosterEntry {
        name: name.to_string(),
        excluded_weeks: excluded_weeks.to_vec(),
        previous_week,
    };
    vec![
        agent("Anne", &[1, 3], false),
        agent("Bob", &[], false),
        agent("Carol", &[1], false),
        agent("David", &[], true),
        agent("Eve", &[1, 2], false),
        agent("Frank", &[5], false),
        agent("George", &[], true),
        agent("Harry", &[3, 4, 5], true),
    ]
}

fn output_report(report: &PlanReport, args: &PlanArgs) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_report(report);
    }

    if let Some(path) = &args.output {
        let filename = path.to_string_lossy();
        write_report_to_file(report, &filename)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", filename, e))?;
        info!(file = %filename, "plans written");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Plan { roster, plan } => {
            let entries = load_roster(&roster)
                .with_context(|| format!("Failed to load roster {}", roster.display()))?;
            info!(agents = entries.len(), "roster loaded");

            let report = plan_roster(&entries, &plan.settings())?;
            output_report(&report, &plan)?;
        }
        Commands::Demo { plan } => {
            let report = plan_roster(&demo_roster(), &plan.settings())?;
            output_report(&report, &plan)?;
        }
        Commands::Web { port, roster, admin_password, plan } => {
            info!("Starting web server on port {}...", port);
            info!("Access the site at http://localhost:{}", port);

            let state = AppState::new(roster, plan.settings(), admin_password);
            web::start_server(port, state).await?;
        }
    }

    Ok(())
}
