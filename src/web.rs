use actix_web::{web, App, HttpServer, HttpResponse, Result, HttpRequest, middleware};
use actix_files::Files;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};
use crate::form::{export_agent_to_csv, validate_submission, AgentSubmissionRequest};
use crate::form::export::write_roster;
use crate::parser::{load_roster, parse_roster, RosterEntry};
use crate::planner::Week;
use crate::report::{plan_roster, PlanReport, PlanSettings};

// In-memory storage for the latest report; the roster itself lives in a CSV file
pub struct AppState {
    pub roster_path: PathBuf,
    pub settings: Mutex<PlanSettings>,
    pub report: Mutex<Option<PlanReport>>,
    pub admin_password: String,
    // Serializes every access to the roster file
    roster_lock: Mutex<()>,
}

impl AppState {
    pub fn new(roster_path: PathBuf, settings: PlanSettings, admin_password: String) -> Self {
        Self {
            roster_path,
            settings: Mutex::new(settings),
            report: Mutex::new(None),
            admin_password,
            roster_lock: Mutex::new(()),
        }
    }

    fn lock_roster(&self) -> MutexGuard<'_, ()> {
        match self.roster_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn read_roster(&self) -> std::result::Result<Vec<RosterEntry>, String> {
        let _guard = self.lock_roster();
        if !self.roster_path.exists() {
            return Ok(Vec::new());
        }
        load_roster(&self.roster_path).map_err(|e| e.to_string())
    }

    /// Appends one submission to the roster file
    pub fn append_submission(&self, submission: &AgentSubmissionRequest) -> std::result::Result<(), String> {
        let _guard = self.lock_roster();
        export_agent_to_csv(submission, &self.roster_path).map_err(|e| e.to_string())
    }

    /// Replaces the whole roster file
    pub fn replace_roster(&self, entries: &[RosterEntry]) -> std::result::Result<(), String> {
        let _guard = self.lock_roster();
        write_roster(entries, &self.roster_path).map_err(|e| e.to_string())
    }

    fn current_settings(&self) -> PlanSettings {
        match self.settings.lock() {
            Ok(settings) => settings.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn current_report(&self) -> Option<PlanReport> {
        match self.report.lock() {
            Ok(report) => report.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn is_admin(&self, req: &HttpRequest) -> bool {
        let password = req
            .headers()
            .get("X-Admin-Password")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        password == self.admin_password
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    password: String,
}

#[derive(Serialize)]
pub struct StatsResponse {
    agents: usize,
    previous_week_agents: Vec<String>,
    weeks: Vec<WeekStats>,
}

#[derive(Serialize)]
pub struct WeekStats {
    week: Week,
    available_agents: u32,
    excluded_agents: u32,
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Unauthorized"}))
}

fn failure(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({"success": false, "error": message}))
}

// Admin login endpoint
async fn admin_login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if req.password == state.admin_password {
        Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
    } else {
        Ok(HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Invalid password"})))
    }
}

// Public availability form
async fn submit_agent(
    req: web::Json<AgentSubmissionRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let settings = state.current_settings();
    if let Err(message) = validate_submission(&req, &settings) {
        return Ok(failure(message));
    }

    state
        .append_submission(&req)
        .map_err(|e| actix_web::error::ErrorInternalServerError(format!("Failed to save submission: {}", e)))?;
    info!(agent = %req.name.trim(), "agent submission stored");

    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

async fn get_agents(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.read_roster() {
        Ok(entries) => Ok(HttpResponse::Ok().json(entries)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(serde_json::json!({"success": false, "error": e}))),
    }
}

// Admin CSV upload endpoint, replaces the roster
async fn admin_upload(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !state.is_admin(&req) {
        return Ok(unauthorized());
    }

    let entries = match parse_roster(body.as_ref()) {
        Ok(entries) => entries,
        Err(e) => return Ok(failure(format!("Failed to process CSV: {}", e))),
    };

    state
        .replace_roster(&entries)
        .map_err(|e| actix_web::error::ErrorInternalServerError(format!("Failed to save file: {}", e)))?;
    info!(agents = entries.len(), "roster replaced");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "agents": entries.len()
    })))
}

async fn update_settings(
    req: HttpRequest,
    settings: web::Json<PlanSettings>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !state.is_admin(&req) {
        return Ok(unauthorized());
    }

    let settings = settings.into_inner();
    match state.settings.lock() {
        Ok(mut current) => *current = settings.clone(),
        Err(poisoned) => *poisoned.into_inner() = settings.clone(),
    }
    Ok(HttpResponse::Ok().json(settings))
}

async fn get_settings(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.current_settings()))
}

// Runs the planner on the current roster
async fn run_plan(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !state.is_admin(&req) {
        return Ok(unauthorized());
    }

    let entries = match state.read_roster() {
        Ok(entries) => entries,
        Err(e) => return Ok(failure(e)),
    };
    let settings = state.current_settings();

    // The search is CPU bound, keep it off the async workers
    let result = web::block(move || plan_roster(&entries, &settings)).await?;
    match result {
        Ok(report) => {
            let summary = serde_json::json!({
                "success": true,
                "plans": report.plans.len(),
                "outcome": report.outcome,
                "unavoidable_conflicts": report.unavoidable_conflicts,
            });
            match state.report.lock() {
                Ok(mut current) => *current = Some(report),
                Err(poisoned) => *poisoned.into_inner() = Some(report),
            }
            Ok(HttpResponse::Ok().json(summary))
        }
        Err(e) => {
            warn!(error = %e, "planning failed");
            Ok(failure(e.to_string()))
        }
    }
}

async fn get_plans(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.current_report() {
        Some(report) => Ok(HttpResponse::Ok().json(report)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "No plans available"}))),
    }
}

async fn get_plan_table(
    rank: web::Path<usize>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let rank = rank.into_inner();
    let table = state
        .current_report()
        .and_then(|report| report.tables.get(rank.wrapping_sub(1)).cloned());

    match table {
        Some(table) => Ok(HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(table)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "Plan not found"}))),
    }
}

// Availability per week across the roster
async fn get_stats(state: web::Data<AppState>) -> Result<HttpResponse> {
    let entries = match state.read_roster() {
        Ok(entries) => entries,
        Err(e) => return Ok(failure(e)),
    };
    let settings = state.current_settings();

    let weeks = (1..=settings.weeks_count)
        .map(|week| {
            let excluded_agents = entries
                .iter()
                .filter(|entry| entry.excluded_weeks.contains(&week))
                .count() as u32;
            WeekStats {
                week,
                available_agents: entries.len() as u32 - excluded_agents,
                excluded_agents,
            }
        })
        .collect();

    let previous_week_agents = entries
        .iter()
        .filter(|entry| entry.previous_week)
        .map(|entry| entry.name.clone())
        .collect();

    Ok(HttpResponse::Ok().json(StatsResponse {
        agents: entries.len(),
        previous_week_agents,
        weeks,
    }))
}

/// Registers every route on an app; shared by the server and the tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/login", web::post().to(admin_login))
        .route("/api/agents", web::post().to(submit_agent))
        .route("/api/agents", web::get().to(get_agents))
        .route("/api/upload", web::post().to(admin_upload))
        .route("/api/settings", web::get().to(get_settings))
        .route("/api/settings", web::post().to(update_settings))
        .route("/api/plan", web::post().to(run_plan))
        .route("/api/plans", web::get().to(get_plans))
        .route("/api/stats", web::get().to(get_stats))
        .service(web::resource("/api/plans/{rank}/table").route(web::get().to(get_plan_table)));
}

pub async fn start_server(port: u16, state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
            .service(Files::new("/", "static").index_file("index.html"))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
