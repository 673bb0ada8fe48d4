use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::planner::Week;

/// One agent row of the roster file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub excluded_weeks: Vec<Week>,
    pub previous_week: bool,
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Failed to open roster {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read roster CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Parses a list of week numbers separated by commas, semicolons or whitespace
/// Tokens that are not week numbers are ignored
pub fn parse_week_list(value: &str) -> Vec<Week> {
    let weeks: HashSet<Week> = value
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter_map(|token| token.trim().parse().ok())
        .collect();

    let mut result: Vec<Week> = weeks.into_iter().collect();
    result.sort();
    result
}

/// Parses a boolean value from various string representations
fn parse_bool(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower == "yes" || lower == "true" || lower == "1" || lower == "x"
}

/// Loads the agent roster from a CSV file
pub fn load_roster<P: AsRef<Path>>(csv_path: P) -> Result<Vec<RosterEntry>, RosterError> {
    let path = csv_path.as_ref();
    let file = File::open(path).map_err(|source| RosterError::Open {
        path: path.display().to_string(),
        source,
    })?;
    parse_roster(file)
}

/// Parses an agent roster from any CSV source
///
/// Agents keep the order of their first row; a later row with the same name
/// replaces the earlier one (a resubmission).
pub fn parse_roster<R: Read>(source: R) -> Result<Vec<RosterEntry>, RosterError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    // Find columns by header text, falling back to the default layout
    let headers = reader.headers()?.clone();
    let column = |needle: &str, fallback: usize| {
        headers
            .iter()
            .position(|h| h.to_lowercase().contains(needle))
            .unwrap_or(fallback)
    };
    let name_col = column("name", 0);
    let excluded_col = column("exclu", 1);
    let previous_col = column("previous", 2);

    let mut entries: Vec<RosterEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for result in reader.records() {
        let record = result?;

        // Skip rows without a name
        let name = record.get(name_col).unwrap_or("").trim().to_string();
        if name.is_empty() {
            continue;
        }

        let entry = RosterEntry {
            excluded_weeks: parse_week_list(record.get(excluded_col).unwrap_or("")),
            previous_week: parse_bool(record.get(previous_col).unwrap_or("")),
            name,
        };

        // Resubmissions replace the earlier row
        match positions.get(&entry.name) {
            Some(&index) => entries[index] = entry,
            None => {
                positions.insert(entry.name.clone(), entries.len());
                entries.push(entry);
            }
        }
    }

    Ok(entries)
}
