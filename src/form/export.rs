use std::fs::OpenOptions;
use std::path::Path;
use csv::WriterBuilder;
use crate::form::submission::AgentSubmissionRequest;
use crate::parser::RosterEntry;

pub const ROSTER_HEADER: [&str; 3] = ["name", "excluded_weeks", "previous_week"];

fn entry_record(entry: &RosterEntry) -> [String; 3] {
    let excluded = entry
        .excluded_weeks
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let previous = if entry.previous_week { "yes" } else { "no" };
    [entry.name.clone(), excluded, previous.to_string()]
}

/// Appends a single agent submission to the roster CSV
///
/// The header is written first when the file does not exist yet. Resubmissions
/// are appended as well; the parser keeps the latest row per name.
pub fn export_agent_to_csv(
    submission: &AgentSubmissionRequest,
    csv_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let file_exists = csv_path.exists();

    // Open file in append mode

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    // If file is new, write the header first
    if !file_exists {
        wtr.write_record(ROSTER_HEADER)?;
    }

    // Now append the record
    let entry = submission.clone().into_entry();
    wtr.write_record(entry_record(&entry))?;

    wtr.flush()?;
    Ok(())
}

/// Writes a whole roster, replacing the file
pub fn write_roster(entries: &[RosterEntry], csv_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(csv_path)?;
    wtr.write_record(ROSTER_HEADER)?;
    for entry in entries {
        wtr.write_record(entry_record(entry))?;
    }
    wtr.flush()?;
    Ok(())
}
