pub mod submission;
pub mod export;

pub use submission::{AgentSubmissionRequest, validate_submission};
pub use export::export_agent_to_csv;
