use thiserror::Error;

/// Configuration problems detected while building combination tables or the planner.
///
/// Every variant is fatal: the search never starts with a malformed setup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("At least one agent is required")]
    NoAgents,

    #[error("Too many agents: {count} (maximum is {max})")]
    TooManyAgents { count: usize, max: usize },

    #[error("Invalid weeks count {weeks_count}: must be between 1 and 255")]
    InvalidWeeksCount { weeks_count: usize },

    #[error("Invalid weeks per agent {weeks_per_agent} for {weeks_count} weeks")]
    InvalidWeeksPerAgent { weeks_per_agent: u8, weeks_count: u8 },

    #[error("Length mismatch for {field}: expected {expected}, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Agent {agent} has no legal week combination")]
    NoCombinations { agent: String },

    #[error("Agent {agent} has {count} combinations, more than the supported {max}")]
    TooManyCombinations {
        agent: String,
        count: usize,
        max: usize,
    },

    #[error("Combination {combination} of agent {agent} has {actual} week selections, expected {expected}")]
    InvalidSelectionLength {
        agent: String,
        combination: usize,
        expected: usize,
        actual: usize,
    },

    #[error("First conflict index {index} of agent {agent} does not match its combination table")]
    InconsistentConflictIndex { agent: String, index: usize },

    #[error("Agent {agent} excludes week {week}, outside 1..={weeks_count}")]
    InvalidExcludedWeek {
        agent: String,
        week: u8,
        weeks_count: u8,
    },

    #[error("Agent with name {name} not found")]
    UnknownAgent { name: String },

    #[error("Agent id {id} not found ({count} agents configured)")]
    UnknownAgentId { id: usize, count: usize },
}
