/// Outcome definitions for individual crawl attempts
use std::fmt;

/// How a crawl attempt for one query ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunOutcome {
    // ===== Active =====
    /// Attempt is still in progress (or the process died mid-run)
    Running,

    // ===== Terminal Success States =====
    /// Source result list was exhausted during this attempt
    Completed,

    /// State was already complete; nothing was extracted
    AlreadyDone,

    // ===== Terminal Partial States =====
    /// Cancellation was observed; buffered items were checkpointed
    Interrupted,

    /// Extraction or persistence failed; buffered items were checkpointed when possible
    Failed,
}

impl RunOutcome {
    /// Returns true if the query's result list is fully captured
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed | Self::AlreadyDone)
    }

    /// Converts the outcome to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::AlreadyDone => "already_done",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    /// Parses an outcome from its database string representation
    ///
    /// Returns None if the string doesn't match any known outcome.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "already_done" => Some(Self::AlreadyDone),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
