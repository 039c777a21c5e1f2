//! Resume decisions for unfinished queries
//!
//! The controller asks a `ResumePolicy` whenever it finds persisted progress
//! for a query that is not yet complete. The same logic runs whether the
//! answer comes from a person at a terminal or from configuration.

use crate::query::QueryIdentity;
use crate::state::CrawlState;
use std::io::{BufRead, Write};

/// Known progress offered to whoever decides whether to resume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePrompt {
    pub identity: QueryIdentity,
    pub raw_query: String,
    pub captured: usize,
    pub position: u64,
    pub total_estimate: Option<u64>,
}

impl ResumePrompt {
    /// Builds a prompt from a persisted, unfinished state
    pub fn from_state(state: &CrawlState) -> Self {
        Self {
            identity: state.identity.clone(),
            raw_query: state.display_query().to_string(),
            captured: state.captured(),
            position: state.processed_count,
            total_estimate: state.total_estimate,
        }
    }

    /// Human-readable question, e.g. `'spa ha noi': 12 captured, position 12/57. Resume? [Y/n] `
    pub fn message(&self) -> String {
        let total = self
            .total_estimate
            .map(|t| t.to_string())
            .unwrap_or_else(|| "?".to_string());
        format!(
            "'{}': {} captured, position {}/{}. Resume? [Y/n] ",
            self.raw_query, self.captured, self.position, total
        )
    }
}

/// Decides whether an unfinished query resumes from its cursor or restarts at 0
pub trait ResumePolicy {
    fn should_resume(&mut self, prompt: &ResumePrompt) -> bool;
}

/// Answers every prompt the same way
#[derive(Debug, Clone, Copy)]
pub struct FixedResume(pub bool);

impl ResumePolicy for FixedResume {
    fn should_resume(&mut self, prompt: &ResumePrompt) -> bool {
        tracing::info!(
            "{} '{}' ({} captured)",
            if self.0 { "Resuming" } else { "Restarting" },
            prompt.raw_query,
            prompt.captured
        );
        self.0
    }
}

/// Asks on a line-oriented terminal; a blank answer means yes
pub struct PromptResume<R, W> {
    input: R,
    output: W,
    fallback: bool,
}

impl<R: BufRead, W: Write> PromptResume<R, W> {
    /// Creates a prompt over arbitrary input/output
    ///
    /// `fallback` is used when input is closed or unreadable.
    pub fn new(input: R, output: W, fallback: bool) -> Self {
        Self {
            input,
            output,
            fallback,
        }
    }
}

impl PromptResume<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Creates a prompt over the process's stdin/stdout
    pub fn stdio(fallback: bool) -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout(), fallback)
    }
}

impl<R: BufRead, W: Write> ResumePolicy for PromptResume<R, W> {
    fn should_resume(&mut self, prompt: &ResumePrompt) -> bool {
        if write!(self.output, "{}", prompt.message())
            .and_then(|_| self.output.flush())
            .is_err()
        {
            return self.fallback;
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => self.fallback,
            Ok(_) => parse_answer(&line),
        }
    }
}

/// Interprets a yes/no answer: blank or anything not starting with `n` is yes
pub fn parse_answer(answer: &str) -> bool {
    !answer.trim().to_lowercase().starts_with('n')
}
