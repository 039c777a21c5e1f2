//! Crawler module for resumable per-query crawling
//!
//! This module contains the core crawling logic, including:
//! - The extraction source boundary and an external-process adapter
//! - Resume decisions for unfinished queries
//! - Per-query crawl control with periodic checkpoints
//! - Multi-query batch orchestration

mod batch;
mod command;
mod controller;
mod resume;
mod source;

pub use batch::{run_batch, BatchOptions, BatchReport, QueryReport, QueryStatus};
pub use command::{build_search_url, CommandSource};
pub use controller::{CrawlController, CrawlReport, CrawlStart, DEFAULT_CHECKPOINT_EVERY};
pub use resume::{parse_answer, FixedResume, PromptResume, ResumePolicy, ResumePrompt};
pub use source::{ExtractError, Extraction, ItemSource};
