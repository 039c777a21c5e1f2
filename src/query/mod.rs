//! Query module for turning free-text searches into storage keys
//!
//! # Components
//!
//! - `resolve`: derives a deterministic, filesystem-safe `QueryIdentity` from raw text
//! - `ResolvedQuery`: a raw query paired with its identity
//! - `read_queries_file` / `parse_queries` / `read_queries_interactive`: query list input

mod identity;
mod input;

pub use identity::{resolve, QueryIdentity, ResolvedQuery};
pub use input::{parse_queries, read_queries_file, read_queries_interactive, EntryMode};
