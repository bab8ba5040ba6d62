//! Mood journal library
//!
//! This library provides quick mood check-ins with context tags and notes,
//! a persisted entry store, the 7-day trend and streak statistics, a
//! filterable history and a box-breathing timer.

mod aggregator;
mod breathing;
mod capture;
mod cli;
mod config;
mod entry;
mod errors;
mod helper;
mod history;
mod kv;
mod storage;
mod types;

// Re-export key components
pub use aggregator::*;
pub use breathing::*;
pub use capture::*;
pub use cli::*;
pub use config::*;
pub use entry::*;
pub use errors::*;
pub use helper::*;
pub use history::*;
pub use kv::*;
pub use storage::*;
pub use types::*;
