//! Shared types for the moodlog application.
//!
//! This module contains the crate-wide `Result` alias and the CLI command set.
use clap::Subcommand;

use crate::MoodError;

/// A specialized Result type for moodlog operations.
pub type Result<T> = std::result::Result<T, MoodError>;

/// Available subcommands for the moodlog application
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a new mood check-in
    Checkin {
        /// Mood rating from 1 (rough) to 5 (amazing)
        #[clap(short, long)]
        mood: i64,

        /// Context tags to attach (comma-separated, e.g. "Sleep,Work")
        #[clap(short, long)]
        tags: Option<String>,

        /// Notes for the check-in
        #[clap(short, long)]
        notes: Option<String>,

        /// Write the notes in an editor before saving
        #[clap(short, long)]
        edit: bool,
    },

    /// Show recent check-ins, newest first
    History {
        /// Only show entries carrying this tag
        #[clap(short, long)]
        tag: Option<String>,

        /// Limit the number of entries shown (default uses config setting)
        #[clap(short = 'n', long)]
        limit: Option<usize>,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Show the 7-day mood trend
    Trend {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Show average mood, entry count and streak
    Stats {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Delete a check-in by ID
    Delete {
        /// ID of the entry to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Run a guided box-breathing session
    Breathe {
        /// Stop after this many full cycles (runs until Ctrl-C otherwise)
        #[clap(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        cycles: Option<u32>,
    },

    /// List the available context tags
    Tags,

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Reset configuration to defaults
        #[clap(short, long)]
        reset: bool,
    },
}
