//! CLI module for the moodlog application
//!
//! This module handles the command-line interface for checking in, reading
//! the journal back and running the breathing exercise.
use std::{
    fs::{read_to_string, OpenOptions},
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    process::Command,
};

use chrono::{Local, TimeZone};
use console::{style, StyledObject, Term};
use log::info;
use shell_words::split;
use tempfile::Builder;

use crate::{
    build_draft, compute_stats, compute_trend, format_entry_time, notes_or_placeholder,
    parse_tags, BreathingConfig, BreathingSession, Commands, Config, ContextTag, EntryStore,
    HistoryQuery, KeyValueStore, Mood, MoodEntry, MoodError, MoodStats, Result, Sentiment, Trend,
};

const NOTES_TEMPLATE_MARKER: &str = "#";

/// CLI Application handler - processes CLI commands and interfaces with the entry store
pub struct App<S> {
    /// The entry store backend
    store: EntryStore<S>,

    /// Application configuration
    config: Config,

    /// Where `config --reset` writes to
    config_path: Option<PathBuf>,
}

impl<S: KeyValueStore> App<S> {
    /// Create a new CLI application with the given store and config
    pub fn new(store: EntryStore<S>, config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            store,
            config,
            config_path,
        }
    }

    pub fn store(&self) -> &EntryStore<S> {
        &self.store
    }

    /// Run the CLI application with the given command
    pub async fn run(&self, command: Commands) -> Result<()> {
        self.store.load().await;

        match command {
            Commands::Checkin {
                mood,
                tags,
                notes,
                edit,
            } => self.check_in(mood, tags, notes, edit).await?,

            Commands::History { tag, limit, json } => self.show_history(tag, limit, json)?,

            Commands::Trend { json } => self.show_trend(json)?,

            Commands::Stats { json } => self.show_stats(json)?,

            Commands::Delete { id, force } => self.handle_delete(id, force).await?,

            Commands::Breathe { cycles } => self.breathe(cycles).await?,

            Commands::Tags => {
                for tag in ContextTag::ALL {
                    println!("{}", tag);
                }
            }

            Commands::Config { show, reset } => self.handle_config(show, reset)?,
        }

        Ok(())
    }

    async fn check_in(
        &self,
        mood: i64,
        tags: Option<String>,
        notes: Option<String>,
        edit: bool,
    ) -> Result<()> {
        let parsed_tags = parse_tags(tags);

        let notes = match (notes, edit) {
            (Some(n), _) => n,
            (None, true) => self.open_editor_for_notes()?,
            (None, false) => String::new(),
        };

        let draft = build_draft(mood, &parsed_tags, notes)?;
        let entry = self.store.append(draft).await?;

        println!(
            "Check-in saved with ID: {} ({})",
            entry.id,
            mood_label(entry.mood)
        );
        Ok(())
    }

    fn show_history(&self, tag: Option<String>, limit: Option<usize>, json: bool) -> Result<()> {
        let query = HistoryQuery {
            tag: tag.as_deref().map(str::parse::<ContextTag>).transpose()?,
            limit: Some(limit.unwrap_or(self.config.history_limit)),
        };
        let entries = query.apply(&self.store.entries());

        if json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        } else {
            let term_width = terminal_size::terminal_size()
                .map(|(w, _)| w.0 as usize)
                .unwrap_or(80);
            print!("{}", render_history(&entries, &query, &Local, term_width));
        }
        Ok(())
    }

    fn show_trend(&self, json: bool) -> Result<()> {
        let trend = compute_trend(&self.store.entries(), &Local::now());
        if json {
            println!("{}", serde_json::to_string_pretty(&trend)?);
        } else {
            print!("{}", render_trend(&trend));
        }
        Ok(())
    }

    fn show_stats(&self, json: bool) -> Result<()> {
        let stats = compute_stats(&self.store.entries(), &Local::now());
        if json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("{}", render_stats(&stats));
        }
        Ok(())
    }

    async fn handle_delete(&self, id: String, force: bool) -> Result<()> {
        // Fetch the entry to verify it exists and show details in the prompt
        let entry = match self.store.get(&id) {
            Some(entry) => entry,
            None => return Err(MoodError::EntryNotFound { id }),
        };

        if !force {
            println!("You are about to delete the following check-in:");
            println!("ID:     {}", entry.id);
            println!("Mood:   {} ({})", entry.mood, entry.mood.label());
            println!("Time:   {}", format_entry_time(&entry, &Local));
            println!("Notes:  {}", notes_or_placeholder(&entry));

            println!("\nThis action cannot be undone!");
            print!("Are you sure you want to delete this check-in? [y/N]: ");
            stdout().flush().map_err(MoodError::Io)?;

            let mut input = String::new();
            stdin().read_line(&mut input).map_err(MoodError::Io)?;

            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        self.store.remove(&id).await?;
        println!("Check-in {} has been permanently deleted.", id);
        Ok(())
    }

    async fn breathe(&self, cycles: Option<u32>) -> Result<()> {
        let config = BreathingConfig {
            phase_secs: self.config.breathing_phase_secs,
            max_cycles: cycles,
        };

        println!("{}", style("Box Breathing").bold());
        println!("Box breathing helps regulate stress. Press Ctrl-C to stop.\n");

        let term = Term::stdout();
        let mut session = BreathingSession::start(config, move |tick| {
            let line = format!(
                "{} {}  (cycle {})",
                style(tick.phase.instruction()).cyan().bold(),
                tick.seconds_remaining,
                tick.completed_cycles + 1
            );
            let _ = term.clear_line();
            let _ = term.write_str(&line);
        });

        let finished = tokio::select! {
            result = session.wait() => {
                result?;
                true
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, ending breathing session");
                false
            }
        };
        session.stop().await?;

        let completed = match (finished, cycles) {
            (true, Some(limit)) => limit,
            _ => session
                .status()
                .last_tick
                .map(|t| t.completed_cycles)
                .unwrap_or(0),
        };
        println!("\nSession complete. Cycles finished: {}", completed);
        Ok(())
    }

    fn handle_config(&self, show: bool, reset: bool) -> Result<()> {
        if reset {
            let defaults = Config::default();
            defaults.save(self.config_path.as_deref())?;
            println!("Configuration reset to defaults.");
            println!("{}", serde_json::to_string_pretty(&defaults)?);
            return Ok(());
        }

        if show {
            println!("{}", serde_json::to_string_pretty(&self.config)?);
        } else {
            println!("Use --show to print the configuration or --reset to restore defaults.");
        }
        Ok(())
    }

    fn open_editor_for_notes(&self) -> Result<String> {
        let temp_file = Builder::new().suffix(".txt").tempfile()?;
        let temp_path = temp_file.path().to_path_buf();

        let editor_cmd = self.config.get_editor_command();
        self.write_editor_template(&temp_path)?;

        info!("Opening editor for check-in notes. Save and exit when done...");
        self.launch_editor(&editor_cmd, &temp_path)?;

        let content = read_to_string(&temp_path)?;
        Ok(process_editor_content(&content))
    }

    fn write_editor_template(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new().write(true).open(path)?;

        writeln!(file, "{} How are you feeling? Write your notes below.", NOTES_TEMPLATE_MARKER)?;
        writeln!(file, "{} Lines starting with '#' are ignored.", NOTES_TEMPLATE_MARKER)?;
        writeln!(file)?;

        Ok(())
    }

    fn launch_editor(&self, editor_cmd: &str, file_path: &Path) -> Result<()> {
        let path_str = file_path.to_string_lossy();

        // Handle shell-like command parsing
        let args = split(editor_cmd).map_err(|e| MoodError::EditorError {
            message: format!("Failed to parse editor command: {}", e),
        })?;

        let Some((program, rest)) = args.split_first() else {
            return Err(MoodError::EditorError {
                message: "Empty editor command".to_string(),
            });
        };

        let status = Command::new(program)
            .args(rest)
            .arg(path_str.as_ref())
            .status()?;

        if !status.success() {
            return Err(MoodError::EditorError {
                message: "Editor exited with non-zero status".to_string(),
            });
        }

        Ok(())
    }
}

/// Drops template comment lines and surrounding blank lines.
fn process_editor_content(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with(NOTES_TEMPLATE_MARKER))
        .collect::<Vec<&str>>()
        .join("\n")
        .trim()
        .to_string()
}

fn mood_label(mood: Mood) -> StyledObject<&'static str> {
    let label = style(mood.label()).bold();
    match mood.sentiment() {
        Sentiment::Positive => label.green(),
        Sentiment::Neutral => label.yellow(),
        Sentiment::Negative => label.red(),
    }
}

/// Text rendering of a history listing.
pub fn render_history<Tz: TimeZone>(
    entries: &[MoodEntry],
    query: &HistoryQuery,
    tz: &Tz,
    term_width: usize,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if entries.is_empty() {
        return format!("{}\n", query.empty_message());
    }

    let preview_width = term_width.saturating_sub(4).max(20);
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str(&"-".repeat(term_width.min(50)));
            out.push('\n');
        }

        out.push_str(&format!(
            "{} • {}  [{}]\n",
            mood_label(entry.mood),
            format_entry_time(entry, tz),
            entry.id
        ));
        out.push_str(&format!(
            "  {}\n",
            preview(notes_or_placeholder(entry), preview_width)
        ));

        if !entry.tags.is_empty() {
            let tags = entry
                .tags
                .iter()
                .map(|tag| {
                    let chip = format!("#{}", tag);
                    if query.tag == Some(*tag) {
                        style(chip).cyan().bold().to_string()
                    } else {
                        style(chip).cyan().to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!("  {}\n", tags));
        }
    }

    out.push_str(&format!(
        "\n{} entr{}\n",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" }
    ));
    out
}

/// Text rendering of the 7-day trend as one bar per day.
pub fn render_trend(trend: &Trend) -> String {
    let mut out = format!("{}\n", style("7-Day Mood Trend").bold());
    if !trend.sufficient_data {
        out.push_str("Add more entries to see your trend line.\n");
        return out;
    }

    for point in &trend.points {
        match point.value {
            Some(value) => {
                // One block per half point on the 1-5 scale.
                let blocks = ((value - 1.0) * 2.0).round() as usize + 1;
                out.push_str(&format!(
                    "{}  {} {:.1}\n",
                    point.label,
                    style("█".repeat(blocks)).magenta(),
                    value
                ));
            }
            None => out.push_str(&format!("{}  -\n", point.label)),
        }
    }
    out
}

/// One-line dashboard summary.
pub fn render_stats(stats: &MoodStats) -> String {
    let average = stats
        .average
        .map(|a| format!("{:.1}", a))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Avg Mood: {} | Entries: {} | Streak: {}d",
        average, stats.total, stats.streak
    )
}

/// First line of `text`, cut to `max_chars` characters.
fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    if first_line.chars().count() <= max_chars {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::TrendPoint;

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).into_owned()
    }

    fn entry(id: &str, mood: i64, notes: &str, tags: Vec<ContextTag>) -> MoodEntry {
        MoodEntry {
            id: id.to_string(),
            mood: Mood::new(mood).unwrap(),
            tags,
            notes: notes.to_string(),
            // 2024-10-16T09:05:00Z
            timestamp: 1_729_069_500_000,
        }
    }

    #[test]
    fn history_shows_empty_state() {
        let text = render_history(&[], &HistoryQuery::default(), &Utc, 80);
        assert_eq!(text, "No entries yet. Start tracking!\n");
    }

    #[test]
    fn history_lists_entries() {
        let entries = vec![
            entry("1", 5, "great run", vec![ContextTag::Exercise]),
            entry("2", 2, "", vec![]),
        ];
        let text = plain(&render_history(&entries, &HistoryQuery::default(), &Utc, 80));
        assert!(text.contains("Amazing • Oct 16, 09:05  [1]"));
        assert!(text.contains("  great run\n"));
        assert!(text.contains("#Exercise"));
        assert!(text.contains("  No note added.\n"));
        assert!(text.ends_with("2 entries\n"));
    }

    #[test]
    fn long_notes_are_truncated() {
        assert_eq!(preview("abcdefghijklmnop", 10), "abcdefg...");
        assert_eq!(preview("\n\nsecond line\nthird", 40), "second line");
    }

    #[test]
    fn trend_placeholder_when_data_is_thin() {
        let trend = Trend {
            points: vec![],
            sufficient_data: false,
        };
        assert!(render_trend(&trend).contains("Add more entries to see your trend line."));
    }

    #[test]
    fn trend_bars_and_gaps() {
        let day = NaiveDate::from_ymd_opt(2024, 10, 14).unwrap();
        let trend = Trend {
            points: vec![
                TrendPoint {
                    date: day,
                    label: "Mon".into(),
                    value: Some(3.0),
                    entry_count: 1,
                },
                TrendPoint {
                    date: day.succ_opt().unwrap(),
                    label: "Tue".into(),
                    value: None,
                    entry_count: 0,
                },
            ],
            sufficient_data: true,
        };
        let text = plain(&render_trend(&trend));
        assert!(text.contains("Mon  █████ 3.0\n"));
        assert!(text.contains("Tue  -\n"));
    }

    #[test]
    fn stats_line() {
        let stats = MoodStats {
            average: Some(3.7),
            total: 3,
            streak: 2,
        };
        assert_eq!(render_stats(&stats), "Avg Mood: 3.7 | Entries: 3 | Streak: 2d");

        let empty = MoodStats {
            average: None,
            total: 0,
            streak: 0,
        };
        assert_eq!(render_stats(&empty), "Avg Mood: - | Entries: 0 | Streak: 0d");
    }

    #[test]
    fn editor_comments_are_stripped() {
        let content = "# How are you feeling?\n# ignored\n\nslept badly\n  # also ignored\nbut ok\n";
        assert_eq!(process_editor_content(content), "slept badly\nbut ok");
    }
}
