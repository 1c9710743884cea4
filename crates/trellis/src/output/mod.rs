//! Output formatting for CLI commands.
//!
//! Every printer has a text form for people and a JSON form for scripts.
//! The `*_text` writers take any [`Write`] so they can be exercised against
//! a buffer.
//!
//! Submodules:
//! - [`color`]: Color and styling helpers

pub mod color;

use crate::domain::Record;
use crate::graph::{EpicProgress, RecordView};
use serde::Serialize;
use std::env;
use std::io::{self, Write};

pub use color::{error, success, warning};

use color::{
    bold, colored_status_icon, colored_type_tag, colorize_id, colorize_labels,
    colorize_percentage, colorize_priority, colorize_status, dimmed,
};

const DEFAULT_TERMINAL_WIDTH: usize = 80;
const DEFAULT_MAX_CONTENT_WIDTH: usize = 80;

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Maximum content width for text wrapping.
    pub max_width: usize,
    /// Whether to use ASCII-only icons instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new `OutputConfig` with explicit values.
    #[must_use]
    pub fn new(max_width: usize, use_ascii: bool, use_colors: bool) -> Self {
        Self {
            max_width,
            use_ascii,
            use_colors,
        }
    }

    /// Create an `OutputConfig` by reading from environment variables.
    ///
    /// Reads:
    /// - `TRELLIS_MAX_WIDTH`: Maximum content width (default: 80)
    /// - `TRELLIS_ASCII`: Set to "1" or "true" for ASCII-only icons
    /// - `NO_COLOR`: Any value disables colors
    /// - `TRELLIS_COLOR`: Set to "0" or "false" to disable colors
    #[must_use]
    pub fn from_env() -> Self {
        let max_width = match env::var("TRELLIS_MAX_WIDTH") {
            Ok(s) if !s.is_empty() => s.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    env_var = "TRELLIS_MAX_WIDTH",
                    value = %s,
                    default = DEFAULT_MAX_CONTENT_WIDTH,
                    "Invalid value, using default"
                );
                DEFAULT_MAX_CONTENT_WIDTH
            }),
            _ => DEFAULT_MAX_CONTENT_WIDTH,
        };

        let use_ascii = env::var("TRELLIS_ASCII")
            .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        // https://no-color.org/
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("TRELLIS_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);

        Self {
            max_width,
            use_ascii,
            use_colors,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_CONTENT_WIDTH,
            use_ascii: false,
            use_colors: true,
        }
    }
}

fn terminal_width() -> usize {
    terminal_size::terminal_size().map_or(DEFAULT_TERMINAL_WIDTH, |(w, _)| usize::from(w.0))
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Print a list of records.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn print_records(records: &[Record], mode: OutputMode) -> io::Result<()> {
    let mut handle = io::stdout().lock();
    match mode {
        OutputMode::Text => print_records_text(&mut handle, records, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, &records),
    }
}

/// Print one record with its dependents and, for epics, subtask progress.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn print_record_details(
    view: &RecordView,
    progress: Option<&EpicProgress>,
    mode: OutputMode,
) -> io::Result<()> {
    let mut handle = io::stdout().lock();
    match mode {
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            let width = terminal_width().min(config.max_width);
            print_record_details_text(&mut handle, view, progress, width, &config)
        }
        OutputMode::Json => write_json(
            &mut handle,
            &serde_json::json!({
                "record": view.record,
                "dependents": view.dependents,
                "progress": progress,
            }),
        ),
    }
}

/// Print blocked records next to the records blocking them.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn print_blocked(blocked: &[(Record, Vec<Record>)], mode: OutputMode) -> io::Result<()> {
    let mut handle = io::stdout().lock();
    match mode {
        OutputMode::Text => print_blocked_text(&mut handle, blocked, &OutputConfig::from_env()),
        OutputMode::Json => {
            let entries: Vec<_> = blocked
                .iter()
                .map(|(record, blockers)| {
                    serde_json::json!({ "record": record, "blocked_by": blockers })
                })
                .collect();
            write_json(&mut handle, &entries)
        }
    }
}

/// Print a JSON-formatted result for any serializable value
///
/// # Errors
///
/// Returns an error if serialization or writing to stdout fails.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    write_json(&mut io::stdout().lock(), value)
}

fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w)
}

fn record_row(record: &Record, config: &OutputConfig) -> String {
    let mut row = format!(
        "{} {}  {}  {}",
        colored_status_icon(record.status, config),
        colorize_id(record.id.as_str(), config),
        colorize_priority(record.priority, config),
        record.title
    );
    let tag = colored_type_tag(record.record_type, config);
    if !tag.is_empty() {
        row.push(' ');
        row.push_str(&tag);
    }
    if let Some(percentage) = record.completion_percentage {
        row.push_str(&format!(" ({})", colorize_percentage(percentage, config)));
    }
    row
}

fn print_records_text<W: Write>(
    w: &mut W,
    records: &[Record],
    config: &OutputConfig,
) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(w, "No records found.");
    }

    writeln!(w, "Found {} record(s):", records.len())?;
    writeln!(w)?;
    for record in records {
        writeln!(w, "{}", record_row(record, config))?;
    }
    Ok(())
}

fn print_text_section<W: Write>(
    w: &mut W,
    title: &str,
    content: &str,
    width: usize,
    config: &OutputConfig,
) -> io::Result<()> {
    if content.trim().is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    writeln!(w, "{}:", bold(title, config))?;
    for line in wrap_text(content, width.saturating_sub(2)) {
        writeln!(w, "  {line}")?;
    }
    Ok(())
}

fn print_record_details_text<W: Write>(
    w: &mut W,
    view: &RecordView,
    progress: Option<&EpicProgress>,
    width: usize,
    config: &OutputConfig,
) -> io::Result<()> {
    let record = &view.record;

    writeln!(
        w,
        "{} {}: {}",
        colored_status_icon(record.status, config),
        colorize_id(record.id.as_str(), config),
        record.title
    )?;
    writeln!(
        w,
        "{} {}    {} {}    {} {}    {} {}",
        dimmed("Type:", config),
        record
            .record_type
            .map_or_else(|| "-".to_string(), |t| t.to_string()),
        dimmed("Status:", config),
        colorize_status(record.status, config),
        dimmed("Priority:", config),
        colorize_priority(record.priority, config),
        dimmed("Completion:", config),
        colorize_percentage(record.completion_percentage.unwrap_or_default(), config)
    )?;

    if let Some(assignee) = &record.assignee {
        writeln!(w, "{} {}", dimmed("Assignee:", config), assignee)?;
    }
    if !record.labels.is_empty() {
        writeln!(
            w,
            "{} {}",
            dimmed("Labels:", config),
            colorize_labels(&record.labels, config)
        )?;
    }

    writeln!(
        w,
        "{} {}    {} {}",
        dimmed("Created:", config),
        record.created_at.format("%Y-%m-%d %H:%M"),
        dimmed("Updated:", config),
        record.updated_at.format("%Y-%m-%d %H:%M")
    )?;
    if let Some(closed_at) = record.closed_at {
        writeln!(
            w,
            "{} {}",
            dimmed("Closed:", config),
            closed_at.format("%Y-%m-%d %H:%M")
        )?;
    }

    if let Some(description) = &record.description {
        print_text_section(w, "Description", description, width, config)?;
    }
    if let Some(notes) = &record.notes {
        print_text_section(w, "Notes", notes, width, config)?;
    }

    if !record.acceptance_criteria.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}:", bold("Acceptance Criteria", config))?;
        for criterion in &record.acceptance_criteria {
            let mark = if criterion.completed { "[x]" } else { "[ ]" };
            writeln!(w, "  {mark} {}", criterion.text)?;
        }
    }

    if let Some(progress) = progress {
        writeln!(w)?;
        writeln!(
            w,
            "{} {}/{} subtasks closed, {}",
            bold("Progress:", config),
            progress.completed,
            progress.total,
            colorize_percentage(progress.percentage, config)
        )?;
    }

    if !record.dependencies.is_empty() {
        writeln!(w)?;
        writeln!(
            w,
            "{} ({}):",
            bold("Dependencies", config),
            record.dependencies.len()
        )?;
        for dep in &record.dependencies {
            writeln!(
                w,
                "  -> {} ({})",
                colorize_id(dep.target_id.as_str(), config),
                dep.kind
            )?;
        }
    }

    if !view.dependents.is_empty() {
        writeln!(w)?;
        writeln!(
            w,
            "{} ({}):",
            bold("Dependents", config),
            view.dependents.len()
        )?;
        for dependent in &view.dependents {
            writeln!(
                w,
                "  <- {} ({})",
                colorize_id(dependent.source_id.as_str(), config),
                dependent.kind
            )?;
        }
    }

    if !record.comments.is_empty() {
        writeln!(w)?;
        writeln!(
            w,
            "{} ({}):",
            bold("Comments", config),
            record.comments.len()
        )?;
        for comment in &record.comments {
            writeln!(
                w,
                "  {} {} {}",
                dimmed(&comment.created_at.format("%Y-%m-%d %H:%M").to_string(), config),
                bold(&comment.author, config),
                comment.content
            )?;
        }
    }

    Ok(())
}

/// Wrap text to fit within a given width, preserving existing line breaks.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    text.lines()
        .flat_map(|line| {
            if line.trim().is_empty() {
                vec![String::new()]
            } else {
                textwrap::wrap(line, max_width.max(1))
                    .into_iter()
                    .map(std::borrow::Cow::into_owned)
                    .collect()
            }
        })
        .collect()
}

fn print_blocked_text<W: Write>(
    w: &mut W,
    blocked: &[(Record, Vec<Record>)],
    config: &OutputConfig,
) -> io::Result<()> {
    if blocked.is_empty() {
        return writeln!(w, "No blocked records found.");
    }

    writeln!(w, "Found {} blocked record(s):", blocked.len())?;
    writeln!(w)?;

    for (record, blockers) in blocked {
        writeln!(w, "{}", record_row(record, config))?;
        let blocked_by: Vec<String> = blockers
            .iter()
            .map(|b| {
                format!(
                    "{} ({})",
                    colorize_id(b.id.as_str(), config),
                    colorize_status(b.status, config)
                )
            })
            .collect();
        writeln!(
            w,
            "  {} {}",
            dimmed("Blocked by:", config),
            blocked_by.join(", ")
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AcceptanceCriterion, Dependency, DependencyKind, Priority, RecordId, RecordType, Status,
    };
    use crate::graph::Dependent;

    fn plain() -> OutputConfig {
        OutputConfig::new(80, true, false)
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn sample() -> Record {
        let mut record = Record::new("proj-a1b2", "Write docs");
        record.priority = Some(Priority::High);
        record.record_type = Some(RecordType::Docs);
        record.completion_percentage = Some(50);
        record
    }

    #[test]
    fn wrap_text_respects_width_and_newlines() {
        let wrapped = wrap_text("one two three four five six\n\nseven", 10);

        assert!(wrapped.iter().all(|line| line.len() <= 10));
        assert!(wrapped.contains(&String::new()));
        assert_eq!(wrapped.last().map(String::as_str), Some("seven"));
    }

    #[test]
    fn empty_list_says_so() {
        let out = render(|w| print_records_text(w, &[], &plain()));
        assert_eq!(out, "No records found.\n");
    }

    #[test]
    fn list_row_has_id_priority_title_and_completion() {
        let out = render(|w| print_records_text(w, &[sample()], &plain()));

        assert!(out.starts_with("Found 1 record(s):"));
        assert!(out.contains("o proj-a1b2  high  Write docs [docs] (50%)"));
    }

    #[test]
    fn details_show_criteria_dependencies_and_dependents() {
        let mut record = sample();
        record.description = Some("Explain the lock protocol".to_string());
        record.acceptance_criteria = vec![
            AcceptanceCriterion::new("README updated", true),
            AcceptanceCriterion::new("Examples run", false),
        ];
        record.dependencies = vec![Dependency::new("proj-c3d4", DependencyKind::BlockedBy)];
        let view = RecordView {
            record,
            dependents: vec![Dependent {
                source_id: RecordId::new("proj-e5f6"),
                kind: DependencyKind::Related,
            }],
        };

        let out = render(|w| print_record_details_text(w, &view, None, 80, &plain()));

        assert!(out.contains("proj-a1b2: Write docs"));
        assert!(out.contains("Explain the lock protocol"));
        assert!(out.contains("[x] README updated"));
        assert!(out.contains("[ ] Examples run"));
        assert!(out.contains("-> proj-c3d4 (blocked_by)"));
        assert!(out.contains("<- proj-e5f6 (related)"));
        assert!(!out.contains("Progress:"));
    }

    #[test]
    fn details_show_epic_progress() {
        let view = RecordView {
            record: sample(),
            dependents: vec![],
        };
        let progress = EpicProgress {
            completed: 1,
            total: 3,
            percentage: 33,
        };

        let out = render(|w| print_record_details_text(w, &view, Some(&progress), 80, &plain()));

        assert!(out.contains("Progress: 1/3 subtasks closed, 33%"));
    }

    #[test]
    fn blocked_lists_blockers_with_status() {
        let mut blocker = Record::new("proj-c3d4", "Pick a format");
        blocker.status = Status::InProgress;

        let out = render(|w| print_blocked_text(w, &[(sample(), vec![blocker])], &plain()));

        assert!(out.contains("Found 1 blocked record(s):"));
        assert!(out.contains("Blocked by: proj-c3d4 (in_progress)"));
    }

    #[test]
    fn json_output_is_pretty_and_newline_terminated() {
        let out = render(|w| write_json(w, &[sample()]));

        let parsed: Vec<Record> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0].id.as_str(), "proj-a1b2");
        assert!(out.ends_with("]\n"));
    }
}
