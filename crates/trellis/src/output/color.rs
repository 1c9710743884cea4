//! Color and styling helpers for CLI output.
//!
//! Semantic Color Theme:
//!   - Success/Done:   green   (closed status, full completion)
//!   - Warning/Active: yellow  (in_progress, high priority)
//!   - Error/Urgent:   red     (urgent priority, bugs, blockers)
//!   - Info/Reference: cyan    (record ids)
//!   - Accent:         magenta (labels, epics)
//!   - Muted:          dimmed  (field labels, low priority)

use crate::domain::{Priority, RecordType, Status};
use colored::Colorize;

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "error" color (red) to text.
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

pub(crate) fn colorize_status(status: Status, config: &OutputConfig) -> String {
    let text = status.to_string();
    if !config.use_colors {
        return text;
    }
    match status {
        Status::Open => text.white().to_string(),
        Status::InProgress => text.yellow().to_string(),
        Status::Closed => text.green().to_string(),
    }
}

/// Priority label, or `-` when unset.
pub(crate) fn colorize_priority(priority: Option<Priority>, config: &OutputConfig) -> String {
    let Some(priority) = priority else {
        return "-".to_string();
    };
    let text = priority.to_string();
    if !config.use_colors {
        return text;
    }
    match priority {
        Priority::Urgent => text.red().bold().to_string(),
        Priority::High => text.yellow().to_string(),
        Priority::Medium => text,
        Priority::Low => text.dimmed().to_string(),
    }
}

pub(crate) fn colorize_id(id: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return id.to_string();
    }
    id.cyan().to_string()
}

pub(crate) fn colorize_labels(labels: &[String], config: &OutputConfig) -> String {
    let text = labels.join(", ");
    if !config.use_colors || text.is_empty() {
        return text;
    }
    text.magenta().to_string()
}

/// Completion percentage, green once it reaches 100.
pub(crate) fn colorize_percentage(percentage: u8, config: &OutputConfig) -> String {
    let text = format!("{percentage}%");
    if !config.use_colors {
        return text;
    }
    match percentage {
        100 => text.green().to_string(),
        0 => text.dimmed().to_string(),
        _ => text.yellow().to_string(),
    }
}

/// Status icon, with ASCII fallback support.
pub(crate) fn colored_status_icon(status: Status, config: &OutputConfig) -> String {
    let icon = match (status, config.use_ascii) {
        (Status::Open, true) => "o",
        (Status::InProgress, true) => ">",
        (Status::Closed, true) => "+",
        (Status::Open, false) => "○",
        (Status::InProgress, false) => "▶",
        (Status::Closed, false) => "✓",
    };

    if !config.use_colors {
        return icon.to_string();
    }
    match status {
        Status::Open => icon.white().to_string(),
        Status::InProgress => icon.yellow().to_string(),
        Status::Closed => icon.green().to_string(),
    }
}

/// Short type tag shown in list rows; blank for untyped records.
pub(crate) fn colored_type_tag(record_type: Option<RecordType>, config: &OutputConfig) -> String {
    let Some(record_type) = record_type else {
        return String::new();
    };
    let text = format!("[{record_type}]");
    if !config.use_colors {
        return text;
    }
    match record_type {
        RecordType::Bug => text.red().to_string(),
        RecordType::Feature => text.green().to_string(),
        RecordType::Epic => text.magenta().bold().to_string(),
        RecordType::Task | RecordType::Refactor => text.blue().to_string(),
        RecordType::Chore | RecordType::Docs => text.dimmed().to_string(),
    }
}

pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}
