//! Record validation.
//!
//! Status, priority, type and dependency kind are closed enums, so a decoded
//! [`Record`] can never carry an unknown value for them. The checks here
//! cover what the type system cannot: empty or oversized text, malformed
//! nested entries, self-references and inconsistent timestamps.
//!
//! Every check collects *all* violations rather than stopping at the first,
//! so callers can fix a record in one round trip.

use crate::domain::{Record, RecordId};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Maximum length of a record id, in characters.
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum length of a record title, in characters.
pub const MAX_TITLE_LENGTH: usize = 500;

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Record the violation belongs to
    pub record_id: RecordId,
    /// Dotted path of the offending field, e.g. `comments[2].author`
    pub field: String,
    /// What is wrong with it
    pub message: String,
}

impl Violation {
    fn new(record_id: &RecordId, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            record_id: record_id.clone(),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.record_id, self.field, self.message)
    }
}

/// One or more records failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    /// Every violation found, in record then field order
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Validation failed with {} violation(s): ",
            self.violations.len()
        )?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

/// Returns `true` if `id` is usable as a record id.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().count() <= MAX_ID_LENGTH && !id.chars().any(char::is_whitespace)
}

/// Returns `true` if `title` is non-blank and within the length limit.
#[must_use]
pub fn is_valid_title(title: &str) -> bool {
    !title.trim().is_empty() && title.chars().count() <= MAX_TITLE_LENGTH
}

/// Collect every violation of a single record.
#[must_use]
pub fn check_record(record: &Record) -> Vec<Violation> {
    let id = &record.id;
    let mut violations = Vec::new();

    if !is_valid_id(id.as_str()) {
        violations.push(Violation::new(
            id,
            "id",
            format!("must be 1-{MAX_ID_LENGTH} characters without whitespace"),
        ));
    }
    if !is_valid_title(&record.title) {
        violations.push(Violation::new(
            id,
            "title",
            format!("must be non-blank and at most {MAX_TITLE_LENGTH} characters"),
        ));
    }

    let mut seen_labels = HashSet::new();
    for (i, label) in record.labels.iter().enumerate() {
        if label.trim().is_empty() {
            violations.push(Violation::new(id, format!("labels[{i}]"), "must not be blank"));
        } else if !seen_labels.insert(label.as_str()) {
            violations.push(Violation::new(
                id,
                format!("labels[{i}]"),
                format!("duplicate label '{label}'"),
            ));
        }
    }

    let mut seen_edges = HashSet::new();
    for (i, dep) in record.dependencies.iter().enumerate() {
        let field = format!("dependencies[{i}]");
        if !is_valid_id(dep.target_id.as_str()) {
            violations.push(Violation::new(id, &field, "target id is not a valid id"));
        } else if dep.target_id == *id && dep.kind.requires_acyclic() {
            violations.push(Violation::new(
                id,
                &field,
                format!("record cannot hold a {} edge to itself", dep.kind),
            ));
        }
        if !seen_edges.insert((&dep.target_id, dep.kind)) {
            violations.push(Violation::new(
                id,
                &field,
                format!("duplicate {} edge to {}", dep.kind, dep.target_id),
            ));
        }
    }

    for (i, comment) in record.comments.iter().enumerate() {
        if comment.id.trim().is_empty() {
            violations.push(Violation::new(id, format!("comments[{i}].id"), "must not be blank"));
        }
        if comment.author.trim().is_empty() {
            violations.push(Violation::new(
                id,
                format!("comments[{i}].author"),
                "must not be blank",
            ));
        }
        if comment.content.trim().is_empty() {
            violations.push(Violation::new(
                id,
                format!("comments[{i}].content"),
                "must not be blank",
            ));
        }
    }

    for (i, criterion) in record.acceptance_criteria.iter().enumerate() {
        if criterion.text.trim().is_empty() {
            violations.push(Violation::new(
                id,
                format!("acceptance_criteria[{i}].text"),
                "must not be blank",
            ));
        }
    }

    if record.updated_at < record.created_at {
        violations.push(Violation::new(id, "updated_at", "precedes created_at"));
    }
    if let Some(closed_at) = record.closed_at {
        if closed_at < record.created_at {
            violations.push(Violation::new(id, "closed_at", "precedes created_at"));
        }
    }
    if let Some(pct) = record.completion_percentage {
        if pct > 100 {
            violations.push(Violation::new(
                id,
                "completion_percentage",
                format!("{pct} is outside 0-100"),
            ));
        }
    }

    violations
}

/// Validate one record.
///
/// # Errors
///
/// Returns a [`ValidationError`] listing every violated constraint.
pub fn validate(record: &Record) -> Result<(), ValidationError> {
    into_result(check_record(record))
}

/// Validate a whole record set, including id uniqueness across it.
///
/// # Errors
///
/// Returns a [`ValidationError`] listing every violation of every record.
pub fn validate_all(records: &[Record]) -> Result<(), ValidationError> {
    let mut violations = Vec::new();
    let mut seen_ids = HashSet::new();

    for record in records {
        violations.extend(check_record(record));
        if !seen_ids.insert(&record.id) {
            violations.push(Violation::new(&record.id, "id", "duplicate record id"));
        }
    }

    into_result(violations)
}

fn into_result(violations: Vec<Violation>) -> Result<(), ValidationError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AcceptanceCriterion, Comment, Dependency, DependencyKind};
    use chrono::{Duration, Utc};
    use rstest::rstest;

    #[rstest]
    #[case::simple("proj-1", true)]
    #[case::dotted("proj-a3f8.1", true)]
    #[case::empty("", false)]
    #[case::whitespace("proj 1", false)]
    #[case::newline("proj-1\n", false)]
    fn id_predicate(#[case] id: &str, #[case] expected: bool) {
        assert_eq!(is_valid_id(id), expected);
    }

    #[test]
    fn title_predicate_rejects_blank_and_oversized() {
        assert!(is_valid_title("Fix it"));
        assert!(!is_valid_title("   "));
        assert!(!is_valid_title(&"x".repeat(MAX_TITLE_LENGTH + 1)));
    }

    #[test]
    fn valid_record_has_no_violations() {
        let mut record = Record::new("t-1", "Task");
        record.labels = vec!["backend".to_string()];
        record.dependencies = vec![Dependency::new("t-2", DependencyKind::BlockedBy)];
        record.acceptance_criteria = vec![AcceptanceCriterion::new("works", false)];

        assert!(validate(&record).is_ok());
    }

    #[test]
    fn all_violations_are_reported_together() {
        let mut record = Record::new("t-1", " ");
        record.labels = vec![String::new()];
        record.dependencies = vec![Dependency::new("t-1", DependencyKind::BlockedBy)];
        record.comments = vec![Comment {
            id: "c-1".to_string(),
            author: String::new(),
            content: String::new(),
            created_at: Utc::now(),
        }];
        record.acceptance_criteria = vec![AcceptanceCriterion::new("", true)];
        record.updated_at = record.created_at - Duration::seconds(5);

        let err = validate(&record).unwrap_err();
        let fields: Vec<&str> = err.violations.iter().map(|v| v.field.as_str()).collect();

        assert_eq!(
            fields,
            vec![
                "title",
                "labels[0]",
                "dependencies[0]",
                "comments[0].author",
                "comments[0].content",
                "acceptance_criteria[0].text",
                "updated_at",
            ]
        );
        assert!(err.to_string().contains("7 violation(s)"));
    }

    #[rstest]
    #[case::blocked_by(DependencyKind::BlockedBy, false)]
    #[case::parent_child(DependencyKind::ParentChild, false)]
    #[case::related(DependencyKind::Related, true)]
    #[case::discovered_from(DependencyKind::DiscoveredFrom, true)]
    fn self_edges_are_allowed_only_for_informational_kinds(
        #[case] kind: DependencyKind,
        #[case] allowed: bool,
    ) {
        let mut record = Record::new("t-1", "Task");
        record.dependencies = vec![Dependency::new("t-1", kind)];

        assert_eq!(validate(&record).is_ok(), allowed);
    }

    #[test]
    fn duplicate_edges_are_violations() {
        let mut record = Record::new("t-1", "Task");
        record.dependencies = vec![
            Dependency::new("t-2", DependencyKind::BlockedBy),
            Dependency::new("t-2", DependencyKind::BlockedBy),
            Dependency::new("t-2", DependencyKind::Related),
        ];

        let err = validate(&record).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].field, "dependencies[1]");
    }

    #[test]
    fn validate_all_detects_duplicate_ids() {
        let records = vec![Record::new("t-1", "One"), Record::new("t-1", "Two")];

        let err = validate_all(&records).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].message, "duplicate record id");
    }
}
